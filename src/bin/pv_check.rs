use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use mlua::Lua;
use pvacl::config::PrivilegeSeed;
use pvacl::privilege::{Manager, Privileges};
use pvacl::scripting::{self, SharedPrivileges};

const USAGE: &str = "Usage: pv_check [--conf FILE] [--manager NAME] \
[--unit TAG --entry TAG [--target TAG]] [--script PATH]";

#[derive(Debug, Default)]
struct Query {
    manager: Option<String>,
    unit: Option<String>,
    entry: Option<String>,
    target: Option<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut conf_file = "conf/privileges.yaml".to_string();
    let mut script: Option<PathBuf> = None;
    let mut query = Query::default();

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "--help" | "--h" | "--?" | "/?") {
            println!("{USAGE}");
            return Ok(ExitCode::SUCCESS);
        }
        let slot = match flag {
            "--conf" | "--manager" | "--unit" | "--entry" | "--target" | "--script" => flag,
            other => {
                eprintln!("Warning: ignoring unknown argument {other}");
                i += 1;
                continue;
            }
        };
        let Some(value) = args.get(i + 1).cloned() else {
            eprintln!("Error: {slot} requires an argument");
            eprintln!("{USAGE}");
            return Ok(ExitCode::from(2));
        };
        match slot {
            "--conf" => conf_file = value,
            "--manager" => query.manager = Some(value),
            "--unit" => query.unit = Some(value),
            "--entry" => query.entry = Some(value),
            "--target" => query.target = Some(value),
            _ => script = Some(PathBuf::from(value)),
        }
        i += 2;
    }

    let seed = PrivilegeSeed::from_file(&conf_file)?;
    let shared: SharedPrivileges = Rc::new(RefCell::new(Privileges::new()));
    seed.apply(&mut shared.borrow_mut())
        .with_context(|| format!("Cannot seed privileges from {conf_file}"))?;

    if let Some(path) = script {
        run_script(&shared, &path)?;
    }

    match (&query.unit, &query.entry) {
        (Some(unit), Some(entry)) => {
            let pv = shared.borrow();
            let manager = pick_manager(&pv, query.manager.as_deref())?;
            let allowed = answer(manager, unit, entry, query.target.as_deref())?;
            println!("{}", if allowed { "allow" } else { "deny" });
            Ok(if allowed { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        (None, None) => Ok(ExitCode::SUCCESS),
        _ => {
            eprintln!("Error: --unit and --entry must be given together");
            Ok(ExitCode::from(2))
        }
    }
}

fn run_script(shared: &SharedPrivileges, path: &Path) -> Result<()> {
    let lua = Lua::new();
    scripting::register_with(&lua, Rc::clone(shared)).map_err(|e| anyhow!("{e}"))?;
    if path.is_dir() {
        let loaded = scripting::load_dir(&lua, path).map_err(|e| anyhow!("{e}"))?;
        tracing::info!("[scripting] ran {loaded} script(s) from {}", path.display());
    } else {
        scripting::run_file(&lua, path)
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Script failed: {}", path.display()))?;
    }
    Ok(())
}

fn pick_manager<'a>(pv: &'a Privileges, name: Option<&str>) -> Result<&'a Manager> {
    match name {
        Some(name) => pv
            .manager_by_name(name)
            .with_context(|| format!("No privilege manager named {name}")),
        None => pv.iter().next().context("Seed file defines no managers"),
    }
}

fn answer(m: &Manager, unit: &str, entry: &str, target: Option<&str>) -> Result<bool> {
    let Some(actor) = m.unit_by_tag(unit)? else {
        bail!("Unknown unit tag: {unit}");
    };
    let Some(entry) = m.entry_by_tag(entry)? else {
        bail!("Unknown entry tag: {entry}");
    };
    let allowed = match target {
        Some(target) => {
            let Some(target) = m.unit_by_tag(target)? else {
                bail!("Unknown unit tag: {target}");
            };
            m.can_against(target.id(), entry.id(), actor.id())?
        }
        None => m.can(actor.id(), entry.id())?,
    };
    Ok(allowed)
}
