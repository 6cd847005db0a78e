//! Lua bindings for the privilege subsystem.
//!
//! [`register`] installs the `PvManager` family of globals. The managers live
//! in a [`Privileges`] registry stored as app data on the Lua state, so each
//! state has its own set and [`terminate_privileges`] only touches that one.

pub mod globals;
pub mod types;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use mlua::Lua;

use crate::privilege::Privileges;

/// Registry handle shared between the host and the Lua state.
pub type SharedPrivileges = Rc<RefCell<Privileges>>;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Install the privilege globals, creating an empty registry if the state has none.
pub fn register(lua: &Lua) -> mlua::Result<SharedPrivileges> {
    let shared = match lua.app_data_ref::<SharedPrivileges>() {
        Some(existing) => Rc::clone(&existing),
        None => Rc::new(RefCell::new(Privileges::new())),
    };
    register_with(lua, Rc::clone(&shared))?;
    Ok(shared)
}

/// Install the privilege globals backed by a registry the host already owns.
pub fn register_with(lua: &Lua, shared: SharedPrivileges) -> mlua::Result<()> {
    lua.set_app_data(shared);
    globals::register(lua)
}

/// The registry attached to `lua`.
pub(crate) fn privileges(lua: &Lua) -> mlua::Result<SharedPrivileges> {
    lua.app_data_ref::<SharedPrivileges>()
        .map(|pv| Rc::clone(&pv))
        .ok_or_else(|| mlua::Error::RuntimeError("privilege scripting is not registered".to_string()))
}

/// Release every manager on this state. Existing handles become dead.
pub fn terminate_privileges(lua: &Lua) -> mlua::Result<usize> {
    let released = privileges(lua)?.borrow_mut().terminate();
    tracing::info!("[scripting] terminated privileges, released {released} manager(s)");
    Ok(released)
}

// ---------------------------------------------------------------------------
// Script loading
// ---------------------------------------------------------------------------

pub fn run_file(lua: &Lua, path: &Path) -> mlua::Result<()> {
    let src = std::fs::read(path).map_err(mlua::Error::external)?;
    let name = path.to_string_lossy();
    lua.load(src.as_slice()).set_name(name.as_ref()).exec()
}

/// Run every `.lua` file under `dir`, depth first in name order.
///
/// A script that fails is logged and skipped. Returns how many ran cleanly.
pub fn load_dir(lua: &Lua, dir: &Path) -> mlua::Result<usize> {
    let mut paths: Vec<_> = match std::fs::read_dir(dir) {
        Ok(rd) => rd.flatten().map(|e| e.path()).collect(),
        Err(e) => {
            tracing::warn!("[scripting] cannot read {}: {e}", dir.display());
            return Ok(0);
        }
    };
    paths.sort();

    let mut loaded = 0;
    for path in paths {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            loaded += load_dir(lua, &path)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("lua") {
            match run_file(lua, &path) {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!("[scripting] error loading {}: {e}", path.display()),
            }
        }
    }
    Ok(loaded)
}
