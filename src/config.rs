//! Privilege seed files
//!
//! A seed file describes managers with their entries, classes and units so a
//! host can start with a known permission layout instead of building it from
//! scripts. YAML is the default format; files ending in `.toml` are read as TOML.
//!
//! Uses serde for parsing - the structs below are the file format.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::privilege::{Decision, Manager, ManagerId, Privileges, Subject};

/// Top-level seed document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivilegeSeed {
    #[serde(default)]
    pub managers: Vec<ManagerSeed>,
}

/// One manager and everything registered in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSeed {
    pub name: String,

    #[serde(default)]
    pub entries: Vec<EntrySeed>,

    #[serde(default)]
    pub classes: Vec<ClassSeed>,

    #[serde(default)]
    pub units: Vec<UnitSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySeed {
    pub id: i64,
    pub tag: String,

    /// Operator-facing description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub brief: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSeed {
    pub id: i64,
    pub tag: String,

    /// Tag of the class this one inherits from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Entry tags granted to the class
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,

    /// Entry tags denied to the class
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSeed {
    pub id: i64,
    pub tag: String,

    /// Tag of the class the unit starts in
    pub class: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,

    /// Decisions for actions other units take against this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideSeed>,
}

/// Exactly one of `unit` or `class` names who the override applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideSeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    pub entry: String,
    pub decision: Decision,
}

impl PrivilegeSeed {
    /// Load a seed file, picking the format from the extension
    ///
    /// # Example
    /// ```no_run
    /// use pvacl::config::PrivilegeSeed;
    ///
    /// let seed = PrivilegeSeed::from_file("conf/privileges.yaml")
    ///     .expect("Failed to load seed");
    /// println!("managers: {}", seed.managers.len());
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;

        let seed = if is_toml(path) {
            Self::from_toml_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        };
        seed.with_context(|| format!("Invalid seed file {}", path.display()))
    }

    /// Parse a YAML seed. Useful for testing
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let seed: PrivilegeSeed = serde_yaml::from_str(contents)
            .context("Failed to parse YAML")?;

        seed.validate()?;

        Ok(seed)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let seed: PrivilegeSeed = toml::from_str(contents)
            .context("Failed to parse TOML")?;

        seed.validate()?;

        Ok(seed)
    }

    /// Check names and ids before anything is registered
    ///
    /// Cross references (class of a unit, entries in allow lists) are checked
    /// by [`PrivilegeSeed::apply`] since they resolve against the live manager.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for m in &self.managers {
            anyhow::ensure!(!m.name.trim().is_empty(), "manager name cannot be empty");
            anyhow::ensure!(names.insert(m.name.as_str()), "Duplicate manager name: {}", m.name);

            let mut ids = HashSet::new();
            for e in &m.entries {
                anyhow::ensure!(!e.tag.trim().is_empty(), "{}: entry {} has an empty tag", m.name, e.id);
                anyhow::ensure!(ids.insert(e.id), "{}: duplicate entry id {}", m.name, e.id);
            }

            ids.clear();
            for c in &m.classes {
                anyhow::ensure!(!c.tag.trim().is_empty(), "{}: class {} has an empty tag", m.name, c.id);
                anyhow::ensure!(ids.insert(c.id), "{}: duplicate class id {}", m.name, c.id);
            }

            ids.clear();
            for u in &m.units {
                anyhow::ensure!(!u.tag.trim().is_empty(), "{}: unit {} has an empty tag", m.name, u.id);
                anyhow::ensure!(ids.insert(u.id), "{}: duplicate unit id {}", m.name, u.id);
                for o in &u.overrides {
                    anyhow::ensure!(
                        o.unit.is_some() != o.class.is_some(),
                        "{}: override on unit {} needs exactly one of `unit` or `class`",
                        m.name,
                        u.id
                    );
                }
            }
        }
        Ok(())
    }

    /// Register every manager of this seed in `pv`.
    ///
    /// Either all managers are created or, on the first bad reference, the
    /// ones created so far are released again.
    pub fn apply(&self, pv: &mut Privileges) -> Result<Vec<ManagerId>> {
        let mut created = Vec::with_capacity(self.managers.len());
        for seed in &self.managers {
            let id = pv.create_manager(&seed.name);
            created.push(id);

            let result = pv
                .manager_mut(id)
                .map_err(anyhow::Error::from)
                .and_then(|m| seed.populate(m));
            if let Err(e) = result {
                for id in &created {
                    pv.release_manager(*id);
                }
                return Err(e.context(format!("Failed to seed manager {}", seed.name)));
            }
        }
        tracing::info!("[seed] loaded {} manager(s)", created.len());
        Ok(created)
    }

    /// Save the seed as YAML, or TOML for a `.toml` path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_toml(path) {
            toml::to_string(self).context("Failed to serialize seed to TOML")?
        } else {
            serde_yaml::to_string(self).context("Failed to serialize seed to YAML")?
        };

        fs::write(path, text)
            .with_context(|| format!("Failed to write seed to {}", path.display()))?;

        Ok(())
    }
}

impl ManagerSeed {
    fn populate(&self, m: &mut Manager) -> Result<()> {
        for e in &self.entries {
            m.create_entry(e.id, &e.tag)?;
            if !e.brief.is_empty() {
                m.set_entry_brief(e.id, &e.brief)?;
            }
        }

        for c in &self.classes {
            m.create_class(c.id, &c.tag)?;
        }
        // Parents may be declared after their children
        for c in &self.classes {
            if let Some(parent) = &c.parent {
                let parent = class_id(m, parent)?;
                m.set_class_parent(c.id, Some(parent))?;
            }
            for tag in &c.allow {
                m.set_class_decision(c.id, entry_id(m, tag)?, Decision::Allow)?;
            }
            for tag in &c.deny {
                m.set_class_decision(c.id, entry_id(m, tag)?, Decision::Deny)?;
            }
        }

        for u in &self.units {
            let class = class_id(m, &u.class)?;
            m.create_unit(u.id, class, &u.tag)?;
            for tag in &u.allow {
                m.set_unit_decision(u.id, entry_id(m, tag)?, Decision::Allow)?;
            }
            for tag in &u.deny {
                m.set_unit_decision(u.id, entry_id(m, tag)?, Decision::Deny)?;
            }
        }
        // Overrides may name units declared later in the file
        for u in &self.units {
            for o in &u.overrides {
                let subject = match (&o.unit, &o.class) {
                    (Some(unit), None) => Subject::Unit(unit_id(m, unit)?),
                    (None, Some(class)) => Subject::Class(class_id(m, class)?),
                    _ => bail!("override on unit {} needs exactly one of `unit` or `class`", u.id),
                };
                m.set_unit_override(u.id, subject, entry_id(m, &o.entry)?, o.decision)?;
            }
        }

        tracing::debug!(
            "[seed] {}: {} entries, {} classes, {} units",
            m.name(),
            m.entry_count(),
            m.class_count(),
            m.unit_count()
        );
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

fn entry_id(m: &Manager, tag: &str) -> Result<i64> {
    match m.entry_by_tag(tag)? {
        Some(e) => Ok(e.id()),
        None => bail!("Unknown entry tag: {tag}"),
    }
}

fn class_id(m: &Manager, tag: &str) -> Result<i64> {
    match m.class_by_tag(tag)? {
        Some(c) => Ok(c.id()),
        None => bail!("Unknown class tag: {tag}"),
    }
}

fn unit_id(m: &Manager, tag: &str) -> Result<i64> {
    match m.unit_by_tag(tag)? {
        Some(u) => Ok(u.id()),
        None => bail!("Unknown unit tag: {tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a small but complete seed
    fn server_seed() -> &'static str {
        r#"
managers:
  - name: server
    entries:
      - { id: 5, tag: can_kick, brief: "Kick a player" }
      - { id: 6, tag: can_ban }
    classes:
      - id: 2
        tag: admin
        parent: guest
        allow: [can_kick, can_ban]
      - id: 1
        tag: guest
        deny: [can_kick]
    units:
      - { id: 100, tag: alice, class: guest }
      - id: 101
        tag: bob
        class: admin
        overrides:
          - { class: admin, entry: can_kick, decision: deny }
      - id: 102
        tag: carol
        class: guest
        allow: [can_kick]
"#
    }

    #[test]
    fn test_minimal_seed() {
        let seed = PrivilegeSeed::from_yaml_str("managers:\n  - name: empty\n").unwrap();
        assert_eq!(seed.managers.len(), 1);
        assert!(seed.managers[0].entries.is_empty());

        let seed = PrivilegeSeed::from_yaml_str("{}").unwrap();
        assert!(seed.managers.is_empty());
    }

    #[test]
    fn test_apply_server_seed() {
        let seed = PrivilegeSeed::from_yaml_str(server_seed()).unwrap();
        let mut pv = Privileges::new();
        let ids = seed.apply(&mut pv).unwrap();
        assert_eq!(ids.len(), 1);

        let m = pv.manager(ids[0]).unwrap();
        assert_eq!(m.name(), "server");
        assert_eq!(m.entry(5).unwrap().brief(), "Kick a player");
        assert_eq!(m.class(2).unwrap().parent(), Some(1));
        assert_eq!(m.unit(101).unwrap().class_id(), 2);

        assert!(!m.can(100, 5).unwrap());
        assert!(m.can(101, 5).unwrap());
        assert!(m.can(102, 5).unwrap());

        // bob is immune to kicks from admins
        assert!(!m.can_against(101, 5, 101).unwrap());
        assert!(m.can_against(100, 5, 101).unwrap());
    }

    #[test]
    fn test_toml_seed() {
        let seed = PrivilegeSeed::from_toml_str(
            r#"
[[managers]]
name = "server"

[[managers.entries]]
id = 5
tag = "can_kick"

[[managers.classes]]
id = 1
tag = "guest"
allow = ["can_kick"]

[[managers.units]]
id = 100
tag = "alice"
class = "guest"
"#,
        )
        .unwrap();

        let mut pv = Privileges::new();
        let ids = seed.apply(&mut pv).unwrap();
        assert!(pv.manager(ids[0]).unwrap().can(100, 5).unwrap());
    }

    #[test]
    fn test_duplicate_manager_name() {
        let result = PrivilegeSeed::from_yaml_str("managers:\n  - name: a\n  - name: a\n");
        let err_msg = format!("{}", result.unwrap_err());
        assert!(err_msg.contains("Duplicate manager name"), "got: {err_msg}");
    }

    #[test]
    fn test_duplicate_ids() {
        let config_str = r#"
managers:
  - name: a
    classes:
      - { id: 1, tag: guest }
      - { id: 1, tag: admin }
"#;
        let err_msg = format!("{}", PrivilegeSeed::from_yaml_str(config_str).unwrap_err());
        assert!(err_msg.contains("duplicate class id 1"), "got: {err_msg}");
    }

    #[test]
    fn test_empty_tag() {
        let config_str = r#"
managers:
  - name: a
    entries:
      - { id: 1, tag: "" }
"#;
        assert!(PrivilegeSeed::from_yaml_str(config_str).is_err());
    }

    #[test]
    fn test_override_needs_one_subject() {
        let config_str = r#"
managers:
  - name: a
    units:
      - id: 1
        tag: x
        class: guest
        overrides:
          - { unit: y, class: guest, entry: e, decision: deny }
"#;
        let err_msg = format!("{}", PrivilegeSeed::from_yaml_str(config_str).unwrap_err());
        assert!(err_msg.contains("exactly one"), "got: {err_msg}");
    }

    #[test]
    fn test_unknown_reference_rolls_back() {
        let config_str = r#"
managers:
  - name: good
  - name: bad
    classes:
      - { id: 1, tag: guest, allow: [missing] }
"#;
        let seed = PrivilegeSeed::from_yaml_str(config_str).unwrap();
        let mut pv = Privileges::new();
        let err = seed.apply(&mut pv).unwrap_err();

        assert!(format!("{err:#}").contains("Unknown entry tag: missing"), "got: {err:#}");
        assert!(pv.is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = PrivilegeSeed::from_yaml_str("managers: [this is not valid yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_type() {
        let config_str = r#"
managers:
  - name: a
    entries:
      - { id: "five", tag: x }
"#;
        assert!(PrivilegeSeed::from_yaml_str(config_str).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let seed = PrivilegeSeed::from_yaml_str(server_seed()).unwrap();

        for ext in ["yaml", "toml"] {
            let name = format!("test_save_seed_{}.{ext}", std::process::id());
            let temp_file = std::env::temp_dir().join(name);

            seed.save(&temp_file).unwrap();
            let loaded = PrivilegeSeed::from_file(&temp_file).unwrap();

            assert_eq!(loaded.managers[0].name, "server");
            assert_eq!(loaded.managers[0].units.len(), 3);
            assert_eq!(loaded.managers[0].classes[0].parent.as_deref(), Some("guest"));
            assert_eq!(loaded.managers[0].units[1].overrides[0].decision, Decision::Deny);

            std::fs::remove_file(temp_file).ok();
        }
    }
}
