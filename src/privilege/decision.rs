//! Allow/deny tables consulted during permission resolution.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome stored for one entry in a permission table.
///
/// `Inherit` is never stored: it means "no explicit decision here, ask the
/// next level".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
    #[default]
    Inherit,
}

impl Decision {
    /// Integer form used by the scripting constants `PV_ALLOW` etc.
    pub fn as_int(self) -> i64 {
        match self {
            Decision::Allow => 1,
            Decision::Deny => 0,
            Decision::Inherit => -1,
        }
    }

    pub fn from_int(v: i64) -> Option<Self> {
        match v {
            1 => Some(Decision::Allow),
            0 => Some(Decision::Deny),
            -1 => Some(Decision::Inherit),
            _ => None,
        }
    }

    /// `Some(allowed)` for an explicit decision, `None` for `Inherit`.
    pub fn explicit(self) -> Option<bool> {
        match self {
            Decision::Allow => Some(true),
            Decision::Deny => Some(false),
            Decision::Inherit => None,
        }
    }
}

impl From<bool> for Decision {
    fn from(allow: bool) -> Self {
        if allow { Decision::Allow } else { Decision::Deny }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::Inherit => "inherit",
        })
    }
}

/// Entry id → explicit decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    rules: BTreeMap<i64, Decision>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `decision` for `entry`. `Inherit` clears the slot.
    /// Returns the previous decision.
    pub fn set(&mut self, entry: i64, decision: Decision) -> Decision {
        let prev = match decision {
            Decision::Inherit => self.rules.remove(&entry),
            d => self.rules.insert(entry, d),
        };
        prev.unwrap_or(Decision::Inherit)
    }

    pub fn get(&self, entry: i64) -> Decision {
        self.rules.get(&entry).copied().unwrap_or(Decision::Inherit)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, Decision)> + '_ {
        self.rules.iter().map(|(&e, &d)| (e, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut t = PermissionTable::new();
        assert_eq!(t.get(5), Decision::Inherit);

        assert_eq!(t.set(5, Decision::Allow), Decision::Inherit);
        assert_eq!(t.get(5), Decision::Allow);

        assert_eq!(t.set(5, Decision::Deny), Decision::Allow);
        assert_eq!(t.get(5), Decision::Deny);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_inherit_clears() {
        let mut t = PermissionTable::new();
        t.set(1, Decision::Allow);
        t.set(2, Decision::Deny);

        assert_eq!(t.set(1, Decision::Inherit), Decision::Allow);
        assert_eq!(t.get(1), Decision::Inherit);
        assert_eq!(t.len(), 1);

        // Clearing an empty slot is fine
        assert_eq!(t.set(9, Decision::Inherit), Decision::Inherit);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_int_conversion() {
        for d in [Decision::Allow, Decision::Deny, Decision::Inherit] {
            assert_eq!(Decision::from_int(d.as_int()), Some(d));
        }
        assert_eq!(Decision::from_int(7), None);
        assert_eq!(Decision::from(true), Decision::Allow);
        assert_eq!(Decision::Deny.explicit(), Some(false));
        assert_eq!(Decision::Inherit.explicit(), None);
    }

    #[test]
    fn test_decision_from_yaml() {
        let d: Vec<Decision> = serde_yaml::from_str("[allow, deny, inherit]").unwrap();
        assert_eq!(d, vec![Decision::Allow, Decision::Deny, Decision::Inherit]);
    }
}
