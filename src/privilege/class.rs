use std::collections::BTreeSet;

use super::decision::PermissionTable;
use super::registry::Tagged;
use super::UserSlot;

/// A named group of units sharing a fallback permission table.
#[derive(Debug)]
pub struct Class {
    id: i64,
    tag: String,
    parent: Option<i64>,
    roster: BTreeSet<i64>,
    pub(crate) permissions: PermissionTable,
    pub(crate) data: UserSlot,
}

impl Class {
    pub(crate) fn new(id: i64, tag: String) -> Self {
        Self {
            id,
            tag,
            parent: None,
            roster: BTreeSet::new(),
            permissions: PermissionTable::new(),
            data: UserSlot::default(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Class consulted after this one during resolution.
    pub fn parent(&self) -> Option<i64> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<i64>) {
        self.parent = parent;
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn data(&self) -> &UserSlot {
        &self.data
    }

    /// Ids of the units enlisted here, ascending.
    pub fn units(&self) -> impl Iterator<Item = i64> + '_ {
        self.roster.iter().copied()
    }

    pub fn has_unit(&self, unit: i64) -> bool {
        self.roster.contains(&unit)
    }

    pub fn unit_count(&self) -> usize {
        self.roster.len()
    }

    /// Add `unit` to the roster. False if it was already there.
    pub(crate) fn enlist_unit(&mut self, unit: i64) -> bool {
        self.roster.insert(unit)
    }

    /// Drop `unit` from the roster. False if it was not there.
    pub(crate) fn unlist_unit(&mut self, unit: i64) -> bool {
        self.roster.remove(&unit)
    }
}

impl Tagged for Class {
    fn id(&self) -> i64 {
        self.id
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn set_tag(&mut self, tag: String) {
        self.tag = tag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_enlist_rejected() {
        let mut class = Class::new(1, "guest".to_string());
        assert!(class.enlist_unit(100));
        assert!(!class.enlist_unit(100));
        assert_eq!(class.unit_count(), 1);
    }

    #[test]
    fn test_unlist_missing() {
        let mut class = Class::new(1, "guest".to_string());
        assert!(!class.unlist_unit(100));

        class.enlist_unit(100);
        assert!(class.unlist_unit(100));
        assert!(!class.has_unit(100));
    }
}
