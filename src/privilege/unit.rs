use std::collections::BTreeMap;

use super::decision::{Decision, PermissionTable};
use super::registry::Tagged;
use super::UserSlot;

/// Who a target-side override applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    /// One specific acting unit.
    Unit(i64),
    /// Any acting unit in this class or a class inheriting from it.
    Class(i64),
}

/// A permission subject, e.g. a player account.
#[derive(Debug)]
pub struct Unit {
    id: i64,
    tag: String,
    class: i64,
    pub(crate) permissions: PermissionTable,
    overrides: BTreeMap<(Subject, i64), Decision>,
    pub(crate) data: UserSlot,
}

impl Unit {
    pub(crate) fn new(id: i64, tag: String, class: i64) -> Self {
        Self {
            id,
            tag,
            class,
            permissions: PermissionTable::new(),
            overrides: BTreeMap::new(),
            data: UserSlot::default(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Id of the class this unit is enlisted in.
    pub fn class_id(&self) -> i64 {
        self.class
    }

    pub(crate) fn set_class_id(&mut self, class: i64) {
        self.class = class;
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn data(&self) -> &UserSlot {
        &self.data
    }

    /// Decision stored on this unit for actions by `subject` using `entry`.
    pub fn override_for(&self, subject: Subject, entry: i64) -> Decision {
        self.overrides
            .get(&(subject, entry))
            .copied()
            .unwrap_or(Decision::Inherit)
    }

    pub(crate) fn set_override(&mut self, subject: Subject, entry: i64, decision: Decision) -> Decision {
        let prev = match decision {
            Decision::Inherit => self.overrides.remove(&(subject, entry)),
            d => self.overrides.insert((subject, entry), d),
        };
        prev.unwrap_or(Decision::Inherit)
    }

    pub fn overrides(&self) -> impl Iterator<Item = (Subject, i64, Decision)> + '_ {
        self.overrides.iter().map(|(&(s, e), &d)| (s, e, d))
    }

    /// Drop overrides naming a unit or class that no longer exists.
    pub(crate) fn forget_subject(&mut self, subject: Subject) {
        self.overrides.retain(|(s, _), _| *s != subject);
    }
}

impl Tagged for Unit {
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
