use std::collections::BTreeMap;
use std::fmt;

use super::error::{PrivilegeError, Result};
use super::manager::Manager;

/// Handle to a manager inside a [`Privileges`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerId(pub(crate) u32);

impl ManagerId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Every live manager of one host.
///
/// The host owns this value and tears everything down with
/// [`Privileges::terminate`] at shutdown. Manager ids are never reused, so a
/// stale [`ManagerId`] always reports [`PrivilegeError::ManagerGone`].
#[derive(Debug, Default)]
pub struct Privileges {
    managers: BTreeMap<ManagerId, Manager>,
    next_id: u32,
}

impl Privileges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty manager. An empty name becomes `manager#<id>`.
    pub fn create_manager(&mut self, name: &str) -> ManagerId {
        self.next_id += 1;
        let id = ManagerId(self.next_id);
        let name = if name.trim().is_empty() {
            format!("manager{id}")
        } else {
            name.to_owned()
        };
        tracing::info!("[privilege] created manager {id} ({name})");
        self.managers.insert(id, Manager::new(id, name));
        id
    }

    pub fn manager(&self, id: ManagerId) -> Result<&Manager> {
        self.managers.get(&id).ok_or(PrivilegeError::ManagerGone(id))
    }

    pub fn manager_mut(&mut self, id: ManagerId) -> Result<&mut Manager> {
        self.managers.get_mut(&id).ok_or(PrivilegeError::ManagerGone(id))
    }

    /// First manager (lowest id) with this name.
    pub fn manager_by_name(&self, name: &str) -> Option<&Manager> {
        self.managers.values().find(|m| m.name() == name)
    }

    /// Drop one manager and everything it owns.
    pub fn release_manager(&mut self, id: ManagerId) -> bool {
        match self.managers.remove(&id) {
            Some(m) => {
                tracing::debug!("[privilege] released manager {id} ({})", m.name());
                true
            }
            None => false,
        }
    }

    /// Release every manager. Returns how many there were.
    pub fn terminate(&mut self) -> usize {
        let count = self.managers.len();
        self.managers.clear();
        tracing::info!("[privilege] terminated {count} manager(s)");
        count
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manager> + '_ {
        self.managers.values()
    }
}
