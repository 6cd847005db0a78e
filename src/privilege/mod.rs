//! Privilege (access-control) manager.
//!
//! A [`Manager`] is an isolated namespace of permission keys ([`Entry`]),
//! groups ([`Class`]) and subjects ([`Unit`]). Each unit belongs to exactly one
//! class. Asking whether a unit may use an entry walks the unit's own table,
//! then its class and the class's ancestors, and denies when nothing says
//! otherwise.
//!
//! ```
//! use pvacl::privilege::{Decision, Privileges};
//!
//! let mut pv = Privileges::new();
//! let id = pv.create_manager("server");
//! let m = pv.manager_mut(id).unwrap();
//!
//! m.create_class(1, "admin").unwrap();
//! m.create_unit(100, 1, "alice").unwrap();
//! m.create_entry(5, "can_kick").unwrap();
//! m.set_class_decision(1, 5, Decision::Allow).unwrap();
//!
//! assert!(m.can(100, 5).unwrap());
//! ```

mod class;
mod decision;
mod entry;
mod error;
mod manager;
mod privileges;
mod registry;
mod unit;

use std::any::Any;
use std::fmt;

pub use class::Class;
pub use decision::{Decision, PermissionTable};
pub use entry::Entry;
pub use error::{PrivilegeError, Result};
pub use manager::Manager;
pub use privileges::{ManagerId, Privileges};
pub use registry::{Registry, Tagged};
pub use unit::{Subject, Unit};

/// One opaque value attached to a unit or class by the embedder.
#[derive(Default)]
pub struct UserSlot(Option<Box<dyn Any>>);

impl UserSlot {
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// The stored value, if it is a `T`.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    pub(crate) fn replace(&mut self, value: Option<Box<dyn Any>>) -> Option<Box<dyn Any>> {
        std::mem::replace(&mut self.0, value)
    }
}

impl fmt::Debug for UserSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_set() { "UserSlot(set)" } else { "UserSlot(empty)" })
    }
}
