//! Userdata handles exposed to scripts.
//!
//! Every handle is a manager id plus an object id. Handles never own the
//! object; releasing it (or its manager) makes later access a script error.

pub mod class;
pub mod entry;
pub mod manager;
pub mod shared;
pub mod unit;

pub use class::ClassObject;
pub use entry::EntryObject;
pub use manager::ManagerObject;
pub use unit::UnitObject;
