//! pvacl - Privilege manager for a scripted game server
//!
//! Managers hold permission entries, classes and units. Scripts reach them
//! through the Lua bindings in [`scripting`]; operators seed them from
//! YAML or TOML files through [`config`].

// ============================================
// Core
// ============================================

/// Entries, classes, units and permission resolution
pub mod privilege;

// ============================================
// Host integration
// ============================================

/// Privilege seed files
pub mod config;
/// Lua bindings (PvManager, PvClass, PvUnit, PvEntry)
pub mod scripting;
