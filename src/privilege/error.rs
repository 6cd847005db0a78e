use thiserror::Error;

use super::ManagerId;

/// Errors raised by privilege operations.
///
/// Every mutating operation validates first, so an `Err` always means nothing
/// was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrivilegeError {
    /// Empty or whitespace-only tag passed to a creation or lookup call.
    #[error("invalid or empty privilege {kind} name")]
    InvalidTag { kind: &'static str },

    #[error("unknown privilege entry: {0}")]
    UnknownEntry(i64),

    #[error("unknown privilege class: {0}")]
    UnknownClass(i64),

    #[error("unknown privilege unit: {0}")]
    UnknownUnit(i64),

    /// The manager behind a handle was released or terminated.
    #[error("privilege manager {0} no longer exists")]
    ManagerGone(ManagerId),

    /// Setting this parent would make the class its own ancestor.
    #[error("class {class} cannot inherit from {parent}: inheritance cycle")]
    ClassCycle { class: i64, parent: i64 },

    /// Class still has units enlisted or child classes inheriting from it.
    #[error("class {0} is still in use")]
    ClassInUse(i64),
}

pub type Result<T> = std::result::Result<T, PrivilegeError>;

/// Reject empty tags before anything is touched.
pub(crate) fn check_tag(kind: &'static str, tag: &str) -> Result<()> {
    if tag.trim().is_empty() {
        return Err(PrivilegeError::InvalidTag { kind });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tag() {
        assert!(check_tag("unit", "alice").is_ok());
        assert_eq!(check_tag("unit", ""), Err(PrivilegeError::InvalidTag { kind: "unit" }));
        assert!(check_tag("class", "   ").is_err());
    }

    #[test]
    fn test_messages() {
        let err = PrivilegeError::InvalidTag { kind: "entry" };
        assert_eq!(err.to_string(), "invalid or empty privilege entry name");

        let err = PrivilegeError::ClassCycle { class: 1, parent: 2 };
        assert!(err.to_string().contains("cycle"), "got: {err}");
    }
}
