use serde::{Deserialize, Serialize};

use crate::DocketError;

// ── Access Levels ───────────────────────────────────────────────────────────

/// Declared access level of a documented code element.
///
/// Stored as an integer, so the discriminants are part of the database format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Not known or not set. Topics fall back to this.
    #[default]
    Unknown = 0,
    Public = 1,
    Protected = 2,
    Internal = 3,
    ProtectedInternal = 4,
    Private = 5,
}

impl AccessLevel {
    /// The integer stored in the database.
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for AccessLevel {
    type Error = DocketError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Public),
            2 => Ok(Self::Protected),
            3 => Ok(Self::Internal),
            4 => Ok(Self::ProtectedInternal),
            5 => Ok(Self::Private),
            _ => Err(DocketError::InvalidAccessLevel(value)),
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Public => write!(f, "public"),
            Self::Protected => write!(f, "protected"),
            Self::Internal => write!(f, "internal"),
            Self::ProtectedInternal => write!(f, "protected internal"),
            Self::Private => write!(f, "private"),
        }
    }
}

// ── Lock Levels ─────────────────────────────────────────────────────────────

/// Access mode an accessor holds on the code database.
///
/// Ordered so that `a >= b` means a lock of level `a` satisfies a requirement
/// of level `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockLevel {
    Unlocked,
    /// Shared with any number of other readers.
    ReadOnly,
    /// A read lock that may be upgraded to [`LockLevel::ReadWrite`] the first
    /// time a change is actually needed. Only one may exist at a time.
    ReadPossibleWrite,
    /// Exclusive.
    ReadWrite,
}

impl std::fmt::Display for LockLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlocked => write!(f, "unlocked"),
            Self::ReadOnly => write!(f, "read-only"),
            Self::ReadPossibleWrite => write!(f, "read/possible write"),
            Self::ReadWrite => write!(f, "read/write"),
        }
    }
}

// ── Cancellation ────────────────────────────────────────────────────────────

/// Cancellation predicate for long-running database operations.
///
/// Polled cooperatively between rows; returning `true` asks the operation to
/// stop at the next safe point.
pub type Cancel<'a> = &'a dyn Fn() -> bool;

/// A cancellation predicate that never cancels.
pub fn never_cancel() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_level_roundtrips_through_integer() {
        for level in [
            AccessLevel::Unknown,
            AccessLevel::Public,
            AccessLevel::Protected,
            AccessLevel::Internal,
            AccessLevel::ProtectedInternal,
            AccessLevel::Private,
        ] {
            assert_eq!(AccessLevel::try_from(level.as_i64()).unwrap(), level);
        }
    }

    #[test]
    fn unknown_access_level_integer_is_rejected() {
        assert!(matches!(
            AccessLevel::try_from(42),
            Err(DocketError::InvalidAccessLevel(42))
        ));
    }

    #[test]
    fn lock_levels_are_ordered() {
        assert!(LockLevel::Unlocked < LockLevel::ReadOnly);
        assert!(LockLevel::ReadOnly < LockLevel::ReadPossibleWrite);
        assert!(LockLevel::ReadPossibleWrite < LockLevel::ReadWrite);
    }

    #[test]
    fn never_cancel_is_false() {
        let cancel: Cancel<'_> = &never_cancel;
        assert!(!cancel());
    }
}
