//! Status enums for batch operations.

use serde::{Deserialize, Serialize};

/// Which path an upsert took.
///
/// A batch is keyed by `(code, lot)`: submitting a known pair adds to the
/// existing row, an unknown pair creates a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// A new batch row was inserted.
    Created,
    /// The quantity was added to an existing batch.
    Merged,
}

impl UpsertOutcome {
    /// Returns `true` when a new row was inserted.
    #[must_use]
    pub const fn is_created(self) -> bool {
        matches!(self, Self::Created)
    }
}

impl std::fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_format() {
        assert_eq!(
            serde_json::to_string(&UpsertOutcome::Created).unwrap(),
            "\"created\""
        );
        assert_eq!(
            serde_json::to_string(&UpsertOutcome::Merged).unwrap(),
            "\"merged\""
        );
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(UpsertOutcome::Merged.to_string(), "merged");
        assert!(UpsertOutcome::Created.is_created());
        assert!(!UpsertOutcome::Merged.is_created());
    }
}
