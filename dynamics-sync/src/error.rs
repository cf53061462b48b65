//! Errors raised while building a change-set

use crate::model::EntityKey;

/// Why a key could not be resolved to a change record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// The source graph does not track the key
    UntrackedInSource,
    /// The source tracks the key but the target graph has no such entity
    AbsentInTarget,
}

impl std::fmt::Display for MissingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingReason::UntrackedInSource => write!(f, "not tracked by the source graph"),
            MissingReason::AbsentInTarget => write!(f, "not present in the target graph"),
        }
    }
}

/// Error produced by the sync engine
#[derive(Debug)]
pub enum SyncError {
    /// A key that must resolve (relationship endpoint, deleted or modified
    /// entity) has no record
    EntityNotFound {
        key: EntityKey,
        reason: MissingReason,
    },
    /// A change entry names an association missing from the registry
    UnknownAssociation { name: String },
    /// An association descriptor is malformed
    InvalidAssociation { name: String, reason: String },
    /// A graph collaborator failed; the error is carried unchanged
    Graph(anyhow::Error),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::EntityNotFound { key, reason } => {
                write!(f, "Entity {} not found: {}", key, reason)
            }
            SyncError::UnknownAssociation { name } => {
                write!(f, "Unknown association '{}'", name)
            }
            SyncError::InvalidAssociation { name, reason } => {
                write!(f, "Invalid association '{}': {}", name, reason)
            }
            SyncError::Graph(err) => write!(f, "Graph operation failed: {}", err),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Graph(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl SyncError {
    /// Whether this is a "not found" precondition failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::EntityNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_not_found_message_names_key() {
        let err = SyncError::EntityNotFound {
            key: EntityKey::single("Employees", "Id", 7),
            reason: MissingReason::AbsentInTarget,
        };

        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Entity Employees(Id=7) not found: not present in the target graph"
        );
    }

    #[test]
    fn test_graph_error_keeps_source() {
        let err = SyncError::Graph(anyhow::anyhow!("connection reset"));

        assert!(!err.is_not_found());
        assert_eq!(err.source().unwrap().to_string(), "connection reset");
    }
}
