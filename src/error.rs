//! Error types for tola-reconcile.
//!
//! One error type per phase. A [`DiffError`] means nothing was mutated; an
//! [`ApplyError`] means the live tree may hold a partially applied script.

use thiserror::Error;

use crate::path::Path;

/// An attribute serializer refused a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrError {
    /// The value has no string form under this serializer
    #[error("attribute value cannot be serialized: {reason}")]
    Unserializable {
        /// Why the value was refused
        reason: String,
    },
}

impl AttrError {
    /// Create an unserializable-value error.
    pub fn unserializable(reason: impl Into<String>) -> Self {
        Self::Unserializable {
            reason: reason.into(),
        }
    }
}

/// Errors raised while computing an edit script.
///
/// No live tree has been touched when one of these is returned.
#[derive(Debug, Error)]
pub enum DiffError {
    /// A name contains one of the reserved path separators (`/`, `#`, `.`)
    #[error("{kind} name {name:?} contains a reserved path separator")]
    ReservedCharacter {
        /// What kind of name ("attribute" or "tag")
        kind: &'static str,
        /// The offending name
        name: String,
    },

    /// Tree is nested deeper than the configured limit
    #[error("tree depth exceeds the configured maximum of {max}")]
    DepthExceeded {
        /// Configured maximum depth
        max: usize,
    },

    /// Edit script grew past the configured limit
    #[error("edit script exceeds the configured maximum of {max} operations")]
    TooManyOps {
        /// Configured maximum number of operations
        max: usize,
    },

    /// The tree being rendered into cannot hold children
    #[error("render root is not a container: {0}")]
    InvalidRoot(String),

    /// The attribute serializer failed
    #[error(transparent)]
    Serializer(#[from] AttrError),

    /// The live tree could not be snapshotted
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] DomError),
}

/// Result type alias for diff operations.
pub type DiffResult<T> = Result<T, DiffError>;

/// Failures of the live tree mutation primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// Handle does not refer to a node of this tree
    #[error("node handle is stale or belongs to another tree")]
    StaleNode,

    /// Node is not a child of the given parent
    #[error("node is not a child of the given parent")]
    NotAChild,

    /// Insertion would create a cycle or otherwise break the hierarchy
    #[error("hierarchy request error: {0}")]
    Hierarchy(String),

    /// Attribute operation on a node that is not an element
    #[error("node is not an element")]
    NotAnElement,
}

/// Why a single edit operation could not be applied.
#[derive(Debug, Error)]
pub enum ApplyErrorKind {
    /// Path does not lead to a node of the live tree
    #[error("path {path} does not resolve in the live tree")]
    Unresolved {
        /// The unresolved path
        path: Path,
    },

    /// Modify path without an attribute segment
    #[error("path {path} names no attribute")]
    MissingAttribute {
        /// The offending path
        path: Path,
    },

    /// Target node has no parent to detach it from
    #[error("node at path {path} has no parent")]
    Orphan {
        /// The offending path
        path: Path,
    },

    /// A live tree primitive failed
    #[error(transparent)]
    Dom(#[from] DomError),

    /// The attribute serializer failed
    #[error(transparent)]
    Serializer(#[from] AttrError),
}

/// An edit script stopped part way through.
///
/// Operations before `index` stay applied; nothing is rolled back.
#[derive(Debug, Error)]
#[error("operation #{index} failed after {applied} applied operation(s): {kind}")]
pub struct ApplyError {
    /// Position of the failing operation in the script
    pub index: usize,
    /// Number of operations that completed before the failure
    pub applied: usize,
    /// What went wrong
    #[source]
    pub kind: ApplyErrorKind,
}

impl ApplyError {
    /// Create an error for the operation at `index`.
    pub fn at(index: usize, kind: ApplyErrorKind) -> Self {
        Self {
            index,
            applied: index,
            kind,
        }
    }
}

/// Result type alias for patch operations.
pub type ApplyResult<T> = Result<T, ApplyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiffError::DepthExceeded { max: 3 };
        assert_eq!(err.to_string(), "tree depth exceeds the configured maximum of 3");

        let err = DiffError::ReservedCharacter {
            kind: "attribute",
            name: "a.b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "attribute name \"a.b\" contains a reserved path separator"
        );

        let err = ApplyError::at(
            2,
            ApplyErrorKind::Unresolved {
                path: Path::from("/children#4"),
            },
        );
        assert_eq!(
            err.to_string(),
            "operation #2 failed after 2 applied operation(s): path /children#4 does not resolve in the live tree"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DiffError>();
        assert_send_sync::<ApplyError>();
        assert_send_sync::<DomError>();
    }
}
