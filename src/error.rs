use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for repair operations.
pub type Result<T> = std::result::Result<T, RepairError>;

/// Error type for segment store and repair operations.
#[derive(Debug, Error)]
pub enum RepairError {
    /// I/O failure while opening, reading, deleting, writing or committing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// On-disk state that cannot be interpreted (bad magic, checksum
    /// mismatch, truncated record).
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// The path does not reference a valid graph store root.
    #[error("not a graph store root: {0}")]
    InvalidStoreRoot(PathBuf),
    /// No document carries the requested identifier in this segment.
    #[error("no document for entity {entity_id} in segment {segment}")]
    EntityNotFound {
        /// The entity id that was looked up.
        entity_id: u64,
        /// Display form of the segment directory.
        segment: String,
    },
    /// More than one document carries the same identifier; the segment
    /// violates identifier uniqueness and must not be guessed at.
    #[error("multiple documents for entity {entity_id} in segment {segment}")]
    AmbiguousIdentifier {
        /// The entity id that was looked up.
        entity_id: u64,
        /// Display form of the segment directory.
        segment: String,
    },
    /// Caller-supplied argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RepairError {
    pub(crate) fn entity_not_found(entity_id: u64, segment: &Path) -> Self {
        RepairError::EntityNotFound {
            entity_id,
            segment: segment.display().to_string(),
        }
    }

    pub(crate) fn ambiguous_identifier(entity_id: u64, segment: &Path) -> Self {
        RepairError::AmbiguousIdentifier {
            entity_id,
            segment: segment.display().to_string(),
        }
    }

    /// True when the error is the distinct "nothing to do" condition rather
    /// than an I/O or integrity failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepairError::EntityNotFound { .. })
    }
}
