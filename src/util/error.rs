//! Error types for the sensor archive.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::{NodePath, ValueType};
use crate::util::ElementType;

/// Main error type for archive operations.
///
/// Structural and I/O failures abort the call that raised them. Schema
/// defects found by the validator are reported as
/// [`ValidationError`](crate::core::ValidationError) values instead.
#[derive(Error, Debug)]
pub enum Error {
    // === Structural ===
    /// A sibling with this name already exists
    #[error("Duplicate name '{name}' under {parent}")]
    DuplicateName { parent: NodePath, name: String },

    /// No node at the given path
    #[error("Path not found: {0}")]
    PathNotFound(NodePath),

    /// Parent path names a dataset, which cannot hold children
    #[error("Invalid parent (not a group): {0}")]
    InvalidParent(NodePath),

    /// Node sits above the project level of the container layout
    #[error("No enclosing project for {0}")]
    NoEnclosingProject(NodePath),

    /// Node names must be non-empty and free of '/'
    #[error("Invalid node name: {0:?}")]
    InvalidName(String),

    /// Container is sealed and cannot be modified
    #[error("Container is sealed and cannot be modified")]
    SealedContainer,

    /// Path names a group where a dataset is required
    #[error("Not a dataset: {0}")]
    NotADataset(NodePath),

    /// Dataset payload was already written
    #[error("Dataset already finalized: {0}")]
    AlreadyFinalized(NodePath),

    /// Dataset payload has not been written yet
    #[error("Dataset not finalized: {0}")]
    NotFinalized(NodePath),

    /// Payload element type differs from the dataset declaration
    #[error("Element type mismatch at {path}: declared {expected}, got {actual}")]
    ElementTypeMismatch {
        path: NodePath,
        expected: ElementType,
        actual: ElementType,
    },

    /// Sample bytes do not form whole rows
    #[error("Invalid sample shape: {0}")]
    InvalidShape(String),

    /// Node handle does not belong to this tree
    #[error("Unknown node handle #{0}")]
    UnknownNode(usize),

    /// Container handle was closed
    #[error("Container is closed")]
    Closed,

    // === Schema ===
    /// Attribute key not present on the node
    #[error("Missing attribute '{key}' at {path}")]
    MissingAttribute { path: NodePath, key: String },

    /// Attribute present with the wrong value type
    #[error("Attribute '{key}' at {path}: expected {expected}, got {actual}")]
    AttributeType {
        path: NodePath,
        key: String,
        expected: ValueType,
        actual: ValueType,
    },

    // === Time base ===
    /// Sensor has neither a shared `time` vector nor start/interval attributes
    #[error("Missing time basis: {0}")]
    MissingTimeBasis(NodePath),

    /// Sensor has both a shared `time` vector and start/interval attributes
    #[error("Ambiguous time basis: {0}")]
    AmbiguousTimeBasis(NodePath),

    /// Sensor sample count differs from the shared `time` vector
    #[error("Time length mismatch at {path}: time vector has {expected} samples, dataset has {actual}")]
    TimeLengthMismatch {
        path: NodePath,
        expected: usize,
        actual: usize,
    },

    /// Shared `time` dataset is not a 1-D real vector
    #[error("Invalid time vector: {0}")]
    InvalidTimeVector(NodePath),

    // === Bounds ===
    /// Slice exceeds the dataset length
    #[error("Slice [{start}, {start}+{length}) out of bounds (len: {len})")]
    OutOfBounds {
        start: usize,
        length: usize,
        len: usize,
    },

    // === Frame ===
    /// Zero-length vector cannot be normalized
    #[error("Cannot normalize a zero-length vector")]
    ZeroVector,

    // === I/O ===
    /// Archive file does not exist
    #[error("Archive not found: {0}")]
    NotFound(PathBuf),

    /// Archive bytes are malformed, truncated or fail their digest
    #[error("Corrupt archive: {0}")]
    Corrupt(String),

    /// Access to the archive file was refused
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Validation was cancelled between node visits
    #[error("Validation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a corrupt-archive error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Map an `io::Error` raised while opening `path` onto the backend taxonomy.
    pub fn from_open(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Io(err),
        }
    }

    /// True for the structural family (fail-fast mutation errors).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName { .. }
                | Self::PathNotFound(_)
                | Self::InvalidParent(_)
                | Self::NoEnclosingProject(_)
                | Self::NotADataset(_)
                | Self::InvalidName(_)
                | Self::SealedContainer
                | Self::AlreadyFinalized(_)
                | Self::NotFinalized(_)
                | Self::ElementTypeMismatch { .. }
                | Self::InvalidShape(_)
                | Self::UnknownNode(_)
                | Self::Closed
        )
    }

    /// True for the time-base family.
    pub fn is_time_base(&self) -> bool {
        matches!(
            self,
            Self::MissingTimeBasis(_)
                | Self::AmbiguousTimeBasis(_)
                | Self::TimeLengthMismatch { .. }
                | Self::InvalidTimeVector(_)
        )
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::OutOfBounds { start: 5, length: 4, len: 7 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("7"));

        let e = Error::MissingAttribute {
            path: NodePath::parse("/trial 1/A1"),
            key: "unit".to_string(),
        };
        assert_eq!(e.to_string(), "Missing attribute 'unit' at /trial 1/A1");
    }

    #[test]
    fn test_error_from_open() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        assert!(matches!(Error::from_open(io_err, "x.sarc"), Error::NotFound(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        assert!(matches!(Error::from_open(io_err, "x.sarc"), Error::PermissionDenied(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "test");
        assert!(matches!(Error::from_open(io_err, "x.sarc"), Error::Io(_)));
    }

    #[test]
    fn test_error_families() {
        assert!(Error::SealedContainer.is_structural());
        assert!(!Error::SealedContainer.is_time_base());
        assert!(Error::AmbiguousTimeBasis(NodePath::root()).is_time_base());
        assert!(!Error::corrupt("x").is_structural());
    }
}
