//! # Sensor Archive
//!
//! Hierarchical, schema-validated containers for structural-engineering
//! measurement data.
//!
//! A container is a tree of named groups and datasets. Groups hold
//! projects and trials; datasets hold one sensor's samples as a typed
//! numeric array. Every node carries typed attributes, and each node kind
//! has a fixed set of required attributes that [`SchemaValidator`] checks.
//! Sealed containers are written to a compact write-once binary archive
//! and reopened with lazy, slice-wise payload reads.
//!
//! ## Modules
//!
//! - [`util`] - Element types, errors and logging setup
//! - [`core`] - Tree, attributes, datasets, node kinds, frames, time bases, validation
//! - [`store`] - Binary archive format, reader and writer
//! - [`container`] - [`Container`] handle tying a tree to its file
//!
//! ## Example
//!
//! ```ignore
//! use sensor_archive::prelude::*;
//!
//! let mut c = Container::create("bridge.sarc", ContainerOptions::default())?;
//! let root = c.root();
//! c.set_attribute(root, "name", "Demo")?;
//! let trial = c.add_group("/", "trial 1")?;
//! let a1 = c.add_dataset("/trial 1", "A1", ElementType::Float64)?;
//! c.finalize(a1, SampleArray::from_slice(&[0.0f64, 0.1, 0.2]))?;
//! c.seal()?;
//!
//! let report = c.validate()?;
//! for (path, errors) in report.iter() {
//!     println!("{}: {} problems", path, errors.len());
//! }
//! ```

pub mod container;
pub mod core;
pub mod store;
pub mod util;

// Re-export commonly used types
pub use crate::container::{Container, ContainerOptions, OpenMode};
pub use crate::core::{
    AttributeValue, ContainerTree, Layout, NodeKind, NodePath, NodeRef, SampleArray,
    SchemaValidator, TimeBaseResolver, TimeBasis, ValidationReport,
};
pub use crate::util::{Chrono, ElementType, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::container::{Container, ContainerOptions, OpenMode};
    pub use crate::core::{
        normalize, AttributeValue, CancelToken, CoordinateFrame, Layout, NodeKind, NodePath,
        NodeRef, SampleArray, SchemaValidator, TimeBaseResolver, TimeBasis, ValidationError,
        ValidationErrorKind, ValidationReport,
    };
    pub use crate::util::{Chrono, ElementType, Error, Result, SamplePod};
}
