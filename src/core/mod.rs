//! Core layer - the measurement container model.
//!
//! - [`ContainerTree`] - group/dataset hierarchy with per-node attributes
//! - [`AttributeStore`] / [`AttributeValue`] - typed metadata
//! - [`SampleArray`] - dataset payloads, written once, read by slice
//! - [`NodeKind`] - per-kind required-attribute contracts
//! - [`CoordinateFrame`] - project frame for sensor placement vectors
//! - [`TimeBaseResolver`] - sample index to timestamp mapping
//! - [`SchemaValidator`] - contract checking over the whole tree

mod attribute;
mod dataset;
mod frame;
mod kind;
mod path;
mod time_base;
mod tree;
mod validate;

pub use attribute::{AttributeStore, AttributeValue, ValueType};
pub(crate) use dataset::{ArchivedPayload, Payload};
pub use dataset::{DatasetSlot, SampleArray};
pub use frame::{check_placement, normalize, CoordinateFrame};
pub use kind::{
    classify, Expect, Layout, NodeKind, Requirement, COORDINATE_KEY, COORDINATE_SYSTEM_KEY,
    ORIENTATION_KEY, PROJECT_CONTRACT, SAMPLING_INTERVAL_KEY, SENSOR_CONTRACT, START_TIME_KEY,
    TIME_DATASET, TRIAL_CONTRACT,
};
pub use path::NodePath;
pub use time_base::{SensorClock, SensorTimeBasis, TimeBaseResolver, TimeBasis, TimestampIter, Timestamps};
pub(crate) use tree::NodeBody;
pub use tree::{Children, ContainerTree, Node, NodeRef, Walk};
pub use validate::{
    CancelToken, SchemaValidator, TimeBasisIssue, ValidationError, ValidationErrorKind,
    ValidationReport,
};
