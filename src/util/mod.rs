//! Utility types and functions.
//!
//! - [`ElementType`] / [`SamplePod`] - numeric payload types
//! - [`Error`] / [`Result`] - error handling
//! - [`Chrono`] - time value type
//! - [`logging`] - tracing subscriber setup

mod element;
mod error;
pub mod logging;

pub use element::*;
pub use error::*;

/// Time value type: seconds, 64-bit float.
pub type Chrono = f64;
