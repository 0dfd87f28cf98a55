//! # Pump Backends
//!
//! Stage capabilities for the block pump:
//!
//! - `file`: enumerator over a newline-separated identifier list
//! - `apipin`: enumerator over the recursive pins of an HTTP API node
//! - `api`: collector and drain using `block/get` and `block/put`
//! - `flatfs`: enumerator, collector and drain over a sharded block directory
//!
//! [`registry`] turns a backend tag and [`BackendOptions`] into a ready
//! capability.

pub mod api;
pub mod error;
pub mod file;
pub mod flatfs;
pub mod registry;

pub use error::{BackendError, Result};
pub use registry::{
    BackendOptions, CollectorKind, CollectorSpec, DrainKind, DrainSpec, EnumeratorKind,
    EnumeratorSpec,
};
