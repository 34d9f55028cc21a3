//! Object store backends
//!
//! Two implementations of the [`newscast_core::ObjectStore`] seam: an S3
//! (or S3-compatible) backend for deployments and an in-memory map for
//! tests and local smoke runs.

pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStore;
pub use s3::{S3Config, S3ObjectStore};
