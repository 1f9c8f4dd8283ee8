//! Subscriber setup shared by the provider binary and its tests.

pub mod tracing;

pub use tracing::Tracing;
