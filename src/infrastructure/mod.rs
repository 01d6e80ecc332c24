//! Infrastructure layer
//!
//! Owns the per-request resources the pipeline consumes: the countdown
//! clock and the scoped on-disk copy of each upload. Knows nothing about
//! categories or analysis.

pub mod deadline;
pub mod temp_storage;

pub use deadline::Deadline;
pub use temp_storage::ScopedTempFile;
