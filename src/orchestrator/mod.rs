//! Orchestration layer
//!
//! ## Responsibilities
//!
//! Runs whole requests: admission, the shared deadline, the per-file
//! fan-out and the aggregate responses.
//!
//! ## Modules
//!
//! ### `batch_processor`
//! - one entry point per strategy (single, individual, classify-only, consolidated)
//! - bounded, order-preserving concurrency across files
//! - consolidated phase 2 through the `Consolidator`
//!
//! ### `report`
//! - serialisable response bodies
//!
//! ## Layering
//!
//! ```text
//! server (HTTP handlers)
//!     ↓
//! orchestrator::BatchOrchestrator (Vec<FileTask>)
//!     ↓
//! workflow::FilePipeline (one FileTask)
//!     ↓
//! services (admission / extraction / intelligence / consolidation)
//!     ↓
//! infrastructure (Deadline, ScopedTempFile)
//! ```

pub mod batch_processor;
pub mod report;

pub use batch_processor::BatchOrchestrator;
pub use report::{
    ClassificationEntry, ClassificationReport, ConsolidatedReport, IndividualEntry,
    IndividualReport, SingleFileReport,
};
