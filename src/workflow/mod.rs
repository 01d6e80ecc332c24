pub mod file_ctx;
pub mod file_pipeline;

pub use file_ctx::FileCtx;
pub use file_pipeline::{FilePipeline, StageMode};
