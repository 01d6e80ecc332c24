pub mod analysis;
pub mod classification;
pub mod document;

pub use analysis::{CategoryContext, ConsolidatedAnalysis, ConsolidationRequest, FileInfo};
pub use classification::{Category, ChannelStats, ChannelSummary, Classification};
pub use document::{FileOutcome, FileTask, StageResult, UploadMeta, ALLOWED_EXTENSIONS};
