pub mod admission;
pub mod consolidator;
pub mod extractor;
pub mod intelligence;
pub mod ocr;
pub mod prompts;
pub mod retry;
pub mod rtf;

pub use admission::AdmissionGuard;
pub use consolidator::{Consolidator, DOCUMENT_SEPARATOR};
pub use extractor::{LocalTextExtractor, TextExtractor};
pub use intelligence::{DocumentIntelligence, OpenAiIntelligence};
pub use ocr::TesseractOcr;
