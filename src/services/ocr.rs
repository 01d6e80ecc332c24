//! Tesseract OCR through the command line
//!
//! Images go straight to `tesseract`; PDFs are first rendered to PNG pages
//! with `pdftoppm` (poppler-utils) in a scratch directory.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tempfile::TempDir;
use tracing::debug;

use crate::config::Config;
use crate::error::ExtractionError;

/// Page rendering resolution handed to pdftoppm
const RENDER_DPI: &str = "300";

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tesseract: String,
    pdftoppm: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self::with_binaries("tesseract", "pdftoppm", language)
    }

    /// Uses the given executables instead of the ones on PATH
    pub fn with_binaries(
        tesseract: impl Into<String>,
        pdftoppm: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            tesseract: tesseract.into(),
            pdftoppm: pdftoppm.into(),
            language: language.into(),
        }
    }

    /// None when OCR is switched off
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .ocr_enabled
            .then(|| Self::new(config.ocr_language.clone()))
    }

    pub fn image_text(&self, image: &Path) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|e| launch_error(&self.tesseract, "tesseract-ocr", e))?;

        if !output.status.success() {
            return Err(ExtractionError::Ocr(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!(
            "OCR of {} took {}ms",
            image.display(),
            start.elapsed().as_millis()
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Renders every page and OCRs them in page order
    pub fn pdf_text(&self, pdf: &Path) -> Result<String, ExtractionError> {
        let pages_dir = TempDir::new()?;
        let status = Command::new(&self.pdftoppm)
            .args(["-png", "-r", RENDER_DPI])
            .arg(pdf)
            .arg(pages_dir.path().join("page"))
            .status()
            .map_err(|e| launch_error(&self.pdftoppm, "poppler-utils", e))?;
        if !status.success() {
            return Err(ExtractionError::Ocr(
                "pdftoppm failed to render the PDF".to_string(),
            ));
        }

        let pages = rendered_pages(pages_dir.path())?;
        if pages.is_empty() {
            return Err(ExtractionError::Ocr("pdftoppm rendered no pages".to_string()));
        }
        debug!("Rendered {} page(s) of {}", pages.len(), pdf.display());

        let mut text = String::new();
        for page in &pages {
            text.push_str(&self.image_text(page)?);
            text.push('\n');
        }
        Ok(text)
    }
}

/// PNGs written by pdftoppm; names share one zero-padded width (page-01.png)
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    pages.sort();
    Ok(pages)
}

fn launch_error(binary: &str, package: &str, err: io::Error) -> ExtractionError {
    if err.kind() == io::ErrorKind::NotFound {
        ExtractionError::OcrUnavailable(format!("{} not found (install {})", binary, package))
    } else {
        ExtractionError::Io(err)
    }
}
