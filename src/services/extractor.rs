//! Text extraction - service layer
//!
//! `TextExtractor` is the seam the pipeline calls. `LocalTextExtractor`
//! reads text layers and the zip+XML office formats itself and hands
//! images, and PDFs without a text layer, to an optional OCR backend.

use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::ExtractionError;
use crate::models::document::extension_of;
use crate::services::ocr::TesseractOcr;
use crate::services::rtf::rtf_to_text;

/// Turns an uploaded document into plain text.
///
/// `path` points at a scoped copy of `bytes` whose suffix matches the
/// upload. Implementations are called on the blocking pool.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Which XML elements carry text and which end a block (paragraph, slide line)
struct XmlTextLayout {
    text: &'static [&'static [u8]],
    block: &'static [&'static [u8]],
}

const DOCX_LAYOUT: XmlTextLayout = XmlTextLayout {
    text: &[b"t"],
    block: &[b"p"],
};

// DrawingML: <a:p><a:r><a:t>
const PPTX_LAYOUT: XmlTextLayout = XmlTextLayout {
    text: &[b"t"],
    block: &[b"p"],
};

// ODF text lives directly inside <text:p>/<text:h>, possibly under spans
const ODT_LAYOUT: XmlTextLayout = XmlTextLayout {
    text: &[b"p", b"h"],
    block: &[b"p", b"h"],
};

/// Column separator for spreadsheet rows
const CELL_SEPARATOR: &str = "\t";

/// Reads txt/csv, PDF, RTF and the zip+XML office formats; OCR is optional
#[derive(Debug, Default, Clone)]
pub struct LocalTextExtractor {
    ocr: Option<TesseractOcr>,
}

impl LocalTextExtractor {
    /// Without OCR: images fail and image-only PDFs come back empty
    pub fn new() -> Self {
        Self { ocr: None }
    }

    pub fn with_ocr(ocr: TesseractOcr) -> Self {
        Self { ocr: Some(ocr) }
    }

    fn ocr(&self) -> Result<&TesseractOcr, ExtractionError> {
        self.ocr.as_ref().ok_or_else(|| {
            ExtractionError::OcrUnavailable("OCR is disabled (set OCR_ENABLED=true)".to_string())
        })
    }

    fn extract_pdf(&self, path: &Path, bytes: &[u8]) -> Result<String, ExtractionError> {
        let layer = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::Pdf(e.to_string()));
        if let Ok(text) = &layer {
            if !text.trim().is_empty() {
                return layer;
            }
        }
        let Some(ocr) = &self.ocr else {
            return layer;
        };

        match &layer {
            Ok(_) => info!("📷 {} has no text layer, running OCR", path.display()),
            Err(e) => info!("📷 {} could not be parsed ({}), running OCR", path.display(), e),
        }
        ocr.pdf_text(path)
    }
}

impl TextExtractor for LocalTextExtractor {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String, ExtractionError> {
        let extension = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(extension_of)
            .unwrap_or_default();
        debug!("Extracting {} ({} bytes)", path.display(), bytes.len());

        match extension.as_str() {
            ".txt" | ".csv" => {
                let raw = std::fs::read(path)?;
                Ok(String::from_utf8_lossy(&raw).into_owned())
            }
            ".pdf" => self.extract_pdf(path, bytes),
            ".png" | ".jpg" | ".jpeg" => self.ocr()?.image_text(path),
            ".rtf" => Ok(rtf_to_text(bytes)),
            ".docx" => {
                let mut archive = open_archive(path, "DOCX")?;
                let xml = read_entry(&mut archive, "DOCX", "word/document.xml")?;
                collect_xml_text(&xml, &DOCX_LAYOUT).map_err(archive_error("DOCX"))
            }
            ".pptx" => {
                let mut archive = open_archive(path, "PPTX")?;
                let mut text = String::new();
                for slide in numbered_entries(&archive, "ppt/slides/slide") {
                    let xml = read_entry(&mut archive, "PPTX", &slide)?;
                    text.push_str(&collect_xml_text(&xml, &PPTX_LAYOUT).map_err(archive_error("PPTX"))?);
                    text.push('\n');
                }
                Ok(text)
            }
            ".odt" => {
                let mut archive = open_archive(path, "ODT")?;
                let xml = read_entry(&mut archive, "ODT", "content.xml")?;
                collect_xml_text(&xml, &ODT_LAYOUT).map_err(archive_error("ODT"))
            }
            ".xlsx" => {
                let mut archive = open_archive(path, "XLSX")?;
                extract_xlsx(&mut archive)
            }
            other => Err(ExtractionError::Unsupported(if other.is_empty() {
                "files without an extension".to_string()
            } else {
                format!("{} files", other)
            })),
        }
    }
}

fn archive_error(format: &'static str) -> impl Fn(String) -> ExtractionError {
    move |reason| ExtractionError::OfficeArchive { format, reason }
}

fn open_archive(path: &Path, format: &'static str) -> Result<ZipArchive<std::fs::File>, ExtractionError> {
    let file = std::fs::File::open(path)?;
    ZipArchive::new(file).map_err(|e| ExtractionError::OfficeArchive {
        format,
        reason: format!("Failed to open archive: {}", e),
    })
}

/// Entries named `<prefix>N.xml`, sorted by N
fn numbered_entries<R: Read + Seek>(archive: &ZipArchive<R>, prefix: &str) -> Vec<String> {
    let mut entries: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name.strip_prefix(prefix)?.strip_suffix(".xml")?.parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    entries.sort_by_key(|(number, _)| *number);
    entries.into_iter().map(|(_, name)| name).collect()
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    format: &'static str,
    entry: &str,
) -> Result<String, ExtractionError> {
    let mut file = archive
        .by_name(entry)
        .map_err(|e| ExtractionError::OfficeArchive {
            format,
            reason: format!("Failed to find {}: {}", entry, e),
        })?;

    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| ExtractionError::OfficeArchive {
            format,
            reason: format!("Failed to read {}: {}", entry, e),
        })?;
    Ok(xml)
}

// ========== XML text ==========

/// Text carried by a text or entity-reference event
fn event_text(event: &Event<'_>) -> Result<Option<String>, String> {
    match event {
        Event::Text(e) => e
            .decode()
            .map(|text| Some(text.into_owned()))
            .map_err(|err| format!("XML decoding error: {}", err)),
        Event::CData(e) => Ok(Some(String::from_utf8_lossy(e).into_owned())),
        Event::GeneralRef(e) => Ok(resolve_entity(e)),
        _ => Ok(None),
    }
}

/// `&#NN;`, `&#xNN;` and the five predefined XML entities
fn resolve_entity(reference: &BytesRef<'_>) -> Option<String> {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        return Some(ch.to_string());
    }
    let name = reference.decode().ok()?;
    resolve_predefined_entity(&name).map(str::to_string)
}

/// Text runs are joined as written; each block ends a line
fn collect_xml_text(xml: &str, layout: &XmlTextLayout) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut text_depth = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML parsing error: {}", e))?;
        match &event {
            Event::Start(e) => {
                if layout.text.contains(&e.local_name().as_ref()) {
                    text_depth += 1;
                }
            }
            Event::End(e) => {
                let local_name = e.local_name();
                if layout.text.contains(&local_name.as_ref()) {
                    text_depth = text_depth.saturating_sub(1);
                }
                if layout.block.contains(&local_name.as_ref())
                    && !text.is_empty()
                    && !text.ends_with('\n')
                {
                    text.push('\n');
                }
            }
            Event::Eof => break,
            _ => {
                if text_depth > 0 {
                    if let Some(piece) = event_text(&event)? {
                        text.push_str(&piece);
                    }
                }
            }
        }
    }

    Ok(text)
}

// ========== XLSX ==========

/// One line per row, cells separated by tabs, a blank line between sheets
fn extract_xlsx<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, ExtractionError> {
    let shared = if archive.by_name("xl/sharedStrings.xml").is_ok() {
        let xml = read_entry(archive, "XLSX", "xl/sharedStrings.xml")?;
        shared_strings(&xml).map_err(archive_error("XLSX"))?
    } else {
        Vec::new()
    };

    let mut sheets = Vec::new();
    for sheet in numbered_entries(archive, "xl/worksheets/sheet") {
        let xml = read_entry(archive, "XLSX", &sheet)?;
        let rows = sheet_rows(&xml, &shared).map_err(archive_error("XLSX"))?;
        sheets.push(rows.join("\n"));
    }
    Ok(sheets.join("\n\n"))
}

/// `<si>` items in order; rich-text runs are concatenated
fn shared_strings(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML parsing error: {}", e))?;
        match &event {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {
                if in_text {
                    if let Some(piece) = event_text(&event)? {
                        current.push_str(&piece);
                    }
                }
            }
        }
    }

    Ok(strings)
}

/// How a `<c>` element stores its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    SharedString,
    InlineString,
    Value,
}

fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut kind = CellKind::Value;
    let mut value = String::new();
    let mut in_value = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML parsing error: {}", e))?;
        match &event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"c" => {
                    value.clear();
                    kind = match e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.local_name().as_ref() == b"t")
                        .map(|a| a.value.into_owned())
                        .as_deref()
                    {
                        Some(b"s") => CellKind::SharedString,
                        Some(b"inlineStr") => CellKind::InlineString,
                        _ => CellKind::Value,
                    };
                }
                // Inline strings keep their text in <is><t>
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => cells.push(cell_text(kind, &value, shared)),
                b"row" => {
                    let row = std::mem::take(&mut cells);
                    if row.iter().any(|c| !c.is_empty()) {
                        rows.push(row.join(CELL_SEPARATOR));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {
                if in_value {
                    if let Some(piece) = event_text(&event)? {
                        value.push_str(&piece);
                    }
                }
            }
        }
    }

    Ok(rows)
}

fn cell_text(kind: CellKind, value: &str, shared: &[String]) -> String {
    match kind {
        CellKind::SharedString => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| shared.get(index))
            .cloned()
            .unwrap_or_default(),
        CellKind::InlineString | CellKind::Value => value.to_string(),
    }
}
