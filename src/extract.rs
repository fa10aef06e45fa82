//! Multi-format text extraction for uploaded course material.
//!
//! Dispatches on file extension: PDF page text, Word paragraphs and tables,
//! slide-deck shapes and tables, and a heuristic-encoding fallback for
//! everything else. Every path ends in the same normalization (printable
//! whitelist, whitespace collapse, trim) and minimum-length policy.
//!
//! [`ingest_file`] never fails: failures become an [`Extraction::Failed`]
//! outcome, which [`Extraction::into_content`] renders as sentinel text so
//! downstream chunking always sees a non-empty record.

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::models::{SourceRecord, SourceType};

/// Content stored when extraction produced too little text.
pub const NO_CONTENT_SENTINEL: &str = "No readable educational content could be extracted.";
/// Prefix of the content stored when extraction failed.
pub const EXTRACTION_ERROR_PREFIX: &str = "Error extracting content:";
/// Normalized text shorter than this (in characters) is replaced by
/// [`NO_CONTENT_SENTINEL`].
pub const MIN_CONTENT_CHARS: usize = 20;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Elements whose end starts a new line: paragraphs and table cells.
const BLOCK_ELEMENTS: &[&[u8]] = &[b"p", b"tc"];

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
}

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Normalized text of at least [`MIN_CONTENT_CHARS`] characters.
    Text(String),
    /// The document held no usable text.
    Empty,
    Failed(String),
}

impl Extraction {
    /// Classify raw extracted text after normalization.
    pub fn from_raw(raw: &str) -> Self {
        let text = normalize_text(raw);
        if text.chars().count() < MIN_CONTENT_CHARS {
            Extraction::Empty
        } else {
            Extraction::Text(text)
        }
    }

    /// Stored content for this outcome; never empty.
    pub fn into_content(self) -> String {
        match self {
            Extraction::Text(text) => text,
            Extraction::Empty => NO_CONTENT_SENTINEL.to_string(),
            Extraction::Failed(message) => format!("{} {}", EXTRACTION_ERROR_PREFIX, message),
        }
    }
}

/// Extract a file on local disk into a new [`SourceRecord`].
///
/// `source_path` of the record is the path as given.
pub fn ingest_file(path: &Path) -> SourceRecord {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let source_type = SourceType::from_extension(&ext);

    let outcome = match std::fs::read(path) {
        Ok(bytes) => extract_bytes(&bytes, &source_type),
        Err(e) => Extraction::Failed(ExtractError::Io(e).to_string()),
    };

    match &outcome {
        Extraction::Text(text) => {
            debug!(path = %path.display(), chars = text.len(), "extracted text")
        }
        Extraction::Empty => warn!(path = %path.display(), "no readable content"),
        Extraction::Failed(message) => {
            warn!(path = %path.display(), error = %message, "extraction failed")
        }
    }

    SourceRecord::new(
        source_type,
        path.to_string_lossy().to_string(),
        outcome.into_content(),
    )
}

/// Extract in-memory bytes of the given format.
pub fn extract_bytes(bytes: &[u8], source_type: &SourceType) -> Extraction {
    let raw = match source_type {
        SourceType::Pdf => extract_pdf(bytes),
        SourceType::Docx => extract_docx(bytes),
        SourceType::Pptx => extract_pptx(bytes),
        SourceType::Text(_) | SourceType::Other(_) | SourceType::Website => Ok(decode_text(bytes)),
    };
    match raw {
        Ok(text) => Extraction::from_raw(&text),
        Err(e) => Extraction::Failed(e.to_string()),
    }
}

/// Replace characters outside the printable ASCII / Latin-1 whitelist with
/// spaces, collapse whitespace runs, and trim.
pub fn normalize_text(raw: &str) -> String {
    let filtered: String = raw
        .trim()
        .chars()
        .map(|c| if is_allowed_char(c) { c } else { ' ' })
        .collect();
    collapse_whitespace(&filtered)
}

fn is_allowed_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | ' '..='~' | '\u{80}'..='\u{FF}')
}

/// Collapse every whitespace run to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode bytes of unknown encoding, dropping anything undecodable.
fn decode_text(bytes: &[u8]) -> String {
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = actual.name(), "dropped undecodable bytes");
    }
    text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect()
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // pdf-extract panics on some malformed documents
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked on malformed document".to_string())),
    }
}

type ZipReader<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_zip(bytes: &[u8]) -> Result<ZipReader<'_>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut ZipReader<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Word document: body paragraphs and table cells in document order, one per line.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_zip(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    collect_run_text(&xml, BLOCK_ELEMENTS)
}

/// Slide deck: text of every shape and table cell, slides in numeric order.
fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_zip(bytes)?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut parts = Vec::with_capacity(slide_names.len());
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let text = collect_run_text(&xml, BLOCK_ELEMENTS)?;
        if !text.trim().is_empty() {
            parts.push(text);
        }
    }
    Ok(parts.join("\n"))
}

/// Concatenate the text of every `<*:t>` element; a newline is emitted when
/// any element named in `breaks` closes. `<*:tab>` becomes a space and
/// `<*:br>` a newline.
fn collect_run_text(xml: &[u8], breaks: &[&[u8]]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push(' '),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_text = false;
                } else if breaks.contains(&name.as_ref()) && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
