//! Core data models used throughout Sahayak.
//!
//! These types represent the records, chunks, and responses that flow
//! through the ingestion and retrieval pipeline. Only [`SourceRecord`] is
//! persisted; everything else is rebuilt per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extensions decoded as plain text (everything else unknown falls back to
/// [`SourceType::Other`], which decodes the same way).
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "csv", "log", "md", "json", "py", "html", "xml", "rtf",
];

/// Format tag of an ingested record.
///
/// Serialized as the lowercase extension string (`"pdf"`, `"txt"`,
/// `"website"`, ...), which is also what citations render in upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    Pdf,
    Docx,
    Pptx,
    /// Plain-text-like file; carries its extension.
    Text(String),
    Website,
    /// Unknown extension (possibly empty), decoded as raw text.
    Other(String),
}

impl SourceType {
    /// Classify a file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => SourceType::Pdf,
            "docx" => SourceType::Docx,
            "pptx" | "ppt" => SourceType::Pptx,
            e if TEXT_EXTENSIONS.contains(&e) => SourceType::Text(ext),
            _ => SourceType::Other(ext),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Docx => "docx",
            SourceType::Pptx => "pptx",
            SourceType::Website => "website",
            SourceType::Text(ext) | SourceType::Other(ext) => ext,
        }
    }
}

impl From<String> for SourceType {
    fn from(tag: String) -> Self {
        if tag == "website" {
            SourceType::Website
        } else {
            SourceType::from_extension(&tag)
        }
    }
}

impl From<SourceType> for String {
    fn from(tag: SourceType) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingested unit of knowledge, as stored in the knowledge file.
///
/// `content` is never empty: failed or degenerate extractions carry a
/// sentinel string instead (see [`crate::extract`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source_id: String,
    pub source_type: SourceType,
    pub source_path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<DateTime<Utc>>,
}

impl SourceRecord {
    /// Create a record with a fresh UUID and the current timestamp.
    pub fn new(source_type: SourceType, source_path: impl Into<String>, content: String) -> Self {
        Self {
            source_id: uuid::Uuid::new_v4().to_string(),
            source_type,
            source_path: source_path.into(),
            content,
            ingested_at: Some(Utc::now()),
        }
    }
}

/// A sentence-aligned slice of one record's content.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position in the full chunk sequence of the collection.
    pub chunk_index: usize,
    pub text: String,
    pub source_type: SourceType,
    pub source_path: String,
}

/// What kind of learning material to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Worksheet,
    Assessment,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Worksheet => "worksheet",
            Mode::Assessment => "assessment",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worksheet" => Ok(Mode::Worksheet),
            "assessment" => Ok(Mode::Assessment),
            other => Err(format!(
                "unknown mode '{}': expected worksheet or assessment",
                other
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of [`crate::pipeline::Pipeline::ask`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Response of [`crate::pipeline::Pipeline::generate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub result: String,
}
