//! Per-format text extraction.
//!
//! Every supported extension maps to one extractor returning plain text and
//! whether the text keeps markdown structure worth splitting on headings.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};

static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("static pattern"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\n+").expect("static pattern"));
static DOC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Document ID\*\*:\s*([A-Z]+-\d+)").expect("static pattern"));

/// Column width handed to the HTML renderer.
const HTML_WIDTH: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Markdown,
    Text,
    Html,
    Pdf,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::Text),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn is_structured(self) -> bool {
        matches!(self, Self::Markdown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub structured: bool,
}

pub fn extract(path: &Path, format: SourceFormat) -> Result<ExtractedText> {
    let text = match format {
        SourceFormat::Markdown => read_text(path)?.replace("\r\n", "\n"),
        SourceFormat::Text => clean_text(&read_text(path)?),
        SourceFormat::Html => {
            let bytes = fs::read(path).map_err(|e| Error::ingestion(path, e))?;
            let rendered = html2text::from_read(&bytes[..], HTML_WIDTH).map_err(|e| Error::ingestion(path, e))?;
            clean_text(&rendered)
        }
        SourceFormat::Pdf => clean_text(&read_pdf(path)?),
    };
    Ok(ExtractedText { text, structured: format.is_structured() })
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::ingestion(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

fn read_pdf(path: &Path) -> Result<String> {
    // pdf-extract panics on some malformed files; treat that like a parse error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::ingestion(path, e)),
        Err(_) => Err(Error::ingestion(path, "PDF parser aborted on malformed input")),
    }
}

/// Collapse space runs and blank-line runs, normalise line endings, trim.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// `POL-001` from a `**Document ID**: POL-001` line, if present.
pub fn doc_id_from_content(content: &str) -> Option<String> {
    DOC_ID.captures(content).map(|c| c[1].to_string())
}

/// Upper-cased file stem (`remote_work.html` -> `REMOTE_WORK`).
pub fn doc_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
