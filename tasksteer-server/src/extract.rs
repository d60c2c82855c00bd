//! Raw text extraction from uploaded transcripts.
//!
//! The format is chosen by file extension. PDF and DOCX decoding is
//! CPU-bound and runs on the blocking pool.

use std::io::{Cursor, Read};

use quick_xml::events::Event;

/// Longest sanitized filename kept.
const MAX_FILENAME_LEN: usize = 100;

/// Text extraction failures.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}.")]
    Unsupported(String),
    #[error("File is empty or text could not be extracted.")]
    Empty,
    #[error("Text file is not valid UTF-8.")]
    InvalidUtf8,
    #[error("Could not read PDF: {0}")]
    Pdf(String),
    #[error("Could not read DOCX: {0}")]
    Docx(String),
    /// The decompressed document is bigger than allowed.
    #[error("Document expands beyond the {0} byte limit.")]
    TooLarge(usize),
    /// The decoder crashed.
    #[error("document decoder failed: {0}")]
    Panicked(String),
}

/// Supported transcript formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Picks the format from the (case-insensitive) extension.
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Some(Self::Docx)
        } else if lower.ends_with(".txt") {
            Some(Self::Text)
        } else {
            None
        }
    }
}

/// Removes path components and special characters from a client filename.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let sanitized: String = base
        .chars()
        .filter(|&c| c != '\0')
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect();
    let sanitized = sanitized.trim_start_matches('.').to_string();

    if sanitized.is_empty() {
        "document".into()
    } else {
        sanitized
    }
}

/// Extracts plain text from an uploaded file.
///
/// # Errors
///
/// Returns [`ExtractError::Unsupported`] for unknown extensions,
/// [`ExtractError::TooLarge`] when a DOCX body inflates past `max_len`
/// bytes, [`ExtractError::Empty`] when nothing but whitespace comes out,
/// and a decoder-specific error otherwise.
pub async fn extract_text(
    filename: &str,
    bytes: Vec<u8>,
    max_len: usize,
) -> Result<String, ExtractError> {
    let kind = DocumentKind::from_filename(filename)
        .ok_or_else(|| ExtractError::Unsupported(filename.to_string()))?;

    let text = match kind {
        DocumentKind::Text => decode_text(&bytes)?,
        DocumentKind::Pdf | DocumentKind::Docx => {
            tokio::task::spawn_blocking(move || decode_binary(kind, &bytes, max_len))
                .await
                .map_err(|e| ExtractError::Panicked(e.to_string()))??
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    tracing::debug!(filename, chars = text.len(), "transcript text extracted");
    Ok(text)
}

fn decode_binary(kind: DocumentKind, bytes: &[u8], max_len: usize) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Pdf => decode_pdf(bytes),
        DocumentKind::Docx => decode_docx(bytes, max_len),
        DocumentKind::Text => decode_text(bytes),
    }
}

fn decode_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ExtractError::InvalidUtf8)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

fn decode_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Collects the text runs of `word/document.xml`, one line per paragraph.
///
/// The part is never inflated past `max_len` bytes, whatever its header
/// claims.
fn decode_docx(bytes: &[u8], max_len: usize) -> Result<String, ExtractError> {
    let limit = u64::try_from(max_len).unwrap_or(u64::MAX);
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let part = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if part.size() > limit {
        return Err(ExtractError::TooLarge(max_len));
    }

    let mut xml = String::new();
    part.take(limit.saturating_add(1))
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() > max_len {
        return Err(ExtractError::TooLarge(max_len));
    }
    docx_xml_to_text(&xml)
}

fn docx_xml_to_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader
            .read_event()
            .map_err(|e| ExtractError::Docx(e.to_string()))?
        {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}
