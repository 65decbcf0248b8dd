//! Text extraction from uploaded resumes (PDF, DOCX)

use lazy_static::lazy_static;
use regex::Regex;
use std::io::{Cursor, Read};

use super::error::{RagError, Result};

lazy_static! {
    // <w:t>text</w:t> or <w:t xml:space="preserve">text</w:t>, but not <w:tab/> or <w:tbl>
    static ref DOCX_TEXT_RE: Regex = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").unwrap();
    // &amp; &lt; ... and numeric references like &#8217; or &#x2013;
    static ref XML_ENTITY_RE: Regex =
        Regex::new(r"&(?:#x([0-9A-Fa-f]+)|#([0-9]+)|(lt|gt|quot|apos|amp));").unwrap();
}

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Detect the kind from the file extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Ok(DocumentKind::Pdf)
        } else if lower.ends_with(".docx") {
            Ok(DocumentKind::Docx)
        } else {
            Err(RagError::UnsupportedFileType(filename.to_string()))
        }
    }
}

/// Extract raw text from file bytes.
///
/// Returns whatever the parser produced, which may be blank for image-only
/// documents; callers decide whether that is an error.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Pdf => extract_pdf(bytes),
        DocumentKind::Docx => extract_docx(bytes),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| RagError::Extraction(format!("PDF: {}", e)))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RagError::Extraction(format!("DOCX: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| RagError::Extraction(format!("DOCX: {}", e)))?
        .read_to_string(&mut xml)?;

    Ok(docx_paragraphs(&xml).join("\n"))
}

fn docx_paragraphs(xml: &str) -> Vec<String> {
    xml.split("</w:p>")
        .map(|paragraph| {
            DOCX_TEXT_RE
                .captures_iter(paragraph)
                .map(|c| unescape_xml(&c[1]))
                .collect::<String>()
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Single pass, so `&amp;lt;` stays `&lt;`. Invalid code points are left as written.
fn unescape_xml(s: &str) -> String {
    XML_ENTITY_RE
        .replace_all(s, |caps: &regex::Captures| {
            let code = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok()
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse::<u32>().ok()
            } else {
                return match &caps[3] {
                    "lt" => "<",
                    "gt" => ">",
                    "quot" => "\"",
                    "apos" => "'",
                    _ => "&",
                }
                .to_string();
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Collapse all whitespace (including line breaks) into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
