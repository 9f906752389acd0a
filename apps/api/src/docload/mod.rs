//! Document loader — best-effort text extraction from uploaded resume and
//! job-description files.
//!
//! Fallback chain per format: primary extractor, then a secondary extractor
//! using an alternate parsing strategy, then content-signature autodetection
//! with one retry. Only a completely empty result is an error; the caller
//! decides whether that is fatal (resume) or recoverable (optional job file).

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("no text could be extracted from the document ({0})")]
    Empty(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// Declared format from the uploaded filename's extension.
    pub fn from_filename(name: &str) -> Option<Self> {
        let extension = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" | "doc" => Some(DocumentFormat::Docx),
            "txt" | "text" | "md" | "csv" => Some(DocumentFormat::Text),
            _ => None,
        }
    }

    /// Format detection from content signature, for when the declared format
    /// is missing or wrong.
    pub fn from_signature(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(DocumentFormat::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            // DOCX is a zip archive
            Some(DocumentFormat::Docx)
        } else if std::str::from_utf8(bytes).is_ok() {
            Some(DocumentFormat::Text)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Text => "text",
        }
    }
}

/// Extracts text from an uploaded document, running the declared format's
/// chain first and the signature-detected format's chain once as a fallback.
pub fn load(bytes: &[u8], declared: Option<DocumentFormat>) -> Result<String, DocumentLoadError> {
    if let Some(format) = declared {
        if let Some(text) = run_chain(bytes, format) {
            return Ok(text);
        }
    }

    if let Some(detected) = DocumentFormat::from_signature(bytes) {
        if declared != Some(detected) {
            debug!(detected = detected.label(), "retrying with detected format");
            if let Some(text) = run_chain(bytes, detected) {
                return Ok(text);
            }
        }
    }

    let label = declared
        .or_else(|| DocumentFormat::from_signature(bytes))
        .map(DocumentFormat::label)
        .unwrap_or("unknown format");
    Err(DocumentLoadError::Empty(label.to_string()))
}

/// Primary then secondary extractor for one format. `None` means both
/// produced nothing usable.
fn run_chain(bytes: &[u8], format: DocumentFormat) -> Option<String> {
    let primary = match format {
        DocumentFormat::Pdf => pdf_primary(bytes),
        DocumentFormat::Docx => docx_primary(bytes),
        DocumentFormat::Text => text_primary(bytes),
    };
    if let Some(text) = nonblank(primary) {
        return Some(text);
    }

    warn!(
        format = format.label(),
        "primary extractor produced no text, trying secondary"
    );
    let secondary = match format {
        DocumentFormat::Pdf => pdf_secondary(bytes),
        DocumentFormat::Docx => docx_secondary(bytes),
        DocumentFormat::Text => text_secondary(bytes),
    };
    nonblank(secondary)
}

fn nonblank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn pdf_primary(bytes: &[u8]) -> Option<String> {
    pdf_extract::extract_text_from_mem(bytes).ok()
}

/// Alternate PDF strategy: raw page text through lopdf, which tolerates some
/// structural damage pdf-extract rejects.
fn pdf_secondary(bytes: &[u8]) -> Option<String> {
    let document = lopdf::Document::load_mem(bytes).ok()?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return None;
    }
    document.extract_text(&pages).ok()
}

fn docx_primary(bytes: &[u8]) -> Option<String> {
    let xml = docx_document_xml(bytes)?;
    parse_docx_xml(&xml).ok()
}

/// Alternate DOCX strategy: crude tag stripping over the same XML, for
/// archives whose markup the streaming parser chokes on.
fn docx_secondary(bytes: &[u8]) -> Option<String> {
    let xml = docx_document_xml(bytes)?;
    Some(strip_tags(&xml))
}

fn docx_document_xml(bytes: &[u8]) -> Option<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).ok()?;
    let mut entry = archive.by_name("word/document.xml").ok()?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).ok()?;
    Some(xml)
}

fn text_primary(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

fn text_secondary(bytes: &[u8]) -> Option<String> {
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Pulls paragraph text out of WordprocessingML: the content of `w:t` runs,
/// with a newline per `w:p` paragraph.
fn parse_docx_xml(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) => {
                if in_text_run {
                    text.push_str(&e.decode().unwrap_or_default());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

fn strip_tags(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut in_tag = false;
    for c in xml.chars() {
        match c {
            '<' => {
                in_tag = true;
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
    <w:p><w:r><w:t>Senior Rust Engineer</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::FileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_from_filename_maps_known_extensions() {
        assert_eq!(
            DocumentFormat::from_filename("resume.PDF"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_filename("resume.docx"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_filename("resume.md"),
            Some(DocumentFormat::Text)
        );
        assert_eq!(DocumentFormat::from_filename("resume.odt"), None);
        assert_eq!(DocumentFormat::from_filename("noextension"), None);
    }

    #[test]
    fn test_signature_detection() {
        assert_eq!(
            DocumentFormat::from_signature(b"%PDF-1.7 ..."),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_signature(b"PK\x03\x04rest"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_signature(b"plain resume text"),
            Some(DocumentFormat::Text)
        );
        assert_eq!(DocumentFormat::from_signature(&[0xff, 0xfe, 0x00]), None);
    }

    #[test]
    fn test_load_plain_text() {
        let text = load(b"Jane Doe\nRust, Tokio, Axum", Some(DocumentFormat::Text)).unwrap();
        assert!(text.contains("Tokio"));
    }

    #[test]
    fn test_load_docx_through_primary_extractor() {
        let bytes = docx_bytes(SAMPLE_DOCUMENT_XML);
        let text = load(&bytes, Some(DocumentFormat::Docx)).unwrap();
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("Senior Rust Engineer"));
    }

    #[test]
    fn test_load_docx_with_wrong_declared_format_autodetects() {
        // Declared as pdf: both pdf extractors fail on the zip bytes, then
        // the signature retry runs the docx chain.
        let bytes = docx_bytes(SAMPLE_DOCUMENT_XML);
        let text = load(&bytes, Some(DocumentFormat::Pdf)).unwrap();
        assert!(text.contains("Jane Doe"));
    }

    #[test]
    fn test_load_undeclared_format_uses_signature() {
        let text = load(b"just plain text resume", None).unwrap();
        assert_eq!(text, "just plain text resume");
    }

    #[test]
    fn test_empty_chain_is_an_error() {
        // Valid zip, but no extractable text in the document body.
        let bytes = docx_bytes(r#"<w:document xmlns:w="x"><w:body></w:body></w:document>"#);
        let err = load(&bytes, Some(DocumentFormat::Docx)).unwrap_err();
        assert!(matches!(err, DocumentLoadError::Empty(_)));
    }

    #[test]
    fn test_corrupt_pdf_with_no_salvageable_text_is_an_error() {
        let err = load(b"%PDF-1.4 not actually a pdf", Some(DocumentFormat::Pdf)).unwrap_err();
        assert!(matches!(err, DocumentLoadError::Empty(_)));
    }

    #[test]
    fn test_docx_secondary_strips_tags() {
        let stripped = strip_tags("<w:p><w:t>alpha</w:t></w:p><w:t>beta</w:t>");
        assert_eq!(stripped, "alpha beta");
    }

    #[test]
    fn test_parse_docx_xml_decodes_non_ascii_runs() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>Zoë Åström</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = parse_docx_xml(xml).unwrap();
        assert!(text.contains("Zoë Åström"));
    }

    #[test]
    fn test_parse_docx_xml_emits_paragraph_breaks() {
        let text = parse_docx_xml(SAMPLE_DOCUMENT_XML).unwrap();
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(lines, vec!["Jane Doe", "Senior Rust Engineer"]);
    }

    #[test]
    fn test_lossy_text_secondary_recovers_invalid_utf8() {
        let mut bytes = b"Jane ".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b" Doe");
        // Strict utf8 primary fails; lossy secondary still yields the text.
        let text = load(&bytes, Some(DocumentFormat::Text)).unwrap();
        assert!(text.contains("Jane"));
        assert!(text.contains("Doe"));
    }
}
