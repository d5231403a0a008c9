//! Text extraction from PDF, DOCX and plain-text files.
//!
//! The rest of the crate treats the result as an opaque string plus a page
//! count hint. PDF pages are separated by [`PAGE_BREAK_MARKER`] so that
//! pagination can follow the source's own pages.

use crate::error::{ReadError, Result};
use crate::library::DocumentKind;
use crate::text::PAGE_BREAK_MARKER;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Raw text of a document and its page count.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub text: String,
    pub page_count: usize,
    pub kind: DocumentKind,
}

/// Extract text from a file, choosing the format by extension.
pub fn extract(path: &Path) -> Result<Extracted> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let kind = DocumentKind::from_extension(&extension)
        .ok_or_else(|| ReadError::UnsupportedFormat(extension.clone()))?;

    let bytes = std::fs::read(path).map_err(|e| ReadError::Extraction {
        format: kind.as_str().to_uppercase(),
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;
    extract_bytes(&bytes, kind)
}

/// Extract text from file contents of a known kind.
pub fn extract_bytes(bytes: &[u8], kind: DocumentKind) -> Result<Extracted> {
    let extracted = match kind {
        DocumentKind::Pdf => extract_pdf(bytes)?,
        DocumentKind::Docx => Extracted {
            text: extract_docx(bytes)?,
            page_count: 1,
            kind,
        },
        DocumentKind::Txt => Extracted {
            text: String::from_utf8_lossy(bytes).into_owned(),
            page_count: 1,
            kind,
        },
    };
    log::debug!(
        "extract: {} -> {} bytes of text, {} page(s)",
        kind,
        extracted.text.len(),
        extracted.page_count
    );
    Ok(extracted)
}

fn pdf_error(message: impl ToString) -> ReadError {
    ReadError::Extraction {
        format: "PDF".to_string(),
        message: message.to_string(),
    }
}

fn docx_error(message: impl ToString) -> ReadError {
    ReadError::Extraction {
        format: "DOCX".to_string(),
        message: message.to_string(),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<Extracted> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(pdf_error)?;
    let pages = pdf_pages(&text);
    Ok(Extracted {
        text: join_pdf_pages(&pages),
        page_count: pages.len().max(1),
        kind: DocumentKind::Pdf,
    })
}

/// Non-blank pages. The extractor separates pages with form feeds.
fn pdf_pages(text: &str) -> Vec<&str> {
    text.split('\x0C')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect()
}

/// Join page texts, marking every boundary between two pages.
fn join_pdf_pages(pages: &[&str]) -> String {
    let mut text = String::new();
    for (i, page) in pages.iter().enumerate() {
        text.push_str(page);
        text.push_str("\n\n");
        if i + 1 < pages.len() {
            text.push_str(PAGE_BREAK_MARKER);
            text.push('\n');
        }
    }
    text
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(docx_error)?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| docx_error("word/document.xml not found"))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(docx_error)?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(docx_error("word/document.xml exceeds size limit"));
    }
    docx_paragraphs(&xml)
}

/// Text runs of `w:p` paragraphs, one blank line between paragraphs.
fn docx_paragraphs(xml: &[u8]) -> Result<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                current.push_str(&te.unescape().map_err(docx_error)?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(docx_error(e)),
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_unsupported_extension() {
        let err = extract(Path::new("book.epub")).unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedFormat(ref ext) if ext == "epub"));
        assert!(err.is_user_visible());
    }

    #[test]
    fn test_missing_extension_is_unsupported() {
        assert!(matches!(
            extract(Path::new("README")),
            Err(ReadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_txt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.TXT");
        std::fs::write(&path, "Hello there.\n\nSecond paragraph.").unwrap();

        let extracted = extract(&path).unwrap();
        assert_eq!(extracted.text, "Hello there.\n\nSecond paragraph.");
        assert_eq!(extracted.page_count, 1);
        assert_eq!(extracted.kind, DocumentKind::Txt);
    }

    #[test]
    fn test_missing_file_is_extraction_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = extract(&temp_dir.path().join("gone.txt")).unwrap_err();
        assert!(matches!(err, ReadError::Extraction { ref format, .. } if format == "TXT"));
    }

    #[test]
    fn test_invalid_pdf() {
        let err = extract_bytes(b"not a pdf", DocumentKind::Pdf).unwrap_err();
        assert!(matches!(err, ReadError::Extraction { ref format, .. } if format == "PDF"));
    }

    #[test]
    fn test_invalid_docx() {
        let err = extract_bytes(b"not a zip", DocumentKind::Docx).unwrap_err();
        assert!(matches!(err, ReadError::Extraction { ref format, .. } if format == "DOCX"));
    }

    #[test]
    fn test_docx_without_document_xml() {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(extract_bytes(&bytes, DocumentKind::Docx).is_err());
    }

    #[test]
    fn test_docx_paragraphs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>paragraph.</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Tom &amp; Jerry.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let extracted = extract_bytes(&docx_with(xml), DocumentKind::Docx).unwrap();
        assert_eq!(extracted.text, "First paragraph.\n\nTom & Jerry.");
        assert_eq!(extracted.page_count, 1);
    }

    #[test]
    fn test_pdf_pages_split_on_form_feed() {
        let pages = pdf_pages("One.\n\x0C\n Two. \x0C  \x0C");
        assert_eq!(pages, vec!["One.", "Two."]);
        assert!(pdf_pages("  ").is_empty());
    }

    #[test]
    fn test_join_pdf_pages_marks_boundaries() {
        let text = join_pdf_pages(&["One.", "Two."]);
        assert_eq!(text, "One.\n\n<!-- PAGE_BREAK -->\nTwo.\n\n");
        assert_eq!(text.matches(PAGE_BREAK_MARKER).count(), 1);
    }
}
