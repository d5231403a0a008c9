//! Library data types.

use crate::playback::Cursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    /// Kind for a file extension, case-insensitive.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Txt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Txt => "txt",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document. The text never changes after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    /// Page count reported by the extractor (a hint for pagination)
    pub page_count: usize,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub date_added: DateTime<Utc>,
}

/// Last reading position of a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingPosition {
    #[serde(flatten)]
    pub cursor: Cursor,
    pub timestamp: DateTime<Utc>,
}

impl ReadingPosition {
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            timestamp: Utc::now(),
        }
    }
}

/// A saved place in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub document_id: String,
    #[serde(flatten)]
    pub cursor: Cursor,
    pub timestamp: DateTime<Utc>,
    /// A few words of text at the bookmarked position
    pub snippet: String,
}

impl Bookmark {
    pub fn new(document_id: impl Into<String>, cursor: Cursor, snippet: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            cursor,
            timestamp: Utc::now(),
            snippet: snippet.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_extension("txt"), Some(DocumentKind::Txt));
        assert_eq!(DocumentKind::from_extension("epub"), None);
    }

    #[test]
    fn test_bookmark_json_is_flat() {
        let bookmark = Bookmark::new("doc1", Cursor::start(), "Hello");
        let value = serde_json::to_value(&bookmark).unwrap();
        assert_eq!(value["documentId"], "doc1");
        assert_eq!(value["page"], 1);
        assert_eq!(value["chunk"], 0);
        assert_eq!(value["globalOffset"], 0);
        assert_eq!(value["snippet"], "Hello");

        let back: Bookmark = serde_json::from_value(value).unwrap();
        assert_eq!(back, bookmark);
    }

    #[test]
    fn test_document_kind_serializes_as_type() {
        let doc = Document {
            id: "a".to_string(),
            title: "t".to_string(),
            text: "x.".to_string(),
            page_count: 1,
            kind: DocumentKind::Txt,
            date_added: Utc::now(),
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], "txt");
        assert_eq!(value["pageCount"], 1);
    }
}
