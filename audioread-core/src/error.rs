use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Error processing {format}: {message}")]
    Extraction { format: String, message: String },

    #[error("Inconsistent position mapping: {0}")]
    MappingInconsistency(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReadError {
    /// Whether the error should be shown to the user rather than logged and dropped.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            ReadError::UnsupportedFormat(_)
                | ReadError::Extraction { .. }
                | ReadError::DocumentNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ReadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_message() {
        let err = ReadError::Extraction {
            format: "PDF".to_string(),
            message: "bad xref".to_string(),
        };
        assert_eq!(err.to_string(), "Error processing PDF: bad xref");
        assert!(err.is_user_visible());
    }

    #[test]
    fn test_persistence_is_not_user_visible() {
        assert!(!ReadError::Persistence("disk full".to_string()).is_user_visible());
        assert!(!ReadError::MappingInconsistency("no pages".to_string()).is_user_visible());
    }
}
