//! Document library: documents, active selection, reading positions and bookmarks.

mod sample;
pub mod store;
mod types;

pub use sample::SAMPLE_TITLE;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, default_data_dir};
pub use types::{Bookmark, Document, DocumentKind, ReadingPosition};

use crate::error::{ReadError, Result};
use crate::extract::Extracted;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

const DOCUMENTS_KEY: &str = "documents";
const ACTIVE_DOCUMENT_KEY: &str = "active_document";
const POSITION_KEY_PREFIX: &str = "position_";
const BOOKMARK_KEY_PREFIX: &str = "bookmarks_";

fn position_key(document_id: &str) -> String {
    format!("{}{}", POSITION_KEY_PREFIX, document_id)
}

fn bookmark_key(document_id: &str) -> String {
    format!("{}{}", BOOKMARK_KEY_PREFIX, document_id)
}

/// Generate a unique document id.
fn generate_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// The document library on top of a key-value store.
pub struct Library {
    store: Box<dyn KeyValueStore>,
}

impl Library {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Library backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ReadError::Persistence(format!("Corrupt value for {}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store.set(key, value)
    }

    /// All documents in the order they were added.
    pub fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.load(DOCUMENTS_KEY)?.unwrap_or_default())
    }

    pub fn document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self
            .documents()?
            .into_iter()
            .find(|doc| doc.id == document_id))
    }

    /// Store an extracted document under a new id.
    pub fn add(&mut self, title: &str, extracted: Extracted) -> Result<Document> {
        if extracted.text.trim().is_empty() || title.trim().is_empty() {
            return Err(ReadError::Extraction {
                format: extracted.kind.as_str().to_uppercase(),
                message: "document must have text and a title".to_string(),
            });
        }

        let document = Document {
            id: generate_document_id(),
            title: title.to_string(),
            text: extracted.text,
            page_count: extracted.page_count,
            kind: extracted.kind,
            date_added: Utc::now(),
        };

        let mut documents = self.documents()?;
        documents.push(document.clone());
        self.save(DOCUMENTS_KEY, &documents)?;

        log::info!("library: added \"{}\" ({})", document.title, document.id);
        Ok(document)
    }

    /// Remove a document together with its bookmarks and reading position.
    ///
    /// Returns false if no such document exists. If it was active, the first
    /// remaining document becomes active.
    pub fn remove(&mut self, document_id: &str) -> Result<bool> {
        let documents = self.documents()?;
        let remaining: Vec<Document> = documents
            .iter()
            .filter(|doc| doc.id != document_id)
            .cloned()
            .collect();

        if remaining.len() == documents.len() {
            return Ok(false);
        }

        self.save(DOCUMENTS_KEY, &remaining)?;

        if self.active_document_id()?.as_deref() == Some(document_id) {
            self.set_active_document_id(remaining.first().map(|doc| doc.id.as_str()))?;
        }

        self.store.remove(&position_key(document_id))?;
        self.store.remove(&bookmark_key(document_id))?;

        log::info!("library: removed {}", document_id);
        Ok(true)
    }

    pub fn active_document_id(&self) -> Result<Option<String>> {
        self.load(ACTIVE_DOCUMENT_KEY)
    }

    fn set_active_document_id(&mut self, document_id: Option<&str>) -> Result<()> {
        match document_id {
            Some(id) => self.save(ACTIVE_DOCUMENT_KEY, &id),
            None => self.store.remove(ACTIVE_DOCUMENT_KEY),
        }
    }

    /// Make a document active.
    pub fn set_active(&mut self, document_id: &str) -> Result<Document> {
        let document = self
            .document(document_id)?
            .ok_or_else(|| ReadError::DocumentNotFound(document_id.to_string()))?;
        self.set_active_document_id(Some(document_id))?;
        Ok(document)
    }

    /// The active document, falling back to (and activating) the first one.
    pub fn active_document(&mut self) -> Result<Option<Document>> {
        if let Some(id) = self.active_document_id()? {
            if let Some(document) = self.document(&id)? {
                return Ok(Some(document));
            }
        }

        match self.documents()?.into_iter().next() {
            Some(first) => {
                self.set_active_document_id(Some(&first.id))?;
                Ok(Some(first))
            }
            None => Ok(None),
        }
    }

    /// Seed the welcome document into an empty library and make it active.
    pub fn ensure_seeded(&mut self) -> Result<Option<Document>> {
        if !self.documents()?.is_empty() {
            return Ok(None);
        }
        let (title, extracted) = sample::sample_document();
        let document = self.add(&title, extracted)?;
        self.set_active_document_id(Some(&document.id))?;
        Ok(Some(document))
    }

    pub fn save_position(&mut self, document_id: &str, position: &ReadingPosition) -> Result<()> {
        self.save(&position_key(document_id), position)
    }

    pub fn position(&self, document_id: &str) -> Result<Option<ReadingPosition>> {
        self.load(&position_key(document_id))
    }

    /// Bookmarks of a document, oldest first.
    pub fn bookmarks(&self, document_id: &str) -> Result<Vec<Bookmark>> {
        Ok(self.load(&bookmark_key(document_id))?.unwrap_or_default())
    }

    pub fn add_bookmark(&mut self, bookmark: Bookmark) -> Result<()> {
        let key = bookmark_key(&bookmark.document_id);
        let mut bookmarks = self.bookmarks(&bookmark.document_id)?;
        bookmarks.push(bookmark);
        self.save(&key, &bookmarks)
    }

    /// Delete a bookmark by its position in [`Library::bookmarks`].
    pub fn remove_bookmark(&mut self, document_id: &str, index: usize) -> Result<Option<Bookmark>> {
        let mut bookmarks = self.bookmarks(document_id)?;
        if index >= bookmarks.len() {
            return Ok(None);
        }
        let removed = bookmarks.remove(index);
        self.save(&bookmark_key(document_id), &bookmarks)?;
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::Cursor;
    use tempfile::TempDir;

    fn txt(text: &str) -> Extracted {
        Extracted {
            text: text.to_string(),
            page_count: 1,
            kind: DocumentKind::Txt,
        }
    }

    #[test]
    fn test_add_and_list() {
        let mut library = Library::in_memory();
        let a = library.add("a.txt", txt("First.")).unwrap();
        let b = library.add("b.txt", txt("Second.")).unwrap();
        assert_ne!(a.id, b.id);

        let documents = library.documents().unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].title, "a.txt");
        assert_eq!(library.document(&b.id).unwrap().unwrap().text, "Second.");
    }

    #[test]
    fn test_add_rejects_empty_text() {
        let mut library = Library::in_memory();
        let err = library.add("blank.txt", txt("   ")).unwrap_err();
        assert!(matches!(err, ReadError::Extraction { .. }));
        assert!(library.documents().unwrap().is_empty());
    }

    #[test]
    fn test_remove_cleans_up_and_moves_active() {
        let mut library = Library::in_memory();
        let a = library.add("a.txt", txt("First.")).unwrap();
        let b = library.add("b.txt", txt("Second.")).unwrap();
        library.set_active(&a.id).unwrap();
        library
            .save_position(&a.id, &ReadingPosition::new(Cursor::start()))
            .unwrap();
        library
            .add_bookmark(Bookmark::new(a.id.clone(), Cursor::start(), "First."))
            .unwrap();

        assert!(library.remove(&a.id).unwrap());
        assert_eq!(library.active_document_id().unwrap(), Some(b.id.clone()));
        assert!(library.position(&a.id).unwrap().is_none());
        assert!(library.bookmarks(&a.id).unwrap().is_empty());
        assert!(!library.remove(&a.id).unwrap());

        assert!(library.remove(&b.id).unwrap());
        assert_eq!(library.active_document_id().unwrap(), None);
    }

    #[test]
    fn test_set_active_unknown_document() {
        let mut library = Library::in_memory();
        assert!(matches!(
            library.set_active("missing"),
            Err(ReadError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_active_document_falls_back_to_first() {
        let mut library = Library::in_memory();
        assert!(library.active_document().unwrap().is_none());
        let a = library.add("a.txt", txt("First.")).unwrap();
        assert_eq!(library.active_document().unwrap().unwrap().id, a.id);
        assert_eq!(library.active_document_id().unwrap(), Some(a.id));
    }

    #[test]
    fn test_seed_only_when_empty() {
        let mut library = Library::in_memory();
        let seeded = library.ensure_seeded().unwrap().unwrap();
        assert_eq!(seeded.title, SAMPLE_TITLE);
        assert_eq!(library.active_document_id().unwrap(), Some(seeded.id));
        assert!(library.ensure_seeded().unwrap().is_none());
        assert_eq!(library.documents().unwrap().len(), 1);
    }

    #[test]
    fn test_bookmarks_keep_creation_order() {
        let mut library = Library::in_memory();
        let doc = library.add("a.txt", txt("One. Two.")).unwrap();
        for snippet in ["one", "two", "three"] {
            library
                .add_bookmark(Bookmark::new(doc.id.clone(), Cursor::start(), snippet))
                .unwrap();
        }

        let removed = library.remove_bookmark(&doc.id, 1).unwrap().unwrap();
        assert_eq!(removed.snippet, "two");
        let snippets: Vec<String> = library
            .bookmarks(&doc.id)
            .unwrap()
            .into_iter()
            .map(|b| b.snippet)
            .collect();
        assert_eq!(snippets, vec!["one", "three"]);
        assert!(library.remove_bookmark(&doc.id, 5).unwrap().is_none());
    }

    #[test]
    fn test_library_on_file_store() {
        let temp_dir = TempDir::new().unwrap();
        let id = {
            let mut library = Library::new(JsonFileStore::open(temp_dir.path()).unwrap());
            library.add("a.txt", txt("Persisted.")).unwrap().id
        };

        let library = Library::new(JsonFileStore::open(temp_dir.path()).unwrap());
        assert_eq!(library.document(&id).unwrap().unwrap().text, "Persisted.");
    }
}
