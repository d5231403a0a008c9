//! Core library for the audioread workspace
//!
//! Reads documents aloud while keeping three positions in step:
//! - the visual page ([`text::split_into_pages`])
//! - the speech chunk ([`text::split_into_chunks`])
//! - the absolute character offset ([`position::PositionMapping`])
//!
//! [`playback::ReaderController`] owns the live cursor and drives a
//! [`speech::SpeechEngine`]; [`library::Library`] stores documents, reading
//! positions and bookmarks on any [`library::KeyValueStore`].

pub mod error;
pub mod extract;
pub mod library;
pub mod playback;
pub mod position;
pub mod speech;
pub mod text;

pub use error::{ReadError, Result};
pub use extract::{Extracted, extract};
pub use library::{Bookmark, Document, DocumentKind, JsonFileStore, Library, ReadingPosition};
pub use playback::{
    Cursor, Intent, LoadedDocument, Outcome, PlaybackState, ReaderController, ReaderEvent,
    ReaderSettings, SoftFailure,
};
pub use position::{ChunkLocation, PageLocation, PositionMapping};
pub use speech::{SpeechEngine, SpeechEvent, SpeechEventHub, SpeechOptions, Utterance};
