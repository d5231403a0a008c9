//! Reader controller: applies user intents and speech events to the cursor.
//!
//! Intents are handled one at a time. Any intent that moves the cursor while
//! speech is active cancels the current utterance before issuing the next
//! one, so the last intent always wins. Engine events carry the id of the
//! utterance they belong to; events for anything but the current utterance
//! are dropped.

use super::Cursor;
use crate::error::Result;
use crate::library::{Bookmark, Document, Library, ReadingPosition};
use crate::position::PositionMapping;
use crate::speech::{SpeechEngine, SpeechEvent, SpeechOptions, Utterance, UtteranceId};
use crate::text::{
    DEFAULT_MAX_CHUNK_SIZE, DEFAULT_WORDS_PER_PAGE, Page, char_len, char_slice, speakable_text,
    split_into_chunks, split_into_pages,
};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Words of text kept with a bookmark.
const SNIPPET_WORDS: usize = 8;

/// Where playback is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No document loaded
    Idle,
    /// Document loaded, not speaking
    Stopped,
    Speaking,
    Paused,
}

impl PlaybackState {
    /// Speaking or paused mid-utterance.
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Speaking | PlaybackState::Paused)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Speaking => "speaking",
            PlaybackState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// A user request.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Play,
    Pause,
    Resume,
    TogglePlayPause,
    Stop,
    Next,
    Previous,
    /// 1-based page number
    GoToPage(usize),
    NextPage,
    PreviousPage,
    /// A word was clicked at this absolute offset
    ClickWord { global_offset: usize },
    AddBookmark,
    /// 0-based index into the document's bookmarks
    JumpToBookmark(usize),
    RemoveBookmark(usize),
    /// Move to the document's saved reading position
    RestorePosition,
    SetRate(f32),
    SetVoice(Option<String>),
}

/// Why an intent could not be applied. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SoftFailure {
    #[error("No document is loaded")]
    NoDocument,

    #[error("The document has no speakable text")]
    NothingToSpeak,

    #[error("Page {requested} is out of range (1-{pages})")]
    PageOutOfRange { requested: usize, pages: usize },

    #[error("Page {0} has no text to read")]
    PageHasNoChunks(usize),

    #[error("No bookmark at index {0}")]
    BookmarkNotFound(usize),

    #[error("No saved reading position")]
    NoSavedPosition,

    #[error("{0}")]
    MappingInconsistency(String),

    #[error("Could not save: {0}")]
    Persistence(String),
}

/// Result of applying an intent or a speech event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Nothing to do, e.g. `Next` on the last chunk
    Unchanged,
    SoftFailure(SoftFailure),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

impl From<SoftFailure> for Outcome {
    fn from(failure: SoftFailure) -> Self {
        Outcome::SoftFailure(failure)
    }
}

/// Notifications for highlighters and other observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    DocumentLoaded {
        document_id: String,
        chunks: usize,
        pages: usize,
    },
    /// The cursor entered a different chunk or page
    CursorMoved(Cursor),
    /// The cursor moved inside the current chunk
    Progress(Cursor),
    StateChanged(PlaybackState),
}

/// Segmentation and speech settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderSettings {
    pub max_chunk_size: usize,
    pub words_per_page: usize,
    pub options: SpeechOptions,
    /// Restore the saved reading position when a document is opened
    pub resume_last_position: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            words_per_page: DEFAULT_WORDS_PER_PAGE,
            options: SpeechOptions::default(),
            resume_last_position: true,
        }
    }
}

/// A document with its chunks, pages and mapping.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: Document,
    pub chunks: Vec<String>,
    pub pages: Vec<Page>,
    pub mapping: PositionMapping,
}

impl LoadedDocument {
    /// Segment a document and index it.
    pub fn prepare(document: Document, settings: &ReaderSettings) -> Self {
        let chunks = split_into_chunks(&speakable_text(&document.text), settings.max_chunk_size);
        let pages = split_into_pages(
            &document.text,
            document.page_count,
            settings.words_per_page,
        );
        let mapping = PositionMapping::build(&chunks, &pages);
        Self {
            document,
            chunks,
            pages,
            mapping,
        }
    }

    pub fn chunk(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(String::as_str)
    }

    pub fn page(&self, page_number: usize) -> Option<&Page> {
        page_number.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    /// A few words starting at the cursor.
    pub fn snippet_at(&self, cursor: &Cursor) -> String {
        self.chunk(cursor.chunk)
            .map(|text| {
                char_slice(text, cursor.offset_within_chunk, usize::MAX)
                    .split_whitespace()
                    .take(SNIPPET_WORDS)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}

/// Owns the cursor and drives a speech engine.
pub struct ReaderController {
    engine: Box<dyn SpeechEngine>,
    library: Library,
    settings: ReaderSettings,
    loaded: Option<LoadedDocument>,
    cursor: Cursor,
    state: PlaybackState,
    current_utterance: Option<UtteranceId>,
    next_utterance: UtteranceId,
    events: broadcast::Sender<ReaderEvent>,
}

impl ReaderController {
    pub fn new(
        engine: impl SpeechEngine + 'static,
        library: Library,
        settings: ReaderSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            engine: Box::new(engine),
            library,
            settings,
            loaded: None,
            cursor: Cursor::start(),
            state: PlaybackState::Idle,
            current_utterance: None,
            next_utterance: 1,
            events,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.loaded.as_ref()
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Observe cursor and state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    /// Subscribe to the engine's events; feed them to [`Self::handle_speech_event`].
    pub fn speech_events(&self) -> broadcast::Receiver<SpeechEvent> {
        self.engine.subscribe()
    }

    /// Bookmarks of the loaded document.
    pub fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        match &self.loaded {
            Some(loaded) => self.library.bookmarks(&loaded.document.id),
            None => Ok(Vec::new()),
        }
    }

    /// Load a document at its beginning, stopping any speech.
    ///
    /// The document is loaded even when it has no chunks or pages; that case
    /// is reported as a soft failure and lookups fall back to defaults.
    pub fn load_document(&mut self, document: Document) -> Outcome {
        self.cancel_speech();

        let loaded = LoadedDocument::prepare(document, &self.settings);
        let check = loaded.mapping.validate();
        log::debug!(
            "reader: loaded {} ({} chunks, {} pages)",
            loaded.document.id,
            loaded.chunks.len(),
            loaded.pages.len()
        );
        self.publish(ReaderEvent::DocumentLoaded {
            document_id: loaded.document.id.clone(),
            chunks: loaded.chunks.len(),
            pages: loaded.pages.len(),
        });
        self.loaded = Some(loaded);
        self.commit(Cursor::start(), false);
        self.set_state(PlaybackState::Stopped);

        match check {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                log::warn!("{}", e);
                SoftFailure::MappingInconsistency(e.to_string()).into()
            }
        }
    }

    /// Make a library document active and load it.
    pub fn open(&mut self, document_id: &str) -> Result<Outcome> {
        let document = self.library.set_active(document_id)?;
        Ok(self.load_and_resume(document))
    }

    /// Load the library's active document, if there is one.
    pub fn open_active(&mut self) -> Result<Outcome> {
        match self.library.active_document()? {
            Some(document) => Ok(self.load_and_resume(document)),
            None => Ok(SoftFailure::NoDocument.into()),
        }
    }

    fn load_and_resume(&mut self, document: Document) -> Outcome {
        let outcome = self.load_document(document);
        if self.settings.resume_last_position {
            if let Outcome::SoftFailure(failure) = self.restore_position() {
                log::debug!("reader: not resuming: {}", failure);
            }
        }
        outcome
    }

    /// Stop speech and unload the document.
    pub fn close(&mut self) {
        self.cancel_speech();
        if self.state.is_active() {
            self.persist_position();
        }
        self.loaded = None;
        self.cursor = Cursor::start();
        self.set_state(PlaybackState::Idle);
    }

    /// Apply one user intent.
    pub fn apply(&mut self, intent: Intent) -> Outcome {
        log::debug!("reader: {:?} while {}", intent, self.state);
        let outcome = match intent {
            Intent::Play => self.play(),
            Intent::Pause => self.pause(),
            Intent::Resume => self.resume(),
            Intent::TogglePlayPause => match self.state {
                PlaybackState::Speaking => self.pause(),
                PlaybackState::Paused => self.resume(),
                _ => self.play(),
            },
            Intent::Stop => self.stop(),
            Intent::Next => self.next(),
            Intent::Previous => self.previous(),
            Intent::GoToPage(page_number) => self.go_to_page(page_number),
            Intent::NextPage => self.next_page(),
            Intent::PreviousPage => self.previous_page(),
            Intent::ClickWord { global_offset } => self.click_word(global_offset),
            Intent::AddBookmark => self.add_bookmark(),
            Intent::JumpToBookmark(index) => self.jump_to_bookmark(index),
            Intent::RemoveBookmark(index) => self.remove_bookmark(index),
            Intent::RestorePosition => self.restore_position(),
            Intent::SetRate(rate) => {
                let options = self.settings.options.clone().with_rate(rate);
                self.set_options(options)
            }
            Intent::SetVoice(voice) => {
                let options = SpeechOptions {
                    voice,
                    ..self.settings.options.clone()
                };
                self.set_options(options)
            }
        };
        if let Outcome::SoftFailure(failure) = &outcome {
            log::warn!("{}", failure);
        }
        outcome
    }

    /// Apply an event reported by the speech engine.
    pub fn handle_speech_event(&mut self, event: SpeechEvent) -> Outcome {
        if self.current_utterance != Some(event.utterance()) {
            log::trace!("reader: dropping stale {:?}", event);
            return Outcome::Unchanged;
        }

        match event {
            SpeechEvent::WordBoundary { char_index, .. } => {
                let Some(loaded) = &self.loaded else {
                    return Outcome::Unchanged;
                };
                let chunk_len = loaded.chunk(self.cursor.chunk).map(char_len).unwrap_or(0);
                let offset = char_index.min(chunk_len.saturating_sub(1));
                let cursor = self.cursor.with_offset(&loaded.mapping, offset);
                if cursor == self.cursor {
                    return Outcome::Unchanged;
                }
                self.commit(cursor, true);
                Outcome::Applied
            }
            SpeechEvent::End { .. } => {
                if self.state != PlaybackState::Speaking {
                    return Outcome::Unchanged;
                }
                self.current_utterance = None;
                let Some(loaded) = &self.loaded else {
                    return Outcome::Unchanged;
                };
                let next = self.cursor.chunk + 1;
                if next < loaded.mapping.chunk_count() {
                    let cursor = Cursor::at_chunk(&loaded.mapping, next, 0);
                    self.commit(cursor, true);
                    self.speak_current();
                } else {
                    log::debug!("reader: finished document");
                    self.set_state(PlaybackState::Stopped);
                    self.persist_position();
                }
                Outcome::Applied
            }
        }
    }

    fn play(&mut self) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        match self.state {
            PlaybackState::Speaking => Outcome::Unchanged,
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle | PlaybackState::Stopped => {
                if loaded.chunks.is_empty() {
                    return SoftFailure::NothingToSpeak.into();
                }
                self.speak_current();
                Outcome::Applied
            }
        }
    }

    fn pause(&mut self) -> Outcome {
        if self.state != PlaybackState::Speaking {
            return Outcome::Unchanged;
        }
        self.engine.pause();
        self.set_state(PlaybackState::Paused);
        self.persist_position();
        Outcome::Applied
    }

    /// Speak again from the offset frozen at pause time.
    fn resume(&mut self) -> Outcome {
        if self.state != PlaybackState::Paused {
            return Outcome::Unchanged;
        }
        self.speak_current();
        Outcome::Applied
    }

    fn stop(&mut self) -> Outcome {
        if !self.state.is_active() {
            return Outcome::Unchanged;
        }
        self.cancel_speech();
        self.set_state(PlaybackState::Stopped);
        self.persist_position();
        Outcome::Applied
    }

    fn next(&mut self) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        let next = self.cursor.chunk + 1;
        if next >= loaded.mapping.chunk_count() {
            return Outcome::Unchanged;
        }
        let cursor = Cursor::at_chunk(&loaded.mapping, next, 0);
        self.move_to(cursor)
    }

    fn previous(&mut self) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        if self.cursor.chunk == 0 {
            return Outcome::Unchanged;
        }
        let cursor = Cursor::at_chunk(&loaded.mapping, self.cursor.chunk - 1, 0);
        self.move_to(cursor)
    }

    fn go_to_page(&mut self, page_number: usize) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        let mapping = &loaded.mapping;
        if page_number == 0 || page_number > mapping.page_count() {
            return SoftFailure::PageOutOfRange {
                requested: page_number,
                pages: mapping.page_count(),
            }
            .into();
        }
        let Some(chunk) = mapping.first_chunk_of_page(page_number) else {
            return SoftFailure::PageHasNoChunks(page_number).into();
        };
        let cursor = Cursor::at_chunk(mapping, chunk, 0);
        self.move_to(cursor)
    }

    /// Next page that has something to read; no wrap.
    fn next_page(&mut self) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        let mapping = &loaded.mapping;
        if self.cursor.page >= mapping.page_count() {
            return Outcome::Unchanged;
        }
        let target = (self.cursor.page + 1..=mapping.page_count())
            .find_map(|page| mapping.first_chunk_of_page(page));
        match target {
            Some(chunk) => {
                let cursor = Cursor::at_chunk(mapping, chunk, 0);
                self.move_to(cursor)
            }
            None => SoftFailure::PageHasNoChunks(self.cursor.page + 1).into(),
        }
    }

    fn previous_page(&mut self) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        let mapping = &loaded.mapping;
        if self.cursor.page <= 1 {
            return Outcome::Unchanged;
        }
        let target = (1..self.cursor.page)
            .rev()
            .find_map(|page| mapping.first_chunk_of_page(page));
        match target {
            Some(chunk) => {
                let cursor = Cursor::at_chunk(mapping, chunk, 0);
                self.move_to(cursor)
            }
            None => SoftFailure::PageHasNoChunks(self.cursor.page - 1).into(),
        }
    }

    fn click_word(&mut self, global_offset: usize) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        if loaded.chunks.is_empty() {
            return SoftFailure::NothingToSpeak.into();
        }
        let location = loaded.mapping.resolve(global_offset);
        let cursor = Cursor::at_location(&loaded.mapping, location);
        self.move_to(cursor)
    }

    fn add_bookmark(&mut self) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        let bookmark = Bookmark::new(
            loaded.document.id.clone(),
            self.cursor,
            loaded.snippet_at(&self.cursor),
        );
        match self.library.add_bookmark(bookmark) {
            Ok(()) => Outcome::Applied,
            Err(e) => SoftFailure::Persistence(e.to_string()).into(),
        }
    }

    /// Jump to a bookmark, re-resolving it if the chunk no longer exists.
    fn jump_to_bookmark(&mut self, index: usize) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        let bookmark = match self.library.bookmarks(&loaded.document.id) {
            Ok(bookmarks) => bookmarks.into_iter().nth(index),
            Err(e) => return SoftFailure::Persistence(e.to_string()).into(),
        };
        let Some(bookmark) = bookmark else {
            return SoftFailure::BookmarkNotFound(index).into();
        };
        if loaded.chunks.is_empty() {
            return SoftFailure::NothingToSpeak.into();
        }
        let cursor = bookmark.cursor.reanchor(&loaded.mapping);
        self.move_to(cursor)
    }

    fn remove_bookmark(&mut self, index: usize) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        match self.library.remove_bookmark(&loaded.document.id, index) {
            Ok(Some(_)) => Outcome::Applied,
            Ok(None) => SoftFailure::BookmarkNotFound(index).into(),
            Err(e) => SoftFailure::Persistence(e.to_string()).into(),
        }
    }

    fn restore_position(&mut self) -> Outcome {
        let Some(loaded) = &self.loaded else {
            return SoftFailure::NoDocument.into();
        };
        let position = match self.library.position(&loaded.document.id) {
            Ok(Some(position)) => position,
            Ok(None) => return SoftFailure::NoSavedPosition.into(),
            Err(e) => return SoftFailure::Persistence(e.to_string()).into(),
        };
        if loaded.chunks.is_empty() {
            return SoftFailure::NothingToSpeak.into();
        }
        let cursor = position.cursor.reanchor(&loaded.mapping);
        self.move_to(cursor)
    }

    /// New options take effect with the next utterance.
    fn set_options(&mut self, options: SpeechOptions) -> Outcome {
        if options == self.settings.options {
            return Outcome::Unchanged;
        }
        self.settings.options = options;
        Outcome::Applied
    }

    /// Move the cursor for a navigation intent, restarting speech if it was active.
    fn move_to(&mut self, cursor: Cursor) -> Outcome {
        let active = self.state.is_active();
        if cursor == self.cursor && !active {
            return Outcome::Unchanged;
        }
        self.commit(cursor, true);
        if active {
            self.speak_current();
        }
        Outcome::Applied
    }

    /// The single place the cursor changes.
    fn commit(&mut self, cursor: Cursor, persist: bool) {
        let previous = std::mem::replace(&mut self.cursor, cursor);
        if previous.changes_region(&cursor) || !persist {
            if persist {
                self.persist_position();
            }
            self.publish(ReaderEvent::CursorMoved(cursor));
        } else if previous != cursor {
            self.publish(ReaderEvent::Progress(cursor));
        }
    }

    /// Save the cursor as the document's reading position. Failures are logged only.
    fn persist_position(&mut self) {
        let Some(loaded) = &self.loaded else {
            return;
        };
        let position = ReadingPosition::new(self.cursor);
        if let Err(e) = self.library.save_position(&loaded.document.id, &position) {
            log::warn!("Failed to save reading position: {}", e);
        }
    }

    /// Speak the cursor's chunk from its offset, replacing any current utterance.
    fn speak_current(&mut self) {
        self.cancel_speech();

        let Some(text) = self
            .loaded
            .as_ref()
            .and_then(|loaded| loaded.chunk(self.cursor.chunk))
        else {
            return;
        };
        let utterance = Utterance {
            id: self.next_utterance,
            chunk_index: self.cursor.chunk,
            text: text.to_string(),
            offset: self.cursor.offset_within_chunk,
            options: self.settings.options.clone(),
        };
        self.next_utterance += 1;

        self.engine.speak(&utterance);
        self.current_utterance = Some(utterance.id);
        self.set_state(PlaybackState::Speaking);
    }

    /// Cancel the current utterance. A no-op when nothing is in flight.
    fn cancel_speech(&mut self) {
        if self.current_utterance.take().is_some() {
            self.engine.cancel();
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            log::debug!("reader: {} -> {}", self.state, state);
            self.state = state;
            self.publish(ReaderEvent::StateChanged(state));
        }
    }

    fn publish(&self, event: ReaderEvent) {
        let _ = self.events.send(event);
    }
}
