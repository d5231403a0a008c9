//! Playback: the live cursor and the controller that moves it.

mod controller;
mod cursor;

pub use controller::{
    Intent, LoadedDocument, Outcome, PlaybackState, ReaderController, ReaderEvent,
    ReaderSettings, SoftFailure,
};
pub use cursor::Cursor;
