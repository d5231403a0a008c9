//! Text segmentation: speech chunks and visual pages.
//!
//! The two splitters are deliberately independent. Chunks follow sentence
//! boundaries and a character budget; pages follow paragraph boundaries and a
//! word budget (or the page breaks the extractor saw). All positions are
//! counted in `char`s.

pub mod chunker;
pub mod pager;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub use chunker::{DEFAULT_MAX_CHUNK_SIZE, split_into_chunks};
pub use pager::{DEFAULT_WORDS_PER_PAGE, split_into_pages};

/// Marker inserted by the extractor between pages of a paginated source.
pub const PAGE_BREAK_MARKER: &str = "<!-- PAGE_BREAK -->";

/// A page of text for visual reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Trimmed page text
    pub text: String,
    /// 1-based page number
    pub page_number: usize,
    /// Absolute char offset of the page start in the original text
    pub start_position: usize,
    /// Absolute char offset one past the page end in the original text
    pub end_position: usize,
    /// Number of whitespace-separated words on the page
    pub word_count: usize,
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Length of `text` in chars.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Text suitable for speech: page-break markers removed.
pub fn speakable_text(text: &str) -> Cow<'_, str> {
    if text.contains(PAGE_BREAK_MARKER) {
        Cow::Owned(text.replace(PAGE_BREAK_MARKER, ""))
    } else {
        Cow::Borrowed(text)
    }
}

/// Substring of `text` starting at char `offset`, at most `max_chars` long.
pub fn char_slice(text: &str, offset: usize, max_chars: usize) -> &str {
    let start = byte_index(text, offset);
    let end = start + byte_index(&text[start..], max_chars);
    &text[start..end]
}

/// Byte index of char `offset`, saturating at the end of the text.
pub fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Converts increasing byte offsets into char offsets in a single pass.
pub(crate) struct CharCounter<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> CharCounter<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    /// Char offset of `byte`. Calls must be made with non-decreasing `byte`.
    pub(crate) fn at(&mut self, byte: usize) -> usize {
        if byte > self.byte {
            self.chars += self.text[self.byte..byte].chars().count();
            self.byte = byte;
        }
        self.chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("one two  three\nfour"), 4);
        assert_eq!(count_words("   "), 0);
    }

    #[test]
    fn test_char_len_counts_scalars() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!("héllo".len(), 6);
    }

    #[test]
    fn test_speakable_text_strips_markers() {
        let text = "Page one.\n\n<!-- PAGE_BREAK -->\nPage two.";
        assert_eq!(speakable_text(text), "Page one.\n\n\nPage two.");
        assert!(matches!(speakable_text("plain."), Cow::Borrowed(_)));
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("naïve reader", 2, 3), "ïve");
        assert_eq!(char_slice("short", 3, 100), "rt");
        assert_eq!(char_slice("short", 10, 5), "");
    }

    #[test]
    fn test_char_counter_multibyte() {
        let text = "añb€c";
        let mut counter = CharCounter::new(text);
        assert_eq!(counter.at(0), 0);
        assert_eq!(counter.at(3), 2);
        assert_eq!(counter.at(text.len()), 5);
    }
}
