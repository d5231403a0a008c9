//! Sentence-bounded chunking for speech synthesis.

use super::char_len;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 5000;

/// A sentence is a run of non-terminal characters followed by terminal punctuation.
static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("sentence pattern should compile"));

/// Split text into sentences, keeping their surrounding whitespace.
///
/// Text after the last terminal punctuation mark is not a sentence and is dropped.
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    SENTENCE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Split text into chunks of whole sentences for speech synthesis.
///
/// Sentences are accumulated greedily while the chunk stays within
/// `max_chunk_size` characters. A sentence longer than the limit becomes its
/// own chunk and is never split further. Chunks are trimmed and never empty.
///
/// Text without any terminal punctuation produces no chunks at all.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_into_sentences(text) {
        let sentence_len = char_len(sentence);
        if current_len + sentence_len <= max_chunk_size {
            current.push_str(sentence);
            current_len += sentence_len;
        } else {
            flush(&mut chunks, &current);
            current = sentence.to_string();
            current_len = sentence_len;
        }
    }

    flush(&mut chunks, &current);
    log::debug!(
        "chunker: {} chars -> {} chunks (max {})",
        char_len(text),
        chunks.len(),
        max_chunk_size
    );
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &str) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn squash(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_each_oversized_sentence_is_its_own_chunk() {
        let chunks = split_into_chunks("Hello world. This is AudioRead.", 10);
        assert_eq!(chunks, vec!["Hello world.", "This is AudioRead."]);
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_into_chunks("Hello world. How are you? Fine!", DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(chunks, vec!["Hello world. How are you? Fine!"]);
    }

    #[test]
    fn test_greedy_accumulation() {
        // "One. " = 4 chars, " Two." = 5, " Three." = 7
        let chunks = split_into_chunks("One. Two. Three.", 9);
        assert_eq!(chunks, vec!["One. Two.", "Three."]);
    }

    #[test]
    fn test_exact_fit_stays_in_chunk() {
        let chunks = split_into_chunks("Ab. Cd.", 7);
        assert_eq!(chunks, vec!["Ab. Cd."]);
    }

    #[test]
    fn test_no_terminal_punctuation_yields_nothing() {
        assert!(split_into_chunks("no punctuation here at all", 100).is_empty());
        assert!(split_into_chunks("", 100).is_empty());
        assert!(split_into_chunks("   \n\n  ", 100).is_empty());
    }

    #[test]
    fn test_trailing_fragment_is_dropped() {
        let chunks = split_into_chunks("Kept sentence. dangling words", 100);
        assert_eq!(chunks, vec!["Kept sentence."]);
    }

    #[test]
    fn test_runs_of_punctuation_stay_with_sentence() {
        let sentences = split_into_sentences("Wait... What?! Yes.");
        assert_eq!(sentences, vec!["Wait...", " What?!", " Yes."]);
    }

    #[test]
    fn test_size_counts_chars_not_bytes() {
        // 6 chars, 12 bytes
        let chunks = split_into_chunks("ééééé. ààààà.", 13);
        assert_eq!(chunks.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_chunks_preserve_sentence_content(
            text in "[a-z .!?\n]{0,200}",
            max in 1usize..80,
        ) {
            let chunks = split_into_chunks(&text, max);
            let sentences: String = split_into_sentences(&text).concat();
            prop_assert_eq!(squash(&chunks.concat()), squash(&sentences));
            prop_assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        }

        #[test]
        fn prop_no_terminal_punctuation_no_chunks(text in "[a-zA-Z ,;\n]{0,200}", max in 1usize..500) {
            prop_assert!(split_into_chunks(&text, max).is_empty());
        }

        #[test]
        fn prop_multi_sentence_chunks_respect_limit(text in "[a-z .!?]{0,200}", max in 1usize..80) {
            for chunk in split_into_chunks(&text, max) {
                if split_into_sentences(&chunk).len() > 1 {
                    prop_assert!(char_len(&chunk) <= max);
                }
            }
        }
    }
}
