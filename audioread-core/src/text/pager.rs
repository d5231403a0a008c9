//! Book-like pagination of extracted text.

use super::{CharCounter, PAGE_BREAK_MARKER, Page, char_len, count_words};
use once_cell::sync::Lazy;
use regex::Regex;

/// Default target words per page.
pub const DEFAULT_WORDS_PER_PAGE: usize = 300;

/// Lower bound on the derived page size when a page count hint is given.
const MIN_WORDS_PER_PAGE: usize = 100;

/// Blank line(s) between paragraphs.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern should compile"));

/// Split text into pages.
///
/// If the text carries page-break markers the pages follow them exactly.
/// Otherwise paragraphs are packed into pages of roughly `words_per_page`
/// words; with a `page_count` hint above one the budget is derived from it
/// instead. A paragraph is never split, so the resulting page count may differ
/// from the hint.
///
/// Pages are contiguous and together cover every char of `text`.
pub fn split_into_pages(text: &str, page_count: usize, words_per_page: usize) -> Vec<Page> {
    let pages = if text.contains(PAGE_BREAK_MARKER) {
        split_on_markers(text)
    } else {
        let budget = word_budget(count_words(text), page_count, words_per_page);
        split_by_word_budget(text, budget)
    };

    log::debug!(
        "pager: {} chars -> {} pages (hint {})",
        char_len(text),
        pages.len(),
        page_count
    );
    pages
}

/// Words per page to aim for.
fn word_budget(total_words: usize, page_count: usize, words_per_page: usize) -> usize {
    if page_count > 1 {
        total_words.div_ceil(page_count).max(MIN_WORDS_PER_PAGE)
    } else {
        words_per_page.max(1)
    }
}

/// One page per marker-delimited segment. The marker itself belongs to the
/// page it closes.
fn split_on_markers(text: &str) -> Vec<Page> {
    let mut bounds = Vec::new();
    let mut segment_start = 0;
    for (marker_start, marker) in text.match_indices(PAGE_BREAK_MARKER) {
        bounds.push((segment_start, marker_start));
        segment_start = marker_start + marker.len();
    }
    bounds.push((segment_start, text.len()));

    let mut counter = CharCounter::new(text);
    let starts: Vec<usize> = bounds.iter().map(|&(start, _)| counter.at(start)).collect();
    let total = counter.at(text.len());

    bounds
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| {
            let page_text = text[start..end].trim();
            Page {
                text: page_text.to_string(),
                page_number: i + 1,
                start_position: starts[i],
                end_position: starts.get(i + 1).copied().unwrap_or(total),
                word_count: count_words(page_text),
            }
        })
        .collect()
}

/// A non-blank paragraph: byte offset of its first non-whitespace char and its trimmed text.
fn paragraphs(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut push = |from: usize, to: usize| {
        let raw = &text[from..to];
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            out.push((from + (raw.len() - raw.trim_start().len()), trimmed));
        }
    };
    for separator in PARAGRAPH_BREAK.find_iter(text) {
        push(start, separator.start());
        start = separator.end();
    }
    push(start, text.len());
    out
}

/// Builder for the page currently being filled.
struct PendingPage<'a> {
    first_byte: usize,
    paragraphs: Vec<&'a str>,
    word_count: usize,
}

fn split_by_word_budget(text: &str, budget: usize) -> Vec<Page> {
    let mut pending: Vec<PendingPage> = Vec::new();

    for (byte, paragraph) in paragraphs(text) {
        let words = count_words(paragraph);
        match pending.last_mut() {
            Some(page) if page.word_count + words <= budget => {
                page.paragraphs.push(paragraph);
                page.word_count += words;
            }
            _ => pending.push(PendingPage {
                first_byte: byte,
                paragraphs: vec![paragraph],
                word_count: words,
            }),
        }
    }

    let mut counter = CharCounter::new(text);
    let starts: Vec<usize> = pending
        .iter()
        .enumerate()
        // The first page also owns any leading whitespace.
        .map(|(i, page)| if i == 0 { 0 } else { counter.at(page.first_byte) })
        .collect();
    let total = counter.at(text.len());

    pending
        .into_iter()
        .enumerate()
        .map(|(i, page)| Page {
            text: page.paragraphs.join("\n\n"),
            page_number: i + 1,
            start_position: starts[i],
            end_position: starts.get(i + 1).copied().unwrap_or(total),
            word_count: page.word_count,
        })
        .collect()
}
