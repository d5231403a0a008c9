//! Chunk ↔ page ↔ offset mapping.
//!
//! Chunk positions are laid end to end in chunk order, starting at 0. Page
//! positions are true offsets into the document text. Because chunking drops
//! whitespace and fragments without terminal punctuation, the two coordinate
//! systems drift apart over a long document; the mapping tolerates this and
//! assigns each chunk to the page it overlaps most.
//!
//! Lookups never fail. Out-of-range offsets and empty inputs resolve to the
//! first page, the first chunk, or the last chunk as documented per method.

use crate::error::{ReadError, Result};
use crate::text::{Page, char_len};
use serde::{Deserialize, Serialize};

/// Half-open char range `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Number of chars shared with `other`.
    pub fn overlap(&self, other: &Span) -> usize {
        self.end
            .min(other.end)
            .saturating_sub(self.start.max(other.start))
    }
}

/// Page range plus its word count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    pub span: Span,
    pub word_count: usize,
}

/// Where an offset falls among the chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    pub chunk_index: usize,
    pub offset_within_chunk: usize,
}

/// Where an offset falls among the pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLocation {
    pub page_number: usize,
    pub offset_within_page: usize,
}

/// Derived, read-only index between chunks and pages. Rebuilt whenever the
/// active document changes.
#[derive(Debug, Clone, Default)]
pub struct PositionMapping {
    chunk_positions: Vec<Span>,
    /// Indexed by chunk; values are 1-based page numbers.
    chunk_to_page: Vec<usize>,
    /// Indexed by `page_number - 1`.
    page_to_chunks: Vec<Vec<usize>>,
    page_positions: Vec<PageSpan>,
}

impl PositionMapping {
    /// Build the mapping from a document's chunks and pages.
    pub fn build<S: AsRef<str>>(chunks: &[S], pages: &[Page]) -> Self {
        let mut chunk_positions = Vec::with_capacity(chunks.len());
        let mut total = 0;
        for chunk in chunks {
            let len = char_len(chunk.as_ref());
            chunk_positions.push(Span::new(total, total + len));
            total += len;
        }

        let page_positions: Vec<PageSpan> = pages
            .iter()
            .map(|page| PageSpan {
                span: Span::new(page.start_position, page.end_position),
                word_count: page.word_count,
            })
            .collect();

        let mut page_to_chunks = vec![Vec::new(); page_positions.len()];
        let chunk_to_page: Vec<usize> = chunk_positions
            .iter()
            .enumerate()
            .map(|(chunk_index, chunk)| {
                let page_number = best_page(chunk, &page_positions);
                if let Some(list) = page_to_chunks.get_mut(page_number - 1) {
                    list.push(chunk_index);
                }
                page_number
            })
            .collect();

        log::debug!(
            "position: mapped {} chunks ({} chars) onto {} pages",
            chunk_positions.len(),
            total,
            page_positions.len()
        );

        Self {
            chunk_positions,
            chunk_to_page,
            page_to_chunks,
            page_positions,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_positions.len()
    }

    pub fn page_count(&self) -> usize {
        self.page_positions.len()
    }

    /// Sum of all chunk lengths.
    pub fn total_chunk_len(&self) -> usize {
        self.chunk_positions.last().map(|s| s.end).unwrap_or(0)
    }

    pub fn chunk_span(&self, chunk_index: usize) -> Option<Span> {
        self.chunk_positions.get(chunk_index).copied()
    }

    /// Page a chunk was assigned to; page 1 for unknown chunks.
    pub fn page_for_chunk(&self, chunk_index: usize) -> usize {
        self.chunk_to_page.get(chunk_index).copied().unwrap_or(1)
    }

    /// Chunks assigned to a page, in order.
    pub fn chunks_for_page(&self, page_number: usize) -> &[usize] {
        page_number
            .checked_sub(1)
            .and_then(|i| self.page_to_chunks.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first_chunk_of_page(&self, page_number: usize) -> Option<usize> {
        self.chunks_for_page(page_number).first().copied()
    }

    /// Absolute offset of a position inside a chunk.
    pub fn global_offset(&self, chunk_index: usize, offset_within_chunk: usize) -> usize {
        self.chunk_span(chunk_index)
            .map(|span| span.start + offset_within_chunk)
            .unwrap_or(offset_within_chunk)
    }

    /// Find the chunk containing `global_offset`.
    ///
    /// Offsets at or past the end resolve to the last chunk at offset 0. With
    /// no chunks at all the result is chunk 0, offset 0.
    pub fn resolve(&self, global_offset: usize) -> ChunkLocation {
        let index = self
            .chunk_positions
            .partition_point(|span| span.end <= global_offset);
        match self.chunk_positions.get(index) {
            Some(span) if span.contains(global_offset) => ChunkLocation {
                chunk_index: index,
                offset_within_chunk: global_offset - span.start,
            },
            _ => ChunkLocation {
                chunk_index: self.chunk_positions.len().saturating_sub(1),
                offset_within_chunk: 0,
            },
        }
    }

    /// Find the page containing `global_offset`, or page 1 offset 0 if none does.
    pub fn page_for(&self, global_offset: usize) -> PageLocation {
        self.page_positions
            .iter()
            .position(|page| page.span.contains(global_offset))
            .map(|i| PageLocation {
                page_number: i + 1,
                offset_within_page: global_offset - self.page_positions[i].span.start,
            })
            .unwrap_or(PageLocation {
                page_number: 1,
                offset_within_page: 0,
            })
    }

    /// Report empty or mismatched inputs. Lookups still work on an
    /// inconsistent mapping; callers use this to warn the user.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_positions.is_empty() {
            return Err(ReadError::MappingInconsistency(
                "document has no speakable chunks".to_string(),
            ));
        }
        if self.page_positions.is_empty() {
            return Err(ReadError::MappingInconsistency(
                "document has no pages".to_string(),
            ));
        }
        if let Some(index) = self.chunk_positions.iter().position(Span::is_empty) {
            return Err(ReadError::MappingInconsistency(format!(
                "chunk {} is empty",
                index
            )));
        }
        Ok(())
    }
}

/// Page with the largest overlap; the first one wins ties, page 1 if nothing overlaps.
fn best_page(chunk: &Span, pages: &[PageSpan]) -> usize {
    let mut best = 1;
    let mut max_overlap = 0;
    for (i, page) in pages.iter().enumerate() {
        let overlap = chunk.overlap(&page.span);
        if overlap > max_overlap {
            max_overlap = overlap;
            best = i + 1;
        }
    }
    best
}
