//! The live reading position.

use crate::position::{ChunkLocation, PositionMapping};
use serde::{Deserialize, Serialize};

/// Where the reader currently is. `global_offset` always equals the chunk's
/// start position plus `offset_within_chunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// 1-based page number
    pub page: usize,
    /// 0-based chunk index
    pub chunk: usize,
    pub offset_within_chunk: usize,
    pub global_offset: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::start()
    }
}

impl Cursor {
    /// Beginning of a document.
    pub fn start() -> Self {
        Self {
            page: 1,
            chunk: 0,
            offset_within_chunk: 0,
            global_offset: 0,
        }
    }

    /// Cursor at `offset_within_chunk` of `chunk`, on the page the chunk is mapped to.
    pub fn at_chunk(mapping: &PositionMapping, chunk: usize, offset_within_chunk: usize) -> Self {
        Self {
            page: mapping.page_for_chunk(chunk),
            chunk,
            offset_within_chunk,
            global_offset: mapping.global_offset(chunk, offset_within_chunk),
        }
    }

    pub fn at_location(mapping: &PositionMapping, location: ChunkLocation) -> Self {
        Self::at_chunk(mapping, location.chunk_index, location.offset_within_chunk)
    }

    /// Same chunk, different offset.
    pub fn with_offset(&self, mapping: &PositionMapping, offset_within_chunk: usize) -> Self {
        Self {
            offset_within_chunk,
            global_offset: mapping.global_offset(self.chunk, offset_within_chunk),
            ..*self
        }
    }

    /// Whether moving to `other` changes what is highlighted.
    pub fn changes_region(&self, other: &Cursor) -> bool {
        self.chunk != other.chunk || self.page != other.page
    }

    /// Re-anchor a stored cursor against a freshly built mapping.
    ///
    /// The stored chunk is trusted when it still exists; otherwise the global
    /// offset is resolved again. Offsets past the end of the chunk are clamped.
    pub fn reanchor(&self, mapping: &PositionMapping) -> Self {
        match mapping.chunk_span(self.chunk) {
            Some(span) => Self::at_chunk(
                mapping,
                self.chunk,
                self.offset_within_chunk.min(span.len().saturating_sub(1)),
            ),
            None => Self::at_location(mapping, mapping.resolve(self.global_offset)),
        }
    }
}
