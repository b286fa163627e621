//! Segmenter: sliding-window chunking over normalized text.
//!
//! Windows are measured in characters (not bytes) so multi-byte scripts such as
//! Vietnamese never split inside a code point. Consecutive chunks share `overlap`
//! characters. The window stops as soon as it reaches the end of the text, so a
//! text of length `L > chunk_size` yields `ceil((L - overlap) / (chunk_size - overlap))`
//! chunks and any non-empty text no longer than `chunk_size` yields exactly one.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A bounded, overlapping slice of the source text used as a retrieval unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    pub sequence_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl SegmenterConfig {
    /// Returns `None` unless `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Option<Self> {
        (chunk_size > 0 && overlap < chunk_size).then_some(Self {
            chunk_size,
            overlap,
        })
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Splits `text` into ordered, overlapping chunks. Empty input yields no chunks.
pub fn segment(text: &str, config: SegmenterConfig) -> Vec<TextChunk> {
    // Byte offset of every char boundary, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_len {
        let end = (start + config.chunk_size).min(char_len);
        chunks.push(TextChunk {
            content: text[boundaries[start]..boundaries[end]].to_string(),
            sequence_index: chunks.len(),
        });
        if end == char_len {
            break;
        }
        start += config.step();
    }
    chunks
}
