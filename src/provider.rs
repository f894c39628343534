//! External-collaborator interfaces.
//!
//! The search core does not embed text, fetch shard files, or render
//! anything. Hosts implement these traits and hand the core decoded
//! buffers; the only implementation provided here is [`TitleTable`], a
//! plain in-memory metadata table that hosts and tests can use directly.

use crate::error::Result;

/// Sentence-embedding model: turns query text into a fixed-length vector.
///
/// The core requires `dim() == codebook.dim()`.
pub trait Embedder {
    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Embed a piece of text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Per-row metadata attached to a shard.
///
/// `filter_key` and `title` must be defined for every row in
/// `0..rows()`; the store reads every filter key once at append time.
pub trait ShardMetadata {
    /// Number of rows this metadata covers.
    fn rows(&self) -> usize;

    /// Displayable title for a row, if any.
    fn title(&self, row: usize) -> Option<&str>;

    /// Categorical filter key for a row (e.g. an encoded leading
    /// character). `0` means "no key".
    fn filter_key(&self, row: usize) -> u32;
}

/// Source of decoded shards: per shard index, a contiguous quantized-code
/// buffer plus its row metadata. The wire/file format is the host's
/// concern; the core only sees the decoded pair.
pub trait ShardSource {
    fn load(&mut self, shard_index: usize) -> Result<(Vec<u8>, Box<dyn ShardMetadata>)>;
}

/// Encode the leading character of a title as a filter key.
///
/// Zero for empty text, so an empty title never matches a real filter.
#[must_use]
pub fn leading_char_key(text: &str) -> u32 {
    text.chars().next().map(|c| c as u32).unwrap_or(0)
}

/// In-memory title table with leading-character filter keys.
#[derive(Debug, Clone, Default)]
pub struct TitleTable {
    titles: Vec<String>,
    keys: Vec<u32>,
}

impl TitleTable {
    pub fn new(titles: Vec<String>) -> Self {
        let keys = titles.iter().map(|t| leading_char_key(t)).collect();
        Self { titles, keys }
    }
}

impl ShardMetadata for TitleTable {
    fn rows(&self) -> usize {
        self.titles.len()
    }

    fn title(&self, row: usize) -> Option<&str> {
        self.titles.get(row).map(|s| s.as_str())
    }

    fn filter_key(&self, row: usize) -> u32 {
        self.keys.get(row).copied().unwrap_or(0)
    }
}
