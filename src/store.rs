//! Append-only quantized vector store and its global arenas.
//!
//! Shards are never reordered or removed. Two flat arenas run parallel to
//! the global index space: per-vector distances (sentinel-initialized,
//! written only by the distance engine) and per-vector categorical filter
//! keys (written once at append time, read-only afterwards). Shard offsets
//! are index ranges into those arenas; nothing is copied per shard on read.

use crate::error::{Result, SearchError};
use crate::provider::ShardMetadata;

/// Distance value for vectors not yet computed for the current query.
///
/// Deliberately larger than any attainable real distance plus the filter
/// penalty, so unresolved entries always rank after every resolved one.
pub const UNRESOLVED: f32 = 1_234_567_890.0;

/// One shard of quantized vectors: `rows * m` code bytes plus the shard's
/// base position in the global index space and its row metadata.
pub struct Shard {
    codes: Vec<u8>,
    offset: usize,
    rows: usize,
    metadata: Box<dyn ShardMetadata>,
}

impl Shard {
    /// Number of vectors in this shard.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Base position in the global index space.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Raw quantized codes, `rows * m` bytes.
    #[inline]
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Row metadata (titles, filter keys).
    #[inline]
    pub fn metadata(&self) -> &dyn ShardMetadata {
        self.metadata.as_ref()
    }
}

/// Append-only log of shards plus the global distance and filter-key
/// arenas.
pub struct VectorStore {
    m: usize,
    k: usize,
    shards: Vec<Shard>,
    distances: Vec<f32>,
    filter_keys: Vec<u32>,
}

impl VectorStore {
    /// Create an empty store for vectors with `m` code bytes each, every
    /// byte addressing one of `k` centroids.
    pub fn new(m: usize, k: usize) -> Self {
        Self {
            m,
            k,
            shards: Vec::new(),
            distances: Vec::new(),
            filter_keys: Vec::new(),
        }
    }

    /// Append a decoded shard.
    ///
    /// The code buffer length must be a multiple of `m` and every code
    /// byte must be below `k`; corrupt data is rejected here, at the
    /// violating call, rather than surfacing as an out-of-bounds table
    /// lookup mid-run. Grows both arenas to the new global length: new
    /// distance entries start unresolved, new filter keys come from the
    /// shard metadata. Existing entries keep their positions. Returns the
    /// new shard's index.
    pub fn append_shard(
        &mut self,
        codes: Vec<u8>,
        metadata: Box<dyn ShardMetadata>,
    ) -> Result<usize> {
        if self.m == 0 || codes.len() % self.m != 0 {
            return Err(SearchError::InvalidShardLength {
                len: codes.len(),
                m: self.m,
            });
        }
        if self.k < 256 {
            if let Some(&code) = codes.iter().find(|&&c| c as usize >= self.k) {
                return Err(SearchError::CodeOutOfRange { code, k: self.k });
            }
        }
        let rows = codes.len() / self.m;
        let offset = self.distances.len();

        self.distances.resize(offset + rows, UNRESOLVED);
        self.filter_keys.reserve(rows);
        for row in 0..rows {
            self.filter_keys.push(metadata.filter_key(row));
        }

        self.shards.push(Shard {
            codes,
            offset,
            rows,
            metadata,
        });
        Ok(self.shards.len() - 1)
    }

    /// Global vector count.
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Per-vector code length.
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    /// Number of shards appended so far.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard by index.
    #[inline]
    pub fn shard(&self, index: usize) -> &Shard {
        &self.shards[index]
    }

    /// The full distance arena, one entry per global vector.
    #[inline]
    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    /// The full filter-key arena, parallel to `distances`.
    #[inline]
    pub fn filter_keys(&self) -> &[u32] {
        &self.filter_keys
    }

    /// Refill the distance arena with the unresolved sentinel.
    pub fn reset_distances(&mut self) {
        self.distances.fill(UNRESOLVED);
    }

    /// Borrow one tile for distance computation: the code bytes for rows
    /// `row..row + rows` of a shard, together with the matching mutable
    /// slice of the distance arena. The two ranges are disjoint by
    /// construction, which is what makes tile outputs order-independent.
    pub(crate) fn tile_mut(
        &mut self,
        shard: usize,
        row: usize,
        rows: usize,
    ) -> (&[u8], &mut [f32]) {
        let s = &self.shards[shard];
        let codes = &s.codes[row * self.m..(row + rows) * self.m];
        let start = s.offset + row;
        (codes, &mut self.distances[start..start + rows])
    }

    /// Global title lookup across shards.
    pub fn title(&self, global_index: usize) -> Option<&str> {
        let shard = self
            .shards
            .iter()
            .take_while(|s| s.offset <= global_index)
            .last()?;
        shard.metadata.title(global_index - shard.offset)
    }
}
