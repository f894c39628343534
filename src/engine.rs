//! Search engine facade: codebook + store + query state.
//!
//! Owns the shared mutable buffers and enforces at-most-one live writer:
//! every entry into a distance run captures a fresh liveness token, which
//! stales the token of any run still in flight. The drive loop itself
//! (`begin_search` / `begin_extend` / `step`) lives in
//! [`crate::scheduler`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::codebook::Codebook;
use crate::error::{Result, SearchError};
use crate::provider::ShardMetadata;
use crate::select::{filtered_top_k, DEFAULT_FILTER_PENALTY};
use crate::store::VectorStore;

/// Tuning knobs for the tiled scheduler and selector.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Vectors per distance-computation step. The single knob trading
    /// throughput against worst-case unresponsive window.
    pub tile_size: usize,
    /// Minimum wall-clock interval between re-ranks within a run.
    pub rerank_interval: Duration,
    /// Penalty added to entries that miss the categorical filter.
    pub filter_penalty: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tile_size: 100_000,
            rerank_interval: Duration::from_millis(30),
            filter_penalty: DEFAULT_FILTER_PENALTY,
        }
    }
}

/// Current query settings: the query vector (absent until the first
/// search), the optional categorical filter, and the result count.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryState {
    pub(crate) query: Option<Vec<f32>>,
    pub(crate) filter: Option<u32>,
    pub(crate) k: usize,
}

/// Incremental PQ nearest-neighbor engine.
///
/// Single-threaded and cooperative: distance computation happens in
/// bounded tiles driven through [`step`](SearchEngine::step), never on a
/// background thread.
pub struct SearchEngine {
    pub(crate) codebook: Codebook,
    pub(crate) store: VectorStore,
    pub(crate) config: SearchConfig,
    pub(crate) query: QueryState,
    pub(crate) generation: Arc<AtomicU64>,
}

impl SearchEngine {
    /// Create an engine with default configuration.
    pub fn new(codebook: Codebook) -> Self {
        Self::with_config(codebook, SearchConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(codebook: Codebook, config: SearchConfig) -> Self {
        let store = VectorStore::new(codebook.m(), codebook.k());
        Self {
            codebook,
            store,
            config,
            query: QueryState {
                query: None,
                filter: None,
                k: 10,
            },
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append a decoded shard to the corpus. Returns the shard index,
    /// which `begin_extend` takes to compute distances for new data only.
    pub fn append_shard(
        &mut self,
        codes: Vec<u8>,
        metadata: Box<dyn ShardMetadata>,
    ) -> Result<usize> {
        let index = self.store.append_shard(codes, metadata)?;
        tracing::debug!(
            shard = index,
            rows = self.store.shard(index).rows(),
            total = self.store.len(),
            "appended shard"
        );
        Ok(index)
    }

    /// Set the categorical filter. Takes effect at the next selector
    /// invocation; does not cancel a distance run in flight.
    pub fn set_filter(&mut self, filter: Option<u32>) {
        self.query.filter = filter;
    }

    /// Set the result count. Takes effect at the next selector invocation.
    pub fn set_k(&mut self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(SearchError::InvalidK(k));
        }
        self.query.k = k;
        Ok(())
    }

    /// Current result count.
    pub fn k(&self) -> usize {
        self.query.k
    }

    /// Current categorical filter.
    pub fn filter(&self) -> Option<u32> {
        self.query.filter
    }

    /// The codebook this engine searches against.
    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    /// The vector store (shards plus distance and filter-key arenas).
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Stale every outstanding run without starting a new one. Runs notice
    /// at their next tile boundary.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Re-rank the distance buffer as it stands, without recomputing any
    /// distances. Used when only `k` or the filter changed: PQ distances
    /// depend on the query alone, so the buffer is still valid.
    ///
    /// Requires a stored query (`MissingQuery` otherwise, checked before
    /// the corpus): with no query ever set the buffer holds nothing but
    /// sentinels and ranking it would hand the host arbitrary indices.
    ///
    /// Idempotent for an unchanged buffer, filter, and `k`.
    pub fn rerank_only(&self) -> Result<Vec<u32>> {
        if self.query.query.is_none() {
            return Err(SearchError::MissingQuery);
        }
        self.select_current()
    }

    pub(crate) fn select_current(&self) -> Result<Vec<u32>> {
        filtered_top_k(
            self.store.distances(),
            self.store.filter_keys(),
            self.query.filter,
            self.config.filter_penalty,
            self.query.k,
        )
    }
}
