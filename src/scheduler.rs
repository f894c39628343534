//! Tiled, cancellable search runs.
//!
//! Distance computation over the whole corpus is spread across bounded
//! tiles so the compute thread stays responsive. A run is an explicit
//! resumable cursor: the host calls [`SearchEngine::step`] repeatedly and
//! regains control after every re-rank, which is the only yield point.
//! Cancellation is cooperative: a liveness token is captured when the run
//! starts and checked at the top of every tile, so at most one tile of
//! work happens after the token goes stale.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::adc::AdcTable;
use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};

/// Captured run identity, compared against the engine's live generation
/// at every tile boundary.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    shared: Arc<AtomicU64>,
    seen: u64,
}

impl LivenessToken {
    /// Whether the run this token belongs to is still the live one.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.shared.load(Ordering::Relaxed) == self.seen
    }
}

/// How a `step` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// A re-rank was pushed and control is handed back so host work can
    /// interleave. Call `step` again to continue.
    Yielded,
    /// Every shard was processed and the final top-k was pushed.
    Completed,
    /// The liveness token went stale. Nothing was written this step and
    /// no further writes will happen; not an error.
    Cancelled,
}

/// Wall-clock accounting for one run, pushed to the observer with each
/// top-k update.
#[derive(Debug, Clone, Default)]
pub struct TimingInfo {
    /// Microseconds spent computing each tile's distances.
    pub distance_us: Vec<u64>,
    /// Microseconds spent in each selector invocation.
    pub select_us: Vec<u64>,
}

/// Sink for incremental results.
///
/// Runs inline on the compute thread, so implementations must return
/// quickly.
pub trait SearchObserver {
    /// The distance buffer was updated in `updated` (global indices).
    fn distances(&mut self, _distances: &[f32], _updated: Range<usize>) {}

    /// A re-rank produced a new top-k.
    fn top_k(&mut self, _indices: &[u32], _timing: &TimingInfo) {}
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SearchObserver for NullObserver {}

/// Resumable cursor over the corpus for one query.
///
/// Created by [`SearchEngine::begin_search`] or
/// [`SearchEngine::begin_extend`]; driven by [`SearchEngine::step`].
#[derive(Debug)]
pub struct SearchRun {
    table: AdcTable,
    token: LivenessToken,
    shard: usize,
    row: usize,
    first_tile: bool,
    last_rerank: Instant,
    timing: TimingInfo,
    finished: Option<StepState>,
}

impl SearchRun {
    /// Timing collected so far.
    pub fn timing(&self) -> &TimingInfo {
        &self.timing
    }

    /// Terminal state, if the run has ended.
    pub fn finished(&self) -> Option<StepState> {
        self.finished
    }
}

impl SearchEngine {
    /// Capture a fresh liveness token, staling any run still in flight.
    /// This is what keeps the distance arena single-writer.
    fn advance_generation(&self) -> LivenessToken {
        let seen = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        LivenessToken {
            shared: Arc::clone(&self.generation),
            seen,
        }
    }

    /// Start a full-corpus run for `query`, from shard 0.
    ///
    /// Distances for a previous query are overwritten tile by tile rather
    /// than cleared up front, so early re-ranks blend old results with new
    /// ones instead of flashing an empty list. Stores `query` for later
    /// `begin_extend` calls.
    pub fn begin_search(&mut self, query: Vec<f32>) -> Result<SearchRun> {
        let table = AdcTable::build(&self.codebook, &query)?;
        self.query.query = Some(query);
        let token = self.advance_generation();
        tracing::debug!(shards = self.store.shard_count(), "beginning search run");
        Ok(Self::new_run(table, token, 0))
    }

    /// Start a run covering shards `start_shard..` only, reusing the
    /// stored query. Used right after appending a shard: already-computed
    /// distances are query-valid and are not revisited.
    pub fn begin_extend(&mut self, start_shard: usize) -> Result<SearchRun> {
        let query = self.query.query.as_ref().ok_or(SearchError::MissingQuery)?;
        let table = AdcTable::build(&self.codebook, query)?;
        let token = self.advance_generation();
        tracing::debug!(start_shard, "beginning extend run");
        Ok(Self::new_run(table, token, start_shard))
    }

    fn new_run(table: AdcTable, token: LivenessToken, start_shard: usize) -> SearchRun {
        SearchRun {
            table,
            token,
            shard: start_shard,
            row: 0,
            first_tile: true,
            last_rerank: Instant::now(),
            timing: TimingInfo::default(),
            finished: None,
        }
    }

    /// Advance a run until it yields, completes, or is cancelled.
    ///
    /// Processes tiles in deterministic order (shard order, then tile
    /// order; tiles never span shards). Each tile: liveness check, tile
    /// distances into the arena, `observer.distances`. A re-rank (selector
    /// over the full arena plus `observer.top_k`) happens on the very
    /// first tile of the run and whenever `rerank_interval` has elapsed
    /// since the last one; after a re-rank, control returns to the host.
    /// Stepping a finished run just reports its terminal state again.
    pub fn step(
        &mut self,
        run: &mut SearchRun,
        observer: &mut dyn SearchObserver,
    ) -> Result<StepState> {
        if let Some(state) = run.finished {
            return Ok(state);
        }

        loop {
            if !run.token.is_live() {
                run.finished = Some(StepState::Cancelled);
                tracing::debug!("search run cancelled");
                return Ok(StepState::Cancelled);
            }

            if run.shard >= self.store.shard_count() {
                let started = Instant::now();
                let topk = self.select_current()?;
                run.timing.select_us.push(started.elapsed().as_micros() as u64);
                observer.top_k(&topk, &run.timing);
                run.finished = Some(StepState::Completed);
                tracing::debug!(tiles = run.timing.distance_us.len(), "search run completed");
                return Ok(StepState::Completed);
            }

            let shard_rows = self.store.shard(run.shard).rows();
            if run.row >= shard_rows {
                run.shard += 1;
                run.row = 0;
                continue;
            }

            // The last tile of a shard may be short; tiles never cross
            // into the next shard.
            let tile_rows = self.config.tile_size.min(shard_rows - run.row);
            let global_start = self.store.shard(run.shard).offset() + run.row;

            let started = Instant::now();
            let (codes, out) = self.store.tile_mut(run.shard, run.row, tile_rows);
            run.table.distance_tile(codes, out);
            run.timing.distance_us.push(started.elapsed().as_micros() as u64);

            run.row += tile_rows;
            if run.row >= shard_rows {
                run.shard += 1;
                run.row = 0;
            }

            observer.distances(
                self.store.distances(),
                global_start..global_start + tile_rows,
            );

            let rerank_due =
                run.first_tile || run.last_rerank.elapsed() >= self.config.rerank_interval;
            run.first_tile = false;
            if rerank_due {
                let started = Instant::now();
                let topk = self.select_current()?;
                run.timing.select_us.push(started.elapsed().as_micros() as u64);
                observer.top_k(&topk, &run.timing);
                run.last_rerank = Instant::now();
                return Ok(StepState::Yielded);
            }
        }
    }

    /// Drive a run to a terminal state without interleaving host work.
    pub fn run_to_completion(
        &mut self,
        run: &mut SearchRun,
        observer: &mut dyn SearchObserver,
    ) -> Result<StepState> {
        loop {
            match self.step(run, observer)? {
                StepState::Yielded => continue,
                state => return Ok(state),
            }
        }
    }
}
