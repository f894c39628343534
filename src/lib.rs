//! quiver: incremental product-quantization nearest-neighbor search.
//!
//! Searches millions of pre-encoded document vectors on a single compute
//! thread shared with a responsive host, using PQ asymmetric distance
//! computation:
//!
//! - `codebook`: static quantization parameters, loaded once.
//! - `store`: append-only shard log plus the global distance and
//!   filter-key arenas.
//! - `adc`: per-query lookup table and the tile distance kernel.
//! - `select`: filtered top-k under a soft penalty (never excludes, only
//!   deprioritizes).
//! - `scheduler`: resumable, cancellable runs the host steps tile by
//!   tile.
//! - `engine`: the facade tying the pieces together.
//! - `provider`: traits for the external embedder, shard source, and
//!   shard metadata.
//!
//! # Example
//!
//! ```rust
//! use quiver::{Codebook, SearchEngine, StepState};
//! use quiver::provider::TitleTable;
//! use quiver::scheduler::NullObserver;
//!
//! let codebook = Codebook::from_nested(&[
//!     vec![vec![0.0], vec![10.0]],
//!     vec![vec![0.0], vec![10.0]],
//! ])?;
//! let mut engine = SearchEngine::new(codebook);
//!
//! let titles = TitleTable::new(vec!["a".into(), "b".into(), "c".into()]);
//! engine.append_shard(vec![0, 0, 1, 0, 1, 1], Box::new(titles))?;
//! engine.set_k(2)?;
//!
//! let mut run = engine.begin_search(vec![0.0, 0.0])?;
//! let mut observer = NullObserver;
//! // A host with its own event loop would call `step` instead and do
//! // pending work after every yield.
//! assert_eq!(
//!     engine.run_to_completion(&mut run, &mut observer)?,
//!     StepState::Completed
//! );
//! assert_eq!(engine.rerank_only()?, vec![0, 1]);
//! # Ok::<(), quiver::SearchError>(())
//! ```

pub mod adc;
pub mod codebook;
pub mod engine;
pub mod error;
pub mod provider;
pub mod scheduler;
pub mod select;
pub mod simd;
pub mod store;

// Re-exports
pub use codebook::Codebook;
pub use engine::{SearchConfig, SearchEngine};
pub use error::{Result, SearchError};
pub use scheduler::{SearchObserver, SearchRun, StepState, TimingInfo};
pub use select::{filtered_top_k, DEFAULT_FILTER_PENALTY};
pub use store::{Shard, VectorStore, UNRESOLVED};
