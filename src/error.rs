//! Error types for quiver.

use thiserror::Error;

/// Errors that can occur while loading quantization data or searching.
///
/// All variants indicate a precondition violated by the caller or by a
/// collaborator (a bad codebook file, a truncated shard), not a transient
/// condition; nothing here is retried internally. Cancellation of a search
/// run is not an error and is reported through
/// [`StepState::Cancelled`](crate::scheduler::StepState).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    /// Codebook shape is inconsistent (ragged centroids, empty subspaces,
    /// or more centroids than a `u8` code can address).
    #[error("malformed codebook: {0}")]
    MalformedCodebook(String),

    /// Shard code buffer length is not a multiple of the code length `m`.
    #[error("invalid shard length: {len} bytes is not a multiple of code length {m}")]
    InvalidShardLength { len: usize, m: usize },

    /// A shard code byte addresses a centroid past the codebook size.
    #[error("code out of range: {code} (codebook has {k} centroids per subspace)")]
    CodeOutOfRange { code: u8, k: usize },

    /// Query vector length disagrees with the codebook dimensionality.
    #[error("dimension mismatch: expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Requested result count is zero.
    #[error("invalid k: {0} (must be at least 1)")]
    InvalidK(usize),

    /// Selection requested before any shard was appended.
    #[error("empty corpus: no vectors appended")]
    EmptyCorpus,

    /// A run entry mode that reuses the stored query was called before any
    /// query was supplied.
    #[error("no query set: call begin_search before begin_extend or rerank_only")]
    MissingQuery,
}

/// Result type for quiver operations.
pub type Result<T> = std::result::Result<T, SearchError>;
