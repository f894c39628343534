//! Product-quantization codebook.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Static PQ quantization parameters: `m` subspaces, `k` centroids per
/// subspace, `dsub` dimensions per sub-vector.
///
/// Loaded once at startup and shared read-only by every distance
/// computation. The centroids are stored row-major (`[m][k][dsub]`
/// flattened) so the ADC table build walks them contiguously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codebook {
    m: usize,
    k: usize,
    dsub: usize,
    centroids: Vec<f32>,
}

impl Codebook {
    /// Build a codebook from the nested `[m][k][dsub]` layout that codebook
    /// files decode to.
    ///
    /// Validates that every subspace has the same number of centroids and
    /// every centroid the same dimensionality. Codes are single bytes, so
    /// `k` must not exceed 256.
    pub fn from_nested(raw: &[Vec<Vec<f32>>]) -> Result<Self> {
        if raw.is_empty() {
            return Err(SearchError::MalformedCodebook(
                "no subspaces".to_string(),
            ));
        }

        let k = raw[0].len();
        if k == 0 {
            return Err(SearchError::MalformedCodebook(
                "subspace 0 has no centroids".to_string(),
            ));
        }
        if k > 256 {
            return Err(SearchError::MalformedCodebook(format!(
                "{k} centroids per subspace, but codes are single bytes"
            )));
        }

        let dsub = raw[0][0].len();
        if dsub == 0 {
            return Err(SearchError::MalformedCodebook(
                "zero-dimensional centroids".to_string(),
            ));
        }

        let m = raw.len();
        let mut centroids = Vec::with_capacity(m * k * dsub);
        for (sub, subspace) in raw.iter().enumerate() {
            if subspace.len() != k {
                return Err(SearchError::MalformedCodebook(format!(
                    "subspace {sub} has {} centroids, expected {k}",
                    subspace.len()
                )));
            }
            for (c, centroid) in subspace.iter().enumerate() {
                if centroid.len() != dsub {
                    return Err(SearchError::MalformedCodebook(format!(
                        "centroid {c} in subspace {sub} has {} dims, expected {dsub}",
                        centroid.len()
                    )));
                }
                centroids.extend_from_slice(centroid);
            }
        }

        Ok(Self {
            m,
            k,
            dsub,
            centroids,
        })
    }

    /// Number of subspaces (equals the per-vector code length).
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    /// Centroids per subspace.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Dimensions per sub-vector.
    #[inline]
    pub fn dsub(&self) -> usize {
        self.dsub
    }

    /// Full embedding dimensionality (`m * dsub`). Query vectors must have
    /// this length.
    #[inline]
    pub fn dim(&self) -> usize {
        self.m * self.dsub
    }

    /// Centroid `code` of subspace `sub`.
    #[inline]
    pub fn centroid(&self, sub: usize, code: usize) -> &[f32] {
        let start = (sub * self.k + code) * self.dsub;
        &self.centroids[start..start + self.dsub]
    }
}
