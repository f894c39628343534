//! Asymmetric distance computation (ADC).
//!
//! A query is split into `m` sub-vectors and a partial-distance table
//! `t[sub][code] = ||q_sub - centroid(sub, code)||^2` is precomputed once
//! per query, at cost `O(m * k * dsub)`. Each database vector then costs
//! `m` table lookups and additions, independent of `dsub`; the original
//! high-dimensional vectors are never touched.

use crate::codebook::Codebook;
use crate::error::{Result, SearchError};
use crate::simd;

/// Per-query partial-distance lookup table.
///
/// Layout is flat `[m * k]`: subspace-major, matching the codebook. The
/// table is pure data, so repeated builds from identical inputs are
/// bit-identical, and so are the distances computed through it.
#[derive(Debug, Clone)]
pub struct AdcTable {
    m: usize,
    k: usize,
    table: Vec<f32>,
}

impl AdcTable {
    /// Precompute the table for one query vector.
    ///
    /// The query length must equal `codebook.dim()`.
    pub fn build(codebook: &Codebook, query: &[f32]) -> Result<Self> {
        if query.len() != codebook.dim() {
            return Err(SearchError::DimensionMismatch {
                expected: codebook.dim(),
                actual: query.len(),
            });
        }

        let (m, k, dsub) = (codebook.m(), codebook.k(), codebook.dsub());
        let mut table = Vec::with_capacity(m * k);
        for sub in 0..m {
            let q_sub = &query[sub * dsub..(sub + 1) * dsub];
            for code in 0..k {
                table.push(simd::l2_distance_squared(q_sub, codebook.centroid(sub, code)));
            }
        }

        Ok(Self { m, k, table })
    }

    /// Approximate squared distance to one quantized vector (`m` code
    /// bytes).
    #[inline]
    pub fn distance(&self, codes: &[u8]) -> f32 {
        debug_assert_eq!(codes.len(), self.m);
        codes
            .iter()
            .enumerate()
            .map(|(sub, &code)| self.table[sub * self.k + code as usize])
            .sum()
    }

    /// Fill `out` with distances for a contiguous tile of quantized
    /// vectors. `codes` must hold exactly `out.len() * m` bytes.
    pub fn distance_tile(&self, codes: &[u8], out: &mut [f32]) {
        debug_assert_eq!(codes.len(), out.len() * self.m);
        for (row_codes, slot) in codes.chunks_exact(self.m).zip(out.iter_mut()) {
            *slot = self.distance(row_codes);
        }
    }
}
