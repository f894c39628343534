//! Filtered top-k selection with a soft penalty.
//!
//! A filter never excludes: non-matching entries get a large constant
//! added to their distance, so a full `k` results come back even when
//! fewer than `k` vectors match, with best-available results as fallback.
//! Always showing `k` results is deliberate product behavior; do not
//! replace the penalty with a hard filter.

use std::collections::BinaryHeap;

use crate::error::{Result, SearchError};

/// Default penalty added to non-matching entries. Strictly greater than
/// the plausible spread of real distances, and small enough that
/// `max real + penalty` stays below the unresolved sentinel.
pub const DEFAULT_FILTER_PENALTY: f32 = 1024.0;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    dist: f32,
    index: u32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Lower effective distance wins; ties break by ascending index.
        self.dist
            .total_cmp(&other.dist)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Return the global indices of the `min(k, n)` lowest effective
/// distances, ascending, ties broken by ascending index.
///
/// Effective distance is `distances[i]` when `filter` is `None` or
/// `filter_keys[i]` matches, and `distances[i] + penalty` otherwise.
/// `filter_keys` must be parallel to `distances`.
pub fn filtered_top_k(
    distances: &[f32],
    filter_keys: &[u32],
    filter: Option<u32>,
    penalty: f32,
    k: usize,
) -> Result<Vec<u32>> {
    if k == 0 {
        return Err(SearchError::InvalidK(k));
    }
    if distances.is_empty() {
        return Err(SearchError::EmptyCorpus);
    }
    debug_assert_eq!(distances.len(), filter_keys.len());

    // Bounded max-heap: the worst kept candidate sits on top. Capacity by
    // the bound actually reachable, not by raw `k`.
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k.min(distances.len()));
    for (i, &d) in distances.iter().enumerate() {
        let dist = match filter {
            Some(key) if filter_keys[i] != key => d + penalty,
            _ => d,
        };
        let cand = Candidate {
            dist,
            index: i as u32,
        };
        if heap.len() < k {
            heap.push(cand);
        } else if let Some(mut worst) = heap.peek_mut() {
            if cand < *worst {
                *worst = cand;
            }
        }
    }

    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|c| c.index)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UNRESOLVED;

    #[test]
    fn unfiltered_reference_scenario() {
        let dists = [0.0, 100.0, 200.0];
        let keys = [0, 0, 0];
        let topk = filtered_top_k(&dists, &keys, None, DEFAULT_FILTER_PENALTY, 2).unwrap();
        assert_eq!(topk, vec![0, 1]);
    }

    #[test]
    fn filtered_reference_scenario() {
        // Effective distances [1000, 100, 1200].
        let dists = [0.0, 100.0, 200.0];
        let keys = ['A' as u32, 'B' as u32, 'A' as u32];
        let topk = filtered_top_k(&dists, &keys, Some('B' as u32), 1000.0, 1).unwrap();
        assert_eq!(topk, vec![1]);
    }

    #[test]
    fn soft_filter_falls_back_past_matches() {
        // Only one key matches but k=3: the match comes first, then the
        // best non-matching entries.
        let dists = [5.0, 1.0, 2.0, 3.0];
        let keys = [9, 0, 0, 0];
        let topk = filtered_top_k(&dists, &keys, Some(9), 1024.0, 3).unwrap();
        assert_eq!(topk, vec![0, 1, 2]);
    }

    #[test]
    fn ties_break_by_ascending_index() {
        let dists = [1.0, 1.0, 1.0, 0.5];
        let keys = [0; 4];
        let topk = filtered_top_k(&dists, &keys, None, 1024.0, 3).unwrap();
        assert_eq!(topk, vec![3, 0, 1]);
    }

    #[test]
    fn k_larger_than_corpus_returns_all() {
        let topk = filtered_top_k(&[3.0, 1.0], &[0, 0], None, 1024.0, 10).unwrap();
        assert_eq!(topk, vec![1, 0]);
        // Even an absurd k only ever costs min(k, n).
        let topk = filtered_top_k(&[3.0, 1.0], &[0, 0], None, 1024.0, usize::MAX).unwrap();
        assert_eq!(topk, vec![1, 0]);
    }

    #[test]
    fn unresolved_entries_rank_last_even_penalized() {
        let dists = [UNRESOLVED, 900.0, UNRESOLVED, 2.0];
        let keys = [7, 0, 7, 0];
        // Filter matches only the unresolved entries; the penalized real
        // distances still beat the sentinel.
        let topk = filtered_top_k(&dists, &keys, Some(7), 1024.0, 3).unwrap();
        assert_eq!(topk, vec![3, 1, 0]);
    }

    #[test]
    fn zero_k_and_empty_corpus_are_errors() {
        assert_eq!(
            filtered_top_k(&[1.0], &[0], None, 1024.0, 0).unwrap_err(),
            SearchError::InvalidK(0)
        );
        assert_eq!(
            filtered_top_k(&[], &[], None, 1024.0, 3).unwrap_err(),
            SearchError::EmptyCorpus
        );
    }
}
