//! Property-based tests for the PQ search core.
//!
//! These verify invariants that should hold regardless of input:
//! - ADC distances are deterministic and agree with the naive definition
//! - The selector's ordering, distinctness, and soft-filter guarantees
//! - Extension (append + extend) never diverges from a from-scratch run

use proptest::prelude::*;

use quiver::provider::TitleTable;
use quiver::scheduler::NullObserver;
use quiver::{filtered_top_k, Codebook, SearchEngine};

mod adc_props {
    use super::*;

    #[derive(Clone, Debug)]
    struct PqCase {
        nested: Vec<Vec<Vec<f32>>>,
        query: Vec<f32>,
        codes: Vec<u8>,
    }

    fn arb_case() -> impl Strategy<Value = PqCase> {
        (1usize..4, 1usize..8, 1usize..4, 1usize..40).prop_flat_map(|(m, k, dsub, rows)| {
            let centroids = prop::collection::vec(
                prop::collection::vec(prop::collection::vec(-10.0f32..10.0, dsub), k),
                m,
            );
            let query = prop::collection::vec(-10.0f32..10.0, m * dsub);
            let codes = prop::collection::vec(0..k as u8, rows * m);
            (centroids, query, codes).prop_map(|(nested, query, codes)| PqCase {
                nested,
                query,
                codes,
            })
        })
    }

    fn naive_distance(nested: &[Vec<Vec<f32>>], query: &[f32], codes: &[u8]) -> f32 {
        let dsub = nested[0][0].len();
        codes
            .iter()
            .enumerate()
            .map(|(sub, &code)| {
                let centroid = &nested[sub][code as usize];
                query[sub * dsub..(sub + 1) * dsub]
                    .iter()
                    .zip(centroid.iter())
                    .map(|(q, c)| (q - c) * (q - c))
                    .sum::<f32>()
            })
            .sum()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn adc_is_deterministic(case in arb_case()) {
            let cb = Codebook::from_nested(&case.nested).unwrap();
            let a = quiver::adc::AdcTable::build(&cb, &case.query).unwrap();
            let b = quiver::adc::AdcTable::build(&cb, &case.query).unwrap();
            let m = cb.m();
            for row in case.codes.chunks_exact(m) {
                prop_assert_eq!(a.distance(row).to_bits(), b.distance(row).to_bits());
            }
        }

        #[test]
        fn adc_agrees_with_naive_definition(case in arb_case()) {
            let cb = Codebook::from_nested(&case.nested).unwrap();
            let table = quiver::adc::AdcTable::build(&cb, &case.query).unwrap();
            for row in case.codes.chunks_exact(cb.m()) {
                let fast = table.distance(row);
                let slow = naive_distance(&case.nested, &case.query, row);
                prop_assert!(fast >= 0.0);
                prop_assert!(
                    (fast - slow).abs() <= 1e-3 * slow.abs().max(1.0),
                    "ADC {} vs naive {}", fast, slow
                );
            }
        }
    }
}

mod selector_props {
    use super::*;

    fn effective(d: f32, key: u32, filter: Option<u32>, penalty: f32) -> f32 {
        match filter {
            Some(f) if key != f => d + penalty,
            _ => d,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn returns_k_distinct_sorted_indices(
            dists in prop::collection::vec(0.0f32..100.0, 1..150),
            k in 1usize..30,
            keys_seed in prop::collection::vec(0u32..4, 150),
            filter in prop::option::of(0u32..4),
        ) {
            let keys = &keys_seed[..dists.len()];
            let penalty = 1024.0;
            let topk = filtered_top_k(&dists, keys, filter, penalty, k).unwrap();

            prop_assert_eq!(topk.len(), k.min(dists.len()));

            let mut seen = std::collections::HashSet::new();
            for &i in &topk {
                prop_assert!(seen.insert(i), "duplicate index {}", i);
            }

            for pair in topk.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let ea = effective(dists[a as usize], keys[a as usize], filter, penalty);
                let eb = effective(dists[b as usize], keys[b as usize], filter, penalty);
                prop_assert!(
                    ea < eb || (ea == eb && a < b),
                    "order violated at {} ({}) vs {} ({})", a, ea, b, eb
                );
            }
        }

        #[test]
        fn soft_filter_puts_matches_first(
            dists in prop::collection::vec(0.0f32..100.0, 1..150),
            k in 1usize..30,
            keys_seed in prop::collection::vec(0u32..3, 150),
            filter in 0u32..3,
        ) {
            let keys = &keys_seed[..dists.len()];
            let topk = filtered_top_k(&dists, keys, Some(filter), 1024.0, k).unwrap();

            let matching = keys.iter().filter(|&&key| key == filter).count();
            if matching >= topk.len() {
                // Enough matches: every returned index must match.
                for &i in &topk {
                    prop_assert_eq!(keys[i as usize], filter);
                }
            } else {
                // Not enough: every match is returned, and all of them
                // come before any non-match.
                let returned_matches = topk
                    .iter()
                    .filter(|&&i| keys[i as usize] == filter)
                    .count();
                prop_assert_eq!(returned_matches, matching);
                for &i in &topk[..returned_matches] {
                    prop_assert_eq!(keys[i as usize], filter);
                }
            }
        }
    }
}

mod extension_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn extend_matches_from_scratch(
            centroids in prop::collection::vec(
                prop::collection::vec(prop::collection::vec(-5.0f32..5.0, 2), 4),
                3,
            ),
            query in prop::collection::vec(-5.0f32..5.0, 6),
            codes_a in prop::collection::vec(0u8..4, 30), // 10 rows at m=3
            codes_b in prop::collection::vec(0u8..4, 15), // 5 rows
            k in 1usize..12,
        ) {
            let cb = Codebook::from_nested(&centroids).unwrap();

            let meta = |rows: usize| -> Box<TitleTable> {
                Box::new(TitleTable::new((0..rows).map(|i| format!("t{i}")).collect()))
            };

            let mut full = SearchEngine::new(cb.clone());
            full.append_shard(codes_a.clone(), meta(10)).unwrap();
            full.append_shard(codes_b.clone(), meta(5)).unwrap();
            full.set_k(k).unwrap();
            let mut run = full.begin_search(query.clone()).unwrap();
            full.run_to_completion(&mut run, &mut NullObserver).unwrap();

            let mut incr = SearchEngine::new(cb);
            incr.append_shard(codes_a, meta(10)).unwrap();
            incr.set_k(k).unwrap();
            let mut run = incr.begin_search(query).unwrap();
            incr.run_to_completion(&mut run, &mut NullObserver).unwrap();
            let shard = incr.append_shard(codes_b, meta(5)).unwrap();
            let mut run = incr.begin_extend(shard).unwrap();
            incr.run_to_completion(&mut run, &mut NullObserver).unwrap();

            prop_assert_eq!(full.store().distances(), incr.store().distances());
            prop_assert_eq!(full.rerank_only().unwrap(), incr.rerank_only().unwrap());
        }
    }
}
