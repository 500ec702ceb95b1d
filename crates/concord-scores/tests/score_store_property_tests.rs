//! Property tests for the score store contract.
//!
//! Both backends are driven with the same random writes:
//! - every committed score lies in `(theta, 1]`
//! - after `reconcile_both_ways`, chosen pairs agree in both views
//! - the bipartite reducer never reuses an endpoint
//! - hash and matrix backends commit the same pairs

use concord_scores::{
    approximate_bipartite, new_store, Backend, Resolution, ScoreStore, StoreSpec, SubPair,
};
use proptest::prelude::*;
use std::collections::HashSet;

const DIM: u64 = 8;

fn writes() -> impl Strategy<Value = Vec<(u64, u64, f64)>> {
    prop::collection::vec((0..DIM, 0..DIM, 0.0f64..1.5), 0..64)
}

fn resolution() -> impl Strategy<Value = Resolution> {
    prop_oneof![
        Just(Resolution::SingleBest),
        (1usize..4).prop_map(|max_matches| Resolution::MultiCandidate { max_matches }),
    ]
}

fn both_backends(theta: f64, resolution: Resolution) -> [Box<dyn ScoreStore>; 2] {
    [
        new_store(StoreSpec {
            theta,
            resolution,
            backend: Backend::Hash,
        }),
        new_store(StoreSpec {
            theta,
            resolution,
            backend: Backend::Matrix {
                subs: DIM as usize,
                supers: DIM as usize,
            },
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn committed_scores_stay_in_range(
        ops in writes(),
        theta in 0.0f64..0.5,
        res in resolution(),
    ) {
        for mut store in both_backends(theta, res) {
            for &(a, b, s) in &ops {
                store.set(a, b, s).unwrap();
            }
            for pair in store.pairs() {
                prop_assert!(pair.score > theta && pair.score <= 1.0);
            }
            prop_assert_eq!(store.pairs().len(), store.len());
        }
    }

    #[test]
    fn backends_agree(ops in writes(), res in resolution()) {
        let [mut hash, mut matrix] = both_backends(0.05, res);
        for &(a, b, s) in &ops {
            prop_assert_eq!(hash.set(a, b, s), matrix.set(a, b, s));
        }
        hash.reconcile_both_ways();
        matrix.reconcile_both_ways();
        prop_assert_eq!(hash.pairs(), matrix.pairs());
    }

    #[test]
    fn reconcile_leaves_mutual_choices(ops in writes()) {
        for mut store in both_backends(0.05, Resolution::SingleBest) {
            for &(a, b, s) in &ops {
                store.set(a, b, s).unwrap();
            }
            store.reconcile_both_ways();
            for sub in store.subs() {
                let best = store.best_matches_of(sub);
                prop_assert_eq!(best.len(), 1);
                let back = store.best_matches_of_inverse(best[0].sup);
                prop_assert_eq!(back.len(), 1);
                prop_assert_eq!(back[0].sub, sub);
            }
        }
    }

    #[test]
    fn bipartite_is_injective(
        pairs in prop::collection::vec((0..DIM, 0..DIM, 0.0f64..1.0), 0..64),
    ) {
        let pairs: Vec<SubPair> = pairs
            .into_iter()
            .map(|(a, b, s)| SubPair::new(a, b, s))
            .collect();
        let matched = approximate_bipartite(&pairs);
        let subs: HashSet<u64> = matched.iter().map(|p| p.sub).collect();
        let supers: HashSet<u64> = matched.iter().map(|p| p.sup).collect();
        prop_assert_eq!(subs.len(), matched.len());
        prop_assert_eq!(supers.len(), matched.len());
        // Greedy is maximal: every dropped pair shares an endpoint.
        for p in &pairs {
            prop_assert!(subs.contains(&p.sub) || supers.contains(&p.sup));
        }
    }
}
