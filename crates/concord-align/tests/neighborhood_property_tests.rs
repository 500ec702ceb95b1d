//! Property tests for neighborhood merging.
//!
//! Workers fold facts into private trees that are merged in whatever order
//! rayon finishes them, so `reduce_with` must be commutative and associative
//! up to float rounding.

use concord_align::{Neighborhood, NodeStats};
use proptest::prelude::*;

/// One observation: a path of symbols and the evidence at its end.
type Observation = (Vec<u8>, f64);

fn observations() -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::vec(
        (prop::collection::vec(0u8..3, 1..=3), 0.0f64..1.0),
        0..24,
    )
}

/// Injective path code: digits shifted by one, read in base 4.
fn code(path: &[u8]) -> u64 {
    path.iter().fold(0, |c, &s| c * 4 + s as u64 + 1)
}

fn build(obs: &[Observation]) -> Neighborhood {
    let mut tree = Neighborhood::new();
    for (path, evidence) in obs {
        tree.visit(Neighborhood::ROOT);
        let mut slot = Neighborhood::ROOT;
        for depth in 1..=path.len() {
            slot = tree.child(slot, code(&path[..depth]));
            tree.visit(slot);
        }
        tree.register_evidence(slot, *evidence);
        tree.propagate_scores();
    }
    tree
}

fn merged(mut a: Neighborhood, b: &Neighborhood) -> Neighborhood {
    a.reduce_with(b);
    a
}

fn same(a: &[NodeStats], b: &[NodeStats]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.code == y.code && x.occurrence == y.occurrence && (x.score - y.score).abs() < 1e-9
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn reduce_is_commutative(a in observations(), b in observations()) {
        let (ta, tb) = (build(&a), build(&b));
        let ab = merged(ta.clone(), &tb);
        let ba = merged(tb, &ta);
        prop_assert!(same(&ab.entries(), &ba.entries()));
        prop_assert_eq!(
            ab.stats(Neighborhood::ROOT).map(|s| s.occurrence),
            ba.stats(Neighborhood::ROOT).map(|s| s.occurrence)
        );
    }

    #[test]
    fn reduce_is_associative(
        a in observations(),
        b in observations(),
        c in observations(),
    ) {
        let (ta, tb, tc) = (build(&a), build(&b), build(&c));
        let left = merged(merged(ta.clone(), &tb), &tc);
        let right = merged(ta, &merged(tb, &tc));
        prop_assert!(same(&left.entries(), &right.entries()));
    }

    #[test]
    fn merging_splits_equals_one_pass(obs in observations(), split in 0usize..24) {
        let split = split.min(obs.len());
        let whole = build(&obs);
        let parts = merged(build(&obs[..split]), &build(&obs[split..]));
        prop_assert!(same(&whole.entries(), &parts.entries()));
    }

    #[test]
    fn scores_never_exceed_occurrences(obs in observations()) {
        let tree = build(&obs);
        for node in tree.entries() {
            prop_assert!(node.score >= 0.0);
            prop_assert!(node.score <= node.occurrence as f64 + 1e-9);
        }
    }
}
