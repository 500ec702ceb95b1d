//! Property tests for join relations and their codes.
//!
//! - codes are dense and injective: decode(code(j)) == j, code(decode(c)) == c
//! - reversing twice is the identity
//! - code_with(j, true) is the code of j reversed
//! - a relation followed by its inverse makes a path trivial

use concord_align::{JoinCoder, JoinRelation};
use concord_facts::Rel;
use proptest::prelude::*;

const RELATIONS: u32 = 4;

fn coder(max_len: usize) -> JoinCoder {
    // Non-contiguous entity ids, as in a real store.
    let relations = (0..RELATIONS).map(|i| 3 * i + 1).collect();
    JoinCoder::from_relations(relations, max_len).unwrap()
}

fn rel() -> impl Strategy<Value = Rel> {
    (0..RELATIONS, any::<bool>()).prop_map(|(i, inverse)| {
        let rel = Rel::forward(3 * i + 1);
        if inverse {
            rel.inverse()
        } else {
            rel
        }
    })
}

fn join(max_len: usize) -> impl Strategy<Value = JoinRelation> {
    prop::collection::vec(rel(), 0..=max_len)
        .prop_map(|rels| JoinRelation::from_slice(&rels).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn codes_decode_back(j in join(3)) {
        let coder = coder(3);
        let code = coder.code(&j).unwrap();
        prop_assert!(code < coder.universe());
        prop_assert_eq!(coder.decode(code).unwrap(), j);
    }

    #[test]
    fn every_code_in_the_universe_is_a_path(max_len in 1usize..=3, pick in any::<u64>()) {
        let coder = coder(max_len);
        let code = pick % coder.universe();
        let j = coder.decode(code).unwrap();
        prop_assert!(j.len() <= max_len);
        prop_assert_eq!(coder.code(&j).unwrap(), code);
        prop_assert!(coder.decode(coder.universe()).is_err());
    }

    #[test]
    fn reverse_is_an_involution(j in join(4)) {
        prop_assert_eq!(j.reverse().reverse(), j);
        prop_assert_eq!(j.reverse().len(), j.len());
    }

    #[test]
    fn reversed_code_matches_reverse(j in join(3)) {
        let coder = coder(3);
        prop_assert_eq!(
            coder.code_with(&j, true).unwrap(),
            coder.code(&j.reverse()).unwrap()
        );
        prop_assert_eq!(coder.code_with(&j, false).unwrap(), coder.code(&j).unwrap());
    }

    #[test]
    fn round_trips_are_trivial(prefix in join(1), r in rel()) {
        let j = prefix.push(r).unwrap().push(r.inverse()).unwrap();
        prop_assert!(j.is_trivial());
        prop_assert!(j.reverse().is_trivial());
    }

    #[test]
    fn single_relations_are_never_trivial(r in rel()) {
        prop_assert!(!JoinRelation::single(r).is_trivial());
    }
}
