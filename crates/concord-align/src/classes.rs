//! Class pass: `c1 ⊆ c2` is the share of `c1`'s instances whose equivalents
//! belong to `c2`, each instance counting `1 − Π(1 − P(i1 ≡ i2))` over its
//! equivalents `i2` in `c2`.

use std::collections::BTreeMap;

use ahash::AHashMap;
use concord_facts::{Closure, FactStore, Node};

use crate::engine::Direction;
use crate::equivalence::Equivalences;
use crate::events::{ScoreEvent, ScoreKind};

pub(crate) fn score_class(
    direction: Direction,
    target: &FactStore,
    source: &FactStore,
    equivalences: &Equivalences<'_>,
    class: u32,
    theta: f64,
) -> Vec<ScoreEvent> {
    let Some(instances) = source.instances_of(class) else {
        return Vec::new();
    };
    if instances.is_empty() {
        return Vec::new();
    }

    let mut sums: BTreeMap<u32, f64> = BTreeMap::new();
    for instance in instances.iter() {
        let mut misses: AHashMap<u32, f64> = AHashMap::new();
        for (other, eq) in equivalences.of(Node::Entity(instance)) {
            let Node::Entity(other) = other else { continue };
            let classes = match target.classes_of(other) {
                Closure::Known(classes) => classes,
                Closure::TooBroad => target.direct_types(other).to_vec(),
            };
            for c2 in classes {
                *misses.entry(c2).or_insert(1.0) *= 1.0 - eq;
            }
        }
        for (c2, miss) in misses {
            *sums.entry(c2).or_insert(0.0) += 1.0 - miss;
        }
    }

    let n = instances.len() as f64;
    sums.into_iter()
        .map(|(c2, sum)| (c2, (sum / n).min(1.0)))
        .filter(|&(_, score)| score > theta)
        .map(|(c2, score)| ScoreEvent {
            kind: ScoreKind::SubClass(direction),
            sub: class as u64,
            sup: c2 as u64,
            score,
        })
        .collect()
}
