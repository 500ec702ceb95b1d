//! Bounded transitive closure over the class hierarchy.

use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;

/// Result of a capped closure computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closure {
    /// All reachable ids, sorted ascending.
    Known(Vec<u32>),
    /// The closure exceeded the configured cap; callers must not assume
    /// anything about its members.
    TooBroad,
}

impl Closure {
    pub fn known(&self) -> Option<&[u32]> {
        match self {
            Closure::Known(ids) => Some(ids),
            Closure::TooBroad => None,
        }
    }

    pub fn is_too_broad(&self) -> bool {
        matches!(self, Closure::TooBroad)
    }
}

/// Breadth-first closure from `seeds` along `edges`, seeds included.
pub(crate) fn closure(
    seeds: impl IntoIterator<Item = u32>,
    edges: &AHashMap<u32, Vec<u32>>,
    cap: usize,
) -> Closure {
    let mut seen: AHashSet<u32> = AHashSet::new();
    let mut queue: VecDeque<u32> = VecDeque::new();
    for seed in seeds {
        if seen.insert(seed) {
            queue.push_back(seed);
        }
    }
    if seen.len() > cap {
        return Closure::TooBroad;
    }
    while let Some(current) = queue.pop_front() {
        let Some(next) = edges.get(&current) else {
            continue;
        };
        for &n in next {
            if seen.insert(n) {
                if seen.len() > cap {
                    return Closure::TooBroad;
                }
                queue.push_back(n);
            }
        }
    }
    let mut out: Vec<u32> = seen.into_iter().collect();
    out.sort_unstable();
    Closure::Known(out)
}
