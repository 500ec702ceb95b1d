use ahash::AHashSet;

use crate::SubPair;

/// Greedy approximate maximum-weight bipartite matching.
///
/// All candidates are sorted by descending score (equal scores by lowest sub,
/// then lowest super) and accepted while neither endpoint is taken. The
/// result is injective in both endpoints and is returned in acceptance order.
pub fn approximate_bipartite(pairs: &[SubPair]) -> Vec<SubPair> {
    let mut sorted: Vec<SubPair> = pairs.to_vec();
    sorted.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.sub.cmp(&b.sub))
            .then(a.sup.cmp(&b.sup))
    });

    let mut used_subs = AHashSet::new();
    let mut used_supers = AHashSet::new();
    let mut out = Vec::new();
    for pair in sorted {
        if used_subs.contains(&pair.sub) || used_supers.contains(&pair.sup) {
            continue;
        }
        used_subs.insert(pair.sub);
        used_supers.insert(pair.sup);
        out.push(pair);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greedy_takes_highest_first() {
        let pairs = [
            SubPair::new(1, 10, 0.9),
            SubPair::new(1, 11, 0.8),
            SubPair::new(2, 10, 0.85),
            SubPair::new(2, 11, 0.1),
        ];
        let matched = approximate_bipartite(&pairs);
        assert_eq!(
            matched,
            vec![SubPair::new(1, 10, 0.9), SubPair::new(2, 11, 0.1)]
        );
    }

    #[test]
    fn ties_prefer_lowest_sub_then_super() {
        let pairs = [
            SubPair::new(2, 10, 0.5),
            SubPair::new(1, 11, 0.5),
            SubPair::new(1, 10, 0.5),
        ];
        let matched = approximate_bipartite(&pairs);
        // (1, 10) wins the tie; both other pairs share an endpoint with it.
        assert_eq!(matched, vec![SubPair::new(1, 10, 0.5)]);
    }
}
