//! Cross-base equivalence lookups.
//!
//! Entities are equivalent through the equality store; literals through the
//! configured [`LiteralMode`].

use concord_facts::{FactStore, LiteralId, Node};
use concord_scores::ScoreStore;

use crate::engine::Direction;
use crate::settings::LiteralMode;

/// Compares a literal of one base with the literals of another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralMatcher {
    pub mode: LiteralMode,
    pub threshold: f64,
}

impl LiteralMatcher {
    pub fn new(mode: LiteralMode, threshold: f64) -> Self {
        Self { mode, threshold }
    }

    /// Literals of `target` matching `text`, best first.
    pub fn matches(&self, text: &str, target: &FactStore) -> Vec<(LiteralId, f64)> {
        match self.mode {
            LiteralMode::Identity => target
                .literal_id(text)
                .map(|id| vec![(id, 1.0)])
                .unwrap_or_default(),
            LiteralMode::Normalized => target
                .literals_normalized(text)
                .iter()
                .map(|&id| (id, 1.0))
                .collect(),
            LiteralMode::Approximate => target
                .literal_index()
                .query(text, self.threshold)
                .into_iter()
                .map(|m| (m.literal, m.similarity))
                .collect(),
        }
    }
}

/// Equivalents in `target` of nodes of `source`.
#[derive(Debug, Clone, Copy)]
pub struct Equivalences<'a> {
    pub source: &'a FactStore,
    pub target: &'a FactStore,
    pub direction: Direction,
    pub equality: &'a dyn ScoreStore,
    pub matcher: LiteralMatcher,
}

impl<'a> Equivalences<'a> {
    /// Candidates of `node` with their probability, best first.
    pub fn of(&self, node: Node) -> Vec<(Node, f64)> {
        match node {
            Node::Entity(id) => {
                let pairs = match self.direction {
                    Direction::Forward => self.equality.best_matches_of(id as u64),
                    Direction::Backward => self.equality.best_matches_of_inverse(id as u64),
                };
                pairs
                    .into_iter()
                    .map(|p| {
                        let other = match self.direction {
                            Direction::Forward => p.sup,
                            Direction::Backward => p.sub,
                        };
                        (Node::Entity(other as u32), p.score)
                    })
                    .collect()
            }
            Node::Literal(id) => match self.source.literal(id) {
                Some(text) => self
                    .matcher
                    .matches(text, self.target)
                    .into_iter()
                    .map(|(lit, score)| (Node::Literal(lit), score))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    /// Probability that `node` (in source) and `other` (in target) are the
    /// same, from an already computed candidate list.
    pub fn score_in(candidates: &[(Node, f64)], other: Node) -> f64 {
        candidates
            .iter()
            .find(|(n, _)| *n == other)
            .map(|&(_, s)| s)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_facts::{FactsConfig, TargetType};
    use concord_scores::{HashScoreStore, Resolution};

    fn kb(facts: &[(&str, &str, &str)]) -> FactStore {
        let mut kb = FactStore::new(FactsConfig::default());
        for (s, r, o) in facts {
            kb.add_fact(s, r, o, TargetType::String).unwrap();
        }
        kb.init();
        kb
    }

    #[test]
    fn literal_modes() {
        let target = kb(&[("a", "label", "New York"), ("b", "label", "new  york")]);
        let identity = LiteralMatcher::new(LiteralMode::Identity, 0.8);
        assert_eq!(identity.matches("New York", &target).len(), 1);
        let normalized = LiteralMatcher::new(LiteralMode::Normalized, 0.8);
        assert_eq!(normalized.matches("NEW YORK", &target).len(), 2);
        let approx = LiteralMatcher::new(LiteralMode::Approximate, 0.5);
        let hits = approx.matches("New Yorkk", &target);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|&(_, s)| s >= 0.5 && s < 1.0));
    }

    #[test]
    fn entity_equivalents_follow_direction() {
        let kb1 = kb(&[("a", "label", "x")]);
        let kb2 = kb(&[("b", "label", "x")]);
        let mut eq = HashScoreStore::new(0.05, Resolution::SingleBest);
        eq.set(3, 9, 0.7).unwrap();
        let forward = Equivalences {
            source: &kb1,
            target: &kb2,
            direction: Direction::Forward,
            equality: &eq,
            matcher: LiteralMatcher::new(LiteralMode::Identity, 0.8),
        };
        assert_eq!(forward.of(Node::Entity(3)), vec![(Node::Entity(9), 0.7)]);
        let backward = Equivalences {
            source: &kb2,
            target: &kb1,
            direction: Direction::Backward,
            ..forward
        };
        assert_eq!(backward.of(Node::Entity(9)), vec![(Node::Entity(3), 0.7)]);
        assert!(backward.of(Node::Entity(3)).is_empty());
    }
}
