use serde::{Deserialize, Serialize};

/// How the relation pass turns accumulated evidence into a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerKind {
    /// Count of facts with at least one comparison opportunity.
    Simple,
    /// Sum over facts of `1 − Π(1 − p)` over their opportunities.
    Real,
}

/// Denominator of a relation score, accumulated fact by fact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationNormalizer {
    kind: NormalizerKind,
    total: f64,
    miss: f64,
    opportunities: usize,
}

impl RelationNormalizer {
    pub fn new(kind: NormalizerKind) -> Self {
        Self {
            kind,
            total: 0.0,
            miss: 1.0,
            opportunities: 0,
        }
    }

    pub fn kind(&self) -> NormalizerKind {
        self.kind
    }

    pub fn begin_fact(&mut self) {
        self.miss = 1.0;
        self.opportunities = 0;
    }

    /// One comparison opportunity of probability `p`.
    pub fn observe(&mut self, p: f64) {
        self.miss *= 1.0 - p.clamp(0.0, 1.0);
        self.opportunities += 1;
    }

    pub fn end_fact(&mut self) {
        if self.opportunities == 0 {
            return;
        }
        self.total += match self.kind {
            NormalizerKind::Simple => 1.0,
            NormalizerKind::Real => 1.0 - self.miss,
        };
        self.begin_fact();
    }

    pub fn merge(&mut self, other: &RelationNormalizer) {
        self.total += other.total;
    }

    /// The denominator, or `None` when there was nothing to compare.
    pub fn value(&self) -> Option<f64> {
        (self.total > 0.0).then_some(self.total)
    }
}
