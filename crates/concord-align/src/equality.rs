//! Equality pass: scores `y1 ≡ y2` for one base-1 instance at a time.
//!
//! Every fact `r1(y1, x1)` is evidence. For each target join relation `J2`
//! aligned with `r1` and each `x2` equivalent to `x1`, every `y2` with
//! `J2(y2, x2)` gets a factor `1 − P(x1 ≡ x2) × weight` in its running
//! product, where the weight is the alignment score times the inverse
//! functionality of the relation on the evidence side. The final score is
//! `1 − product`.

use ahash::AHashMap;
use concord_facts::{FactStore, Node, Rel};
use concord_scores::ScoreStore;

use crate::equivalence::Equivalences;
use crate::events::{ScoreEvent, ScoreKind};
use crate::join::{JoinCoder, JoinRelation};
use crate::settings::{EqualityCandidates, Settings};
use crate::trials::{RelationTrials, Verdict};
use crate::AlignError;

/// A target join relation usable as evidence for a source relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) join: JoinRelation,
    pub(crate) code: u64,
    /// Evidence weight (alignment score × inverse functionality).
    pub(crate) weight: f64,
    /// Raw alignment score; `None` for bootstrap seeds.
    pub(crate) alignment: Option<f64>,
}

/// Read-only view of everything one equality pass needs.
pub(crate) struct EqualityWorker<'a> {
    pub(crate) kb1: &'a FactStore,
    pub(crate) kb2: &'a FactStore,
    pub(crate) coder1: &'a JoinCoder,
    pub(crate) coder2: &'a JoinCoder,
    pub(crate) settings: &'a Settings,
    /// `kb1 relation ⊆ kb2 join`.
    pub(crate) forward: &'a dyn ScoreStore,
    /// `kb2 relation ⊆ kb1 join`.
    pub(crate) backward: &'a dyn ScoreStore,
    pub(crate) equivalences: Equivalences<'a>,
    pub(crate) trials: &'a RelationTrials,
    pub(crate) iteration: usize,
}

impl EqualityWorker<'_> {
    /// Equality events for instance `y1`, ascending by `y2`.
    pub(crate) fn score_entity(&self, y1: u32) -> Result<Vec<ScoreEvent>, AlignError> {
        let theta = self.settings.theta;
        let mut products: AHashMap<u32, f64> = AHashMap::new();
        let views = self.kb1.facts_about(Node::Entity(y1));

        for view in &views {
            let r1 = view.relation;
            if self.kb1.is_hierarchy_relation(r1.entity()) {
                continue;
            }
            match self.kb1.functionality_across(r1.inverse(), Some(self.kb2)) {
                Some(f) if f >= theta => {}
                _ => continue,
            }
            let code1 = self.coder1.code_of(r1)?;
            let verdict = self.trials.verdict(code1);
            if *verdict == Verdict::NotWorthTrying {
                continue;
            }
            let candidates: Vec<Candidate> = self
                .candidates(r1, code1)?
                .into_iter()
                .filter(|c| verdict.allows(c.code))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let xs = self.equivalences.of(view.other);
            let mut hits = Vec::new();
            for candidate in &candidates {
                let back = candidate.join.reverse();
                let mut hit = false;
                for &(x2, ex) in &xs {
                    let ys = self.kb2.follow(x2, back.as_slice());
                    if ys.len() > self.settings.max_frontier {
                        continue;
                    }
                    for y2 in ys {
                        let Node::Entity(y2) = y2 else { continue };
                        if !self.kb2.is_instance(y2) {
                            continue;
                        }
                        *products.entry(y2).or_insert(1.0) *= 1.0 - ex * candidate.weight;
                        hit = true;
                    }
                }
                if hit {
                    hits.push(candidate.code);
                }
            }
            hits.sort_unstable();
            hits.dedup();
            self.trials.record(code1, &hits);
        }

        let mut scores: Vec<(u32, f64)> = products
            .into_iter()
            .map(|(y2, product)| (y2, 1.0 - product))
            .filter(|&(_, s)| s > theta)
            .collect();
        scores.sort_by_key(|&(y2, _)| y2);

        if self.settings.punish {
            for (y2, score) in &mut scores {
                *score *= self.punishment(&views, *y2)?;
            }
            scores.retain(|&(_, s)| s > theta);
        }

        Ok(select(scores, self.settings.equality_candidates)
            .into_iter()
            .map(|(y2, score)| ScoreEvent {
                kind: ScoreKind::Equality,
                sub: y1 as u64,
                sup: y2 as u64,
                score,
            })
            .collect())
    }

    /// Target join relations aligned with `r1`, with their evidence weights.
    pub(crate) fn candidates(&self, r1: Rel, code1: u64) -> Result<Vec<Candidate>, AlignError> {
        let inverse_fun = self.kb1.functionality(r1.inverse()).unwrap_or(0.0);
        let mut out = Vec::new();

        // r2 ⊆ r1: a fact of r2 implies one of r1.
        for pair in self.backward.best_matches_of_inverse(code1) {
            let join = self.coder2.decode(pair.sub)?;
            out.push(Candidate {
                join,
                code: pair.sub,
                weight: pair.score * inverse_fun,
                alignment: Some(pair.score),
            });
        }

        // r1 ⊆ J2
        if self.settings.use_super_relations {
            for pair in self.forward.best_matches_of(code1) {
                let join = self.coder2.decode(pair.sup)?;
                let weight = pair.score * join_inverse_functionality(self.kb2, &join);
                out.push(Candidate {
                    join,
                    code: pair.sup,
                    weight,
                    alignment: Some(pair.score),
                });
            }
        }

        if out.is_empty() && self.iteration == 0 {
            let target_type = self.kb1.dominant_target(r1);
            for &r2 in self.kb2.relations() {
                if self.kb2.is_hierarchy_relation(r2) {
                    continue;
                }
                let rel2 = if r1.is_inverse() {
                    Rel::forward(r2).inverse()
                } else {
                    Rel::forward(r2)
                };
                if self.kb2.dominant_target(rel2) != target_type {
                    continue;
                }
                let join = JoinRelation::single(rel2);
                out.push(Candidate {
                    join,
                    code: self.coder2.code(&join)?,
                    weight: self.settings.iota * inverse_fun,
                    alignment: None,
                });
            }
        }

        out.retain(|c| c.weight > 0.0 && !c.join.is_trivial());
        Ok(out)
    }

    /// Factor by which facts of `y1` contradicted by `y2` lower the score.
    ///
    /// For a functional `r1(y1, x1)` aligned with `J2`, a `y2` that has
    /// `J2` values none of which is equivalent to `x1` is counter-evidence.
    fn punishment(&self, views: &[concord_facts::FactView], y2: u32) -> Result<f64, AlignError> {
        let mut factor = 1.0;
        for view in views {
            let r1 = view.relation;
            if self.kb1.is_hierarchy_relation(r1.entity()) {
                continue;
            }
            let Some(f) = self.kb1.functionality(r1) else {
                continue;
            };
            let code1 = self.coder1.code_of(r1)?;
            let aligned: Vec<Candidate> = self
                .candidates(r1, code1)?
                .into_iter()
                .filter(|c| c.alignment.is_some())
                .collect();
            if aligned.is_empty() {
                continue;
            }
            let xs = self.equivalences.of(view.other);
            for candidate in aligned {
                let values = self.kb2.follow(Node::Entity(y2), candidate.join.as_slice());
                if values.is_empty() {
                    continue;
                }
                let miss: f64 = values
                    .iter()
                    .map(|&x2| 1.0 - Equivalences::score_in(&xs, x2))
                    .product();
                let p = candidate.alignment.unwrap_or(0.0);
                factor *= 1.0 - f * p * miss;
            }
        }
        Ok(factor.max(0.0))
    }
}

/// Product of the inverse functionalities of the relations of `join`.
pub(crate) fn join_inverse_functionality(kb: &FactStore, join: &JoinRelation) -> f64 {
    join.as_slice()
        .iter()
        .map(|r| kb.functionality(r.inverse()).unwrap_or(0.0))
        .product()
}

/// Apply the candidate policy to scores sorted by ascending id.
fn select(scores: Vec<(u32, f64)>, policy: EqualityCandidates) -> Vec<(u32, f64)> {
    let Some(max) = scores.iter().map(|&(_, s)| s).reduce(f64::max) else {
        return scores;
    };
    match policy {
        EqualityCandidates::All => scores,
        EqualityCandidates::TiedMaximum => scores.into_iter().filter(|&(_, s)| s == max).collect(),
        EqualityCandidates::SingleMaximum => scores
            .into_iter()
            .find(|&(_, s)| s == max)
            .into_iter()
            .collect(),
    }
}
