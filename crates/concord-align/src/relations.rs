//! Relation pass: scores `r1 ⊆ J2` for one source relation at a time.
//!
//! Every fact `r1(x1, y1)` is mapped into the target base through the
//! current equalities. From every `x2 ≡ x1`, join relations up to the
//! configured length are explored; a path that reaches some `y2 ≡ y1`
//! collects the evidence `P(x1 ≡ x2) × P(y1 ≡ y2)`. The score of `J2` is its
//! accumulated evidence divided by the relation normalizer.

use std::collections::BTreeMap;

use concord_facts::{FactStore, Node, Rel};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::engine::Direction;
use crate::equivalence::Equivalences;
use crate::events::{ScoreEvent, ScoreKind};
use crate::join::{JoinCoder, JoinRelation};
use crate::neighborhood::Neighborhood;
use crate::normalizer::RelationNormalizer;
use crate::settings::Settings;
use crate::AlignError;

/// Per-worker accumulation over a share of one relation's facts.
#[derive(Debug, Clone)]
struct Partial {
    tree: Neighborhood,
    normalizer: RelationNormalizer,
    facts: usize,
}

impl Partial {
    fn new(settings: &Settings) -> Self {
        Self {
            tree: Neighborhood::new(),
            normalizer: RelationNormalizer::new(settings.normalizer),
            facts: 0,
        }
    }

    fn merge(mut self, other: Partial) -> Self {
        self.tree.reduce_with(&other.tree);
        self.normalizer.merge(&other.normalizer);
        self.facts += other.facts;
        self
    }
}

pub(crate) struct RelationWorker<'a> {
    pub(crate) direction: Direction,
    pub(crate) source: &'a FactStore,
    pub(crate) target: &'a FactStore,
    pub(crate) source_coder: &'a JoinCoder,
    pub(crate) target_coder: &'a JoinCoder,
    pub(crate) settings: &'a Settings,
    pub(crate) equivalences: Equivalences<'a>,
    pub(crate) pool: Option<&'a ThreadPool>,
}

impl RelationWorker<'_> {
    /// Sub-relation events for the forward relation entity `r1`, both as
    /// `(r1, J2)` and as `(r1⁻¹, J2 reversed)`.
    pub(crate) fn score_relation(&self, r1: u32) -> Result<Vec<ScoreEvent>, AlignError> {
        let rel = Rel::forward(r1);
        let facts = self.source.facts_for_relation(rel);
        let partial = match self.pool {
            None => facts
                .iter()
                .try_fold(Partial::new(self.settings), |p, &(x1, y1)| {
                    self.observe_fact(p, x1, y1)
                })?,
            Some(pool) => pool.install(|| {
                facts
                    .par_iter()
                    .try_fold(
                        || Partial::new(self.settings),
                        |p, &(x1, y1)| self.observe_fact(p, x1, y1),
                    )
                    .try_reduce(|| Partial::new(self.settings), |a, b| Ok(a.merge(b)))
            })?,
        };

        let Some(normalizer) = partial.normalizer.value() else {
            return Ok(Vec::new());
        };
        let kind = ScoreKind::SubRelation(self.direction);
        let sub = self.source_coder.code_of(rel)?;
        let sub_inverse = self.source_coder.code_of(rel.inverse())?;
        let mut events = Vec::new();
        for node in partial.tree.entries() {
            let join = self.target_coder.decode(node.code)?;
            if join.is_trivial() {
                continue;
            }
            let score = (node.score / normalizer).min(1.0);
            if score <= self.settings.theta {
                continue;
            }
            events.push(ScoreEvent {
                kind,
                sub,
                sup: node.code,
                score,
            });
            events.push(ScoreEvent {
                kind,
                sub: sub_inverse,
                sup: self.target_coder.code_with(&join, true)?,
                score,
            });
        }
        Ok(events)
    }

    fn observe_fact(&self, mut p: Partial, x1: Node, y1: Node) -> Result<Partial, AlignError> {
        let xs = self.equivalences.of(x1);
        let ys = self.equivalences.of(y1);

        p.normalizer.begin_fact();
        for &(_, ex) in &xs {
            for &(_, ey) in &ys {
                p.normalizer.observe(ex * ey);
            }
        }
        p.normalizer.end_fact();

        if !xs.is_empty() && !ys.is_empty() {
            for &(x2, ex) in &xs {
                p.tree.visit(Neighborhood::ROOT);
                self.explore(
                    &mut p.tree,
                    Neighborhood::ROOT,
                    JoinRelation::empty(),
                    vec![x2],
                    ex,
                    &ys,
                )?;
            }
            p.tree.propagate_scores();
        }

        p.facts += 1;
        if p.facts % self.settings.prune_interval == 0 {
            p.tree.prune(self.settings.neighborhood_prune_threshold);
        }
        Ok(p)
    }

    /// Extend `path` by one relation from every node of `frontier`.
    fn explore(
        &self,
        tree: &mut Neighborhood,
        slot: usize,
        path: JoinRelation,
        frontier: Vec<Node>,
        ex: f64,
        ys: &[(Node, f64)],
    ) -> Result<(), AlignError> {
        if path.len() >= self.settings.max_join_length {
            return Ok(());
        }
        let mut steps: BTreeMap<Rel, Vec<Node>> = BTreeMap::new();
        for node in frontier {
            for view in self.target.facts_about(node) {
                if self.target.is_hierarchy_relation(view.relation.entity()) {
                    continue;
                }
                if path.last() == Some(view.relation.inverse()) {
                    continue;
                }
                steps.entry(view.relation).or_default().push(view.other);
            }
        }

        for (rel, mut next) in steps {
            next.sort_unstable();
            next.dedup();
            if next.len() > self.settings.max_frontier {
                continue;
            }
            let child_path = path.push(rel)?;
            let child = tree.child(slot, self.target_coder.code(&child_path)?);
            tree.visit(child);
            for &(y2, ey) in ys {
                if next.binary_search(&y2).is_ok() {
                    tree.register_evidence(child, ex * ey);
                }
            }
            self.explore(tree, child, child_path, next, ex, ys)?;
        }
        Ok(())
    }
}
