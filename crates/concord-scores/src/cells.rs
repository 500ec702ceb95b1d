//! Backend-independent resolution policy.
//!
//! A backend only provides [`Cells`], a two-dimensional table of positive
//! scores. [`Views`] holds a forward table (`sub -> super`) and an inverse
//! table (`super -> sub`) and applies the [`Resolution`] rules on top.

use std::cmp::Ordering;
use std::fmt;

use crate::{Key, Resolution, ScoreError, Stored, SubPair};

pub(crate) trait Cells: Send + Sync + fmt::Debug {
    fn check(&self, row: Key, col: Key) -> Result<(), ScoreError>;
    fn get(&self, row: Key, col: Key) -> Option<f64>;
    fn put(&mut self, row: Key, col: Key, score: f64);
    fn remove(&mut self, row: Key, col: Key) -> bool;
    /// Entries of a row, best first (ties by ascending column).
    fn row(&self, row: Key) -> Vec<(Key, f64)>;
    fn clear_row(&mut self, row: Key);
    /// Non-empty rows, ascending.
    fn rows(&self) -> Vec<Key>;
    fn len(&self) -> usize;
    fn clear(&mut self);
}

/// Best-first ordering of `(column, score)` entries.
pub(crate) fn by_score_desc(a: &(Key, f64), b: &(Key, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

pub(crate) fn validate(sub: Key, sup: Key, score: f64) -> Result<f64, ScoreError> {
    if score.is_nan() {
        return Err(ScoreError::NotANumber { sub, sup });
    }
    if score < 0.0 {
        return Err(ScoreError::Negative { sub, sup, score });
    }
    Ok(score.min(1.0))
}

#[derive(Debug, Clone)]
pub(crate) struct Views<C> {
    pub(crate) theta: f64,
    pub(crate) resolution: Resolution,
    forward: C,
    inverse: C,
}

impl<C: Cells> Views<C> {
    pub(crate) fn new(theta: f64, resolution: Resolution, forward: C, inverse: C) -> Self {
        Self {
            theta,
            resolution,
            forward,
            inverse,
        }
    }

    pub(crate) fn get(&self, sub: Key, sup: Key) -> Option<f64> {
        self.forward.get(sub, sup)
    }

    pub(crate) fn set(&mut self, sub: Key, sup: Key, score: f64) -> Result<Stored, ScoreError> {
        self.forward.check(sub, sup)?;
        let score = validate(sub, sup, score)?;

        if score <= self.theta {
            if let Resolution::MultiCandidate { .. } = self.resolution {
                self.forward.remove(sub, sup);
                self.inverse.remove(sup, sub);
            }
            return Ok(Stored::BelowThreshold);
        }

        match self.resolution {
            Resolution::SingleBest => {
                let forward_wins = self
                    .forward
                    .row(sub)
                    .first()
                    .map_or(true, |&(_, best)| score >= best);
                if forward_wins {
                    self.forward.clear_row(sub);
                    self.forward.put(sub, sup, score);
                }
                let inverse_wins = self
                    .inverse
                    .row(sup)
                    .first()
                    .map_or(true, |&(_, best)| score >= best);
                if inverse_wins {
                    self.inverse.clear_row(sup);
                    self.inverse.put(sup, sub, score);
                }
                Ok(if forward_wins {
                    Stored::Committed
                } else {
                    Stored::Superseded
                })
            }
            Resolution::MultiCandidate { max_matches } => {
                if self.forward.get(sub, sup).is_none() {
                    let row = self.forward.row(sub);
                    if row.len() >= max_matches {
                        // The row is sorted best first: the worst is last.
                        match row.last() {
                            Some(&(worst, worst_score)) if score > worst_score => {
                                self.forward.remove(sub, worst);
                                self.inverse.remove(worst, sub);
                            }
                            _ => return Ok(Stored::Superseded),
                        }
                    }
                }
                self.forward.put(sub, sup, score);
                self.inverse.put(sup, sub, score);
                Ok(Stored::Committed)
            }
        }
    }

    pub(crate) fn best_matches_of(&self, sub: Key) -> Vec<SubPair> {
        self.forward
            .row(sub)
            .into_iter()
            .map(|(sup, score)| SubPair { sub, sup, score })
            .collect()
    }

    pub(crate) fn best_matches_of_inverse(&self, sup: Key) -> Vec<SubPair> {
        self.inverse
            .row(sup)
            .into_iter()
            .map(|(sub, score)| SubPair { sub, sup, score })
            .collect()
    }

    pub(crate) fn remove_sub(&mut self, sub: Key) {
        for (sup, _) in self.forward.row(sub) {
            self.inverse.remove(sup, sub);
        }
        self.forward.clear_row(sub);
    }

    pub(crate) fn subs(&self) -> Vec<Key> {
        self.forward.rows()
    }

    pub(crate) fn pairs(&self) -> Vec<SubPair> {
        self.forward
            .rows()
            .into_iter()
            .flat_map(|sub| self.best_matches_of(sub))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.forward.len()
    }

    pub(crate) fn clear(&mut self) {
        self.forward.clear();
        self.inverse.clear();
    }

    pub(crate) fn reconcile_both_ways(&mut self) {
        if self.resolution != Resolution::SingleBest {
            return;
        }
        let mut kept = Vec::new();
        for sub in self.forward.rows() {
            let Some(&(sup, score)) = self.forward.row(sub).first() else {
                continue;
            };
            let reciprocated = self
                .inverse
                .row(sup)
                .first()
                .is_some_and(|&(back, _)| back == sub);
            if reciprocated {
                kept.push((sub, sup, score));
            }
        }
        self.forward.clear();
        self.inverse.clear();
        for (sub, sup, score) in kept {
            self.forward.put(sub, sup, score);
            self.inverse.put(sup, sub, score);
        }
    }
}
