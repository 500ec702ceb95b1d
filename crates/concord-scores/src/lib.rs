//! Concord score stores: pairwise `sub ⊆ super` scores.
//!
//! Every store keeps two views of the same scores: rows keyed by `sub`
//! (forward) and rows keyed by `super` (inverse). A [`Resolution`] policy
//! decides which scores survive:
//!
//! - [`Resolution::SingleBest`]: each sub keeps its best super and each super
//!   its best sub; [`ScoreStore::reconcile_both_ways`] then keeps only pairs
//!   that chose each other.
//! - [`Resolution::MultiCandidate`]: each sub keeps up to `max_matches`
//!   candidates, to be reduced later by [`approximate_bipartite`].
//!
//! Two backends share this contract: a hash-indexed store for large sparse
//! key spaces (entities) and a dense matrix for small contiguous ones
//! (join-relation codes). [`new_store`] picks one.
//!
//! Scores at or below the store's `theta` are never committed, so every
//! stored score lies in `(theta, 1]`.

mod bipartite;
mod cells;
mod error;
mod hash;
mod matrix;
pub mod persist;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use bipartite::approximate_bipartite;
pub use error::{PersistError, ScoreError};
pub use hash::HashScoreStore;
pub use matrix::MatrixScoreStore;
pub use persist::{read_score_file, sort_score_file, ScoreLog, ScoreRow};

/// Key of either side of a pair: an entity id or a join-relation code.
pub type Key = u64;

/// One committed score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubPair {
    pub sub: Key,
    pub sup: Key,
    pub score: f64,
}

impl SubPair {
    pub fn new(sub: Key, sup: Key, score: f64) -> Self {
        Self { sub, sup, score }
    }
}

/// Conflict-resolution policy of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    SingleBest,
    MultiCandidate { max_matches: usize },
}

/// What `set` did with a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    /// The pair is now in the forward view.
    Committed,
    /// A better candidate already holds the slot.
    Superseded,
    /// The score was `<= theta` and was dropped.
    BelowThreshold,
}

/// The common contract of every score store backend.
pub trait ScoreStore: Send + Sync + fmt::Debug {
    fn theta(&self) -> f64;

    fn resolution(&self) -> Resolution;

    /// Committed score of `sub ⊆ sup`, if any.
    fn get(&self, sub: Key, sup: Key) -> Option<f64>;

    /// Offer a score. NaN and negative scores are errors; scores above 1 are
    /// clamped to 1.
    fn set(&mut self, sub: Key, sup: Key, score: f64) -> Result<Stored, ScoreError>;

    /// Candidates of `sub`, best first (ties by ascending super).
    fn best_matches_of(&self, sub: Key) -> Vec<SubPair>;

    /// Candidates of `sup` in the inverse view, best first.
    fn best_matches_of_inverse(&self, sup: Key) -> Vec<SubPair>;

    /// Drop every score of `sub` from both views.
    fn remove_sub(&mut self, sub: Key);

    /// Subs holding at least one score, ascending.
    fn subs(&self) -> Vec<Key>;

    /// All committed pairs by ascending sub, then descending score.
    fn pairs(&self) -> Vec<SubPair>;

    /// Number of committed pairs.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Keep only mutually agreeing single-best pairs and rebuild the inverse
    /// view from them. No-op for multi-candidate stores.
    fn reconcile_both_ways(&mut self);
}

// ============================================================================
// Factory
// ============================================================================

/// Storage strategy of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Hash,
    Matrix { subs: usize, supers: usize },
}

impl Backend {
    /// Dense matrix when the key space is non-empty and has at most
    /// `cell_limit` cells; hash rows otherwise.
    pub fn choose(subs: usize, supers: usize, cell_limit: usize) -> Backend {
        match subs.checked_mul(supers) {
            Some(cells) if cells > 0 && cells <= cell_limit => Backend::Matrix { subs, supers },
            _ => Backend::Hash,
        }
    }
}

/// Everything needed to build a store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreSpec {
    pub theta: f64,
    pub resolution: Resolution,
    pub backend: Backend,
}

/// Build the store described by `spec`.
pub fn new_store(spec: StoreSpec) -> Box<dyn ScoreStore> {
    match spec.backend {
        Backend::Hash => Box::new(HashScoreStore::new(spec.theta, spec.resolution)),
        Backend::Matrix { subs, supers } => Box::new(MatrixScoreStore::new(
            spec.theta,
            spec.resolution,
            subs,
            supers,
        )),
    }
}
