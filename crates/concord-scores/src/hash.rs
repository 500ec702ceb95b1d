use ahash::AHashMap;

use crate::cells::{by_score_desc, Cells, Views};
use crate::{Key, Resolution, ScoreError, ScoreStore, Stored, SubPair};

/// Sparse rows; a row is a short vector since stores keep few candidates.
#[derive(Debug, Clone, Default)]
pub(crate) struct SparseCells {
    rows: AHashMap<Key, Vec<(Key, f64)>>,
    len: usize,
}

impl Cells for SparseCells {
    fn check(&self, _row: Key, _col: Key) -> Result<(), ScoreError> {
        Ok(())
    }

    fn get(&self, row: Key, col: Key) -> Option<f64> {
        self.rows
            .get(&row)?
            .iter()
            .find(|(c, _)| *c == col)
            .map(|&(_, s)| s)
    }

    fn put(&mut self, row: Key, col: Key, score: f64) {
        let entries = self.rows.entry(row).or_default();
        match entries.iter_mut().find(|(c, _)| *c == col) {
            Some(entry) => entry.1 = score,
            None => {
                entries.push((col, score));
                self.len += 1;
            }
        }
        entries.sort_by(by_score_desc);
    }

    fn remove(&mut self, row: Key, col: Key) -> bool {
        let Some(entries) = self.rows.get_mut(&row) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(c, _)| *c != col);
        let removed = entries.len() < before;
        if entries.is_empty() {
            self.rows.remove(&row);
        }
        if removed {
            self.len -= 1;
        }
        removed
    }

    fn row(&self, row: Key) -> Vec<(Key, f64)> {
        self.rows.get(&row).cloned().unwrap_or_default()
    }

    fn clear_row(&mut self, row: Key) {
        if let Some(entries) = self.rows.remove(&row) {
            self.len -= entries.len();
        }
    }

    fn rows(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.rows.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.len = 0;
    }
}

/// Hash-indexed store for large, sparse key spaces such as entity ids.
#[derive(Debug, Clone)]
pub struct HashScoreStore {
    views: Views<SparseCells>,
}

impl HashScoreStore {
    pub fn new(theta: f64, resolution: Resolution) -> Self {
        Self {
            views: Views::new(
                theta,
                resolution,
                SparseCells::default(),
                SparseCells::default(),
            ),
        }
    }
}

impl ScoreStore for HashScoreStore {
    fn theta(&self) -> f64 {
        self.views.theta
    }

    fn resolution(&self) -> Resolution {
        self.views.resolution
    }

    fn get(&self, sub: Key, sup: Key) -> Option<f64> {
        self.views.get(sub, sup)
    }

    fn set(&mut self, sub: Key, sup: Key, score: f64) -> Result<Stored, ScoreError> {
        self.views.set(sub, sup, score)
    }

    fn best_matches_of(&self, sub: Key) -> Vec<SubPair> {
        self.views.best_matches_of(sub)
    }

    fn best_matches_of_inverse(&self, sup: Key) -> Vec<SubPair> {
        self.views.best_matches_of_inverse(sup)
    }

    fn remove_sub(&mut self, sub: Key) {
        self.views.remove_sub(sub)
    }

    fn subs(&self) -> Vec<Key> {
        self.views.subs()
    }

    fn pairs(&self) -> Vec<SubPair> {
        self.views.pairs()
    }

    fn len(&self) -> usize {
        self.views.len()
    }

    fn clear(&mut self) {
        self.views.clear()
    }

    fn reconcile_both_ways(&mut self) {
        self.views.reconcile_both_ways()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nan_and_negative_and_clamps() {
        let mut s = HashScoreStore::new(0.05, Resolution::SingleBest);
        assert!(matches!(s.set(1, 2, f64::NAN), Err(ScoreError::NotANumber { .. })));
        assert!(matches!(s.set(1, 2, -0.5), Err(ScoreError::Negative { .. })));
        assert_eq!(s.set(1, 2, 3.0), Ok(Stored::Committed));
        assert_eq!(s.get(1, 2), Some(1.0));
    }

    #[test]
    fn theta_is_exclusive() {
        let mut s = HashScoreStore::new(0.05, Resolution::SingleBest);
        assert_eq!(s.set(1, 2, 0.05), Ok(Stored::BelowThreshold));
        assert_eq!(s.get(1, 2), None);
        assert_eq!(s.set(1, 2, 0.050001), Ok(Stored::Committed));
    }

    #[test]
    fn single_best_keeps_the_max_and_later_ties() {
        let mut s = HashScoreStore::new(0.0, Resolution::SingleBest);
        s.set(1, 10, 0.5).unwrap();
        assert_eq!(s.set(1, 11, 0.4), Ok(Stored::Superseded));
        assert_eq!(s.set(1, 12, 0.5), Ok(Stored::Committed));
        assert_eq!(s.best_matches_of(1), vec![SubPair::new(1, 12, 0.5)]);
        assert_eq!(s.get(1, 10), None);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn reconcile_drops_unreciprocated_subs() {
        let mut s = HashScoreStore::new(0.0, Resolution::SingleBest);
        // Both 1 and 2 pick 10, but 10 prefers 2.
        s.set(1, 10, 0.6).unwrap();
        s.set(2, 10, 0.9).unwrap();
        s.set(3, 30, 0.7).unwrap();
        s.reconcile_both_ways();
        assert_eq!(s.get(1, 10), None);
        assert_eq!(s.get(2, 10), Some(0.9));
        assert_eq!(s.get(3, 30), Some(0.7));
        assert_eq!(s.best_matches_of_inverse(10), vec![SubPair::new(2, 10, 0.9)]);
        assert_eq!(s.subs(), vec![2, 3]);
    }

    #[test]
    fn multi_candidate_keeps_bounded_best_list() {
        let mut s = HashScoreStore::new(0.1, Resolution::MultiCandidate { max_matches: 2 });
        s.set(1, 10, 0.5).unwrap();
        s.set(1, 11, 0.7).unwrap();
        assert_eq!(s.set(1, 12, 0.3), Ok(Stored::Superseded));
        assert_eq!(s.set(1, 13, 0.6), Ok(Stored::Committed));
        let supers: Vec<Key> = s.best_matches_of(1).iter().map(|p| p.sup).collect();
        assert_eq!(supers, vec![11, 13]);
        assert!(s.best_matches_of_inverse(10).is_empty());

        // Re-setting an existing pair overwrites it, even downwards.
        s.set(1, 11, 0.2).unwrap();
        assert_eq!(s.get(1, 11), Some(0.2));
        // A below-threshold write removes the pair.
        assert_eq!(s.set(1, 11, 0.05), Ok(Stored::BelowThreshold));
        assert_eq!(s.get(1, 11), None);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn remove_sub_clears_both_views() {
        let mut s = HashScoreStore::new(0.0, Resolution::MultiCandidate { max_matches: 3 });
        s.set(1, 10, 0.5).unwrap();
        s.set(1, 11, 0.5).unwrap();
        s.set(2, 10, 0.4).unwrap();
        s.remove_sub(1);
        assert!(s.best_matches_of(1).is_empty());
        assert_eq!(s.best_matches_of_inverse(10), vec![SubPair::new(2, 10, 0.4)]);
        assert_eq!(s.pairs(), vec![SubPair::new(2, 10, 0.4)]);
    }
}
