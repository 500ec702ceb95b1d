use crate::cells::{by_score_desc, Cells, Views};
use crate::{Key, Resolution, ScoreError, ScoreStore, Stored, SubPair};

/// Row-major dense table; `0.0` marks an empty cell (committed scores are
/// always strictly positive).
#[derive(Debug, Clone)]
pub(crate) struct DenseCells {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
    row_len: Vec<u32>,
    len: usize,
}

impl DenseCells {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0.0; rows * cols],
            row_len: vec![0; rows],
            len: 0,
        }
    }

    fn index(&self, row: Key, col: Key) -> Option<usize> {
        let (r, c) = (usize::try_from(row).ok()?, usize::try_from(col).ok()?);
        (r < self.rows && c < self.cols).then(|| r * self.cols + c)
    }
}

impl Cells for DenseCells {
    fn check(&self, row: Key, col: Key) -> Result<(), ScoreError> {
        match self.index(row, col) {
            Some(_) => Ok(()),
            None => Err(ScoreError::OutOfRange {
                sub: row,
                sup: col,
                subs: self.rows,
                supers: self.cols,
            }),
        }
    }

    fn get(&self, row: Key, col: Key) -> Option<f64> {
        let score = self.cells[self.index(row, col)?];
        (score > 0.0).then_some(score)
    }

    fn put(&mut self, row: Key, col: Key, score: f64) {
        let Some(i) = self.index(row, col) else {
            return;
        };
        if self.cells[i] == 0.0 {
            self.row_len[row as usize] += 1;
            self.len += 1;
        }
        self.cells[i] = score;
    }

    fn remove(&mut self, row: Key, col: Key) -> bool {
        let Some(i) = self.index(row, col) else {
            return false;
        };
        if self.cells[i] == 0.0 {
            return false;
        }
        self.cells[i] = 0.0;
        self.row_len[row as usize] -= 1;
        self.len -= 1;
        true
    }

    fn row(&self, row: Key) -> Vec<(Key, f64)> {
        let Some(start) = self.index(row, 0) else {
            return Vec::new();
        };
        if self.row_len[row as usize] == 0 {
            return Vec::new();
        }
        let mut out: Vec<(Key, f64)> = self.cells[start..start + self.cols]
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s > 0.0)
            .map(|(c, &s)| (c as Key, s))
            .collect();
        out.sort_by(by_score_desc);
        out
    }

    fn clear_row(&mut self, row: Key) {
        let Some(start) = self.index(row, 0) else {
            return;
        };
        self.cells[start..start + self.cols].fill(0.0);
        self.len -= self.row_len[row as usize] as usize;
        self.row_len[row as usize] = 0;
    }

    fn rows(&self) -> Vec<Key> {
        self.row_len
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(r, _)| r as Key)
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.cells.fill(0.0);
        self.row_len.fill(0);
        self.len = 0;
    }
}

/// Dense `subs × supers` store for small contiguous key spaces such as
/// join-relation codes. Keys outside the dimensions are rejected.
#[derive(Debug, Clone)]
pub struct MatrixScoreStore {
    views: Views<DenseCells>,
}

impl MatrixScoreStore {
    pub fn new(theta: f64, resolution: Resolution, subs: usize, supers: usize) -> Self {
        Self {
            views: Views::new(
                theta,
                resolution,
                DenseCells::new(subs, supers),
                DenseCells::new(supers, subs),
            ),
        }
    }
}

impl ScoreStore for MatrixScoreStore {
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
    fn out_of_range_keys_are_errors() {
        let mut s = MatrixScoreStore::new(0.05, Resolution::SingleBest, 3, 4);
        assert_eq!(
            s.set(3, 0, 0.5),
            Err(ScoreError::OutOfRange {
                sub: 3,
                sup: 0,
                subs: 3,
                supers: 4
            })
        );
        assert!(s.set(2, 4, 0.5).is_err());
        assert_eq!(s.get(7, 7), None);
        assert!(s.best_matches_of(99).is_empty());
    }

    #[test]
    fn matrix_and_hash_agree_on_multi_candidate_rows() {
        let res = Resolution::MultiCandidate { max_matches: 3 };
        let mut m = MatrixScoreStore::new(0.1, res, 4, 4);
        let mut h = crate::HashScoreStore::new(0.1, res);
        let writes = [(0, 1, 0.3), (0, 2, 0.9), (0, 3, 0.3), (1, 1, 0.05), (2, 0, 1.5), (0, 0, 0.2)];
        for (a, b, s) in writes {
            assert_eq!(m.set(a, b, s), h.set(a, b, s));
        }
        assert_eq!(m.pairs(), h.pairs());
        assert_eq!(m.best_matches_of_inverse(0), h.best_matches_of_inverse(0));
        assert_eq!(m.len(), 4);
    }

    #[test]
    fn clear_resets_counts() {
        let mut m = MatrixScoreStore::new(0.0, Resolution::SingleBest, 2, 2);
        m.set(0, 1, 0.5).unwrap();
        m.set(1, 0, 0.5).unwrap();
        m.clear();
        assert!(m.is_empty());
        assert!(m.subs().is_empty());
    }
}
