//! Neighborhood: a tree of join relations explored from one relation's facts.
//!
//! Nodes live in a flat arena and are addressed by slot; each node carries
//! the join-relation code of its path, so trees built by different workers
//! are merged by code rather than by position. Slot 0 is always the root
//! (the empty path, code 0), and a parent's slot is always lower than its
//! children's.
//!
//! Per node:
//! - `occurrence`: how often the path was reached,
//! - `score`: accumulated evidence, `Σ (1 − Π(1 − e))` over folds,
//! - `ongoing`: the running product `Π(1 − e)` not folded in yet.

use ahash::AHashMap;

/// Snapshot of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStats {
    pub code: u64,
    pub occurrence: u64,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct Slot {
    code: u64,
    parent: Option<usize>,
    children: Vec<usize>,
    occurrence: u64,
    score: f64,
    ongoing: f64,
    dirty: bool,
}

impl Slot {
    fn new(code: u64, parent: Option<usize>) -> Self {
        Self {
            code,
            parent,
            children: Vec::new(),
            occurrence: 0,
            score: 0.0,
            ongoing: 1.0,
            dirty: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Neighborhood {
    slots: Vec<Slot>,
    by_code: AHashMap<u64, usize>,
}

impl Default for Neighborhood {
    fn default() -> Self {
        Self::new()
    }
}

impl Neighborhood {
    pub const ROOT: usize = 0;

    pub fn new() -> Self {
        let mut by_code = AHashMap::new();
        by_code.insert(0, Self::ROOT);
        Self {
            slots: vec![Slot::new(0, None)],
            by_code,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() == 1
    }

    pub fn slot_of(&self, code: u64) -> Option<usize> {
        self.by_code.get(&code).copied()
    }

    pub fn code_of(&self, slot: usize) -> Option<u64> {
        self.slots.get(slot).map(|s| s.code)
    }

    /// Slot of the child of `parent` with path code `code`, created on first
    /// use.
    pub fn child(&mut self, parent: usize, code: u64) -> usize {
        if let Some(&slot) = self.by_code.get(&code) {
            return slot;
        }
        let slot = self.slots.len();
        self.slots.push(Slot::new(code, Some(parent)));
        self.slots[parent].children.push(slot);
        self.by_code.insert(code, slot);
        slot
    }

    /// Count one occurrence of the path at `slot`.
    pub fn visit(&mut self, slot: usize) {
        self.slots[slot].occurrence += 1;
    }

    /// Multiply the pending product at `slot` by `1 − evidence` and mark the
    /// path to the root dirty.
    pub fn register_evidence(&mut self, slot: usize, evidence: f64) {
        let node = &mut self.slots[slot];
        node.ongoing *= 1.0 - evidence.clamp(0.0, 1.0);
        let mut current = Some(slot);
        while let Some(i) = current {
            if self.slots[i].dirty && i != slot {
                break;
            }
            self.slots[i].dirty = true;
            current = self.slots[i].parent;
        }
    }

    /// Fold every pending product into its score (children first) and reset.
    pub fn propagate_scores(&mut self) {
        if !self.slots[Self::ROOT].dirty {
            return;
        }
        for node in self.slots.iter_mut().rev() {
            if node.dirty {
                node.score += 1.0 - node.ongoing;
                node.ongoing = 1.0;
                node.dirty = false;
            }
        }
    }

    /// Drop every subtree whose root occurs less often than
    /// `threshold × occurrence(parent)`.
    pub fn prune(&mut self, threshold: f64) {
        let mut keep = vec![false; self.slots.len()];
        keep[Self::ROOT] = true;
        for i in 1..self.slots.len() {
            let Some(parent) = self.slots[i].parent else {
                continue;
            };
            let floor = self.slots[parent].occurrence as f64 * threshold;
            keep[i] = keep[parent] && self.slots[i].occurrence as f64 >= floor;
        }
        if keep.iter().all(|&k| k) {
            return;
        }

        let mut remap = vec![usize::MAX; self.slots.len()];
        let mut slots = Vec::with_capacity(self.slots.len());
        for (old, slot) in std::mem::take(&mut self.slots).into_iter().enumerate() {
            if keep[old] {
                remap[old] = slots.len();
                slots.push(slot);
            }
        }
        for slot in &mut slots {
            slot.parent = slot.parent.map(|p| remap[p]);
            slot.children = slot
                .children
                .iter()
                .filter_map(|&c| (remap[c] != usize::MAX).then_some(remap[c]))
                .collect();
        }
        self.by_code = slots.iter().enumerate().map(|(i, s)| (s.code, i)).collect();
        self.slots = slots;
    }

    /// Merge another tree into this one: occurrences and scores add, pending
    /// products multiply, children are unioned by code.
    pub fn reduce_with(&mut self, other: &Neighborhood) {
        let mut mapped = vec![Self::ROOT; other.slots.len()];
        for (i, theirs) in other.slots.iter().enumerate() {
            let slot = match theirs.parent {
                None => Self::ROOT,
                Some(p) => self.child(mapped[p], theirs.code),
            };
            mapped[i] = slot;
            let mine = &mut self.slots[slot];
            mine.occurrence += theirs.occurrence;
            mine.score += theirs.score;
            mine.ongoing *= theirs.ongoing;
            mine.dirty |= theirs.dirty;
        }
    }

    pub fn stats(&self, slot: usize) -> Option<NodeStats> {
        self.slots.get(slot).map(|s| NodeStats {
            code: s.code,
            occurrence: s.occurrence,
            score: s.score,
        })
    }

    /// All non-root nodes, by ascending code.
    pub fn entries(&self) -> Vec<NodeStats> {
        let mut out: Vec<NodeStats> = self
            .slots
            .iter()
            .skip(1)
            .map(|s| NodeStats {
                code: s.code,
                occurrence: s.occurrence,
                score: s.score,
            })
            .collect();
        out.sort_by_key(|n| n.code);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn evidence_folds_into_score() {
        let mut t = Neighborhood::new();
        let a = t.child(Neighborhood::ROOT, 1);
        t.visit(a);
        t.register_evidence(a, 0.5);
        t.register_evidence(a, 0.5);
        t.propagate_scores();
        assert_relative_eq!(t.stats(a).unwrap().score, 0.75);
        // Nothing pending: a second fold is a no-op.
        t.propagate_scores();
        assert_relative_eq!(t.stats(a).unwrap().score, 0.75);
        assert_eq!(t.stats(Neighborhood::ROOT).unwrap().score, 0.0);
    }

    #[test]
    fn child_is_idempotent_per_code() {
        let mut t = Neighborhood::new();
        let a = t.child(Neighborhood::ROOT, 3);
        assert_eq!(t.child(Neighborhood::ROOT, 3), a);
        let b = t.child(a, 9);
        assert_eq!(t.slot_of(9), Some(b));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn prune_drops_rare_subtrees() {
        let mut t = Neighborhood::new();
        for _ in 0..100 {
            t.visit(Neighborhood::ROOT);
        }
        let common = t.child(Neighborhood::ROOT, 1);
        let rare = t.child(Neighborhood::ROOT, 2);
        let below_rare = t.child(rare, 7);
        for _ in 0..50 {
            t.visit(common);
        }
        t.visit(rare);
        t.visit(below_rare);
        t.prune(0.1);
        let codes: Vec<u64> = t.entries().iter().map(|n| n.code).collect();
        assert_eq!(codes, vec![1]);
        assert_eq!(t.slot_of(7), None);
        // Slots were compacted, the surviving child still works.
        let slot = t.slot_of(1).unwrap();
        t.register_evidence(slot, 1.0);
        t.propagate_scores();
        assert_relative_eq!(t.stats(slot).unwrap().score, 1.0);
    }

    #[test]
    fn reduce_unions_children_by_code() {
        let mut a = Neighborhood::new();
        let x = a.child(Neighborhood::ROOT, 1);
        a.visit(x);
        a.register_evidence(x, 0.5);
        a.propagate_scores();

        let mut b = Neighborhood::new();
        let y = b.child(Neighborhood::ROOT, 2);
        let x2 = b.child(Neighborhood::ROOT, 1);
        let deep = b.child(y, 8);
        b.visit(x2);
        b.visit(deep);
        b.register_evidence(x2, 1.0);
        b.propagate_scores();

        a.reduce_with(&b);
        let entries = a.entries();
        assert_eq!(entries.iter().map(|n| n.code).collect::<Vec<_>>(), vec![1, 2, 8]);
        assert_eq!(entries[0].occurrence, 2);
        assert_relative_eq!(entries[0].score, 1.5);
    }
}
