//! Per-relation statistics and functionality.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::{Node, TargetType};

/// Counts gathered for one forward relation when the store is sealed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationStats {
    /// Number of facts.
    pub facts: u32,
    /// Number of distinct subjects.
    pub subjects: u32,
    /// Number of distinct objects (entities and literals together).
    pub objects: u32,
    /// Fact counts per guessed target type, indexed by `TargetType::index`.
    pub target_counts: [u32; 4],
}

impl RelationStats {
    /// The most frequent target type; ties resolve in `TargetType::ALL` order.
    pub fn dominant_target(&self) -> TargetType {
        let mut best = TargetType::Resource;
        let mut best_count = 0;
        for t in TargetType::ALL {
            let count = self.target_counts[t.index()];
            if count > best_count {
                best = t;
                best_count = count;
            }
        }
        best
    }

    /// `subjects / facts`: how close the relation is to a function.
    pub fn functionality(&self) -> Option<f64> {
        ratio(self.subjects, self.facts)
    }

    /// `objects / facts`: functionality of the inverse relation.
    pub fn inverse_functionality(&self) -> Option<f64> {
        ratio(self.objects, self.facts)
    }
}

fn ratio(distinct: u32, facts: u32) -> Option<f64> {
    if facts == 0 {
        return None;
    }
    let value = distinct as f64 / facts as f64;
    if value.is_finite() && value > 0.0 {
        Some(value.min(1.0))
    } else {
        None
    }
}

/// Accumulates distinct subjects/objects for one relation while the store is
/// being sealed.
#[derive(Debug, Default)]
pub(crate) struct StatsBuilder {
    subjects: RoaringBitmap,
    entity_objects: RoaringBitmap,
    literal_objects: RoaringBitmap,
    facts: u32,
    target_counts: [u32; 4],
}

impl StatsBuilder {
    pub(crate) fn observe(&mut self, subject: u32, object: Node, target: TargetType) {
        self.facts += 1;
        self.subjects.insert(subject);
        match object {
            Node::Entity(id) => {
                self.entity_objects.insert(id);
            }
            Node::Literal(id) => {
                self.literal_objects.insert(id.raw());
            }
        }
        self.target_counts[target.index()] += 1;
    }

    pub(crate) fn finish(self) -> RelationStats {
        RelationStats {
            facts: self.facts,
            subjects: self.subjects.len() as u32,
            objects: (self.entity_objects.len() + self.literal_objects.len()) as u32,
            target_counts: self.target_counts,
        }
    }
}
