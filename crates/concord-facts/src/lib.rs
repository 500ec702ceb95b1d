//! Concord fact store: integer-coded subject–relation–object storage.
//!
//! Key ideas:
//! 1. **Shared id space**: instances, classes and relations are all entities
//!    with a `u32` id; a relation can itself appear in facts.
//! 2. **Signed relations**: an inverse relation is never stored, it is a
//!    negative [`Rel`] that swaps subject and object roles on lookup.
//! 3. **Multi-index storage**: facts are indexed by subject, object, literal,
//!    relation and the (argument, relation) pairs used by joins.
//! 4. **Functionality statistics**: computed once in [`FactStore::init`] and
//!    used to weigh how much evidence one fact carries.
//! 5. **Approximate literals**: a min-hash index over character k-grams.
//!
//! The store is populated by a loader, sealed with `init()`, and then shared
//! read-only by the aligner.

mod error;
mod hierarchy;
mod interner;
pub mod literal_index;
mod stats;
mod store;
pub mod tsv;

use serde::{Deserialize, Serialize};

pub use error::FactError;
pub use hierarchy::Closure;
pub use interner::Interner;
pub use literal_index::{LiteralIndex, LiteralMatch, LshParams};
pub use stats::RelationStats;
pub use store::{FactStore, FactView, FactsConfig};
pub use tsv::{load_tsv, load_tsv_file, LoadReport};

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a fact inside one store.
pub type FactId = u32;

/// Interned literal id (literals live in their own id space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LiteralId(u32);

impl LiteralId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A signed reference to a relation.
///
/// Encoded as `±(entity_id + 1)` so that entity `0` also has an inverse.
/// A negative value denotes the inverse relation: `r⁻¹(x, y) ⇔ r(y, x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Rel(i32);

impl Rel {
    /// The forward direction of the relation entity `entity`.
    pub const fn forward(entity: u32) -> Self {
        Self(entity as i32 + 1)
    }

    /// Rebuild from the raw signed encoding; `0` is not a relation.
    pub const fn from_raw(raw: i32) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn inverse(self) -> Self {
        Self(-self.0)
    }

    pub const fn is_inverse(self) -> bool {
        self.0 < 0
    }

    /// The relation entity, ignoring direction.
    pub const fn entity(self) -> u32 {
        self.0.unsigned_abs() - 1
    }

    /// The forward version of this relation.
    pub const fn positive(self) -> Self {
        Self(self.0.abs())
    }
}

/// An argument position of a fact: an entity or a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    Entity(u32),
    Literal(LiteralId),
}

impl Node {
    pub fn entity(self) -> Option<u32> {
        match self {
            Node::Entity(id) => Some(id),
            Node::Literal(_) => None,
        }
    }

    pub fn literal(self) -> Option<LiteralId> {
        match self {
            Node::Entity(_) => None,
            Node::Literal(id) => Some(id),
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(self, Node::Literal(_))
    }
}

/// A stored fact. The relation is always the forward relation entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub subject: u32,
    pub relation: u32,
    pub object: Node,
}

// ============================================================================
// Target types
// ============================================================================

/// Coarse type of a fact's object, as guessed by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetType {
    Resource,
    Number,
    Date,
    String,
}

impl TargetType {
    pub const ALL: [TargetType; 4] = [
        TargetType::Resource,
        TargetType::Number,
        TargetType::Date,
        TargetType::String,
    ];

    pub const fn index(self) -> usize {
        match self {
            TargetType::Resource => 0,
            TargetType::Number => 1,
            TargetType::Date => 2,
            TargetType::String => 3,
        }
    }

    /// Guess the type of a literal's text.
    ///
    /// Dates are recognised in ISO form (`YYYY-MM-DD`, optionally with `#`
    /// placeholders for unknown digits as found in YAGO-style dumps).
    pub fn guess(text: &str) -> TargetType {
        let t = text.trim();
        if t.is_empty() {
            return TargetType::String;
        }
        if looks_like_date(t) {
            return TargetType::Date;
        }
        if t.parse::<f64>().is_ok() {
            return TargetType::Number;
        }
        TargetType::String
    }
}

fn looks_like_date(t: &str) -> bool {
    let bytes = t.as_bytes();
    if bytes.len() < 10 {
        return false;
    }
    let digitish = |b: u8| b.is_ascii_digit() || b == b'#';
    let (year, rest) = if bytes[0] == b'-' {
        (&bytes[1..5.min(bytes.len())], &bytes[5..])
    } else {
        (&bytes[0..4], &bytes[4..])
    };
    year.len() == 4
        && year.iter().all(|&b| digitish(b))
        && rest.len() >= 6
        && rest[0] == b'-'
        && digitish(rest[1])
        && digitish(rest[2])
        && rest[3] == b'-'
        && digitish(rest[4])
        && digitish(rest[5])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_encoding_handles_entity_zero() {
        let r = Rel::forward(0);
        assert_eq!(r.entity(), 0);
        assert!(!r.is_inverse());
        let inv = r.inverse();
        assert!(inv.is_inverse());
        assert_eq!(inv.entity(), 0);
        assert_eq!(inv.inverse(), r);
        assert_eq!(inv.positive(), r);
        assert_eq!(Rel::from_raw(0), None);
    }

    #[test]
    fn target_type_guessing() {
        assert_eq!(TargetType::guess("42"), TargetType::Number);
        assert_eq!(TargetType::guess("-3.5"), TargetType::Number);
        assert_eq!(TargetType::guess("1879-03-14"), TargetType::Date);
        assert_eq!(TargetType::guess("19##-##-##"), TargetType::Date);
        assert_eq!(TargetType::guess("Paris"), TargetType::String);
        assert_eq!(TargetType::guess(""), TargetType::String);
    }
}
