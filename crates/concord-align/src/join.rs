//! Join relations: short paths of signed relations such as `bornIn∘locatedIn`.
//!
//! A [`JoinCoder`] maps every join relation of one base, up to a maximum
//! length, onto a dense integer code so that relation scores can live in a
//! matrix store. Codes are grouped by length: the empty path is code 0,
//! then all paths of length 1, then length 2, and so on. Within one length
//! a path is a number written in base `2R` (`R` relations, two directions
//! each).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::{AHashMap, AHashSet};
use concord_facts::{FactStore, Rel};

use crate::JoinError;

/// Longest join relation any coder supports.
pub const MAX_JOIN_CAPACITY: usize = 4;

const COMPOSE: char = '∘';
const INVERSE: char = '-';

/// A fixed-capacity path of signed relations.
#[derive(Clone, Copy)]
pub struct JoinRelation {
    rels: [Rel; MAX_JOIN_CAPACITY],
    len: u8,
}

impl JoinRelation {
    const FILL: Rel = Rel::forward(0);

    /// The empty path.
    pub const fn empty() -> Self {
        Self {
            rels: [Self::FILL; MAX_JOIN_CAPACITY],
            len: 0,
        }
    }

    pub fn single(rel: Rel) -> Self {
        let mut jr = Self::empty();
        jr.rels[0] = rel;
        jr.len = 1;
        jr
    }

    pub fn from_slice(rels: &[Rel]) -> Result<Self, JoinError> {
        if rels.len() > MAX_JOIN_CAPACITY {
            return Err(JoinError::TooLong {
                len: rels.len(),
                max: MAX_JOIN_CAPACITY,
            });
        }
        let mut jr = Self::empty();
        jr.rels[..rels.len()].copy_from_slice(rels);
        jr.len = rels.len() as u8;
        Ok(jr)
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Rel] {
        &self.rels[..self.len()]
    }

    pub fn first(&self) -> Option<Rel> {
        self.as_slice().first().copied()
    }

    pub fn last(&self) -> Option<Rel> {
        self.as_slice().last().copied()
    }

    /// This path extended by `rel`.
    pub fn push(&self, rel: Rel) -> Result<Self, JoinError> {
        if self.len() == MAX_JOIN_CAPACITY {
            return Err(JoinError::TooLong {
                len: MAX_JOIN_CAPACITY + 1,
                max: MAX_JOIN_CAPACITY,
            });
        }
        let mut jr = *self;
        jr.rels[jr.len()] = rel;
        jr.len += 1;
        Ok(jr)
    }

    /// The path without its last relation; `None` for the empty path.
    pub fn parent(&self) -> Option<Self> {
        if self.is_empty() {
            return None;
        }
        let mut jr = *self;
        jr.len -= 1;
        jr.rels[jr.len()] = Self::FILL;
        Some(jr)
    }

    /// The path walked backwards: order reversed, every relation inverted.
    pub fn reverse(&self) -> Self {
        let mut jr = Self::empty();
        for (i, rel) in self.as_slice().iter().rev().enumerate() {
            jr.rels[i] = rel.inverse();
        }
        jr.len = self.len;
        jr
    }

    /// True when some relation is immediately followed by its own inverse.
    pub fn is_trivial(&self) -> bool {
        self.as_slice().windows(2).any(|w| w[1] == w[0].inverse())
    }
}

impl Default for JoinRelation {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for JoinRelation {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for JoinRelation {}

impl Hash for JoinRelation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl Ord for JoinRelation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl PartialOrd for JoinRelation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for JoinRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.as_slice().iter().map(|r| r.raw()))
            .finish()
    }
}

// ============================================================================
// JoinCoder
// ============================================================================

/// Dense codes for the join relations of one base.
#[derive(Debug, Clone)]
pub struct JoinCoder {
    /// Relation entities in slot order.
    relations: Vec<u32>,
    slots: AHashMap<u32, u32>,
    max_len: usize,
    /// `2R`.
    base: u64,
    /// `offsets[len]` = first code of paths of length `len`, for
    /// `len` in `0..=max_len + 1`.
    offsets: Vec<u64>,
}

impl JoinCoder {
    /// Coder over the relation table of `store`.
    ///
    /// Names containing `∘`, or ending in `-` while the name without it is
    /// another relation, would render to text that parses back differently
    /// and are rejected.
    pub fn new(store: &FactStore, max_len: usize) -> Result<Self, JoinError> {
        let relations = store.relations();
        let known: AHashSet<u32> = relations.iter().copied().collect();
        for &relation in relations {
            let Some(name) = store.entity_name(relation) else {
                continue;
            };
            let shadows_inverse = name
                .strip_suffix(INVERSE)
                .and_then(|stem| store.entity_id(stem))
                .is_some_and(|id| known.contains(&id));
            if name.contains(COMPOSE) || shadows_inverse {
                return Err(JoinError::AmbiguousName(name.to_string()));
            }
        }
        Self::from_relations(relations.to_vec(), max_len)
    }

    /// Coder over an explicit relation table (slot = position).
    pub fn from_relations(relations: Vec<u32>, max_len: usize) -> Result<Self, JoinError> {
        if max_len > MAX_JOIN_CAPACITY {
            return Err(JoinError::TooLong {
                len: max_len,
                max: MAX_JOIN_CAPACITY,
            });
        }
        let overflow = || JoinError::CodeOverflow {
            relations: relations.len(),
            len: max_len,
        };
        let base = (relations.len() as u64).checked_mul(2).ok_or_else(overflow)?;
        let mut offsets = Vec::with_capacity(max_len + 2);
        let mut offset = 0u64;
        let mut power = 1u64;
        for len in 0..=max_len + 1 {
            offsets.push(offset);
            if len <= max_len {
                offset = offset.checked_add(power).ok_or_else(overflow)?;
            }
            if len < max_len {
                power = power.checked_mul(base).ok_or_else(overflow)?;
            }
        }
        let slots = relations
            .iter()
            .enumerate()
            .map(|(slot, &rel)| (rel, slot as u32))
            .collect();
        Ok(Self {
            relations,
            slots,
            max_len,
            base,
            offsets,
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Number of codes: every valid code is below this.
    pub fn universe(&self) -> u64 {
        self.offsets[self.max_len + 1]
    }

    /// Number of codes of paths with at most `len` relations.
    pub fn universe_up_to(&self, len: usize) -> u64 {
        self.offsets[len.min(self.max_len) + 1]
    }

    fn symbol(&self, rel: Rel) -> Result<u64, JoinError> {
        let slot = self
            .slots
            .get(&rel.entity())
            .ok_or_else(|| JoinError::UnknownRelation(rel.raw().to_string()))?;
        Ok(2 * *slot as u64 + rel.is_inverse() as u64)
    }

    pub fn code(&self, jr: &JoinRelation) -> Result<u64, JoinError> {
        if jr.len() > self.max_len {
            return Err(JoinError::TooLong {
                len: jr.len(),
                max: self.max_len,
            });
        }
        let mut value = 0u64;
        for &rel in jr.as_slice() {
            // Cannot overflow: value < base^len <= universe.
            value = value * self.base + self.symbol(rel)?;
        }
        Ok(self.offsets[jr.len()] + value)
    }

    /// Code of `jr`, or of its reversal when `reversed`.
    pub fn code_with(&self, jr: &JoinRelation, reversed: bool) -> Result<u64, JoinError> {
        if reversed {
            self.code(&jr.reverse())
        } else {
            self.code(jr)
        }
    }

    pub fn code_of(&self, rel: Rel) -> Result<u64, JoinError> {
        self.code(&JoinRelation::single(rel))
    }

    pub fn decode(&self, code: u64) -> Result<JoinRelation, JoinError> {
        if code >= self.universe() {
            return Err(JoinError::InvalidCode(code));
        }
        let len = (0..=self.max_len)
            .rev()
            .find(|&len| self.offsets[len] <= code)
            .ok_or(JoinError::InvalidCode(code))?;
        let mut value = code - self.offsets[len];
        let mut jr = JoinRelation::empty();
        jr.len = len as u8;
        for i in (0..len).rev() {
            let symbol = value % self.base;
            value /= self.base;
            let entity = self.relations[(symbol / 2) as usize];
            let rel = Rel::forward(entity);
            jr.rels[i] = if symbol % 2 == 1 { rel.inverse() } else { rel };
        }
        Ok(jr)
    }

    /// Human-readable form: relation names joined by `∘`, inverses
    /// suffixed with `-`.
    pub fn render(&self, jr: &JoinRelation, store: &FactStore) -> String {
        let mut out = String::new();
        for (i, rel) in jr.as_slice().iter().enumerate() {
            if i > 0 {
                out.push(COMPOSE);
            }
            out.push_str(store.entity_name(rel.entity()).unwrap_or("?"));
            if rel.is_inverse() {
                out.push(INVERSE);
            }
        }
        out
    }

    /// Inverse of [`JoinCoder::render`].
    pub fn parse(&self, text: &str, store: &FactStore) -> Result<JoinRelation, JoinError> {
        let mut rels = Vec::new();
        if !text.is_empty() {
            for part in text.split(COMPOSE) {
                rels.push(self.parse_rel(part, store)?);
            }
        }
        let jr = JoinRelation::from_slice(&rels)?;
        if jr.len() > self.max_len {
            return Err(JoinError::TooLong {
                len: jr.len(),
                max: self.max_len,
            });
        }
        Ok(jr)
    }

    fn parse_rel(&self, name: &str, store: &FactStore) -> Result<Rel, JoinError> {
        let known = |n: &str| {
            store
                .entity_id(n)
                .filter(|id| self.slots.contains_key(id))
        };
        if let Some(id) = known(name) {
            return Ok(Rel::forward(id));
        }
        if let Some(id) = name.strip_suffix(INVERSE).and_then(known) {
            return Ok(Rel::forward(id).inverse());
        }
        Err(JoinError::UnknownRelation(name.to_string()))
    }
}
