//! LiteralIndex: locality-sensitive hashing over character k-grams.
//!
//! Exact string identity is too strict for literals coming from two
//! independently curated bases ("Paris" vs "Pariss", "J. Smith" vs
//! "J Smith"). This index answers "which indexed literals look like this
//! one?" in sub-linear time:
//!
//! - Each literal is lower-cased, padded with `^`/`$` and cut into
//!   character k-grams (shingles); each shingle is hashed with a fixed-seed
//!   `ahash` state so the index is reproducible within a build.
//! - A min-hash signature of `bands × rows` values is split into bands; two
//!   literals become candidates when any band agrees.
//! - Candidates are verified by the exact Jaccard similarity of their
//!   shingle sets, so reported similarities are never approximations, only
//!   the candidate set is.
//!
//! Identical strings always share every band and score exactly `1.0`.

use std::hash::BuildHasher;

use ahash::{AHashMap, AHashSet, RandomState};
use serde::{Deserialize, Serialize};

use crate::LiteralId;

/// Shape of the min-hash signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LshParams {
    /// Shingle length in characters.
    pub kgram: usize,
    /// Number of bands; more bands raise recall.
    pub bands: usize,
    /// Min-hash values per band; more rows raise precision.
    pub rows: usize,
    /// Seed of the hash family.
    pub seed: u64,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            kgram: 3,
            bands: 32,
            rows: 2,
            seed: 0x5eed_c0de_2011_0001,
        }
    }
}

impl LshParams {
    pub fn signature_len(&self) -> usize {
        self.bands * self.rows
    }

    fn hasher(&self) -> RandomState {
        let s = self.seed;
        RandomState::with_seeds(
            s,
            s.rotate_left(17) ^ 0x9e37_79b9_7f4a_7c15,
            s.rotate_left(31) ^ 0xbf58_476d_1ce4_e5b9,
            !s,
        )
    }
}

/// One approximate hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralMatch {
    pub literal: LiteralId,
    pub similarity: f64,
}

/// Banded min-hash index over a fixed set of literals.
#[derive(Debug, Clone, Default)]
pub struct LiteralIndex {
    params: LshParams,
    /// Sorted, deduplicated shingle hashes per literal (indexed by raw id).
    shingles: Vec<Vec<u64>>,
    /// `band -> band key -> literals`.
    buckets: Vec<AHashMap<u64, Vec<LiteralId>>>,
}

impl LiteralIndex {
    /// Build the index. Ids are expected to be dense (as produced by the
    /// store's literal interner).
    pub fn build<'a>(
        params: LshParams,
        literals: impl IntoIterator<Item = (LiteralId, &'a str)>,
    ) -> Self {
        let hasher = params.hasher();
        let mut index = LiteralIndex {
            params,
            shingles: Vec::new(),
            buckets: vec![AHashMap::new(); params.bands],
        };
        if params.signature_len() == 0 {
            return index;
        }

        for (id, text) in literals {
            let grams = shingles(text, params.kgram, &hasher);
            let sig = signature(&grams, params.signature_len(), &hasher);
            for band in 0..params.bands {
                let key = band_key(&sig, band, params.rows, &hasher);
                index.buckets[band].entry(key).or_default().push(id);
            }
            let slot = id.raw() as usize;
            if slot >= index.shingles.len() {
                index.shingles.resize(slot + 1, Vec::new());
            }
            index.shingles[slot] = grams;
        }
        index
    }

    pub fn params(&self) -> LshParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.shingles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shingles.is_empty()
    }

    /// All indexed literals whose shingle-set Jaccard similarity with `text`
    /// is at least `threshold`, best first (ties by ascending id).
    pub fn query(&self, text: &str, threshold: f64) -> Vec<LiteralMatch> {
        if self.shingles.is_empty() || self.params.signature_len() == 0 {
            return Vec::new();
        }
        let hasher = self.params.hasher();
        let grams = shingles(text, self.params.kgram, &hasher);
        let sig = signature(&grams, self.params.signature_len(), &hasher);

        let mut candidates: AHashSet<LiteralId> = AHashSet::new();
        for band in 0..self.params.bands {
            let key = band_key(&sig, band, self.params.rows, &hasher);
            if let Some(ids) = self.buckets[band].get(&key) {
                candidates.extend(ids.iter().copied());
            }
        }

        let mut out: Vec<LiteralMatch> = candidates
            .into_iter()
            .filter_map(|id| {
                let other = self.shingles.get(id.raw() as usize)?;
                let similarity = jaccard(&grams, other);
                (similarity >= threshold).then_some(LiteralMatch {
                    literal: id,
                    similarity,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then(a.literal.cmp(&b.literal))
        });
        out
    }

    /// Exact shingle similarity of two arbitrary strings under this index's
    /// parameters.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let hasher = self.params.hasher();
        jaccard(
            &shingles(a, self.params.kgram, &hasher),
            &shingles(b, self.params.kgram, &hasher),
        )
    }
}

// ============================================================================
// Shingling and min-hash
// ============================================================================

fn shingles(text: &str, k: usize, hasher: &RandomState) -> Vec<u64> {
    let k = k.max(1);
    let mut chars: Vec<char> = Vec::with_capacity(text.len() + 2);
    chars.push('^');
    chars.extend(text.chars().flat_map(char::to_lowercase));
    chars.push('$');

    let mut out: Vec<u64> = if chars.len() <= k {
        vec![hasher.hash_one(chars.as_slice())]
    } else {
        chars.windows(k).map(|w| hasher.hash_one(w)).collect()
    };
    out.sort_unstable();
    out.dedup();
    out
}

fn signature(grams: &[u64], len: usize, hasher: &RandomState) -> Vec<u64> {
    (0..len as u64)
        .map(|i| {
            grams
                .iter()
                .map(|g| hasher.hash_one((i, *g)))
                .min()
                .unwrap_or(u64::MAX)
        })
        .collect()
}

fn band_key(sig: &[u64], band: usize, rows: usize, hasher: &RandomState) -> u64 {
    let start = band * rows;
    hasher.hash_one((band as u64, &sig[start..start + rows]))
}

/// Jaccard similarity of two sorted, deduplicated slices.
fn jaccard(a: &[u64], b: &[u64]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let (mut i, mut j, mut shared) = (0, 0, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}
