//! Compact string storage: every distinct name is stored once and referred
//! to by a dense `u32` id.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// String interner with dense ids assigned in insertion order.
///
/// Serialized as the plain list of strings; the reverse map is rebuilt on
/// deserialization.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Interner {
    strings: Vec<Box<str>>,
    ids: AHashMap<Box<str>, u32>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its id.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.ids.insert(boxed, id);
        id
    }

    /// Look up an existing id without inserting.
    pub fn id_of(&self, s: &str) -> Option<u32> {
        self.ids.get(s).copied()
    }

    pub fn lookup(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (i as u32, &**s))
    }
}

impl From<Vec<String>> for Interner {
    fn from(strings: Vec<String>) -> Self {
        let mut interner = Interner::new();
        for s in strings {
            interner.intern(&s);
        }
        interner
    }
}

impl From<Interner> for Vec<String> {
    fn from(interner: Interner) -> Self {
        interner.strings.into_iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("world");
        assert_eq!(interner.intern("hello"), a);
        assert_ne!(a, b);
        assert_eq!(interner.lookup(b), Some("world"));
        assert_eq!(interner.id_of("missing"), None);
    }

    #[test]
    fn serialization_keeps_ids_stable() {
        let mut interner = Interner::new();
        interner.intern("first");
        interner.intern("second");
        let bytes = bincode::serialize(&interner).unwrap();
        let restored: Interner = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.lookup(0), Some("first"));
        assert_eq!(restored.id_of("second"), Some(1));
    }
}
