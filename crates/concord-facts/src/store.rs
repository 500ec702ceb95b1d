//! The fact store proper: interning, indices, statistics and snapshots.

use ahash::AHashMap;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::hierarchy::{closure, Closure};
use crate::interner::Interner;
use crate::literal_index::{LiteralIndex, LshParams};
use crate::stats::{RelationStats, StatsBuilder};
use crate::{Fact, FactError, FactId, LiteralId, Node, Rel, TargetType};

const SNAPSHOT_MAGIC: &[u8; 4] = b"KBFS";
const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// Configuration
// ============================================================================

/// Store-level settings, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactsConfig {
    /// Relation linking an instance to its class.
    pub type_relation: String,
    /// Relation linking a class to its super-class.
    pub subclass_relation: String,
    /// Largest class closure computed before answering `TooBroad`.
    pub closure_cap: usize,
    /// Shape of the approximate literal index built by `init()`.
    pub lsh: LshParams,
}

impl Default for FactsConfig {
    fn default() -> Self {
        Self {
            type_relation: "rdf:type".to_string(),
            subclass_relation: "rdfs:subClassOf".to_string(),
            closure_cap: 1000,
            lsh: LshParams::default(),
        }
    }
}

// ============================================================================
// Fact views
// ============================================================================

/// A fact seen from one of its arguments: `relation(self, other)`.
///
/// When the argument is the fact's object, `relation` is the inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactView {
    pub fact: FactId,
    pub relation: Rel,
    pub other: Node,
}

// ============================================================================
// FactStore
// ============================================================================

/// Integer-coded triple store for one knowledge base.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FactStore {
    config: FactsConfig,
    /// Entity names; an entity's id is its name id.
    names: Interner,
    literals: Interner,
    facts: Vec<Fact>,
    /// Guessed target type per fact (parallel to `facts`).
    fact_types: Vec<TargetType>,
    fact_set: AHashMap<Fact, FactId>,

    class_flags: RoaringBitmap,
    relation_flags: RoaringBitmap,
    /// Relations in dense slot order (used for join-relation codes).
    relation_order: Vec<u32>,
    relation_slots: AHashMap<u32, u32>,
    type_relation: Option<u32>,
    subclass_relation: Option<u32>,

    by_subject: AHashMap<u32, Vec<FactId>>,
    by_object: AHashMap<u32, Vec<FactId>>,
    by_literal: AHashMap<LiteralId, Vec<FactId>>,
    by_relation: AHashMap<u32, RoaringBitmap>,
    by_subject_relation: AHashMap<(u32, u32), Vec<FactId>>,
    by_object_relation: AHashMap<(Node, u32), Vec<FactId>>,

    /// Class hierarchy: `instance -> direct classes`, `class -> direct instances`.
    types_of: AHashMap<u32, Vec<u32>>,
    instances: AHashMap<u32, RoaringBitmap>,
    superclass_edges: AHashMap<u32, Vec<u32>>,
    subclass_edges: AHashMap<u32, Vec<u32>>,

    stats: AHashMap<u32, RelationStats>,
    sealed: bool,

    #[serde(skip)]
    literal_index: LiteralIndex,
    #[serde(skip)]
    normalized_literals: AHashMap<String, Vec<LiteralId>>,
}

impl FactStore {
    pub fn new(config: FactsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &FactsConfig {
        &self.config
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Register an entity by name, returning its id.
    pub fn add_entity(&mut self, name: &str) -> u32 {
        self.names.intern(name)
    }

    /// Register a class.
    pub fn add_class(&mut self, name: &str) -> u32 {
        let id = self.add_entity(name);
        self.class_flags.insert(id);
        id
    }

    /// Register a relation; it receives the next dense slot on first sight.
    pub fn add_relation(&mut self, name: &str) -> u32 {
        let id = self.add_entity(name);
        if self.relation_flags.insert(id) {
            self.relation_slots
                .insert(id, self.relation_order.len() as u32);
            self.relation_order.push(id);
            if name == self.config.type_relation {
                self.type_relation = Some(id);
            }
            if name == self.config.subclass_relation {
                self.subclass_relation = Some(id);
            }
        }
        id
    }

    /// Insert a fact. `Resource` objects are entities, any other guessed type
    /// makes the object a literal. Facts are a set: re-adding a fact returns
    /// the id of the existing one.
    pub fn add_fact(
        &mut self,
        subject: &str,
        relation: &str,
        object: &str,
        guessed: TargetType,
    ) -> Result<FactId, FactError> {
        if self.sealed {
            return Err(FactError::Sealed);
        }
        if subject.is_empty() {
            return Err(FactError::MalformedFact {
                position: "subject",
            });
        }
        if relation.is_empty() {
            return Err(FactError::MalformedFact {
                position: "relation",
            });
        }
        if object.is_empty() && guessed == TargetType::Resource {
            return Err(FactError::MalformedFact { position: "object" });
        }

        let s = self.add_entity(subject);
        let r = self.add_relation(relation);
        let is_type = Some(r) == self.type_relation;
        let is_subclass = Some(r) == self.subclass_relation;

        // Hierarchy facts always point at classes, whatever the loader guessed.
        let guessed = if is_type || is_subclass {
            TargetType::Resource
        } else {
            guessed
        };
        let object = if guessed == TargetType::Resource {
            Node::Entity(self.add_entity(object))
        } else {
            Node::Literal(LiteralId::new(self.literals.intern(object)))
        };

        let fact = Fact {
            subject: s,
            relation: r,
            object,
        };
        if let Some(&existing) = self.fact_set.get(&fact) {
            debug!(subject, relation, object = ?object, "duplicate fact ignored");
            return Ok(existing);
        }

        let id = self.facts.len() as FactId;
        self.facts.push(fact);
        self.fact_types.push(guessed);
        self.fact_set.insert(fact, id);
        self.index_fact(id, fact);

        if let Node::Entity(o) = object {
            if is_type {
                self.class_flags.insert(o);
                self.types_of.entry(s).or_default().push(o);
                self.instances
                    .entry(o)
                    .or_insert_with(RoaringBitmap::new)
                    .insert(s);
            } else if is_subclass {
                self.class_flags.insert(s);
                self.class_flags.insert(o);
                self.superclass_edges.entry(s).or_default().push(o);
                self.subclass_edges.entry(o).or_default().push(s);
            }
        }
        Ok(id)
    }

    fn index_fact(&mut self, id: FactId, fact: Fact) {
        self.by_subject.entry(fact.subject).or_default().push(id);
        match fact.object {
            Node::Entity(o) => self.by_object.entry(o).or_default().push(id),
            Node::Literal(l) => self.by_literal.entry(l).or_default().push(id),
        }
        self.by_relation
            .entry(fact.relation)
            .or_insert_with(RoaringBitmap::new)
            .insert(id);
        self.by_subject_relation
            .entry((fact.subject, fact.relation))
            .or_default()
            .push(id);
        self.by_object_relation
            .entry((fact.object, fact.relation))
            .or_default()
            .push(id);
    }

    /// Seal the store: compute relation statistics and build the literal
    /// indexes. Idempotent.
    pub fn init(&mut self) {
        if self.sealed {
            return;
        }
        let mut builders: AHashMap<u32, StatsBuilder> = AHashMap::new();
        for (fact, &target) in self.facts.iter().zip(&self.fact_types) {
            builders
                .entry(fact.relation)
                .or_default()
                .observe(fact.subject, fact.object, target);
        }
        self.stats = builders
            .into_iter()
            .map(|(rel, b)| (rel, b.finish()))
            .collect();
        self.rebuild_literal_indexes();
        self.sealed = true;

        info!(
            entities = self.names.len(),
            classes = self.class_flags.len(),
            relations = self.relation_order.len(),
            literals = self.literals.len(),
            facts = self.facts.len(),
            "fact store sealed"
        );
    }

    fn rebuild_literal_indexes(&mut self) {
        self.literal_index = LiteralIndex::build(
            self.config.lsh,
            self.literals.iter().map(|(id, s)| (LiteralId::new(id), s)),
        );
        let mut normalized: AHashMap<String, Vec<LiteralId>> = AHashMap::new();
        for (id, s) in self.literals.iter() {
            normalized
                .entry(normalize_literal(s))
                .or_default()
                .push(LiteralId::new(id));
        }
        self.normalized_literals = normalized;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // ========================================================================
    // Names and kinds
    // ========================================================================

    pub fn entity_id(&self, name: &str) -> Option<u32> {
        self.names.id_of(name)
    }

    pub fn entity_name(&self, id: u32) -> Option<&str> {
        self.names.lookup(id)
    }

    pub fn entity_count(&self) -> usize {
        self.names.len()
    }

    pub fn literal_id(&self, text: &str) -> Option<LiteralId> {
        self.literals.id_of(text).map(LiteralId::new)
    }

    pub fn literal(&self, id: LiteralId) -> Option<&str> {
        self.literals.lookup(id.raw())
    }

    pub fn literal_count(&self) -> usize {
        self.literals.len()
    }

    /// Human-readable label of a node: the entity name or the quoted literal.
    pub fn node_label(&self, node: Node) -> String {
        match node {
            Node::Entity(id) => self.entity_name(id).unwrap_or("?").to_string(),
            Node::Literal(id) => format!("\"{}\"", self.literal(id).unwrap_or("?")),
        }
    }

    pub fn is_class(&self, id: u32) -> bool {
        self.class_flags.contains(id)
    }

    pub fn is_relation(&self, id: u32) -> bool {
        self.relation_flags.contains(id)
    }

    /// Plain instances: neither classes nor relations.
    pub fn is_instance(&self, id: u32) -> bool {
        (id as usize) < self.names.len() && !self.is_class(id) && !self.is_relation(id)
    }

    /// All instance ids in ascending order.
    pub fn instance_ids(&self) -> Vec<u32> {
        (0..self.names.len() as u32)
            .filter(|&id| self.is_instance(id))
            .collect()
    }

    pub fn classes(&self) -> &RoaringBitmap {
        &self.class_flags
    }

    /// Relations in dense slot order.
    pub fn relations(&self) -> &[u32] {
        &self.relation_order
    }

    pub fn relation_count(&self) -> usize {
        self.relation_order.len()
    }

    pub fn relation_slot(&self, relation: u32) -> Option<u32> {
        self.relation_slots.get(&relation).copied()
    }

    pub fn relation_at_slot(&self, slot: u32) -> Option<u32> {
        self.relation_order.get(slot as usize).copied()
    }

    pub fn type_relation(&self) -> Option<u32> {
        self.type_relation
    }

    pub fn subclass_relation(&self) -> Option<u32> {
        self.subclass_relation
    }

    /// True for the type and subclass relations, which carry the class
    /// hierarchy rather than instance-level evidence.
    pub fn is_hierarchy_relation(&self, relation: u32) -> bool {
        Some(relation) == self.type_relation || Some(relation) == self.subclass_relation
    }

    // ========================================================================
    // Facts and joins
    // ========================================================================

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id as usize)
    }

    pub fn fact_type(&self, id: FactId) -> Option<TargetType> {
        self.fact_types.get(id as usize).copied()
    }

    /// Every fact touching `node`, seen from `node`.
    pub fn facts_about(&self, node: Node) -> Vec<FactView> {
        let mut out = Vec::new();
        match node {
            Node::Entity(id) => {
                for &fid in self.by_subject.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                    let f = self.facts[fid as usize];
                    out.push(FactView {
                        fact: fid,
                        relation: Rel::forward(f.relation),
                        other: f.object,
                    });
                }
                for &fid in self.by_object.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                    let f = self.facts[fid as usize];
                    out.push(FactView {
                        fact: fid,
                        relation: Rel::forward(f.relation).inverse(),
                        other: Node::Entity(f.subject),
                    });
                }
            }
            Node::Literal(id) => {
                for &fid in self.by_literal.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                    let f = self.facts[fid as usize];
                    out.push(FactView {
                        fact: fid,
                        relation: Rel::forward(f.relation).inverse(),
                        other: Node::Entity(f.subject),
                    });
                }
            }
        }
        out
    }

    /// All `(x, y)` with `rel(x, y)`; inverse relations swap the pair.
    pub fn facts_for_relation(&self, rel: Rel) -> Vec<(Node, Node)> {
        let Some(ids) = self.by_relation.get(&rel.entity()) else {
            return Vec::new();
        };
        ids.iter()
            .map(|fid| {
                let f = self.facts[fid as usize];
                let pair = (Node::Entity(f.subject), f.object);
                if rel.is_inverse() {
                    (pair.1, pair.0)
                } else {
                    pair
                }
            })
            .collect()
    }

    /// Number of facts of a relation (either direction).
    pub fn relation_fact_count(&self, relation: u32) -> u64 {
        self.by_relation
            .get(&relation)
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// The join primitive: all `y` with `rel(arg, y)`.
    pub fn arg_for_relation_and_arg(&self, rel: Rel, arg: Node) -> Vec<Node> {
        let r = rel.entity();
        if rel.is_inverse() {
            self.by_object_relation
                .get(&(arg, r))
                .map(|ids| {
                    ids.iter()
                        .map(|&fid| Node::Entity(self.facts[fid as usize].subject))
                        .collect()
                })
                .unwrap_or_default()
        } else {
            let Node::Entity(subject) = arg else {
                return Vec::new();
            };
            self.by_subject_relation
                .get(&(subject, r))
                .map(|ids| ids.iter().map(|&fid| self.facts[fid as usize].object).collect())
                .unwrap_or_default()
        }
    }

    /// Check whether `rel(subject, object)` holds.
    pub fn has_fact(&self, subject: Node, rel: Rel, object: Node) -> bool {
        let (s, o) = if rel.is_inverse() {
            (object, subject)
        } else {
            (subject, object)
        };
        let Node::Entity(s) = s else {
            return false;
        };
        self.fact_set.contains_key(&Fact {
            subject: s,
            relation: rel.entity(),
            object: o,
        })
    }

    /// Nodes reachable from `start` along `path` (deduplicated, sorted).
    pub fn follow(&self, start: Node, path: &[Rel]) -> Vec<Node> {
        let mut frontier = vec![start];
        for &rel in path {
            let mut next: Vec<Node> = frontier
                .iter()
                .flat_map(|&n| self.arg_for_relation_and_arg(rel, n))
                .collect();
            next.sort_unstable();
            next.dedup();
            if next.is_empty() {
                return next;
            }
            frontier = next;
        }
        frontier
    }

    // ========================================================================
    // Class hierarchy
    // ========================================================================

    /// Direct classes of an entity.
    pub fn direct_types(&self, entity: u32) -> &[u32] {
        self.types_of.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct instances of a class.
    pub fn instances_of(&self, class: u32) -> Option<&RoaringBitmap> {
        self.instances.get(&class)
    }

    /// All classes of an entity: its direct types and their super-classes.
    pub fn classes_of(&self, entity: u32) -> Closure {
        closure(
            self.direct_types(entity).iter().copied(),
            &self.superclass_edges,
            self.config.closure_cap,
        )
    }

    /// Strict super-classes of a class.
    pub fn superclasses(&self, class: u32) -> Closure {
        strict(
            closure([class], &self.superclass_edges, self.config.closure_cap + 1),
            class,
        )
    }

    /// Strict sub-classes of a class.
    pub fn subclasses_of(&self, class: u32) -> Closure {
        strict(
            closure([class], &self.subclass_edges, self.config.closure_cap + 1),
            class,
        )
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn relation_stats(&self, relation: u32) -> Option<&RelationStats> {
        self.stats.get(&relation)
    }

    /// Functionality of a signed relation: distinct subjects per fact for the
    /// forward direction, distinct objects per fact for the inverse. `None`
    /// when the relation has no facts (or the store is not sealed).
    pub fn functionality(&self, rel: Rel) -> Option<f64> {
        let stats = self.stats.get(&rel.entity())?;
        if rel.is_inverse() {
            stats.inverse_functionality()
        } else {
            stats.functionality()
        }
    }

    /// Functionality of `rel`, or the same-named relation's functionality in
    /// `other` when that is higher.
    pub fn functionality_across(&self, rel: Rel, other: Option<&FactStore>) -> Option<f64> {
        let own = self.functionality(rel);
        let theirs = other.and_then(|o| {
            let name = self.entity_name(rel.entity())?;
            let id = o.entity_id(name)?;
            if !o.is_relation(id) {
                return None;
            }
            let mirrored = if rel.is_inverse() {
                Rel::forward(id).inverse()
            } else {
                Rel::forward(id)
            };
            o.functionality(mirrored)
        });
        match (own, theirs) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Dominant target type of a signed relation; inverse relations always
    /// point at resources.
    pub fn dominant_target(&self, rel: Rel) -> TargetType {
        if rel.is_inverse() {
            return TargetType::Resource;
        }
        self.stats
            .get(&rel.entity())
            .map(RelationStats::dominant_target)
            .unwrap_or(TargetType::Resource)
    }

    // ========================================================================
    // Literals
    // ========================================================================

    pub fn literal_index(&self) -> &LiteralIndex {
        &self.literal_index
    }

    /// Literals whose normalized form equals `normalize_literal(text)`.
    pub fn literals_normalized(&self, text: &str) -> &[LiteralId] {
        self.normalized_literals
            .get(&normalize_literal(text))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Serialize the sealed store to the binary snapshot format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FactError> {
        let body = bincode::serialize(self)?;
        let mut out = Vec::with_capacity(body.len() + 16);
        out.extend_from_slice(SNAPSHOT_MAGIC);
        out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        out.extend_from_slice(&(body.len() as u64).to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a snapshot and rebuild the derived literal indexes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FactError> {
        if bytes.len() < 16 || &bytes[0..4] != SNAPSHOT_MAGIC {
            return Err(FactError::InvalidSnapshot("missing KBFS header".into()));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != SNAPSHOT_VERSION {
            return Err(FactError::InvalidSnapshot(format!(
                "unsupported version {version}"
            )));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[8..16]);
        let body = usize::try_from(u64::from_le_bytes(len_bytes))
            .ok()
            .and_then(|len| 16usize.checked_add(len))
            .and_then(|end| bytes.get(16..end))
            .ok_or_else(|| FactError::InvalidSnapshot("truncated body".into()))?;
        let mut store: FactStore = bincode::deserialize(body)?;
        store.rebuild_literal_indexes();
        Ok(store)
    }
}

fn strict(c: Closure, seed: u32) -> Closure {
    match c {
        Closure::Known(mut ids) => {
            ids.retain(|&id| id != seed);
            Closure::Known(ids)
        }
        Closure::TooBroad => Closure::TooBroad,
    }
}

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize_literal(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> FactStore {
        let mut kb = FactStore::new(FactsConfig::default());
        kb.add_fact("paris", "capitalOf", "france", TargetType::Resource)
            .unwrap();
        kb.add_fact("paris", "label", "Paris", TargetType::String)
            .unwrap();
        kb.add_fact("lyon", "locatedIn", "france", TargetType::Resource)
            .unwrap();
        kb.add_fact("paris", "locatedIn", "france", TargetType::Resource)
            .unwrap();
        kb.add_fact("paris", "rdf:type", "City", TargetType::Resource)
            .unwrap();
        kb.add_fact("City", "rdfs:subClassOf", "Place", TargetType::Resource)
            .unwrap();
        kb.init();
        kb
    }

    #[test]
    fn malformed_facts_are_rejected() {
        let mut kb = FactStore::new(FactsConfig::default());
        assert!(matches!(
            kb.add_fact("", "r", "o", TargetType::Resource),
            Err(FactError::MalformedFact { position: "subject" })
        ));
        assert!(matches!(
            kb.add_fact("s", "", "o", TargetType::Resource),
            Err(FactError::MalformedFact {
                position: "relation"
            })
        ));
        assert!(matches!(
            kb.add_fact("s", "r", "", TargetType::Resource),
            Err(FactError::MalformedFact { position: "object" })
        ));
        assert!(kb.is_empty());
    }

    #[test]
    fn duplicate_facts_are_stored_once() {
        let mut kb = FactStore::new(FactsConfig::default());
        let a = kb.add_fact("s", "r", "o", TargetType::Resource).unwrap();
        let b = kb.add_fact("s", "r", "o", TargetType::Resource).unwrap();
        assert_eq!(a, b);
        assert_eq!(kb.len(), 1);
    }

    #[test]
    fn sealed_store_rejects_new_facts() {
        let mut kb = small();
        assert!(matches!(
            kb.add_fact("a", "b", "c", TargetType::Resource),
            Err(FactError::Sealed)
        ));
    }

    #[test]
    fn inverse_relation_swaps_roles() {
        let kb = small();
        let located = Rel::forward(kb.entity_id("locatedIn").unwrap());
        let france = Node::Entity(kb.entity_id("france").unwrap());
        let paris = Node::Entity(kb.entity_id("paris").unwrap());
        let lyon = Node::Entity(kb.entity_id("lyon").unwrap());

        assert_eq!(kb.arg_for_relation_and_arg(located, paris), vec![france]);
        let mut subjects = kb.arg_for_relation_and_arg(located.inverse(), france);
        subjects.sort();
        let mut expected = vec![paris, lyon];
        expected.sort();
        assert_eq!(subjects, expected);
        assert!(kb.has_fact(france, located.inverse(), lyon));
    }

    #[test]
    fn functionality_uses_distinct_arguments() {
        let kb = small();
        let located = Rel::forward(kb.entity_id("locatedIn").unwrap());
        assert_eq!(kb.functionality(located), Some(1.0));
        assert_eq!(kb.functionality(located.inverse()), Some(0.5));
    }

    #[test]
    fn hierarchy_facts_mark_classes() {
        let kb = small();
        let paris = kb.entity_id("paris").unwrap();
        let city = kb.entity_id("City").unwrap();
        let place = kb.entity_id("Place").unwrap();
        assert!(kb.is_class(city) && kb.is_class(place));
        assert!(kb.is_instance(paris));
        assert_eq!(kb.classes_of(paris), Closure::Known(vec![city, place]));
        assert_eq!(kb.superclasses(city), Closure::Known(vec![place]));
        assert_eq!(kb.subclasses_of(place), Closure::Known(vec![city]));
        assert!(kb.instances_of(city).unwrap().contains(paris));
    }

    #[test]
    fn facts_about_literal_are_inverse_views() {
        let kb = small();
        let paris_label = Node::Literal(kb.literal_id("Paris").unwrap());
        let views = kb.facts_about(paris_label);
        assert_eq!(views.len(), 1);
        assert!(views[0].relation.is_inverse());
        assert_eq!(views[0].other, Node::Entity(kb.entity_id("paris").unwrap()));
    }

    #[test]
    fn normalization_collapses_case_and_space() {
        assert_eq!(normalize_literal("  New   York "), "new york");
    }
}
