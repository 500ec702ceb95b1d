use anyhow::{anyhow, Result};
use approx::assert_relative_eq;
use concord_facts::{
    load_tsv, load_tsv_file, Closure, FactError, FactStore, FactsConfig, Node, Rel, TargetType,
};
use std::io::Write;

fn rel(kb: &FactStore, name: &str) -> Result<Rel> {
    kb.entity_id(name)
        .map(Rel::forward)
        .ok_or_else(|| anyhow!("missing relation `{name}`"))
}

fn entity(kb: &FactStore, name: &str) -> Result<Node> {
    kb.entity_id(name)
        .map(Node::Entity)
        .ok_or_else(|| anyhow!("missing entity `{name}`"))
}

fn geography() -> Result<FactStore> {
    let data = "\
paris\tcapitalOf\tfrance
berlin\tcapitalOf\tgermany
paris\tlocatedIn\tfrance
lyon\tlocatedIn\tfrance
berlin\tlocatedIn\tgermany
france\tpartOf\teurope
germany\tpartOf\teurope
paris\tlabel\t\"Paris\"
lyon\tlabel\t\"Lyon\"
berlin\tlabel\t\"  BERLIN \"
paris\trdf:type\tCity
City\trdfs:subClassOf\tPlace
Place\trdfs:subClassOf\tThing
";
    let mut kb = FactStore::new(FactsConfig::default());
    let report = load_tsv(data.as_bytes(), &mut kb)?;
    assert_eq!(report.skipped, 0);
    kb.init();
    Ok(kb)
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn follow_traverses_multi_hop_paths() -> Result<()> {
    let kb = geography()?;
    let located = rel(&kb, "locatedIn")?;
    let part_of = rel(&kb, "partOf")?;

    let reached = kb.follow(entity(&kb, "lyon")?, &[located, part_of]);
    assert_eq!(reached, vec![entity(&kb, "europe")?]);

    // Back down again: europe <- partOf <- locatedIn gives every city.
    let mut cities = kb.follow(entity(&kb, "europe")?, &[part_of.inverse(), located.inverse()]);
    cities.sort();
    let mut expected = vec![
        entity(&kb, "paris")?,
        entity(&kb, "lyon")?,
        entity(&kb, "berlin")?,
    ];
    expected.sort();
    assert_eq!(cities, expected);
    Ok(())
}

#[test]
fn facts_for_relation_orients_pairs() -> Result<()> {
    let kb = geography()?;
    let capital = rel(&kb, "capitalOf")?;
    let forward = kb.facts_for_relation(capital);
    let inverse = kb.facts_for_relation(capital.inverse());
    assert_eq!(forward.len(), 2);
    for ((a, b), (c, d)) in forward.iter().zip(&inverse) {
        assert_eq!((a, b), (d, c));
    }
    Ok(())
}

#[test]
fn facts_about_covers_both_positions() -> Result<()> {
    let kb = geography()?;
    let france = entity(&kb, "france")?;
    let views = kb.facts_about(france);
    // partOf as subject; capitalOf⁻¹ and two locatedIn⁻¹ as object.
    assert_eq!(views.len(), 4);
    assert_eq!(views.iter().filter(|v| v.relation.is_inverse()).count(), 3);
    Ok(())
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn functionality_across_takes_the_stronger_base() -> Result<()> {
    let kb1 = geography()?;
    let mut kb2 = FactStore::new(FactsConfig::default());
    kb2.add_fact("a", "locatedIn", "x", TargetType::Resource)?;
    kb2.add_fact("b", "locatedIn", "y", TargetType::Resource)?;
    kb2.init();

    let located = rel(&kb1, "locatedIn")?;
    // kb1: 3 facts, 2 distinct objects. kb2: fully inverse-functional.
    assert_relative_eq!(kb1.functionality(located.inverse()).unwrap_or(0.0), 2.0 / 3.0);
    assert_eq!(kb1.functionality_across(located.inverse(), Some(&kb2)), Some(1.0));
    assert_relative_eq!(
        kb1.functionality_across(located.inverse(), None).unwrap_or(0.0),
        2.0 / 3.0
    );
    Ok(())
}

#[test]
fn dominant_target_reflects_literal_types() -> Result<()> {
    let kb = geography()?;
    assert_eq!(kb.dominant_target(rel(&kb, "label")?), TargetType::String);
    assert_eq!(kb.dominant_target(rel(&kb, "capitalOf")?), TargetType::Resource);
    assert_eq!(kb.dominant_target(rel(&kb, "label")?.inverse()), TargetType::Resource);
    Ok(())
}

#[test]
fn relation_without_facts_has_no_functionality() {
    let mut kb = FactStore::new(FactsConfig::default());
    let r = kb.add_relation("declaredOnly");
    kb.init();
    assert_eq!(kb.functionality(Rel::forward(r)), None);
}

// ============================================================================
// Class hierarchy
// ============================================================================

#[test]
fn classes_of_includes_transitive_superclasses() -> Result<()> {
    let kb = geography()?;
    let paris = kb.entity_id("paris").ok_or_else(|| anyhow!("paris"))?;
    let classes = kb.classes_of(paris);
    let names: Vec<&str> = classes
        .known()
        .unwrap_or(&[])
        .iter()
        .filter_map(|&c| kb.entity_name(c))
        .collect();
    assert_eq!(names, vec!["City", "Place", "Thing"]);
    Ok(())
}

#[test]
fn wide_hierarchies_report_too_broad() -> Result<()> {
    let config = FactsConfig {
        closure_cap: 5,
        ..FactsConfig::default()
    };
    let mut kb = FactStore::new(config);
    for i in 0..10 {
        kb.add_fact(&format!("C{i}"), "rdfs:subClassOf", &format!("C{}", i + 1), TargetType::Resource)?;
    }
    kb.init();
    let c0 = kb.entity_id("C0").ok_or_else(|| anyhow!("C0"))?;
    assert_eq!(kb.superclasses(c0), Closure::TooBroad);
    let c10 = kb.entity_id("C10").ok_or_else(|| anyhow!("C10"))?;
    assert!(kb.subclasses_of(c10).is_too_broad());
    Ok(())
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn normalized_literal_lookup_ignores_case_and_spacing() -> Result<()> {
    let kb = geography()?;
    let hits = kb.literals_normalized("berlin");
    assert_eq!(hits.len(), 1);
    assert_eq!(kb.literal(hits[0]), Some("  BERLIN "));
    Ok(())
}

#[test]
fn literal_index_is_built_on_init() -> Result<()> {
    let kb = geography()?;
    let hits = kb.literal_index().query("Paris", 1.0);
    assert_eq!(hits.len(), 1);
    assert_eq!(kb.literal(hits[0].literal), Some("Paris"));
    Ok(())
}

// ============================================================================
// Files and snapshots
// ============================================================================

#[test]
fn load_from_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "a\tr\tb")?;
    writeln!(file, "broken line")?;
    writeln!(file, "a\tname\t\"Alice\"")?;
    file.flush()?;

    let mut kb = FactStore::new(FactsConfig::default());
    let report = load_tsv_file(file.path(), &mut kb)?;
    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped, 1);
    Ok(())
}

#[test]
fn snapshot_restores_queries_and_literal_index() -> Result<()> {
    let kb = geography()?;
    let bytes = kb.to_bytes()?;
    assert_eq!(&bytes[0..4], b"KBFS");

    let restored = FactStore::from_bytes(&bytes)?;
    assert!(restored.is_sealed());
    assert_eq!(restored.len(), kb.len());
    let located = rel(&restored, "locatedIn")?;
    assert_eq!(restored.functionality(located), kb.functionality(located));
    assert_eq!(restored.literal_index().query("Lyon", 1.0).len(), 1);
    assert_eq!(restored.literals_normalized("BERLIN").len(), 1);
    Ok(())
}

#[test]
fn corrupt_snapshot_is_rejected() {
    assert!(matches!(
        FactStore::from_bytes(b"NOPE0000000000000000"),
        Err(FactError::InvalidSnapshot(_))
    ));
}

#[test]
fn snapshot_with_oversized_body_length_is_rejected() -> Result<()> {
    let mut bytes = geography()?.to_bytes()?;
    bytes[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        FactStore::from_bytes(&bytes),
        Err(FactError::InvalidSnapshot(_))
    ));

    let bytes_len = bytes.len() as u64;
    bytes[8..16].copy_from_slice(&bytes_len.to_le_bytes());
    assert!(matches!(
        FactStore::from_bytes(&bytes),
        Err(FactError::InvalidSnapshot(_))
    ));
    Ok(())
}
