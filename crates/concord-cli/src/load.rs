//! Loading a knowledge base from a TSV file or a `.kbfs` snapshot.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use concord_facts::{load_tsv_file, FactStore, FactsConfig};
use tracing::info;

pub const SNAPSHOT_EXTENSION: &str = "kbfs";

pub fn is_snapshot(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SNAPSHOT_EXTENSION))
}

/// Load and seal a base. Snapshots keep the configuration they were
/// written with.
pub fn load_kb(path: &Path, config: &FactsConfig) -> Result<FactStore> {
    let started = Instant::now();
    let kb = if is_snapshot(path) {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        FactStore::from_bytes(&bytes).with_context(|| format!("decoding {}", path.display()))?
    } else {
        let mut kb = FactStore::new(config.clone());
        load_tsv_file(path, &mut kb).with_context(|| format!("loading {}", path.display()))?;
        kb.init();
        kb
    };
    info!(
        path = %path.display(),
        facts = kb.len(),
        entities = kb.entity_count(),
        relations = kb.relation_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "knowledge base ready"
    );
    Ok(kb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_and_snapshot_load_the_same_base() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let tsv = dir.path().join("kb.tsv");
        fs::write(&tsv, "paris\tlabel\t\"Paris\"\nparis\tlocatedIn\tfrance\n")?;
        let kb = load_kb(&tsv, &FactsConfig::default())?;
        assert_eq!(kb.len(), 2);

        let snapshot = dir.path().join("kb.KBFS");
        fs::write(&snapshot, kb.to_bytes()?)?;
        assert!(is_snapshot(&snapshot));
        let reloaded = load_kb(&snapshot, &FactsConfig::default())?;
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.entity_id("france"), kb.entity_id("france"));
        Ok(())
    }

    #[test]
    fn missing_files_report_their_path() {
        let err = load_kb(Path::new("/nonexistent/kb.tsv"), &FactsConfig::default())
            .err()
            .map(|e| format!("{e:#}"))
            .unwrap_or_default();
        assert!(err.contains("/nonexistent/kb.tsv"), "{err}");
    }
}
