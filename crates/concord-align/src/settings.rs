//! Alignment settings: one immutable value built once and passed to the
//! engine by reference.

use std::fs;
use std::path::{Path, PathBuf};

use concord_facts::FactsConfig;
use concord_scores::Resolution;
use serde::{Deserialize, Serialize};

use crate::join::MAX_JOIN_CAPACITY;
use crate::normalizer::NormalizerKind;
use crate::SettingsError;

/// How literals of the two bases are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralMode {
    /// Exact string identity.
    Identity,
    /// Identity after lower-casing and collapsing whitespace.
    Normalized,
    /// Character k-gram similarity through the literal index.
    Approximate,
}

/// Which equality candidates of one entity are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualityCandidates {
    All,
    /// Every candidate sharing the maximum score.
    TiedMaximum,
    /// The single best candidate (lowest id among ties).
    SingleMaximum,
}

/// Gating of relations that rarely produce matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialSettings {
    /// Trials before a relation's verdict is frozen.
    pub budget: u64,
    /// Hits needed to stay open.
    pub min_hits: u64,
}

impl Default for TrialSettings {
    fn default() -> Self {
        Self {
            budget: 500,
            min_hits: 3,
        }
    }
}

/// Where a stopped run picks up again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumePoint {
    pub iteration: usize,
    /// Base-1 instances (in ascending id order) already done in `iteration`.
    pub entity_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scores at or below this floor are never stored.
    pub theta: f64,
    /// Weight of the bootstrap relation seed on the first iteration.
    pub iota: f64,
    pub max_iterations: usize,
    /// Worker threads; 0 uses every core, 1 runs sequentially.
    pub threads: usize,
    /// Entities per equality work unit (and stop-signal poll).
    pub chunk_size: usize,
    pub literal_mode: LiteralMode,
    /// Minimum similarity in approximate literal mode.
    pub literal_threshold: f64,
    /// Lower equality scores contradicted by functional relations.
    pub punish: bool,
    /// Also use `r1 ⊆ r2` alignments (not only `r2 ⊆ r1`) as equality evidence.
    pub use_super_relations: bool,
    pub equality_store: Resolution,
    pub equality_candidates: EqualityCandidates,
    /// Longest join relation explored on the target side.
    pub max_join_length: usize,
    /// Frontiers larger than this are not explored further.
    pub max_frontier: usize,
    pub neighborhood_prune_threshold: f64,
    /// Facts between two neighborhood prunes.
    pub prune_interval: usize,
    pub normalizer: NormalizerKind,
    pub max_relation_candidates: usize,
    pub max_class_candidates: usize,
    /// Largest relation store kept as a dense matrix.
    pub matrix_cell_limit: usize,
    pub trials: TrialSettings,
    pub facts: FactsConfig,
    /// Directory for score files; nothing is written when unset.
    pub output_dir: Option<PathBuf>,
    /// Sentinel file requesting a graceful stop.
    pub stop_file: Option<PathBuf>,
    pub resume: ResumePoint,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theta: 0.05,
            iota: 0.1,
            max_iterations: 10,
            threads: 0,
            chunk_size: 4096,
            literal_mode: LiteralMode::Identity,
            literal_threshold: 0.8,
            punish: false,
            use_super_relations: true,
            equality_store: Resolution::SingleBest,
            equality_candidates: EqualityCandidates::All,
            max_join_length: 1,
            max_frontier: 2000,
            neighborhood_prune_threshold: 0.01,
            prune_interval: 1000,
            normalizer: NormalizerKind::Real,
            max_relation_candidates: 10,
            max_class_candidates: 10,
            matrix_cell_limit: 4_194_304,
            trials: TrialSettings::default(),
            facts: FactsConfig::default(),
            output_dir: None,
            stop_file: None,
            resume: ResumePoint::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
            SettingsError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if !(0.0..1.0).contains(&self.theta) {
            return Err(invalid("theta", "must be in [0, 1)"));
        }
        if !(self.iota > 0.0 && self.iota <= 1.0) {
            return Err(invalid("iota", "must be in (0, 1]"));
        }
        if !(self.literal_threshold > 0.0 && self.literal_threshold <= 1.0) {
            return Err(invalid("literal_threshold", "must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.neighborhood_prune_threshold) {
            return Err(invalid("neighborhood_prune_threshold", "must be in [0, 1]"));
        }
        if !(1..=MAX_JOIN_CAPACITY).contains(&self.max_join_length) {
            return Err(invalid(
                "max_join_length",
                format!("must be between 1 and {MAX_JOIN_CAPACITY}"),
            ));
        }
        let positive: [(&'static str, usize); 7] = [
            ("max_iterations", self.max_iterations),
            ("chunk_size", self.chunk_size),
            ("max_frontier", self.max_frontier),
            ("prune_interval", self.prune_interval),
            ("max_relation_candidates", self.max_relation_candidates),
            ("max_class_candidates", self.max_class_candidates),
            ("facts.closure_cap", self.facts.closure_cap),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be positive"));
            }
        }
        if let Resolution::MultiCandidate { max_matches: 0 } = self.equality_store {
            return Err(invalid("equality_store", "max_matches must be positive"));
        }
        if self.trials.budget == 0 {
            return Err(invalid("trials.budget", "must be positive"));
        }
        if self.resume.iteration > 0 && self.output_dir.is_none() {
            return Err(invalid("resume", "resuming needs output_dir"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s: Settings = serde_json::from_str(
            r#"{ "theta": 0.1, "literal_mode": "approximate",
                 "equality_store": { "multi_candidate": { "max_matches": 3 } } }"#,
        )
        .unwrap();
        assert_eq!(s.theta, 0.1);
        assert_eq!(s.literal_mode, LiteralMode::Approximate);
        assert_eq!(s.equality_store, Resolution::MultiCandidate { max_matches: 3 });
        assert_eq!(s.max_iterations, 10);
        assert_eq!(s.facts.type_relation, "rdf:type");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let s = Settings {
            max_join_length: MAX_JOIN_CAPACITY + 1,
            ..Settings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(SettingsError::Invalid {
                field: "max_join_length",
                ..
            })
        ));
        let s = Settings {
            theta: 1.0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
        let s = Settings {
            chunk_size: 0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
        let s = Settings {
            max_iterations: 0,
            ..Settings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(SettingsError::Invalid {
                field: "max_iterations",
                ..
            })
        ));
    }
}
