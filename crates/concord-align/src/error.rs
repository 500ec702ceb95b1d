use std::path::PathBuf;

use concord_facts::FactError;
use concord_scores::{PersistError, ScoreError};
use thiserror::Error;

/// Invalid join relations or join codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("join relation of length {len} exceeds the limit of {max}")]
    TooLong { len: usize, max: usize },

    #[error("relation {0} is not known to the join coder")]
    UnknownRelation(String),

    #[error("join codes for {relations} relations up to length {len} overflow u64")]
    CodeOverflow { relations: usize, len: usize },

    #[error("{0} is not a valid join code")]
    InvalidCode(u64),

    #[error("relation name `{0}` cannot be told apart in rendered join relations")]
    AmbiguousName(String),
}

/// Rejected settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("cannot read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything that can stop an alignment run.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error(transparent)]
    Facts(#[from] FactError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("cannot access trial state {}: {source}", path.display())]
    TrialsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode or decode trial state: {0}")]
    TrialsFormat(#[from] serde_json::Error),

    #[error("resuming at iteration {0} requires an output directory")]
    ResumeWithoutOutput(usize),

    #[error("score event committer stopped unexpectedly")]
    CommitterLost,
}
