use std::path::PathBuf;
use thiserror::Error;

use crate::Key;

/// Rejected score writes.
#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("score for ({sub}, {sup}) is NaN")]
    NotANumber { sub: Key, sup: Key },

    #[error("score {score} for ({sub}, {sup}) is negative")]
    Negative { sub: Key, sup: Key, score: f64 },

    /// A key outside the dimensions of a matrix store.
    #[error("pair ({sub}, {sup}) outside a {subs}x{supers} matrix store")]
    OutOfRange {
        sub: Key,
        sup: Key,
        subs: usize,
        supers: usize,
    },
}

/// Failures reading or writing score files.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> PersistError {
        let path = path.into();
        move |source| PersistError::Io { path, source }
    }
}
