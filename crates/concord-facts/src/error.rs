use thiserror::Error;

/// Errors raised while loading or decoding a fact store.
#[derive(Debug, Error)]
pub enum FactError {
    /// A fact is missing one of its required positions.
    #[error("malformed fact: missing {position}")]
    MalformedFact { position: &'static str },

    /// A loader line could not be split into the expected columns.
    #[error("malformed line {line}: expected 3 or 4 tab-separated columns, found {found}")]
    MalformedLine { line: usize, found: usize },

    /// The store was already sealed by `init()`.
    #[error("fact store is sealed; facts can only be added before init()")]
    Sealed,

    #[error("invalid fact store snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
