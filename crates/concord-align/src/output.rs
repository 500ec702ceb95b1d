//! Score file names under the output directory.

use std::path::{Path, PathBuf};

use crate::engine::Direction;

pub fn equality_file(dir: &Path, iteration: usize) -> PathBuf {
    dir.join(format!("{iteration}_eqv.tsv"))
}

/// `<i>_superrelations1.tsv` holds base-1 subs, `...2.tsv` base-2 subs.
pub fn relation_file(dir: &Path, iteration: usize, direction: Direction) -> PathBuf {
    dir.join(format!("{iteration}_superrelations{}.tsv", direction.suffix()))
}

pub fn class_file(dir: &Path, iteration: usize, direction: Direction) -> PathBuf {
    dir.join(format!("{iteration}_superclasses{}.tsv", direction.suffix()))
}

/// Relation trial state after the equality pass of `iteration` (or at the
/// point it was stopped).
pub fn trials_file(dir: &Path, iteration: usize) -> PathBuf {
    dir.join(format!("{iteration}_trials.json"))
}
