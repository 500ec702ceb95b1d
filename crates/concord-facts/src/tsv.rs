//! Minimal tab-separated fact loader.
//!
//! One fact per line: `subject<TAB>relation<TAB>object[<TAB>type]`.
//!
//! - A double-quoted object is a literal; its type is the hint column or,
//!   without one, `TargetType::guess` of the unquoted text.
//! - An unquoted object is a resource unless a non-resource hint is given.
//! - Blank lines and lines starting with `#` are ignored.
//!
//! Malformed lines are logged and skipped; the load never aborts on bad data,
//! only on I/O errors.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::{FactError, FactStore, TargetType};

/// Outcome of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Load facts from a reader into `store`. The store is not sealed.
pub fn load_tsv<R: BufRead>(reader: R, store: &mut FactStore) -> Result<LoadReport, FactError> {
    let mut report = LoadReport::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_line(trimmed, line_no).and_then(|(s, r, o, t)| store.add_fact(s, r, o, t)) {
            Ok(_) => report.loaded += 1,
            Err(FactError::Sealed) => return Err(FactError::Sealed),
            Err(err) => {
                warn!(line = line_no, error = %err, "skipping fact");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

/// Open `path` and load it with [`load_tsv`].
pub fn load_tsv_file(path: impl AsRef<Path>, store: &mut FactStore) -> Result<LoadReport, FactError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let report = load_tsv(BufReader::new(file), store)?;
    info!(
        path = %path.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        "loaded facts"
    );
    Ok(report)
}

fn parse_line(line: &str, line_no: usize) -> Result<(&str, &str, &str, TargetType), FactError> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != 3 && cols.len() != 4 {
        return Err(FactError::MalformedLine {
            line: line_no,
            found: cols.len(),
        });
    }
    let subject = cols[0].trim();
    let relation = cols[1].trim();
    let raw_object = cols[2].trim();
    let hint = match cols.get(3).map(|h| h.trim()) {
        None | Some("") => None,
        Some(h) => Some(parse_hint(h).ok_or(FactError::MalformedLine {
            line: line_no,
            found: cols.len(),
        })?),
    };

    let quoted = raw_object.len() >= 2 && raw_object.starts_with('"') && raw_object.ends_with('"');
    if quoted {
        let text = &raw_object[1..raw_object.len() - 1];
        let target = match hint {
            Some(TargetType::Resource) | None => TargetType::guess(text),
            Some(t) => t,
        };
        Ok((subject, relation, text, target))
    } else {
        Ok((subject, relation, raw_object, hint.unwrap_or(TargetType::Resource)))
    }
}

fn parse_hint(hint: &str) -> Option<TargetType> {
    match hint.to_ascii_lowercase().as_str() {
        "resource" | "entity" => Some(TargetType::Resource),
        "number" => Some(TargetType::Number),
        "date" => Some(TargetType::Date),
        "string" => Some(TargetType::String),
        _ => None,
    }
}
