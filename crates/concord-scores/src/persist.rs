//! Score files: `sub<TAB>super<TAB>score` lines.
//!
//! A [`ScoreLog`] is appended to while a pass runs, so the file doubles as a
//! progress log and a resume checkpoint. When the pass is over,
//! [`sort_score_file`] rewrites it as the final snapshot: subjects ascending,
//! then scores descending.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::PersistError;

/// One parsed line of a score file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub sub: String,
    pub sup: String,
    pub score: f64,
}

/// Append-only score log.
#[derive(Debug)]
pub struct ScoreLog {
    path: PathBuf,
    writer: Mutex<LogWriter>,
}

#[derive(Debug)]
struct LogWriter {
    out: BufWriter<File>,
    lines: u64,
}

impl ScoreLog {
    /// Create (or truncate) the log at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        Self::open(path.as_ref(), false)
    }

    /// Open an existing log for appending, creating it if missing.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        Self::open(path.as_ref(), true)
    }

    fn open(path: &Path, append: bool) -> Result<Self, PersistError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(PersistError::io(dir))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(PersistError::io(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter {
                out: BufWriter::new(file),
                lines: 0,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines written through this handle.
    pub fn lines(&self) -> u64 {
        self.writer.lock().lines
    }

    pub fn append(&self, sub: &str, sup: &str, score: f64) -> Result<(), PersistError> {
        let mut w = self.writer.lock();
        writeln!(w.out, "{}\t{}\t{}", clean(sub), clean(sup), score)
            .map_err(PersistError::io(&self.path))?;
        w.lines += 1;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), PersistError> {
        self.writer
            .lock()
            .out
            .flush()
            .map_err(PersistError::io(&self.path))
    }

    /// Flush, close and sort the log into its final snapshot.
    pub fn finish(self) -> Result<PathBuf, PersistError> {
        self.flush()?;
        let path = self.path.clone();
        drop(self);
        sort_score_file(&path)?;
        Ok(path)
    }
}

fn clean(name: &str) -> String {
    name.replace(['\t', '\n', '\r'], " ")
}

/// Parse a score file; malformed lines are logged and skipped.
pub fn read_score_file(path: impl AsRef<Path>) -> Result<Vec<ScoreRow>, PersistError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(PersistError::io(path))?;
    let mut rows = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(PersistError::io(path))?;
        if line.is_empty() {
            continue;
        }
        match parse_row(&line) {
            Some(row) => rows.push(row),
            None => warn!(path = %path.display(), line = index + 1, "skipping malformed score line"),
        }
    }
    Ok(rows)
}

fn parse_row(line: &str) -> Option<ScoreRow> {
    let mut cols = line.split('\t');
    let (sub, sup, score) = (cols.next()?, cols.next()?, cols.next()?);
    if cols.next().is_some() || sub.is_empty() || sup.is_empty() {
        return None;
    }
    let score: f64 = score.trim().parse().ok()?;
    if !score.is_finite() || score < 0.0 {
        return None;
    }
    Some(ScoreRow {
        sub: sub.to_string(),
        sup: sup.to_string(),
        score,
    })
}

/// Rewrite a score file sorted by subject ascending, then score descending,
/// then object ascending. Returns the number of rows.
pub fn sort_score_file(path: impl AsRef<Path>) -> Result<usize, PersistError> {
    let path = path.as_ref();
    let mut rows = read_score_file(path)?;
    rows.sort_by(|a, b| {
        a.sub
            .cmp(&b.sub)
            .then(b.score.total_cmp(&a.score))
            .then(a.sup.cmp(&b.sup))
    });

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let file = File::create(&tmp).map_err(PersistError::io(&tmp))?;
        let mut out = BufWriter::new(file);
        for row in &rows {
            writeln!(out, "{}\t{}\t{}", row.sub, row.sup, row.score)
                .map_err(PersistError::io(&tmp))?;
        }
        out.flush().map_err(PersistError::io(&tmp))?;
    }
    fs::rename(&tmp, path).map_err(PersistError::io(path))?;
    debug!(path = %path.display(), rows = rows.len(), "sorted score file");
    Ok(rows.len())
}
