use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Graceful stop request: a sentinel file on disk or a shared flag (raised
/// by a signal handler, for instance).
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    file: Option<PathBuf>,
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            file,
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an existing flag, e.g. one registered with `signal_hook`.
    pub fn with_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.flag = flag;
        self
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Poll the flag and the sentinel file. Once seen, the stop sticks.
    pub fn should_stop(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(file) = &self.file {
            if file.exists() {
                info!(path = %file.display(), "stop file found");
                self.raise();
                return true;
            }
        }
        false
    }
}
