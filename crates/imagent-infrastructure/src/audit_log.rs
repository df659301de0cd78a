//! JSON Lines audit log.
//!
//! Validation, execution and feedback records go to `executions.jsonl`; LLM
//! call records go to `llm_calls.jsonl`. Each record is one line. Appends and
//! rotation happen under an exclusive advisory lock on a sibling lock file, so
//! several processes can share a log directory.

use fs2::FileExt;
use imagent_core::audit::{AuditRecord, AuditSink};
use imagent_core::config::LoggingSettings;
use imagent_core::Result;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EXECUTIONS_FILE: &str = "executions.jsonl";
pub const LLM_CALLS_FILE: &str = "llm_calls.jsonl";
const LOCK_FILE: &str = ".audit.lock";

/// File-backed [`AuditSink`].
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    dir: PathBuf,
    execution_logging: bool,
    llm_logging: bool,
    max_bytes: u64,
    backup_count: usize,
}

impl JsonlAuditLog {
    /// Creates the log directory if needed.
    pub fn new(dir: impl Into<PathBuf>, settings: &LoggingSettings) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            execution_logging: settings.execution_logging,
            llm_logging: settings.llm_logging,
            max_bytes: settings.max_bytes,
            backup_count: settings.backup_count,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn executions_path(&self) -> PathBuf {
        self.dir.join(EXECUTIONS_FILE)
    }

    pub fn llm_calls_path(&self) -> PathBuf {
        self.dir.join(LLM_CALLS_FILE)
    }

    fn target_for(&self, record: &AuditRecord) -> Option<PathBuf> {
        if record.is_llm_call() {
            self.llm_logging.then(|| self.llm_calls_path())
        } else {
            self.execution_logging.then(|| self.executions_path())
        }
    }

    fn append(&self, path: &Path, line: &str) -> Result<()> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        lock.lock_exclusive()?;

        let result = self.rotate_if_needed(path, line.len() as u64).and_then(|()| {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(line.as_bytes())?;
            Ok(())
        });

        let _ = FileExt::unlock(&lock);
        result
    }

    /// Shifts `path` to `path.1`, `path.1` to `path.2`, and so on, when
    /// appending `incoming` bytes would exceed `max_bytes`. The oldest backup
    /// beyond `backup_count` is removed. A `max_bytes` of 0 disables rotation.
    fn rotate_if_needed(&self, path: &Path, incoming: u64) -> Result<()> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        let current = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if current == 0 || current + incoming <= self.max_bytes {
            return Ok(());
        }

        if self.backup_count == 0 {
            File::create(path)?;
            return Ok(());
        }

        let oldest = backup_path(path, self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backup_count).rev() {
            let from = backup_path(path, index);
            if from.exists() {
                fs::rename(&from, backup_path(path, index + 1))?;
            }
        }
        fs::rename(path, backup_path(path, 1))?;
        tracing::debug!(path = %path.display(), "Rotated audit log");
        Ok(())
    }
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, record: &AuditRecord) -> Result<()> {
        let Some(path) = self.target_for(record) else {
            return Ok(());
        };
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.append(&path, &line)
    }
}
