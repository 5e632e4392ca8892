//! Append-only JSONL event log with size-based rotation.
//!
//! `hooks.jsonl` rotates once it exceeds `max_bytes`: `hooks.N.jsonl` becomes
//! `hooks.(N+1).jsonl`, the live file becomes `hooks.1.jsonl`, and a fresh
//! live file is started. At most `keep` prior generations survive.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::{append_line, now_rfc3339, StoreError};

#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
    max_bytes: u64,
    keep: usize,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, keep: usize) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            keep,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `{ts, event, ..fields}`. Failures are swallowed.
    pub fn append(&self, event: &str, fields: Value) {
        if let Err(e) = self.try_append(event, fields) {
            tracing::debug!(log = %self.path.display(), error = %e, "event log append failed");
        }
    }

    fn try_append(&self, event: &str, fields: Value) -> Result<(), StoreError> {
        let mut record = Map::new();
        record.insert("ts".to_string(), Value::String(now_rfc3339()));
        record.insert("event".to_string(), Value::String(event.to_string()));
        if let Value::Object(extra) = fields {
            for (k, v) in extra {
                record.entry(k).or_insert(v);
            }
        }
        append_line(&self.path, &serde_json::to_string(&Value::Object(record))?)?;
        self.rotate_if_needed()
    }

    fn generation(&self, n: usize) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "hooks".to_string());
        self.path.with_file_name(format!("{stem}.{n}.jsonl"))
    }

    fn rotate_if_needed(&self) -> Result<(), StoreError> {
        let size = fs::metadata(&self.path)?.len();
        if size <= self.max_bytes || self.keep == 0 {
            return Ok(());
        }
        for i in (0..self.keep).rev() {
            let src = if i == 0 {
                self.path.clone()
            } else {
                self.generation(i)
            };
            if src.exists() {
                fs::rename(&src, self.generation(i + 1))?;
            }
        }
        fs::write(&self.path, b"")?;
        tracing::debug!(log = %self.path.display(), size, "event log rotated");
        Ok(())
    }
}
