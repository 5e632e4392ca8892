//! Per-conversation session state.
//!
//! One flat JSON object per conversation at
//! `data/logs/session_<sanitized id>.json`. Writes are read-merge-write with
//! shallow, field-level override. There is no locking: two concurrent writers
//! for the same id race and the last write wins.

use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::paths::BackstopPaths;
use crate::write_atomic;

/// Field names written by the hook handlers and read by the turn-end engine.
pub mod field {
    pub const CORE_EDITED: &str = "core_edited";
    pub const BUILD_FAILED: &str = "build_failed";
    pub const EDIT_DEGRADATION: &str = "edit_degradation";
    pub const DEGRADATION_FILE: &str = "degradation_file";
    pub const DEGRADATION_ISSUES: &str = "degradation_issues";
    pub const MISSING_FILE_RESTORED: &str = "missing_file_restored";
    pub const MISSING_FILE_SUGGEST_RESTORE: &str = "missing_file_suggest_restore";
    pub const STARTED_AT: &str = "started_at";
}

const MAX_ID_LEN: usize = 64;

/// A flat record of named fields. Also used as a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState(Map<String, Value>);

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Builder-style clear: stores `null` so a merge removes the value.
    pub fn cleared(self, key: &str) -> Self {
        self.with(key, Value::Null)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Truthiness: `true`, a non-empty string, a non-zero number, or a
    /// non-empty list.
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(_)) => true,
            _ => false,
        }
    }

    /// A non-empty string field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A list-of-strings field; non-string items are skipped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shallow merge: every key in `update` overwrites, others are kept.
    pub fn merge(&mut self, update: SessionState) {
        for (k, v) in update.0 {
            self.0.insert(k, v);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for SessionState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(paths: &BackstopPaths) -> Self {
        Self {
            dir: paths.logs_dir.clone(),
        }
    }

    fn state_path(&self, conversation_id: &str) -> PathBuf {
        self.dir
            .join(format!("session_{}.json", sanitize_id(conversation_id)))
    }

    /// Stored record, or an empty one if none exists or it is unreadable.
    pub fn get(&self, conversation_id: &str) -> SessionState {
        let path = self.state_path(conversation_id);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return SessionState::new(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => SessionState(map),
            Ok(_) => SessionState::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable session state");
                SessionState::new()
            }
        }
    }

    /// Read, shallow-merge `update`, write the full record back.
    pub fn set(&self, conversation_id: &str, update: SessionState) {
        let mut current = self.get(conversation_id);
        current.merge(update);
        self.write(conversation_id, &current);
    }

    /// Replace the whole record with `baseline`.
    pub fn reset(&self, conversation_id: &str, baseline: SessionState) {
        self.write(conversation_id, &baseline);
    }

    fn write(&self, conversation_id: &str, state: &SessionState) {
        let path = self.state_path(conversation_id);
        let result = serde_json::to_vec(&state.0)
            .map_err(crate::StoreError::from)
            .and_then(|bytes| write_atomic(&path, &bytes));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "session state write failed");
        }
    }
}

/// Map an id onto `[A-Za-z0-9_-]`, capped at 64 chars. Empty ids share the
/// `default` record.
pub fn sanitize_id(conversation_id: &str) -> String {
    if conversation_id.is_empty() {
        return "default".to_string();
    }
    conversation_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_ID_LEN)
        .collect()
}
