use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-file sequence number distinguishing pre/post captures of one edit.
pub type Stage = u64;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// One literal replacement applied by an edit: `old_string` became `new_string`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EditPair {
    #[serde(default)]
    pub old_string: String,
    #[serde(default)]
    pub new_string: String,
}

impl EditPair {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old_string: old.into(),
            new_string: new.into(),
        }
    }
}

/// Where a snapshot capture came from.
pub mod source {
    pub const EDIT_PRE: &str = "afterFileEdit_pre";
    pub const EDIT_POST: &str = "afterFileEdit_post";
    pub const TAB_EDIT_PRE: &str = "afterTabFileEdit_pre";
    pub const TAB_EDIT_POST: &str = "afterTabFileEdit_post";
    pub const READ: &str = "beforeReadFile";
    pub const MANUAL: &str = "manual";
}

/// One index record of the snapshot log. Content lives in a separate blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub ts: TimestampMs,
    /// Project-relative, forward-slash path.
    pub rel: String,
    pub stage: Stage,
    /// Blob location relative to the rollback directory.
    pub snap: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Truncated sha256 of the blob content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Caller-supplied metadata, stored inline in the index record.
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl Snapshot {
    /// Index keys owned by the store. Metadata may not shadow them.
    pub const RESERVED_KEYS: [&'static str; 6] = ["ts", "rel", "stage", "snap", "source", "hash"];
}

/// What `save` hands back on success.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SavedSnapshot {
    pub ts: TimestampMs,
    pub rel: String,
    pub stage: Stage,
}

/// The newest capture for a path, content loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestSnapshot {
    pub content: String,
    pub ts: TimestampMs,
    pub stage: Stage,
}

/// A single placeholder-like hit found by the scanner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// 1-based line number.
    pub line: usize,
    pub tag: String,
    /// Matched text, capped at 60 chars.
    pub text: String,
    /// 0-based char column within the line.
    pub col: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMetrics {
    pub before_lines: usize,
    pub after_lines: usize,
    pub line_delta: i64,
    pub line_drop_pct: f64,
    pub symbols_lost: usize,
    pub symbol_count_before: usize,
    pub symbol_count_after: usize,
    pub placeholder_count: usize,
}

/// Outcome of a before/after content review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub degraded: bool,
    pub issues: Vec<String>,
    pub placeholder_matches: Vec<PlaceholderMatch>,
    pub metrics: ReviewMetrics,
}
