pub mod error;
pub mod event_log;
pub mod paths;
pub mod session;
pub mod snapshot;

pub use error::StoreError;
pub use event_log::EventLog;
pub use paths::BackstopPaths;
pub use session::{field, SessionState, SessionStore};
pub use snapshot::SnapshotStore;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Resolve the project root the hooks operate on.
/// `BACKSTOP_PROJECT_DIR` wins, then the host-provided project dir variables,
/// then the current directory.
pub fn project_root() -> PathBuf {
    for key in [
        "BACKSTOP_PROJECT_DIR",
        "CURSOR_PROJECT_DIR",
        "CLAUDE_PROJECT_DIR",
    ] {
        if let Ok(dir) = std::env::var(key) {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::NoParent(path.to_path_buf()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a text file, replacing invalid UTF-8 sequences with U+FFFD.
pub fn read_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Append one line to a file, creating it (and its parent) on demand.
pub(crate) fn append_line(path: &Path, line: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
