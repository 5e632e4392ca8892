//! Append-only snapshot store.
//!
//! Each capture writes an immutable blob under
//! `data/rollback/<sanitized rel path>/<ts>_s<stage>.snap` and appends one
//! index record to `data/rollback/_index.jsonl`. Nothing is ever rewritten or
//! deleted. Concurrent writers may interleave index lines; every line is a
//! complete record, so the index stays readable.
//!
//! Public operations never return errors: failures become `None`, `false`,
//! or an empty list, and are reported through `tracing`.

use std::collections::BTreeSet;
use std::fs;

use backstop_core::{LatestSnapshot, SavedSnapshot, Snapshot, Stage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::paths::BackstopPaths;
use crate::{append_line, now_ms, write_atomic, StoreError};

#[derive(Debug, Serialize, Deserialize)]
struct ExpectedRecord {
    rel: String,
    ts: i64,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    paths: BackstopPaths,
}

impl SnapshotStore {
    pub fn new(paths: BackstopPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &BackstopPaths {
        &self.paths
    }

    /// Capture `content` for `file_path` at `stage`.
    pub fn save(
        &self,
        file_path: &str,
        content: &str,
        stage: Stage,
        source: Option<&str>,
    ) -> Option<SavedSnapshot> {
        self.save_with_meta(file_path, content, stage, source, Map::new())
    }

    /// Like [`save`](Self::save), with extra metadata stored inline in the
    /// index record. Keys in [`Snapshot::RESERVED_KEYS`] are dropped.
    pub fn save_with_meta(
        &self,
        file_path: &str,
        content: &str,
        stage: Stage,
        source: Option<&str>,
        mut meta: Map<String, Value>,
    ) -> Option<SavedSnapshot> {
        for key in Snapshot::RESERVED_KEYS {
            if meta.remove(key).is_some() {
                tracing::debug!(key, "reserved snapshot metadata key dropped");
            }
        }
        match self.try_save(file_path, content, stage, source, meta) {
            Ok(saved) => Some(saved),
            Err(e) => {
                tracing::warn!(file = file_path, stage, error = %e, "snapshot save failed");
                None
            }
        }
    }

    fn try_save(
        &self,
        file_path: &str,
        content: &str,
        stage: Stage,
        source: Option<&str>,
        meta: Map<String, Value>,
    ) -> Result<SavedSnapshot, StoreError> {
        let rel = self.paths.relative(file_path);
        let ts = now_ms();
        let blob_dir = self.paths.blob_dir(&rel);
        let blob_path = blob_dir.join(format!("{ts}_s{stage}.snap"));
        write_atomic(&blob_path, content.as_bytes())?;

        let snap = blob_path
            .strip_prefix(&self.paths.rollback_dir)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| blob_path.to_string_lossy().to_string());
        let entry = Snapshot {
            ts,
            rel: rel.clone(),
            stage,
            snap,
            source: source.map(str::to_string),
            hash: Some(content_hash(content)),
            meta,
        };
        append_line(&self.paths.index_jsonl, &serde_json::to_string(&entry)?)?;
        tracing::debug!(rel = %rel, stage, ts, "snapshot saved");
        Ok(SavedSnapshot { ts, rel, stage })
    }

    /// Every readable index record, in append order. Malformed lines are skipped.
    pub fn read_index(&self) -> Vec<Snapshot> {
        let content = match fs::read_to_string(&self.paths.index_jsonl) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str::<Snapshot>(l).ok())
            .collect()
    }

    /// Snapshots for one file, newest first. Equal timestamps order by
    /// higher stage first so a post-edit capture outranks its pre capture.
    pub fn list_for_file(&self, file_path: &str) -> Vec<Snapshot> {
        let rel = self.paths.relative(file_path);
        let mut entries: Vec<Snapshot> = self
            .read_index()
            .into_iter()
            .filter(|e| e.rel == rel)
            .collect();
        entries.sort_by(|a, b| b.ts.cmp(&a.ts).then(b.stage.cmp(&a.stage)));
        entries
    }

    /// Newest capture with its content, or `None` if there is no entry or
    /// its blob is gone.
    pub fn find_latest(&self, file_path: &str) -> Option<LatestSnapshot> {
        let entry = self.list_for_file(file_path).into_iter().next()?;
        let blob = self.paths.rollback_dir.join(&entry.snap);
        match fs::read_to_string(&blob) {
            Ok(content) => Some(LatestSnapshot {
                content,
                ts: entry.ts,
                stage: entry.stage,
            }),
            Err(e) => {
                tracing::warn!(blob = %blob.display(), error = %e, "snapshot blob unreadable");
                None
            }
        }
    }

    /// Overwrite the live file with its newest capture, creating parent
    /// directories as needed. `false` when nothing could be restored.
    pub fn restore(&self, file_path: &str) -> bool {
        let latest = match self.find_latest(file_path) {
            Some(l) => l,
            None => return false,
        };
        let abs = self.paths.absolute(file_path);
        match write_atomic(&abs, latest.content.as_bytes()) {
            Ok(()) => {
                tracing::debug!(file = %abs.display(), stage = latest.stage, "restored from snapshot");
                true
            }
            Err(e) => {
                tracing::warn!(file = %abs.display(), error = %e, "restore failed");
                false
            }
        }
    }

    /// Stage for the next capture of `file_path`: previous maximum + 1,
    /// or 0 for a file with no history.
    pub fn next_stage(&self, file_path: &str) -> Stage {
        self.list_for_file(file_path)
            .iter()
            .map(|e| e.stage)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Record one edit event as two consecutive stages: `pre` at the next
    /// stage and `post` right after it. Returns the saved post capture.
    pub fn record_edit(
        &self,
        file_path: &str,
        pre: &str,
        post: &str,
        sources: (&str, &str),
    ) -> Option<SavedSnapshot> {
        let pre_stage = self.next_stage(file_path);
        self.save(file_path, pre, pre_stage, Some(sources.0))?;
        self.save(file_path, post, pre_stage + 1, Some(sources.1))
    }

    /// True when the newest capture for `file_path` already holds `content`.
    pub fn latest_matches(&self, file_path: &str, content: &str) -> bool {
        let hash = content_hash(content);
        self.list_for_file(file_path)
            .first()
            .and_then(|e| e.hash.as_deref())
            .is_some_and(|h| h == hash)
    }

    /// Append a registration record for `file_path`. Duplicates are harmless.
    pub fn register_expected(&self, file_path: &str) {
        let record = ExpectedRecord {
            rel: self.paths.relative(file_path),
            ts: now_ms(),
        };
        let result = serde_json::to_string(&record)
            .map_err(StoreError::from)
            .and_then(|line| append_line(&self.paths.expected_jsonl, &line));
        if let Err(e) = result {
            tracing::warn!(file = file_path, error = %e, "expected-path registration failed");
        }
    }

    /// Every path ever registered, deduplicated.
    pub fn expected_paths(&self) -> BTreeSet<String> {
        let content = match fs::read_to_string(&self.paths.expected_jsonl) {
            Ok(c) => c,
            Err(_) => return BTreeSet::new(),
        };
        content
            .lines()
            .filter_map(|l| serde_json::from_str::<ExpectedRecord>(l).ok())
            .map(|r| r.rel)
            .filter(|r| !r.is_empty())
            .collect()
    }
}

fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SnapshotStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(BackstopPaths::discover(tmp.path()));
        (tmp, store)
    }

    #[test]
    fn save_then_find_latest() {
        let (_tmp, store) = store();
        let saved = store.save("Core/a.cpp", "int a;", 0, Some("manual")).unwrap();
        assert_eq!(saved.rel, "Core/a.cpp");
        assert_eq!(saved.stage, 0);

        let latest = store.find_latest("Core/a.cpp").unwrap();
        assert_eq!(latest.content, "int a;");
        assert_eq!(latest.stage, 0);
    }

    #[test]
    fn metadata_lands_in_index_without_shadowing_store_keys() {
        let (_tmp, store) = store();
        let mut meta = Map::new();
        meta.insert("note".into(), Value::from("before refactor"));
        meta.insert("stage".into(), Value::from(99));
        store
            .save_with_meta("a.c", "int a;", 0, Some("manual"), meta)
            .unwrap();

        let entries = store.list_for_file("a.c");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, 0);
        assert_eq!(entries[0].source.as_deref(), Some("manual"));
        assert_eq!(entries[0].meta.get("note"), Some(&Value::from("before refactor")));
        assert!(!entries[0].meta.contains_key("stage"));
    }

    #[test]
    fn absolute_and_relative_paths_share_history() {
        let (tmp, store) = store();
        let abs = tmp.path().join("src").join("x.py");
        store.save(abs.to_str().unwrap(), "x = 1", 0, None).unwrap();
        assert_eq!(store.list_for_file("src/x.py").len(), 1);
    }

    #[test]
    fn list_is_newest_first() {
        let (_tmp, store) = store();
        for stage in 0..4 {
            store.save("a.c", &format!("v{stage}"), stage, None).unwrap();
        }
        store.save("b.c", "other", 0, None).unwrap();
        let list = store.list_for_file("a.c");
        assert_eq!(list.len(), 4);
        for pair in list.windows(2) {
            assert!(pair[0].ts >= pair[1].ts);
        }
        assert_eq!(list[0].stage, 3);
        assert_eq!(store.find_latest("a.c").unwrap().content, "v3");
    }

    #[test]
    fn first_edit_yields_stages_zero_and_one() {
        let (_tmp, store) = store();
        store
            .record_edit("a.c", "pre", "post", ("edit_pre", "edit_post"))
            .unwrap();
        let mut stages: Vec<Stage> = store.list_for_file("a.c").iter().map(|e| e.stage).collect();
        stages.sort();
        assert_eq!(stages, vec![0, 1]);
        assert_eq!(store.find_latest("a.c").unwrap().content, "post");
    }

    #[test]
    fn next_edit_continues_after_prior_max() {
        let (_tmp, store) = store();
        store.save("a.c", "old", 4, None).unwrap();
        store
            .record_edit("a.c", "pre", "post", ("edit_pre", "edit_post"))
            .unwrap();
        let mut stages: Vec<Stage> = store.list_for_file("a.c").iter().map(|e| e.stage).collect();
        stages.sort();
        assert_eq!(stages, vec![4, 5, 6]);
    }

    #[test]
    fn restore_recreates_missing_file() {
        let (tmp, store) = store();
        store.save("deep/dir/f.txt", "content", 0, None).unwrap();
        assert!(store.restore("deep/dir/f.txt"));
        let restored = fs::read_to_string(tmp.path().join("deep/dir/f.txt")).unwrap();
        assert_eq!(restored, "content");
    }

    #[test]
    fn restore_without_history_is_false() {
        let (_tmp, store) = store();
        assert!(!store.restore("nothing.c"));
        assert!(store.find_latest("nothing.c").is_none());
        assert!(store.list_for_file("nothing.c").is_empty());
    }

    #[test]
    fn missing_blob_yields_none() {
        let (_tmp, store) = store();
        store.save("a.c", "x", 0, None).unwrap();
        let entry = store.list_for_file("a.c").remove(0);
        fs::remove_file(store.paths().rollback_dir.join(&entry.snap)).unwrap();
        assert!(store.find_latest("a.c").is_none());
        assert!(!store.restore("a.c"));
    }

    #[test]
    fn malformed_index_lines_are_skipped() {
        let (_tmp, store) = store();
        store.save("a.c", "x", 0, None).unwrap();
        append_line(&store.paths().index_jsonl, "{garbage").unwrap();
        store.save("a.c", "y", 1, None).unwrap();
        assert_eq!(store.list_for_file("a.c").len(), 2);
    }

    #[test]
    fn latest_matches_compares_content_hash() {
        let (_tmp, store) = store();
        assert!(!store.latest_matches("a.c", "x"));
        store.save("a.c", "x", 0, None).unwrap();
        assert!(store.latest_matches("a.c", "x"));
        assert!(!store.latest_matches("a.c", "y"));
    }

    #[test]
    fn expected_paths_dedup() {
        let (_tmp, store) = store();
        store.register_expected("Core/a.cpp");
        store.register_expected("Core/a.cpp");
        store.register_expected("Include/a.h");
        let expected = store.expected_paths();
        assert_eq!(expected.len(), 2);
        assert!(expected.contains("Include/a.h"));
    }
}
