use std::path::Path;

use backstop_core::{source, Snapshot};
use backstop_store::{BackstopPaths, SnapshotStore};
use clap::Subcommand;

const MAX_LISTED_PATHS: usize = 50;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum RollbackCmd {
    /// List snapshots for a file, or every managed path when none is given
    List {
        /// File path (absolute or project-relative)
        path: Option<String>,
    },
    /// Print metadata of the newest snapshot for a file
    Latest {
        path: String,
    },
    /// Overwrite a file with its newest snapshot
    Restore {
        path: String,
    },
    /// Capture the current content of a file by hand
    Snapshot {
        path: String,
        /// Free-form note stored with the snapshot
        #[arg(long)]
        note: Option<String>,
    },
}

// ── Dispatch ──

pub fn run(cmd: RollbackCmd, project_root: &Path) -> anyhow::Result<()> {
    let store = SnapshotStore::new(BackstopPaths::discover(project_root));
    match cmd {
        RollbackCmd::List { path: Some(path) } => list_file(&store, &path),
        RollbackCmd::List { path: None } => list_paths(&store),
        RollbackCmd::Latest { path } => latest(&store, &path),
        RollbackCmd::Restore { path } => restore(&store, &path),
        RollbackCmd::Snapshot { path, note } => snapshot(&store, &path, note),
    }
}

// ── Command Implementations ──

fn list_file(store: &SnapshotStore, path: &str) -> anyhow::Result<()> {
    let rel = store.paths().relative(path);
    let entries = store.list_for_file(path);
    if entries.is_empty() {
        println!("No snapshots for {rel}");
    } else {
        for (i, e) in entries.iter().enumerate() {
            println!("{}", format_entry(i + 1, e));
        }
    }
    Ok(())
}

fn format_entry(n: usize, e: &Snapshot) -> String {
    let mut line = format!(
        "{n}. ts={} stage={} source={}",
        e.ts,
        e.stage,
        e.source.as_deref().unwrap_or("-")
    );
    if let Some(note) = e.meta.get("note").and_then(|v| v.as_str()) {
        line.push_str(&format!(" note={note:?}"));
    }
    line
}

fn list_paths(store: &SnapshotStore) -> anyhow::Result<()> {
    let expected = store.expected_paths();
    if expected.is_empty() {
        println!("(no managed paths)");
        return Ok(());
    }
    println!("Expected paths (known to rollback):");
    for rel in expected.iter().take(MAX_LISTED_PATHS) {
        println!("  {rel}");
    }
    if expected.len() > MAX_LISTED_PATHS {
        println!("  ... and {} more", expected.len() - MAX_LISTED_PATHS);
    }
    Ok(())
}

fn latest(store: &SnapshotStore, path: &str) -> anyhow::Result<()> {
    match store.find_latest(path) {
        Some(l) => println!(
            "{}",
            serde_json::json!({
                "ts": l.ts,
                "stage": l.stage,
                "contentLength": l.content.chars().count(),
            })
        ),
        None => println!("No snapshot for {}", store.paths().relative(path)),
    }
    Ok(())
}

fn restore(store: &SnapshotStore, path: &str) -> anyhow::Result<()> {
    let rel = store.paths().relative(path);
    let entries = store.list_for_file(path);
    let Some(newest) = entries.first() else {
        anyhow::bail!("No rollback snapshots for {rel}");
    };
    if !store.restore(path) {
        anyhow::bail!("Restore failed for {rel}");
    }
    println!("Restored {rel} from snapshot (ts={} stage={})", newest.ts, newest.stage);
    Ok(())
}

fn snapshot(store: &SnapshotStore, path: &str, note: Option<String>) -> anyhow::Result<()> {
    let rel = store.paths().relative(path);
    let abs = store.paths().absolute(path);
    let content = backstop_store::read_lossy(&abs)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", abs.display()))?;
    let mut meta = serde_json::Map::new();
    if let Some(note) = note {
        meta.insert("note".to_string(), note.into());
    }
    store.register_expected(&rel);
    let stage = store.next_stage(&rel);
    let Some(saved) = store.save_with_meta(&rel, &content, stage, Some(source::MANUAL), meta)
    else {
        anyhow::bail!("Snapshot failed for {rel}");
    };
    println!("Captured {rel} (ts={} stage={})", saved.ts, saved.stage);
    Ok(())
}
