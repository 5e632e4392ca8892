use std::fs;
use std::path::{Path, PathBuf};

use backstop_store::{now_rfc3339, write_atomic};
use serde_json::{json, Value};

// ── Install / Uninstall ──

const HOOK_COMMAND_PREFIX: &str = "backstop hook";

/// Hook events backstop registers for.
pub const HOOK_EVENTS: &[&str] = &[
    "sessionStart",
    "afterFileEdit",
    "afterTabFileEdit",
    "beforeReadFile",
    "beforeShellExecution",
    "afterShellExecution",
    "postToolUseFailure",
    "stop",
    "preToolUse",
    "subagentStart",
    "subagentStop",
    "beforeMCPExecution",
    "afterMCPExecution",
    "afterAgentResponse",
    "preCompact",
    "sessionEnd",
];

fn is_backstop_entry(entry: &Value) -> bool {
    entry
        .get("command")
        .and_then(Value::as_str)
        .is_some_and(|c| c.contains(HOOK_COMMAND_PREFIX))
}

pub fn hooks_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".cursor").join("hooks.json")
}

fn read_hooks_file(path: &Path) -> anyhow::Result<Value> {
    if !path.exists() {
        return Ok(json!({ "version": 1 }));
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|_| json!({ "version": 1 })))
}

/// Register `backstop hook --event <name>` for every managed event in
/// `.cursor/hooks.json`, keeping hooks that belong to other tools.
pub fn install(repo_root: &Path) -> anyhow::Result<()> {
    let path = hooks_path(repo_root);
    let mut settings = read_hooks_file(&path)?;

    if path.exists() {
        let ts = now_rfc3339().replace(':', "-");
        let backup = path.with_extension(format!("json.backstop.bak.{ts}"));
        fs::copy(&path, &backup)?;
    }

    let root = settings
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("hooks.json is not an object"))?;
    root.entry("version").or_insert(json!(1));
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("hooks is not an object"))?;

    for event in HOOK_EVENTS {
        let mut entries: Vec<Value> = hooks
            .get(*event)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|e| !is_backstop_entry(e))
            .collect();
        entries.push(json!({ "command": format!("{HOOK_COMMAND_PREFIX} --event {event}") }));
        hooks.insert(event.to_string(), Value::Array(entries));
    }

    write_atomic(&path, serde_json::to_string_pretty(&settings)?.as_bytes())?;
    println!("Installed backstop hooks into {}", path.display());
    Ok(())
}

/// Remove every backstop entry; events left with no hooks are dropped.
pub fn uninstall(repo_root: &Path) -> anyhow::Result<()> {
    let path = hooks_path(repo_root);
    if !path.exists() {
        println!("No hooks file found at {}", path.display());
        return Ok(());
    }

    let content = fs::read_to_string(&path)?;
    let mut settings: Value = serde_json::from_str(&content)?;

    if let Some(hooks) = settings.get_mut("hooks").and_then(Value::as_object_mut) {
        let events: Vec<String> = hooks.keys().cloned().collect();
        for event in events {
            let Some(entries) = hooks.get(&event).and_then(Value::as_array).cloned() else {
                continue;
            };
            let kept: Vec<Value> = entries
                .into_iter()
                .filter(|e| !is_backstop_entry(e))
                .collect();
            if kept.is_empty() {
                hooks.remove(&event);
            } else {
                hooks.insert(event, Value::Array(kept));
            }
        }
    }

    write_atomic(&path, serde_json::to_string_pretty(&settings)?.as_bytes())?;
    println!("Uninstalled backstop hooks from {}", path.display());
    Ok(())
}
