use std::path::Path;

use backstop_core::GuardConfig;
use backstop_store::BackstopPaths;
use clap::Subcommand;
use serde_json::{Map, Value};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. line_drop_pct)
        key: String,
        /// Config value (true/false/number/string, or a JSON array)
        value: String,
    },
    /// Get the effective value of a config key
    Get {
        key: String,
    },
    /// List every effective config value
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, project_root: &Path) -> anyhow::Result<()> {
    let paths = BackstopPaths::discover(project_root);
    match cmd {
        ConfigCmd::Set { key, value } => set(&paths, &key, &value),
        ConfigCmd::Get { key } => get(&paths, &key),
        ConfigCmd::List => list(&paths),
    }
}

// ── Command Implementations ──

fn read_config(path: &Path) -> anyhow::Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Parse a command-line value into JSON: bools, numbers, arrays, else a string.
fn parse_value(s: &str) -> Value {
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else if s.starts_with('[') {
                serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
            } else {
                Value::String(s.to_string())
            }
        }
    }
}

/// Effective settings (file plus env overrides) as a JSON object.
fn effective(paths: &BackstopPaths) -> anyhow::Result<Map<String, Value>> {
    match serde_json::to_value(GuardConfig::load(&paths.config_json))? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// `backstop config set <key> <value>`. Unknown keys and ill-typed values
/// are rejected before anything is written.
fn set(paths: &BackstopPaths, key: &str, value: &str) -> anyhow::Result<()> {
    if !effective(paths)?.contains_key(key) {
        anyhow::bail!("Unknown config key: {key}");
    }
    let mut config = read_config(&paths.config_json)?;
    config.insert(key.to_string(), parse_value(value));
    let candidate = Value::Object(config);
    serde_json::from_value::<GuardConfig>(candidate.clone())
        .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}"))?;
    backstop_store::write_atomic(
        &paths.config_json,
        serde_json::to_string_pretty(&candidate)?.as_bytes(),
    )?;
    println!("{key} = {value}");
    Ok(())
}

fn get(paths: &BackstopPaths, key: &str) -> anyhow::Result<()> {
    match effective(paths)?.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

fn list(paths: &BackstopPaths) -> anyhow::Result<()> {
    for (k, v) in &effective(paths)? {
        println!("{k} = {v}");
    }
    Ok(())
}
