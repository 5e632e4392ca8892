//! Tunable thresholds and project conventions.
//!
//! Values come from `data/config.json` (every field optional), then
//! `BACKSTOP_*` environment overrides. The numeric thresholds are empirical
//! and kept overridable rather than derived.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_LINE_DROP_PCT: f64 = 30.0;
pub const DEFAULT_LINE_DROP_MIN: usize = 5;
pub const DEFAULT_SMALL_FILE_LINES: usize = 100;
pub const DEFAULT_SMALL_FILE_DROP_MIN: usize = 2;
pub const DEFAULT_SYMBOL_LOSS_RATIO: f64 = 0.2;
pub const DEFAULT_MAX_LOOPS: u64 = 3;
pub const DEFAULT_LOG_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_LOG_KEEP: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Minimum relative line drop (percent) before a drop is flagged.
    pub line_drop_pct: f64,
    /// Absolute drop that is always significant once the percentage trips.
    pub line_drop_min: usize,
    /// Files below this many lines use `small_file_drop_min` instead.
    pub small_file_lines: usize,
    pub small_file_drop_min: usize,
    /// Fraction of previous symbols that must vanish to flag symbol loss.
    pub symbol_loss_ratio: f64,
    /// Turn-end directives are suppressed at or above this loop count.
    pub max_loops: u64,
    /// Path substrings marking the protected implementation area.
    pub core_markers: Vec<String>,
    /// Build scripts whose presence enables the rebuild directive.
    pub build_entry_points: Vec<String>,
    pub self_test_command: String,
    /// Extra lines appended to the conversation-start context.
    pub session_context: Vec<String>,
    pub log_max_bytes: u64,
    pub log_keep: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            line_drop_pct: DEFAULT_LINE_DROP_PCT,
            line_drop_min: DEFAULT_LINE_DROP_MIN,
            small_file_lines: DEFAULT_SMALL_FILE_LINES,
            small_file_drop_min: DEFAULT_SMALL_FILE_DROP_MIN,
            symbol_loss_ratio: DEFAULT_SYMBOL_LOSS_RATIO,
            max_loops: DEFAULT_MAX_LOOPS,
            core_markers: vec!["Core".to_string(), "Include".to_string()],
            build_entry_points: vec!["build_raijin_mingw.bat".to_string()],
            self_test_command: r"Bin\raijin.exe --self-test".to_string(),
            session_context: Vec::new(),
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            log_keep: DEFAULT_LOG_KEEP,
        }
    }
}

impl GuardConfig {
    /// Load config from `path` (missing file = defaults), then apply env overrides.
    /// A malformed file is reported and replaced by defaults.
    pub fn load(path: &Path) -> Self {
        let base = match Self::read_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                Self::default()
            }
        };
        base.with_env_overrides()
    }

    /// Parse the config file strictly. Missing file yields defaults.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply `BACKSTOP_*` environment overrides. Unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        self.line_drop_pct = env_parse("BACKSTOP_LINE_DROP_PCT").unwrap_or(self.line_drop_pct);
        self.line_drop_min = env_parse("BACKSTOP_LINE_DROP_MIN").unwrap_or(self.line_drop_min);
        self.small_file_lines =
            env_parse("BACKSTOP_SMALL_FILE_LINES").unwrap_or(self.small_file_lines);
        self.small_file_drop_min =
            env_parse("BACKSTOP_SMALL_FILE_DROP_MIN").unwrap_or(self.small_file_drop_min);
        self.symbol_loss_ratio =
            env_parse("BACKSTOP_SYMBOL_LOSS_RATIO").unwrap_or(self.symbol_loss_ratio);
        self.max_loops = env_parse("BACKSTOP_MAX_LOOPS").unwrap_or(self.max_loops);
        self.log_max_bytes = env_parse("BACKSTOP_LOG_MAX_BYTES").unwrap_or(self.log_max_bytes);
        self.log_keep = env_parse("BACKSTOP_LOG_KEEP").unwrap_or(self.log_keep);
        if let Ok(markers) = std::env::var("BACKSTOP_CORE_MARKERS") {
            let markers: Vec<String> = markers
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !markers.is_empty() {
                self.core_markers = markers;
            }
        }
        self
    }

    /// Binary substring test against the core markers.
    pub fn is_core_path(&self, rel: &str) -> bool {
        self.core_markers.iter().any(|m| rel.contains(m.as_str()))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let cfg = GuardConfig::default();
        assert_eq!(cfg.line_drop_pct, 30.0);
        assert_eq!(cfg.line_drop_min, 5);
        assert_eq!(cfg.small_file_lines, 100);
        assert_eq!(cfg.small_file_drop_min, 2);
        assert_eq!(cfg.symbol_loss_ratio, 0.2);
        assert_eq!(cfg.max_loops, 3);
        assert_eq!(cfg.core_markers, vec!["Core", "Include"]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = GuardConfig::read_file(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(cfg, GuardConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"line_drop_pct": 50, "core_markers": ["src/engine"]}"#).unwrap();
        let cfg = GuardConfig::read_file(&path).unwrap();
        assert_eq!(cfg.line_drop_pct, 50.0);
        assert_eq!(cfg.core_markers, vec!["src/engine"]);
        assert_eq!(cfg.line_drop_min, 5);
    }

    #[test]
    fn malformed_file_is_an_error_but_load_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            GuardConfig::read_file(&path),
            Err(ConfigError::Parse(_))
        ));
        let cfg = GuardConfig::load(&path);
        assert_eq!(cfg.line_drop_min, 5);
    }

    #[test]
    fn env_override_applies_and_ignores_garbage() {
        std::env::set_var("BACKSTOP_SYMBOL_LOSS_RATIO", "0.5");
        assert_eq!(GuardConfig::default().with_env_overrides().symbol_loss_ratio, 0.5);

        std::env::set_var("BACKSTOP_SYMBOL_LOSS_RATIO", "half");
        assert_eq!(GuardConfig::default().with_env_overrides().symbol_loss_ratio, 0.2);

        std::env::remove_var("BACKSTOP_SYMBOL_LOSS_RATIO");
    }

    #[test]
    fn core_path_is_substring_match() {
        let cfg = GuardConfig::default();
        assert!(cfg.is_core_path("Core/Neural/neural.cpp"));
        assert!(cfg.is_core_path("Include/hal.h"));
        assert!(!cfg.is_core_path("tools/build.py"));
    }
}
