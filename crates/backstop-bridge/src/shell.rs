//! Shell command gating and classification.

use std::sync::LazyLock;

use regex::Regex;

/// Commands that would destroy the project or the host. Matching is a fixed
/// denylist, not a sandbox.
static DESTRUCTIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\brm\s+-rf\s+/(?:[^/]|$)",
        r"\brm\s+-rf\s+\*\s*$",
        r"(?i)\bdel\s+/s\s+/q\s+c:",
        r"(?i)\bformat\s+c:",
        r"\bmkfs\.",
        r"\bdd\s+if=.*of=/dev",
        r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}",
        r"(?i)\breg(?:\.exe)?\s+add\s+HKLM\\Software\\Microsoft\\Windows\\?\s*CurrentVersion\\Run",
        r"(?i)\btaskkill\s+/f\s+/im\s+csrss",
        r"(?i)\bdel\s+/s\s+/q\s+\\\\\?\\",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static BUILD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)build_raijin|g\+\+|\bgcc\b|\bclang\b|msbuild|cmake\s+--build|\bmake\b|dotnet\s+build|cargo\s+build").unwrap()
});

static TEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)--self-test|--regression-replay|test_gauntlet|pytest|npm\s+test|ctest|cargo\s+test|dotnet\s+test").unwrap()
});

static DAMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)error:|failed|fatal|exit code [1-9]").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Build,
    Test,
    Shell,
}

impl CommandKind {
    pub fn classify(command: &str) -> Self {
        if BUILD.is_match(command) {
            Self::Build
        } else if TEST.is_match(command) {
            Self::Test
        } else {
            Self::Shell
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
            Self::Shell => "shell",
        }
    }
}

pub fn is_destructive(command: &str) -> bool {
    DESTRUCTIVE.iter().any(|re| re.is_match(command))
}

/// A build or test command whose output reports failure.
pub fn shows_damage(kind: CommandKind, output: &str) -> bool {
    kind != CommandKind::Shell && DAMAGE.is_match(output)
}
