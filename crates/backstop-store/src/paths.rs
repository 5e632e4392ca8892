use std::path::{Component, Path, PathBuf};

/// All well-known paths under `<project>/data/`.
#[derive(Debug, Clone)]
pub struct BackstopPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub rollback_dir: PathBuf,
    pub index_jsonl: PathBuf,
    pub expected_jsonl: PathBuf,
    pub config_json: PathBuf,
    pub hooks_log: PathBuf,
}

impl BackstopPaths {
    /// Derive all paths from a project root. Pure computation, no I/O beyond
    /// resolving a relative root against the current directory.
    pub fn discover(project_root: impl Into<PathBuf>) -> Self {
        let mut root: PathBuf = project_root.into();
        if root.is_relative() {
            if let Ok(cwd) = std::env::current_dir() {
                root = cwd.join(root);
            }
        }
        let root = lexical_clean(&root);
        let data_dir = root.join("data");
        let logs_dir = data_dir.join("logs");
        let rollback_dir = data_dir.join("rollback");
        Self {
            index_jsonl: rollback_dir.join("_index.jsonl"),
            expected_jsonl: rollback_dir.join("_expected.jsonl"),
            config_json: data_dir.join("config.json"),
            hooks_log: logs_dir.join("hooks.jsonl"),
            rollback_dir,
            logs_dir,
            data_dir,
            root,
        }
    }

    /// Create the data, logs, and rollback directories. Idempotent.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for dir in [&self.data_dir, &self.logs_dir, &self.rollback_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Resolve a user-supplied path (absolute or project-relative) to an
    /// absolute, lexically cleaned path.
    pub fn absolute(&self, file_path: &str) -> PathBuf {
        let p = Path::new(file_path);
        if p.is_absolute() {
            lexical_clean(p)
        } else {
            lexical_clean(&self.root.join(p))
        }
    }

    /// Project-relative, forward-slash form of `file_path`.
    /// Paths outside the root keep their `../` prefix.
    pub fn relative(&self, file_path: &str) -> String {
        let abs = self.absolute(file_path);
        relative_between(&self.root, &abs).replace('\\', "/")
    }

    /// Directory holding every blob captured for `rel`.
    pub fn blob_dir(&self, rel: &str) -> PathBuf {
        self.rollback_dir.join(sanitize_rel(rel))
    }

    pub fn has_vcs_root(&self) -> bool {
        self.root.join(".git").exists()
    }
}

/// Replace characters outside `[A-Za-z0-9_\-./]` with `_`, and neutralize
/// `..` segments so blobs never land outside the rollback directory.
pub fn sanitize_rel(rel: &str) -> String {
    let cleaned: String = rel
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .map(|seg| if seg == ".." { "__" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexical_clean(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in p.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn relative_between(base: &Path, target: &Path) -> String {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();
    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = Vec::new();
    for _ in common..base.len() {
        parts.push("..".to_string());
    }
    for comp in &target[common..] {
        parts.push(comp.as_os_str().to_string_lossy().to_string());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = BackstopPaths::discover("/tmp/proj");
        assert_eq!(p.data_dir, PathBuf::from("/tmp/proj/data"));
        assert_eq!(p.logs_dir, PathBuf::from("/tmp/proj/data/logs"));
        assert_eq!(
            p.index_jsonl,
            PathBuf::from("/tmp/proj/data/rollback/_index.jsonl")
        );
        assert_eq!(
            p.expected_jsonl,
            PathBuf::from("/tmp/proj/data/rollback/_expected.jsonl")
        );
        assert_eq!(p.hooks_log, PathBuf::from("/tmp/proj/data/logs/hooks.jsonl"));
    }

    #[test]
    fn relative_normalizes_absolute_and_relative_inputs() {
        let p = BackstopPaths::discover("/tmp/proj");
        assert_eq!(p.relative("/tmp/proj/Core/a.cpp"), "Core/a.cpp");
        assert_eq!(p.relative("Core/a.cpp"), "Core/a.cpp");
        assert_eq!(p.relative("./Core/../Core/a.cpp"), "Core/a.cpp");
        assert_eq!(p.relative("/tmp/other/b.c"), "../other/b.c");
    }

    #[test]
    fn sanitize_replaces_odd_chars_and_parent_segments() {
        assert_eq!(sanitize_rel("Core/My File (1).cpp"), "Core/My_File__1_.cpp");
        assert_eq!(sanitize_rel("../outside/x.c"), "__/outside/x.c");
        assert_eq!(sanitize_rel("/abs//x.c"), "abs/x.c");
    }

    #[test]
    fn blob_dir_stays_under_rollback() {
        let p = BackstopPaths::discover("/tmp/proj");
        let d = p.blob_dir("../../etc/passwd");
        assert!(d.starts_with(&p.rollback_dir));
    }

    #[test]
    fn ensure_layout_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let p = BackstopPaths::discover(tmp.path());
        p.ensure_layout().unwrap();
        assert!(p.logs_dir.is_dir());
        assert!(p.rollback_dir.is_dir());
    }
}
