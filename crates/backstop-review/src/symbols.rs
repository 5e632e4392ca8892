//! Best-effort symbol extraction, one pattern set per language family.
//!
//! Symbols are function/method names, type names, and include/import
//! targets. Includes and imports carry a prefix (`#`, `using `, `import `)
//! so they never collide with a same-named function.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    /// C, C++, and the default for unknown extensions.
    CLike,
    /// C#, Java, Kotlin.
    ClassOriented,
    /// Python, Ruby.
    DefBased,
}

impl LanguageFamily {
    /// Pick the family from a file path's extension. Unknown → `CLike`.
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .rsplit(['/', '\\'])
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "cs" | "java" | "kt" => Self::ClassOriented,
            "py" | "pyw" | "rb" => Self::DefBased,
            _ => Self::CLike,
        }
    }

    pub fn extract_symbols(&self, text: &str) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        if text.is_empty() {
            return symbols;
        }
        let patterns: &[(&Regex, &str)] = match self {
            Self::CLike => &[
                (&C_FUNCTION, ""),
                (&C_TYPE, ""),
                (&C_INCLUDE, "#"),
            ],
            Self::ClassOriented => &[
                (&CLASS_METHOD, ""),
                (&CLASS_TYPE, ""),
                (&CLASS_IMPORT, "using "),
            ],
            Self::DefBased => &[
                (&DEF_FUNCTION, ""),
                (&DEF_CLASS, ""),
                (&DEF_IMPORT, "import "),
            ],
        };
        for (re, prefix) in patterns {
            for caps in re.captures_iter(text) {
                if let Some(name) = caps.get(1) {
                    let name = name.as_str();
                    if prefix.is_empty() && KEYWORDS.contains(&name) {
                        continue;
                    }
                    symbols.insert(format!("{prefix}{name}"));
                }
            }
        }
        symbols
    }
}

/// Control-flow words that the function patterns would otherwise pick up
/// from lines like `} else if (x) {`.
const KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "return", "catch", "sizeof", "else", "new", "throw", "using",
    "lock", "foreach",
];

static C_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:[\w:*&<>]+[ \t*&]+)+(?:\w+::)*(\w+)[ \t]*\([^)]*\)[ \t]*(?:const)?\s*[{\s]",
    )
        .unwrap()
});
static C_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:typedef[ \t]+)?(?:class|struct|union|enum)[ \t]+(\w+)").unwrap()
});
static C_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"#include\s*[<"]([^>"]+)[>"]"#).unwrap());

static CLASS_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[\w<>\[\],.?]+[ \t]+)+(\w+)[ \t]*\([^)]*\)").unwrap()
});
static CLASS_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:(?:public|private|protected|internal|static|sealed|abstract|partial|final)[ \t]+)*(?:class|interface|struct|enum|record)[ \t]+(\w+)").unwrap()
});
static CLASS_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:using|import)[ \t]+([\w.]+)[ \t]*;").unwrap());

static DEF_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+(\w+)").unwrap());
static DEF_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*class[ \t]+(\w+)").unwrap());
static DEF_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:from|import)[ \t]+([\w.]+)").unwrap());
