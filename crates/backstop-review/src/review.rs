//! Before/after comparison of one file's content.
//!
//! Each check is independent and appends at most one issue (placeholder
//! regression may append two). `degraded` is simply "any issue raised".

use backstop_core::{GuardConfig, ReviewMetrics, ReviewResult};

use crate::brackets::bracket_balance;
use crate::placeholder::{scan_placeholders, tag_histogram};
use crate::symbols::LanguageFamily;

const MAX_LOST_SYMBOLS_LISTED: usize = 10;
const MAX_PLACEHOLDER_LINES_LISTED: usize = 8;

/// Lines in `text`. Empty text has zero lines; otherwise a trailing newline
/// counts as starting one more (empty) line.
pub fn line_count(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split('\n').count()
    }
}

pub fn review(before: &str, after: &str, file_path: &str, config: &GuardConfig) -> ReviewResult {
    let mut issues = Vec::new();

    // 1. line-count drop
    let before_lines = line_count(before);
    let after_lines = line_count(after);
    let delta = before_lines as i64 - after_lines as i64;
    let pct = if before_lines == 0 {
        0.0
    } else {
        delta as f64 / before_lines as f64 * 100.0
    };
    let significant = delta > config.line_drop_min as i64
        || (before_lines < config.small_file_lines && delta > config.small_file_drop_min as i64);
    if pct > config.line_drop_pct && significant {
        issues.push(format!(
            "Line count dropped {delta} ({pct:.0}%). Possible functionality loss."
        ));
    }

    // 2. emptied
    if after_lines == 0 && before_lines > 0 {
        issues.push("File emptied. Severe functionality loss.".to_string());
    }

    // 3. brackets
    if !after.trim().is_empty() && !bracket_balance(after) {
        issues.push("Bracket/brace imbalance. Syntax likely broken.".to_string());
    }

    // 4. symbols
    let family = LanguageFamily::from_path(file_path);
    let symbols_before = family.extract_symbols(before);
    let symbols_after = family.extract_symbols(after);
    let lost: Vec<&String> = symbols_before.difference(&symbols_after).collect();
    if !lost.is_empty()
        && lost.len() as f64 >= config.symbol_loss_ratio * symbols_before.len() as f64
    {
        let names: Vec<&str> = lost
            .iter()
            .take(MAX_LOST_SYMBOLS_LISTED)
            .map(|s| s.as_str())
            .collect();
        let more = if lost.len() > MAX_LOST_SYMBOLS_LISTED {
            "..."
        } else {
            ""
        };
        issues.push(format!(
            "Symbols removed: {}{more}. Possible functionality loss.",
            names.join(", ")
        ));
    }

    // 5. content removed
    if !before.trim().is_empty() && after.trim().is_empty() {
        issues.push("Content removed entirely.".to_string());
    }

    // 6. placeholders
    let placeholder_matches = scan_placeholders(after);
    if !placeholder_matches.is_empty() {
        let histogram = tag_histogram(&placeholder_matches)
            .into_iter()
            .map(|(tag, n)| format!("{tag}:{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut lines: Vec<usize> = Vec::new();
        for m in &placeholder_matches {
            if !lines.contains(&m.line) {
                lines.push(m.line);
            }
        }
        let listed = lines
            .iter()
            .take(MAX_PLACEHOLDER_LINES_LISTED)
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if lines.len() > MAX_PLACEHOLDER_LINES_LISTED {
            "..."
        } else {
            ""
        };
        issues.push(format!(
            "Placeholder/demo/simulated/mock detected: {histogram}. Line(s): {listed}{more}."
        ));

        let before_count = scan_placeholders(before).len();
        if placeholder_matches.len() > before_count {
            issues.push(format!(
                "Edit introduced {} new placeholder-like pattern(s). Replace with real implementation.",
                placeholder_matches.len() - before_count
            ));
        }
    }

    let metrics = ReviewMetrics {
        before_lines,
        after_lines,
        line_delta: delta,
        line_drop_pct: pct,
        symbols_lost: lost.len(),
        symbol_count_before: symbols_before.len(),
        symbol_count_after: symbols_after.len(),
        placeholder_count: placeholder_matches.len(),
    };
    if !issues.is_empty() {
        tracing::debug!(file = file_path, issues = issues.len(), "review flagged degradation");
    }
    ReviewResult {
        degraded: !issues.is_empty(),
        issues,
        placeholder_matches,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_lines(n: usize) -> String {
        (0..n)
            .map(|i| format!("value_{i} = {i};"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn line_count_rules() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\nb"), 2);
        assert_eq!(line_count("a\n"), 2);
    }

    #[test]
    fn large_line_drop_is_flagged() {
        let before = numbered_lines(200);
        let after = numbered_lines(120);
        let r = review(&before, &after, "Core/data.c", &GuardConfig::default());
        assert!(r.degraded);
        assert_eq!(r.metrics.line_delta, 80);
        assert!((r.metrics.line_drop_pct - 40.0).abs() < 1e-9);
        assert_eq!(
            r.issues,
            vec!["Line count dropped 80 (40%). Possible functionality loss."]
        );
    }

    #[test]
    fn identical_content_is_clean() {
        let src = "#include <stdio.h>\nint main() {\n    return 0;\n}\n";
        let r = review(src, src, "main.c", &GuardConfig::default());
        assert!(!r.degraded);
        assert!(r.issues.is_empty());
        assert_eq!(r.metrics.line_delta, 0);
        assert_eq!(r.metrics.symbols_lost, 0);
    }

    #[test]
    fn small_file_uses_small_absolute_threshold() {
        // 10 -> 6: 40% but only 4 lines; counts because the file is small
        let r = review(&numbered_lines(10), &numbered_lines(6), "a.c", &GuardConfig::default());
        assert!(r.issues.iter().any(|i| i.starts_with("Line count dropped 4")));

        // 5 -> 3: 40% but only 2 lines, not above the small-file minimum
        let r = review(&numbered_lines(5), &numbered_lines(3), "a.c", &GuardConfig::default());
        assert!(!r.degraded);
    }

    #[test]
    fn emptied_file() {
        let r = review("int x;\nint y;\n", "", "a.c", &GuardConfig::default());
        assert!(r.issues.contains(&"File emptied. Severe functionality loss.".to_string()));
        assert!(r.issues.contains(&"Content removed entirely.".to_string()));
    }

    #[test]
    fn whitespace_only_after_is_content_removed() {
        let r = review("int x;", "   \n", "a.c", &GuardConfig::default());
        assert!(r.issues.contains(&"Content removed entirely.".to_string()));
        assert!(!r.issues.iter().any(|i| i.starts_with("File emptied")));
    }

    #[test]
    fn broken_braces() {
        let before = "int f() {\n    return 1;\n}\n";
        let after = "int f() {\n    return 1;\n";
        let r = review(before, after, "a.c", &GuardConfig::default());
        assert!(r
            .issues
            .contains(&"Bracket/brace imbalance. Syntax likely broken.".to_string()));
    }

    #[test]
    fn symbol_loss_lists_names() {
        let before = "int alpha() {\n    return 1;\n}\nint beta() {\n    return 2;\n}\n";
        let after = "int alpha() {\n    return 1;\n}\n";
        let r = review(before, after, "a.c", &GuardConfig::default());
        assert_eq!(r.metrics.symbols_lost, 1);
        assert_eq!(r.metrics.symbol_count_before, 2);
        assert!(r
            .issues
            .contains(&"Symbols removed: beta. Possible functionality loss.".to_string()));
    }

    #[test]
    fn new_placeholders_raise_two_issues() {
        let before = "int f() {\n    return compute();\n}\n";
        let after = "int f() {\n    // TODO: fix this later\n    return compute();\n}\n";
        let r = review(before, after, "a.c", &GuardConfig::default());
        assert!(r.degraded);
        assert_eq!(r.metrics.placeholder_count, r.placeholder_matches.len());
        assert!(r.issues.iter().any(|i| {
            i.starts_with("Placeholder/demo/simulated/mock detected: placeholder_marker:")
                && i.ends_with("Line(s): 2.")
        }));
        assert!(r.issues.iter().any(|i| i.starts_with("Edit introduced")));
    }

    #[test]
    fn preexisting_placeholders_do_not_count_as_new() {
        let src = "int f() {\n    // TODO: fix this later\n    return 1;\n}\n";
        let r = review(src, src, "a.c", &GuardConfig::default());
        assert!(r.degraded);
        assert!(!r.issues.iter().any(|i| i.starts_with("Edit introduced")));
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = GuardConfig {
            line_drop_pct: 50.0,
            ..GuardConfig::default()
        };
        let r = review(&numbered_lines(200), &numbered_lines(120), "a.c", &config);
        assert!(!r.degraded);
    }
}
