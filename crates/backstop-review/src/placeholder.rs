//! Detector for non-production placeholder text: markers, stubs, hedging,
//! demo/mock wording, and empty function bodies.
//!
//! Rules run line by line in catalogue order and every match is collected.
//! A second pass over the whole text finds `{}` bodies that close a
//! parameter list, skipping aggregate declarations and control-flow blocks.

use std::sync::LazyLock;

use backstop_core::PlaceholderMatch;
use regex::Regex;

pub mod tag {
    pub const PLACEHOLDER_MARKER: &str = "placeholder_marker";
    pub const STUB: &str = "stub";
    pub const UNIMPLEMENTED: &str = "unimplemented";
    pub const TEMPORARY_WORKAROUND: &str = "temporary_workaround";
    pub const UNREAL_EXAMPLE: &str = "unreal_example";
    pub const DEMO: &str = "demo";
    pub const SIMULATED_MOCK: &str = "simulated_mock";
    pub const PSEUDOCODE: &str = "pseudocode";
    pub const ELLIPSIS_PLACEHOLDER: &str = "ellipsis_placeholder";
    pub const MAGIC_PLACEHOLDER: &str = "magic_placeholder";
    pub const ASSUME_EXISTS: &str = "assume_exists";
    pub const FAKE_RETURN: &str = "fake_return";
    pub const EMPTY_BODY: &str = "empty_body";
    pub const CONSOLE_INSTEAD_OF_LOGIC: &str = "console_instead_of_logic";
    pub const PRINT_INSTEAD_OF_LOGIC: &str = "print_instead_of_logic";
}

const MAX_MATCH_TEXT: usize = 60;
const CONTEXT_CHARS: usize = 100;

/// Ordered (pattern, tag) catalogue, compiled once.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\bTODO\b|\bFIXME\b|\bXXX\b|\bHACK\b|\bPLACEHOLDER\b").unwrap(),
            tag::PLACEHOLDER_MARKER,
        ),
        (Regex::new(r"(?i)\bstub\b").unwrap(), tag::STUB),
        (
            Regex::new(
                r"(?i)\bimplement\s*(?:me|later|this)\b|\bto\s*be\s*implemented\b|\bnot\s*yet\s*implemented\b",
            )
            .unwrap(),
            tag::UNIMPLEMENTED,
        ),
        (
            Regex::new(
                r"(?i)\b(?:for\s*now|simplified|basic)\s*(?:we'll|we\s*will|let's|we)?\s*(?:just|only)\b",
            )
            .unwrap(),
            tag::TEMPORARY_WORKAROUND,
        ),
        (
            Regex::new(
                r"(?i)\bin\s*a\s*real\s*system\b|\bhere'?s\s*(?:a\s*)?simplified\b|\bthis\s*is\s*(?:a\s*)?basic\s*example\b",
            )
            .unwrap(),
            tag::UNREAL_EXAMPLE,
        ),
        (
            Regex::new(
                r"(?i)\bdemo\b|\bexample\s*code\b|\bfor\s*demonstration\b|\bdemonstration\s*only\b",
            )
            .unwrap(),
            tag::DEMO,
        ),
        (
            Regex::new(r"(?i)\bsimulated\b|\bsimulation\b|\bmock(?:ed)?\b|\bfaked?\b|\bdummy\b")
                .unwrap(),
            tag::SIMULATED_MOCK,
        ),
        (
            Regex::new(r"(?i)\bpseudo[\s-]*code\b").unwrap(),
            tag::PSEUDOCODE,
        ),
        (
            Regex::new(r"//\s*\.\.\.|/\*\s*\.\.\.\s*\*/|#\s*\.\.\.").unwrap(),
            tag::ELLIPSIS_PLACEHOLDER,
        ),
        (
            Regex::new(r"(?i)\bREPLACE_ME\b|\bIMPLEMENT_ME\b|\bFILL_ME\b|\bXXX\s*replace\b")
                .unwrap(),
            tag::MAGIC_PLACEHOLDER,
        ),
        (
            Regex::new(r"(?i)\bassume\s+[^.]*exists\b").unwrap(),
            tag::ASSUME_EXISTS,
        ),
        (
            Regex::new(
                r"(?i)\breturn\s*(?:0|null|undefined|true|false)\s*;?\s*//\s*(?:placeholder|stub|todo)",
            )
            .unwrap(),
            tag::FAKE_RETURN,
        ),
        (
            Regex::new(r"(?i)\{\s*\}\s*;?\s*//|\{\s*//\s*(?:todo|stub|placeholder)").unwrap(),
            tag::EMPTY_BODY,
        ),
        (
            Regex::new(r"(?i)\bconsole\.log\s*\([^)]*\)\s*;?\s*//\s*(?:instead|replacing)")
                .unwrap(),
            tag::CONSOLE_INSTEAD_OF_LOGIC,
        ),
        (
            Regex::new(r"(?i)\bprintf?\s*\([^)]*\)\s*;?\s*//\s*(?:instead|replacing|debug)")
                .unwrap(),
            tag::PRINT_INSTEAD_OF_LOGIC,
        ),
    ]
});

static EMPTY_BRACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\s*\}").unwrap());

static AGGREGATE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:struct|union|enum)\b").unwrap());

static CONTROL_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:if|for|while|else|switch|catch)\b").unwrap());

/// Scan `text` for placeholder-like patterns. Deterministic for a given input.
pub fn scan_placeholders(text: &str) -> Vec<PlaceholderMatch> {
    let mut matches = Vec::new();
    if text.is_empty() {
        return matches;
    }

    for (idx, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        for (re, tag) in RULES.iter() {
            for m in re.find_iter(line) {
                matches.push(PlaceholderMatch {
                    line: idx + 1,
                    tag: (*tag).to_string(),
                    text: m.as_str().chars().take(MAX_MATCH_TEXT).collect(),
                    col: line[..m.start()].chars().count(),
                });
            }
        }
    }

    for m in EMPTY_BRACES.find_iter(text) {
        let before = &text[..m.start()];
        if !looks_like_empty_function(before) {
            continue;
        }
        let line = before.matches('\n').count() + 1;
        let already = matches
            .iter()
            .any(|x| x.line == line && x.tag == tag::EMPTY_BODY);
        if already {
            continue;
        }
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        matches.push(PlaceholderMatch {
            line,
            tag: tag::EMPTY_BODY.to_string(),
            text: "{}".to_string(),
            col: before[line_start..].chars().count(),
        });
    }

    matches
}

/// `before` is everything preceding a `{}`. The braces count as a stubbed
/// function body when the header right before them closes a parameter list
/// and is not an aggregate declaration or a control-flow statement.
fn looks_like_empty_function(before: &str) -> bool {
    if !before.trim_end().ends_with(')') {
        return false;
    }
    let window_start = before
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map_or(0, |(i, _)| i);
    let window = &before[window_start..];
    let header = statement_header(window);
    if AGGREGATE_HEADER.is_match(header) || header.trim_end().ends_with(':') {
        return false;
    }
    !CONTROL_HEADER.is_match(header)
}

/// Text after the last `;`, `{` or `}` that sits outside parentheses, so
/// `for (;;)` keeps its keyword.
fn statement_header(window: &str) -> &str {
    let mut depth = 0i32;
    for (i, c) in window.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => depth -= 1,
            ';' | '{' | '}' if depth <= 0 => return &window[i + c.len_utf8()..],
            _ => {}
        }
    }
    window
}

/// Tag → count, in order of first appearance.
pub fn tag_histogram(matches: &[PlaceholderMatch]) -> Vec<(String, usize)> {
    let mut hist: Vec<(String, usize)> = Vec::new();
    for m in matches {
        match hist.iter_mut().find(|(t, _)| *t == m.tag) {
            Some((_, count)) => *count += 1,
            None => hist.push((m.tag.clone(), 1)),
        }
    }
    hist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<String> {
        scan_placeholders(text).into_iter().map(|m| m.tag).collect()
    }

    #[test]
    fn todo_comment_is_marker() {
        let m = scan_placeholders("// TODO: fix this later");
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].tag, tag::PLACEHOLDER_MARKER);
        assert_eq!(m[0].line, 1);
        assert_eq!(m[0].col, 3);
        assert_eq!(m[0].text, "TODO");
    }

    #[test]
    fn mock_wording_is_simulated() {
        assert!(tags("// mock response for now").contains(&tag::SIMULATED_MOCK.to_string()));
    }

    #[test]
    fn empty_enum_is_not_empty_body() {
        assert!(!tags("enum Color {}").contains(&tag::EMPTY_BODY.to_string()));
        assert!(!tags("struct Unit {};").contains(&tag::EMPTY_BODY.to_string()));
    }

    #[test]
    fn empty_function_body_is_flagged() {
        let m = scan_placeholders("int main() {\n  return 0;\n}\nvoid init(int a) {}\n");
        let bodies: Vec<_> = m.iter().filter(|x| x.tag == tag::EMPTY_BODY).collect();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].line, 4);
        assert_eq!(bodies[0].col, 17);
    }

    #[test]
    fn multiline_empty_body_reports_opening_line() {
        let m = scan_placeholders("void f(void)\n{\n}\n");
        let body = m.iter().find(|x| x.tag == tag::EMPTY_BODY).unwrap();
        assert_eq!(body.line, 2);
    }

    #[test]
    fn empty_control_blocks_are_ignored() {
        assert!(tags("if (ready) {}").is_empty());
        assert!(tags("while (poll()) {}").is_empty());
        assert!(tags("for (;;) {}").is_empty());
        assert!(tags("if (a) { go(); } else {}").is_empty());
    }

    #[test]
    fn inline_todo_brace_is_tagged_once_per_line() {
        let m = scan_placeholders("void run() {} // todo");
        let bodies = m.iter().filter(|x| x.tag == tag::EMPTY_BODY).count();
        assert_eq!(bodies, 1);
        assert!(m.iter().any(|x| x.tag == tag::PLACEHOLDER_MARKER));
    }

    #[test]
    fn catalogue_covers_each_family() {
        let cases = [
            ("stub out the parser", tag::STUB),
            ("this is not yet implemented", tag::UNIMPLEMENTED),
            ("for now we'll just return", tag::TEMPORARY_WORKAROUND),
            ("in a real system we would retry", tag::UNREAL_EXAMPLE),
            ("demo only", tag::DEMO),
            ("dummy value", tag::SIMULATED_MOCK),
            ("see pseudo-code below", tag::PSEUDOCODE),
            ("    // ...", tag::ELLIPSIS_PLACEHOLDER),
            ("key = REPLACE_ME", tag::MAGIC_PLACEHOLDER),
            ("assume the cache exists", tag::ASSUME_EXISTS),
            ("return null; // placeholder", tag::FAKE_RETURN),
            ("console.log(x); // instead of saving", tag::CONSOLE_INSTEAD_OF_LOGIC),
            ("printf(\"x\"); // debug", tag::PRINT_INSTEAD_OF_LOGIC),
        ];
        for (line, expected) in cases {
            assert!(
                tags(line).iter().any(|t| t == expected),
                "{line:?} should yield {expected}"
            );
        }
    }

    #[test]
    fn multiple_matches_per_line_are_collected() {
        let m = scan_placeholders("// TODO fake data, FIXME");
        assert_eq!(
            m.iter().filter(|x| x.tag == tag::PLACEHOLDER_MARKER).count(),
            2
        );
        assert_eq!(m.iter().filter(|x| x.tag == tag::SIMULATED_MOCK).count(), 1);
    }

    #[test]
    fn clean_code_has_no_matches() {
        let code = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n";
        assert!(scan_placeholders(code).is_empty());
        assert!(scan_placeholders("").is_empty());
    }

    #[test]
    fn crlf_lines_are_numbered_like_lf() {
        let m = scan_placeholders("ok\r\n// HACK\r\n");
        assert_eq!(m[0].line, 2);
        assert_eq!(m[0].text, "HACK");
    }

    #[test]
    fn match_text_is_capped() {
        let long = format!("assume {} exists", "x ".repeat(60));
        let m = scan_placeholders(&long);
        assert_eq!(m[0].text.chars().count(), 60);
    }

    #[test]
    fn histogram_keeps_first_appearance_order() {
        let m = scan_placeholders("// mock\n// TODO\n// fake\n");
        assert_eq!(
            tag_histogram(&m),
            vec![
                (tag::SIMULATED_MOCK.to_string(), 2),
                (tag::PLACEHOLDER_MARKER.to_string(), 1)
            ]
        );
    }
}
