use std::sync::LazyLock;

use regex::Regex;

/// String literals and comments, removed before counting.
static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"[^"\n]*"|'[^'\n]*'|//[^\n]*|/\*.*?\*/"#).unwrap());

/// `true` when `()`, `{}` and `[]` each balance and no running count ever
/// goes negative. Literals and comments are ignored.
pub fn bracket_balance(text: &str) -> bool {
    let code = NOISE.replace_all(text, "");
    let (mut paren, mut brace, mut square) = (0i64, 0i64, 0i64);
    for c in code.chars() {
        match c {
            '(' => paren += 1,
            ')' => paren -= 1,
            '{' => brace += 1,
            '}' => brace -= 1,
            '[' => square += 1,
            ']' => square -= 1,
            _ => continue,
        }
        if paren < 0 || brace < 0 || square < 0 {
            return false;
        }
    }
    paren == 0 && brace == 0 && square == 0
}
