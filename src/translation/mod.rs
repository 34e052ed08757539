use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_escape_string_start, is_line_comment_start,
    matches_tag, try_start_dollar_quote,
};
use scanner::State;

/// The positional placeholder character recognized in statement templates.
pub const PLACEHOLDER: char = '?';

/// Byte offsets of every placeholder in `sql`, left to right.
///
/// Placeholders inside single-quoted literals, quoted identifiers, comments, and
/// dollar-quoted blocks are not placeholders and are skipped. Backslash escapes
/// are honored only in `E'...'` literals; plain literals are read as the server
/// reads them with `standard_conforming_strings` on.
#[must_use]
pub fn placeholder_positions(sql: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                _ if is_escape_string_start(bytes, idx) => {
                    state = State::EscapeQuoted;
                    idx += 1;
                }
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b'?' => positions.push(idx),
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::EscapeQuoted => match b {
                b'\\' => idx += 1,
                b'\'' if bytes.get(idx + 1) == Some(&b'\'') => idx += 1,
                b'\'' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    idx += 1;
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let tag_len = tag.len();
                    state = State::Normal;
                    idx += tag_len + 1;
                }
            }
        }

        idx += 1;
    }

    positions
}

/// Number of placeholders in `sql`.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    placeholder_positions(sql).len()
}

/// Replace each placeholder, left to right, with the matching already-escaped token.
///
/// This is a textual rewrite: the result contains literal values and no parameter
/// markers. Tokens are spliced in without being rescanned, so a `?` inside a
/// token is never taken for a placeholder. Callers must supply exactly as many
/// tokens as there are placeholders; on a mismatch, surplus placeholders are
/// left in place and surplus tokens are ignored.
///
/// Returns a borrowed `Cow` when there is nothing to replace.
#[must_use]
pub fn substitute_placeholders<'a, T: AsRef<str>>(sql: &'a str, tokens: &[T]) -> Cow<'a, str> {
    let positions = placeholder_positions(sql);
    if positions.len() != tokens.len() {
        tracing::warn!(
            placeholders = positions.len(),
            params = tokens.len(),
            "placeholder count does not match parameter count"
        );
    }
    if positions.is_empty() || tokens.is_empty() {
        return Cow::Borrowed(sql);
    }

    let extra: usize = tokens.iter().map(|t| t.as_ref().len()).sum();
    let mut out = String::with_capacity(sql.len() + extra);
    let mut last = 0;
    for (pos, token) in positions.iter().zip(tokens) {
        out.push_str(&sql[last..*pos]);
        out.push_str(token.as_ref());
        last = pos + PLACEHOLDER.len_utf8();
    }
    out.push_str(&sql[last..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_left_to_right() {
        let sql = "select * from t where a = ? and b = ?";
        let res = substitute_placeholders(sql, &["1", "'x'"]);
        assert_eq!(res, "select * from t where a = 1 and b = 'x'");
    }

    #[test]
    fn tokens_are_not_rescanned() {
        let sql = "insert into t values(?, ?)";
        let res = substitute_placeholders(sql, &["'what?'", "'?'"]);
        assert_eq!(res, "insert into t values('what?', '?')");
        assert_eq!(count_placeholders(&res), 0);
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"col?\", ? -- ?\n/* ? /* ? */ ? */ from t where a = ?";
        assert_eq!(count_placeholders(sql), 2);
        let res = substitute_placeholders(sql, &["1", "2"]);
        assert_eq!(
            res,
            "select '?', \"col?\", 1 -- ?\n/* ? /* ? */ ? */ from t where a = 2"
        );
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ select ? from t $foo$ where a = ?";
        let res = substitute_placeholders(sql, &["7"]);
        assert_eq!(res, "$foo$ select ? from t $foo$ where a = 7");
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let sql = "select 'it''s ?' where x = ?";
        assert_eq!(placeholder_positions(sql), vec![sql.len() - 1]);
    }

    #[test]
    fn escape_strings_honor_backslashes() {
        assert_eq!(count_placeholders(r"SELECT E'\'', ?"), 1);
        assert_eq!(count_placeholders(r"SELECT e'a\\', ? FROM t WHERE x = E'?'"), 1);
        let res = substitute_placeholders(r"SELECT E'it\'s ?', ?", &["1"]);
        assert_eq!(res, r"SELECT E'it\'s ?', 1");
    }

    #[test]
    fn trailing_e_of_an_identifier_is_not_an_escape_prefix() {
        // date'...' is a typed literal, not an escape string
        assert_eq!(count_placeholders(r"SELECT * FROM t WHERE d = date'\' OR x = ?"), 1);
        assert_eq!(count_placeholders(r"SELECT name, ? FROM t WHERE code = e'x' OR note = ?"), 2);
    }

    #[test]
    fn handles_multibyte_text() {
        let sql = "select 'ünïcödé', ? as “x”";
        let res = substitute_placeholders(sql, &["'ok'"]);
        assert_eq!(res, "select 'ünïcödé', 'ok' as “x”");
    }

    #[test]
    fn no_placeholders_borrows() {
        let sql = "select 1";
        let res = substitute_placeholders::<&str>(sql, &[]);
        assert!(matches!(res, Cow::Borrowed(_)));
    }

    #[test]
    fn mismatch_is_not_a_fault() {
        let res = substitute_placeholders("? ? ?", &["1"]);
        assert_eq!(res, "1 ? ?");
        let res = substitute_placeholders("?", &["1", "2"]);
        assert_eq!(res, "1");
    }
}
