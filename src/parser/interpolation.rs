//! String Literal Normalization and Interpolation
//!
//! String literals of every quote style are stored as the text that appears
//! between double quotes in the generated shell. `${...}` spans are split
//! out and parsed as expressions by the caller.

use crate::ast::types::{InterpolationPart, StringInterpolation};
use crate::ast::types::Expression;
use crate::parser::types::ParseError;

/// Convert the raw contents of a source string literal into shell
/// double-quote text.
///
/// - `"..."` is kept as written
/// - `'...'` unescapes `\'` and escapes bare `"` and backticks
/// - `` `...` `` escapes bare `"`
pub fn normalize_string(raw: &str, quote: char) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') if quote == '\'' => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' if quote != '"' => out.push_str("\\\""),
            '`' if quote == '\'' => out.push_str("\\`"),
            _ => out.push(c),
        }
    }

    out
}

/// True if the raw text holds at least one unescaped `${`.
pub fn has_interpolation(raw: &str) -> bool {
    find_open(raw, 0).is_some()
}

/// Split raw string contents into text and expression parts.
///
/// `parse_expr` receives the source text between `${` and the matching `}`.
/// Text parts are normalized for `quote`. An unmatched `${` is kept as text.
pub fn parse_interpolation<F>(raw: &str, quote: char, mut parse_expr: F) -> Result<StringInterpolation, ParseError>
where
    F: FnMut(&str) -> Result<Expression, ParseError>,
{
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(open) = find_open(raw, pos) {
        let Some(close) = find_close(raw, open + 2) else {
            break;
        };
        text.push_str(&raw[pos..open]);
        if !text.is_empty() {
            parts.push(InterpolationPart::Text(normalize_string(&text, quote)));
            text.clear();
        }

        let inner = raw[open + 2..close].trim();
        if inner.is_empty() {
            return Err(ParseError::syntax("Empty interpolation '${}'"));
        }
        parts.push(InterpolationPart::Expression(parse_expr(inner)?));
        pos = close + 1;
    }

    text.push_str(&raw[pos..]);
    if !text.is_empty() {
        parts.push(InterpolationPart::Text(normalize_string(&text, quote)));
    }

    Ok(StringInterpolation { parts })
}

/// Byte offset of the next `${` at or after `from` that is not escaped.
fn find_open(raw: &str, from: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    let mut i = from;
    while i + 1 < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes[i + 1] == b'{' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Byte offset of the `}` closing an interpolation whose body starts at
/// `from`. Nested braces and quoted strings are skipped.
fn find_close(raw: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in raw[from..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(from + offset),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{ValueType, AST};

    fn as_variable(text: &str) -> Result<Expression, ParseError> {
        Ok(AST::variable(text, ValueType::Unknown))
    }

    #[test]
    fn test_normalize_single_quoted() {
        assert_eq!(normalize_string(r#"it\'s "x""#, '\''), r#"it's \"x\""#);
    }

    #[test]
    fn test_normalize_double_quoted_is_verbatim() {
        assert_eq!(normalize_string(r#"say \"hi\""#, '"'), r#"say \"hi\""#);
    }

    #[test]
    fn test_normalize_template_escapes_quotes() {
        assert_eq!(normalize_string(r#"a "b""#, '`'), r#"a \"b\""#);
    }

    #[test]
    fn test_split_parts() {
        let interp = parse_interpolation("Hello, ${name}!", '`', as_variable).unwrap();
        assert_eq!(
            interp.parts,
            vec![
                InterpolationPart::Text("Hello, ".to_string()),
                InterpolationPart::Expression(AST::variable("name", ValueType::Unknown)),
                InterpolationPart::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn test_nested_braces_and_quotes() {
        let mut seen = Vec::new();
        parse_interpolation(r#"${a ? "}" : "{"} and ${f({x})}"#, '`', |t| {
            seen.push(t.to_string());
            as_variable(t)
        })
        .unwrap();
        assert_eq!(seen, vec![r#"a ? "}" : "{""#, "f({x})"]);
    }

    #[test]
    fn test_unmatched_open_is_text() {
        let interp = parse_interpolation("cost ${5", '`', as_variable).unwrap();
        assert_eq!(interp.parts, vec![InterpolationPart::Text("cost ${5".to_string())]);
    }

    #[test]
    fn test_escaped_open_is_not_interpolation() {
        assert!(!has_interpolation(r"\${HOME}"));
        assert!(has_interpolation("${HOME}"));
    }
}
