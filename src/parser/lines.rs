//! Line Preparation
//!
//! The statement parser is line driven. This module turns comment-free text
//! into trimmed, non-empty lines and provides the quote-aware scanning
//! helpers shared by the parser modules:
//! - bracket balance (to join multi-line statements)
//! - matching bracket lookup
//! - splitting the inline body of a single-line block into virtual lines

/// One logical source line with its 1-based line number.
///
/// `raw` is the line before trimming; `bash { }` blocks are built from it.
/// Virtual lines have `raw == text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub text: String,
    pub raw: String,
    pub number: usize,
}

impl SourceLine {
    pub fn new(text: impl Into<String>, number: usize) -> Self {
        let text = text.into();
        Self { raw: text.clone(), text, number }
    }
}

/// Split comment-free source into trimmed, non-empty lines.
pub fn prepare_lines(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(SourceLine { text: trimmed.to_string(), raw: line.trim_end().to_string(), number: i + 1 })
            }
        })
        .collect()
}

/// Characters of `text` with their byte offsets and whether each one is
/// code (outside of any string literal). Quote delimiters count as string.
pub fn char_states(text: &str) -> Vec<(usize, char, bool)> {
    let mut states = Vec::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        match quote {
            Some(q) => {
                states.push((offset, c, false));
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' || c == '`' {
                    quote = Some(c);
                    states.push((offset, c, false));
                } else {
                    states.push((offset, c, true));
                }
            }
        }
    }

    states
}

/// Net count of opening minus closing brackets outside of strings.
pub fn bracket_balance(text: &str) -> i32 {
    char_states(text)
        .into_iter()
        .filter(|(_, _, code)| *code)
        .map(|(_, c, _)| match c {
            '(' | '[' | '{' => 1,
            ')' | ']' | '}' => -1,
            _ => 0,
        })
        .sum()
}

/// Net count of `{` minus `}` outside of strings.
pub fn brace_balance(text: &str) -> i32 {
    char_states(text)
        .into_iter()
        .filter(|(_, _, code)| *code)
        .map(|(_, c, _)| match c {
            '{' => 1,
            '}' => -1,
            _ => 0,
        })
        .sum()
}

/// Byte offset of the bracket closing the one at `open`.
pub fn find_matching(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (offset, c, code) in char_states(text) {
        if offset < open || !code {
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte offset of the first code character at bracket depth zero matching
/// `pred`, starting at `from`.
pub fn find_top_level(text: &str, from: usize, pred: impl Fn(char) -> bool) -> Option<usize> {
    let mut depth = 0i32;
    for (offset, c, code) in char_states(text) {
        if !code {
            continue;
        }
        if offset >= from && depth == 0 && pred(c) {
            return Some(offset);
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split `text` at top-level occurrences of `separator`.
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    while let Some(pos) = find_top_level(text, start, |c| c == separator) {
        parts.push(text[start..pos].trim().to_string());
        start = pos + separator.len_utf8();
    }
    parts.push(text[start..].trim().to_string());
    parts
}

/// If `text` starts with `keyword` followed by a parenthesized group,
/// return the group's contents and the text after the closing paren.
pub fn keyword_parens<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let rest = text.strip_prefix(keyword)?;
    let offset = keyword.len() + (rest.len() - rest.trim_start().len());
    if !text[offset..].starts_with('(') {
        return None;
    }
    let close = find_matching(text, offset)?;
    Some((text[offset + 1..close].trim(), text[close + 1..].trim()))
}

/// Split the inline body of a single-line block into virtual lines.
///
/// `a; b; } else { c; }` becomes `a;`, `b;`, `} else {`, `c;`, `}`. A closing
/// brace stays attached to a following `else`, `catch`, `finally`, `)` or `;`.
pub fn split_inline(text: &str) -> Vec<String> {
    let chars = char_states(text);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    let flush = |current: &mut String, pieces: &mut Vec<String>| {
        let piece = current.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        current.clear();
    };

    for (i, &(offset, c, code)) in chars.iter().enumerate() {
        if !code {
            current.push(c);
            continue;
        }
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            '{' if depth > 0 => {
                depth += 1;
                current.push(c);
            }
            '}' if depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            '{' => {
                current.push(c);
                flush(&mut current, &mut pieces);
            }
            '}' => {
                flush(&mut current, &mut pieces);
                current.push('}');
                let after = text[offset + 1..].trim_start();
                let continues = ["else", "catch", "finally", ")", ";"]
                    .iter()
                    .any(|k| after.starts_with(k));
                if !continues || i + 1 == chars.len() {
                    flush(&mut current, &mut pieces);
                }
            }
            ';' if depth == 0 => {
                current.push(c);
                flush(&mut current, &mut pieces);
            }
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut pieces);
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_lines_keeps_numbers() {
        let lines = prepare_lines("a;\n\n   b;  \n");
        assert_eq!(lines.iter().map(|l| (l.text.as_str(), l.number)).collect::<Vec<_>>(), vec![("a;", 1), ("b;", 3)]);
    }

    #[test]
    fn test_prepare_lines_keeps_raw_indent() {
        let lines = prepare_lines("  if true; then\n\techo hi  \n");
        assert_eq!(lines[0].raw, "  if true; then");
        assert_eq!(lines[1].raw, "\techo hi");
        assert_eq!(lines[1].text, "echo hi");
    }

    #[test]
    fn test_bracket_balance_ignores_strings() {
        assert_eq!(bracket_balance(r#"let a = ["x(", "]"#), 1);
        assert_eq!(bracket_balance("foo(a, (b) => {"), 2);
        assert_eq!(bracket_balance("});"), -2);
    }

    #[test]
    fn test_find_matching() {
        let text = r#"if (a == ")" && (b)) {"#;
        let close = find_matching(text, 3).unwrap();
        assert_eq!(&text[close..], ") {");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level(r#"let i = 0; i < f(a; b); i++"#, ';'),
            vec!["let i = 0", "i < f(a; b)", "i++"]
        );
    }

    #[test]
    fn test_keyword_parens() {
        assert_eq!(keyword_parens("while (x < 3) {", "while"), Some(("x < 3", "{")));
        assert_eq!(keyword_parens("whilex", "while"), None);
    }

    #[test]
    fn test_split_inline_if_else() {
        assert_eq!(
            split_inline(r#" console.log("a"); } else { console.log("b"); }"#),
            vec![r#"console.log("a");"#, "} else {", r#"console.log("b");"#, "}"]
        );
    }

    #[test]
    fn test_split_inline_keeps_lambda_together() {
        assert_eq!(
            split_inline("array.forEach(xs, (x) => { console.log(x); }); }"),
            vec!["array.forEach(xs, (x) => { console.log(x); });", "}"]
        );
    }

    #[test]
    fn test_split_inline_brace_then_statement() {
        assert_eq!(split_inline("a; } b;"), vec!["a;", "}", "b;"]);
    }
}
