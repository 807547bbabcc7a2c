//! Source Formatter
//!
//! A line-oriented pretty printer for typeshell sources. The input is
//! validated with the parser first, then every line is re-indented by its
//! bracket depth with two spaces per level. Keyword spacing is normalized,
//! runs of blank lines collapse to one and trailing whitespace is removed.
//! Comments are kept; the bodies of `bash { ... }` blocks are copied as they
//! are.
//!
//! Formatting is a fixed point: `format(format(x)) == format(x)`.

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::parser::comments::strip_comments;
use crate::parser::lines::bracket_balance;
use crate::parser::raw_shell::{find_block_close, is_raw_block_start};
use crate::parser::{parse, ParseError};

const INDENT: &str = "  ";

lazy_static! {
    static ref KEYWORD_PAREN: Regex = Regex::new(r"^(\}\s*)?(if|else if|for|while|switch|catch)\(").unwrap();
    static ref CLOSE_ELSE: Regex = Regex::new(r"^\}\s*(else|catch)\b").unwrap();
    static ref ELSE_BRACE: Regex = Regex::new(r"^(\} )?(else|try)\{").unwrap();
    static ref PAREN_BRACE: Regex = Regex::new(r"\)\{$").unwrap();
}

/// Format a source file. Fails with the parser's error when the source does
/// not parse.
pub fn format(source: &str) -> Result<String, ParseError> {
    parse(source)?;
    Ok(format_lines(source))
}

/// Re-indent without validating.
fn format_lines(source: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut depth: i32 = 0;
    let mut in_comment = false;
    let mut raw_depth: Option<i32> = None;

    for line in source.lines() {
        // Inside `bash { ... }`: copy until the closing brace
        if let Some(mut open) = raw_depth {
            if find_block_close(line, &mut open).is_some() {
                raw_depth = None;
                push(&mut out, depth, line.trim());
            } else {
                raw_depth = Some(open);
                out.push(line.trim_end().to_string());
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            if out.last().map_or(false, |last| !last.is_empty()) {
                out.push(String::new());
            }
            continue;
        }

        if in_comment {
            let text = if trimmed.starts_with('*') { format!(" {}", trimmed) } else { trimmed.to_string() };
            push(&mut out, depth, &text);
            if let Some(end) = trimmed.find("*/") {
                in_comment = false;
                depth = (depth + bracket_balance(&strip_comments(&trimmed[end + 2..]))).max(0);
            }
            continue;
        }

        let code = strip_comments(trimmed);
        let code = code.trim();
        let text = normalize(trimmed, code);
        let closers = code.chars().take_while(|c| matches!(c, '}' | ')' | ']')).count() as i32;
        push(&mut out, (depth - closers).max(0), &text);

        if is_raw_block_start(code) {
            let mut open = 0;
            if find_block_close(code, &mut open).is_none() {
                raw_depth = Some(open);
            }
            continue;
        }
        depth = (depth + bracket_balance(code)).max(0);
        in_comment = opens_block_comment(trimmed);
    }

    while out.last().map_or(false, |last| last.is_empty()) {
        out.pop();
    }
    if out.is_empty() {
        return String::new();
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn push(out: &mut Vec<String>, depth: i32, text: &str) {
    out.push(format!("{}{}", INDENT.repeat(depth as usize), text));
}

/// Does `line` leave a `/* ...` comment open?
fn opens_block_comment(line: &str) -> bool {
    !strip_comments(&format!("{}\n*/", line)).ends_with("*/")
}

/// Keyword spacing: `if(` -> `if (`, `}else` -> `} else`, `){` -> `) {`.
/// Only the code at the edges of the line is touched, never string text.
fn normalize(line: &str, code: &str) -> String {
    let mut text = line.to_string();
    if code.is_empty() {
        return text;
    }
    if let Some(caps) = KEYWORD_PAREN.captures(&text) {
        let keyword = caps.get(2).map_or("", |m| m.as_str());
        let close = if caps.get(1).is_some() { "} " } else { "" };
        let end = caps.get(0).map_or(0, |m| m.end());
        text = format!("{}{} ({}", close, keyword, &text[end..]);
    }
    if let Some(caps) = CLOSE_ELSE.captures(&text) {
        let keyword = caps.get(1).map_or("", |m| m.as_str());
        let end = caps.get(0).map_or(0, |m| m.end());
        text = format!("}} {}{}", keyword, &text[end..]);
    }
    if let Some(caps) = ELSE_BRACE.captures(&text) {
        let close = if caps.get(1).is_some() { "} " } else { "" };
        let keyword = caps.get(2).map_or("", |m| m.as_str());
        let end = caps.get(0).map_or(0, |m| m.end());
        text = format!("{}{} {{{}", close, keyword, &text[end..]);
    }
    // Only when no trailing comment follows the brace
    if code.len() == line.len() && PAREN_BRACE.is_match(&text) {
        text.truncate(text.len() - 2);
        text.push_str(") {");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reindent_blocks() {
        let src = "let x: number = 1;\nif (x > 0) {\nconsole.log(\"pos\");\n      }\n";
        assert_eq!(
            format(src).unwrap(),
            "let x: number = 1;\nif (x > 0) {\n  console.log(\"pos\");\n}\n"
        );
    }

    #[test]
    fn test_keyword_spacing() {
        let src = "let x: number = 1;\nif(x > 0){\nconsole.log(\"a\");\n}else{\nconsole.log(\"b\");\n}\n";
        assert_eq!(
            format(src).unwrap(),
            "let x: number = 1;\nif (x > 0) {\n  console.log(\"a\");\n} else {\n  console.log(\"b\");\n}\n"
        );
    }

    #[test]
    fn test_blank_lines_collapse() {
        let src = "\n\nlet a: number = 1;   \n\n\n\nlet b: number = 2;\n\n";
        assert_eq!(format(src).unwrap(), "let a: number = 1;\n\nlet b: number = 2;\n");
    }

    #[test]
    fn test_comments_kept() {
        let src = "// setup\nfunction f(): void {\n/* a\n* b\n*/\nconsole.log(\"x\");\n}\n";
        assert_eq!(
            format(src).unwrap(),
            "// setup\nfunction f(): void {\n  /* a\n   * b\n   */\n  console.log(\"x\");\n}\n"
        );
    }

    #[test]
    fn test_braces_in_strings_ignored() {
        let src = "let s: string = \"{\";\nconsole.log(s);\n";
        assert_eq!(format(src).unwrap(), src);
    }

    #[test]
    fn test_raw_block_copied() {
        let src = "if (true) {\nbash {\n    ls -la |\n  wc -l\n}\n}\n";
        assert_eq!(format(src).unwrap(), "if (true) {\n  bash {\n    ls -la |\n  wc -l\n  }\n}\n");
    }

    #[test]
    fn test_fixed_point() {
        let src = "let xs: string[] = [\n\"a\",\n\"b\"\n];\nfor (let x of xs) {\nif(x == \"a\"){\ncontinue;\n}\nconsole.log(x);\n}\n";
        let once = format(src).unwrap();
        assert_eq!(format(&once).unwrap(), once);
        assert!(once.contains("[\n  \"a\",\n  \"b\"\n];"));
    }

    #[test]
    fn test_invalid_source_rejected() {
        assert!(format("const x = 1;\nx = 2;").is_err());
    }
}
