//! Raw Shell Detection
//!
//! Native shell can be embedded two ways:
//! - an explicit `bash { ... }` block, kept verbatim
//! - any line that "looks like shell", recognized by the heuristic below
//!
//! The heuristic runs late in statement dispatch, after every construct of
//! the source language had its chance.

use regex_lite::Regex;

use crate::parser::lines::char_states;

lazy_static::lazy_static! {
    static ref RAW_BLOCK: Regex = Regex::new(r"^bash\s*\{").unwrap();
    static ref ENV_ASSIGNMENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*=\S").unwrap();
    static ref SHELL_FUNCTION: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*\s*\(\s*\)\s*(\{.*)?$").unwrap();
}

/// Line prefixes that only occur in shell
const SHELL_PREFIXES: &[&str] = &[
    "if [", "while [", "until [", "case ", "[[", "[ ", "((", "./", "/", "~/", "$", "source ", ". ",
];

/// Shell keywords that stand alone on a line
const SHELL_KEYWORDS: &[&str] = &["fi", "done", "esac", "else", "then", "do", ";;", "fi;", "done;", "esac;"];

/// Common commands recognized as the first word of a line
const SHELL_COMMANDS: &[&str] = &[
    "echo", "printf", "cd", "ls", "pwd", "mkdir", "rmdir", "rm", "cp", "mv", "touch", "cat", "grep",
    "sed", "awk", "cut", "sort", "uniq", "head", "tail", "wc", "find", "xargs", "chmod", "chown",
    "ln", "tar", "zip", "unzip", "gzip", "curl", "wget", "ssh", "scp", "rsync", "git", "docker",
    "kubectl", "npm", "npx", "yarn", "pip", "python", "python3", "node", "make", "sudo", "apt",
    "apt-get", "yum", "dnf", "brew", "systemctl", "service", "export", "unset", "local", "declare",
    "readonly", "read", "eval", "exec", "trap", "set", "shift", "wait", "kill", "sleep", "test",
    "true", "false", "date", "whoami", "which", "command", "type", "alias", "tee", "tr", "env",
    "basename", "dirname", "realpath", "jq", "yq", "ps", "crontab", "clear", "exit",
];

/// Does this line open an explicit `bash { ... }` block?
pub fn is_raw_block_start(text: &str) -> bool {
    RAW_BLOCK.is_match(text)
}

/// Byte offset of the `}` that brings the running brace `depth` to zero, if
/// it occurs in `text`. `depth` is updated either way.
pub fn find_block_close(text: &str, depth: &mut i32) -> Option<usize> {
    for (offset, c, code) in char_states(text) {
        if !code {
            continue;
        }
        match c {
            '{' => *depth += 1,
            '}' => {
                *depth -= 1;
                if *depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Join the lines of a `bash { }` block, removing the indentation common to
/// every non-blank line taken from the source. Lines flagged `false` (text
/// that shared a line with the opening brace) keep their text and do not
/// count toward the common indent.
pub fn dedent(lines: &[(String, bool)]) -> String {
    let start = lines.iter().position(|(l, _)| !l.trim().is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|(l, _)| !l.trim().is_empty()).map_or(start, |i| i + 1);
    let lines = &lines[start..end];

    let indent = lines
        .iter()
        .filter(|(l, from_source)| *from_source && !l.trim().is_empty())
        .map(|(l, _)| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|(l, from_source)| {
            if !*from_source {
                l.as_str()
            } else if l.trim().is_empty() {
                ""
            } else {
                &l[indent..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Heuristic: is this line native shell rather than source language?
pub fn looks_like_shell(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }

    if SHELL_KEYWORDS.contains(&text) {
        return true;
    }
    if SHELL_PREFIXES.iter().any(|p| text.starts_with(p)) {
        return true;
    }
    // `for x in ...` without parentheses
    if text.starts_with("for ") && !text[4..].trim_start().starts_with('(') {
        return true;
    }

    let first_word = text.split_whitespace().next().unwrap_or("");
    if SHELL_COMMANDS.contains(&first_word) {
        return true;
    }
    if ENV_ASSIGNMENT.is_match(text) && !text.ends_with(';') {
        return true;
    }
    if SHELL_FUNCTION.is_match(text) && !text.starts_with("function ") {
        return true;
    }

    has_shell_syntax(text)
}

/// Shell-only operators outside of string literals.
fn has_shell_syntax(text: &str) -> bool {
    let code: String = char_states(text)
        .into_iter()
        .map(|(_, c, code)| if code { c } else { ' ' })
        .collect();

    if code.contains("$(") || code.contains("${") {
        return true;
    }
    if [">>", "2>", "&>", ">&", "<<", "<("].iter().any(|op| code.contains(op)) {
        return true;
    }
    // a single `|` is a pipe; `||` is logical or
    let bytes = code.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'|' {
            let prev = i > 0 && bytes[i - 1] == b'|';
            let next = bytes.get(i + 1) == Some(&b'|');
            if !prev && !next {
                return true;
            }
        }
    }
    if !text.ends_with(';') && [" && ", " || ", " > ", " < "].iter().any(|op| code.contains(op)) {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_block_start() {
        assert!(is_raw_block_start("bash {"));
        assert!(is_raw_block_start("bash{ echo hi"));
        assert!(!is_raw_block_start("bashful();"));
    }

    #[test]
    fn test_find_block_close() {
        let mut depth = 1;
        assert_eq!(find_block_close("echo \"}\"", &mut depth), None);
        assert_eq!(depth, 1);
        assert_eq!(find_block_close("f() { x; } }", &mut depth), Some(11));
    }

    #[test]
    fn test_dedent_common_indent() {
        let lines = vec![
            ("    if true; then".to_string(), true),
            ("      echo hi".to_string(), true),
            (String::new(), true),
            ("    fi".to_string(), true),
        ];
        assert_eq!(dedent(&lines), "if true; then\n  echo hi\n\nfi");
    }

    #[test]
    fn test_dedent_inline_text_kept() {
        let lines = vec![("echo a".to_string(), false), ("  echo b".to_string(), true)];
        assert_eq!(dedent(&lines), "echo a\necho b");
    }

    #[test]
    fn test_dedent_trims_blank_edges() {
        let lines = vec![(String::new(), true), ("  ls".to_string(), true), ("   ".to_string(), true)];
        assert_eq!(dedent(&lines), "ls");
    }

    #[test]
    fn test_shell_lines() {
        for line in [
            "if [ -f file ]; then",
            "fi",
            "for f in *.txt; do",
            "echo hello",
            "FOO=bar",
            "ls -la | grep x",
            "cat a >> b",
            "greet() {",
            "$HOME/bin/tool",
            "result=$(date)",
        ] {
            assert!(looks_like_shell(line), "expected shell: {}", line);
        }
    }

    #[test]
    fn test_source_lines() {
        for line in [
            "x = 1;",
            "greet(\"a | b\");",
            "let ok = a || b;",
            "while (running) {",
            "greet();",
            "i++;",
            "console.log(\"cat >> file\");",
        ] {
            assert!(!looks_like_shell(line), "expected source: {}", line);
        }
    }
}
