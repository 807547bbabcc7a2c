//! Comment Stripper
//!
//! Removes `//`, `/* */` and `#` comments while respecting string literals.
//! Every newline survives, including those inside a block comment, so line
//! numbers stay aligned with the source.

/// Strip comments from source text.
pub fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut result = String::with_capacity(source.len());
    let mut quote: Option<char> = None;
    let mut backslashes = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            result.push(c);
            if c == '\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            // An even run of backslashes leaves the quote unescaped
            if c == q && backslashes % 2 == 0 {
                quote = None;
            } else if c == '\n' && q != '`' {
                // '...' and "..." never span lines
                quote = None;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                quote = Some(c);
                backslashes = 0;
                result.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') && !follows_scheme(&chars, i) => {
                i = skip_to_newline(&chars, i);
            }
            '/' if opens_block(&chars, i) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        result.push('\n');
                    }
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            '#' if starts_word(&chars, i) => {
                i = skip_to_newline(&chars, i);
            }
            _ => {
                result.push(c);
                i += 1;
            }
        }
    }

    result
}

/// `http://` and friends are not comments.
fn follows_scheme(chars: &[char], i: usize) -> bool {
    i > 0 && chars[i - 1] == ':'
}

/// `/*` opens a comment only as a word of its own that is closed later.
/// Shell globs such as `/tmp/cache/*` stay untouched.
fn opens_block(chars: &[char], i: usize) -> bool {
    if chars.get(i + 1) != Some(&'*') {
        return false;
    }
    let boundary = i == 0 || chars[i - 1].is_whitespace() || matches!(chars[i - 1], ';' | '{' | '}' | '(' | ')' | ',');
    let spaced = chars.get(i + 2).map_or(true, |c| c.is_whitespace() || *c == '*');
    boundary && spaced && chars[i + 2..].windows(2).any(|w| w == ['*', '/'])
}

/// `#` only opens a comment at the start of a word, so `$#` and `${#a[@]}`
/// survive.
fn starts_word(chars: &[char], i: usize) -> bool {
    i == 0 || chars[i - 1].is_whitespace()
}

fn skip_to_newline(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\n' {
        i += 1;
    }
    i
}
