//! Shell Writer
//!
//! Line buffer with two-space block indentation. Raw lines bypass the
//! indentation so embedded shell is emitted exactly as written.

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct ShellWriter {
    lines: Vec<String>,
    indent: usize,
}

impl ShellWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line (or several, split on `\n`) at the current indent.
    pub fn line(&mut self, text: &str) {
        for part in text.split('\n') {
            if part.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{}{}", INDENT.repeat(self.indent), part));
            }
        }
    }

    /// Write text verbatim, without indentation.
    pub fn raw(&mut self, text: &str) {
        for part in text.split('\n') {
            self.lines.push(part.to_string());
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}
