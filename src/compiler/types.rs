//! Compiler Types
//!
//! Error type, options and the lowered forms builtins reduce to.

use serde::Deserialize;
use thiserror::Error;

/// An AST shape the generator cannot express. Indicates a mismatch between
/// what the parser accepts and what the generator supports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl CompileError {
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}

/// Options for one compilation. Loadable from the `[compile]` table of a
/// config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// First line of the generated script
    pub shebang: String,
    /// Emit `set -e` right after the shebang
    pub exit_on_error: bool,
    /// Emit a "generated by" comment after the shebang
    pub header_comment: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            shebang: "#!/bin/bash".to_string(),
            exit_on_error: false,
            header_comment: false,
        }
    }
}

/// What a builtin call reduces to. The surrounding context decides how the
/// form is rendered (value, condition or statement).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lowered {
    /// A ready shell word, e.g. `"${name^^}"` or `$$`
    Word(String),
    /// A command whose stdout is the value
    Output(String),
    /// A command whose exit status is the boolean value
    Status(String),
    /// A variable holding `true` / `false`
    Flag(String),
    /// Statement lines run only for their side effects
    Effect(Vec<String>),
    /// An array item list, e.g. `"${items[@]}"`
    Array(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CompileOptions::default();
        assert_eq!(options.shebang, "#!/bin/bash");
        assert!(!options.exit_on_error);
    }

    #[test]
    fn test_options_from_toml() {
        let options: CompileOptions = toml::from_str("exit_on_error = true").unwrap();
        assert!(options.exit_on_error);
        assert_eq!(options.shebang, "#!/bin/bash");
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(toml::from_str::<CompileOptions>("colour = true").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = CompileError::unsupported("lambda outside of array.forEach");
        assert_eq!(err.to_string(), "Unsupported: lambda outside of array.forEach");
    }
}
