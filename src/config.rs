//! Configuration file support.
//!
//! Settings come from a TOML file, `typeshell.toml` in the working directory
//! unless another path is given:
//!
//! ```toml
//! [compile]
//! shebang = "#!/usr/bin/env bash"
//! exit_on_error = true
//! header_comment = true
//!
//! [parse]
//! strict = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::compiler::CompileOptions;
use crate::Error;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "typeshell.toml";

/// Parser settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// Reject lines that only the raw-shell heuristic would accept
    pub strict: bool,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub compile: CompileOptions,
    pub parse: ParseConfig,
}

impl Config {
    /// Parse configuration text.
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// An explicit path must exist; otherwise the default file in `dir` is
    /// used when present, and built-in defaults when not.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, Error> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }
        let default_path: PathBuf = dir.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::load_file(&default_path);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_compile_table() {
        let config = Config::from_toml("[compile]\nexit_on_error = true\n\n[parse]\nstrict = true\n").unwrap();
        assert!(config.compile.exit_on_error);
        assert_eq!(config.compile.shebang, "#!/bin/bash");
        assert!(config.parse.strict);
    }

    #[test]
    fn test_unknown_table_rejected() {
        assert!(matches!(Config::from_toml("[output]\ncolor = true\n"), Err(Error::Config(_))));
    }

    #[test]
    fn test_discover_default_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[compile]\nheader_comment = true\n").unwrap();
        assert!(Config::discover(None, dir.path()).unwrap().compile.header_comment);
    }

    #[test]
    fn test_explicit_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(Config::discover(Some(&missing), dir.path()), Err(Error::Io(_))));
    }
}
