//! Versioned-parameter configuration.
//!
//! Resolves overridable parameters (operator release, payload release) from
//! an optional `config.yaml` in the infrastructure directory. The format is
//! deliberately a flat `key: value` line format rather than full YAML: a
//! malformed file degrades to defaults with a warning instead of failing
//! the pipeline.
//!
//! The loader returns only what it found; defaults are applied at the call
//! site from [`crate::constants`], never inside the loader.

use crate::constants::CONFIG_FILE_NAME;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Flat string-to-string configuration mapping.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    /// Loads `<dir>/config.yaml`. A missing or unreadable file yields an
    /// empty mapping, not an error.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                warn!(path = %path.display(), "config.yaml not found, using defaults");
                return Self::default();
            }
        };
        Self::parse(&content)
    }

    /// Parses `key: value` lines, ignoring blank and comment lines and
    /// stripping one layer of surrounding quotes from values. Lines
    /// without a colon are skipped.
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let value = value
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            values.insert(key.trim().to_string(), value);
        }

        Self { values }
    }

    /// Value for a key, if the file provided one.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Value for a key, or the caller's default. This is the call-site
    /// fallback point: absence of the file or of a key never fails.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Number of keys found in the file.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the file was absent or contained no parseable lines.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keys_among_unknown() {
        let cfg = Config::parse(
            "# build parameters\n\
             unrelated_key: something\n\
             coco_operator_version: \"v0.12.0\"\n\
             \n\
             coco_payload_version: 'v0.11.0'\n",
        );
        assert_eq!(cfg.get("coco_operator_version"), Some("v0.12.0"));
        assert_eq!(cfg.get("coco_payload_version"), Some("v0.11.0"));
        assert_eq!(cfg.get("unrelated_key"), Some("something"));
    }

    #[test]
    fn skips_comment_and_malformed_lines() {
        let cfg = Config::parse("# comment: not a key\nno colon here\nkey: value\n");
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.get("key"), Some("value"));
    }

    #[test]
    fn get_or_falls_back() {
        let cfg = Config::default();
        assert!(cfg.is_empty());
        assert_eq!(cfg.get_or("missing", "v0.12.0"), "v0.12.0");
    }
}
