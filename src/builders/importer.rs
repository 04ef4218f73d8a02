use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::core::config::Settings;

/// A trait that defines the behavior for importing rule lists from a source.
pub trait RuleImporter {
    /// Imports rules from a file.
    ///
    /// # Arguments
    /// * `file_path`: The path to the file to be imported.
    /// * `import_type`: The format to parse ("text", "json", "yaml" or "toml").
    ///
    /// # Returns
    /// The imported rules, in file order, ready to be appended to the settings.
    fn import_from_file(&self, file_path: &str, import_type: &str) -> Result<Vec<String>>;
}

/// Structured documents either hold a bare list of rules or a whole settings
/// record as written by `export`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    Rules(Vec<String>),
    Settings(Settings),
}

impl RuleDocument {
    fn into_rules(self) -> Vec<String> {
        match self {
            RuleDocument::Rules(rules) => rules,
            RuleDocument::Settings(settings) => settings.rules,
        }
    }
}

/// Reads rule lists from files on disk.
pub struct FileImporter;

impl RuleImporter for FileImporter {
    fn import_from_file(&self, file_path: &str, import_type: &str) -> Result<Vec<String>> {
        let content = fs::read_to_string(file_path).context("Failed to read import file")?;

        let rules = match import_type {
            "json" => serde_json::from_str::<RuleDocument>(&content)
                .context("Failed to parse JSON import")?
                .into_rules(),
            "yaml" => serde_yaml::from_str::<RuleDocument>(&content)
                .context("Failed to parse YAML import")?
                .into_rules(),
            // TOML has no top-level arrays, so only a settings record fits.
            "toml" => toml::from_str::<Settings>(&content)
                .context("Failed to parse TOML import")?
                .rules,
            _ => self.parse_text(&content),
        };

        Ok(rules)
    }
}

impl FileImporter {
    /// Constructs a new `FileImporter` instance.
    pub fn new() -> Self {
        Self
    }

    /// Parses the plain-text format: one rule per line, the same as the
    /// settings text area, with blank lines and `#` comments skipped.
    fn parse_text(&self, content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    }
}

impl Default for FileImporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn import(content: &str, import_type: &str) -> Vec<String> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules");
        fs::write(&path, content).unwrap();
        FileImporter::new()
            .import_from_file(path.to_str().unwrap(), import_type)
            .unwrap()
    }

    #[test]
    fn test_text_import_skips_comments_and_blanks() {
        let rules = import("# media\nattachments\n\n  startsWith::_ \n", "text");
        assert_eq!(rules, vec!["attachments".to_string(), "startsWith::_".to_string()]);
    }

    #[test]
    fn test_json_import_accepts_list_or_settings() {
        assert_eq!(import(r#"["a", "b"]"#, "json"), vec!["a", "b"]);
        assert_eq!(
            import(r#"{"attachmentFolderNames": ["c"], "areFoldersHidden": false}"#, "json"),
            vec!["c"]
        );
    }

    #[test]
    fn test_yaml_and_toml_import() {
        assert_eq!(import("- a\n- endsWith::_b\n", "yaml"), vec!["a", "endsWith::_b"]);
        assert_eq!(
            import("attachmentFolderNames = [\"x\", \"y\"]\n", "toml"),
            vec!["x", "y"]
        );
    }
}
