use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::importer::{FileImporter, RuleImporter};
use crate::builders::validator::{RuleValidator, StandardValidator};

/// Name of the host's per-vault configuration directory.
pub const VAULT_CONFIG_DIR: &str = ".obsidian";
/// Id under which the plugin's data lives in `.obsidian/plugins/`.
pub const PLUGIN_ID: &str = "obsidian-hide-folders";

/// The plugin's persisted settings record.
///
/// Field names follow the host's `data.json` convention. Missing fields fall
/// back to the defaults, so an old or partial file is merged over them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub are_folders_hidden: bool,
    pub match_case_insensitive: bool,
    #[serde(rename = "addHiddenFoldersToObsidianIgnoreList")]
    pub add_to_ignore_list: bool,
    /// The configured rules, in the order the user entered them.
    #[serde(rename = "attachmentFolderNames")]
    pub rules: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            are_folders_hidden: true,
            match_case_insensitive: true,
            add_to_ignore_list: false,
            rules: vec!["attachments".to_string()],
        }
    }
}

impl Settings {
    /// The rule list as the settings text area shows it, one rule per line.
    pub fn rules_text(&self) -> String {
        self.rules.join("\n")
    }
}

pub trait ConfigProvider {
    fn load_settings(&self) -> Result<Settings>;
    fn save_settings(&self, settings: &Settings) -> Result<()>;
    fn get_config_path(&self) -> Result<PathBuf>;
}

/// Locates a vault and reads/writes the plugin's `data.json` inside it.
pub struct ConfigManager {
    config_path: PathBuf,
    vault_root: PathBuf,
}

impl ConfigManager {
    /// Uses the vault containing the current directory.
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let vault_root = find_vault_root(&current_dir)?;
        Self::new_at(vault_root)
    }

    /// Uses `vault_root` as-is, without looking for `.obsidian` first.
    pub fn new_at(vault_root: PathBuf) -> Result<Self> {
        let config_path = vault_root
            .join(VAULT_CONFIG_DIR)
            .join("plugins")
            .join(PLUGIN_ID)
            .join("data.json");

        Ok(Self {
            config_path,
            vault_root,
        })
    }

    /// Writes the default settings unless a settings file already exists.
    pub fn initialize(&self) -> Result<()> {
        if self.config_path.exists() {
            return Ok(());
        }

        self.save_settings(&Settings::default())
    }

    pub fn validate_config(&self) -> Result<()> {
        let settings = self.load_settings()?;
        let validator = StandardValidator::new();
        let issues = validator.validate_settings(&settings)?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    /// Reads rules from a file and returns them, in file order.
    pub fn import_rules(&self, file_path: &str, import_type: &str) -> Result<Vec<String>> {
        let importer = FileImporter::new();
        importer.import_from_file(file_path, import_type)
    }

    pub fn export_settings(&self, file_path: &str, format: &str) -> Result<()> {
        let settings = self.load_settings()?;

        let content = match format {
            "yaml" => serde_yaml::to_string(&settings).context("Failed to serialize to YAML")?,
            "toml" => toml::to_string_pretty(&settings).context("Failed to serialize to TOML")?,
            _ => serde_json::to_string_pretty(&settings).context("Failed to serialize to JSON")?,
        };

        fs::write(file_path, content).context("Failed to write export file")?;

        Ok(())
    }

    pub fn get_vault_root(&self) -> &Path {
        &self.vault_root
    }
}

impl ConfigProvider for ConfigManager {
    fn load_settings(&self) -> Result<Settings> {
        if !self.config_path.exists() {
            return Ok(Settings::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read settings file")?;

        if content.trim().is_empty() {
            return Ok(Settings::default());
        }

        serde_json::from_str(&content).context("Failed to parse settings file")
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create plugin data directory")?;
        }

        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        fs::write(&self.config_path, content).context("Failed to write settings file")?;
        tracing::debug!(path = %self.config_path.display(), "settings saved");

        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        Ok(self.config_path.clone())
    }
}

/// Keeps settings in memory; every save is recorded. Used by tests and by
/// hosts that persist settings themselves.
#[derive(Debug, Default)]
pub struct MemoryConfig {
    stored: RefCell<Option<Settings>>,
    saves: Cell<usize>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            stored: RefCell::new(Some(settings)),
            saves: Cell::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    pub fn stored(&self) -> Option<Settings> {
        self.stored.borrow().clone()
    }
}

impl ConfigProvider for MemoryConfig {
    fn load_settings(&self) -> Result<Settings> {
        Ok(self.stored.borrow().clone().unwrap_or_default())
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        *self.stored.borrow_mut() = Some(settings.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        anyhow::bail!("In-memory settings have no path")
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProvider for std::rc::Rc<T> {
    fn load_settings(&self) -> Result<Settings> {
        (**self).load_settings()
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        (**self).save_settings(settings)
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        (**self).get_config_path()
    }
}

/// Walks up from `start` to the first directory containing `.obsidian`.
pub fn find_vault_root(start: &Path) -> Result<PathBuf> {
    let mut dir = start;

    loop {
        if dir.join(VAULT_CONFIG_DIR).is_dir() {
            return Ok(dir.to_path_buf());
        }

        match dir.parent() {
            Some(parent) => dir = parent,
            None => anyhow::bail!("Not inside a vault (no {VAULT_CONFIG_DIR} directory found)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_is_merged_over_defaults() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
        let path = manager.get_config_path().unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"areFoldersHidden": false}"#).unwrap();

        let settings = manager.load_settings().unwrap();
        assert!(!settings.are_folders_hidden);
        assert!(settings.match_case_insensitive);
        assert_eq!(settings.rules, vec!["attachments".to_string()]);
    }

    #[test]
    fn test_saved_file_uses_host_field_names() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
        manager.initialize().unwrap();

        let raw = fs::read_to_string(manager.get_config_path().unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in [
            "areFoldersHidden",
            "matchCaseInsensitive",
            "addHiddenFoldersToObsidianIgnoreList",
            "attachmentFolderNames",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_find_vault_root_walks_up() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(VAULT_CONFIG_DIR)).unwrap();
        let nested = dir.path().join("Notes").join("deep");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_vault_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn test_export_formats() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new_at(dir.path().to_path_buf()).unwrap();
        manager.initialize().unwrap();

        let yaml = dir.path().join("settings.yaml");
        manager
            .export_settings(yaml.to_str().unwrap(), "yaml")
            .unwrap();
        let exported: Settings =
            serde_yaml::from_str(&fs::read_to_string(&yaml).unwrap()).unwrap();
        assert_eq!(exported, Settings::default());

        let toml_path = dir.path().join("settings.toml");
        manager
            .export_settings(toml_path.to_str().unwrap(), "toml")
            .unwrap();
        let exported: Settings = toml::from_str(&fs::read_to_string(&toml_path).unwrap()).unwrap();
        assert_eq!(exported, Settings::default());
    }
}
