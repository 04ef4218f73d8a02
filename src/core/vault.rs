use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::config::VAULT_CONFIG_DIR;

/// The host setting holding its search/indexing exclusion list.
pub const USER_IGNORE_FILTERS: &str = "userIgnoreFilters";

/// Access to the host's own vault configuration.
pub trait VaultConfigStore {
    fn get_config(&self, key: &str) -> Result<Option<Value>>;
    fn set_config(&mut self, key: &str, value: Value) -> Result<()>;
    /// Tells the host that `key` changed so it re-reads it.
    fn trigger_change(&mut self, key: &str);
}

/// The vault configuration persisted in `.obsidian/app.json`.
///
/// Unknown keys are preserved; each `set_config` rewrites the whole file.
pub struct AppJsonStore {
    path: PathBuf,
}

impl AppJsonStore {
    pub fn new(vault_root: &Path) -> Self {
        Self {
            path: vault_root.join(VAULT_CONFIG_DIR).join("app.json"),
        }
    }

    fn read(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path).context("Failed to read app.json")?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).context("Failed to parse app.json")
    }
}

impl VaultConfigStore for AppJsonStore {
    fn get_config(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read()?.remove(key))
    }

    fn set_config(&mut self, key: &str, value: Value) -> Result<()> {
        let mut config = self.read()?;
        config.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create vault config directory")?;
        }
        let content = serde_json::to_string_pretty(&config).context("Failed to serialize app.json")?;
        fs::write(&self.path, content).context("Failed to write app.json")?;
        Ok(())
    }

    fn trigger_change(&mut self, key: &str) {
        tracing::debug!(key, path = %self.path.display(), "vault config changed");
    }
}

/// An in-memory vault configuration that records change notifications.
/// Used by tests and by hosts that own their configuration store.
#[derive(Debug, Default)]
pub struct MemoryVaultConfig {
    values: HashMap<String, Value>,
    changes: Vec<String>,
}

impl MemoryVaultConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys passed to `trigger_change`, oldest first.
    pub fn changes(&self) -> &[String] {
        &self.changes
    }
}

impl VaultConfigStore for MemoryVaultConfig {
    fn get_config(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set_config(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn trigger_change(&mut self, key: &str) {
        self.changes.push(key.to_string());
    }
}

/// Lets a caller keep a handle on a store it lends to the plugin.
impl<T: VaultConfigStore> VaultConfigStore for Rc<RefCell<T>> {
    fn get_config(&self, key: &str) -> Result<Option<Value>> {
        self.borrow().get_config(key)
    }

    fn set_config(&mut self, key: &str, value: Value) -> Result<()> {
        self.borrow_mut().set_config(key, value)
    }

    fn trigger_change(&mut self, key: &str) {
        self.borrow_mut().trigger_change(key)
    }
}

/// Ids of the community plugins enabled in the vault
/// (`.obsidian/community-plugins.json`). A missing file means none.
pub fn read_enabled_plugins(vault_root: &Path) -> Result<Vec<String>> {
    let path = vault_root
        .join(VAULT_CONFIG_DIR)
        .join("community-plugins.json");
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path).context("Failed to read community-plugins.json")?;
    serde_json::from_str(&content).context("Failed to parse community-plugins.json")
}
