use anyhow::Result;
use std::time::Instant;

use crate::builders::compat::CompatLayer;
use crate::builders::ignore_list::{self, SyncOutcome};
use crate::builders::observer::{ChangeObserver, Trigger};
use crate::builders::processor::{FolderProcessor, ProcessSummary};
use crate::core::config::{ConfigProvider, Settings};
use crate::core::events::HostEvents;
use crate::core::tree::FolderTree;
use crate::core::vault::VaultConfigStore;

/// Texts and icon of the toggle control for one visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleIndicator {
    pub ribbon_label: &'static str,
    pub ribbon_icon: &'static str,
    pub status_text: &'static str,
}

impl ToggleIndicator {
    pub fn for_state(folders_hidden: bool) -> Self {
        if folders_hidden {
            Self {
                ribbon_label: "Show Hidden Folders",
                ribbon_icon: "eye",
                status_text: "Configured Folders are Hidden",
            }
        } else {
            Self {
                ribbon_label: "Hide Hidden Folders Again",
                ribbon_icon: "eye-off",
                status_text: "",
            }
        }
    }
}

/// The plugin instance. Owns the settings for its whole lifetime and talks
/// to the host only through the traits it was given.
pub struct HideFoldersPlugin {
    config: Box<dyn ConfigProvider>,
    vault: Box<dyn VaultConfigStore>,
    compat: Option<Box<dyn CompatLayer>>,
    settings: Settings,
    observer: ChangeObserver,
}

impl HideFoldersPlugin {
    /// Loads the persisted settings (merged over the defaults).
    pub fn new(
        config: Box<dyn ConfigProvider>,
        vault: Box<dyn VaultConfigStore>,
        compat: Option<Box<dyn CompatLayer>>,
    ) -> Result<Self> {
        let settings = config.load_settings()?;

        Ok(Self {
            config,
            vault,
            compat,
            settings,
            observer: ChangeObserver::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn compat(&self) -> Option<&dyn CompatLayer> {
        self.compat.as_deref()
    }

    pub fn indicator(&self) -> ToggleIndicator {
        ToggleIndicator::for_state(self.settings.are_folders_hidden)
    }

    pub fn processor(&self) -> FolderProcessor<'_> {
        FolderProcessor::new(&self.settings, self.compat.as_deref())
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_observing()
    }

    /// Activates the plugin: starts observing the host and brings the ignore
    /// list in line with the settings. Folders are processed once the host's
    /// layout is ready, see [`Self::on_layout_ready`].
    pub fn load(&mut self, host: &mut dyn HostEvents) -> Result<()> {
        tracing::info!(
            rules = self.settings.rules.len(),
            hidden = self.settings.are_folders_hidden,
            compat = self.compat.as_ref().map(|c| c.name()),
            "loading hide-folders"
        );

        self.observer.observe(host);
        self.sync_ignore_list(false)?;
        Ok(())
    }

    pub fn on_layout_ready(&self, tree: &mut dyn FolderTree) -> ProcessSummary {
        self.process_folders(tree, false)
    }

    /// Stops observing the host. Nothing else holds resources.
    pub fn unload(&mut self, host: &mut dyn HostEvents) {
        self.observer.disconnect(host);
        tracing::info!("unloaded hide-folders");
    }

    pub fn process_folders(&self, tree: &mut dyn FolderTree, recheck_hidden: bool) -> ProcessSummary {
        self.processor().process_folders(tree, recheck_hidden)
    }

    /// Handles everything the host delivered since the last call: one full
    /// re-scan per qualifying mutation record and per settled rename.
    ///
    /// A rename can move a hidden folder out of every rule, so rename
    /// re-scans release previously hidden folders first.
    ///
    /// # Returns
    /// The number of re-scans performed.
    pub fn pump(&mut self, tree: &mut dyn FolderTree, now: Instant) -> usize {
        let triggers = self
            .observer
            .collect_triggers(tree, self.compat.as_deref(), now);

        for trigger in &triggers {
            let recheck_hidden = *trigger == Trigger::Rename;
            if recheck_hidden {
                tracing::debug!("re-processing after rename");
            }
            self.process_folders(tree, recheck_hidden);
        }
        triggers.len()
    }

    /// Flips between hiding and showing the configured folders.
    ///
    /// # Returns
    /// The new value of `are_folders_hidden`.
    pub fn toggle_functionality(&mut self, tree: &mut dyn FolderTree) -> Result<bool> {
        let hidden = !self.settings.are_folders_hidden;
        self.set_folders_hidden(tree, hidden)?;
        Ok(hidden)
    }

    pub fn set_folders_hidden(&mut self, tree: &mut dyn FolderTree, hidden: bool) -> Result<()> {
        self.settings.are_folders_hidden = hidden;
        self.save_settings()?;

        let indicator = self.indicator();
        tracing::info!(hidden, label = indicator.ribbon_label, "toggled folder visibility");

        self.process_folders(tree, true);
        self.sync_ignore_list(false)?;
        Ok(())
    }

    /// Switches case sensitivity. Mirrored entries were generated for the
    /// old casing, so they are replaced rather than left behind.
    pub fn set_case_insensitive(&mut self, tree: &mut dyn FolderTree, case_insensitive: bool) -> Result<()> {
        if case_insensitive == self.settings.match_case_insensitive {
            return Ok(());
        }

        if self.settings.add_to_ignore_list {
            ignore_list::remove_rules_from_ignore_list(
                &self.settings.rules,
                self.settings.match_case_insensitive,
                self.vault.as_mut(),
            )?;
        }

        self.settings.match_case_insensitive = case_insensitive;
        self.save_settings()?;
        self.process_folders(tree, true);
        self.sync_ignore_list(false)?;
        Ok(())
    }

    /// Turns ignore-list mirroring on or off. Turning it off removes the
    /// entries it added.
    pub fn set_ignore_list_enabled(&mut self, enabled: bool) -> Result<SyncOutcome> {
        self.settings.add_to_ignore_list = enabled;
        self.save_settings()?;
        self.sync_ignore_list(!enabled)
    }

    /// Replaces the rule list with the lines of `text`, as the settings text
    /// area does on every edit.
    pub fn set_rules_from_text(&mut self, tree: &mut dyn FolderTree, text: &str) -> Result<()> {
        let rules = text.split('\n').map(str::to_string).collect();
        self.set_rules(tree, rules)
    }

    /// Appends one rule.
    pub fn add_rule(&mut self, tree: &mut dyn FolderTree, rule: &str) -> Result<()> {
        let mut rules = self.settings.rules.clone();
        rules.push(rule.to_string());
        self.set_rules(tree, rules)
    }

    /// Removes every line equal to `rule` (ignoring surrounding whitespace).
    ///
    /// # Returns
    /// `false` when no such rule was configured.
    pub fn remove_rule(&mut self, tree: &mut dyn FolderTree, rule: &str) -> Result<bool> {
        let rule = rule.trim();
        let rules: Vec<String> = self
            .settings
            .rules
            .iter()
            .filter(|r| r.trim() != rule)
            .cloned()
            .collect();

        if rules.len() == self.settings.rules.len() {
            return Ok(false);
        }
        self.set_rules(tree, rules)?;
        Ok(true)
    }

    /// Installs a new rule list.
    ///
    /// Rules that disappeared lose their ignore-list entries (and only
    /// theirs), then folders are re-checked so the ones they hid come back.
    pub fn set_rules(&mut self, tree: &mut dyn FolderTree, rules: Vec<String>) -> Result<()> {
        let removed: Vec<String> = self
            .settings
            .rules
            .iter()
            .filter(|old| !rules.contains(old))
            .cloned()
            .collect();

        if self.settings.add_to_ignore_list && !removed.is_empty() {
            ignore_list::remove_rules_from_ignore_list(
                &removed,
                self.settings.match_case_insensitive,
                self.vault.as_mut(),
            )?;
        }

        self.settings.rules = rules;
        self.save_settings()?;
        self.process_folders(tree, true);
        self.sync_ignore_list(false)?;
        Ok(())
    }

    pub fn sync_ignore_list(&mut self, disable_override: bool) -> Result<SyncOutcome> {
        ignore_list::sync_ignore_list(&self.settings, self.vault.as_mut(), disable_override)
    }

    /// The host's current ignore list, for reporting.
    pub fn ignore_filters(&self) -> Result<Vec<String>> {
        ignore_list::read_filters(self.vault.as_ref())
    }

    fn save_settings(&self) -> Result<()> {
        self.config.save_settings(&self.settings)
    }
}
