use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::builders::compat;
use crate::builders::patterns::{self, FolderRule, PATH_ATTRIBUTE};
use crate::builders::processor::HIDDEN_MARK_CLASS;
use crate::builders::reporter::{
    ConsoleReporter, JsonReporter, RuleStatus, StatusReport, StatusReporter,
};
use crate::core::config::{ConfigManager, ConfigProvider};
use crate::core::engine::HideFoldersPlugin;
use crate::core::tree::{DomTree, FolderTree};
use crate::core::vault::{self, AppJsonStore};

/// A plugin instance bound to a vault on disk, with a rendered snapshot of
/// the vault's folders standing in for the file explorer.
pub struct VaultSession {
    pub vault_root: PathBuf,
    pub plugin: HideFoldersPlugin,
    pub tree: DomTree,
}

impl VaultSession {
    /// Loads the plugin for `vault_root` and renders its folders.
    pub fn open(vault_root: &Path) -> Result<Self> {
        let config = ConfigManager::new_at(vault_root.to_path_buf())?;
        let store = AppJsonStore::new(vault_root);
        let enabled = vault::read_enabled_plugins(vault_root)?;

        let plugin = HideFoldersPlugin::new(
            Box::new(config),
            Box::new(store),
            compat::detect_compat(&enabled),
        )?;
        let mut tree = DomTree::from_folder_paths(collect_vault_folders(vault_root)?);
        plugin.on_layout_ready(&mut tree);

        Ok(Self {
            vault_root: vault_root.to_path_buf(),
            plugin,
            tree,
        })
    }

    /// Builds the report shown by `status`.
    pub fn status_report(&self) -> Result<StatusReport> {
        let settings = self.plugin.settings();
        let processor = self.plugin.processor();
        let ignore_filters = self.plugin.ignore_filters()?;

        let mut rules = Vec::new();
        for raw in &settings.rules {
            let selector = processor.selector_for_rule(raw);
            let matched = if selector.is_empty() {
                Vec::new()
            } else {
                self.tree
                    .query_selector_all(&selector)?
                    .into_iter()
                    .filter_map(|title| self.tree.attribute(title, PATH_ATTRIBUTE))
                    .map(str::to_string)
                    .collect()
            };
            rules.push(RuleStatus::describe(
                raw,
                settings,
                selector,
                &ignore_filters,
                matched,
            ));
        }

        let mut hidden_folders: Vec<String> = self
            .tree
            .elements_by_class(HIDDEN_MARK_CLASS)
            .into_iter()
            // shown folders keep the mark, only collapsed ones count
            .filter(|wrapper| self.tree.style(*wrapper, "height").as_deref() == Some("0"))
            .filter_map(|wrapper| self.folder_path(wrapper))
            .collect();
        hidden_folders.sort();

        Ok(StatusReport {
            vault: self.vault_root.display().to_string(),
            are_folders_hidden: settings.are_folders_hidden,
            match_case_insensitive: settings.match_case_insensitive,
            add_to_ignore_list: settings.add_to_ignore_list,
            compat_layer: self.plugin.compat().map(|c| c.name().to_string()),
            total_folders: self.tree.elements_by_class(patterns::FOLDER_TITLE_CLASS).len(),
            hidden_folders,
            rules,
        })
    }

    fn folder_path(&self, wrapper: crate::core::tree::NodeId) -> Option<String> {
        self.tree
            .children(wrapper)
            .iter()
            .find_map(|child| self.tree.attribute(*child, PATH_ATTRIBUTE))
            .map(str::to_string)
    }
}

/// Every folder below `vault_root` as a vault-relative `/`-separated path,
/// sorted. Dot-directories (`.obsidian`, `.git`, `.trash`) are skipped along
/// with everything inside them.
pub fn collect_vault_folders(vault_root: &Path) -> Result<Vec<String>> {
    let mut folders = Vec::new();

    for entry in WalkDir::new(vault_root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
    {
        let entry = entry.context("Failed to walk vault")?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let relative = entry.path().strip_prefix(vault_root)?;
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        folders.push(path);
    }

    folders.sort();
    Ok(folders)
}

fn vault_root(vault: Option<&Path>) -> Result<PathBuf> {
    match vault {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(ConfigManager::new()?.get_vault_root().to_path_buf()),
    }
}

// Helper function to create ConfigManager instance
fn get_config_manager(vault: Option<&Path>) -> Result<ConfigManager> {
    ConfigManager::new_at(vault_root(vault)?)
}

fn open_session(vault: Option<&Path>) -> Result<VaultSession> {
    VaultSession::open(&vault_root(vault)?)
}

pub fn initialize_vault(vault: Option<&Path>) -> Result<()> {
    let config_manager = get_config_manager(vault)?;
    config_manager.initialize()?;
    println!("✓ Initialized hide-folders for this vault");
    println!("Settings: {}", config_manager.get_config_path()?.display());
    Ok(())
}

pub fn list_rules(vault: Option<&Path>) -> Result<()> {
    let settings = get_config_manager(vault)?.load_settings()?;

    if settings.rules.is_empty() {
        println!("No rules configured.");
        return Ok(());
    }

    println!("📁 Rules:");
    for (index, raw) in settings.rules.iter().enumerate() {
        let rule = FolderRule::parse(raw);
        println!("  {:>2}. {:?} ({})", index + 1, raw, rule.kind);
    }
    Ok(())
}

pub fn add_rule(vault: Option<&Path>, rule: &str) -> Result<()> {
    let mut session = open_session(vault)?;
    session.plugin.add_rule(&mut session.tree, rule)?;
    println!("✓ Added rule '{rule}'");
    Ok(())
}

pub fn remove_rule(vault: Option<&Path>, rule: &str) -> Result<()> {
    let mut session = open_session(vault)?;
    if session.plugin.remove_rule(&mut session.tree, rule)? {
        println!("✓ Removed rule '{rule}'");
    } else {
        println!("⚠️  No rule '{rule}' is configured");
    }
    Ok(())
}

/// Replaces the rule list with the lines of `file`, or of stdin for `-`.
pub fn set_rules(vault: Option<&Path>, file: &str) -> Result<()> {
    let text = if file == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read rules from stdin")?;
        text
    } else {
        fs::read_to_string(file).context("Failed to read rules file")?
    };

    let mut session = open_session(vault)?;
    session
        .plugin
        .set_rules_from_text(&mut session.tree, text.trim_end_matches('\n'))?;
    println!("✓ Set {} rules", session.plugin.settings().rules.len());
    Ok(())
}

/// Appends the rules from `file` that are not configured yet.
pub fn import_rules(vault: Option<&Path>, file: &str, format: &str) -> Result<()> {
    let imported = get_config_manager(vault)?.import_rules(file, format)?;

    let mut session = open_session(vault)?;
    let mut rules = session.plugin.settings().rules.clone();
    let mut added = 0;
    for rule in imported {
        if !rules.contains(&rule) {
            rules.push(rule);
            added += 1;
        }
    }

    session.plugin.set_rules(&mut session.tree, rules)?;
    println!("✓ Imported {added} rules from {file}");
    Ok(())
}

pub fn export_settings(vault: Option<&Path>, file: &str, format: &str) -> Result<()> {
    get_config_manager(vault)?.export_settings(file, format)?;
    println!("✓ Exported settings to {file}");
    Ok(())
}

pub fn toggle(vault: Option<&Path>) -> Result<()> {
    let mut session = open_session(vault)?;
    let hidden = session.plugin.toggle_functionality(&mut session.tree)?;
    let indicator = session.plugin.indicator();

    if hidden {
        println!("🙈 {}", indicator.status_text);
    } else {
        println!("👀 Configured folders are shown");
    }
    println!("Next toggle: {}", indicator.ribbon_label);
    Ok(())
}

pub fn set_options(
    vault: Option<&Path>,
    hidden: Option<bool>,
    case_insensitive: Option<bool>,
    ignore_list: Option<bool>,
) -> Result<()> {
    if hidden.is_none() && case_insensitive.is_none() && ignore_list.is_none() {
        println!("Nothing to change. Pass --hidden, --case-insensitive or --ignore-list.");
        return Ok(());
    }

    let mut session = open_session(vault)?;
    if let Some(case_insensitive) = case_insensitive {
        session
            .plugin
            .set_case_insensitive(&mut session.tree, case_insensitive)?;
        println!("✓ Case-insensitive matching: {case_insensitive}");
    }
    if let Some(enabled) = ignore_list {
        let outcome = session.plugin.set_ignore_list_enabled(enabled)?;
        println!(
            "✓ Ignore-list sync: {enabled} (+{} / -{} entries)",
            outcome.added, outcome.removed
        );
    }
    if let Some(hidden) = hidden {
        session.plugin.set_folders_hidden(&mut session.tree, hidden)?;
        println!("✓ Folders hidden: {hidden}");
    }
    Ok(())
}

pub fn print_selector(vault: Option<&Path>, rule: &str) -> Result<()> {
    let session = open_session(vault)?;
    let selector = session.plugin.processor().selector_for_rule(rule);
    if selector.is_empty() {
        println!("⚪ '{rule}' matches nothing");
    } else {
        println!("{selector}");
    }
    Ok(())
}

pub fn print_regex(vault: Option<&Path>, rule: &str) -> Result<()> {
    let settings = get_config_manager(vault)?.load_settings()?;
    match patterns::build_ignore_regex(rule, settings.match_case_insensitive) {
        Some(regex) => println!("{regex}"),
        None => println!("⚪ '{rule}' has no ignore-list entry"),
    }
    Ok(())
}

pub fn show_status(vault: Option<&Path>, verbose: bool, json: bool) -> Result<()> {
    let session = open_session(vault)?;
    let report = session.status_report()?;

    let reporter: Box<dyn StatusReporter> = if json {
        Box::new(JsonReporter)
    } else {
        Box::new(ConsoleReporter::new(verbose))
    };
    reporter.generate_status_report(&report)
}

pub fn sync_ignore(vault: Option<&Path>, disable: bool) -> Result<()> {
    let mut session = open_session(vault)?;
    let outcome = session.plugin.sync_ignore_list(disable)?;

    if outcome.is_noop() {
        println!("✓ Ignore list already up to date");
    } else {
        println!(
            "✓ Ignore list updated: {} added, {} removed",
            outcome.added, outcome.removed
        );
    }
    Ok(())
}

pub fn validate(vault: Option<&Path>) -> Result<()> {
    get_config_manager(vault)?.validate_config()
}
