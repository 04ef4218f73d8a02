use hide_folders::builders::validator::{RuleValidator, StandardValidator};
use hide_folders::core::config::{ConfigManager, ConfigProvider, Settings};
use hide_folders::core::vault::{AppJsonStore, USER_IGNORE_FILTERS, VaultConfigStore};
use hide_folders::utils::VaultSession;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn setup_test_vault() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for path in [".obsidian", "Notes/Attachments", "Projects/x_attachments", "Projects/src"] {
        fs::create_dir_all(dir.path().join(path)).unwrap();
    }
    dir
}

#[test]
fn test_core_workflow() {
    let td = setup_test_vault();
    let vault_root = td.path().to_path_buf();

    // 1. Setup config
    let config_manager = ConfigManager::new_at(vault_root.clone()).unwrap();
    config_manager.initialize().unwrap();
    config_manager
        .save_settings(&Settings {
            add_to_ignore_list: true,
            rules: vec!["attachments".to_string(), "endsWith::_attachments".to_string()],
            ..Settings::default()
        })
        .unwrap();

    // 2. Keep an unrelated ignore entry the user added themselves
    let mut store = AppJsonStore::new(&vault_root);
    store
        .set_config(USER_IGNORE_FILTERS, json!(["templates/"]))
        .unwrap();
    store.set_config("alwaysUpdateLinks", json!(true)).unwrap();

    // 3. Load the plugin against the vault
    let mut session = VaultSession::open(&vault_root).unwrap();
    session.plugin.sync_ignore_list(false).unwrap();

    let report = session.status_report().unwrap();
    assert_eq!(
        report.hidden_folders,
        vec!["Notes/Attachments".to_string(), "Projects/x_attachments".to_string()]
    );
    let filters = session.plugin.ignore_filters().unwrap();
    assert_eq!(filters.len(), 3);
    assert_eq!(filters[0], "templates/");

    // 4. Drop the suffix rule
    session
        .plugin
        .remove_rule(&mut session.tree, "endsWith::_attachments")
        .unwrap();

    let report = session.status_report().unwrap();
    assert_eq!(report.hidden_folders, vec!["Notes/Attachments".to_string()]);
    assert_eq!(session.plugin.ignore_filters().unwrap().len(), 2);

    // 5. Show everything again
    session.plugin.toggle_functionality(&mut session.tree).unwrap();

    let report = session.status_report().unwrap();
    assert!(!report.are_folders_hidden);
    assert!(report.hidden_folders.is_empty());
    assert_eq!(report.rules[0].matched_folders, vec!["Notes/Attachments".to_string()]);

    let saved = config_manager.load_settings().unwrap();
    assert!(!saved.are_folders_hidden);
    assert_eq!(saved.rules, vec!["attachments".to_string()]);
    assert_eq!(
        store.get_config(USER_IGNORE_FILTERS).unwrap(),
        Some(json!(["templates/"]))
    );
    assert_eq!(store.get_config("alwaysUpdateLinks").unwrap(), Some(json!(true)));
}

#[test]
fn test_settings_file_merges_over_defaults() {
    let td = setup_test_vault();
    let config_manager = ConfigManager::new_at(td.path().to_path_buf()).unwrap();
    let path = config_manager.get_config_path().unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"areFoldersHidden": false}"#).unwrap();

    let settings = config_manager.load_settings().unwrap();

    assert!(!settings.are_folders_hidden);
    assert!(settings.match_case_insensitive);
    assert!(!settings.add_to_ignore_list);
    assert_eq!(settings.rules, vec!["attachments".to_string()]);
}

#[test]
fn test_validate_flags_suspicious_rules() {
    let settings = Settings {
        rules: vec![
            "attachments".to_string(),
            "startWith::_".to_string(),
            "attachments".to_string(),
        ],
        ..Settings::default()
    };

    let issues = StandardValidator::new().validate_settings(&settings).unwrap();

    assert_eq!(issues.len(), 2);
}
