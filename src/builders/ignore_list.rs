use anyhow::{Context, Result};
use serde_json::Value;

use crate::builders::patterns::{FolderRule, PatternMatcher};
use crate::core::config::Settings;
use crate::core::vault::{VaultConfigStore, USER_IGNORE_FILTERS};

/// What a synchronization changed in the host's ignore list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub added: usize,
    pub removed: usize,
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// The ignore-list entries equivalent to `rules`, in rule order. Inert rules
/// contribute nothing; duplicates are kept.
pub fn ignore_entries_for(rules: &[String], case_insensitive: bool) -> Vec<String> {
    rules
        .iter()
        .filter_map(|raw| FolderRule::parse(raw).ignore_regex(case_insensitive))
        .collect()
}

/// Mirrors the configured rules into the host's ignore list.
///
/// Nothing happens when the feature is off, unless `disable_override` asks
/// for the mirrored entries to be removed. While folders are hidden (and no
/// override is given) missing entries are appended; otherwise every entry
/// equivalent to a configured rule is removed.
///
/// # Arguments
/// * `settings`: The current settings.
/// * `store`: The host's vault configuration.
/// * `disable_override`: Remove the entries even if the feature is enabled.
///
/// # Returns
/// A `SyncOutcome` counting added and removed entries.
pub fn sync_ignore_list(
    settings: &Settings,
    store: &mut dyn VaultConfigStore,
    disable_override: bool,
) -> Result<SyncOutcome> {
    if !settings.add_to_ignore_list && !disable_override {
        return Ok(SyncOutcome::default());
    }

    let entries = ignore_entries_for(&settings.rules, settings.match_case_insensitive);
    let mut filters = read_filters(store)?;
    let mut outcome = SyncOutcome::default();

    if settings.are_folders_hidden && !disable_override {
        for entry in entries {
            if !filters.contains(&entry) {
                filters.push(entry);
                outcome.added += 1;
            }
        }
    } else {
        let before = filters.len();
        filters.retain(|filter| !entries.contains(filter));
        outcome.removed = before - filters.len();
    }

    if !outcome.is_noop() {
        write_filters(store, filters)?;
        tracing::info!(added = outcome.added, removed = outcome.removed, "synchronized ignore list");
    }

    Ok(outcome)
}

/// Removes only the entries equivalent to `rules`, leaving every other entry
/// in place. Used when rules are deleted from the configured list.
///
/// # Returns
/// The number of entries removed.
pub fn remove_rules_from_ignore_list(
    rules: &[String],
    case_insensitive: bool,
    store: &mut dyn VaultConfigStore,
) -> Result<usize> {
    let entries = ignore_entries_for(rules, case_insensitive);
    if entries.is_empty() {
        return Ok(0);
    }

    let mut filters = read_filters(store)?;
    let before = filters.len();
    filters.retain(|filter| !entries.contains(filter));
    let removed = before - filters.len();

    if removed > 0 {
        write_filters(store, filters)?;
        tracing::info!(removed, "removed deleted rules from ignore list");
    }

    Ok(removed)
}

/// The host's current ignore list. A missing key reads as empty.
pub fn read_filters(store: &dyn VaultConfigStore) -> Result<Vec<String>> {
    match store.get_config(USER_IGNORE_FILTERS)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).context("userIgnoreFilters is not a list of strings"),
    }
}

fn write_filters(store: &mut dyn VaultConfigStore, filters: Vec<String>) -> Result<()> {
    store.set_config(USER_IGNORE_FILTERS, Value::from(filters))?;
    store.trigger_change(USER_IGNORE_FILTERS);
    Ok(())
}
