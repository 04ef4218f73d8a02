use anyhow::{Context, Result};
use serde::Serialize;

use crate::builders::patterns::{FolderRule, PatternMatcher, RuleKind};
use crate::core::config::Settings;

/// The state of one configured rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleStatus {
    pub raw: String,
    pub kind: RuleKind,
    pub value: String,
    pub selector: String,
    /// The mirrored ignore-list entry, `None` for inert rules.
    pub ignore_entry: Option<String>,
    /// Whether `ignore_entry` is currently in the host's ignore list.
    pub in_ignore_list: bool,
    /// Rendered folders this rule matched.
    pub matched_folders: Vec<String>,
}

/// Everything the `status` command shows.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub vault: String,
    pub are_folders_hidden: bool,
    pub match_case_insensitive: bool,
    pub add_to_ignore_list: bool,
    pub compat_layer: Option<String>,
    pub total_folders: usize,
    pub hidden_folders: Vec<String>,
    pub rules: Vec<RuleStatus>,
}

impl RuleStatus {
    /// Describes `raw` under `settings`. The caller supplies the matches and
    /// the ignore-list membership, which depend on the host.
    pub fn describe(
        raw: &str,
        settings: &Settings,
        selector: String,
        ignore_filters: &[String],
        matched_folders: Vec<String>,
    ) -> Self {
        let rule = FolderRule::parse(raw);
        let ignore_entry = rule.ignore_regex(settings.match_case_insensitive);
        let in_ignore_list = ignore_entry
            .as_ref()
            .is_some_and(|entry| ignore_filters.contains(entry));

        Self {
            raw: raw.to_string(),
            kind: rule.kind,
            value: rule.value,
            selector,
            ignore_entry,
            in_ignore_list,
            matched_folders,
        }
    }
}

pub trait StatusReporter {
    fn generate_status_report(&self, report: &StatusReport) -> Result<()>;
}

/// Prints a human-readable report to the console.
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    /// Constructs a new `ConsoleReporter`. Verbose mode adds each rule's
    /// selector and ignore-list entry.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Formats the status line of one rule.
    ///
    /// 🟢: the rule matches at least one folder.
    /// 🟡: the rule matches nothing right now.
    /// ⚪: the rule is empty and can never match.
    fn format_rule_status(&self, status: &RuleStatus) -> String {
        let icon = if status.value.is_empty() {
            "⚪"
        } else if status.matched_folders.is_empty() {
            "🟡"
        } else {
            "🟢"
        };

        format!(
            "{} {:?} ({}, {} folders{})",
            icon,
            status.raw,
            status.kind,
            status.matched_folders.len(),
            if status.in_ignore_list { ", in ignore list" } else { "" }
        )
    }
}

impl StatusReporter for ConsoleReporter {
    fn generate_status_report(&self, report: &StatusReport) -> Result<()> {
        println!("📊 Hide Folders Status Report");
        println!("=============================");
        println!("Vault: {}", report.vault);
        println!(
            "Folders are {}",
            if report.are_folders_hidden { "hidden 🙈" } else { "shown 👀" }
        );
        println!(
            "Case-insensitive matching: {}",
            if report.match_case_insensitive { "on" } else { "off" }
        );
        println!(
            "Ignore-list sync: {}",
            if report.add_to_ignore_list { "on" } else { "off" }
        );
        if let Some(layer) = &report.compat_layer {
            println!("Compatibility layer: {layer}");
        }

        if report.rules.is_empty() {
            println!("\nNo rules configured.");
            return Ok(());
        }

        println!("\n📁 Rules:");
        for status in &report.rules {
            println!("  {}", self.format_rule_status(status));
            if self.verbose {
                println!("    └─ selector: {}", status.selector);
                if let Some(entry) = &status.ignore_entry {
                    println!("    └─ ignore entry: {entry}");
                }
                for folder in &status.matched_folders {
                    println!("    └─ {folder}");
                }
            }
        }

        println!("\n📈 Summary:");
        println!("  Total folders: {}", report.total_folders);
        println!("  Matched folders: {}", report.hidden_folders.len());

        Ok(())
    }
}

/// Prints the report as JSON for scripts.
pub struct JsonReporter;

impl StatusReporter for JsonReporter {
    fn generate_status_report(&self, report: &StatusReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize status report")?;
        println!("{json}");
        Ok(())
    }
}
