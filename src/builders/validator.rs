use anyhow::Result;
use std::collections::HashSet;

use crate::builders::patterns::{self, FolderRule, RuleKind};
use crate::core::config;

/// The `RuleValidator` trait defines the public interface for checking the
/// configured rules.
///
/// Every rule string is accepted by the plugin (invalid input simply matches
/// nothing), so validation reports likely mistakes rather than hard errors.
pub trait RuleValidator {
    /// Validates the whole settings record and returns a list of issues.
    ///
    /// # Arguments
    /// * `settings`: The `Settings` to be validated.
    ///
    /// # Returns
    /// A `Result<Vec<String>>` with one human-readable entry per issue.
    fn validate_settings(&self, settings: &config::Settings) -> Result<Vec<String>>;

    /// Validates a single rule string.
    ///
    /// # Arguments
    /// * `line`: The 1-based line of the rule in the settings text area.
    /// * `raw`: The rule as entered.
    fn validate_rule(&self, line: usize, raw: &str) -> Vec<String>;
}

/// The standard set of checks run by the `validate` command.
pub struct StandardValidator;

impl StandardValidator {
    /// Creates a new instance of `StandardValidator`.
    pub fn new() -> Self {
        Self
    }

    /// Flags rules that appear more than once. Duplicates are harmless but
    /// usually left over from editing.
    fn check_duplicates(&self, rules: &[String]) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for (index, raw) in rules.iter().enumerate() {
            let rule = FolderRule::parse(raw);
            if rule.is_inert() {
                continue;
            }
            if !seen.insert((rule.kind, rule.value.clone())) {
                warnings.push(format!(
                    "Line {}: duplicate rule '{}'",
                    index + 1,
                    raw.trim()
                ));
            }
        }
        warnings
    }
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleValidator for StandardValidator {
    fn validate_settings(&self, settings: &config::Settings) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if settings.add_to_ignore_list && settings.rules.iter().all(|r| r.trim().is_empty()) {
            issues.push("Ignore-list sync is enabled but no rules are configured".to_string());
        }

        for (index, raw) in settings.rules.iter().enumerate() {
            issues.extend(self.validate_rule(index + 1, raw));
        }
        issues.extend(self.check_duplicates(&settings.rules));

        Ok(issues)
    }

    fn validate_rule(&self, line: usize, raw: &str) -> Vec<String> {
        let mut issues = Vec::new();
        let rule = FolderRule::parse(raw);

        if raw.trim().is_empty() {
            issues.push(format!("Line {line}: empty rule will match nothing"));
            return issues;
        }

        match rule.kind {
            RuleKind::StartsWith | RuleKind::EndsWith if rule.is_inert() => {
                issues.push(format!(
                    "Line {line}: '{}' has no folder name after the prefix and will match nothing",
                    raw.trim()
                ));
            }
            RuleKind::Exact => {
                // `startWith::x` and friends silently become exact rules
                if let Some((prefix, _)) = rule.value.split_once("::") {
                    issues.push(format!(
                        "Line {line}: unknown prefix '{prefix}::', rule is matched as an exact folder name (known prefixes: {}, {})",
                        patterns::STARTS_WITH_PREFIX,
                        patterns::ENDS_WITH_PREFIX
                    ));
                }
                if rule.value.ends_with('/') {
                    issues.push(format!(
                        "Line {line}: trailing '/' in '{}' will never match a folder path",
                        rule.value
                    ));
                }
            }
            _ => {}
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;

    fn validate(rules: &[&str]) -> Vec<String> {
        let settings = Settings {
            rules: rules.iter().map(|r| r.to_string()).collect(),
            ..Settings::default()
        };
        StandardValidator::new().validate_settings(&settings).unwrap()
    }

    #[test]
    fn test_clean_rules_have_no_issues() {
        assert!(validate(&["attachments", "startsWith::_", "endsWith::.assets"]).is_empty());
    }

    #[test]
    fn test_reports_empty_and_prefix_only_rules() {
        let issues = validate(&["", "endsWith::"]);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("Line 1: empty rule"));
        assert!(issues[1].contains("no folder name after the prefix"));
    }

    #[test]
    fn test_reports_unknown_prefix() {
        let issues = validate(&["startWith::_"]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("unknown prefix 'startWith::'"));
    }

    #[test]
    fn test_reports_duplicates_after_normalisation() {
        let issues = validate(&["attachments", " attachments ", "STARTSWITH::x", "startsWith::x"]);
        assert_eq!(
            issues,
            vec![
                "Line 2: duplicate rule 'attachments'".to_string(),
                "Line 4: duplicate rule 'startsWith::x'".to_string()
            ]
        );
    }
}
