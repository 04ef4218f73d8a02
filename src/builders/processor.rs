use crate::builders::compat::CompatLayer;
use crate::builders::patterns::{FolderRule, PatternMatcher};
use crate::core::config::Settings;
use crate::core::tree::FolderTree;

/// Class recording that a folder was hidden by a rule. Lets a re-check undo
/// every earlier hide without knowing which rule caused it.
pub const HIDDEN_MARK_CLASS: &str = "hide-folders--hidden";

/// What one processing pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Marked folders reset before matching.
    pub rechecked: usize,
    /// Non-inert rules that were queried.
    pub rules_applied: usize,
    /// Folders that ended up collapsed.
    pub hidden: usize,
    /// Matched folders whose hidden effect was cleared.
    pub shown: usize,
}

/// Applies the configured rules to the rendered folder tree.
pub struct FolderProcessor<'a> {
    settings: &'a Settings,
    compat: Option<&'a dyn CompatLayer>,
}

impl<'a> FolderProcessor<'a> {
    pub fn new(settings: &'a Settings, compat: Option<&'a dyn CompatLayer>) -> Self {
        Self { settings, compat }
    }

    /// The full selector for one rule, including the companion plugin's
    /// markup when a compatibility layer is active. Empty for inert rules.
    pub fn selector_for_rule(&self, raw: &str) -> String {
        let rule = FolderRule::parse(raw);
        if rule.is_inert() {
            return String::new();
        }

        let mut selector = rule
            .selector(self.settings.match_case_insensitive)
            .to_string();
        if let Some(extra) = self
            .compat
            .and_then(|compat| compat.selector_for_folder(raw, self.settings))
            && !extra.trim().is_empty()
        {
            selector.push_str(", ");
            selector.push_str(&extra);
        }
        selector
    }

    /// Hides or shows every rendered folder matching a rule.
    ///
    /// With `recheck_hidden`, every folder hidden by an earlier pass is reset
    /// first, so folders whose rule was removed or edited come back. Rules
    /// matching nothing are skipped silently; the rendered tree decides what
    /// exists.
    ///
    /// # Arguments
    /// * `tree`: The host tree to read and write.
    /// * `recheck_hidden`: Whether to reset previously hidden folders first.
    ///
    /// # Returns
    /// A `ProcessSummary` describing the pass.
    pub fn process_folders(&self, tree: &mut dyn FolderTree, recheck_hidden: bool) -> ProcessSummary {
        let mut summary = ProcessSummary::default();

        // With no rules there is nothing to hide, but a re-check still has
        // to release folders hidden by rules that were just removed.
        if self.settings.rules.is_empty() && !recheck_hidden {
            return summary;
        }

        if recheck_hidden {
            for node in tree.elements_by_class(HIDDEN_MARK_CLASS) {
                tree.set_style(node, "height", "");
                tree.set_style(node, "overflow", "");
                tree.remove_class(node, HIDDEN_MARK_CLASS);
                summary.rechecked += 1;
            }
        }

        for raw in &self.settings.rules {
            let selector = self.selector_for_rule(raw);
            if selector.is_empty() {
                continue;
            }

            let matches = match tree.query_selector_all(&selector) {
                Ok(matches) => matches,
                Err(error) => {
                    tracing::warn!(rule = %raw, %selector, %error, "skipping rule with invalid selector");
                    continue;
                }
            };
            summary.rules_applied += 1;

            for title in matches {
                // the title row carries the path; its wrapper is what takes up space
                let Some(wrapper) = tree.parent(title) else {
                    continue;
                };

                tree.add_class(wrapper, HIDDEN_MARK_CLASS);
                if self.settings.are_folders_hidden {
                    tree.set_style(wrapper, "height", "0");
                    tree.set_style(wrapper, "overflow", "hidden");
                    summary.hidden += 1;
                } else {
                    tree.set_style(wrapper, "height", "");
                    tree.set_style(wrapper, "overflow", "");
                    summary.shown += 1;
                }
            }
        }

        tracing::debug!(?summary, recheck_hidden, "processed folders");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::compat::QuickExplorerCompat;
    use crate::core::tree::DomTree;

    fn settings(rules: &[&str]) -> Settings {
        Settings {
            rules: rules.iter().map(|r| r.to_string()).collect(),
            ..Settings::default()
        }
    }

    fn is_hidden(tree: &DomTree, path: &str) -> bool {
        let wrapper = tree.folder(path).unwrap().wrapper;
        tree.style(wrapper, "height").as_deref() == Some("0")
            && tree.style(wrapper, "overflow").as_deref() == Some("hidden")
    }

    fn hidden_paths(tree: &DomTree, paths: &[&str]) -> Vec<String> {
        paths
            .iter()
            .filter(|p| is_hidden(tree, p))
            .map(|p| p.to_string())
            .collect()
    }

    #[test]
    fn test_exact_rule_matches_whole_segments_only() {
        let paths = ["attachments", "Notes/attachments", "Notes/my-attachments", "attachments2"];
        let mut tree = DomTree::from_folder_paths(paths);
        let settings = settings(&["attachments"]);

        FolderProcessor::new(&settings, None).process_folders(&mut tree, false);

        assert_eq!(
            hidden_paths(&tree, &paths),
            vec!["attachments".to_string(), "Notes/attachments".to_string()]
        );
    }

    #[test]
    fn test_starts_with_rule_matches_folder_name_prefix() {
        let paths = ["_assets", "Notes/_drafts", "Notes/x_y", "Notes"];
        let mut tree = DomTree::from_folder_paths(paths);
        let settings = settings(&["startsWith::_"]);

        FolderProcessor::new(&settings, None).process_folders(&mut tree, false);

        assert_eq!(
            hidden_paths(&tree, &paths),
            vec!["_assets".to_string(), "Notes/_drafts".to_string()]
        );
    }

    #[test]
    fn test_ends_with_rule_ignores_segment_boundaries() {
        let paths = ["a/page_files", "a/b_files", "a/files"];
        let mut tree = DomTree::from_folder_paths(paths);
        let settings = settings(&["endsWith::_files"]);

        FolderProcessor::new(&settings, None).process_folders(&mut tree, false);

        assert_eq!(
            hidden_paths(&tree, &paths),
            vec!["a/page_files".to_string(), "a/b_files".to_string()]
        );
    }

    #[test]
    fn test_case_sensitive_matching() {
        let paths = ["Attachments", "attachments"];
        let mut tree = DomTree::from_folder_paths(paths);
        let settings = Settings {
            match_case_insensitive: false,
            ..settings(&["attachments"])
        };

        FolderProcessor::new(&settings, None).process_folders(&mut tree, false);

        assert_eq!(hidden_paths(&tree, &paths), vec!["attachments".to_string()]);
    }

    #[test]
    fn test_processing_twice_is_idempotent() {
        let paths = ["a/attachments", "b"];
        let mut tree = DomTree::from_folder_paths(paths);
        let settings = settings(&["attachments", "attachments"]);
        let processor = FolderProcessor::new(&settings, None);

        processor.process_folders(&mut tree, false);
        let wrapper = tree.folder("a/attachments").unwrap().wrapper;
        let first = (tree.style(wrapper, "height"), tree.style(wrapper, "overflow"));
        processor.process_folders(&mut tree, false);
        let second = (tree.style(wrapper, "height"), tree.style(wrapper, "overflow"));

        assert_eq!(first, second);
        assert_eq!(tree.elements_by_class(HIDDEN_MARK_CLASS), vec![wrapper]);
    }

    #[test]
    fn test_recheck_releases_folders_of_removed_rules() {
        let paths = ["old", "kept"];
        let mut tree = DomTree::from_folder_paths(paths);

        let before = settings(&["old", "kept"]);
        FolderProcessor::new(&before, None).process_folders(&mut tree, false);
        assert_eq!(hidden_paths(&tree, &paths).len(), 2);

        let after = settings(&["kept"]);
        let summary = FolderProcessor::new(&after, None).process_folders(&mut tree, true);

        assert_eq!(summary.rechecked, 2);
        assert_eq!(hidden_paths(&tree, &paths), vec!["kept".to_string()]);
        let old = tree.folder("old").unwrap().wrapper;
        assert!(!tree.has_class(old, HIDDEN_MARK_CLASS));
    }

    #[test]
    fn test_recheck_with_no_rules_clears_everything() {
        let mut tree = DomTree::from_folder_paths(["old"]);
        FolderProcessor::new(&settings(&["old"]), None).process_folders(&mut tree, false);

        let empty = settings(&[]);
        FolderProcessor::new(&empty, None).process_folders(&mut tree, false);
        assert!(is_hidden(&tree, "old"));

        FolderProcessor::new(&empty, None).process_folders(&mut tree, true);
        assert!(!is_hidden(&tree, "old"));
    }

    #[test]
    fn test_showing_keeps_mark_and_clears_style() {
        let mut tree = DomTree::from_folder_paths(["attachments"]);
        let mut settings = settings(&["attachments"]);
        FolderProcessor::new(&settings, None).process_folders(&mut tree, false);

        settings.are_folders_hidden = false;
        let summary = FolderProcessor::new(&settings, None).process_folders(&mut tree, false);

        let wrapper = tree.folder("attachments").unwrap().wrapper;
        assert_eq!(summary.shown, 1);
        assert!(tree.has_class(wrapper, HIDDEN_MARK_CLASS));
        assert_eq!(tree.style(wrapper, "height"), None);
    }

    #[test]
    fn test_inert_rules_are_skipped() {
        let mut tree = DomTree::from_folder_paths(["a"]);
        let settings = settings(&["", "  ", "startsWith::"]);

        let summary = FolderProcessor::new(&settings, None).process_folders(&mut tree, false);

        assert_eq!(summary, ProcessSummary::default());
        assert!(!is_hidden(&tree, "a"));
    }

    #[test]
    fn test_compat_selector_is_appended() {
        let settings = settings(&["attachments"]);
        let compat = QuickExplorerCompat;
        let processor = FolderProcessor::new(&settings, Some(&compat as &dyn CompatLayer));

        let selector = processor.selector_for_rule("attachments");
        assert!(selector.starts_with(".nav-folder-title"));
        assert!(selector.ends_with(r#".is-qe-folder[data-file-path="attachments" i]"#));
        assert_eq!(processor.selector_for_rule("  "), "");
    }
}
