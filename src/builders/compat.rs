use crate::builders::patterns::FolderRule;
use crate::core::config::Settings;
use crate::core::tree::{FolderTree, MutationRecord};

/// Hooks a companion plugin can provide to extend how folders are found and
/// when they are re-processed. Both hooks are optional; the defaults add
/// nothing to the plugin's own behavior.
pub trait CompatLayer {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// An additional selector matching the companion's rendering of the
    /// folders `rule` targets.
    fn selector_for_folder(&self, _rule: &str, _settings: &Settings) -> Option<String> {
        None
    }

    /// Whether `record` should trigger a re-scan on top of the baseline
    /// condition. May adjust the tree as a side effect.
    fn should_reprocess(&self, _record: &MutationRecord, _tree: &mut dyn FolderTree) -> Option<bool> {
        None
    }
}

pub const QUICK_EXPLORER_ID: &str = "quick-explorer";
pub const QE_FOLDER_CLASS: &str = "is-qe-folder";
pub const QE_POPUP_MENU_CLASS: &str = "qe-popup-menu";
pub const QE_PATH_ATTRIBUTE: &str = "data-file-path";
/// Offset keeping the Quick Explorer popup above the status bar.
pub const QE_POPUP_BOTTOM: &str = "1.7rem";

/// Support for Quick Explorer, whose breadcrumb popups list folders with
/// their own markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuickExplorerCompat;

impl CompatLayer for QuickExplorerCompat {
    fn name(&self) -> &'static str {
        QUICK_EXPLORER_ID
    }

    fn selector_for_folder(&self, rule: &str, settings: &Settings) -> Option<String> {
        let selector = FolderRule::parse(rule).selector_for(
            Some(QE_FOLDER_CLASS),
            QE_PATH_ATTRIBUTE,
            settings.match_case_insensitive,
        );
        Some(selector.to_string())
    }

    fn should_reprocess(&self, record: &MutationRecord, tree: &mut dyn FolderTree) -> Option<bool> {
        for added in &record.added_nodes {
            if !tree.is_element(*added) {
                continue;
            }
            if tree.has_class(*added, QE_POPUP_MENU_CLASS) {
                // moving the outermost popup is enough, nested ones follow it
                if let Some(popup) = tree.elements_by_class(QE_POPUP_MENU_CLASS).first().copied() {
                    tree.set_style(popup, "top", "");
                    tree.set_style(popup, "bottom", QE_POPUP_BOTTOM);
                }
                return Some(true);
            }
        }

        let in_qe_folder = tree
            .parent(record.target)
            .is_some_and(|parent| tree.has_class(parent, QE_FOLDER_CLASS));
        Some(in_qe_folder)
    }
}

/// Picks the compatibility layer for the enabled companion plugins.
pub fn detect_compat(enabled_plugins: &[String]) -> Option<Box<dyn CompatLayer>> {
    if enabled_plugins.iter().any(|id| id == QUICK_EXPLORER_ID) {
        tracing::info!("Quick Explorer detected, enabling compatibility layer");
        return Some(Box::new(QuickExplorerCompat));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::DomTree;

    #[test]
    fn test_detect_compat() {
        assert!(detect_compat(&[]).is_none());
        assert!(detect_compat(&["dataview".to_string()]).is_none());
        let layer = detect_compat(&["quick-explorer".to_string()]).unwrap();
        assert_eq!(layer.name(), QUICK_EXPLORER_ID);
    }

    #[test]
    fn test_quick_explorer_selector() {
        let settings = Settings {
            match_case_insensitive: false,
            ..Settings::default()
        };
        assert_eq!(
            QuickExplorerCompat
                .selector_for_folder("endsWith::_files", &settings)
                .unwrap(),
            r#".is-qe-folder[data-file-path$="_files"]"#
        );
        assert_eq!(
            QuickExplorerCompat.selector_for_folder("  ", &settings).unwrap(),
            ""
        );
    }

    #[test]
    fn test_popup_is_repositioned_and_triggers() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let first = tree.create_div(&[QE_POPUP_MENU_CLASS]);
        tree.set_style(first, "top", "120px");
        tree.append_child(root, first);
        let second = tree.create_div(&[QE_POPUP_MENU_CLASS]);
        tree.append_child(root, second);

        let record = MutationRecord {
            target: root,
            added_nodes: vec![tree.create_text(), second],
            removed_nodes: Vec::new(),
        };

        assert_eq!(QuickExplorerCompat.should_reprocess(&record, &mut tree), Some(true));
        assert_eq!(tree.style(first, "top"), None);
        assert_eq!(tree.style(first, "bottom").as_deref(), Some(QE_POPUP_BOTTOM));
        assert_eq!(tree.style(second, "bottom"), None);
    }

    #[test]
    fn test_qe_folder_children_trigger() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let folder = tree.create_div(&[QE_FOLDER_CLASS]);
        let list = tree.create_div(&[]);
        tree.append_child(root, folder);
        tree.append_child(folder, list);

        let inside = MutationRecord {
            target: list,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        };
        let outside = MutationRecord {
            target: folder,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        };

        assert_eq!(QuickExplorerCompat.should_reprocess(&inside, &mut tree), Some(true));
        assert_eq!(QuickExplorerCompat.should_reprocess(&outside, &mut tree), Some(false));
    }
}
