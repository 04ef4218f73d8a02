use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::builders::compat::CompatLayer;
use crate::core::events::{EventKind, HostEvent, HostEvents, Subscription};
use crate::core::tree::{FolderTree, MutationRecord, FOLDER_CONTAINER_CLASS};

/// How long to wait after a rename before re-processing. The host updates
/// the explorer asynchronously and announces no completion, so this is a
/// fixed settle time rather than a signal.
pub const RENAME_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Why a re-scan was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A mutation record qualified.
    Mutation,
    /// The settle delay after a rename elapsed.
    Rename,
}

/// Keeps the plugin informed about changes to the rendered tree.
#[derive(Debug, Default)]
pub struct ChangeObserver {
    mutations: Option<Subscription>,
    renames: Option<Subscription>,
    pending_renames: VecDeque<Instant>,
}

impl ChangeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to tree mutations and rename events. Observing twice
    /// replaces the earlier subscriptions.
    pub fn observe(&mut self, host: &mut dyn HostEvents) {
        self.disconnect(host);
        self.mutations = Some(host.subscribe(EventKind::TreeMutations));
        self.renames = Some(host.subscribe(EventKind::Rename));
    }

    /// Drops both subscriptions and any rename still waiting to settle.
    pub fn disconnect(&mut self, host: &mut dyn HostEvents) {
        for subscription in [self.mutations.take(), self.renames.take()]
            .into_iter()
            .flatten()
        {
            host.unsubscribe(subscription.id);
        }
        self.pending_renames.clear();
    }

    pub fn is_observing(&self) -> bool {
        self.mutations.is_some()
    }

    /// Whether a record must trigger a re-scan.
    ///
    /// The baseline is a change inside a folder wrapper (a folder was
    /// expanded, created or re-rendered). A compatibility layer is always
    /// consulted as well, since its hook may reposition companion UI.
    pub fn should_reprocess(
        record: &MutationRecord,
        tree: &mut dyn FolderTree,
        compat: Option<&dyn CompatLayer>,
    ) -> bool {
        let baseline = tree
            .parent(record.target)
            .is_some_and(|parent| tree.has_class(parent, FOLDER_CONTAINER_CLASS));

        let extended = compat
            .and_then(|compat| compat.should_reprocess(record, tree))
            .unwrap_or(false);

        baseline || extended
    }

    /// Drains everything delivered since the last call and returns one
    /// trigger per qualifying record and per rename whose delay elapsed.
    ///
    /// Records are not deduplicated: a batch with three qualifying records
    /// yields three triggers.
    ///
    /// # Arguments
    /// * `tree`: The host tree, needed to inspect records.
    /// * `compat`: The active compatibility layer, if any.
    /// * `now`: The current time, compared against pending rename deadlines.
    pub fn collect_triggers(
        &mut self,
        tree: &mut dyn FolderTree,
        compat: Option<&dyn CompatLayer>,
        now: Instant,
    ) -> Vec<Trigger> {
        let mut triggers = Vec::new();

        if let Some(mutations) = &self.mutations {
            for event in mutations.drain() {
                let HostEvent::Mutations(records) = event else {
                    continue;
                };
                for record in &records {
                    if Self::should_reprocess(record, tree, compat) {
                        triggers.push(Trigger::Mutation);
                    }
                }
            }
        }

        if let Some(renames) = &self.renames {
            for event in renames.drain() {
                if let HostEvent::Rename { path, old_path } = event {
                    tracing::debug!(%old_path, %path, "folder renamed, re-processing after settle delay");
                    self.pending_renames.push_back(now + RENAME_SETTLE_DELAY);
                }
            }
        }

        while self
            .pending_renames
            .front()
            .is_some_and(|deadline| *deadline <= now)
        {
            self.pending_renames.pop_front();
            triggers.push(Trigger::Rename);
        }

        triggers
    }

    /// The earliest pending rename deadline, for hosts that want to sleep
    /// until the next one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_renames.front().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::compat::{QuickExplorerCompat, QE_POPUP_MENU_CLASS};
    use crate::core::tree::DomTree;

    #[test]
    fn test_expanding_a_folder_triggers() {
        let mut tree = DomTree::from_folder_paths(["a"]);
        let mut observer = ChangeObserver::new();
        observer.observe(&mut tree);

        let a = tree.folder("a").unwrap();
        tree.add_folder(a.children, "a/b");
        tree.flush();

        let triggers = observer.collect_triggers(&mut tree, None, Instant::now());
        // only the append into a.children has a `.nav-folder` grandparent
        assert_eq!(triggers, vec![Trigger::Mutation]);
    }

    #[test]
    fn test_unrelated_mutations_do_not_trigger() {
        let mut tree = DomTree::new();
        let mut observer = ChangeObserver::new();
        observer.observe(&mut tree);

        let root = tree.root();
        let panel = tree.create_div(&["workspace-leaf"]);
        tree.append_child(root, panel);
        tree.flush();

        assert!(observer.collect_triggers(&mut tree, None, Instant::now()).is_empty());
    }

    #[test]
    fn test_compat_popup_triggers() {
        let mut tree = DomTree::new();
        let mut observer = ChangeObserver::new();
        observer.observe(&mut tree);

        let root = tree.root();
        let popup = tree.create_div(&[QE_POPUP_MENU_CLASS]);
        tree.append_child(root, popup);
        tree.flush();

        let compat = QuickExplorerCompat;
        let triggers = observer.collect_triggers(
            &mut tree,
            Some(&compat as &dyn CompatLayer),
            Instant::now(),
        );
        assert_eq!(triggers, vec![Trigger::Mutation]);
        assert_eq!(tree.style(popup, "bottom").as_deref(), Some("1.7rem"));
    }

    #[test]
    fn test_rename_waits_for_settle_delay() {
        let mut tree = DomTree::from_folder_paths(["a"]);
        let mut observer = ChangeObserver::new();
        observer.observe(&mut tree);
        let start = Instant::now();

        tree.rename_folder("a", "b");
        assert!(observer.collect_triggers(&mut tree, None, start).is_empty());
        assert_eq!(observer.next_deadline(), Some(start + RENAME_SETTLE_DELAY));

        let triggers = observer.collect_triggers(&mut tree, None, start + RENAME_SETTLE_DELAY);
        assert_eq!(triggers, vec![Trigger::Rename]);
        assert_eq!(observer.next_deadline(), None);
    }

    #[test]
    fn test_disconnect_unsubscribes() {
        let mut tree = DomTree::from_folder_paths(["a"]);
        let mut observer = ChangeObserver::new();
        observer.observe(&mut tree);
        observer.disconnect(&mut tree);

        assert!(!observer.is_observing());
        let a = tree.folder("a").unwrap();
        tree.add_folder(a.children, "a/b");
        tree.flush();
        tree.rename_folder("a", "c");

        assert!(
            observer
                .collect_triggers(&mut tree, None, Instant::now() + RENAME_SETTLE_DELAY)
                .is_empty()
        );
    }
}
