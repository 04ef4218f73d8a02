use std::collections::BTreeMap;

use crate::builders::patterns::{FOLDER_TITLE_CLASS, PATH_ATTRIBUTE};
use crate::builders::selector::{SelectorError, SelectorList, SelectorTarget};
use crate::core::events::{EventBus, EventKind, HostEvent, HostEvents, Subscription, SubscriptionId};

/// Class of a folder's wrapper in the file explorer. The wrapper holds the
/// title row and the children container.
pub const FOLDER_CONTAINER_CLASS: &str = "nav-folder";
pub const FOLDER_CHILDREN_CLASS: &str = "nav-folder-children";
pub const FILES_CONTAINER_CLASS: &str = "nav-files-container";
pub const ROOT_FOLDER_CLASS: &str = "mod-root";

/// Handle to a node of a host tree. Only meaningful for the tree that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A child-list change, as reported to a mutation observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The node whose children changed.
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

/// The slice of the host's UI tree the plugin reads and writes.
///
/// Every method tolerates stale or foreign `NodeId`s: reads return nothing
/// and writes are dropped, since the host may have discarded a node between
/// a query and the write that follows it.
pub trait FolderTree {
    /// All connected elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError>;
    /// All connected elements carrying `class`, in document order.
    fn elements_by_class(&self, class: &str) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    /// `false` for text nodes.
    fn is_element(&self, node: NodeId) -> bool;
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);
    fn style(&self, node: NodeId, property: &str) -> Option<String>;
    /// Sets an inline style property; an empty value removes it.
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element { tag: String },
    Text,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl SelectorTarget for Node {
    fn tag_name(&self) -> &str {
        match &self.kind {
            NodeKind::Element { tag } => tag,
            NodeKind::Text => "#text",
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// The nodes making up one folder in the file explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderNodes {
    /// `div.nav-folder`, the element the hidden effect is written to.
    pub wrapper: NodeId,
    /// `div.nav-folder-title[data-path]`, the element rules match.
    pub title: NodeId,
    /// `div.nav-folder-children`, where sub-folders are appended.
    pub children: NodeId,
}

/// An in-memory document standing in for the host's rendered UI.
///
/// Child-list changes are buffered as `MutationRecord`s and delivered as one
/// batch per `flush`, the way a browser delivers them at the end of a task.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    root: NodeId,
    pending: Vec<MutationRecord>,
    bus: EventBus,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Element {
                tag: "body".to_string(),
            })],
            root: NodeId(0),
            pending: Vec::new(),
            bus: EventBus::new(),
        }
    }

    /// Builds a file explorer rendering every folder in `paths`.
    ///
    /// Parents are created on demand, so `["a/b"]` renders `a` and `a/b`.
    /// Mutation records produced while building are discarded.
    pub fn from_folder_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        let root_children = tree.mount_explorer();
        for path in paths {
            tree.ensure_folder(root_children, path.as_ref());
        }
        tree.pending.clear();
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(NodeKind::Element {
            tag: tag.to_string(),
        }));
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_text(&mut self) -> NodeId {
        self.nodes.push(Node::new(NodeKind::Text));
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a `div` carrying `classes`.
    pub fn create_div(&mut self, classes: &[&str]) -> NodeId {
        let id = self.create_element("div");
        for class in classes {
            self.add_class(id, class);
        }
        id
    }

    /// Moves `child` under `parent`, recording the removal from its previous
    /// parent and the addition to the new one.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        if self.ancestors(parent).any(|a| a == child) {
            return;
        }

        if let Some(old_parent) = self.nodes[child.0].parent {
            self.detach(old_parent, child);
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.pending.push(MutationRecord {
            target: parent,
            added_nodes: vec![child],
            removed_nodes: Vec::new(),
        });
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(child).and_then(|n| n.parent) == Some(parent) {
            self.detach(parent, child);
        }
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.retain(|c| *c != child);
        self.nodes[child.0].parent = None;
        self.pending.push(MutationRecord {
            target: parent,
            added_nodes: Vec::new(),
            removed_nodes: vec![child],
        });
    }

    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |n| self.parent(*n))
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        node == self.root || self.ancestors(node).any(|a| a == self.root)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).and_then(|n| n.attribute(name))
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(node) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Connected nodes in document order.
    fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Creates the explorer scaffolding under the root and returns the
    /// children container of the vault's root folder.
    pub fn mount_explorer(&mut self) -> NodeId {
        let container = self.create_div(&[FILES_CONTAINER_CLASS]);
        let root_folder = self.create_div(&[FOLDER_CONTAINER_CLASS, ROOT_FOLDER_CLASS]);
        let root_children = self.create_div(&[FOLDER_CHILDREN_CLASS]);

        self.append_child(self.root, container);
        self.append_child(container, root_folder);
        self.append_child(root_folder, root_children);
        root_children
    }

    /// Renders one folder under `parent_children`, the way the explorer does
    /// when a folder is created or its parent is expanded.
    pub fn add_folder(&mut self, parent_children: NodeId, path: &str) -> FolderNodes {
        let wrapper = self.create_div(&[FOLDER_CONTAINER_CLASS]);
        let title = self.create_div(&[FOLDER_TITLE_CLASS]);
        self.set_attribute(title, PATH_ATTRIBUTE, path);
        let children = self.create_div(&[FOLDER_CHILDREN_CLASS]);

        self.append_child(wrapper, title);
        self.append_child(wrapper, children);
        self.append_child(parent_children, wrapper);

        FolderNodes {
            wrapper,
            title,
            children,
        }
    }

    /// Looks up the rendered folder whose title has exactly `path`.
    pub fn folder(&self, path: &str) -> Option<FolderNodes> {
        let title = self.descendants().into_iter().find(|id| {
            let node = &self.nodes[id.0];
            node.has_class(FOLDER_TITLE_CLASS) && node.attribute(PATH_ATTRIBUTE) == Some(path)
        })?;
        let wrapper = self.parent(title)?;
        let children = self
            .children(wrapper)
            .iter()
            .copied()
            .find(|c| self.has_class(*c, FOLDER_CHILDREN_CLASS))?;

        Some(FolderNodes {
            wrapper,
            title,
            children,
        })
    }

    fn ensure_folder(&mut self, root_children: NodeId, path: &str) -> Option<FolderNodes> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return None;
        }
        if let Some(existing) = self.folder(path) {
            return Some(existing);
        }

        let parent_children = match path.rsplit_once('/') {
            Some((parent, _)) => self.ensure_folder(root_children, parent)?.children,
            None => root_children,
        };
        Some(self.add_folder(parent_children, path))
    }

    /// Renames a folder: rewrites the path attribute of the folder and of
    /// everything rendered below it, then announces the rename.
    ///
    /// # Returns
    /// The number of title rows whose path changed.
    pub fn rename_folder(&mut self, old_path: &str, new_path: &str) -> usize {
        let nested_prefix = format!("{old_path}/");
        let mut renamed = 0;

        for node in &mut self.nodes {
            let Some(path) = node.attributes.get_mut(PATH_ATTRIBUTE) else {
                continue;
            };
            if *path == old_path {
                *path = new_path.to_string();
                renamed += 1;
            } else if let Some(rest) = path.strip_prefix(&nested_prefix) {
                *path = format!("{new_path}/{rest}");
                renamed += 1;
            }
        }

        self.bus.emit(HostEvent::Rename {
            path: new_path.to_string(),
            old_path: old_path.to_string(),
        });
        renamed
    }

    /// Delivers the buffered mutation records as one batch.
    ///
    /// # Returns
    /// The number of records in the batch.
    pub fn flush(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let batch = std::mem::take(&mut self.pending);
        let count = batch.len();
        if self.bus.subscriber_count(EventKind::TreeMutations) > 0 {
            self.bus.emit(HostEvent::Mutations(batch));
        }
        count
    }
}

impl FolderTree for DomTree {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = SelectorList::parse(selector)?;
        if selector.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .descendants()
            .into_iter()
            .filter(|id| {
                let node = &self.nodes[id.0];
                matches!(node.kind, NodeKind::Element { .. }) && selector.matches(node)
            })
            .collect())
    }

    fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|id| self.nodes[id.0].has_class(class))
            .collect()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.node(node).map(|n| &n.kind),
            Some(NodeKind::Element { .. })
        )
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).is_some_and(|n| n.has_class(class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(node) = self.node_mut(node)
            && !node.has_class(class)
        {
            node.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(node) = self.node_mut(node) {
            node.classes.retain(|c| c != class);
        }
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.node(node).and_then(|n| n.style.get(property).cloned())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(node) = self.node_mut(node) {
            if value.is_empty() {
                node.style.remove(property);
            } else {
                node.style.insert(property.to_string(), value.to_string());
            }
        }
    }
}

impl HostEvents for DomTree {
    fn subscribe(&mut self, kind: EventKind) -> Subscription {
        self.bus.subscribe(kind)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }
}
