//! DOM nodes.
//!
//! A minimal element tree: element nodes with ordered attributes, text
//! nodes, weak parent links and owned child lists. Node handles are cheap
//! clones of the same underlying node.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;

/// Errors raised by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node is not a child of this parent")]
    NotAChild,

    #[error("hierarchy request error: {0}")]
    HierarchyRequest(&'static str),
}

/// What kind of node this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag: String },
    Text,
}

struct NodeData {
    kind: NodeKind,
    attributes: RwLock<IndexMap<String, String>>,
    text: RwLock<String>,
    parent: RwLock<Weak<NodeData>>,
    children: RwLock<Vec<Node>>,
}

/// Handle to a node in a tree.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeData>,
}

impl Node {
    fn with_kind(kind: NodeKind, text: String) -> Self {
        Self {
            inner: Arc::new(NodeData {
                kind,
                attributes: RwLock::new(IndexMap::new()),
                text: RwLock::new(text),
                parent: RwLock::new(Weak::new()),
                children: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Create a detached element. Tag names are lowercased.
    pub fn element(tag: &str) -> Self {
        Self::with_kind(
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            String::new(),
        )
    }

    /// Create a detached text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Text, content.into())
    }

    pub fn kind(&self) -> &NodeKind {
        &self.inner.kind
    }

    /// Tag name for elements, `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.inner.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Text => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Text)
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.read().get(name).cloned()
    }

    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        self.inner
            .attributes
            .write()
            .insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.write().shift_remove(name)
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.inner
            .attributes
            .read()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self.inner.kind {
            NodeKind::Text => self.inner.text.read().clone(),
            NodeKind::Element { .. } => self
                .children()
                .iter()
                .map(Node::text_content)
                .collect(),
        }
    }

    /// Replace the text of a text node, or the children of an element with
    /// a single text node.
    pub fn set_text(&self, content: impl Into<String>) {
        match self.inner.kind {
            NodeKind::Text => *self.inner.text.write() = content.into(),
            NodeKind::Element { .. } => {
                for child in self.children() {
                    child.detach();
                }
                let text = Node::text(content);
                *text.inner.parent.write() = Arc::downgrade(&self.inner);
                self.inner.children.write().push(text);
            }
        }
    }

    pub fn parent(&self) -> Option<Node> {
        self.inner.parent.read().upgrade().map(|inner| Node { inner })
    }

    pub fn children(&self) -> Vec<Node> {
        self.inner.children.read().clone()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.read().len()
    }

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Append `child` as the last child, moving it out of any previous
    /// parent first.
    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        self.check_insert(child)?;
        child.detach();
        *child.inner.parent.write() = Arc::downgrade(&self.inner);
        self.inner.children.write().push(child.clone());
        Ok(())
    }

    /// Remove `child` from this node.
    pub fn remove_child(&self, child: &Node) -> Result<Node, DomError> {
        let removed = {
            let mut children = self.inner.children.write();
            let index = children
                .iter()
                .position(|node| node.ptr_eq(child))
                .ok_or(DomError::NotAChild)?;
            children.remove(index)
        };
        *removed.inner.parent.write() = Weak::new();
        Ok(removed)
    }

    /// Put `new_child` where `old_child` is, returning `old_child`.
    pub fn replace_child(&self, new_child: &Node, old_child: &Node) -> Result<Node, DomError> {
        if new_child.ptr_eq(old_child) {
            return Ok(old_child.clone());
        }
        self.check_insert(new_child)?;
        if !self.owns(old_child) {
            return Err(DomError::NotAChild);
        }

        new_child.detach();
        {
            let mut children = self.inner.children.write();
            let index = children
                .iter()
                .position(|node| node.ptr_eq(old_child))
                .ok_or(DomError::NotAChild)?;
            children[index] = new_child.clone();
        }
        *old_child.inner.parent.write() = Weak::new();
        *new_child.inner.parent.write() = Arc::downgrade(&self.inner);
        Ok(old_child.clone())
    }

    /// Remove this node from its parent. Returns false when it had none.
    pub fn detach(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove_child(self).is_ok(),
            None => false,
        }
    }

    /// Descendant text nodes in document order.
    pub fn text_nodes(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect_text_nodes(&mut out);
        out
    }

    fn collect_text_nodes(&self, out: &mut Vec<Node>) {
        for child in self.children() {
            if child.is_text() {
                out.push(child);
            } else {
                child.collect_text_nodes(out);
            }
        }
    }

    fn owns(&self, child: &Node) -> bool {
        self.inner
            .children
            .read()
            .iter()
            .any(|node| node.ptr_eq(child))
    }

    fn check_insert(&self, child: &Node) -> Result<(), DomError> {
        if self.is_text() {
            return Err(DomError::HierarchyRequest("text nodes cannot have children"));
        }
        if child.contains(self) {
            return Err(DomError::HierarchyRequest("node would become its own ancestor"));
        }
        Ok(())
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serializes the subtree back to markup.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            NodeKind::Text => f.write_str(&escape(&self.inner.text.read(), false)),
            NodeKind::Element { tag } => {
                write!(f, "<{tag}")?;
                for (name, value) in self.attributes() {
                    write!(f, " {name}=\"{}\"", escape(&value, true))?;
                }
                f.write_str(">")?;
                if super::parse::is_void(tag) {
                    return Ok(());
                }
                for child in self.children() {
                    write!(f, "{child}")?;
                }
                write!(f, "</{tag}>")
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({self})")
    }
}
