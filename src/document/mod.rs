//! Document capability: the review page as a queryable, mutable node tree
//!
//! The pipeline never touches a browser DOM directly. It reads and writes through
//! [`Document`], which has a small set of required primitives and builds selector queries,
//! text walking and `closest` lookups on top of them. [`MemoryDocument`] is the in-memory
//! implementation used by the CLI (via [`html::parse_html`]) and by tests.

pub mod html;
pub mod memory;
pub mod selector;

pub use memory::MemoryDocument;
pub use selector::SelectorList;

use crate::error::Result;
use serde::Serialize;
use std::fmt;

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
}

/// What changed in an observed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList { added: Vec<NodeId> },
    Attribute { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

/// Subscription to document mutations.
pub trait MutationObserver {
    /// Start recording mutations. May fail if the document is not ready yet.
    fn observe(&mut self) -> Result<()>;
    /// Stop recording. Mutations made while disconnected are never reported.
    fn disconnect(&mut self);
    fn is_observing(&self) -> bool;
    /// Drain the mutations recorded since the last call.
    fn take_records(&mut self) -> Vec<MutationRecord>;
}

/// A mutable node tree with DOM-like query helpers.
pub trait Document {
    fn root(&self) -> NodeId;
    fn kind(&self, node: NodeId) -> NodeKind;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> &[NodeId];
    /// Lowercase tag name for elements, `None` otherwise.
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    /// Character data of text and comment nodes.
    fn text(&self, node: NodeId) -> Option<&str>;

    /// Whether the page is currently shown to the user.
    fn is_visible(&self) -> bool {
        true
    }

    /// Give a live source the chance to pull in new content while a caller polls.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    /// Append `child` as the last child of `parent`, detaching it from any previous parent.
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    /// Insert `child` immediately before `reference`, which must be a child of `parent`.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()>;
    /// Put `new` where `old` was and detach `old`.
    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> Result<()>;

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == NodeKind::Element
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// All nodes below `scope` in document order, `scope` itself excluded.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Ancestors of `node`, nearest first.
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// Concatenated text of every text node under `node`.
    fn text_content(&self, node: NodeId) -> String {
        if self.kind(node) == NodeKind::Text {
            return self.text(node).unwrap_or_default().to_string();
        }
        self.text_nodes(node).into_iter().filter_map(|n| self.text(n)).collect()
    }

    /// Text nodes under `scope` in document order.
    fn text_nodes(&self, scope: NodeId) -> Vec<NodeId> {
        self.descendants(scope).into_iter().filter(|n| self.kind(*n) == NodeKind::Text).collect()
    }

    fn matches(&self, node: NodeId, selector: &SelectorList) -> bool {
        selector.matches(self, node)
    }

    /// `node` itself or its nearest ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &SelectorList) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|n| self.is_element(*n) && selector.matches(self, *n))
    }

    /// Elements below `scope` matching `selector`, in document order and without duplicates.
    fn query_selector_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.is_element(*n) && selector.matches(self, *n))
            .collect()
    }

    fn query_selector(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|n| self.is_element(*n) && selector.matches(self, *n))
    }
}
