//! Arena-backed in-memory document

use super::{Document, MutationKind, MutationObserver, MutationRecord, NodeId, NodeKind};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    tag: Option<String>,
    attributes: Vec<(String, String)>,
    text: Option<String>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            tag: None,
            attributes: Vec::new(),
            text: None,
        }
    }
}

/// An in-memory node tree that also acts as its own mutation observer.
///
/// Detached nodes stay in the arena; they are simply unreachable from the root.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    visible: bool,
    observing: bool,
    records: Vec<MutationRecord>,
    failing_observes: usize,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            visible: true,
            observing: false,
            records: Vec::new(),
            failing_observes: 0,
        }
    }

    /// Create an element with attributes and append it to `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let node = self.create_element(tag);
        for (name, value) in attributes {
            self.nodes[node.0].attributes.push((name.to_ascii_lowercase(), value.to_string()));
        }
        self.append_child(parent, node);
        node
    }

    /// Append a text node to `parent`.
    pub fn text_child(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    /// Append `text` to `parent`, extending its last child when that is already a text node.
    pub(crate) fn push_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if self.nodes[last.0].kind == NodeKind::Text {
                self.nodes[last.0].text.get_or_insert_with(String::new).push_str(text);
                return;
            }
        }
        self.text_child(parent, text);
    }

    /// Append a comment node to `parent`.
    pub fn comment_child(&mut self, parent: NodeId, text: &str) -> NodeId {
        let node = self.alloc(NodeData {
            text: Some(text.to_string()),
            ..NodeData::new(NodeKind::Comment)
        });
        self.append_child(parent, node);
        node
    }

    /// Attributes of `node` in source order.
    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        &self.nodes[node.0].attributes
    }

    /// Simulate the page being hidden or shown.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Make the next `attempts` calls to [`MutationObserver::observe`] fail.
    pub fn fail_observe_attempts(&mut self, attempts: usize) {
        self.failing_observes = attempts;
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        if self.observing {
            self.records.push(MutationRecord { target, kind });
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    fn position_in(&self, parent: NodeId, child: NodeId) -> Result<usize> {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(Error::Detached(child.0))
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.0].kind
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].tag.as_deref()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0]
            .attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].text.as_deref()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData {
            tag: Some(tag.to_ascii_lowercase()),
            ..NodeData::new(NodeKind::Element)
        })
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData {
            text: Some(text.to_string()),
            ..NodeData::new(NodeKind::Text)
        })
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let attributes = &mut self.nodes[node.0].attributes;
        match attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attributes.push((name.clone(), value.to_string())),
        }
        self.record(node, MutationKind::Attribute { name });
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record(parent, MutationKind::ChildList { added: vec![child] });
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> Result<()> {
        self.position_in(parent, reference)?;
        self.detach(child);
        let idx = self.position_in(parent, reference)?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(idx, child);
        self.record(parent, MutationKind::ChildList { added: vec![child] });
        Ok(())
    }

    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> Result<()> {
        self.position_in(parent, old)?;
        self.detach(new);
        let idx = self.position_in(parent, old)?;
        self.nodes[parent.0].children[idx] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        self.record(parent, MutationKind::ChildList { added: vec![new] });
        Ok(())
    }
}

impl MutationObserver for MemoryDocument {
    fn observe(&mut self) -> Result<()> {
        if self.failing_observes > 0 {
            self.failing_observes -= 1;
            return Err(Error::ObserverUnavailable("document body not ready".to_string()));
        }
        self.observing = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.observing = false;
    }

    fn is_observing(&self) -> bool {
        self.observing
    }

    fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }
}
