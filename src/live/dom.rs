//! Arena-backed in-memory live tree.
//!
//! All nodes live in one `indextree` arena; handles are `NodeId`s. Detached
//! nodes stay in the arena and can be reattached, like DOM nodes removed by
//! script.

use indextree::{Arena, NodeId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::DomError;
use crate::event::RenderEvent;
use crate::node::EventListeners;
use crate::render;

use super::{LiveNode, LiveTree, Namespace};

/// What goes in each arena slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    /// Element with tag and attributes
    Element(DomElement),
    /// Text content
    Text(String),
    /// Fragment, dissolved when inserted
    Fragment,
    /// Comment
    Comment(String),
}

/// Element data (tag + attributes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomElement {
    pub tag: String,
    pub ns: Namespace,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
}

impl DomElement {
    /// Attribute names are case-insensitive in the HTML namespace.
    fn normalize(&self, name: &str) -> String {
        match self.ns {
            Namespace::Html => name.to_ascii_lowercase(),
            Namespace::Svg => name.to_string(),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        let name = self.normalize(name);
        self.attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory live tree
#[derive(Debug, Clone)]
pub struct Dom {
    arena: Arena<DomNode>,
    root: NodeId,
    listeners: FxHashMap<NodeId, EventListeners>,
    events: FxHashMap<NodeId, Vec<RenderEvent>>,
}

impl Dom {
    /// Create a tree whose root is an HTML element.
    pub fn new(root_tag: &str) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(DomNode::Element(DomElement {
            tag: root_tag.to_ascii_lowercase(),
            ns: Namespace::Html,
            attrs: Vec::new(),
        }));
        Self::with_root(arena, root)
    }

    /// Create a tree whose root is a fragment, like a shadow root.
    pub fn fragment() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(DomNode::Fragment);
        Self::with_root(arena, root)
    }

    fn with_root(arena: Arena<DomNode>, root: NodeId) -> Self {
        Self {
            arena,
            root,
            listeners: FxHashMap::default(),
            events: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get node data, `None` for stale handles
    pub fn get(&self, id: NodeId) -> Option<&DomNode> {
        self.arena
            .get(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get())
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut DomNode, DomError> {
        self.arena
            .get_mut(id)
            .filter(|node| !node.is_removed())
            .map(|node| node.get_mut())
            .ok_or(DomError::StaleNode)
    }

    fn check(&self, id: NodeId) -> Result<&DomNode, DomError> {
        self.get(id).ok_or(DomError::StaleNode)
    }

    fn check_container(&self, id: NodeId) -> Result<(), DomError> {
        match self.check(id)? {
            DomNode::Element(_) | DomNode::Fragment => Ok(()),
            DomNode::Text(_) | DomNode::Comment(_) => {
                Err(DomError::Hierarchy("node cannot have children".to_string()))
            }
        }
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.arena.new_node(DomNode::Comment(text.to_string()))
    }

    /// First descendant element with `tag`, in document order.
    pub fn find_element(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        from.descendants(&self.arena).skip(1).find(|&id| {
            matches!(self.get(id), Some(DomNode::Element(elem)) if elem.tag.eq_ignore_ascii_case(tag))
        })
    }

    /// Attribute value of an element.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match self.get(node)? {
            DomNode::Element(elem) => elem.get_attr(name),
            _ => None,
        }
    }

    /// Render events dispatched on `node`, oldest first.
    pub fn events(&self, node: NodeId) -> &[RenderEvent] {
        self.events.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Drain the render events dispatched on `node`.
    pub fn take_events(&mut self, node: NodeId) -> Vec<RenderEvent> {
        self.events.remove(&node).unwrap_or_default()
    }

    /// Invoke the handler bound to `node` for `event`.
    ///
    /// Returns `false` when no handler is bound.
    pub fn fire(&self, node: NodeId, event: &str) -> bool {
        let handler = self
            .listeners
            .get(&node)
            .and_then(|bound| bound.iter().find(|(name, _)| name == event));
        match handler {
            Some((_, handler)) => {
                handler.call(event);
                true
            }
            None => false,
        }
    }

    /// Markup of the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        render::inner_html(self, node)
    }

    /// Markup of `node` itself.
    pub fn outer_html(&self, node: NodeId) -> String {
        render::outer_html(self, node)
    }

    /// Nodes to insert for `child`: a fragment's children, or `child` itself.
    fn dissolve(&self, child: NodeId) -> SmallVec<[NodeId; 8]> {
        match self.get(child) {
            Some(DomNode::Fragment) => child.children(&self.arena).collect(),
            _ => smallvec::smallvec![child],
        }
    }
}

fn hierarchy(err: indextree::NodeError) -> DomError {
    DomError::Hierarchy(format!("{err:?}"))
}

impl LiveTree for Dom {
    type Node = NodeId;

    fn create_element_ns(&mut self, ns: Namespace, tag: &str) -> NodeId {
        let tag = match ns {
            Namespace::Html => tag.to_ascii_lowercase(),
            Namespace::Svg => tag.to_string(),
        };
        self.arena.new_node(DomNode::Element(DomElement {
            tag,
            ns,
            attrs: Vec::new(),
        }))
    }

    fn create_fragment(&mut self) -> NodeId {
        self.arena.new_node(DomNode::Fragment)
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(DomNode::Text(text.to_string()))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_container(parent)?;
        self.check(child)?;
        for node in self.dissolve(child) {
            parent
                .checked_append(node, &mut self.arena)
                .map_err(hierarchy)?;
        }
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_container(parent)?;
        self.check(child)?;
        if self.parent(reference) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        if child == reference {
            return Ok(());
        }
        for node in self.dissolve(child) {
            reference
                .checked_insert_before(node, &mut self.arena)
                .map_err(hierarchy)?;
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        child.detach(&mut self.arena);
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let DomNode::Element(elem) = self.get_mut(node)? else {
            return Err(DomError::NotAnElement);
        };
        let name = elem.normalize(name);
        match elem.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(attr) => attr.1 = value.to_string(),
            None => elem.attrs.push((name, value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let DomNode::Element(elem) = self.get_mut(node)? else {
            return Err(DomError::NotAnElement);
        };
        let name = elem.normalize(name);
        elem.attrs.retain(|(k, _)| *k != name);
        Ok(())
    }

    fn child_nodes(&self, node: NodeId) -> SmallVec<[NodeId; 8]> {
        if self.get(node).is_none() {
            return SmallVec::new();
        }
        node.children(&self.arena).collect()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena
            .get(node)
            .filter(|n| !n.is_removed())
            .and_then(|n| n.parent())
    }

    fn view(&self, node: NodeId) -> Option<LiveNode<'_>> {
        Some(match self.get(node)? {
            DomNode::Element(elem) => LiveNode::Element {
                tag: &elem.tag,
                ns: elem.ns,
                attrs: &elem.attrs,
            },
            DomNode::Text(text) => LiveNode::Text(text),
            DomNode::Fragment => LiveNode::Fragment,
            DomNode::Comment(text) => LiveNode::Comment(text),
        })
    }

    fn bind_listeners(&mut self, node: NodeId, listeners: &EventListeners) {
        if listeners.is_empty() {
            self.listeners.remove(&node);
        } else {
            self.listeners.insert(node, listeners.clone());
        }
    }

    fn listeners(&self, node: NodeId) -> EventListeners {
        self.listeners.get(&node).cloned().unwrap_or_default()
    }

    fn dispatch(&mut self, node: NodeId, event: RenderEvent) {
        self.events.entry(node).or_default().push(event);
    }
}
