//! Live trees
//!
//! A live tree is the mutable, externally owned structure the patch engine
//! edits in place. The engine only needs the small capability set of
//! [`LiveTree`]: node creation, four mutation primitives, attribute
//! edits and ordered read access. [`Dom`] is the in-memory implementation.

mod dom;

pub use dom::{Dom, DomElement, DomNode};

use std::fmt;

use smallvec::SmallVec;

use crate::error::DomError;
use crate::event::RenderEvent;
use crate::node::EventListeners;

// =============================================================================
// Namespace
// =============================================================================

/// Element namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
}

impl Namespace {
    pub fn url(self) -> &'static str {
        match self {
            Self::Html => "http://www.w3.org/1999/xhtml",
            Self::Svg => "http://www.w3.org/2000/svg",
        }
    }

    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/2000/svg" => Self::Svg,
            _ => Self::Html,
        }
    }
}

// =============================================================================
// LiveNode
// =============================================================================

/// Read-only view of one live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveNode<'a> {
    /// Element with its attributes in document order
    Element {
        tag: &'a str,
        ns: Namespace,
        attrs: &'a [(String, String)],
    },
    /// Text node
    Text(&'a str),
    /// Document fragment or shadow-root-like container
    Fragment,
    /// Comment
    Comment(&'a str),
}

impl<'a> LiveNode<'a> {
    /// Tag name, for elements.
    pub fn tag(&self) -> Option<&'a str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// True for nodes that may hold children.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Element { .. } | Self::Fragment)
    }
}

// =============================================================================
// LiveTree
// =============================================================================

/// Capabilities the patch engine, parser and orchestrator need from a live tree.
///
/// Inserting a fragment moves its children instead of the fragment itself.
/// Inserting a node that already has a parent moves it.
pub trait LiveTree {
    /// Node handle, cheap to copy.
    type Node: Copy + Eq + fmt::Debug;

    /// Create a detached element in the HTML namespace.
    fn create_element(&mut self, tag: &str) -> Self::Node {
        self.create_element_ns(Namespace::Html, tag)
    }

    /// Create a detached element in `ns`.
    fn create_element_ns(&mut self, ns: Namespace, tag: &str) -> Self::Node;

    /// Create a detached, empty fragment.
    fn create_fragment(&mut self) -> Self::Node;

    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> Self::Node;

    fn append_child(&mut self, parent: Self::Node, child: Self::Node) -> Result<(), DomError>;

    /// Insert `child` into `parent` right before `reference`.
    fn insert_before(
        &mut self,
        parent: Self::Node,
        child: Self::Node,
        reference: Self::Node,
    ) -> Result<(), DomError>;

    fn remove_child(&mut self, parent: Self::Node, child: Self::Node) -> Result<(), DomError>;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str) -> Result<(), DomError>;

    /// Remove an attribute. Removing a missing attribute is not an error.
    fn remove_attribute(&mut self, node: Self::Node, name: &str) -> Result<(), DomError>;

    /// Children in order. Empty for stale handles.
    fn child_nodes(&self, node: Self::Node) -> SmallVec<[Self::Node; 8]>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// View a node, `None` for stale handles.
    fn view(&self, node: Self::Node) -> Option<LiveNode<'_>>;

    /// Replace the event handlers bound to `node`.
    fn bind_listeners(&mut self, _node: Self::Node, _listeners: &EventListeners) {}

    /// Event handlers bound to `node`.
    fn listeners(&self, _node: Self::Node) -> EventListeners {
        EventListeners::new()
    }

    /// Deliver a render event to observers of `node`.
    fn dispatch(&mut self, node: Self::Node, event: RenderEvent);
}
