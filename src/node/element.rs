//! Abstract element - tag, attributes, children and identity key
//!
//! The core building block of the abstract tree.

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::attr::{AttrValue, Attrs, AttrsExt, attrs_equivalent, serde_attrs};

use super::{AbstractNode, Children, Content, TagKind, present};

// =============================================================================
// Event listeners
// =============================================================================

/// Opaque event handler carried through diffing and patching.
///
/// Handlers are never compared by the diff engine; equality is pointer identity.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&str) + Send + Sync>);

impl Handler {
    /// Wrap a callback taking the event name.
    pub fn new(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invoke the handler.
    pub fn call(&self, event: &str) {
        (self.0)(event)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Event name to handler mapping, in registration order.
pub type EventListeners = Vec<(CompactString, Handler)>;

// =============================================================================
// AbstractElement
// =============================================================================

/// Element node of an abstract tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbstractElement {
    /// Tag name
    pub tag: CompactString,
    /// Attributes, in emission order
    #[serde(default, with = "serde_attrs", skip_serializing_if = "Vec::is_empty")]
    pub attributes: Attrs,
    /// Child nodes, `None` entries are skipped
    #[serde(default, skip_serializing_if = "smallvec::SmallVec::is_empty")]
    pub children: Children,
    /// When set, children are never diffed or touched
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_children: bool,
    /// Explicit identity key, overrides attribute-derived keys
    #[serde(default, rename = "_key", skip_serializing_if = "Option::is_none")]
    pub key: Option<CompactString>,
    /// Event handlers, carried through but never compared
    #[serde(skip)]
    pub event_listeners: EventListeners,
}

impl AbstractElement {
    /// Create an empty element.
    pub fn new(tag: impl Into<CompactString>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Wrap into an [`AbstractNode`].
    pub fn into_node(self) -> AbstractNode {
        AbstractNode::from(self)
    }

    /// Classify this element's tag.
    #[inline]
    pub fn kind(&self) -> TagKind {
        TagKind::of(&self.tag)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builders
    // ─────────────────────────────────────────────────────────────────────────

    /// Add or update an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.set_attr(name, value);
        self
    }

    /// Set the explicit identity key
    pub fn key(mut self, key: impl Into<CompactString>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append a child node
    pub fn child(mut self, child: impl Into<AbstractNode>) -> Self {
        self.children.push(Some(child.into()));
        self
    }

    /// Append a hole (null child)
    pub fn hole(mut self) -> Self {
        self.children.push(None);
        self
    }

    /// Append a text child
    pub fn text(self, content: impl Into<Content>) -> Self {
        self.child(AbstractNode::text(content))
    }

    /// Append several children
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<AbstractNode>,
    {
        self.children
            .extend(children.into_iter().map(|c| Some(c.into())));
        self
    }

    /// Mark children as unmanaged
    pub fn ignore_children(mut self) -> Self {
        self.ignore_children = true;
        self
    }

    /// Register an event handler
    pub fn on(mut self, event: impl Into<CompactString>, handler: Handler) -> Self {
        self.event_listeners.push((event.into(), handler));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get attribute value by name (case-insensitive)
    pub fn get_attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get_attr(name)
    }

    /// Iterate present children, skipping holes
    pub fn present_children(&self) -> impl Iterator<Item = &AbstractNode> {
        present(&self.children)
    }

    /// Collect present children into a vector of references
    pub fn present_children_vec(&self) -> Vec<&AbstractNode> {
        self.present_children().collect()
    }

    /// Number of present children
    pub fn child_count(&self) -> usize {
        self.present_children().count()
    }

    /// Check if element has no present children
    pub fn is_empty(&self) -> bool {
        self.child_count() == 0
    }

    /// Look up the handler registered for an event
    pub fn listener(&self, event: &str) -> Option<&Handler> {
        self.event_listeners
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, h)| h)
    }
}

/// Structural equality: tag, key, flag, attributes as an unordered
/// case-insensitive set, and present children in order. Listeners are ignored.
impl PartialEq for AbstractElement {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.key == other.key
            && self.ignore_children == other.ignore_children
            && attrs_equivalent(&self.attributes, &other.attributes)
            && self.present_children().eq(other.present_children())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_element_builder() {
        let elem = AbstractElement::new("div")
            .attr("id", "main")
            .attr("data-n", 3)
            .child(AbstractElement::new("span"))
            .hole()
            .text("Hello");

        assert_eq!(elem.tag, "div");
        assert_eq!(elem.get_attr("ID"), Some(&json!("main")));
        assert_eq!(elem.children.len(), 3);
        assert_eq!(elem.child_count(), 2);
        assert!(!elem.is_empty());
        assert_eq!(elem.kind(), TagKind::Generic);
    }

    #[test]
    fn test_equality_ignores_attribute_order_and_holes() {
        let a = AbstractElement::new("p")
            .attr("a", "1")
            .attr("b", "2")
            .text("x");
        let b = AbstractElement::new("p")
            .attr("B", "2")
            .attr("a", "1")
            .hole()
            .text("x");
        assert_eq!(a, b);

        let c = a.clone().attr("b", "3");
        assert_ne!(a, c);
    }

    #[test]
    fn test_listeners_carried_not_compared() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = Handler::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let with = AbstractElement::new("button").on("click", handler);
        let without = AbstractElement::new("button");
        assert_eq!(with, without);

        with.listener("click").unwrap().call("click");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(with.listener("focus").is_none());
    }
}
