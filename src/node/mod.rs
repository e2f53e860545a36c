//! Abstract tree model.
//!
//! `AbstractNode` is the serializable, diffable description of a tree
//! fragment: either an element or a scalar text/content node. Trees are
//! immutable snapshots built fresh for each render; nothing in the crate
//! mutates a tree it is given.
//!
//! # JSON shape
//!
//! ```text
//! { "tag": "div", "attributes": { "id": "a" }, "children": [ { "content": 3 }, null ] }
//! ```
//!
//! `null` children are allowed and ignored by every consumer.

mod element;
mod text;

pub use element::{AbstractElement, EventListeners, Handler};
pub use text::{AbstractText, Content};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node in an abstract tree - either Element or Text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AbstractNode {
    Element(Box<AbstractElement>),
    Text(AbstractText),
}

impl AbstractNode {
    // Generates for each variant (element -> Element, text -> Text):
    //   - is_xxx(&self) -> bool
    //   - as_xxx(&self) -> Option<&Type>
    //   - as_xxx_mut(&mut self) -> Option<&mut Type>
    impl_enum_accessors!(element: AbstractElement, text: AbstractText);

    /// Create a text node.
    pub fn text(content: impl Into<Content>) -> Self {
        Self::Text(AbstractText::new(content))
    }

    /// Create a text node with null content.
    pub fn null_text() -> Self {
        Self::Text(AbstractText::null())
    }

    /// Create a childless, attribute-less element.
    pub fn element(tag: &str) -> Self {
        AbstractElement::new(tag).into_node()
    }
}

impl From<AbstractElement> for AbstractNode {
    fn from(element: AbstractElement) -> Self {
        Self::Element(Box::new(element))
    }
}

impl From<AbstractText> for AbstractNode {
    fn from(text: AbstractText) -> Self {
        Self::Text(text)
    }
}

/// Children collection. `None` entries are holes that consumers skip.
pub type Children = SmallVec<[Option<AbstractNode>; 4]>;

/// Iterate the present children, skipping holes.
pub fn present(children: &[Option<AbstractNode>]) -> impl Iterator<Item = &AbstractNode> {
    children.iter().flatten()
}

// =============================================================================
// TagKind
// =============================================================================

/// Tags with special meaning to identity or node construction.
///
/// Dispatch happens on this enum, never on ad hoc tag string comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `fragment`: a childful container that dissolves into its parent
    Fragment,
    /// `svg`: its subtree lives in the SVG namespace
    Svg,
    /// `slot`: identified by its `name` attribute
    Slot,
    /// `style`: identified by its stylesheet attribute, content kept as raw markup
    Style,
    /// Any other tag
    Generic,
}

impl TagKind {
    /// Classify a tag name.
    pub fn of(tag: &str) -> Self {
        match tag {
            "fragment" => Self::Fragment,
            "svg" => Self::Svg,
            "slot" => Self::Slot,
            "style" => Self::Style,
            _ => Self::Generic,
        }
    }
}
