//! Node identity for matching
//!
//! Two nodes are "matching" (updated in place rather than replaced) iff their
//! identifiers are equal:
//! - **Elements**: `tag:<tag>-identifier:<key>` where the key is the explicit
//!   `_key`, else a tag-specific attribute:
//!   - any tag: [`SECTION_ID`]
//!   - `slot`: then its `name` attribute
//!   - `style`: then its [`STYLESHEET_ATTR`] attribute
//!
//!   and `undefined` when none is present.
//! - **Text**: `content:<content>` (`null` for null content)
//!
//! # Design Decision
//!
//! Matching never looks at attribute values or children. Two keyless `div`s
//! always match each other, so siblings of the same tag are updated in place
//! in document order instead of being rebuilt. Semantic precision is traded
//! for stable live nodes.

use std::fmt;

use crate::attr::key_string;
use crate::node::{AbstractElement, AbstractNode, TagKind};

/// Attribute used as the identity key of any element.
pub const SECTION_ID: &str = "data-section-id";

/// Attribute used as the identity key of `style` elements.
pub const STYLESHEET_ATTR: &str = "data-stylesheet";

/// Placeholder key of elements without one.
const UNDEFINED_KEY: &str = "undefined";

// =============================================================================
// Identifier
// =============================================================================

/// Computed identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Public API
// =============================================================================

/// True iff the node carries no scalar content.
#[inline]
pub fn is_element(node: &AbstractNode) -> bool {
    node.is_element()
}

/// Compute the identifier of a node.
pub fn compute_identifier(node: &AbstractNode) -> Identifier {
    match node {
        AbstractNode::Element(elem) => {
            let key = element_key(elem);
            Identifier(format!(
                "tag:{}-identifier:{}",
                elem.tag,
                key.as_deref().unwrap_or(UNDEFINED_KEY)
            ))
        }
        AbstractNode::Text(text) => match text.to_text() {
            Some(content) => Identifier(format!("content:{content}")),
            None => Identifier("content:null".to_string()),
        },
    }
}

/// Identifier equality. Missing nodes never match anything.
pub fn nodes_match(a: Option<&AbstractNode>, b: Option<&AbstractNode>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => compute_identifier(a) == compute_identifier(b),
        _ => false,
    }
}

fn element_key(elem: &AbstractElement) -> Option<String> {
    if let Some(key) = &elem.key {
        return Some(key.to_string());
    }
    let attr_key = |name: &str| elem.get_attr(name).and_then(key_string);
    attr_key(SECTION_ID).or_else(|| match elem.kind() {
        TagKind::Slot => attr_key("name"),
        TagKind::Style => attr_key(STYLESHEET_ATTR),
        TagKind::Fragment | TagKind::Svg | TagKind::Generic => None,
    })
}

// =============================================================================
// Tests
// =============================================================================
