//! Live tree snapshots
//!
//! Mirrors the current shape of a live subtree as an abstract tree, so the
//! diff engine can compare what is on screen with what should be. Every
//! render snapshots afresh, which is what lets a render heal external edits
//! made since the previous one.
//!
//! Mapping:
//!
//! | Live node | Abstract node |
//! |-----------|---------------|
//! | text | text with the same content |
//! | comment | childless `comment` element |
//! | fragment | `fragment` element with the mirrored children |
//! | `style` element | element whose only child is its raw inner markup |
//! | other element | element with string attributes and mirrored children |

use crate::error::DomError;
use crate::live::{LiveNode, LiveTree, Namespace};
use crate::node::{AbstractElement, AbstractNode, TagKind};
use crate::render;

/// Tag given to snapshotted comments.
pub const COMMENT_TAG: &str = "comment";

/// Tag given to snapshotted fragments.
pub const FRAGMENT_TAG: &str = "fragment";

/// Snapshot the live subtree rooted at `node`.
pub fn snapshot<T>(tree: &T, node: T::Node) -> Result<AbstractNode, DomError>
where
    T: LiveTree + ?Sized,
{
    let view = tree.view(node).ok_or(DomError::StaleNode)?;
    Ok(match view {
        LiveNode::Text(text) => AbstractNode::text(text),
        LiveNode::Comment(_) => AbstractElement::new(COMMENT_TAG).into_node(),
        LiveNode::Fragment => snapshot_children(tree, node, AbstractElement::new(FRAGMENT_TAG))?,
        LiveNode::Element { tag, ns, attrs } => {
            let tag = match ns {
                Namespace::Html => tag.to_ascii_lowercase(),
                Namespace::Svg => tag.to_string(),
            };
            let mut elem = AbstractElement::new(tag);
            elem.attributes = attrs
                .iter()
                .map(|(name, value)| (name.clone(), value.as_str().into()))
                .collect();
            elem.event_listeners = tree.listeners(node);

            if elem.kind() == TagKind::Style {
                // Stylesheet content is compared as markup, never as nodes
                let css = render::inner_html(tree, node);
                if !css.is_empty() {
                    elem = elem.text(css);
                }
                elem.into_node()
            } else {
                snapshot_children(tree, node, elem)?
            }
        }
    })
}

fn snapshot_children<T>(tree: &T, node: T::Node, mut elem: AbstractElement) -> Result<AbstractNode, DomError>
where
    T: LiveTree + ?Sized,
{
    for child in tree.child_nodes(node) {
        elem.children.push(Some(snapshot(tree, child)?));
    }
    Ok(elem.into_node())
}
