//! Patch engine
//!
//! Replays an edit script against a live tree, in order, through the
//! [`LiveTree`] primitives. Nodes the script does not mention are never
//! touched, so live state hanging off them (focus, listeners, external
//! attributes) survives a render.
//!
//! # Failure
//!
//! The first operation that cannot be applied stops the script. Earlier
//! operations stay applied; there is no rollback. The returned
//! [`ApplyError`] says where the script stopped.

use tracing::trace;

use crate::algo::EditOp;
use crate::attr::{AttrSerializer, AttrValue};
use crate::error::{ApplyError, ApplyErrorKind, ApplyResult};
use crate::live::{LiveNode, LiveTree, Namespace};
use crate::node::{AbstractElement, AbstractNode, TagKind};
use crate::path::{Path, Segment};

type OpResult<T> = Result<T, ApplyErrorKind>;

/// Apply `ops` to the live subtree rooted at `root`.
///
/// Returns the number of applied operations.
pub fn apply<T, S>(tree: &mut T, root: T::Node, ops: &[EditOp], serializer: &S) -> ApplyResult<usize>
where
    T: LiveTree + ?Sized,
    S: AttrSerializer + ?Sized,
{
    Patcher::new(tree, root, serializer).apply(ops)
}

/// Walk `path` from `root`.
///
/// Children-list segments stay on the current node, indexed segments descend,
/// the attribute segment is ignored. `None` when an index is out of range or
/// a segment is malformed.
pub fn resolve_path<T>(tree: &T, root: T::Node, path: &Path) -> Option<T::Node>
where
    T: LiveTree + ?Sized,
{
    let mut node = root;
    for segment in path.segments() {
        match segment {
            Segment::Children | Segment::Attribute(_) => {}
            Segment::Child(index) => node = tree.child_nodes(node).get(index).copied()?,
            Segment::Malformed(_) => return None,
        }
    }
    Some(node)
}

// =============================================================================
// Patcher
// =============================================================================

/// Stateful patch engine bound to one live subtree.
pub struct Patcher<'a, T, S>
where
    T: LiveTree + ?Sized,
    S: AttrSerializer + ?Sized,
{
    tree: &'a mut T,
    root: T::Node,
    serializer: &'a S,
}

impl<'a, T, S> Patcher<'a, T, S>
where
    T: LiveTree + ?Sized,
    S: AttrSerializer + ?Sized,
{
    pub fn new(tree: &'a mut T, root: T::Node, serializer: &'a S) -> Self {
        Self {
            tree,
            root,
            serializer,
        }
    }

    /// Apply operations in order, stopping at the first failure.
    pub fn apply(&mut self, ops: &[EditOp]) -> ApplyResult<usize> {
        for (index, op) in ops.iter().enumerate() {
            trace!(index, op = op.kind(), path = %op.path(), "applying edit operation");
            self.apply_op(op)
                .map_err(|kind| ApplyError::at(index, kind))?;
        }
        Ok(ops.len())
    }

    /// Apply a single operation.
    pub fn apply_op(&mut self, op: &EditOp) -> OpResult<()> {
        match op {
            EditOp::Add { path, node } => self.add(path, node),
            EditOp::Remove { path } => self.remove(path),
            EditOp::Replace { path, node } => self.replace(path, node),
            EditOp::Insert { path, node } => self.insert(path, node),
            EditOp::Move { path, to } => self.relocate(path, *to),
            EditOp::Modify { path, value } => self.modify(path, value),
        }
    }

    fn resolve(&self, path: &Path) -> OpResult<T::Node> {
        resolve_path(&*self.tree, self.root, path).ok_or_else(|| ApplyErrorKind::Unresolved {
            path: path.clone(),
        })
    }

    fn parent_of(&self, node: T::Node, path: &Path) -> OpResult<T::Node> {
        self.tree
            .parent(node)
            .ok_or_else(|| ApplyErrorKind::Orphan { path: path.clone() })
    }

    fn namespace_of(&self, node: T::Node) -> Namespace {
        match self.tree.view(node) {
            Some(LiveNode::Element { ns, .. }) => ns,
            _ => Namespace::Html,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    fn add(&mut self, path: &Path, node: &AbstractNode) -> OpResult<()> {
        let parent = self.resolve(path)?;
        let ns = self.namespace_of(parent);
        let built = self.build(node, ns)?;
        self.tree.append_child(parent, built)?;
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> OpResult<()> {
        let target = self.resolve(path)?;
        if path.is_children_list() {
            for child in self.tree.child_nodes(target) {
                self.tree.remove_child(target, child)?;
            }
        } else {
            let parent = self.parent_of(target, path)?;
            self.tree.remove_child(parent, target)?;
        }
        Ok(())
    }

    fn replace(&mut self, path: &Path, node: &AbstractNode) -> OpResult<()> {
        let target = self.resolve(path)?;
        let parent = self.parent_of(target, path)?;
        let ns = self.namespace_of(parent);
        let built = self.build(node, ns)?;
        self.tree.insert_before(parent, built, target)?;
        self.tree.remove_child(parent, target)?;
        Ok(())
    }

    fn insert(&mut self, path: &Path, node: &AbstractNode) -> OpResult<()> {
        match resolve_path(&*self.tree, self.root, path) {
            Some(anchor) => {
                let parent = self.parent_of(anchor, path)?;
                let ns = self.namespace_of(parent);
                let built = self.build(node, ns)?;
                self.tree.insert_before(parent, built, anchor)?;
            }
            // Nothing at the anchor yet: append to the container
            None => {
                let parent = self.resolve(&path.parent_container())?;
                let ns = self.namespace_of(parent);
                let built = self.build(node, ns)?;
                self.tree.append_child(parent, built)?;
            }
        }
        Ok(())
    }

    fn relocate(&mut self, path: &Path, to: usize) -> OpResult<()> {
        let target = self.resolve(path)?;
        let parent = self.parent_of(target, path)?;
        let reference = self
            .tree
            .child_nodes(parent)
            .into_iter()
            .filter(|&sibling| sibling != target)
            .nth(to);
        match reference {
            Some(reference) => self.tree.insert_before(parent, target, reference)?,
            None => self.tree.append_child(parent, target)?,
        }
        Ok(())
    }

    fn modify(&mut self, path: &Path, value: &AttrValue) -> OpResult<()> {
        let target = self.resolve(path)?;
        let name = path
            .attribute_name()
            .ok_or_else(|| ApplyErrorKind::MissingAttribute { path: path.clone() })?;
        match self.serializer.serialize(value)? {
            Some(value) => self.tree.set_attribute(target, name, &value)?,
            None => self.tree.remove_attribute(target, name)?,
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node construction
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a detached live subtree for `node`.
    ///
    /// `ns` is the namespace of the future parent; an `svg` element switches
    /// its subtree to the SVG namespace. Null text content builds an empty
    /// text node.
    pub fn build(&mut self, node: &AbstractNode, ns: Namespace) -> OpResult<T::Node> {
        match node {
            AbstractNode::Text(text) => {
                let content = text.to_text().unwrap_or_default();
                Ok(self.tree.create_text(&content))
            }
            AbstractNode::Element(elem) => self.build_element(elem, ns),
        }
    }

    fn build_element(&mut self, elem: &AbstractElement, ns: Namespace) -> OpResult<T::Node> {
        let (live, child_ns) = match elem.kind() {
            TagKind::Fragment => (self.tree.create_fragment(), ns),
            TagKind::Svg => (
                self.tree.create_element_ns(Namespace::Svg, &elem.tag),
                Namespace::Svg,
            ),
            TagKind::Slot | TagKind::Style | TagKind::Generic => {
                (self.tree.create_element_ns(ns, &elem.tag), ns)
            }
        };

        if elem.kind() != TagKind::Fragment {
            for (name, value) in &elem.attributes {
                if let Some(value) = self.serializer.serialize(value)? {
                    self.tree.set_attribute(live, name, &value)?;
                }
            }
            if !elem.event_listeners.is_empty() {
                self.tree.bind_listeners(live, &elem.event_listeners);
            }
        }

        for child in elem.present_children() {
            let built = self.build(child, child_ns)?;
            self.tree.append_child(live, built)?;
        }
        Ok(live)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::diff;
    use crate::attr::{HtmlSerializer, PlainSerializer};
    use crate::error::DomError;
    use crate::live::Dom;
    use serde_json::json;

    fn el(tag: &str) -> AbstractElement {
        AbstractElement::new(tag)
    }

    fn op_path(s: &str) -> Path {
        Path::from(s)
    }

    /// Build `tree`'s children into a fresh `div`.
    fn mount(children: &[AbstractNode]) -> Dom {
        let mut dom = Dom::new("div");
        let root = dom.root();
        let ops: Vec<EditOp> = children
            .iter()
            .map(|node| EditOp::Add {
                path: op_path("/children"),
                node: node.clone(),
            })
            .collect();
        apply(&mut dom, root, &ops, &HtmlSerializer).unwrap();
        dom
    }

    #[test]
    fn test_resolve_path() {
        let dom = mount(&[el("ul").child(el("li")).child(el("li").text("x")).into_node()]);
        let root = dom.root();
        let ul = resolve_path(&dom, root, &op_path("/children#0")).unwrap();
        let li = resolve_path(&dom, root, &op_path("/children#0/children#1")).unwrap();
        assert_eq!(dom.outer_html(li), "<li>x</li>");
        assert_eq!(resolve_path(&dom, root, &op_path("/children#0/children")), Some(ul));
        assert_eq!(resolve_path(&dom, root, &op_path("/children#0.class")), Some(ul));
        assert_eq!(resolve_path(&dom, root, &Path::root()), Some(root));
        assert_eq!(resolve_path(&dom, root, &op_path("/children#4")), None);
        assert_eq!(resolve_path(&dom, root, &op_path("/kids#0")), None);
    }

    #[test]
    fn test_build_serializes_attributes() {
        let node = el("input")
            .attr("disabled", true)
            .attr("hidden", false)
            .attr("value", 5)
            .attr("data", json!({"a": null}))
            .attr("gone", json!(null))
            .into_node();
        let dom = mount(&[node]);
        assert_eq!(
            dom.inner_html(dom.root()),
            "<input disabled=\"\" value=\"5\" data=\"{&quot;a&quot;:null}\" />"
        );
    }

    #[test]
    fn test_build_fragment_svg_and_null_text() {
        let fragment = el("fragment")
            .text("a")
            .child(AbstractNode::null_text())
            .child(el("svg").attr("viewBox", "0 0 1 1").child(el("path").attr("d", "M0")));
        let mut dom = mount(&[fragment.into_node()]);
        let root = dom.root();

        let children = dom.child_nodes(root);
        assert_eq!(children.len(), 3);
        assert_eq!(dom.view(children[1]), Some(LiveNode::Text("")));

        let svg = children[2];
        let path = dom.child_nodes(svg)[0];
        assert!(matches!(dom.view(svg), Some(LiveNode::Element { ns: Namespace::Svg, .. })));
        assert!(matches!(dom.view(path), Some(LiveNode::Element { ns: Namespace::Svg, .. })));
        assert_eq!(dom.attribute(svg, "viewBox"), Some("0 0 1 1"));

        // children built under an svg parent stay in its namespace
        let ops = [EditOp::Add {
            path: op_path("/children#2/children"),
            node: el("circle").into_node(),
        }];
        apply(&mut dom, root, &ops, &HtmlSerializer).unwrap();
        let circle = dom.child_nodes(svg)[1];
        assert!(matches!(dom.view(circle), Some(LiveNode::Element { ns: Namespace::Svg, .. })));
    }

    #[test]
    fn test_remove_children_list_and_single() {
        let mut dom = mount(&[
            el("p").text("a").text("b").into_node(),
            el("p").into_node(),
        ]);
        let root = dom.root();
        let ops = [
            EditOp::Remove {
                path: op_path("/children#0/children"),
            },
            EditOp::Remove {
                path: op_path("/children#1"),
            },
        ];
        assert_eq!(apply(&mut dom, root, &ops, &HtmlSerializer).unwrap(), 2);
        assert_eq!(dom.inner_html(root), "<p></p>");
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut dom = mount(&[
            el("a").into_node(),
            el("b").into_node(),
            el("c").into_node(),
        ]);
        let root = dom.root();
        let ops = [EditOp::Replace {
            path: op_path("/children#1"),
            node: el("i").text("new").into_node(),
        }];
        apply(&mut dom, root, &ops, &HtmlSerializer).unwrap();
        assert_eq!(dom.inner_html(root), "<a></a><i>new</i><c></c>");
    }

    #[test]
    fn test_insert_before_anchor_or_append() {
        let mut dom = mount(&[el("ul").into_node()]);
        let root = dom.root();
        let ops = [
            // empty list: the anchor is missing, append instead
            EditOp::Insert {
                path: op_path("/children#0/children#0"),
                node: el("li").text(2).into_node(),
            },
            EditOp::Insert {
                path: op_path("/children#0/children#0"),
                node: el("li").text(1).into_node(),
            },
        ];
        apply(&mut dom, root, &ops, &HtmlSerializer).unwrap();
        assert_eq!(dom.inner_html(root), "<ul><li>1</li><li>2</li></ul>");
    }

    #[test]
    fn test_move_splices_at_target() {
        let mut dom = mount(&[
            AbstractNode::text("a"),
            AbstractNode::text("b"),
            AbstractNode::text("c"),
            AbstractNode::text("d"),
        ]);
        let root = dom.root();
        let mv = |from: &str, to| EditOp::Move {
            path: op_path(from),
            to,
        };

        apply(&mut dom, root, &[mv("/children#0", 2)], &HtmlSerializer).unwrap();
        assert_eq!(dom.inner_html(root), "bcad");
        apply(&mut dom, root, &[mv("/children#3", 0)], &HtmlSerializer).unwrap();
        assert_eq!(dom.inner_html(root), "dbca");
        apply(&mut dom, root, &[mv("/children#0", 3)], &HtmlSerializer).unwrap();
        assert_eq!(dom.inner_html(root), "bcad");
    }

    #[test]
    fn test_modify_sets_and_removes() {
        let mut dom = mount(&[el("p").attr("a", "1").into_node()]);
        let root = dom.root();
        let ops = [
            EditOp::Modify {
                path: op_path("/children#0.b"),
                value: json!(true),
            },
            EditOp::Modify {
                path: op_path("/children#0.a"),
                value: json!(null),
            },
            EditOp::Modify {
                path: op_path("/children#0.c"),
                value: json!(false),
            },
        ];
        apply(&mut dom, root, &ops, &HtmlSerializer).unwrap();
        assert_eq!(dom.inner_html(root), "<p b=\"\"></p>");

        let err = apply(
            &mut dom,
            root,
            &[EditOp::Modify {
                path: op_path("/children#0"),
                value: json!(1),
            }],
            &HtmlSerializer,
        )
        .unwrap_err();
        assert!(matches!(err.kind, ApplyErrorKind::MissingAttribute { .. }));
    }

    #[test]
    fn test_stale_script_stops_without_rollback() {
        let old = el("div")
            .child(el("p").attr("n", 1))
            .child(el("span").attr("n", 1))
            .into_node();
        let new = el("div")
            .child(el("p").attr("n", 2))
            .child(el("span").attr("n", 2))
            .into_node();
        let script = diff(Some(&new), Some(&old), &PlainSerializer).unwrap();
        assert_eq!(script.len(), 2);

        let mut dom = mount(&old.as_element().unwrap().present_children().cloned().collect::<Vec<_>>());
        let root = dom.root();
        // external removal of the span
        let span = dom.child_nodes(root)[1];
        dom.remove_child(root, span).unwrap();

        let err = apply(&mut dom, root, &script.ops, &HtmlSerializer).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.applied, 1);
        assert!(matches!(err.kind, ApplyErrorKind::Unresolved { .. }));
        // the first modify stays applied
        assert_eq!(dom.inner_html(root), "<p n=\"2\"></p>");
    }

    #[test]
    fn test_primitive_failure_is_reported() {
        let mut dom = mount(&[AbstractNode::text("t")]);
        let root = dom.root();
        let ops = [EditOp::Modify {
            path: op_path("/children#0.a"),
            value: json!("x"),
        }];
        let err = apply(&mut dom, root, &ops, &HtmlSerializer).unwrap_err();
        assert!(matches!(err.kind, ApplyErrorKind::Dom(DomError::NotAnElement)));

        let err = apply(&mut dom, root, &[EditOp::Remove { path: Path::root() }], &HtmlSerializer)
            .unwrap_err();
        assert!(matches!(err.kind, ApplyErrorKind::Orphan { .. }));
    }
}
