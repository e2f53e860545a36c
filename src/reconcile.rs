//! Render orchestration
//!
//! [`Reconciler::render`] runs one full render cycle against a live root:
//!
//! 1. snapshot the live subtree ([`parse::snapshot`])
//! 2. wrap the desired content as the children of a copy of the snapshot's
//!    root, so only children and their descendants are compared
//! 3. diff the two trees
//! 4. apply the edit script
//! 5. rebind event listeners of the nodes the render produced
//!
//! Failures never escape: a diff failure leaves the live tree untouched and
//! dispatches [`RenderEvent::DiffFailed`] on the root, an apply failure keeps
//! whatever was applied and dispatches [`RenderEvent::ApplyFailed`]. The
//! returned [`RenderOutcome`] carries the error for callers that want it.
//!
//! Each render re-snapshots the live tree, so a render following an
//! external edit or a failed render starts from the actual state.

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::algo::{DiffConfig, DiffStats, EditScript, diff_with_config};
use crate::attr::{AttrSerializer, HtmlSerializer};
use crate::error::{ApplyError, DiffError, DiffResult};
use crate::event::RenderEvent;
use crate::live::{LiveNode, LiveTree};
use crate::node::{AbstractElement, AbstractNode, Children, TagKind, present};
use crate::parse;
use crate::patch;

/// Emitter id used when none is configured.
pub const DEFAULT_NAME: &str = "Unknown";

// =============================================================================
// Configuration
// =============================================================================

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Emitter id carried by render failure events.
    /// Default: "Unknown"
    pub name: String,
    /// Limits applied to every diff.
    pub diff: DiffConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            diff: DiffConfig::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Default configuration with the given emitter id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::default().with_name(name)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_diff(mut self, diff: DiffConfig) -> Self {
        self.diff = diff;
        self
    }
}

// =============================================================================
// Input / outcome
// =============================================================================

/// Desired content of a live root: an ordered list of nodes, holes allowed.
///
/// Built from a single node, an optional node (`None` clears the root) or a
/// list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderInput(pub Children);

impl RenderInput {
    /// No content; rendering it clears the root.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn into_children(self) -> Children {
        self.0
    }
}

impl From<AbstractNode> for RenderInput {
    fn from(node: AbstractNode) -> Self {
        Self(smallvec::smallvec![Some(node)])
    }
}

impl From<AbstractElement> for RenderInput {
    fn from(elem: AbstractElement) -> Self {
        Self::from(elem.into_node())
    }
}

impl From<Option<AbstractNode>> for RenderInput {
    fn from(node: Option<AbstractNode>) -> Self {
        Self(node.into_iter().map(Some).collect())
    }
}

impl From<Vec<AbstractNode>> for RenderInput {
    fn from(nodes: Vec<AbstractNode>) -> Self {
        Self(nodes.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<AbstractNode>>> for RenderInput {
    fn from(nodes: Vec<Option<AbstractNode>>) -> Self {
        Self(SmallVec::from_vec(nodes))
    }
}

impl From<Children> for RenderInput {
    fn from(children: Children) -> Self {
        Self(children)
    }
}

/// What one render did.
#[derive(Debug)]
#[must_use]
pub enum RenderOutcome {
    /// Every operation of the edit script was applied
    Rendered {
        /// Number of applied operations
        applied: usize,
        /// Statistics of the diff
        stats: DiffStats,
    },
    /// No edit script; the live tree is untouched
    DiffFailed(DiffError),
    /// The edit script stopped part way
    ApplyFailed(ApplyError),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }

    pub fn is_diff_failed(&self) -> bool {
        matches!(self, Self::DiffFailed(_))
    }

    pub fn is_apply_failed(&self) -> bool {
        matches!(self, Self::ApplyFailed(_))
    }

    /// Number of operations that reached the live tree.
    pub fn applied(&self) -> usize {
        match self {
            Self::Rendered { applied, .. } => *applied,
            Self::DiffFailed(_) => 0,
            Self::ApplyFailed(err) => err.applied,
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Renders abstract content into live roots.
///
/// Holds no per-root state; one reconciler can serve any number of roots, as
/// long as renders into the same root do not interleave.
#[derive(Debug, Clone)]
pub struct Reconciler<S = HtmlSerializer> {
    config: ReconcilerConfig,
    serializer: S,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }
}

impl Reconciler {
    /// Reconciler with the HTML attribute policy, reporting as `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(ReconcilerConfig::new(name))
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        Self {
            config,
            serializer: HtmlSerializer,
        }
    }
}

impl<S: AttrSerializer> Reconciler<S> {
    /// Swap the attribute serializer used by both diff and patch.
    pub fn with_serializer<S2: AttrSerializer>(self, serializer: S2) -> Reconciler<S2> {
        Reconciler {
            config: self.config,
            serializer,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Compute the edit script a render of `input` would apply, without
    /// touching the live tree.
    pub fn plan<T>(&self, tree: &T, root: T::Node, input: impl Into<RenderInput>) -> DiffResult<EditScript>
    where
        T: LiveTree + ?Sized,
    {
        self.prepare(tree, root, input.into().0)
            .map(|(_, script)| script)
    }

    /// Render `input` as the content of `root`.
    pub fn render<T>(&self, tree: &mut T, root: T::Node, input: impl Into<RenderInput>) -> RenderOutcome
    where
        T: LiveTree + ?Sized,
    {
        let (desired, script) = match self.prepare(&*tree, root, input.into().0) {
            Ok(prepared) => prepared,
            Err(error) => {
                warn!(emitter = %self.config.name, %error, "diff failed, live tree left untouched");
                tree.dispatch(root, RenderEvent::diff_failed(self.config.name.as_str()));
                return RenderOutcome::DiffFailed(error);
            }
        };

        match patch::apply(tree, root, &script.ops, &self.serializer) {
            Ok(applied) => {
                if let Some(desired) = desired.as_element() {
                    sync_listeners(tree, root, &desired.children);
                }
                debug!(emitter = %self.config.name, applied, "render complete");
                RenderOutcome::Rendered {
                    applied,
                    stats: script.stats,
                }
            }
            Err(error) => {
                warn!(
                    emitter = %self.config.name,
                    applied = error.applied,
                    %error,
                    "edit script partially applied"
                );
                tree.dispatch(root, RenderEvent::apply_failed(self.config.name.as_str()));
                RenderOutcome::ApplyFailed(error)
            }
        }
    }

    /// Snapshot `root` and diff it against `children`.
    fn prepare<T>(&self, tree: &T, root: T::Node, children: Children) -> DiffResult<(AbstractNode, EditScript)>
    where
        T: LiveTree + ?Sized,
    {
        if let Some(view) = tree.view(root)
            && !view.is_container()
        {
            return Err(DiffError::InvalidRoot(format!("{view:?}")));
        }

        let current = parse::snapshot(tree, root)?;
        let AbstractNode::Element(snapshot) = &current else {
            return Err(DiffError::InvalidRoot("text node".to_string()));
        };

        // Same identity and attributes as the live root: only children differ
        let desired = AbstractElement {
            tag: snapshot.tag.clone(),
            attributes: snapshot.attributes.clone(),
            children,
            ..AbstractElement::default()
        }
        .into_node();

        let script = diff_with_config(Some(&desired), Some(&current), &self.serializer, self.config.diff)?;
        debug!(emitter = %self.config.name, ops = script.len(), "edit script computed");

        Ok((desired, script))
    }
}

/// Bind the listeners of the desired nodes to the live nodes now holding
/// their place.
///
/// Matched nodes survive a render with the listeners they had, so handlers
/// are replaced wholesale after every successful apply. Fragments are
/// flattened the way live trees splice them.
fn sync_listeners<T>(tree: &mut T, parent: T::Node, children: &[Option<AbstractNode>])
where
    T: LiveTree + ?Sized,
{
    let mut desired = Vec::new();
    flatten_fragments(children, &mut desired);

    let live = tree.child_nodes(parent);
    for (node, live) in desired.into_iter().zip(live) {
        let Some(elem) = node.as_element() else {
            continue;
        };
        let same_tag = matches!(
            tree.view(live),
            Some(LiveNode::Element { tag, .. }) if tag.eq_ignore_ascii_case(&elem.tag)
        );
        if !same_tag {
            continue;
        }
        tree.bind_listeners(live, &elem.event_listeners);
        if !elem.ignore_children {
            sync_listeners(tree, live, &elem.children);
        }
    }
}

fn flatten_fragments<'a>(children: &'a [Option<AbstractNode>], out: &mut Vec<&'a AbstractNode>) {
    for child in present(children) {
        match child.as_element() {
            Some(elem) if elem.kind() == TagKind::Fragment => flatten_fragments(&elem.children, out),
            _ => out.push(child),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrValue;
    use crate::error::{ApplyErrorKind, AttrError};
    use crate::id::SECTION_ID;
    use crate::live::Dom;
    use crate::node::Handler;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn el(tag: &str) -> AbstractElement {
        AbstractElement::new(tag)
    }

    fn counter() -> (Arc<AtomicUsize>, Handler) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let handler = Handler::new(move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[test]
    fn test_render_null_and_text() {
        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let root = dom.root();

        assert!(reconciler.render(&mut dom, root, None::<AbstractNode>).is_rendered());
        assert_eq!(dom.inner_html(root), "");

        assert!(reconciler.render(&mut dom, root, AbstractNode::text("aaa")).is_rendered());
        assert_eq!(dom.inner_html(root), "aaa");

        // None clears again
        assert!(reconciler.render(&mut dom, root, RenderInput::empty()).is_rendered());
        assert_eq!(dom.inner_html(root), "");
    }

    #[test]
    fn test_render_non_matching_elements() {
        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let root = dom.root();

        let _ = reconciler.render(&mut dom, root, el("span").attr(SECTION_ID, "aaa"));
        assert_eq!(dom.inner_html(root), "<span data-section-id=\"aaa\"></span>");

        let _ = reconciler.render(&mut dom, root, el("div").attr(SECTION_ID, "aaa"));
        assert_eq!(dom.inner_html(root), "<div data-section-id=\"aaa\"></div>");
        assert_eq!(dom.child_nodes(root).len(), 1);
    }

    #[test]
    fn test_render_heals_external_removal() {
        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let root = dom.root();
        let content = el("span").attr(SECTION_ID, "aaa").into_node();

        let _ = reconciler.render(&mut dom, root, content.clone());
        let span = dom.find_element(root, "span").unwrap();
        dom.remove_child(root, span).unwrap();
        assert_eq!(dom.inner_html(root), "");

        assert!(reconciler.render(&mut dom, root, content).is_rendered());
        assert_eq!(dom.inner_html(root), "<span data-section-id=\"aaa\"></span>");
    }

    #[test]
    fn test_render_matching_elements_attributes() {
        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let root = dom.root();

        let first = el("span")
            .attr(SECTION_ID, "aaa")
            .attr("toRemove", json!({"lala": null}))
            .attr("toModify", true)
            .attr("toIgnore", 3);
        let _ = reconciler.render(&mut dom, root, first);
        assert_eq!(
            dom.inner_html(root),
            "<span data-section-id=\"aaa\" toremove=\"{&quot;lala&quot;:null}\" tomodify=\"\" toignore=\"3\"></span>"
        );

        let span = dom.find_element(root, "span").unwrap();
        dom.set_attribute(span, "test", "should-remove-even-if-not-in-original-ast")
            .unwrap();

        let second = el("span")
            .attr(SECTION_ID, "aaa")
            .attr("toModify", 5)
            .attr("toIgnore", 3)
            .attr("toAdd", 4);
        assert!(reconciler.render(&mut dom, root, second).is_rendered());
        assert_eq!(
            dom.inner_html(root),
            "<span data-section-id=\"aaa\" tomodify=\"5\" toignore=\"3\" toadd=\"4\"></span>"
        );
        // the element itself survived
        assert_eq!(dom.find_element(root, "span"), Some(span));
    }

    #[test]
    fn test_render_matching_elements_children() {
        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let root = dom.root();

        let first = el("span")
            .child(el("div"))
            .child(el("span").attr("width", 3))
            .child(el("slot").attr("name", "aaa"))
            .text(3);
        let _ = reconciler.render(&mut dom, root, first);
        assert_eq!(
            dom.inner_html(root),
            "<span><div></div><span width=\"3\"></span><slot name=\"aaa\"></slot>3</span>"
        );

        let outer = dom.find_element(root, "span").unwrap();
        let slot = dom.find_element(root, "slot").unwrap();
        dom.set_attribute(outer, "test", "should-not-do-complete-rerender")
            .unwrap();
        dom.set_attribute(slot, "test", "should-not-do-complete-rerender")
            .unwrap();

        let second = el("span")
            .text("AA")
            .child(el("span").attr("width", 20))
            .child(el("div").attr("height", 5))
            .child(el("div"))
            .child(el("slot").attr("name", "aaa").attr("color", "blue"));
        assert!(reconciler.render(&mut dom, root, second).is_rendered());
        assert_eq!(
            dom.inner_html(root),
            "<span>AA<span width=\"20\"></span><div height=\"5\"></div><div></div><slot name=\"aaa\" color=\"blue\"></slot></span>"
        );
        // matched nodes were updated in place
        assert_eq!(dom.find_element(root, "span"), Some(outer));
        assert_eq!(dom.find_element(root, "slot"), Some(slot));
    }

    #[test]
    fn test_render_matching_elements_listeners() {
        let (focus_count, focus) = counter();
        let (click_count, click) = counter();
        let (other_click_count, other_click) = counter();

        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let root = dom.root();

        let first = el("span")
            .on("click", click)
            .child(el("div").on("focus", focus.clone()));
        let _ = reconciler.render(&mut dom, root, first);

        let span = dom.find_element(root, "span").unwrap();
        let inner = dom.find_element(span, "div").unwrap();
        assert!(dom.fire(span, "click"));
        assert!(dom.fire(inner, "focus"));
        assert_eq!(click_count.load(Ordering::SeqCst), 1);
        assert_eq!(focus_count.load(Ordering::SeqCst), 1);

        let second = el("span").child(el("div").on("focus", focus).on("click", other_click));
        assert!(reconciler.render(&mut dom, root, second).is_rendered());

        let span = dom.find_element(root, "span").unwrap();
        let inner = dom.find_element(span, "div").unwrap();
        // the span lost its click handler
        assert!(!dom.fire(span, "click"));
        assert_eq!(click_count.load(Ordering::SeqCst), 1);
        // the div kept focus and gained click
        assert!(dom.fire(inner, "focus"));
        assert!(dom.fire(inner, "click"));
        assert_eq!(focus_count.load(Ordering::SeqCst), 2);
        assert_eq!(other_click_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_into_fragment_root() {
        let reconciler = Reconciler::new("shadow");
        let mut dom = Dom::fragment();
        let root = dom.root();

        let content = vec![
            el("style").attr("data-stylesheet", "main").text(".a { color: red }").into_node(),
            el("fragment").child(el("p").text("x")).child(el("p").text("y")).into_node(),
        ];
        assert!(reconciler.render(&mut dom, root, content).is_rendered());
        assert_eq!(
            dom.inner_html(root),
            "<style data-stylesheet=\"main\">.a { color: red }</style><p>x</p><p>y</p>"
        );

        // the stylesheet is compared as markup and left alone
        let again = vec![el("style").attr("data-stylesheet", "main").text(".a { color: red }").into_node()];
        let script = reconciler.plan(&dom, root, again).unwrap();
        assert_eq!(script.len(), 2);
        assert!(script.iter().all(|op| matches!(op, crate::EditOp::Remove { .. })));
    }

    #[test]
    fn test_diff_failure_dispatches_event() {
        let reconciler = Reconciler::with_config(
            ReconcilerConfig::new("limited").with_diff(DiffConfig::new(500, 2)),
        );
        let mut dom = Dom::new("div");
        let root = dom.root();

        let content = vec![el("a").into_node(), el("b").into_node(), el("c").into_node()];
        let outcome = reconciler.render(&mut dom, root, content);
        assert!(matches!(outcome, RenderOutcome::DiffFailed(DiffError::TooManyOps { max: 2 })));
        assert_eq!(outcome.applied(), 0);
        assert_eq!(dom.inner_html(root), "");
        assert_eq!(dom.events(root), &[RenderEvent::diff_failed("limited")]);
    }

    #[test]
    fn test_diff_failure_on_text_root() {
        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let text = dom.create_text("t");
        let outcome = reconciler.render(&mut dom, text, AbstractNode::text("x"));
        assert!(matches!(outcome, RenderOutcome::DiffFailed(DiffError::InvalidRoot(_))));
        assert_eq!(dom.events(text)[0].name(), "TemplateDiffErrorEvent");
    }

    #[test]
    fn test_apply_failure_keeps_applied_ops() {
        let refuse_arrays = |value: &AttrValue| -> Result<Option<String>, AttrError> {
            match value {
                AttrValue::Array(_) => Err(AttrError::unserializable("arrays are not allowed")),
                other => HtmlSerializer.serialize(other),
            }
        };
        let reconciler = Reconciler::new("menu").with_serializer(refuse_arrays);
        let mut dom = Dom::new("div");
        let root = dom.root();

        let content = vec![el("a").into_node(), el("b").attr("list", json!([1, 2])).into_node()];
        let outcome = reconciler.render(&mut dom, root, content);
        let RenderOutcome::ApplyFailed(err) = outcome else {
            panic!("expected an apply failure");
        };
        assert_eq!(err.index, 1);
        assert!(matches!(err.kind, ApplyErrorKind::Serializer(_)));
        assert_eq!(dom.inner_html(root), "<a></a>");

        let events = dom.take_events(root);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "TemplateRenderErrorEvent");
        assert_eq!(events[0].emitter().id, "menu");

        // the next render starts from the partial state and completes it
        let content = vec![el("a").into_node(), el("b").attr("list", "1,2").into_node()];
        assert!(reconciler.render(&mut dom, root, content).is_rendered());
        assert_eq!(dom.inner_html(root), "<a></a><b list=\"1,2\"></b>");
        assert!(dom.events(root).is_empty());
    }

    #[test]
    fn test_render_svg_subtree() {
        let reconciler = Reconciler::default();
        let mut dom = Dom::new("div");
        let root = dom.root();

        let icon = el("svg")
            .attr("viewBox", "0 0 24 24")
            .child(el("linearGradient").attr("gradientUnits", "userSpaceOnUse"));
        let _ = reconciler.render(&mut dom, root, icon.clone());
        assert_eq!(
            dom.inner_html(root),
            "<svg viewBox=\"0 0 24 24\"><linearGradient gradientUnits=\"userSpaceOnUse\"></linearGradient></svg>"
        );

        // a second identical render is a no-op
        let script = reconciler.plan(&dom, root, icon).unwrap();
        assert!(script.is_empty());
    }

    fn arb_content() -> impl Strategy<Value = AbstractNode> {
        let tags = prop::sample::select(vec!["div", "span", "p", "ul", "li", "slot", "b"]);
        let leaf = prop_oneof![
            "[a-z]{0,3}".prop_map(AbstractNode::text),
            tags.clone().prop_map(AbstractNode::element),
        ];
        leaf.prop_recursive(3, 24, 4, move |inner| {
            (
                tags.clone(),
                prop::collection::btree_map("[a-z]{1,3}", "[a-z0-9]{0,3}", 0..3),
                prop::collection::vec(inner, 0..4),
            )
                .prop_map(|(tag, attrs, children)| {
                    let mut elem = AbstractElement::new(tag);
                    for (name, value) in attrs {
                        elem = elem.attr(name, value);
                    }
                    elem.children(children).into_node()
                })
        })
    }

    proptest! {
        #[test]
        fn prop_render_round_trip(
            first in prop::collection::vec(arb_content(), 0..4),
            second in prop::collection::vec(arb_content(), 0..4),
        ) {
            let reconciler = Reconciler::default();
            let mut dom = Dom::new("div");
            let root = dom.root();

            prop_assert!(reconciler.render(&mut dom, root, first).is_rendered());
            prop_assert!(reconciler.render(&mut dom, root, second.clone()).is_rendered());

            let expected = AbstractElement::new("div").children(second).into_node();
            prop_assert_eq!(parse::snapshot(&dom, root).unwrap(), expected);
        }
    }
}
