//! Abstract Tree Diff Algorithm
//!
//! Computes the edit script that turns an old abstract tree into a new one.
//! This is a **pure algorithm module**: no live tree access, no side effects,
//! inputs are never mutated.
//!
//! # Architecture: Diff/Patch Separation
//!
//! ```text
//! diff(new, old, serializer) -> EditScript     // Pure data
//!       |
//!       v
//! apply(tree, root, &script, serializer)       // Live tree mutation
//! ```
//!
//! # Algorithm
//!
//! 1. Missing old node -> `Add`, missing new node -> `Remove`
//! 2. Identifier mismatch -> `Replace`, no further descent
//! 3. Matching elements: attribute edits, then children
//! 4. Children: bulk `Add` into an empty list, a single `Remove` clearing a
//!    list, otherwise keyed reconciliation (see [`super::keyed`])
//!
//! # Script ordering
//!
//! Scripts are order-dependent. Every path assumes the operations before it
//! already ran. Within one children list, edits inside matched children come
//! first, then removals, then insertions, then moves. Attribute edits never
//! shift child paths.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attr::{AttrSerializer, AttrValue, AttrsExt};
use crate::error::{DiffError, DiffResult};
use crate::id::compute_identifier;
use crate::node::{AbstractElement, AbstractNode};
use crate::path::{Path, is_reserved_free};

use super::keyed::KeyedPlan;

/// Default maximum nesting depth of matched elements.
const DEFAULT_MAX_DIFF_DEPTH: usize = 500;

/// Default maximum number of edit operations.
const DEFAULT_MAX_OPS: usize = 100_000;

// =============================================================================
// Public Types
// =============================================================================

/// Configuration for diff algorithm limits.
///
/// Owned trees cannot be cyclic, so these limits are the only guard against
/// pathological inputs. Exceeding either one fails the diff; nothing is
/// applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffConfig {
    /// Maximum nesting depth of matched elements.
    /// Default: 500
    pub max_depth: usize,
    /// Maximum number of edit operations.
    /// Default: 100_000
    pub max_ops: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DIFF_DEPTH,
            max_ops: DEFAULT_MAX_OPS,
        }
    }
}

impl DiffConfig {
    /// Create config with custom limits.
    pub fn new(max_depth: usize, max_ops: usize) -> Self {
        Self { max_depth, max_ops }
    }

    /// Create config for large trees (higher limits).
    pub fn large() -> Self {
        Self {
            max_depth: 2_000,
            max_ops: 1_000_000,
        }
    }

    /// Create config for small trees (lower limits, earlier failure).
    pub fn small() -> Self {
        Self {
            max_depth: 100,
            max_ops: 5_000,
        }
    }
}

/// Statistics from a diff
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    /// Number of matched element pairs compared
    pub elements_compared: usize,
    /// Number of matched text pairs compared
    pub text_nodes_compared: usize,
    /// Number of nodes updated in place
    pub nodes_matched: usize,
    /// Number of nodes replaced
    pub nodes_replaced: usize,
    /// Number of nodes appended (`Add`)
    pub nodes_added: usize,
    /// Number of nodes inserted (`Insert`)
    pub nodes_inserted: usize,
    /// Number of nodes removed, counting every child of a cleared list
    pub nodes_removed: usize,
    /// Number of `Move` operations
    pub nodes_moved: usize,
    /// Number of attribute edits
    pub attr_updates: usize,
}

// =============================================================================
// EditOp
// =============================================================================

/// One edit operation.
///
/// Serializes as `{ "type": "<kind>", "path": "...", "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditOp {
    /// Append `node` as the last child of the container at `path`
    Add {
        path: Path,
        #[serde(rename = "data")]
        node: AbstractNode,
    },

    /// Remove the node at `path`, or every child when `path` names a children list
    Remove { path: Path },

    /// Replace the node at `path` with `node`
    Replace {
        path: Path,
        #[serde(rename = "data")]
        node: AbstractNode,
    },

    /// Insert `node` before the node at `path`, appending when nothing is there
    Insert {
        path: Path,
        #[serde(rename = "data")]
        node: AbstractNode,
    },

    /// Move the node at `path` to sibling index `to`
    Move {
        path: Path,
        #[serde(rename = "data")]
        to: usize,
    },

    /// Set the attribute at `path`, `null` meaning remove
    Modify {
        path: Path,
        #[serde(rename = "data")]
        value: AttrValue,
    },
}

impl EditOp {
    /// Path this operation targets.
    pub fn path(&self) -> &Path {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Insert { path, .. }
            | Self::Move { path, .. }
            | Self::Modify { path, .. } => path,
        }
    }

    /// Lowercase operation name, as serialized.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Replace { .. } => "replace",
            Self::Insert { .. } => "insert",
            Self::Move { .. } => "move",
            Self::Modify { .. } => "modify",
        }
    }

    /// True for operations that change the shape of a children list.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Modify { .. })
    }
}

// =============================================================================
// EditScript
// =============================================================================

/// Ordered edit operations plus statistics.
///
/// Operations must be applied in order, exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct EditScript {
    /// Operations in emission order
    pub ops: Vec<EditOp>,
    /// Statistics about the diff
    pub stats: DiffStats,
}

impl EditScript {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditOp> {
        self.ops.iter()
    }

    /// Drop the statistics and keep the operations.
    pub fn into_ops(self) -> Vec<EditOp> {
        self.ops
    }
}

impl IntoIterator for EditScript {
    type Item = EditOp;
    type IntoIter = std::vec::IntoIter<EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = std::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Diff two abstract trees.
///
/// `serializer` decides attribute equality: two values are equal iff they
/// serialize to the same string. Use [`PlainSerializer`](crate::PlainSerializer)
/// for plain string coercion.
///
/// # Example
///
/// ```ignore
/// let script = diff(Some(&new), Some(&old), &PlainSerializer)?;
/// for op in &script {
///     println!("{} {}", op.kind(), op.path());
/// }
/// ```
pub fn diff<S>(
    new: Option<&AbstractNode>,
    old: Option<&AbstractNode>,
    serializer: &S,
) -> DiffResult<EditScript>
where
    S: AttrSerializer + ?Sized,
{
    diff_with_config(new, old, serializer, DiffConfig::default())
}

/// Diff two abstract trees with custom limits.
///
/// # Example
///
/// ```ignore
/// // For very deep generated trees
/// let script = diff_with_config(Some(&new), Some(&old), &PlainSerializer, DiffConfig::large())?;
/// ```
pub fn diff_with_config<S>(
    new: Option<&AbstractNode>,
    old: Option<&AbstractNode>,
    serializer: &S,
    config: DiffConfig,
) -> DiffResult<EditScript>
where
    S: AttrSerializer + ?Sized,
{
    let mut ctx = DiffContext::new(serializer, config);
    ctx.diff_node(old, new, Path::root())?;
    let script = ctx.into_script();
    debug!(ops = script.len(), stats = ?script.stats, "diff complete");
    Ok(script)
}

/// Diff many independent `(new, old)` tree pairs in parallel.
///
/// Each script is still computed sequentially; only the pairs are spread
/// across the rayon pool. Results keep the input order.
#[cfg(feature = "parallel")]
pub fn diff_batch<S>(
    pairs: &[(Option<&AbstractNode>, Option<&AbstractNode>)],
    serializer: &S,
    config: DiffConfig,
) -> Vec<DiffResult<EditScript>>
where
    S: AttrSerializer + Sync + ?Sized,
{
    use rayon::prelude::*;

    pairs
        .par_iter()
        .map(|&(new, old)| diff_with_config(new, old, serializer, config))
        .collect()
}

// =============================================================================
// Internal Context
// =============================================================================

struct DiffContext<'s, S: ?Sized> {
    ops: Vec<EditOp>,
    depth: usize,
    stats: DiffStats,
    config: DiffConfig,
    serializer: &'s S,
}

impl<'s, S> DiffContext<'s, S>
where
    S: AttrSerializer + ?Sized,
{
    fn new(serializer: &'s S, config: DiffConfig) -> Self {
        Self {
            ops: Vec::new(),
            depth: 0,
            stats: DiffStats::default(),
            config,
            serializer,
        }
    }

    fn into_script(self) -> EditScript {
        EditScript {
            ops: self.ops,
            stats: self.stats,
        }
    }

    fn push(&mut self, op: EditOp) -> DiffResult<()> {
        if self.ops.len() >= self.config.max_ops {
            return Err(DiffError::TooManyOps {
                max: self.config.max_ops,
            });
        }
        self.ops.push(op);
        Ok(())
    }

    /// Diff two optional nodes at `path`
    fn diff_node(
        &mut self,
        old: Option<&AbstractNode>,
        new: Option<&AbstractNode>,
        path: Path,
    ) -> DiffResult<()> {
        match (old, new) {
            (None, None) => Ok(()),
            (None, Some(new)) => {
                self.stats.nodes_added += 1;
                self.push(EditOp::Add {
                    path,
                    node: new.clone(),
                })
            }
            (Some(_), None) => {
                self.stats.nodes_removed += 1;
                self.push(EditOp::Remove { path })
            }
            (Some(old), Some(new)) => self.diff_pair(old, new, path),
        }
    }

    /// Diff two present nodes at `path`
    fn diff_pair(&mut self, old: &AbstractNode, new: &AbstractNode, path: Path) -> DiffResult<()> {
        if self.depth > self.config.max_depth {
            return Err(DiffError::DepthExceeded {
                max: self.config.max_depth,
            });
        }

        // Different identity: replace wholesale, never look inside
        if compute_identifier(old) != compute_identifier(new) {
            self.stats.nodes_replaced += 1;
            return self.push(EditOp::Replace {
                path,
                node: new.clone(),
            });
        }

        match (old, new) {
            (AbstractNode::Element(old), AbstractNode::Element(new)) => {
                self.stats.elements_compared += 1;
                self.diff_attrs(old, new, &path)?;
                if !new.ignore_children {
                    self.depth += 1;
                    let result = self.diff_children(old, new, &path);
                    self.depth -= 1;
                    result?;
                }
            }
            // Matching text nodes have equal content by definition
            _ => self.stats.text_nodes_compared += 1,
        }

        self.stats.nodes_matched += 1;
        Ok(())
    }

    /// Diff element attributes: additions, then modifications, then removals
    fn diff_attrs(
        &mut self,
        old: &AbstractElement,
        new: &AbstractElement,
        path: &Path,
    ) -> DiffResult<()> {
        let (old_attrs, new_attrs) = (&old.attributes, &new.attributes);

        for (name, value) in new_attrs {
            if !old_attrs.has_attr(name) {
                self.modify(path, name, value.clone())?;
            }
        }

        for (name, old_value) in old_attrs {
            let Some(new_value) = new_attrs.get_attr(name) else {
                continue;
            };
            if self.serializer.serialize(new_value)? != self.serializer.serialize(old_value)? {
                self.modify(path, name, new_value.clone())?;
            }
        }

        for (name, _) in old_attrs {
            if !new_attrs.has_attr(name) {
                self.modify(path, name, AttrValue::Null)?;
            }
        }

        Ok(())
    }

    fn modify(&mut self, path: &Path, name: &str, value: AttrValue) -> DiffResult<()> {
        if !is_reserved_free(name) {
            return Err(DiffError::ReservedCharacter {
                kind: "attribute",
                name: name.to_string(),
            });
        }
        self.stats.attr_updates += 1;
        self.push(EditOp::Modify {
            path: path.attr(name),
            value,
        })
    }

    /// Diff the present children of two matching elements
    fn diff_children(
        &mut self,
        old: &AbstractElement,
        new: &AbstractElement,
        path: &Path,
    ) -> DiffResult<()> {
        let old_children = old.present_children_vec();
        let new_children = new.present_children_vec();

        // Quick path: fill an empty list
        if old_children.is_empty() {
            let children_path = path.children();
            for child in new_children {
                self.stats.nodes_added += 1;
                self.push(EditOp::Add {
                    path: children_path.clone(),
                    node: child.clone(),
                })?;
            }
            return Ok(());
        }

        // Quick path: clear the whole list in one operation
        if new_children.is_empty() {
            self.stats.nodes_removed += old_children.len();
            return self.push(EditOp::Remove {
                path: path.children(),
            });
        }

        self.diff_keyed_children(&old_children, &new_children, path)
    }

    /// Keyed reconciliation of two non-empty children lists
    fn diff_keyed_children(
        &mut self,
        old_children: &[&AbstractNode],
        new_children: &[&AbstractNode],
        path: &Path,
    ) -> DiffResult<()> {
        let plan = KeyedPlan::new(old_children, new_children);

        // 1. Update matched children in place, at their old positions
        for &(old_idx, new_idx) in &plan.pairs {
            self.diff_pair(old_children[old_idx], new_children[new_idx], path.child(old_idx))?;
        }

        // 2. Remove from the back so earlier indices stay valid
        for &old_idx in plan.removals.iter().rev() {
            self.stats.nodes_removed += 1;
            self.push(EditOp::Remove {
                path: path.child(old_idx),
            })?;
        }

        // 3. Insert at the front, last new child first
        for &new_idx in plan.insertions.iter().rev() {
            self.stats.nodes_inserted += 1;
            self.push(EditOp::Insert {
                path: path.child(0),
                node: new_children[new_idx].clone(),
            })?;
        }

        // 4. Reposition
        for mv in plan.moves() {
            self.stats.nodes_moved += 1;
            self.push(EditOp::Move {
                path: path.child(mv.from),
                to: mv.to,
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
