//! tola-reconcile - Keyed reconciliation of abstract trees into live trees
//!
//! ## Core Concepts
//!
//! **Two phases**: the diff engine compares an old and a new [`AbstractNode`]
//! tree and emits an ordered [`EditScript`]; the patch engine replays that
//! script against a [`LiveTree`] using a handful of mutation primitives,
//! leaving every node the script does not mention untouched.
//!
//! **Identity**: nodes are matched by a computed [`Identifier`] (tag plus key,
//! or text content), never by position or attribute content.
//!
//! ## Modules
//! - `node`: abstract tree model (`AbstractNode`, `AbstractElement`, `AbstractText`)
//! - `id`: node identity (`compute_identifier`, `nodes_match`)
//! - `path`: edit-script path encoding (`/children#2.title`)
//! - `algo`: diff engine and keyed child matching
//! - `live`: live tree capability trait and the in-memory `Dom`
//! - `patch`: patch engine
//! - `parse`: live tree to abstract tree snapshots
//! - `reconcile`: the render orchestrator
//! - `styles`: stylesheet rule cache with change notifications
//!
//! ## Usage
//!
//! ```ignore
//! use tola_reconcile::prelude::*;
//!
//! let mut dom = Dom::new("div");
//! let root = dom.root();
//! let reconciler = Reconciler::new("greeting");
//!
//! let hello = AbstractElement::new("p").text("Hello").into_node();
//! let outcome = reconciler.render(&mut dom, root, hello);
//! assert!(outcome.is_rendered());
//! assert_eq!(dom.inner_html(root), "<p>Hello</p>");
//! ```

#[macro_use]
mod macros;

// =============================================================================
// Core modules
// =============================================================================

/// Attribute values, ordered attribute lists and serializers
pub mod attr;

/// Abstract tree model: AbstractNode, AbstractElement, AbstractText
pub mod node;

/// Node identity for matching
pub mod id;

/// Edit-script path encoding
pub mod path;

/// Algorithms: diff engine, keyed child matching
pub mod algo;

/// Live tree capabilities and the in-memory Dom
pub mod live;

/// Patch engine
pub mod patch;

/// Live tree to abstract tree snapshots
pub mod parse;

/// Markup serialization of live trees
pub mod render;

/// Render failure signals
pub mod event;

/// Render orchestration
pub mod reconcile;

/// Stylesheet rule tracking
pub mod styles;

/// Error types
pub mod error;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

// Abstract tree
pub use node::{AbstractElement, AbstractNode, AbstractText, Children, Content, Handler, TagKind};

// Attributes
pub use attr::{AttrSerializer, AttrValue, Attrs, AttrsExt, HtmlSerializer, PlainSerializer};

// Identity
pub use id::{Identifier, compute_identifier, is_element, nodes_match};

// Paths
pub use path::{Path, Segment};

// Algorithms
pub use algo::{DiffConfig, DiffStats, EditOp, EditScript, diff, diff_with_config};

#[cfg(feature = "parallel")]
pub use algo::diff_batch;

// Live trees
pub use live::{Dom, LiveNode, LiveTree, Namespace};

// Patch engine
pub use patch::{Patcher, apply, resolve_path};

// Snapshots
pub use parse::snapshot;

// Orchestration
pub use event::{Emitter, RenderEvent};
pub use reconcile::{Reconciler, ReconcilerConfig, RenderInput, RenderOutcome};

// Styles
pub use styles::{ListenerId, SheetId, StyleChange, StyleRegistry, StyleSheet, StylesTracker};

// Error types
pub use error::{
    ApplyError, ApplyErrorKind, ApplyResult, AttrError, DiffError, DiffResult, DomError,
};
