//! Prelude module for common imports.
//!
//! ```ignore
//! use tola_reconcile::prelude::*;
//! ```

// Node types
pub use crate::node::{AbstractElement, AbstractNode, AbstractText, Children, Handler, TagKind};

// Attributes
pub use crate::attr::{AttrSerializer, AttrValue, Attrs, AttrsExt, HtmlSerializer, PlainSerializer};

// Identity
pub use crate::id::{Identifier, SECTION_ID, STYLESHEET_ATTR, compute_identifier, nodes_match};

// Paths
pub use crate::path::Path;

// Algorithms
pub use crate::algo::{DiffConfig, DiffStats, EditOp, EditScript, diff, diff_with_config};

// Live trees
pub use crate::live::{Dom, LiveNode, LiveTree, Namespace};

// Patch / snapshot
pub use crate::parse::snapshot;
pub use crate::patch::apply;

// Orchestration
pub use crate::event::RenderEvent;
pub use crate::reconcile::{Reconciler, ReconcilerConfig, RenderInput, RenderOutcome};

// Styles
pub use crate::styles::{ListenerId, StyleRegistry, StylesTracker};

// Error
pub use crate::error::{ApplyError, DiffError};
