//! Algorithm implementations for abstract tree reconciliation.
//!
//! - `diff`: diff engine producing ordered edit scripts
//! - `keyed`: first-match keyed child matching and move derivation

mod diff;
mod keyed;

pub use diff::{DiffConfig, DiffStats, EditOp, EditScript, diff, diff_with_config};

#[cfg(feature = "parallel")]
pub use diff::diff_batch;
