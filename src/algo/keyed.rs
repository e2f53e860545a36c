//! Keyed child reconciliation
//!
//! Pairs old and new siblings by identifier and plans the structural edits
//! that turn the old sibling list into the new one.
//!
//! # Matching
//!
//! Each new child, in order, takes the first not-yet-taken old child with an
//! equal identifier. Ties are broken by old-list order (first match, never
//! best alignment), so duplicate identifiers bind in document order.
//!
//! # Replay order
//!
//! The diff engine emits removals (descending old index), then insertions at
//! `#0` (descending new index), then moves. After removals and insertions the
//! live sibling order is:
//!
//! ```text
//! [inserted children in new order] ++ [matched children in old order]
//! ```
//!
//! Moves are derived by simulating that order, so every `Move` path names the
//! node that really occupies that position once the earlier moves ran.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::id::{Identifier, compute_identifier};
use crate::node::AbstractNode;

/// A planned sibling move: take the node at `from`, splice it in at `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlannedMove {
    pub from: usize,
    pub to: usize,
}

/// Structural plan for one children list.
#[derive(Debug, Default)]
pub(crate) struct KeyedPlan {
    /// Matched `(old_index, new_index)` pairs, ascending by old index
    pub pairs: Vec<(usize, usize)>,
    /// Unmatched old indices, ascending
    pub removals: Vec<usize>,
    /// Unmatched new indices, ascending
    pub insertions: Vec<usize>,
}

impl KeyedPlan {
    /// Match `new` against `old` by identifier, first match wins.
    pub fn new(old: &[&AbstractNode], new: &[&AbstractNode]) -> Self {
        let mut pool: FxHashMap<Identifier, VecDeque<usize>> = FxHashMap::default();
        for (old_idx, node) in old.iter().enumerate() {
            pool.entry(compute_identifier(node))
                .or_default()
                .push_back(old_idx);
        }

        let mut matched: Vec<Option<usize>> = vec![None; old.len()];
        let mut insertions = Vec::new();
        for (new_idx, node) in new.iter().enumerate() {
            match pool
                .get_mut(&compute_identifier(node))
                .and_then(VecDeque::pop_front)
            {
                Some(old_idx) => matched[old_idx] = Some(new_idx),
                None => insertions.push(new_idx),
            }
        }

        let mut pairs = Vec::with_capacity(new.len() - insertions.len());
        let mut removals = Vec::new();
        for (old_idx, new_idx) in matched.into_iter().enumerate() {
            match new_idx {
                Some(new_idx) => pairs.push((old_idx, new_idx)),
                None => removals.push(old_idx),
            }
        }

        Self {
            pairs,
            removals,
            insertions,
        }
    }

    /// Position of a matched old child once removals and insertions ran.
    ///
    /// `old_index - removals before it + number of insertions`
    pub fn corrected_position(&self, old_idx: usize) -> usize {
        let removed_before = self.removals.partition_point(|&r| r < old_idx);
        old_idx - removed_before + self.insertions.len()
    }

    /// Moves that bring the post-insertion sibling order into new order.
    ///
    /// Matched children are visited in old order first; a child's first move
    /// always starts from its [corrected position](Self::corrected_position)
    /// adjusted by the moves before it. A final sweep fixes whatever is still
    /// out of place, inserted children included.
    pub fn moves(&self) -> SmallVec<[PlannedMove; 4]> {
        // order[pos] = new index of the node at pos
        let mut order = vec![0; self.insertions.len() + self.pairs.len()];
        order[..self.insertions.len()].copy_from_slice(&self.insertions);
        for &(old_idx, new_idx) in &self.pairs {
            order[self.corrected_position(old_idx)] = new_idx;
        }
        let mut moves = SmallVec::new();

        for &(_, target) in &self.pairs {
            if let Some(from) = order.iter().position(|&n| n == target)
                && from != target
            {
                relocate(&mut order, from, target);
                moves.push(PlannedMove { from, to: target });
            }
        }

        for target in 0..order.len() {
            if order[target] == target {
                continue;
            }
            if let Some(from) = order.iter().position(|&n| n == target) {
                relocate(&mut order, from, target);
                moves.push(PlannedMove { from, to: target });
            }
        }

        moves
    }
}

fn relocate(order: &mut Vec<usize>, from: usize, to: usize) {
    let node = order.remove(from);
    order.insert(to, node);
}
