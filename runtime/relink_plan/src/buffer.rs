//! Transactional working copy of a plan's node list.
//!
//! The buffer is the staging object between two immutable plans: built
//! from a snapshot, mutated under a single-owner discipline while a
//! transaction is open, committed back to a fresh [`Plan`].
//!
//! Node identity inside the buffer is a stable arena id
//! ([`NodeIdx`] into the internal arena), so an id survives insertion and
//! reordering; the working order is a `Vec<Option<NodeIdx>>` in which
//! deletion is explicit nulling. Commit repairs consumer references,
//! resolves deliberate duplicates, compacts, partitions parameters ahead
//! of expressions, and renumbers everything back to plan positions.

use relink_ir::{EditError, SlotKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::node::{Node, NodeIdx};
use crate::plan::Plan;

/// Per-transaction bookkeeping.
#[derive(Debug)]
struct Txn {
    /// Positions rewritten so far; each may be rewritten at most once.
    changed: Vec<bool>,
    /// Substitutions to propagate into consumer argument lists at commit.
    replaced: FxHashMap<NodeIdx, NodeIdx>,
    /// Positions whose occupant is a deliberate duplicate to null out.
    dupe_drops: Vec<usize>,
}

/// A mutable, transactional editing buffer over one plan snapshot.
///
/// Not thread-safe; a buffer belongs to the single thread performing the
/// edit. Every mutating operation requires an open transaction.
#[derive(Debug)]
pub struct EditBuffer {
    arena: Vec<Node>,
    order: Vec<Option<NodeIdx>>,
    arity: usize,
    captures: u32,
    result: Option<NodeIdx>,
    txn: Option<Txn>,
}

impl EditBuffer {
    /// Snapshot a plan into a fresh buffer (no transaction open).
    pub fn from_plan(plan: &Plan) -> Self {
        // In a committed plan, argument indices are positions; loading
        // the node array verbatim makes arena id == position, so the
        // references stay consistent until edits diverge them.
        Self {
            arena: plan.nodes().to_vec(),
            order: (0..plan.nodes().len())
                .map(|i| Some(NodeIdx::from_raw(i as u32)))
                .collect(),
            arity: plan.arity(),
            captures: plan.captures(),
            result: plan.result().map(|r| NodeIdx::from_raw(r as u32)),
            txn: None,
        }
    }

    /// Current parameter count (updated immediately by parameter inserts).
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Current node count.
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when the buffer holds no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current capture-record entry count.
    #[inline]
    pub fn captures(&self) -> u32 {
        self.captures
    }

    /// The designated result node id, if any.
    #[inline]
    pub fn result(&self) -> Option<NodeIdx> {
        self.result
    }

    /// True while a transaction is open.
    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    /// The arena node behind an id.
    #[inline]
    pub fn node(&self, id: NodeIdx) -> &Node {
        &self.arena[id.index()]
    }

    /// The id currently occupying `pos`.
    pub fn node_id_at(&self, pos: usize) -> Result<NodeIdx, EditError> {
        match self.order.get(pos) {
            Some(Some(id)) => Ok(*id),
            _ => Err(EditError::invalid(format!("no node at position {pos}"))),
        }
    }

    /// Current position of an id, if it occupies one.
    pub fn position_of(&self, id: NodeIdx) -> Option<usize> {
        self.order.iter().position(|&slot| slot == Some(id))
    }

    /// Open a transaction, snapshotting the current state as baseline.
    pub fn start_edit(&mut self) -> Result<(), EditError> {
        if self.txn.is_some() {
            return Err(EditError::AlreadyEditing);
        }
        self.txn = Some(Txn {
            changed: vec![false; self.order.len()],
            replaced: FxHashMap::default(),
            dupe_drops: Vec::new(),
        });
        Ok(())
    }

    /// Override the capture-record entry count for the committed plan.
    pub fn set_captures(&mut self, captures: u32) -> Result<(), EditError> {
        if self.txn.is_none() {
            return Err(EditError::NotEditing);
        }
        self.captures = captures;
        Ok(())
    }

    /// Designate the result node (`None` for a void result). The node
    /// must currently occupy a position in the buffer.
    pub fn set_result(&mut self, id: Option<NodeIdx>) -> Result<(), EditError> {
        if self.txn.is_none() {
            return Err(EditError::NotEditing);
        }
        if let Some(id) = id {
            if self.position_of(id).is_none() {
                return Err(EditError::invalid("result node is not present in the buffer"));
            }
        }
        self.result = id;
        Ok(())
    }

    fn alloc(&mut self, node: Node) -> NodeIdx {
        let id = NodeIdx::from_raw(self.arena.len() as u32);
        self.arena.push(node);
        id
    }

    /// Replace the node at `pos` with a fresh node. Each position may be
    /// rewritten at most once per transaction.
    pub fn change_node(&mut self, pos: usize, node: Node) -> Result<NodeIdx, EditError> {
        let old = {
            let txn = self.txn.as_ref().ok_or(EditError::NotEditing)?;
            let old = self.node_id_at(pos)?;
            if txn.changed[pos] {
                return Err(EditError::DoubleEdit { index: pos });
            }
            old
        };
        let new = self.alloc(node);
        let Some(txn) = self.txn.as_mut() else {
            return Err(EditError::NotEditing);
        };
        txn.changed[pos] = true;
        txn.replaced.insert(old, new);
        self.order[pos] = Some(new);
        if self.result == Some(old) {
            // Result tracking follows the rename.
            self.result = Some(new);
        }
        Ok(new)
    }

    /// Retarget the parameter slot at `pos` to a fresh parameter.
    pub fn rename_parameter(&mut self, pos: usize, kind: SlotKind) -> Result<NodeIdx, EditError> {
        self.ensure_param_position(pos)?;
        self.change_node(pos, Node::param(kind))
    }

    /// Retarget the parameter slot at `pos` to a brand-new expression.
    /// The expression can no longer occupy a parameter position, so
    /// commit's partition step will relocate it past the parameters and
    /// reduce arity accordingly.
    pub fn replace_parameter_by_new_expression(
        &mut self,
        pos: usize,
        node: Node,
    ) -> Result<NodeIdx, EditError> {
        self.ensure_param_position(pos)?;
        if node.is_param() {
            return Err(EditError::invalid("expected an expression node"));
        }
        self.check_expr_args(&node, pos)?;
        self.change_node(pos, node)
    }

    /// Retarget the parameter slot at `pos` to an already-existing node,
    /// creating a deliberate duplicate reference. The occurrence at `pos`
    /// is the one nulled out at commit; the original occurrence survives
    /// and consumers of the replaced parameter are redirected to it.
    pub fn replace_parameter_by_copy(
        &mut self,
        pos: usize,
        src_pos: usize,
    ) -> Result<NodeIdx, EditError> {
        self.ensure_param_position(pos)?;
        if src_pos == pos {
            return Err(EditError::invalid("copy source equals its destination"));
        }
        let src = self.node_id_at(src_pos)?;
        let old = {
            let txn = self.txn.as_ref().ok_or(EditError::NotEditing)?;
            let old = self.node_id_at(pos)?;
            if txn.changed[pos] {
                return Err(EditError::DoubleEdit { index: pos });
            }
            if old == src {
                // Both positions already hold one node; substituting it
                // for itself would loop the commit-time repair.
                return Err(EditError::invalid("copy source resolves to the same node"));
            }
            old
        };
        let Some(txn) = self.txn.as_mut() else {
            return Err(EditError::NotEditing);
        };
        txn.changed[pos] = true;
        txn.replaced.insert(old, src);
        txn.dupe_drops.push(pos);
        self.order[pos] = Some(src);
        if self.result == Some(old) {
            self.result = Some(src);
        }
        Ok(src)
    }

    /// Insert a fresh parameter at `pos`, shifting everything at or after
    /// `pos` right by one and raising arity.
    pub fn insert_parameter(&mut self, pos: usize, kind: SlotKind) -> Result<NodeIdx, EditError> {
        if self.txn.is_none() {
            return Err(EditError::NotEditing);
        }
        if pos > self.arity {
            return Err(EditError::invalid(format!(
                "parameter insert at {pos} past arity {}",
                self.arity
            )));
        }
        let id = self.alloc(Node::param(kind));
        self.insert_at(pos, id);
        self.arity += 1;
        Ok(id)
    }

    /// Insert an expression at `pos` (at or after the current arity),
    /// shifting everything at or after `pos` right by one.
    pub fn insert_expression(&mut self, pos: usize, node: Node) -> Result<NodeIdx, EditError> {
        if self.txn.is_none() {
            return Err(EditError::NotEditing);
        }
        if node.is_param() {
            return Err(EditError::invalid("expected an expression node"));
        }
        if pos < self.arity || pos > self.order.len() {
            return Err(EditError::invalid(format!(
                "expression insert at {pos} outside [{}, {}]",
                self.arity,
                self.order.len()
            )));
        }
        self.check_expr_args(&node, pos)?;
        let id = self.alloc(node);
        self.insert_at(pos, id);
        Ok(id)
    }

    fn insert_at(&mut self, pos: usize, id: NodeIdx) {
        self.order.insert(pos, Some(id));
        // txn presence was checked by the caller
        if let Some(txn) = self.txn.as_mut() {
            txn.changed.insert(pos, true);
            for d in &mut txn.dupe_drops {
                if *d >= pos {
                    *d += 1;
                }
            }
        }
    }

    fn ensure_param_position(&self, pos: usize) -> Result<(), EditError> {
        if pos >= self.arity {
            return Err(EditError::invalid(format!(
                "position {pos} is not a parameter slot (arity {})",
                self.arity
            )));
        }
        Ok(())
    }

    /// Arguments of a node placed at `pos` must already be defined: a
    /// parameter, or any node at an earlier position.
    fn check_expr_args(&self, node: &Node, pos: usize) -> Result<(), EditError> {
        for &arg in node.args() {
            let Some(p) = self.position_of(arg) else {
                return Err(EditError::invalid(format!(
                    "argument {arg:?} is not present in the buffer"
                )));
            };
            if !self.arena[arg.index()].is_param() && p >= pos {
                return Err(EditError::invalid(format!(
                    "argument {arg:?} at {p} would not precede its consumer at {pos}"
                )));
            }
        }
        Ok(())
    }

    /// Commit: repair consumer references, resolve duplicates, compact,
    /// partition parameters ahead of expressions, renumber, and build the
    /// finalized immutable plan. The buffer reloads from the committed
    /// plan and can start another transaction afterwards.
    pub fn end_edit(&mut self) -> Result<Plan, EditError> {
        let txn = self.txn.take().ok_or(EditError::NotEditing)?;

        // (1) Referential-integrity repair: a changed node's consumers
        // must track the change. Chains can arise when a replacement
        // target was itself rewritten later in the transaction.
        if !txn.replaced.is_empty() {
            for node in &mut self.arena {
                for arg in node.args_mut() {
                    while let Some(&next) = txn.replaced.get(arg) {
                        *arg = next;
                    }
                }
            }
            if let Some(mut r) = self.result {
                while let Some(&next) = txn.replaced.get(&r) {
                    r = next;
                }
                self.result = Some(r);
            }
        }

        // (2) Resolve deliberate duplicates by nulling the recorded
        // occurrence, then reject any duplicate that was not tracked.
        for &pos in &txn.dupe_drops {
            self.order[pos] = None;
        }
        let mut seen = FxHashSet::default();
        for id in self.order.iter().flatten() {
            if !seen.insert(*id) {
                return Err(EditError::invalid(format!(
                    "untracked duplicate occurrence of {id:?}"
                )));
            }
        }

        // (3) Compact, reducing arity by the nulled parameter slots.
        let mut new_arity = self.arity;
        let mut compacted: Vec<NodeIdx> = Vec::with_capacity(self.order.len());
        for (pos, slot) in self.order.iter().enumerate() {
            match slot {
                Some(id) => compacted.push(*id),
                None if pos < self.arity => new_arity -= 1,
                None => {}
            }
        }

        // (4) Stable partition ("sheep and goats"): expressions that came
        // to occupy parameter slots move past the remaining parameters,
        // preserving relative order within each group.
        let mut params: Vec<NodeIdx> = Vec::with_capacity(new_arity);
        let mut relocated: Vec<NodeIdx> = Vec::new();
        for &id in &compacted[..new_arity] {
            if self.arena[id.index()].is_param() {
                params.push(id);
            } else {
                relocated.push(id);
            }
        }
        let final_arity = params.len();
        let mut final_order = params;
        final_order.extend(relocated);
        final_order.extend_from_slice(&compacted[new_arity..]);

        // (5) Renumber arena ids back to plan positions.
        let mut pos_of: Vec<u32> = vec![u32::MAX; self.arena.len()];
        for (pos, id) in final_order.iter().enumerate() {
            pos_of[id.index()] = pos as u32;
        }
        let mut nodes = Vec::with_capacity(final_order.len());
        for (pos, id) in final_order.iter().enumerate() {
            let mut node = self.arena[id.index()].clone();
            for arg in node.args_mut() {
                let p = pos_of[arg.index()];
                if p == u32::MAX || p as usize >= pos {
                    return Err(EditError::invalid(format!(
                        "argument {arg:?} does not precede its consumer after commit"
                    )));
                }
                *arg = NodeIdx::from_raw(p);
            }
            nodes.push(node);
        }
        let result = match self.result {
            Some(id) => {
                let p = pos_of[id.index()];
                if p == u32::MAX {
                    return Err(EditError::invalid("result node was dropped by the edit"));
                }
                Some(p)
            }
            None => None,
        };

        let plan = Plan::new(final_arity as u32, self.captures, nodes, result)?;
        debug_assert!(
            plan.nodes()
                .iter()
                .enumerate()
                .all(|(i, n)| n.is_param() == (i < plan.arity())),
            "commit produced a malformed partition"
        );
        *self = Self::from_plan(&plan);
        Ok(plan)
    }
}
