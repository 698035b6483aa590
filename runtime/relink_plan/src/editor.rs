//! The public edit algebra over a base plan.
//!
//! Every operation follows the same two-phase pattern: compute a
//! [`TransformKey`], probe the base plan's transform cache, and on a miss
//! open an [`EditBuffer`] transaction, apply the structural edit, commit,
//! and publish the result first-stored-wins. Two requests for the same
//! structural edit on the same base plan therefore return the identical
//! derived plan.
//!
//! Position 0 is the call's own dispatch-target/capture slot and is never
//! itself edited by these operations.

use std::sync::Arc;

use relink_ir::{CombinerRef, EditError, SlotKind, TransformKey, TransformKind};

use crate::buffer::EditBuffer;
use crate::node::{Node, Op};
use crate::plan::Plan;

/// Idempotent structural edit operations over one base plan.
#[derive(Debug, Clone)]
pub struct PlanEditor {
    plan: Arc<Plan>,
}

impl PlanEditor {
    /// An editor whose subject is `plan`.
    pub fn new(plan: Arc<Plan>) -> Self {
        Self { plan }
    }

    /// The editor's subject.
    pub fn plan(&self) -> &Arc<Plan> {
        &self.plan
    }

    fn derive<F>(
        &self,
        key: TransformKey,
        expect_arity: usize,
        build: F,
    ) -> Result<Arc<Plan>, EditError>
    where
        F: FnOnce() -> Result<Plan, EditError>,
    {
        if let Some(hit) = self.plan.transforms().probe(&key) {
            debug_assert_eq!(
                hit.arity(),
                expect_arity,
                "cached derived plan has an unexpected shape"
            );
            tracing::trace!(kind = ?key.kind(), "transform cache hit");
            return Ok(hit);
        }
        let built = Arc::new(build()?);
        debug_assert_eq!(
            built.arity(),
            expect_arity,
            "derived plan has an unexpected shape"
        );
        tracing::trace!(kind = ?key.kind(), derived = %built, "transform built");
        Ok(self.plan.transforms().publish(key, built))
    }

    /// Eliminate the parameter at `pos` by folding its value into the
    /// capture record carried by position 0; uses of the parameter are
    /// redirected to a generated accessor expression reading the record.
    ///
    /// Binding position 0 itself is the growth step: it is legal only
    /// while the capture record is empty, and introduces a fresh leading
    /// record parameter that the bound target is read from.
    pub fn bind_argument(&self, pos: usize, kind: SlotKind) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let key = TransformKey::new(TransformKind::BindArgument, &[pos as u32, kind.ordinal()]);
        let expect = if pos == 0 {
            plan.arity()
        } else {
            plan.arity().saturating_sub(1)
        };
        self.derive(key, expect, || {
            let arity = plan.arity();
            if pos >= arity {
                return Err(EditError::invalid(format!(
                    "bind position {pos} out of range for arity {arity}"
                )));
            }
            if plan.param_kind(pos) != kind {
                return Err(EditError::invalid(format!(
                    "bind kind {kind} does not match parameter kind {}",
                    plan.param_kind(pos)
                )));
            }
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            if pos == 0 {
                if plan.captures() != 0 {
                    return Err(EditError::invalid(
                        "cannot bind position 0 into a non-empty capture record in place",
                    ));
                }
                let record = buf.insert_parameter(0, SlotKind::Ref)?;
                buf.replace_parameter_by_new_expression(
                    1,
                    Node::expr(kind, Op::CaptureGet { index: 0, kind }, [record]),
                )?;
                buf.set_captures(1)?;
            } else {
                if plan.param_kind(0) != SlotKind::Ref {
                    return Err(EditError::invalid(
                        "position 0 does not carry a capture record slot",
                    ));
                }
                let record = buf.node_id_at(0)?;
                let index = plan.captures();
                buf.replace_parameter_by_new_expression(
                    pos,
                    Node::expr(kind, Op::CaptureGet { index, kind }, [record]),
                )?;
                buf.set_captures(index + 1)?;
            }
            buf.end_edit()
        })
    }

    /// Insert a brand-new, unused parameter at `pos`.
    pub fn add_argument(&self, pos: usize, kind: SlotKind) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let key = TransformKey::new(TransformKind::AddArgument, &[pos as u32, kind.ordinal()]);
        self.derive(key, plan.arity() + 1, || {
            if pos == 0 || pos > plan.arity() {
                return Err(EditError::invalid(format!(
                    "add position {pos} out of range for arity {}",
                    plan.arity()
                )));
            }
            if kind == SlotKind::Void {
                return Err(EditError::invalid("cannot add a void parameter"));
            }
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            buf.insert_parameter(pos, kind)?;
            buf.end_edit()
        })
    }

    /// Replace the parameter at `dst` with a copy of the parameter at
    /// `src`; both must be unconstrained parameters of the same kind.
    /// Reduces arity by one.
    pub fn dup_argument(&self, src: usize, dst: usize) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let key = TransformKey::new(TransformKind::DupArgument, &[src as u32, dst as u32]);
        self.derive(key, plan.arity().saturating_sub(1), || {
            let arity = plan.arity();
            if src == 0 || dst == 0 || src >= arity || dst >= arity || src == dst {
                return Err(EditError::invalid(format!(
                    "duplicate positions {src}->{dst} invalid for arity {arity}"
                )));
            }
            if plan.param_kind(src) != plan.param_kind(dst) {
                return Err(EditError::invalid(
                    "duplicated parameters must share one kind",
                ));
            }
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            buf.replace_parameter_by_copy(dst, src)?;
            buf.end_edit()
        })
    }

    /// Replace `count` consecutive parameters starting at `pos` with one
    /// array parameter, feeding the eliminated positions from
    /// length-checked element reads.
    pub fn spread_arguments(
        &self,
        pos: usize,
        elem: SlotKind,
        count: usize,
    ) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let arity = plan.arity();
        if pos == 0 || pos + count > arity {
            return Err(EditError::invalid(format!(
                "spread span {pos}..{} out of range for arity {arity}",
                pos + count
            )));
        }
        let key = TransformKey::new(
            TransformKind::SpreadArguments,
            &[pos as u32, elem.ordinal(), count as u32],
        );
        self.derive(key, arity - count + 1, || {
            if elem == SlotKind::Void {
                return Err(EditError::invalid("cannot spread void elements"));
            }
            for i in 0..count {
                if plan.param_kind(pos + i) != elem {
                    return Err(EditError::invalid(format!(
                        "heterogeneous spread: parameter {} is {}, expected {elem}",
                        pos + i,
                        plan.param_kind(pos + i)
                    )));
                }
            }
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            let array = buf.insert_parameter(pos, SlotKind::Ref)?;
            for i in 0..count {
                buf.replace_parameter_by_new_expression(
                    pos + 1 + i,
                    Node::expr(
                        elem,
                        Op::ArrayGet {
                            index: i as u32,
                            elem,
                        },
                        [array],
                    ),
                )?;
            }
            let check_at = buf.arity();
            buf.insert_expression(
                check_at,
                Node::expr(
                    SlotKind::Void,
                    Op::ArrayLengthCheck {
                        expected: count as u32,
                    },
                    [array],
                ),
            )?;
            buf.end_edit()
        })
    }

    /// Replace the parameter at `pos` with the result of invoking
    /// `combiner` over freshly inserted parameters. A one-argument,
    /// value-returning combiner degenerates to a filter; a void,
    /// zero-argument combiner is a pure side effect inserted at
    /// position 1.
    pub fn collect_arguments(
        &self,
        pos: usize,
        combiner: &CombinerRef,
    ) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let csig = combiner.signature();
        let m = csig.param_count();
        let ret = csig.ret().erased();
        let token = combiner.token() as u64;
        let key = TransformKey::new(
            TransformKind::CollectArguments,
            &[pos as u32, token as u32, (token >> 32) as u32],
        );
        let arity = plan.arity();
        let expect = if ret == SlotKind::Void {
            let at = if m == 0 { 1 } else { pos };
            if at == 0 || at > arity {
                return Err(EditError::invalid(format!(
                    "collect position {at} out of range for arity {arity}"
                )));
            }
            arity + m
        } else {
            if pos == 0 || pos >= arity {
                return Err(EditError::invalid(format!(
                    "collect position {pos} out of range for arity {arity}"
                )));
            }
            arity + m - 1
        };
        self.derive(key, expect, || {
            check_combiner_params(csig)?;
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            if ret == SlotKind::Void {
                let at = if m == 0 { 1 } else { pos };
                let mut ids = Vec::with_capacity(m);
                for j in 0..m {
                    ids.push(buf.insert_parameter(at + j, csig.param(j).erased())?);
                }
                let expr_at = buf.arity();
                buf.insert_expression(
                    expr_at,
                    Node::expr(SlotKind::Void, Op::Invoke(combiner.clone()), ids),
                )?;
            } else {
                if plan.param_kind(pos) != ret {
                    return Err(EditError::invalid(format!(
                        "collect target is {}, combiner produces {ret}",
                        plan.param_kind(pos)
                    )));
                }
                let mut ids = Vec::with_capacity(m);
                for j in 0..m {
                    ids.push(buf.insert_parameter(pos + 1 + j, csig.param(j).erased())?);
                }
                buf.replace_parameter_by_new_expression(
                    pos,
                    Node::expr(ret, Op::Invoke(combiner.clone()), ids),
                )?;
            }
            buf.end_edit()
        })
    }

    /// Fast-path collect for an array-construction combiner: replace the
    /// reference parameter at `pos` with an array built from `count`
    /// fresh element parameters. Returns `Ok(None)` ("not applicable")
    /// when the element kind needs richer type metadata than a slot kind
    /// carries (reference elements).
    pub fn collect_arguments_to_array(
        &self,
        pos: usize,
        elem: SlotKind,
        count: usize,
    ) -> Result<Option<Arc<Plan>>, EditError> {
        if elem == SlotKind::Ref {
            return Ok(None);
        }
        let plan = &self.plan;
        let arity = plan.arity();
        if pos == 0 || pos >= arity {
            return Err(EditError::invalid(format!(
                "collect position {pos} out of range for arity {arity}"
            )));
        }
        let key = TransformKey::new(
            TransformKind::CollectArgumentsToArray,
            &[pos as u32, elem.ordinal(), count as u32],
        );
        self.derive(key, arity + count - 1, || {
            if elem == SlotKind::Void {
                return Err(EditError::invalid("cannot collect void elements"));
            }
            if plan.param_kind(pos) != SlotKind::Ref {
                return Err(EditError::invalid(
                    "collect-to-array target must be a reference parameter",
                ));
            }
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            let mut ids = Vec::with_capacity(count);
            for j in 0..count {
                ids.push(buf.insert_parameter(pos + 1 + j, elem)?);
            }
            buf.replace_parameter_by_new_expression(
                pos,
                Node::expr(
                    SlotKind::Ref,
                    Op::NewArray {
                        elem,
                        len: count as u32,
                    },
                    ids,
                ),
            )?;
            buf.end_edit()
        })
        .map(Some)
    }

    /// Replace the parameter at `pos` with a converted value read from a
    /// fresh parameter of `new_kind` — collect with combiner arity one.
    pub fn filter_argument(&self, pos: usize, new_kind: SlotKind) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let key = TransformKey::new(
            TransformKind::FilterArgument,
            &[pos as u32, new_kind.ordinal()],
        );
        self.derive(key, plan.arity(), || {
            let arity = plan.arity();
            if pos == 0 || pos >= arity {
                return Err(EditError::invalid(format!(
                    "filter position {pos} out of range for arity {arity}"
                )));
            }
            if new_kind == SlotKind::Void {
                return Err(EditError::invalid("cannot filter to a void parameter"));
            }
            let old = plan.param_kind(pos);
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            let src = buf.insert_parameter(pos + 1, new_kind)?;
            buf.replace_parameter_by_new_expression(
                pos,
                Node::expr(old, Op::Convert { to: old }, [src]),
            )?;
            buf.end_edit()
        })
    }

    /// Retarget the plan's result: either a synthesized constant zero of
    /// `new_kind` (`constant_zero`), or a conversion of the old result.
    /// Void-to-void conversion is a no-op edit that still goes through
    /// the cache path.
    pub fn filter_return(
        &self,
        new_kind: SlotKind,
        constant_zero: bool,
    ) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let key = TransformKey::new(
            TransformKind::FilterReturn,
            &[new_kind.ordinal(), u32::from(constant_zero)],
        );
        let old = plan.return_kind();
        if !constant_zero && old == SlotKind::Void && new_kind == SlotKind::Void {
            // Nothing to edit, but bookkeeping still runs through the
            // cache for consistency.
            if let Some(hit) = plan.transforms().probe(&key) {
                return Ok(hit);
            }
            return Ok(plan.transforms().publish(key, Arc::clone(plan)));
        }
        self.derive(key, plan.arity(), || {
            let mut buf = EditBuffer::from_plan(plan);
            buf.start_edit()?;
            if new_kind == SlotKind::Void {
                buf.set_result(None)?;
            } else if constant_zero || old == SlotKind::Void {
                let id = buf.insert_expression(
                    buf.len(),
                    Node::expr(new_kind, Op::ConstZero { kind: new_kind }, []),
                )?;
                buf.set_result(Some(id))?;
            } else {
                let current = buf
                    .result()
                    .ok_or_else(|| EditError::invalid("plan has no result to convert"))?;
                let id = buf.insert_expression(
                    buf.len(),
                    Node::expr(new_kind, Op::Convert { to: new_kind }, [current]),
                )?;
                buf.set_result(Some(id))?;
            }
            buf.end_edit()
        })
    }

    /// Like collect, but the combined arguments are retained: the
    /// combiner reads the parameters following `pos` and its output
    /// replaces the parameter at `pos` (or, with `drop_result`, is
    /// discarded and no parameter is consumed).
    pub fn fold_arguments(
        &self,
        pos: usize,
        drop_result: bool,
        combiner: &CombinerRef,
    ) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let csig = combiner.signature();
        let m = csig.param_count();
        let ret = csig.ret().erased();
        let token = combiner.token() as u64;
        let key = TransformKey::new(
            TransformKind::FoldArguments,
            &[
                pos as u32,
                u32::from(drop_result),
                token as u32,
                (token >> 32) as u32,
            ],
        );
        let expect = if drop_result {
            plan.arity()
        } else {
            plan.arity().saturating_sub(1)
        };
        self.derive(key, expect, || {
            let arity = plan.arity();
            check_combiner_params(csig)?;
            if drop_result {
                if pos == 0 || pos + m > arity {
                    return Err(EditError::invalid(format!(
                        "fold span {pos}..{} out of range for arity {arity}",
                        pos + m
                    )));
                }
                check_fold_operands(plan, csig, pos)?;
                let mut buf = EditBuffer::from_plan(plan);
                buf.start_edit()?;
                let mut ids = Vec::with_capacity(m);
                for j in 0..m {
                    ids.push(buf.node_id_at(pos + j)?);
                }
                let expr_at = buf.arity();
                buf.insert_expression(
                    expr_at,
                    Node::expr(ret, Op::Invoke(combiner.clone()), ids),
                )?;
                buf.end_edit()
            } else {
                if ret == SlotKind::Void {
                    return Err(EditError::invalid(
                        "fold combiner must produce a value unless its result is dropped",
                    ));
                }
                if pos == 0 || pos >= arity || pos + 1 + m > arity {
                    return Err(EditError::invalid(format!(
                        "fold span {pos}..{} out of range for arity {arity}",
                        pos + 1 + m
                    )));
                }
                if plan.param_kind(pos) != ret {
                    return Err(EditError::invalid(format!(
                        "fold target is {}, combiner produces {ret}",
                        plan.param_kind(pos)
                    )));
                }
                check_fold_operands(plan, csig, pos + 1)?;
                let mut buf = EditBuffer::from_plan(plan);
                buf.start_edit()?;
                let mut ids = Vec::with_capacity(m);
                for j in 0..m {
                    ids.push(buf.node_id_at(pos + 1 + j)?);
                }
                buf.replace_parameter_by_new_expression(
                    pos,
                    Node::expr(ret, Op::Invoke(combiner.clone()), ids),
                )?;
                buf.end_edit()
            }
        })
    }

    /// Remap which physical input parameter feeds which logical position.
    /// `reorder` has one entry per base parameter past the skipped
    /// prefix; entry `i` names the derived-plan input feeding base
    /// position `skip + i`. The identity reorder short-circuits and
    /// returns the base plan itself, uncached.
    pub fn permute_arguments(&self, skip: usize, reorder: &[u32]) -> Result<Arc<Plan>, EditError> {
        let plan = &self.plan;
        let arity = plan.arity();
        if skip == 0 || skip > arity {
            return Err(EditError::invalid(
                "permute must skip at least the dispatch slot",
            ));
        }
        if reorder.len() != arity - skip {
            return Err(EditError::invalid(format!(
                "reorder length {} does not cover the {} permutable parameters",
                reorder.len(),
                arity - skip
            )));
        }
        if reorder.iter().enumerate().all(|(i, &r)| r as usize == i) {
            return Ok(Arc::clone(plan));
        }
        let out_count = reorder.iter().map(|&r| r as usize + 1).max().unwrap_or(0);
        let mut out_kinds: Vec<Option<SlotKind>> = vec![None; out_count];
        for (i, &r) in reorder.iter().enumerate() {
            let kind = plan.param_kind(skip + i);
            match out_kinds[r as usize] {
                None => out_kinds[r as usize] = Some(kind),
                Some(prev) if prev == kind => {}
                Some(prev) => {
                    return Err(EditError::invalid(format!(
                        "input {r} would feed both {prev} and {kind} positions"
                    )));
                }
            }
        }
        let mut parts: Vec<u32> = Vec::with_capacity(reorder.len() + 1);
        parts.push(skip as u32);
        parts.extend_from_slice(reorder);
        let key = TransformKey::new(TransformKind::PermuteArguments, &parts);
        let out_arity = skip + out_count;
        self.derive(key, out_arity, || {
            // A parameter kind is synthesized once per input position
            // distinct after inversion; every input must be referenced,
            // its kind is unknowable otherwise.
            let mut kinds = Vec::with_capacity(out_count);
            for (j, kind) in out_kinds.iter().enumerate() {
                kinds.push(kind.ok_or_else(|| {
                    EditError::invalid(format!("input position {j} feeds no parameter"))
                })?);
            }
            let expr_count = plan.nodes().len() - arity;
            let mut nodes = Vec::with_capacity(out_arity + expr_count);
            for i in 0..skip {
                nodes.push(Node::param(plan.param_kind(i)));
            }
            for &kind in &kinds {
                nodes.push(Node::param(kind));
            }
            let remap = |idx: usize| -> u32 {
                if idx < skip {
                    idx as u32
                } else if idx < arity {
                    skip as u32 + reorder[idx - skip]
                } else {
                    (idx - arity + out_arity) as u32
                }
            };
            for i in arity..plan.nodes().len() {
                let mut node = plan.node(i).clone();
                for arg in node.args_mut() {
                    *arg = crate::node::NodeIdx::from_raw(remap(arg.index()));
                }
                nodes.push(node);
            }
            let result = plan.result().map(remap);
            Plan::new(out_arity as u32, plan.captures(), nodes, result)
        })
    }
}

fn check_combiner_params(sig: &relink_ir::CallSignature) -> Result<(), EditError> {
    for p in sig.params() {
        if p.erased() == SlotKind::Void {
            return Err(EditError::invalid("combiner has a void parameter"));
        }
    }
    Ok(())
}

fn check_fold_operands(
    plan: &Plan,
    sig: &relink_ir::CallSignature,
    first: usize,
) -> Result<(), EditError> {
    for (j, p) in sig.params().iter().enumerate() {
        let found = plan.param_kind(first + j);
        if found != p.erased() {
            return Err(EditError::invalid(format!(
                "fold operand {} is {found}, combiner expects {}",
                first + j,
                p.erased()
            )));
        }
    }
    Ok(())
}
