//! The immutable invocation plan.

use std::fmt;

use relink_ir::{EditError, SlotKind};

use crate::cache::TransformCache;
use crate::node::Node;

/// An immutable description of how output values are produced from input
/// parameters: `arity` leading parameter nodes, derived expressions after
/// them (arguments referencing only earlier positions), and a result
/// index (`None` for a void result).
///
/// Plans are created once, by [`Plan::new`] or an
/// [`EditBuffer`](crate::EditBuffer) commit, and never mutated. The
/// embedded [`TransformCache`] memoizes derived plans per structural edit
/// and is the only interiorly-mutable part; it does not participate in
/// the plan's value semantics.
pub struct Plan {
    arity: u32,
    captures: u32,
    nodes: Vec<Node>,
    result: Option<u32>,
    transforms: TransformCache,
}

impl Plan {
    /// Build a plan, validating the structural invariants:
    /// - every index below `arity` holds a parameter node, every index at
    ///   or above it a non-parameter node, and no parameter is void;
    /// - every expression argument references an earlier position;
    /// - the result, if present, is in range and not of void kind;
    /// - a non-zero capture count requires a leading reference parameter
    ///   (the capture record slot).
    pub fn new(
        arity: u32,
        captures: u32,
        nodes: Vec<Node>,
        result: Option<u32>,
    ) -> Result<Self, EditError> {
        if (arity as usize) > nodes.len() {
            return Err(EditError::invalid(format!(
                "arity {arity} exceeds node count {}",
                nodes.len()
            )));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.is_param() != (i < arity as usize) {
                return Err(EditError::invalid(format!(
                    "node {i} violates the parameters-first partition (arity {arity})"
                )));
            }
            if node.is_param() && node.kind() == SlotKind::Void {
                return Err(EditError::invalid(format!(
                    "parameter {i} has void kind"
                )));
            }
            for &arg in node.args() {
                if arg.index() >= i {
                    return Err(EditError::invalid(format!(
                        "node {i} references non-earlier node {arg:?}"
                    )));
                }
            }
        }
        if let Some(r) = result {
            let node = nodes.get(r as usize).ok_or_else(|| {
                EditError::invalid(format!("result index {r} out of range"))
            })?;
            if node.kind() == SlotKind::Void {
                return Err(EditError::invalid(
                    "result names a void-kinded node; use a void result instead",
                ));
            }
        }
        if captures > 0 {
            let leading_ref = matches!(
                nodes.first(),
                Some(Node::Param {
                    kind: SlotKind::Ref
                })
            );
            if !leading_ref {
                return Err(EditError::invalid(
                    "captures present but position 0 is not a reference parameter",
                ));
            }
        }
        Ok(Self {
            arity,
            captures,
            nodes,
            result,
            transforms: TransformCache::new(),
        })
    }

    /// Count of leading parameter nodes.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity as usize
    }

    /// Entries accumulated in the position-0 capture record.
    #[inline]
    pub fn captures(&self) -> u32 {
        self.captures
    }

    /// The full node array (parameters first).
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The node at `i`.
    #[inline]
    pub fn node(&self, i: usize) -> &Node {
        &self.nodes[i]
    }

    /// The result position, or `None` for a void result.
    #[inline]
    pub fn result(&self) -> Option<usize> {
        self.result.map(|r| r as usize)
    }

    /// The plan's return kind: the result node's kind, or void.
    pub fn return_kind(&self) -> SlotKind {
        self.result
            .map_or(SlotKind::Void, |r| self.nodes[r as usize].kind())
    }

    /// The kind of the parameter at `pos`.
    ///
    /// # Panics
    /// If `pos >= arity`.
    pub fn param_kind(&self, pos: usize) -> SlotKind {
        assert!(pos < self.arity(), "parameter position out of range");
        self.nodes[pos].kind()
    }

    /// The per-plan transform cache.
    #[inline]
    pub(crate) fn transforms(&self) -> &TransformCache {
        &self.transforms
    }

    fn node_name(&self, i: usize) -> String {
        if i < self.arity() {
            format!("a{i}")
        } else {
            format!("t{i}")
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for i in 0..self.arity() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", self.node_name(i), self.nodes[i].kind())?;
        }
        f.write_str(")=>{")?;
        for i in self.arity()..self.nodes.len() {
            if i > self.arity() {
                f.write_str("; ")?;
            }
            let Node::Expr { kind, op, args } = &self.nodes[i] else {
                unreachable!("non-expression past arity");
            };
            write!(f, "{}={op}(", self.node_name(i))?;
            for (j, a) in args.iter().enumerate() {
                if j > 0 {
                    f.write_str(",")?;
                }
                f.write_str(&self.node_name(a.index()))?;
            }
            write!(f, "):{kind}")?;
        }
        f.write_str("};")?;
        match self.result {
            Some(r) => f.write_str(&self.node_name(r as usize)),
            None => f.write_str("void"),
        }
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plan[{self}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeIdx, Op};
    use pretty_assertions::assert_eq;
    use relink_ir::SlotKind::{Int, Ref, Void};

    fn conv(to: relink_ir::SlotKind, arg: u32) -> Node {
        Node::expr(to, Op::Convert { to }, [NodeIdx::from_raw(arg)])
    }

    #[test]
    fn params_only_plan() {
        let plan = Plan::new(2, 0, vec![Node::param(Ref), Node::param(Int)], Some(1)).unwrap();
        assert_eq!(plan.arity(), 2);
        assert_eq!(plan.return_kind(), Int);
        assert_eq!(plan.to_string(), "(a0:ref,a1:int)=>{};a1");
    }

    #[test]
    fn rejects_expression_below_arity() {
        let err = Plan::new(2, 0, vec![Node::param(Ref), conv(Int, 0)], None).unwrap_err();
        assert!(matches!(err, EditError::InvalidStructuralEdit { .. }));
    }

    #[test]
    fn rejects_parameter_past_arity() {
        let err = Plan::new(1, 0, vec![Node::param(Ref), Node::param(Int)], None).unwrap_err();
        assert!(matches!(err, EditError::InvalidStructuralEdit { .. }));
    }

    #[test]
    fn rejects_forward_reference() {
        let err = Plan::new(
            1,
            0,
            vec![Node::param(Int), conv(Int, 2), conv(Int, 0)],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvalidStructuralEdit { .. }));
    }

    #[test]
    fn rejects_void_result() {
        let nodes = vec![
            Node::param(Ref),
            Node::expr(Void, Op::ConstZero { kind: Void }, []),
        ];
        let err = Plan::new(1, 0, nodes, Some(1)).unwrap_err();
        assert!(matches!(err, EditError::InvalidStructuralEdit { .. }));
    }

    #[test]
    fn rejects_captures_without_record_slot() {
        let err = Plan::new(1, 1, vec![Node::param(Int)], Some(0)).unwrap_err();
        assert!(matches!(err, EditError::InvalidStructuralEdit { .. }));
    }

    #[test]
    fn display_renders_expressions() {
        let plan = Plan::new(
            2,
            0,
            vec![Node::param(Ref), Node::param(Int), conv(Int, 1)],
            Some(2),
        )
        .unwrap();
        assert_eq!(
            plan.to_string(),
            "(a0:ref,a1:int)=>{t2=conv[int](a1):int};t2"
        );
    }
}
