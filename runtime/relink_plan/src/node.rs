//! Value nodes: the vertices of a plan's data-flow graph.
//!
//! Nodes live in an arena (the plan's node array) and reference each
//! other by index, so node identity is positional within one plan. Equal
//! expressions in two different plans are still distinct nodes.

use std::fmt;

use relink_ir::{CombinerRef, SlotKind};
use smallvec::SmallVec;

/// Index of a value node within one plan's node array.
///
/// Inside a committed [`Plan`](crate::Plan) an argument index always
/// names an earlier position. While an [`EditBuffer`](crate::EditBuffer)
/// transaction is open the same type is used as a stable arena id that
/// survives insertion and reordering; commit renumbers back to positions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeIdx(u32);

impl NodeIdx {
    /// Create an index from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The index as a usize, for arena access.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The operation of a derived-expression node.
///
/// This is the closed set the plan editor synthesizes; everything the
/// embedding runtime supplies comes in through [`Op::Invoke`].
#[derive(Clone, Debug)]
pub enum Op {
    /// Call an externally resolved combiner.
    Invoke(CombinerRef),
    /// Read entry `index` of the capture record carried by position 0.
    CaptureGet { index: u32, kind: SlotKind },
    /// Check that the spread array has exactly `expected` elements.
    ArrayLengthCheck { expected: u32 },
    /// Read element `index` of a spread array.
    ArrayGet { index: u32, elem: SlotKind },
    /// Build a `len`-element array from the argument values.
    NewArray { elem: SlotKind, len: u32 },
    /// Convert the argument value to another storage class.
    Convert { to: SlotKind },
    /// Produce the zero/default value of a kind.
    ConstZero { kind: SlotKind },
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invoke(c) => write!(f, "invoke@{:x}", c.token()),
            Self::CaptureGet { index, .. } => write!(f, "capture[{index}]"),
            Self::ArrayLengthCheck { expected } => write!(f, "checklen[{expected}]"),
            Self::ArrayGet { index, .. } => write!(f, "elem[{index}]"),
            Self::NewArray { elem, len } => write!(f, "newarray[{len} {elem}]"),
            Self::Convert { to } => write!(f, "conv[{to}]"),
            Self::ConstZero { kind } => write!(f, "zero[{kind}]"),
        }
    }
}

/// A value node: an input parameter or a derived expression.
#[derive(Clone, Debug)]
pub enum Node {
    /// An input value, identified solely by position and kind.
    Param { kind: SlotKind },
    /// A derived value: an operation applied to earlier nodes.
    Expr {
        kind: SlotKind,
        op: Op,
        args: SmallVec<[NodeIdx; 4]>,
    },
}

impl Node {
    /// A parameter node.
    #[inline]
    pub const fn param(kind: SlotKind) -> Self {
        Self::Param { kind }
    }

    /// An expression node over the given argument nodes.
    pub fn expr(kind: SlotKind, op: Op, args: impl IntoIterator<Item = NodeIdx>) -> Self {
        Self::Expr {
            kind,
            op,
            args: args.into_iter().collect(),
        }
    }

    /// The node's slot kind.
    #[inline]
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::Param { kind } | Self::Expr { kind, .. } => *kind,
        }
    }

    /// True for parameter nodes.
    #[inline]
    pub fn is_param(&self) -> bool {
        matches!(self, Self::Param { .. })
    }

    /// Argument indices (empty for parameters).
    pub fn args(&self) -> &[NodeIdx] {
        match self {
            Self::Param { .. } => &[],
            Self::Expr { args, .. } => args,
        }
    }

    pub(crate) fn args_mut(&mut self) -> &mut [NodeIdx] {
        match self {
            Self::Param { .. } => &mut [],
            Self::Expr { args, .. } => args,
        }
    }
}
