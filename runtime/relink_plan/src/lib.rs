//! Invocation plans: the value graph a dynamic call site is built from.
//!
//! A plan is an immutable list of value nodes (parameters first, then
//! derived expressions) plus a designated result node. Plans are never
//! mutated after commit; structural edits go through two layers:
//!
//! - [`EditBuffer`]: a transactional working copy of one plan's node
//!   list. Single-owner, single-thread; commits back to a fresh plan and
//!   repairs referential integrity along the way.
//! - [`PlanEditor`]: the public edit algebra (bind, add, duplicate,
//!   spread, collect, filter, fold, permute). Every operation is keyed by
//!   a [`TransformKey`](relink_ir::TransformKey) and memoized in the base
//!   plan's embedded three-tier [`TransformCache`], so the same
//!   structural request from two call paths returns the identical derived
//!   plan.
//!
//! [`interpret`] executes a plan directly against concrete values; it is
//! the behavioral oracle the tests reduce everything to, and the fallback
//! a lowering backend can delegate to.

mod buffer;
mod cache;
mod editor;
mod eval;
mod node;
mod plan;

pub use buffer::EditBuffer;
pub use cache::TransformCache;
pub use editor::PlanEditor;
pub use eval::interpret;
pub use node::{Node, NodeIdx, Op};
pub use plan::Plan;
