//! Leaf value types for the relink invocation-plan core.
//!
//! This crate is the data vocabulary shared by the plan graph and the
//! call-signature form registry:
//! - [`SlotKind`] / [`TypeKind`]: erased storage classes and the surface
//!   kinds that erase to them
//! - [`CallSignature`]: an ordered parameter kind sequence plus a return
//!   kind, bounded by [`MAX_SLOT_COUNT`]
//! - [`TransformKey`]: compact structural descriptors for memoized edits
//! - [`Value`] / [`Combiner`]: the runtime value model and the seam
//!   through which resolved combiner references enter the core
//!
//! Everything here is plain data with structural equality; graph identity
//! (value nodes compared by position within one plan) lives in
//! `relink_plan`.

mod combiner;
mod error;
mod signature;
mod slot;
mod transform_key;
mod value;

pub use combiner::{Combiner, CombinerRef};
pub use error::{EditError, EvalError, SignatureError};
pub use signature::{CallSignature, MAX_SLOT_COUNT};
pub use slot::{SlotKind, TypeKind};
pub use transform_key::{TransformKey, TransformKind};
pub use value::{ArrayValue, CaptureRecord, Value};
