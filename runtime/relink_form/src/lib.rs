//! Call-signature forms: interned per-signature metadata.
//!
//! Every call signature in flight resolves, through the sharded
//! [`FormRegistry`], to one [`SignatureForm`] carrying precomputed slot
//! statistics ([`PackedCounts`]), shape flags ([`FormFlags`]), and
//! parameter/slot index tables ([`SlotTables`]). Forms also carry the
//! role-indexed caches ([`RoleCaches`]) where adapter plans and their
//! lowered entry points are memoized per [`FormRole`]; signatures sharing
//! an erasure share one set of caches, so erasure-compatible call sites
//! reuse each other's adapters.
//!
//! The [`Lowering`] trait is the seam to a real code generator; the
//! in-crate [`InterpreterLowering`] falls back to
//! [`relink_plan::interpret`].

mod counts;
mod flags;
mod form;
mod lower;
mod registry;
mod role;
mod tables;

pub use counts::PackedCounts;
pub use flags::FormFlags;
pub use form::{RoleCaches, SignatureForm};
pub use lower::{EntryPoint, InterpreterLowering, Lowering};
pub use registry::FormRegistry;
pub use role::FormRole;
pub use tables::SlotTables;
