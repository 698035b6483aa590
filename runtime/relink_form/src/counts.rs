//! Per-signature slot statistics packed into one word.

use std::fmt;

use relink_ir::CallSignature;

const PARAM_COUNT_SHIFT: u32 = 0;
const PARAM_SLOTS_SHIFT: u32 = 16;
const PRIM_PARAMS_SHIFT: u32 = 32;
const WIDE_PRIM_PARAMS_SHIFT: u32 = 40;
const RET_SLOTS_SHIFT: u32 = 48;
const PRIM_RET_BIT: u64 = 1 << 52;
const WIDE_RET_BIT: u64 = 1 << 53;

/// Parameter and slot statistics for one signature, packed into a `u64`.
///
/// Layout: parameter count (16 bits), parameter slot count (16 bits),
/// primitive parameter count (8 bits), two-slot primitive parameter
/// count (8 bits), return slot count (4 bits), then primitive-return and
/// two-slot-return flag bits. Every field fits because the slot total is
/// bounded at construction of the signature itself.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PackedCounts(u64);

impl PackedCounts {
    /// Compute the statistics in one scan over the parameter kinds.
    pub fn of(signature: &CallSignature) -> Self {
        let mut word = 0u64;
        let mut slots = 0u64;
        let mut prims = 0u64;
        let mut wide_prims = 0u64;
        for kind in signature.erased_params() {
            slots += u64::from(kind.slot_width());
            if kind.is_primitive() {
                prims += 1;
                if kind.is_64bit() {
                    wide_prims += 1;
                }
            }
        }
        word |= (signature.param_count() as u64) << PARAM_COUNT_SHIFT;
        word |= slots << PARAM_SLOTS_SHIFT;
        word |= prims << PRIM_PARAMS_SHIFT;
        word |= wide_prims << WIDE_PRIM_PARAMS_SHIFT;

        let ret = signature.ret().erased();
        word |= u64::from(ret.slot_width()) << RET_SLOTS_SHIFT;
        if ret.is_primitive() {
            word |= PRIM_RET_BIT;
            if ret.is_64bit() {
                word |= WIDE_RET_BIT;
            }
        }
        Self(word)
    }

    /// Logical parameter count.
    #[inline]
    pub const fn param_count(self) -> u32 {
        (self.0 >> PARAM_COUNT_SHIFT) as u32 & 0xFFFF
    }

    /// Physical parameter slot total.
    #[inline]
    pub const fn param_slot_count(self) -> u32 {
        (self.0 >> PARAM_SLOTS_SHIFT) as u32 & 0xFFFF
    }

    /// Count of primitive-kinded parameters.
    #[inline]
    pub const fn primitive_param_count(self) -> u32 {
        (self.0 >> PRIM_PARAMS_SHIFT) as u32 & 0xFF
    }

    /// Count of two-slot primitive parameters.
    #[inline]
    pub const fn wide_primitive_param_count(self) -> u32 {
        (self.0 >> WIDE_PRIM_PARAMS_SHIFT) as u32 & 0xFF
    }

    /// Physical slots the return value occupies.
    #[inline]
    pub const fn return_slot_count(self) -> u32 {
        (self.0 >> RET_SLOTS_SHIFT) as u32 & 0xF
    }

    /// True for a primitive return kind.
    #[inline]
    pub const fn has_primitive_return(self) -> bool {
        self.0 & PRIM_RET_BIT != 0
    }

    /// True for a two-slot return kind.
    #[inline]
    pub const fn has_wide_return(self) -> bool {
        self.0 & WIDE_RET_BIT != 0
    }

    /// True when any parameter is primitive.
    #[inline]
    pub const fn has_primitive_params(self) -> bool {
        self.primitive_param_count() != 0
    }

    /// True when any parameter occupies two slots.
    #[inline]
    pub const fn has_wide_params(self) -> bool {
        self.wide_primitive_param_count() != 0
    }
}

impl fmt::Debug for PackedCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedCounts")
            .field("params", &self.param_count())
            .field("param_slots", &self.param_slot_count())
            .field("prims", &self.primitive_param_count())
            .field("wide_prims", &self.wide_primitive_param_count())
            .field("ret_slots", &self.return_slot_count())
            .finish()
    }
}
