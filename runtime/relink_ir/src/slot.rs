//! Erased storage classes for call-signature slots.
//!
//! All surface kinds normalize ("erase") to one of six [`SlotKind`]s
//! before plan construction. Plans built against erased kinds are shared
//! across every concrete signature that differs only by reference type or
//! by narrow integer type.

use std::fmt;

/// The erased storage class of a value.
///
/// This is the closed set the plan graph computes over. Kind equality is
/// a byte comparison; 64-bit kinds occupy two physical slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SlotKind {
    /// Any reference value.
    Ref = 0,
    /// 32-bit integer-like values (bool and narrow integers erase here).
    Int = 1,
    /// 64-bit integer.
    Long = 2,
    /// 32-bit float.
    Float = 3,
    /// 64-bit float.
    Double = 4,
    /// No value (return position only).
    Void = 5,
}

impl SlotKind {
    /// Number of distinct slot kinds.
    pub const COUNT: usize = 6;

    /// Physical slots this kind occupies in a calling sequence.
    #[inline]
    pub const fn slot_width(self) -> u32 {
        match self {
            Self::Long | Self::Double => 2,
            Self::Void => 0,
            _ => 1,
        }
    }

    /// True for the two 64-bit kinds.
    #[inline]
    pub const fn is_64bit(self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }

    /// True for every kind except `Ref` and `Void`.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        !matches!(self, Self::Ref | Self::Void)
    }

    /// Stable ordinal, used when packing kinds into transform keys.
    #[inline]
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    /// Inverse of [`SlotKind::ordinal`].
    pub const fn from_ordinal(ord: u32) -> Option<Self> {
        match ord {
            0 => Some(Self::Ref),
            1 => Some(Self::Int),
            2 => Some(Self::Long),
            3 => Some(Self::Float),
            4 => Some(Self::Double),
            5 => Some(Self::Void),
            _ => None,
        }
    }

    /// Short display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ref => "ref",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A surface type kind, before erasure.
///
/// Narrow integers and `bool` all erase to [`SlotKind::Int`]; the
/// remaining kinds are their own erasure. A signature whose every kind is
/// canonical (a fixed point of erasure) is an erased signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Bool,
    I8,
    I16,
    U16,
    I32,
    I64,
    F32,
    F64,
    Reference,
    Void,
}

impl TypeKind {
    /// Erase to the canonical storage class. Idempotent by construction:
    /// `k.erased().canonical().erased() == k.erased()`.
    #[inline]
    pub const fn erased(self) -> SlotKind {
        match self {
            Self::Bool | Self::I8 | Self::I16 | Self::U16 | Self::I32 => SlotKind::Int,
            Self::I64 => SlotKind::Long,
            Self::F32 => SlotKind::Float,
            Self::F64 => SlotKind::Double,
            Self::Reference => SlotKind::Ref,
            Self::Void => SlotKind::Void,
        }
    }

    /// True when this kind is already the canonical representative of its
    /// erasure.
    #[inline]
    pub const fn is_canonical(self) -> bool {
        matches!(
            self,
            Self::I32 | Self::I64 | Self::F32 | Self::F64 | Self::Reference | Self::Void
        )
    }

    /// The canonical surface kind for an erased slot kind.
    #[inline]
    pub const fn canonical(kind: SlotKind) -> Self {
        match kind {
            SlotKind::Ref => Self::Reference,
            SlotKind::Int => Self::I32,
            SlotKind::Long => Self::I64,
            SlotKind::Float => Self::F32,
            SlotKind::Double => Self::F64,
            SlotKind::Void => Self::Void,
        }
    }

    /// Short display name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Reference => "ref",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn erasure_is_idempotent() {
        for kind in [
            TypeKind::Bool,
            TypeKind::I8,
            TypeKind::I16,
            TypeKind::U16,
            TypeKind::I32,
            TypeKind::I64,
            TypeKind::F32,
            TypeKind::F64,
            TypeKind::Reference,
            TypeKind::Void,
        ] {
            let once = kind.erased();
            let twice = TypeKind::canonical(once).erased();
            assert_eq!(once, twice, "erasure not idempotent for {kind}");
            assert!(TypeKind::canonical(once).is_canonical());
        }
    }

    #[test]
    fn slot_widths() {
        assert_eq!(SlotKind::Ref.slot_width(), 1);
        assert_eq!(SlotKind::Int.slot_width(), 1);
        assert_eq!(SlotKind::Float.slot_width(), 1);
        assert_eq!(SlotKind::Long.slot_width(), 2);
        assert_eq!(SlotKind::Double.slot_width(), 2);
        assert_eq!(SlotKind::Void.slot_width(), 0);
    }

    #[test]
    fn ordinal_round_trip() {
        for ord in 0..SlotKind::COUNT as u32 {
            let kind = SlotKind::from_ordinal(ord).unwrap();
            assert_eq!(kind.ordinal(), ord);
        }
        assert_eq!(SlotKind::from_ordinal(6), None);
    }
}
