//! Shape flags derived once per form.

use bitflags::bitflags;
use relink_ir::CallSignature;

use crate::counts::PackedCounts;

bitflags! {
    /// Boolean shape facts about a signature, computed at form creation
    /// and read without re-scanning the parameter list.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct FormFlags: u8 {
        /// At least one parameter is primitive-kinded.
        const HAS_PRIMITIVES = 1 << 0;
        /// At least one parameter occupies two slots.
        const HAS_LONG_PRIMITIVES = 1 << 1;
        /// The return kind is primitive.
        const PRIMITIVE_RETURN = 1 << 2;
        /// The return kind occupies two slots.
        const LONG_RETURN = 1 << 3;
        /// The signature returns nothing.
        const VOID_RETURN = 1 << 4;
        /// Every kind is the canonical representative of its erasure.
        const IS_ERASED = 1 << 5;
    }
}

impl FormFlags {
    /// Derive the flags for a signature from its packed counts.
    pub fn of(signature: &CallSignature, counts: PackedCounts) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::HAS_PRIMITIVES, counts.has_primitive_params());
        flags.set(Self::HAS_LONG_PRIMITIVES, counts.has_wide_params());
        flags.set(Self::PRIMITIVE_RETURN, counts.has_primitive_return());
        flags.set(Self::LONG_RETURN, counts.has_wide_return());
        flags.set(
            Self::VOID_RETURN,
            signature.ret().erased() == relink_ir::SlotKind::Void,
        );
        flags.set(Self::IS_ERASED, signature.is_erased());
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relink_ir::TypeKind;

    fn flags_of(params: Vec<TypeKind>, ret: TypeKind) -> FormFlags {
        let sig = CallSignature::new(params, ret).unwrap();
        FormFlags::of(&sig, PackedCounts::of(&sig))
    }

    #[test]
    fn erased_reference_signature_is_plain() {
        let flags = flags_of(vec![TypeKind::Reference], TypeKind::Reference);
        assert_eq!(flags, FormFlags::IS_ERASED);
    }

    #[test]
    fn wide_and_void_shapes_are_detected() {
        let flags = flags_of(vec![TypeKind::I64], TypeKind::Void);
        assert_eq!(
            flags,
            FormFlags::HAS_PRIMITIVES
                | FormFlags::HAS_LONG_PRIMITIVES
                | FormFlags::VOID_RETURN
                | FormFlags::IS_ERASED
        );

        let flags = flags_of(vec![TypeKind::Bool], TypeKind::F64);
        assert!(flags.contains(FormFlags::HAS_PRIMITIVES));
        assert!(!flags.contains(FormFlags::HAS_LONG_PRIMITIVES));
        assert!(flags.contains(FormFlags::PRIMITIVE_RETURN | FormFlags::LONG_RETURN));
        assert!(!flags.contains(FormFlags::IS_ERASED));
    }
}
