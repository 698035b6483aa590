//! Bidirectional parameter-index / slot-index tables.
//!
//! Physical calling sequences address values by slot, where two-slot
//! kinds occupy a pair; logical code addresses them by parameter index.
//! The tables translate both ways. Table shape depends only on the
//! parameter width sequence, so every signature without two-slot kinds
//! and with the same parameter count shares one table instance (the
//! registry pools those, and sharing is observable through `Arc`
//! identity).

use relink_ir::CallSignature;

/// Parameter index to slot index translation, both directions.
#[derive(Debug, PartialEq, Eq)]
pub struct SlotTables {
    /// First slot occupied by each parameter.
    arg_to_slot: Box<[u32]>,
    /// Owning parameter of each slot (both slots of a wide parameter
    /// name the same owner).
    slot_to_arg: Box<[u32]>,
}

impl SlotTables {
    /// Tables for a signature's erased parameter widths.
    pub fn of(signature: &CallSignature) -> Self {
        let mut arg_to_slot = Vec::with_capacity(signature.param_count());
        let mut slot_to_arg = Vec::new();
        for (arg, kind) in signature.erased_params().enumerate() {
            arg_to_slot.push(slot_to_arg.len() as u32);
            for _ in 0..kind.slot_width() {
                slot_to_arg.push(arg as u32);
            }
        }
        Self {
            arg_to_slot: arg_to_slot.into_boxed_slice(),
            slot_to_arg: slot_to_arg.into_boxed_slice(),
        }
    }

    /// Tables for `count` one-slot parameters (the shared shape).
    pub fn uniform(count: usize) -> Self {
        Self {
            arg_to_slot: (0..count as u32).collect(),
            slot_to_arg: (0..count as u32).collect(),
        }
    }

    /// Logical parameter count.
    #[inline]
    pub fn param_count(&self) -> usize {
        self.arg_to_slot.len()
    }

    /// Physical slot count.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_to_arg.len()
    }

    /// First slot occupied by parameter `arg`.
    #[inline]
    pub fn slot_of(&self, arg: usize) -> u32 {
        self.arg_to_slot[arg]
    }

    /// Parameter owning slot `slot`.
    #[inline]
    pub fn arg_at_slot(&self, slot: usize) -> u32 {
        self.slot_to_arg[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relink_ir::TypeKind;

    #[test]
    fn wide_parameters_take_slot_pairs() {
        let sig = CallSignature::new(
            vec![TypeKind::Reference, TypeKind::I64, TypeKind::I32, TypeKind::F64],
            TypeKind::Void,
        )
        .unwrap();
        let tables = SlotTables::of(&sig);
        assert_eq!(tables.param_count(), 4);
        assert_eq!(tables.slot_count(), 6);
        assert_eq!(tables.slot_of(0), 0);
        assert_eq!(tables.slot_of(1), 1);
        assert_eq!(tables.slot_of(2), 3);
        assert_eq!(tables.slot_of(3), 4);
        assert_eq!(tables.arg_at_slot(1), 1);
        assert_eq!(tables.arg_at_slot(2), 1);
        assert_eq!(tables.arg_at_slot(5), 3);
    }

    #[test]
    fn narrow_signatures_match_the_uniform_shape() {
        let sig = CallSignature::new(
            vec![TypeKind::Bool, TypeKind::I32, TypeKind::Reference],
            TypeKind::I32,
        )
        .unwrap();
        assert_eq!(SlotTables::of(&sig), SlotTables::uniform(3));
    }
}
