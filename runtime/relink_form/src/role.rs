//! Role tags for the per-form plan and entry-point caches.

/// The roles a cached plan (or its lowered entry point) can play for one
/// call-signature form.
///
/// One cache slot exists per role per erased form; all signatures
/// sharing an erasure share the slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FormRole {
    /// General-purpose invoker over an exact argument list.
    Invoker = 0,
    /// Linker for call sites resolved against the exact signature.
    ExactLinker = 1,
    /// Linker for call sites that accept any compatible signature.
    GenericLinker = 2,
    /// Plan dispatched through the reference interpreter.
    Interpreter = 3,
    /// Re-binding plan: folds a fresh target into the capture record.
    Rebind = 4,
    /// Plan delegating to another plan carried in the capture record.
    Delegate = 5,
    /// Argument-collecting adapter plan.
    Collector = 6,
    /// Argument-spreading adapter plan.
    Spreader = 7,
}

impl FormRole {
    /// Number of roles, and the length of each role-indexed cache array.
    pub const COUNT: usize = 8;

    /// All roles in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Invoker,
        Self::ExactLinker,
        Self::GenericLinker,
        Self::Interpreter,
        Self::Rebind,
        Self::Delegate,
        Self::Collector,
        Self::Spreader,
    ];

    /// The role's cache array index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn indices_are_dense_and_ordered() {
        for (i, role) in FormRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }
}
