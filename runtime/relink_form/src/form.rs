//! Interned per-signature metadata and the role-indexed caches.

use std::fmt;
use std::sync::{Arc, OnceLock};

use relink_ir::CallSignature;
use relink_plan::Plan;

use crate::counts::PackedCounts;
use crate::flags::FormFlags;
use crate::lower::EntryPoint;
use crate::role::FormRole;
use crate::tables::SlotTables;

/// Role-indexed caches for derived plans and their lowered entry points.
///
/// Slots are write-once: under a race the first writer wins and every
/// caller observes the surviving occupant. Plan slots hold strong
/// references; a role plan lives as long as its form (which the registry
/// interns for the process lifetime).
pub struct RoleCaches {
    plans: [OnceLock<Arc<Plan>>; FormRole::COUNT],
    entries: [OnceLock<Arc<dyn EntryPoint>>; FormRole::COUNT],
}

impl RoleCaches {
    pub(crate) fn new() -> Self {
        Self {
            plans: std::array::from_fn(|_| OnceLock::new()),
            entries: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// The cached plan for `role`, if one was stored.
    pub fn plan_for(&self, role: FormRole) -> Option<Arc<Plan>> {
        self.plans[role.index()].get().cloned()
    }

    /// Store `plan` for `role` unless a plan is already present; returns
    /// the surviving occupant either way.
    pub fn store_plan(&self, role: FormRole, plan: Arc<Plan>) -> Arc<Plan> {
        Arc::clone(self.plans[role.index()].get_or_init(|| plan))
    }

    /// The cached entry point for `role`, if one was stored.
    pub fn entry_for(&self, role: FormRole) -> Option<Arc<dyn EntryPoint>> {
        self.entries[role.index()].get().cloned()
    }

    /// Store `entry` for `role` unless one is already present; returns
    /// the surviving occupant either way.
    pub fn store_entry(&self, role: FormRole, entry: Arc<dyn EntryPoint>) -> Arc<dyn EntryPoint> {
        Arc::clone(self.entries[role.index()].get_or_init(|| entry))
    }
}

impl fmt::Debug for RoleCaches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled = self.plans.iter().filter(|s| s.get().is_some()).count();
        write!(f, "RoleCaches({filled}/{} plans)", FormRole::COUNT)
    }
}

/// The interned metadata for one call signature.
///
/// Forms for non-erased signatures carry their own counts and flags but
/// share the slot tables and role caches of their erasure's form, so an
/// adapter cached for `(i32)->i64` is found by `(bool)->i64` too.
pub struct SignatureForm {
    signature: CallSignature,
    counts: PackedCounts,
    flags: FormFlags,
    tables: Arc<SlotTables>,
    caches: Arc<RoleCaches>,
    /// The erasure's form; `None` when this form is its own erasure.
    erasure: Option<Arc<SignatureForm>>,
}

impl SignatureForm {
    pub(crate) fn own(signature: CallSignature, tables: Arc<SlotTables>) -> Self {
        let counts = PackedCounts::of(&signature);
        let flags = FormFlags::of(&signature, counts);
        debug_assert!(flags.contains(FormFlags::IS_ERASED));
        Self {
            signature,
            counts,
            flags,
            tables,
            caches: Arc::new(RoleCaches::new()),
            erasure: None,
        }
    }

    pub(crate) fn delegating(signature: CallSignature, erasure: Arc<SignatureForm>) -> Self {
        let counts = PackedCounts::of(&signature);
        let flags = FormFlags::of(&signature, counts);
        Self {
            signature,
            counts,
            flags,
            tables: Arc::clone(&erasure.tables),
            caches: Arc::clone(&erasure.caches),
            erasure: Some(erasure),
        }
    }

    /// The interned signature.
    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    /// Packed slot statistics.
    pub fn counts(&self) -> PackedCounts {
        self.counts
    }

    /// Shape flags.
    pub fn flags(&self) -> FormFlags {
        self.flags
    }

    /// Slot index tables (shared with the erasure's form).
    pub fn tables(&self) -> &Arc<SlotTables> {
        &self.tables
    }

    /// Role caches (shared with the erasure's form).
    pub fn caches(&self) -> &RoleCaches {
        &self.caches
    }

    /// The form of this signature's erasure; `self` when already erased.
    pub fn erased_form(self: &Arc<Self>) -> Arc<SignatureForm> {
        match &self.erasure {
            Some(form) => Arc::clone(form),
            None => Arc::clone(self),
        }
    }

    /// True when this form is its own erasure.
    pub fn is_erased(&self) -> bool {
        self.erasure.is_none()
    }
}

impl fmt::Debug for SignatureForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureForm({})", self.signature)
    }
}
