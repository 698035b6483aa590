//! The sharded form registry.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use relink_ir::CallSignature;
use rustc_hash::{FxHashMap, FxHasher};

use crate::form::SignatureForm;
use crate::tables::SlotTables;

const NUM_SHARDS: usize = 16;

/// Process-wide interner from call signatures to their forms.
///
/// Lookup is idempotent: the same signature always resolves to the same
/// `Arc<SignatureForm>`, and under a concurrent first use the first
/// inserted form wins while losers are dropped. Forms are retained for
/// the registry's lifetime.
pub struct FormRegistry {
    shards: [RwLock<FxHashMap<CallSignature, Arc<SignatureForm>>>; NUM_SHARDS],
    /// One table instance per parameter count, shared by every signature
    /// without two-slot parameter kinds.
    uniform_tables: RwLock<FxHashMap<usize, Arc<SlotTables>>>,
}

impl FormRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
            uniform_tables: RwLock::new(FxHashMap::default()),
        }
    }

    #[inline]
    fn shard_for(signature: &CallSignature) -> usize {
        let mut hasher = FxHasher::default();
        signature.hash(&mut hasher);
        hasher.finish() as usize % NUM_SHARDS
    }

    /// The interned form for `signature`, creating it on first use.
    #[tracing::instrument(level = "debug", skip_all, fields(signature = %signature))]
    pub fn form_for(&self, signature: &CallSignature) -> Arc<SignatureForm> {
        let shard = &self.shards[Self::shard_for(signature)];
        {
            let guard = shard.read();
            if let Some(form) = guard.get(signature) {
                return Arc::clone(form);
            }
        }

        // Built outside the shard lock: a non-erased signature recurses
        // into its erasure's shard here.
        let built = self.build_form(signature);

        let mut guard = shard.write();
        match guard.get(signature) {
            Some(existing) => Arc::clone(existing),
            None => {
                tracing::debug!(signature = %signature, "form created");
                guard.insert(signature.clone(), Arc::clone(&built));
                built
            }
        }
    }

    fn build_form(&self, signature: &CallSignature) -> Arc<SignatureForm> {
        if signature.is_erased() {
            let tables = self.tables_for(signature);
            Arc::new(SignatureForm::own(signature.clone(), tables))
        } else {
            // Erasure is idempotent, so this recursion bottoms out in
            // one step.
            let erasure = self.form_for(&signature.erased());
            Arc::new(SignatureForm::delegating(signature.clone(), erasure))
        }
    }

    fn tables_for(&self, signature: &CallSignature) -> Arc<SlotTables> {
        let uniform = signature.erased_params().all(|k| k.slot_width() == 1);
        if !uniform {
            return Arc::new(SlotTables::of(signature));
        }
        let count = signature.param_count();
        {
            let guard = self.uniform_tables.read();
            if let Some(tables) = guard.get(&count) {
                return Arc::clone(tables);
            }
        }
        let mut guard = self.uniform_tables.write();
        Arc::clone(
            guard
                .entry(count)
                .or_insert_with(|| Arc::new(SlotTables::uniform(count))),
        )
    }

    /// Total interned form count.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// True when nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FormRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormRegistry")
            .field("forms", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
