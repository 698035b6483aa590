//! Per-plan transform cache with three escalating storage strategies.
//!
//! Tier 1 holds a single entry; a second distinct key promotes to a small
//! array (4 slots, doubling to 16); a full array with no stale slot
//! promotes, once and irreversibly, to a concurrent map. Entries hold
//! weak references to derived plans: a dead weak at probe time is a stale
//! miss and its slot is refreshed by the next publish. Publication is
//! first-stored-wins — a racing thread that built the same derived plan
//! discards its copy and returns the winner's, never blocking on it.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use relink_ir::TransformKey;

use crate::plan::Plan;

/// Initial capacity of the array tier.
pub(crate) const CACHE_ARRAY_INITIAL: usize = 4;
/// Capacity at which the array tier promotes to a map instead of growing.
pub(crate) const CACHE_ARRAY_MAX: usize = 16;

#[derive(Clone)]
struct Entry {
    key: TransformKey,
    plan: Weak<Plan>,
}

enum Tier {
    Empty,
    Single(Entry),
    Array { entries: Vec<Entry>, cap: usize },
    /// One-time, irreversible promotion target.
    Map(DashMap<TransformKey, Weak<Plan>>),
}

/// Cache of derived plans, keyed by transform key, owned by a base plan.
pub struct TransformCache {
    tier: RwLock<Tier>,
}

impl TransformCache {
    pub(crate) fn new() -> Self {
        Self {
            tier: RwLock::new(Tier::Empty),
        }
    }

    /// Look up a previously published derived plan. A reclaimed entry is
    /// a miss.
    pub fn probe(&self, key: &TransformKey) -> Option<Arc<Plan>> {
        let tier = self.tier.read();
        match &*tier {
            Tier::Empty => None,
            Tier::Single(e) => (e.key == *key).then(|| e.plan.upgrade()).flatten(),
            Tier::Array { entries, .. } => entries
                .iter()
                .find(|e| e.key == *key)
                .and_then(|e| e.plan.upgrade()),
            Tier::Map(map) => map.get(key).and_then(|w| w.upgrade()),
        }
    }

    /// Publish a freshly built derived plan under `key`.
    ///
    /// Returns the surviving plan: the caller's, or — when another thread
    /// published a still-live entry for the same key first — the
    /// winner's. The caller must use the returned plan and drop its own.
    pub fn publish(&self, key: TransformKey, plan: Arc<Plan>) -> Arc<Plan> {
        // Map tier never changes representation again; inserts go through
        // the shard locks without touching the tier lock exclusively.
        {
            let tier = self.tier.read();
            if let Tier::Map(map) = &*tier {
                return Self::publish_to_map(map, key, plan);
            }
        }

        let mut tier = self.tier.write();
        let current = std::mem::replace(&mut *tier, Tier::Empty);
        let (next, winner) = Self::publish_locked(current, key, plan);
        *tier = next;
        winner
    }

    fn publish_to_map(
        map: &DashMap<TransformKey, Weak<Plan>>,
        key: TransformKey,
        plan: Arc<Plan>,
    ) -> Arc<Plan> {
        use dashmap::mapref::entry::Entry as MapEntry;
        match map.entry(key) {
            MapEntry::Occupied(mut occ) => match occ.get().upgrade() {
                Some(winner) => winner,
                None => {
                    // Stale entry: refresh in place.
                    occ.insert(Arc::downgrade(&plan));
                    plan
                }
            },
            MapEntry::Vacant(vac) => {
                vac.insert(Arc::downgrade(&plan));
                plan
            }
        }
    }

    fn publish_locked(current: Tier, key: TransformKey, plan: Arc<Plan>) -> (Tier, Arc<Plan>) {
        let fresh = || Entry {
            key: key.clone(),
            plan: Arc::downgrade(&plan),
        };
        match current {
            Tier::Empty => (Tier::Single(fresh()), plan),
            Tier::Single(e) => {
                if e.key == key {
                    if let Some(winner) = e.plan.upgrade() {
                        return (Tier::Single(e), winner);
                    }
                    return (Tier::Single(fresh()), plan);
                }
                if e.plan.upgrade().is_none() {
                    // The lone slot is stale; reuse it.
                    return (Tier::Single(fresh()), plan);
                }
                let mut entries = Vec::with_capacity(CACHE_ARRAY_INITIAL);
                entries.push(e);
                entries.push(fresh());
                (
                    Tier::Array {
                        entries,
                        cap: CACHE_ARRAY_INITIAL,
                    },
                    plan,
                )
            }
            Tier::Array {
                mut entries,
                mut cap,
            } => {
                if let Some(e) = entries.iter_mut().find(|e| e.key == key) {
                    if let Some(winner) = e.plan.upgrade() {
                        return (Tier::Array { entries, cap }, winner);
                    }
                    *e = fresh();
                    return (Tier::Array { entries, cap }, plan);
                }
                if let Some(stale) = entries.iter_mut().find(|e| e.plan.upgrade().is_none()) {
                    *stale = fresh();
                    return (Tier::Array { entries, cap }, plan);
                }
                if entries.len() == cap && cap < CACHE_ARRAY_MAX {
                    cap *= 2;
                }
                if entries.len() < cap {
                    entries.push(fresh());
                    return (Tier::Array { entries, cap }, plan);
                }
                // Full at maximum capacity with no stale slot: promote.
                let map = DashMap::with_capacity(entries.len() + 1);
                for e in entries {
                    if e.plan.upgrade().is_some() {
                        map.insert(e.key, e.plan);
                    }
                }
                map.insert(key, Arc::downgrade(&plan));
                (Tier::Map(map), plan)
            }
            Tier::Map(map) => {
                let winner = Self::publish_to_map(&map, key, plan);
                (Tier::Map(map), winner)
            }
        }
    }

    /// Number of live entries, for diagnostics and tests.
    pub fn live_len(&self) -> usize {
        let tier = self.tier.read();
        match &*tier {
            Tier::Empty => 0,
            Tier::Single(e) => usize::from(e.plan.upgrade().is_some()),
            Tier::Array { entries, .. } => {
                entries.iter().filter(|e| e.plan.upgrade().is_some()).count()
            }
            Tier::Map(map) => map.iter().filter(|r| r.value().upgrade().is_some()).count(),
        }
    }
}

impl std::fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tier = self.tier.read();
        let name = match &*tier {
            Tier::Empty => "empty",
            Tier::Single(_) => "single",
            Tier::Array { .. } => "array",
            Tier::Map(_) => "map",
        };
        write!(f, "TransformCache({name})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use pretty_assertions::assert_eq;
    use relink_ir::{SlotKind, TransformKind};

    fn some_plan(arity: usize) -> Arc<Plan> {
        let nodes = vec![Node::param(SlotKind::Ref); arity];
        Arc::new(Plan::new(arity as u32, 0, nodes, None).unwrap())
    }

    fn key(n: u32) -> TransformKey {
        TransformKey::new(TransformKind::AddArgument, &[n, 0])
    }

    #[test]
    fn first_stored_wins() {
        let cache = TransformCache::new();
        let a = some_plan(1);
        let b = some_plan(1);
        let stored = cache.publish(key(1), a.clone());
        assert!(Arc::ptr_eq(&stored, &a));
        let racer = cache.publish(key(1), b.clone());
        assert!(Arc::ptr_eq(&racer, &a));
        assert!(Arc::ptr_eq(&cache.probe(&key(1)).unwrap(), &a));
    }

    #[test]
    fn stale_entry_is_a_miss_and_is_refreshed() {
        let cache = TransformCache::new();
        let a = some_plan(1);
        cache.publish(key(1), a);
        // The only strong reference is gone.
        assert!(cache.probe(&key(1)).is_none());
        let b = some_plan(1);
        let stored = cache.publish(key(1), b.clone());
        assert!(Arc::ptr_eq(&stored, &b));
        assert!(Arc::ptr_eq(&cache.probe(&key(1)).unwrap(), &b));
    }

    #[test]
    fn grows_through_all_tiers() {
        let cache = TransformCache::new();
        let mut keep = Vec::new();
        for n in 0..40 {
            let p = some_plan(1);
            keep.push(p.clone());
            cache.publish(key(n), p);
        }
        assert_eq!(cache.live_len(), 40);
        for (n, p) in keep.iter().enumerate() {
            let hit = cache.probe(&key(n as u32)).expect("entry survived promotion");
            assert!(Arc::ptr_eq(&hit, p));
        }
        assert_eq!(format!("{cache:?}"), "TransformCache(map)");
    }

    #[test]
    fn stale_slots_are_reused_before_promotion() {
        let cache = TransformCache::new();
        // Fill the maximum array with live entries, then drop them all.
        let mut keep = Vec::new();
        for n in 0..CACHE_ARRAY_MAX as u32 {
            let p = some_plan(1);
            keep.push(p.clone());
            cache.publish(key(n), p);
        }
        assert_eq!(format!("{cache:?}"), "TransformCache(array)");
        keep.clear();
        // New keys reuse reclaimed slots instead of promoting.
        let p = some_plan(1);
        cache.publish(key(100), p.clone());
        assert_eq!(format!("{cache:?}"), "TransformCache(array)");
        assert!(Arc::ptr_eq(&cache.probe(&key(100)).unwrap(), &p));
    }
}
