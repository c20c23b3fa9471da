// composite.rs - Query-tracked heterogeneous container
//
// Maps TypeKey -> Slot. Reads through `get_or_insert_default`/`query`
// mark slots as queried; `has`, `status_of` and the `*_unqueried` views
// never do. Backends read the flags to decide what to compute next tick.

use crate::data::{Data, DataError, Slot, TypeKey};
use crate::step::Demand;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Heterogeneous value container with per-slot access tracking.
///
/// `Clone` deep-copies every stored value, so a copy never aliases the
/// original. References handed out by accessors borrow the container;
/// any insert, assign or remove needs `&mut self` and therefore ends
/// those borrows first. For lookups cached outside a borrow, compare
/// [`generation`](Self::generation) before reuse.
#[derive(Clone, Debug, Default)]
pub struct CompositeData {
    slots: BTreeMap<TypeKey, Slot>,
    generation: u64,
}

/// Outcome of [`CompositeData::insert`].
#[derive(Debug)]
pub struct InsertResult<'a, T> {
    pub value: &'a mut T,
    pub inserted: bool,
}

/// Side-effect free summary of one type's slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DataStatus {
    pub exists: bool,
    pub queried: bool,
    pub required: bool,
}

/// Filter for [`CompositeData::types`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QueryMode {
    All,
    Queried,
    Unqueried,
}

/// Snapshot of a container's structural generation.
///
/// Used by adapters that remember which keys exist between calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GenerationGuard {
    generation: u64,
}

impl GenerationGuard {
    /// Whether `data` has had no slot created or removed since the guard was taken.
    pub fn is_current(&self, data: &CompositeData) -> bool {
        self.generation == data.generation
    }

    /// Debug-build check that cached lookups are still valid.
    #[inline]
    pub fn debug_assert_current(&self, data: &CompositeData) {
        debug_assert!(
            self.is_current(data),
            "composite data changed structure (generation {} -> {})",
            self.generation,
            data.generation
        );
    }
}

impl CompositeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, creating the slot if needed. Never marks it queried.
    pub fn insert_or_assign<T: Data>(&mut self, value: T) -> &mut T {
        match self.slots.entry(TypeKey::of::<T>()) {
            Entry::Occupied(slot) => slot.into_mut().assign(value),
            Entry::Vacant(vacant) => {
                self.generation += 1;
                vacant.insert(Slot::new(value)).typed_mut()
            }
        }
    }

    /// Store `value` only if no slot for `T` exists yet. Never marks it queried.
    pub fn insert<T: Data>(&mut self, value: T) -> InsertResult<'_, T> {
        match self.slots.entry(TypeKey::of::<T>()) {
            Entry::Occupied(slot) => InsertResult {
                value: slot.into_mut().typed_mut(),
                inserted: false,
            },
            Entry::Vacant(vacant) => {
                self.generation += 1;
                InsertResult {
                    value: vacant.insert(Slot::new(value)).typed_mut(),
                    inserted: true,
                }
            }
        }
    }

    /// Mutable access to `T`, default-constructing it when absent.
    ///
    /// Always marks the slot as queried. The `Default` bound means a type
    /// without a usable default is rejected when the caller compiles.
    pub fn get_or_insert_default<T: Data + Default>(&mut self) -> &mut T {
        let slot = match self.slots.entry(TypeKey::of::<T>()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(vacant) => {
                self.generation += 1;
                vacant.insert(Slot::new(T::default()))
            }
        };
        slot.mark_queried();
        slot.typed_mut()
    }

    /// Read `T` if present, marking its slot as queried.
    ///
    /// Absence is the normal answer for optional data, not an error.
    pub fn query<T: Data>(&self) -> Option<&T> {
        self.slots.get(&TypeKey::of::<T>())?.query::<T>()
    }

    /// Mutable variant of [`query`](Self::query).
    pub fn query_mut<T: Data>(&mut self) -> Option<&mut T> {
        self.slots.get_mut(&TypeKey::of::<T>())?.query_mut::<T>()
    }

    /// Whether a slot for `T` exists. Pure observation.
    pub fn has<T: Data>(&self) -> bool {
        self.slots.contains_key(&TypeKey::of::<T>())
    }

    /// Whether a slot for `key` exists. Pure observation.
    pub fn has_key(&self, key: TypeKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Existence, queried and required flags for `T`. Pure observation.
    pub fn status_of<T: Data>(&self) -> DataStatus {
        self.status_of_key(TypeKey::of::<T>())
    }

    pub fn status_of_key(&self, key: TypeKey) -> DataStatus {
        self.slots
            .get(&key)
            .map(|slot| DataStatus {
                exists: true,
                queried: slot.is_queried(),
                required: slot.is_required(),
            })
            .unwrap_or_default()
    }

    /// Delete the slot for `T`.
    ///
    /// Returns `false` if there was nothing to remove, or if the slot is
    /// required (required slots stay in place).
    pub fn remove<T: Data>(&mut self) -> bool {
        self.remove_key(TypeKey::of::<T>())
    }

    pub fn remove_key(&mut self, key: TypeKey) -> bool {
        match self.slots.get(&key) {
            Some(slot) if !slot.is_required() => {
                self.slots.remove(&key);
                self.generation += 1;
                true
            }
            _ => false,
        }
    }

    /// Clear the queried flag of `T`. Returns whether it was set.
    pub fn unquery<T: Data>(&self) -> bool {
        self.slots
            .get(&TypeKey::of::<T>())
            .map(|slot| {
                let was = slot.is_queried();
                slot.unquery();
                was
            })
            .unwrap_or(false)
    }

    /// Clear every queried flag, keeping slot contents.
    ///
    /// Returns how many slots had been queried.
    pub fn reset_queries(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| {
                let was = slot.is_queried();
                slot.unquery();
                was
            })
            .count()
    }

    /// Ensure `T` exists and pin it as required: it can no longer be removed.
    pub fn make_required<T: Data + Default>(&mut self) -> &mut T {
        let slot = match self.slots.entry(TypeKey::of::<T>()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(vacant) => {
                self.generation += 1;
                vacant.insert(Slot::new(T::default()))
            }
        };
        slot.set_demand(Some(Demand::Required));
        slot.typed_mut()
    }

    /// Whether `T` is pinned as required.
    pub fn requires<T: Data>(&self) -> bool {
        self.status_of::<T>().required
    }

    /// Record the tier a slot was produced under. Returns `false` if absent.
    pub fn classify(&mut self, key: TypeKey, demand: Demand) -> bool {
        match self.slots.get_mut(&key) {
            Some(slot) => {
                slot.set_demand(Some(demand));
                true
            }
            None => false,
        }
    }

    /// Tier recorded for `T`, if any.
    pub fn demand_of<T: Data>(&self) -> Option<Demand> {
        self.slots.get(&TypeKey::of::<T>())?.demand()
    }

    /// Whether every slot has been queried.
    pub fn all_queried(&self) -> bool {
        self.slots.values().all(Slot::is_queried)
    }

    /// Names of the types nobody has read this cycle.
    pub fn unqueried_types(&self) -> Vec<&'static str> {
        self.slots
            .values()
            .filter(|slot| !slot.is_queried())
            .map(Slot::type_name)
            .collect()
    }

    /// Keys matching `mode`, in key order.
    pub fn types(&self, mode: QueryMode) -> Vec<TypeKey> {
        self.slots
            .iter()
            .filter(|(_, slot)| match mode {
                QueryMode::All => true,
                QueryMode::Queried => slot.is_queried(),
                QueryMode::Unqueried => !slot.is_queried(),
            })
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Structural generation: bumped whenever a slot is created or removed.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn guard(&self) -> GenerationGuard {
        GenerationGuard {
            generation: self.generation,
        }
    }

    /// Fail with the names of any `keys` that have no slot.
    pub fn require_all(&self, keys: &[TypeKey]) -> Result<(), DataError> {
        let missing: Vec<&'static str> = keys
            .iter()
            .filter(|key| !self.slots.contains_key(*key))
            .map(|key| key.name())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::MissingRequired { missing })
        }
    }

    /// Overwrite `self` with a deep copy of `other`.
    ///
    /// With `merge_requirements`, slots pinned as required in `self` but
    /// absent from `other` survive the copy and keep their values.
    pub fn copy_from(&mut self, other: &CompositeData, merge_requirements: bool) {
        let kept: BTreeMap<TypeKey, Slot> = if merge_requirements {
            std::mem::take(&mut self.slots)
                .into_iter()
                .filter(|(key, slot)| slot.is_required() && !other.slots.contains_key(key))
                .collect()
        } else {
            BTreeMap::new()
        };

        self.slots = other.slots.clone();
        self.slots.extend(kept);
        self.generation += 1;
    }

    /// Deep-copy every slot of `other` into `self`, last writer wins.
    ///
    /// Keys present in both end up holding `other`'s value and flags.
    /// With `merge_requirements`, a slot required in either side stays
    /// required.
    pub fn merge(&mut self, other: &CompositeData, merge_requirements: bool) {
        for (key, incoming) in &other.slots {
            let was_required = self
                .slots
                .get(key)
                .map(Slot::is_required)
                .unwrap_or(false);
            let mut slot = incoming.clone();
            if merge_requirements && was_required {
                slot.set_demand(Some(Demand::Required));
            }
            if self.slots.insert(*key, slot).is_none() {
                self.generation += 1;
            }
        }
    }

    /// Raw slot access for diagnostics and adapters.
    pub fn slot(&self, key: TypeKey) -> Option<&Slot> {
        self.slots.get(&key)
    }

    pub fn slots(&self) -> impl Iterator<Item = (TypeKey, &Slot)> {
        self.slots.iter().map(|(key, slot)| (*key, slot))
    }
}
