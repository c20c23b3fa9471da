// demand.rs - Required / Expected / On-demand classification
//
// A backend declares, per producible quantity, how eagerly it computes it.
// Before each tick the policy turns the previous output's slots and the
// input's explicit requests into a ComputePlan.

use crate::data::{CompositeData, Data, QueryMode, TypeKey};
use crate::step::DataRequests;
use std::collections::{BTreeMap, BTreeSet};

/// How eagerly a quantity is produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Demand {
    /// Computed every tick.
    Required,
    /// Computed while a slot for it exists on the previous output.
    Expected,
    /// Computed only when queried on the previous output or requested
    /// through the input.
    OnDemand,
}

/// Quantities a backend can produce, keyed by tier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DemandPolicy {
    tiers: BTreeMap<TypeKey, Demand>,
    initial: BTreeSet<TypeKey>,
}

impl DemandPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<T: Data>(self) -> Self {
        self.with_tier(TypeKey::of::<T>(), Demand::Required)
    }

    pub fn expected<T: Data>(self) -> Self {
        self.with_tier(TypeKey::of::<T>(), Demand::Expected)
    }

    pub fn on_demand<T: Data>(self) -> Self {
        self.with_tier(TypeKey::of::<T>(), Demand::OnDemand)
    }

    /// Produce `T` on the first cycle, before any consumer had a chance to ask.
    pub fn initially<T: Data>(mut self) -> Self {
        self.initial.insert(TypeKey::of::<T>());
        self
    }

    pub fn with_tier(mut self, key: TypeKey, demand: Demand) -> Self {
        self.tiers.insert(key, demand);
        self
    }

    /// Add `key` to the first-cycle set. Returns `false` for keys this
    /// policy cannot produce.
    pub fn add_initial(&mut self, key: TypeKey) -> bool {
        if self.tiers.contains_key(&key) {
            self.initial.insert(key);
            true
        } else {
            false
        }
    }

    /// Resolve a type name (full path or last segment) against the
    /// producible keys.
    pub fn key_named(&self, name: &str) -> Option<TypeKey> {
        self.tiers.keys().copied().find(|key| {
            let full = key.name();
            full == name || full.rsplit("::").next() == Some(name)
        })
    }

    pub fn tier(&self, key: TypeKey) -> Option<Demand> {
        self.tiers.get(&key).copied()
    }

    pub fn tier_of<T: Data>(&self) -> Option<Demand> {
        self.tier(TypeKey::of::<T>())
    }

    pub fn keys(&self) -> impl Iterator<Item = (TypeKey, Demand)> + '_ {
        self.tiers.iter().map(|(key, demand)| (*key, *demand))
    }

    pub fn initial(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.initial.iter().copied()
    }

    /// Decide what to compute this tick.
    ///
    /// Must run before `previous` has its queries reset. An empty
    /// `previous` is treated as the first cycle and pulls in the initial
    /// set.
    pub fn plan(&self, previous: &CompositeData, requests: Option<&DataRequests>) -> ComputePlan {
        let first_cycle = previous.is_empty();
        let requested = |key: TypeKey| requests.is_some_and(|r| r.contains(key));

        let mut compute = BTreeMap::new();
        for (&key, &tier) in &self.tiers {
            let status = previous.status_of_key(key);
            let seeded = first_cycle && self.initial.contains(&key);
            let wanted = match tier {
                Demand::Required => true,
                Demand::Expected => status.exists || requested(key) || seeded,
                Demand::OnDemand => status.queried || requested(key) || seeded,
            };
            if wanted {
                compute.insert(key, tier);
            }
        }

        let mut unsupported: Vec<TypeKey> = previous
            .types(QueryMode::Queried)
            .into_iter()
            .chain(requests.into_iter().flat_map(|r| r.iter()))
            .filter(|key| !self.tiers.contains_key(key) && *key != TypeKey::of::<DataRequests>())
            .collect();
        unsupported.sort_unstable();
        unsupported.dedup();

        ComputePlan {
            compute,
            unsupported,
            first_cycle,
        }
    }

    /// Plan that computes everything this policy knows about.
    pub fn plan_all(&self) -> ComputePlan {
        ComputePlan {
            compute: self.tiers.clone(),
            unsupported: Vec::new(),
            first_cycle: false,
        }
    }
}

/// The set of quantities a backend must write this tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComputePlan {
    compute: BTreeMap<TypeKey, Demand>,
    unsupported: Vec<TypeKey>,
    first_cycle: bool,
}

impl ComputePlan {
    pub fn wants<T: Data>(&self) -> bool {
        self.wants_key(TypeKey::of::<T>())
    }

    pub fn wants_key(&self, key: TypeKey) -> bool {
        self.compute.contains_key(&key)
    }

    pub fn tier_of<T: Data>(&self) -> Option<Demand> {
        self.compute.get(&TypeKey::of::<T>()).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = (TypeKey, Demand)> + '_ {
        self.compute.iter().map(|(key, demand)| (*key, *demand))
    }

    /// Keys consumers asked for that the backend cannot produce.
    pub fn unsupported(&self) -> &[TypeKey] {
        &self.unsupported
    }

    pub fn is_first_cycle(&self) -> bool {
        self.first_cycle
    }

    pub fn len(&self) -> usize {
        self.compute.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compute.is_empty()
    }
}
