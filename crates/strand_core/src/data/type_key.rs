// type_key.rs - Runtime type keys for composite data
//
// Keys are small integers handed out on first use, not Rust TypeIds.
// The catalogue is open: any crate can store a new type without touching
// a central list, and the key stays stable for the life of the process.

use once_cell::sync::Lazy;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Marker for types that can live inside a [`CompositeData`](super::CompositeData).
///
/// Blanket-implemented: any `'static + Clone + Send + Sync` type qualifies.
/// `Clone` is what lets a container deep-copy itself for state snapshots.
pub trait Data: 'static + Clone + Send + Sync {}

impl<T> Data for T where T: 'static + Clone + Send + Sync {}

/// Stable identifier of a stored type. Never reused for another type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey(u32);

/// Registry entry for a stored type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TypeMeta {
    pub key: TypeKey,
    pub name: &'static str,
}

#[derive(Default)]
struct TypeRegistry {
    by_type: HashMap<TypeId, TypeKey>,
    metas: Vec<TypeMeta>,
}

/// Global registry shared by every container in the process.
static REGISTRY: Lazy<RwLock<TypeRegistry>> = Lazy::new(|| RwLock::new(TypeRegistry::default()));

impl TypeKey {
    /// Key of `T`, assigning a fresh one the first time `T` is seen.
    pub fn of<T: Data>() -> Self {
        let id = TypeId::of::<T>();
        if let Some(key) = REGISTRY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_type
            .get(&id)
        {
            return *key;
        }

        let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = registry.by_type.get(&id) {
            // Another thread registered it between the two locks.
            return *key;
        }
        let key = TypeKey(registry.metas.len() as u32);
        registry.metas.push(TypeMeta {
            key,
            name: type_name::<T>(),
        });
        registry.by_type.insert(id, key);
        key
    }

    /// Raw index backing this key.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Registry entry for this key.
    pub fn meta(self) -> Option<TypeMeta> {
        type_meta_of(self)
    }

    /// Human-readable type name, or `"<unregistered>"`.
    pub fn name(self) -> &'static str {
        self.meta().map(|meta| meta.name).unwrap_or("<unregistered>")
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name(), self.0)
    }
}

/// Register `T` up front and return its metadata.
pub fn register<T: Data>() -> TypeMeta {
    let key = TypeKey::of::<T>();
    TypeMeta {
        key,
        name: type_name::<T>(),
    }
}

/// Look up metadata by key.
pub fn type_meta_of(key: TypeKey) -> Option<TypeMeta> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .metas
        .get(key.0 as usize)
        .copied()
}

/// Snapshot of every type registered so far, in key order.
pub fn registered_types() -> Vec<TypeMeta> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .metas
        .clone()
}
