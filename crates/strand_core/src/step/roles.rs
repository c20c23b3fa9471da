// roles.rs - Input / Output / State container roles
//
// All three are plain composite data. Separate types keep a backend from
// being handed an output where it expects a snapshot.

use crate::data::{CompositeData, Data, TypeKey};
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

macro_rules! data_role {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default)]
        pub struct $name(CompositeData);

        impl $name {
            pub fn new() -> Self {
                Self(CompositeData::new())
            }

            pub fn into_inner(self) -> CompositeData {
                self.0
            }
        }

        impl From<CompositeData> for $name {
            fn from(data: CompositeData) -> Self {
                Self(data)
            }
        }

        impl Deref for $name {
            type Target = CompositeData;

            fn deref(&self) -> &CompositeData {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut CompositeData {
                &mut self.0
            }
        }
    };
}

data_role!(
    /// Externally supplied commands for one tick.
    Input
);

data_role!(
    /// Backend-produced results for one tick.
    ///
    /// Kept across ticks by the stepper so consumer queries on it can
    /// steer what the next tick computes.
    Output
);

data_role!(
    /// Deep-copyable snapshot of live engine state.
    State
);

/// Explicit on-demand requests carried by an [`Input`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataRequests {
    keys: BTreeSet<TypeKey>,
}

impl DataRequests {
    pub fn request<T: Data>(&mut self) {
        self.keys.insert(TypeKey::of::<T>());
    }

    pub fn request_key(&mut self, key: TypeKey) {
        self.keys.insert(key);
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.keys.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Input {
    /// Ask the backend to produce `T` on the coming tick.
    pub fn request<T: Data>(&mut self) {
        self.get_or_insert_default::<DataRequests>().request::<T>();
    }

    /// Pending requests, if any were made.
    pub fn requests(&self) -> Option<&DataRequests> {
        self.query::<DataRequests>()
    }
}
