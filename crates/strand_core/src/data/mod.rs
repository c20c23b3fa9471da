//! Type-erased, query-tracked data containers.
//!
//! A [`CompositeData`] holds at most one value per Rust type. Each value
//! sits in a [`Slot`] that remembers whether it was read since the last
//! [`CompositeData::reset_queries`]. Backends use those flags to decide
//! which quantities consumers actually want.

mod composite;
mod error;
mod slot;
mod type_key;

#[cfg(test)]
pub(crate) mod test_types;

pub use composite::{CompositeData, DataStatus, GenerationGuard, InsertResult, QueryMode};
pub use error::DataError;
pub use slot::Slot;
pub use type_key::{register, registered_types, type_meta_of, Data, TypeKey, TypeMeta};
