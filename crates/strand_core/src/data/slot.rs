// slot.rs - Single type-erased storage cell
//
// A slot owns exactly one boxed value plus the bookkeeping the step
// protocol needs: whether the value was read this cycle and which demand
// tier (if any) it was produced under.

use crate::data::Data;
use crate::step::Demand;
use std::any::{type_name, Any};
use std::cell::Cell;
use std::fmt;

/// Object-safe view over a stored value.
pub(crate) trait ErasedData: Send + Sync {
    fn clone_boxed(&self) -> Box<dyn ErasedData>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Data> ErasedData for T {
    fn clone_boxed(&self) -> Box<dyn ErasedData> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Storage cell for one value of one type.
///
/// The queried flag lives in a `Cell` so read-only queries can set it.
/// That makes a slot `Send` but not `Sync`: a container is read by one
/// consumer at a time, parallel consumers work on their own copies.
pub struct Slot {
    value: Box<dyn ErasedData>,
    type_name: &'static str,
    queried: Cell<bool>,
    demand: Option<Demand>,
}

impl Slot {
    /// Wrap `value` in a fresh, unqueried, unclassified slot.
    pub fn new<T: Data>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
            queried: Cell::new(false),
            demand: None,
        }
    }

    /// Borrow the value without touching the queried flag.
    pub fn value<T: Data>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow the value without touching the queried flag.
    pub fn value_mut<T: Data>(&mut self) -> Option<&mut T> {
        self.value.as_any_mut().downcast_mut::<T>()
    }

    /// Borrow the value and mark the slot as queried.
    pub fn query<T: Data>(&self) -> Option<&T> {
        let value = self.value.as_any().downcast_ref::<T>()?;
        self.queried.set(true);
        Some(value)
    }

    /// Mutably borrow the value and mark the slot as queried.
    pub fn query_mut<T: Data>(&mut self) -> Option<&mut T> {
        let value = self.value.as_any_mut().downcast_mut::<T>()?;
        self.queried.set(true);
        Some(value)
    }

    /// Overwrite the stored value. The queried flag is left as is.
    ///
    /// Callers must have matched the slot's key to `T`.
    pub(crate) fn assign<T: Data>(&mut self, value: T) -> &mut T {
        match self.value.as_any_mut().downcast_mut::<T>() {
            Some(current) => *current = value,
            None => {
                self.value = Box::new(value);
                self.type_name = type_name::<T>();
            }
        }
        self.typed_mut()
    }

    /// Typed access for callers that already matched the slot's key.
    pub(crate) fn typed_mut<T: Data>(&mut self) -> &mut T {
        let stored = self.type_name;
        self.value
            .as_any_mut()
            .downcast_mut::<T>()
            .unwrap_or_else(|| panic!("slot holds {stored}, not {}", type_name::<T>()))
    }

    #[inline]
    pub fn is_queried(&self) -> bool {
        self.queried.get()
    }

    #[inline]
    pub fn mark_queried(&self) {
        self.queried.set(true);
    }

    #[inline]
    pub fn unquery(&self) {
        self.queried.set(false);
    }

    /// Tier this slot was produced or pinned under.
    #[inline]
    pub fn demand(&self) -> Option<Demand> {
        self.demand
    }

    #[inline]
    pub fn set_demand(&mut self, demand: Option<Demand>) {
        self.demand = demand;
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.demand == Some(Demand::Required)
    }

    /// Name of the stored type, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Clone for Slot {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone_boxed(),
            type_name: self.type_name,
            queried: Cell::new(self.queried.get()),
            demand: self.demand,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("type", &self.type_name)
            .field("queried", &self.queried.get())
            .field("demand", &self.demand)
            .finish()
    }
}
