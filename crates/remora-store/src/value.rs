//! Dynamically typed attachment values and get-or-set outcomes.
//!
//! The store never interprets what callers attach. It moves
//! [`AttachedValue`] handles around; only a caller that knows the concrete
//! type can look inside one. The handle captures the concrete type's path
//! and identity at construction so derived keys and mismatch reports stay
//! accurate after the type has been erased.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::key;

/// A dynamically typed, cheaply clonable attachment value.
///
/// Internally an `Arc<dyn Any + Send + Sync>`: clones share one underlying
/// value. The concrete type is fixed at construction; use
/// [`downcast`](Self::downcast) or [`downcast_ref`](Self::downcast_ref) to
/// get it back.
#[derive(Clone)]
pub struct AttachedValue {
    value: Arc<dyn Any + Send + Sync>,
    /// Path of the concrete type, captured before erasure.
    type_name: &'static str,
    /// Token of the concrete `TypeId`, captured before erasure.
    type_token: u64,
}

impl AttachedValue {
    /// Wrap an owned value.
    pub fn new<V: Any + Send + Sync>(value: V) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without copying it.
    pub fn from_arc<V: Any + Send + Sync>(value: Arc<V>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<V>(),
            type_token: key::type_token(TypeId::of::<V>()),
        }
    }

    /// Path of the concrete type stored in this value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The type-derived attachment key for this value's concrete type.
    ///
    /// Equal to [`key::type_key`] of the concrete type.
    pub fn type_key(&self) -> String {
        key::compose_type_key(self.type_name, self.type_token)
    }

    /// `true` if the stored value is a `V`.
    pub fn is<V: Any>(&self) -> bool {
        self.value.is::<V>()
    }

    /// Borrow the stored value as a `V`, if it is one.
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref()
    }

    /// Recover the shared value as an `Arc<V>`.
    ///
    /// On a type mismatch the original handle is returned unchanged.
    pub fn downcast<V: Any + Send + Sync>(self) -> std::result::Result<Arc<V>, AttachedValue> {
        let Self {
            value,
            type_name,
            type_token,
        } = self;
        value.downcast().map_err(|value| Self {
            value,
            type_name,
            type_token,
        })
    }
}

impl fmt::Debug for AttachedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttachedValue<{}>", self.type_name)
    }
}

/// Outcome of a get-or-set: the value now present at the key, plus whether
/// it was already there before the call resolved.
#[derive(Clone, Debug)]
pub struct Attachment<V> {
    value: V,
    found: bool,
}

impl<V> Attachment<V> {
    pub(crate) fn new(value: V, found: bool) -> Self {
        Self { value, found }
    }

    /// `true` if a value already existed at the key.
    ///
    /// When several callers race on an empty slot, exactly one of them
    /// observes `false`.
    pub fn found(&self) -> bool {
        self.found
    }

    /// The value now stored at the key.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consume the outcome, keeping only the stored value.
    pub fn into_value(self) -> V {
        self.value
    }
}
