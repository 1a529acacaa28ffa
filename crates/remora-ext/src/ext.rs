//! Extension-method facade: attachment operations as methods on the host
//! handle itself.
//!
//! Everything here forwards to the global [`AttachmentStore`]; the trait
//! exists purely so `host.set_attached(..)` reads like the capability it
//! adds, without threading a store handle through client code.

use std::any::Any;
use std::sync::Arc;

use remora_store::{AttachedValue, Attachment, AttachmentStore, Result};

use crate::copy;
use crate::identity::{self, ReferenceId};

/// Attachment operations for any shared host handle.
///
/// Implemented for every `Arc<H>` with `H: Any + Send + Sync`.
pub trait AttachmentExt {
    /// Store `value` under `key` on this instance.
    fn set_attached<V>(&self, key: &str, value: V) -> Result<()>
    where
        V: Any + Send + Sync;

    /// Store `value` under its type-derived key.
    fn set_attached_by_type<V>(&self, value: V)
    where
        V: Any + Send + Sync;

    /// The value stored under `key`, if any.
    fn get_attached<V>(&self, key: &str) -> Result<Option<Arc<V>>>
    where
        V: Any + Send + Sync;

    /// The value stored under `V`'s type-derived key, if any.
    fn get_attached_by_type<V>(&self) -> Result<Option<Arc<V>>>
    where
        V: Any + Send + Sync;

    /// The value under `key`, storing `factory()` first if the slot is
    /// empty.
    fn get_or_set_attached<V, F>(&self, key: &str, factory: F) -> Result<Attachment<Arc<V>>>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> V;

    /// The value under `V`'s type-derived key, storing `factory()` first
    /// if the slot is empty.
    fn get_or_set_attached_by_type<V, F>(&self, factory: F) -> Result<Attachment<Arc<V>>>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> V;

    /// Remove and return the value under `key`.
    fn remove_attached(&self, key: &str) -> Result<Option<AttachedValue>>;

    /// Every key attached to this instance.
    fn attachment_keys(&self) -> Vec<String>;

    /// Discard every attachment on this instance.
    fn clear_attached(&self);

    /// The stable identifier of this instance.
    fn reference_id(&self) -> Result<ReferenceId>;

    /// Copy this instance's attachments onto `target`, returning how many
    /// were copied.
    fn copy_attachments_to<T>(&self, target: &Arc<T>) -> Result<usize>
    where
        T: Any + Send + Sync;
}

impl<H> AttachmentExt for Arc<H>
where
    H: Any + Send + Sync,
{
    fn set_attached<V>(&self, key: &str, value: V) -> Result<()>
    where
        V: Any + Send + Sync,
    {
        AttachmentStore::global().set_value(self, key, value)
    }

    fn set_attached_by_type<V>(&self, value: V)
    where
        V: Any + Send + Sync,
    {
        AttachmentStore::global().set_value_by_type(self, value);
    }

    fn get_attached<V>(&self, key: &str) -> Result<Option<Arc<V>>>
    where
        V: Any + Send + Sync,
    {
        AttachmentStore::global().get_value(self, key)
    }

    fn get_attached_by_type<V>(&self) -> Result<Option<Arc<V>>>
    where
        V: Any + Send + Sync,
    {
        AttachmentStore::global().get_value_by_type(self)
    }

    fn get_or_set_attached<V, F>(&self, key: &str, factory: F) -> Result<Attachment<Arc<V>>>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> V,
    {
        AttachmentStore::global().get_or_set_value(self, key, factory)
    }

    fn get_or_set_attached_by_type<V, F>(&self, factory: F) -> Result<Attachment<Arc<V>>>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> V,
    {
        AttachmentStore::global().get_or_set_value_by_type(self, factory)
    }

    fn remove_attached(&self, key: &str) -> Result<Option<AttachedValue>> {
        AttachmentStore::global().remove(self, key)
    }

    fn attachment_keys(&self) -> Vec<String> {
        AttachmentStore::global().keys(self)
    }

    fn clear_attached(&self) {
        AttachmentStore::global().clear(self);
    }

    fn reference_id(&self) -> Result<ReferenceId> {
        identity::reference_id(self)
    }

    fn copy_attachments_to<T>(&self, target: &Arc<T>) -> Result<usize>
    where
        T: Any + Send + Sync,
    {
        copy::copy_attachments(self, target)
    }
}
