//! Reference identity: a stable random identifier per object instance.
//!
//! Rust has no universal object identity an application can persist: `Arc`
//! addresses are reused after deallocation and mean nothing across
//! processes. [`reference_id`] fills the gap by lazily attaching a random
//! [`ReferenceId`] to the instance itself, so every caller that can reach
//! the same `Arc` observes the same identifier, while value-equal but
//! distinct instances observe different ones.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use remora_store::{AttachmentStore, Result};

/// Attachment key reserved for the reference identifier slot.
///
/// Deliberately well known: copying attachments moves this slot like any
/// other unless the caller filters it out, which is exactly how a copied
/// object keeps (or sheds) its identity.
pub const REFERENCE_ID_KEY: &str = "remora.reference-id";

/// Random identifier for one object instance (UUID v4).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceId(uuid::Uuid);

impl ReferenceId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for ReferenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReferenceId({})", self.short_id())
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identifier consistently associated with this exact instance.
///
/// The first call on an instance stores a fresh [`ReferenceId`] under
/// [`REFERENCE_ID_KEY`] in the global store; every later call on the same
/// instance (through any clone of the `Arc`) returns that same id. Fails
/// only if a caller has stored a foreign value under the reserved key.
pub fn reference_id<H>(host: &Arc<H>) -> Result<ReferenceId>
where
    H: Any + Send + Sync,
{
    let resolved =
        AttachmentStore::global().get_or_set_value(host, REFERENCE_ID_KEY, ReferenceId::new)?;
    Ok(*resolved.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_store::AttachError;

    // ---- Test 1: identity is stable per instance ----

    #[test]
    fn same_instance_keeps_one_id() {
        let host = Arc::new("stable".to_string());
        let first = reference_id(&host).unwrap();
        let second = reference_id(&host).unwrap();
        assert_eq!(first, second);
    }

    // ---- Test 2: clones of one Arc agree ----

    #[test]
    fn arc_clones_share_the_id() {
        let host = Arc::new(vec![1u8, 2, 3]);
        let alias = Arc::clone(&host);
        assert_eq!(reference_id(&host).unwrap(), reference_id(&alias).unwrap());
    }

    // ---- Test 3: equal values, distinct instances ----

    #[test]
    fn equal_instances_get_distinct_ids() {
        let first = Arc::new("twin".to_string());
        let second = Arc::new("twin".to_string());
        assert_eq!(first, second);
        assert_ne!(reference_id(&first).unwrap(), reference_id(&second).unwrap());
    }

    // ---- Test 4: the reserved slot is visible and typed ----

    #[test]
    fn id_lives_under_the_reserved_key() {
        let host = Arc::new(0u64);
        let id = reference_id(&host).unwrap();
        let stored = AttachmentStore::global()
            .get_value::<_, ReferenceId>(&host, REFERENCE_ID_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(*stored, id);
    }

    #[test]
    fn foreign_value_in_reserved_slot_is_an_error() {
        let host = Arc::new(0i64);
        AttachmentStore::global()
            .set_value(&host, REFERENCE_ID_KEY, "not an id".to_string())
            .unwrap();
        let err = reference_id(&host).unwrap_err();
        assert!(matches!(err, AttachError::TypeMismatch { .. }));
    }

    // ---- Test 5: value type behavior ----

    #[test]
    fn fresh_ids_are_unique() {
        let a = ReferenceId::new();
        let b = ReferenceId::new();
        assert_ne!(a, b);
        assert_ne!(ReferenceId::default(), ReferenceId::default());
    }

    #[test]
    fn short_id_is_a_prefix_of_display() {
        let id = ReferenceId::new();
        assert_eq!(id.short_id().len(), 8);
        assert!(id.to_string().starts_with(&id.short_id()));
        assert!(format!("{id:?}").contains(&id.short_id()));
    }

    #[test]
    fn serde_round_trip() {
        let id = ReferenceId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ReferenceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn from_uuid_preserves_the_value() {
        let uuid = uuid::Uuid::new_v4();
        let id = ReferenceId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
    }
}
