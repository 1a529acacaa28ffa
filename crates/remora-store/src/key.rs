//! Attachment keys: validation and type-derived defaults.
//!
//! Keys are arbitrary non-empty UTF-8 strings; the store imposes no other
//! structure on them. Callers that do not want to invent a name can use the
//! key derived from the attached value's concrete type, so every call site
//! storing the same type lands on the same slot of a host.

use std::any::{type_name, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{AttachError, Result};

/// Validate an attachment key, returning `Ok(())` if it can address a slot.
///
/// The only rule is non-emptiness. Every keyed operation applies this check
/// before touching any state.
///
/// # Examples
///
/// ```
/// use remora_store::key::validate_key;
///
/// assert!(validate_key("person.name").is_ok());
/// assert!(validate_key("anything else, really").is_ok());
/// assert!(validate_key("").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(AttachError::EmptyKey);
    }
    Ok(())
}

/// The default attachment key for values of type `V`.
///
/// Combines the type's path with a token hashed from its [`TypeId`]: the
/// path keeps key listings readable, the token keeps keys distinct even
/// when two versions of one crate export the same path. Deterministic for
/// the lifetime of the process, but not across processes or builds.
///
/// # Examples
///
/// ```
/// use remora_store::key::type_key;
///
/// assert_eq!(type_key::<u64>(), type_key::<u64>());
/// assert_ne!(type_key::<u64>(), type_key::<i64>());
/// ```
pub fn type_key<V: 'static>() -> String {
    compose_type_key(type_name::<V>(), type_token(TypeId::of::<V>()))
}

/// Format a type path and token as an attachment key. Shared with
/// [`AttachedValue`](crate::value::AttachedValue), which captures both parts
/// at construction.
pub(crate) fn compose_type_key(name: &str, token: u64) -> String {
    format!("{name}#{token:016x}")
}

/// 64-bit token for a [`TypeId`].
pub(crate) fn type_token(id: TypeId) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- validation ----

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(validate_key(""), Err(AttachError::EmptyKey));
    }

    #[test]
    fn nonempty_keys_are_accepted() {
        for key in ["a", "person.name", "with spaces", "emoji \u{1f980}", "\0"] {
            assert!(validate_key(key).is_ok(), "rejected {key:?}");
        }
    }

    // ---- type-derived keys ----

    #[test]
    fn type_key_is_deterministic_within_process() {
        assert_eq!(type_key::<String>(), type_key::<String>());
        assert_eq!(type_key::<Vec<u8>>(), type_key::<Vec<u8>>());
    }

    #[test]
    fn type_key_distinguishes_types() {
        let keys = [
            type_key::<u32>(),
            type_key::<u64>(),
            type_key::<String>(),
            type_key::<Vec<u8>>(),
            type_key::<Vec<u16>>(),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn type_key_embeds_type_path() {
        assert!(type_key::<String>().contains("String"));
        assert!(type_key::<std::time::Duration>().contains("Duration"));
    }

    #[test]
    fn type_key_is_never_empty() {
        assert!(validate_key(&type_key::<()>()).is_ok());
    }
}
