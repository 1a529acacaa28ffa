//! Copying attachments between hosts.
//!
//! Copies move the value handles, not the values: source and target end up
//! sharing each copied value, exactly as if the same value had been
//! attached to both. The copy is best-effort with respect to concurrent
//! writers -- the key set is observed once at the start, keys that vanish
//! mid-copy are skipped, and keys added afterwards are not picked up.

use std::any::Any;
use std::sync::Arc;

use remora_store::{AttachmentStore, Result};

/// Copy every attachment of `source` onto `target`, overwriting slots the
/// target already has. Returns the number of attachments copied.
///
/// The reference identity slot copies like any other key; use
/// [`copy_attachments_filtered`] to exclude it when the target must keep
/// its own identity.
pub fn copy_attachments<S, T>(source: &Arc<S>, target: &Arc<T>) -> Result<usize>
where
    S: Any + Send + Sync,
    T: Any + Send + Sync,
{
    copy_attachments_filtered(source, target, |_| true)
}

/// Copy the attachments of `source` whose keys pass `filter` onto
/// `target`. Returns the number of attachments copied.
pub fn copy_attachments_filtered<S, T, F>(
    source: &Arc<S>,
    target: &Arc<T>,
    mut filter: F,
) -> Result<usize>
where
    S: Any + Send + Sync,
    T: Any + Send + Sync,
    F: FnMut(&str) -> bool,
{
    let store = AttachmentStore::global();
    let mut copied = 0;
    for key in store.keys(source) {
        if !filter(&key) {
            continue;
        }
        // A concurrent remove may have emptied the slot since keys() ran.
        if let Some(value) = store.get(source, &key)? {
            store.set(target, &key, value)?;
            copied += 1;
        }
    }
    Ok(copied)
}
