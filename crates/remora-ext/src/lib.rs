//! Client conveniences over the remora attachment store.
//!
//! Where `remora-store` is the mechanism -- weak, identity-keyed side
//! tables -- this crate is the vocabulary client code actually speaks:
//!
//! - [`AttachmentExt`] puts the store operations on the host handle
//!   itself: `host.set_attached("k", v)` instead of threading a store
//!   around.
//! - [`ExtensionProperty`] declares a named, typed slot once and reuses
//!   it everywhere, with [`Optional`] folding getter and setter into a
//!   single accessor.
//! - [`reference_id`] gives any instance a stable random identifier,
//!   minted lazily and shared by every `Arc` clone.
//! - [`copy_attachments`] / [`copy_attachments_filtered`] move a host's
//!   attachments onto another host, sharing the values.
//!
//! All of it operates on the process-wide store,
//! [`AttachmentStore::global`]; identity scoping keeps unrelated hosts
//! from ever observing each other's slots.

pub mod copy;
pub mod ext;
pub mod identity;
pub mod property;

pub use copy::{copy_attachments, copy_attachments_filtered};
pub use ext::AttachmentExt;
pub use identity::{reference_id, ReferenceId, REFERENCE_ID_KEY};
pub use property::{ExtensionProperty, Optional};

// Core handles, re-exported so most clients need only this crate.
pub use remora_store::{AttachError, AttachedValue, Attachment, AttachmentStore, Result};
