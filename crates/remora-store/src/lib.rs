//! Weak, identity-keyed attachment tables.
//!
//! This crate implements the side-table mechanism behind "attached
//! properties": any shared object (an `Arc<H>` of any `Send + Sync` type)
//! can carry named, dynamically typed values it never declared storage
//! for. The table references hosts weakly, so attaching data never keeps
//! an object alive, and a dead host's values are reclaimed by sweeping.
//!
//! # Key Types
//!
//! - [`AttachmentStore`] -- the store itself; one [`global`] instance plus
//!   private instances for isolated subsystems
//! - [`AttachedValue`] -- a dynamically typed, shareable value handle
//! - [`Attachment`] -- a get-or-set outcome: the resolved value plus
//!   whether it already existed
//! - [`AttachError`] -- what can go wrong (empty keys, type mismatches)
//!
//! # Design Rules
//!
//! 1. Hosts are keyed by allocation identity, never by value equality.
//! 2. The store holds hosts weakly; attaching data never extends a
//!    lifetime.
//! 3. One slot, one writer at a time: per-key operations are linearized
//!    by the host's table lock.
//! 4. Get-or-set factories run outside every lock; one racing result is
//!    published and the rest are discarded.
//! 5. Reads never allocate state for a host the store has not seen.
//! 6. Typed access fails loudly on a type mismatch instead of returning
//!    an empty read.
//!
//! [`global`]: AttachmentStore::global

pub mod error;
pub mod key;
pub mod store;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{AttachError, Result};
pub use key::{type_key, validate_key};
pub use store::AttachmentStore;
pub use value::{Attachment, AttachedValue};
