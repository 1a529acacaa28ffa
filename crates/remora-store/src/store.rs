//! The attachment store: weak, identity-keyed side tables.
//!
//! [`AttachmentStore`] associates named values with host objects (any
//! `Arc<H>`) without touching the host's layout and without keeping the
//! host alive. Hosts are keyed by allocation identity, never by value
//! equality: two equal hosts have distinct tables, and every clone of one
//! `Arc` shares a table.
//!
//! # Invariants
//!
//! - An entry's weak handle pins its host's allocation, so the address
//!   that keys the entry cannot be reused for a new object until the entry
//!   is swept. Address equality therefore always means host identity.
//! - Attaching values never extends a host's lifetime; the host drops as
//!   soon as the last external `Arc` goes away.
//! - Operations on one `(host, key)` slot are linearized by the per-host
//!   table lock. Different hosts contend only on the brief outer map
//!   access.
//! - No caller-supplied code runs under a store lock: factories run before
//!   locking, and displaced values drop after unlocking. The locks cannot
//!   be poisoned by user code.
//! - Dead entries are reclaimed by [`sweep`](AttachmentStore::sweep) and
//!   by an automatic sweep when the map grows past a watermark, keeping
//!   garbage proportional to the number of live hosts.
//!
//! Attached values are held strongly. Attaching host A's `Arc` as a value
//! on host B (directly or through a longer cycle) keeps A alive for as
//! long as B lives; there is no cycle collector.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock, Weak};

use tracing::debug;

use crate::error::{AttachError, Result};
use crate::key::{self, validate_key};
use crate::value::{Attachment, AttachedValue};

/// Auto-sweep never triggers below this many tracked hosts.
const SWEEP_FLOOR: usize = 64;

/// One host's attachment table.
#[derive(Default)]
struct HostTable {
    slots: RwLock<HashMap<String, AttachedValue>>,
}

/// Outer map entry: a weak host handle plus that host's table.
struct HostEntry {
    /// Dead once the host's strong count reaches zero. Pins the host
    /// allocation while the entry exists.
    host: Weak<dyn Any + Send + Sync>,
    table: Arc<HostTable>,
}

/// Hosts keyed by allocation address, plus the auto-sweep watermark.
struct HostMap {
    entries: HashMap<usize, HostEntry>,
    /// Entry count at which the next insertion sweeps first.
    sweep_at: usize,
}

impl HostMap {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            sweep_at: SWEEP_FLOOR,
        }
    }

    /// Detach every entry whose host has died and hand them back so the
    /// caller can drop them once the map lock is released.
    fn sweep(&mut self) -> Vec<HostEntry> {
        let dead_addrs: Vec<usize> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.host.strong_count() == 0)
            .map(|(addr, _)| *addr)
            .collect();
        let mut dead = Vec::with_capacity(dead_addrs.len());
        for addr in dead_addrs {
            if let Some(entry) = self.entries.remove(&addr) {
                dead.push(entry);
            }
        }
        self.sweep_at = (self.entries.len() * 2).max(SWEEP_FLOOR);
        dead
    }
}

/// Identity-keyed map from live host objects to their attachment tables.
///
/// Create private stores with [`new`](Self::new) for isolated subsystems,
/// or use the process-wide [`global`](Self::global) instance that the
/// extension layer builds on.
pub struct AttachmentStore {
    hosts: RwLock<HostMap>,
}

impl AttachmentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            hosts: RwLock::new(HostMap::new()),
        }
    }

    /// The process-wide shared store.
    ///
    /// "Attach to any object" only works when every call site resolves to
    /// the same table, so this instance is global and lives for the rest
    /// of the process. Subsystems that want isolation create their own
    /// store with [`new`](Self::new).
    pub fn global() -> &'static AttachmentStore {
        static GLOBAL: OnceLock<AttachmentStore> = OnceLock::new();
        GLOBAL.get_or_init(AttachmentStore::new)
    }

    /// Store `value` under `key` on `host`, replacing any previous value
    /// at that key.
    pub fn set<H>(&self, host: &Arc<H>, key: &str, value: AttachedValue) -> Result<()>
    where
        H: Any + Send + Sync,
    {
        validate_key(key)?;
        store_slot(&self.table_for(host), key.to_string(), value);
        Ok(())
    }

    /// Store `value` on `host` under the key derived from its concrete
    /// type. Derived keys are never empty, so this cannot fail.
    pub fn set_by_type<H>(&self, host: &Arc<H>, value: AttachedValue)
    where
        H: Any + Send + Sync,
    {
        let key = value.type_key();
        store_slot(&self.table_for(host), key, value);
    }

    /// The value stored under `key` on `host`, if any.
    ///
    /// Reads never allocate table state for an unseen host.
    pub fn get<H>(&self, host: &Arc<H>, key: &str) -> Result<Option<AttachedValue>>
    where
        H: Any + Send + Sync,
    {
        validate_key(key)?;
        let Some(table) = self.existing_table(host) else {
            return Ok(None);
        };
        let slots = table.slots.read().expect("slot lock poisoned");
        Ok(slots.get(key).cloned())
    }

    /// The value under `key` on `host`, storing `factory()` first if the
    /// slot is empty.
    ///
    /// The factory runs outside every store lock, so concurrent callers on
    /// an empty slot may each run it; exactly one result is published, the
    /// others are discarded, and every caller receives the published value.
    /// The caller whose result was published sees
    /// [`found() == false`](Attachment::found).
    pub fn get_or_set<H, F>(
        &self,
        host: &Arc<H>,
        key: &str,
        factory: F,
    ) -> Result<Attachment<AttachedValue>>
    where
        H: Any + Send + Sync,
        F: FnOnce() -> AttachedValue,
    {
        validate_key(key)?;

        // Fast path: an occupied slot never invokes the factory.
        if let Some(existing) = self.get(host, key)? {
            return Ok(Attachment::new(existing, true));
        }

        // Outside every lock: the factory may be slow, may reenter the
        // store, and its result may lose the race below.
        let computed = factory();

        let table = self.table_for(host);
        let mut slots = table.slots.write().expect("slot lock poisoned");
        let resolved = match slots.entry(key.to_string()) {
            Entry::Occupied(occupied) => Attachment::new(occupied.get().clone(), true),
            Entry::Vacant(vacant) => {
                vacant.insert(computed.clone());
                Attachment::new(computed, false)
            }
        };
        drop(slots);
        Ok(resolved)
    }

    /// Remove and return the value under `key` on `host`.
    pub fn remove<H>(&self, host: &Arc<H>, key: &str) -> Result<Option<AttachedValue>>
    where
        H: Any + Send + Sync,
    {
        validate_key(key)?;
        let Some(table) = self.existing_table(host) else {
            return Ok(None);
        };
        let removed = {
            let mut slots = table.slots.write().expect("slot lock poisoned");
            slots.remove(key)
        };
        Ok(removed)
    }

    /// Every key currently attached to `host`, in no particular order.
    pub fn keys<H>(&self, host: &Arc<H>) -> Vec<String>
    where
        H: Any + Send + Sync,
    {
        match self.existing_table(host) {
            Some(table) => {
                let slots = table.slots.read().expect("slot lock poisoned");
                slots.keys().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Discard `host`'s entire table. A later write recreates it lazily.
    pub fn clear<H>(&self, host: &Arc<H>)
    where
        H: Any + Send + Sync,
    {
        let removed = {
            let mut hosts = self.hosts.write().expect("host lock poisoned");
            hosts.entries.remove(&host_addr(host))
        };
        // The discarded table and its values drop outside the lock.
        drop(removed);
    }

    /// Typed [`set`](Self::set): wraps `value` and stores it under `key`.
    pub fn set_value<H, V>(&self, host: &Arc<H>, key: &str, value: V) -> Result<()>
    where
        H: Any + Send + Sync,
        V: Any + Send + Sync,
    {
        self.set(host, key, AttachedValue::new(value))
    }

    /// Typed [`set_by_type`](Self::set_by_type).
    pub fn set_value_by_type<H, V>(&self, host: &Arc<H>, value: V)
    where
        H: Any + Send + Sync,
        V: Any + Send + Sync,
    {
        self.set_by_type(host, AttachedValue::new(value));
    }

    /// Typed [`get`](Self::get). `Ok(None)` when the slot is empty,
    /// [`AttachError::TypeMismatch`] when it holds a different type.
    pub fn get_value<H, V>(&self, host: &Arc<H>, key: &str) -> Result<Option<Arc<V>>>
    where
        H: Any + Send + Sync,
        V: Any + Send + Sync,
    {
        match self.get(host, key)? {
            Some(value) => downcast_slot(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Typed [`get`](Self::get) at the key derived from `V`.
    pub fn get_value_by_type<H, V>(&self, host: &Arc<H>) -> Result<Option<Arc<V>>>
    where
        H: Any + Send + Sync,
        V: Any + Send + Sync,
    {
        self.get_value(host, &key::type_key::<V>())
    }

    /// Typed [`get_or_set`](Self::get_or_set). The race semantics are the
    /// same; the stored value must be a `V` or the call fails without
    /// modifying the slot.
    pub fn get_or_set_value<H, V, F>(
        &self,
        host: &Arc<H>,
        key: &str,
        factory: F,
    ) -> Result<Attachment<Arc<V>>>
    where
        H: Any + Send + Sync,
        V: Any + Send + Sync,
        F: FnOnce() -> V,
    {
        let resolved = self.get_or_set(host, key, || AttachedValue::new(factory()))?;
        let found = resolved.found();
        let value = downcast_slot(key, resolved.into_value())?;
        Ok(Attachment::new(value, found))
    }

    /// Typed [`get_or_set`](Self::get_or_set) at the key derived from `V`.
    pub fn get_or_set_value_by_type<H, V, F>(
        &self,
        host: &Arc<H>,
        factory: F,
    ) -> Result<Attachment<Arc<V>>>
    where
        H: Any + Send + Sync,
        V: Any + Send + Sync,
        F: FnOnce() -> V,
    {
        self.get_or_set_value(host, &key::type_key::<V>(), factory)
    }

    /// Typed [`remove`](Self::remove). The slot is type-checked before it
    /// is cleared, so a failed removal leaves the value in place.
    pub fn remove_value<H, V>(&self, host: &Arc<H>, key: &str) -> Result<Option<Arc<V>>>
    where
        H: Any + Send + Sync,
        V: Any + Send + Sync,
    {
        validate_key(key)?;
        let Some(table) = self.existing_table(host) else {
            return Ok(None);
        };
        let removed = {
            let mut slots = table.slots.write().expect("slot lock poisoned");
            match slots.get(key) {
                None => return Ok(None),
                Some(value) if !value.is::<V>() => {
                    return Err(AttachError::TypeMismatch {
                        key: key.to_string(),
                        expected: std::any::type_name::<V>(),
                        found: value.type_name(),
                    });
                }
                Some(_) => {}
            }
            slots.remove(key)
        };
        match removed {
            Some(value) => downcast_slot(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Remove every entry whose host has died, returning how many were
    /// reclaimed. Values of reclaimed entries are dropped.
    pub fn sweep(&self) -> usize {
        let dead = {
            let mut hosts = self.hosts.write().expect("host lock poisoned");
            hosts.sweep()
        };
        let swept = dead.len();
        if swept > 0 {
            debug!("swept {} dead attachment hosts", swept);
        }
        // Dead tables and their values drop here, outside the lock.
        drop(dead);
        swept
    }

    /// Number of hosts currently tracked, counting dead entries that the
    /// next sweep will reclaim.
    pub fn host_count(&self) -> usize {
        self.hosts.read().expect("host lock poisoned").entries.len()
    }

    /// Returns `true` if no host is tracked.
    pub fn is_empty(&self) -> bool {
        self.host_count() == 0
    }

    /// The table for `host`, if one already exists. Never allocates.
    fn existing_table<H>(&self, host: &Arc<H>) -> Option<Arc<HostTable>>
    where
        H: Any + Send + Sync,
    {
        let hosts = self.hosts.read().expect("host lock poisoned");
        hosts
            .entries
            .get(&host_addr(host))
            .map(|entry| Arc::clone(&entry.table))
    }

    /// The table for `host`, creating the entry on first use.
    ///
    /// Entry creation is where auto-sweeping hooks in: growing past the
    /// watermark sweeps dead entries first, so the map stays proportional
    /// to the number of live hosts even when nobody calls
    /// [`sweep`](Self::sweep).
    fn table_for<H>(&self, host: &Arc<H>) -> Arc<HostTable>
    where
        H: Any + Send + Sync,
    {
        if let Some(table) = self.existing_table(host) {
            return table;
        }

        let dead;
        let table;
        {
            let mut hosts = self.hosts.write().expect("host lock poisoned");
            // Another writer may have created the entry since the read above.
            if let Some(entry) = hosts.entries.get(&host_addr(host)) {
                return Arc::clone(&entry.table);
            }
            dead = if hosts.entries.len() >= hosts.sweep_at {
                hosts.sweep()
            } else {
                Vec::new()
            };
            let fresh = Arc::new(HostTable::default());
            let weak: Weak<dyn Any + Send + Sync> = Arc::<H>::downgrade(host);
            hosts.entries.insert(
                host_addr(host),
                HostEntry {
                    host: weak,
                    table: Arc::clone(&fresh),
                },
            );
            table = fresh;
        }
        if !dead.is_empty() {
            debug!("swept {} dead attachment hosts", dead.len());
            drop(dead);
        }
        table
    }
}

impl Default for AttachmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttachmentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentStore")
            .field("host_count", &self.host_count())
            .finish()
    }
}

/// Identity key for a host: the address of its `Arc` allocation.
///
/// Clones of one `Arc` agree on it, and while an entry's weak handle
/// exists the allocation cannot be handed to a different object.
fn host_addr<H>(host: &Arc<H>) -> usize {
    Arc::as_ptr(host) as *const () as usize
}

/// Insert into a host table, dropping any displaced value only after the
/// table lock is released.
fn store_slot(table: &HostTable, key: String, value: AttachedValue) {
    let previous = {
        let mut slots = table.slots.write().expect("slot lock poisoned");
        slots.insert(key, value)
    };
    drop(previous);
}

/// Downcast a stored value, mapping failure to a keyed mismatch report.
fn downcast_slot<V>(key: &str, value: AttachedValue) -> Result<Arc<V>>
where
    V: Any + Send + Sync,
{
    let found = value.type_name();
    value.downcast().map_err(|_| AttachError::TypeMismatch {
        key: key.to_string(),
        expected: std::any::type_name::<V>(),
        found,
    })
}
