//! Declared extension properties: named, typed attachment slots.
//!
//! An [`ExtensionProperty`] pairs a fixed key with a value type once, so
//! call sites read and write the slot without repeating either. Its
//! [`apply`](ExtensionProperty::apply) accessor folds getter and setter
//! into one call, using [`Optional`] to tell "set this value" apart from
//! "just read" -- `Option` cannot play that role when `None` itself is a
//! value someone might store.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use remora_store::{AttachmentStore, Result};

/// An explicitly optional argument: either a value to apply or nothing.
///
/// Unlike `Option`, converting from a plain `V` is implicit, so accessor
/// calls read naturally: `NAME.apply(&host, "Ronnie")` writes, while
/// `NAME.apply(&host, Optional::Unset)` only reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Optional<V> {
    /// No value supplied.
    Unset,
    /// A value to apply.
    Set(V),
}

impl<V> Optional<V> {
    /// `true` if a value is present.
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Convert into a plain `Option`.
    pub fn into_option(self) -> Option<V> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset => None,
        }
    }
}

impl<V> Default for Optional<V> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<V> From<V> for Optional<V> {
    fn from(value: V) -> Self {
        Self::Set(value)
    }
}

impl<V> From<Option<V>> for Optional<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Unset,
        }
    }
}

/// A named, typed attachment slot declared once and reused everywhere.
///
/// The descriptor is a zero-cost constant; all state lives in the global
/// [`AttachmentStore`], scoped per host instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use remora_ext::ExtensionProperty;
///
/// const NICKNAME: ExtensionProperty<String> = ExtensionProperty::new("person.nickname");
///
/// let person = Arc::new("some person".to_string());
/// assert!(NICKNAME.get(&person).unwrap().is_none());
///
/// NICKNAME.set(&person, "Ronnie".to_string()).unwrap();
/// assert_eq!(NICKNAME.get(&person).unwrap().unwrap().as_str(), "Ronnie");
/// ```
pub struct ExtensionProperty<V> {
    key: &'static str,
    _marker: PhantomData<fn() -> V>,
}

impl<V> ExtensionProperty<V>
where
    V: Any + Send + Sync,
{
    /// Declare a property stored under `key`.
    ///
    /// Two properties declared with the same key and value type address
    /// the same slot; distinct keys are fully independent.
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    /// The key this property stores under.
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// The current value on `host`, if one is set.
    pub fn get<H>(&self, host: &Arc<H>) -> Result<Option<Arc<V>>>
    where
        H: Any + Send + Sync,
    {
        AttachmentStore::global().get_value(host, self.key)
    }

    /// Set the value on `host`, replacing any previous one.
    pub fn set<H>(&self, host: &Arc<H>, value: V) -> Result<()>
    where
        H: Any + Send + Sync,
    {
        AttachmentStore::global().set_value(host, self.key, value)
    }

    /// Remove the value from `host`, returning what was there.
    pub fn clear<H>(&self, host: &Arc<H>) -> Result<Option<Arc<V>>>
    where
        H: Any + Send + Sync,
    {
        AttachmentStore::global().remove_value(host, self.key)
    }

    /// Combined accessor: writes first when given a value, then reads the
    /// slot back either way.
    pub fn apply<H, A>(&self, host: &Arc<H>, value: A) -> Result<Option<Arc<V>>>
    where
        H: Any + Send + Sync,
        A: Into<Optional<V>>,
    {
        if let Optional::Set(value) = value.into() {
            self.set(host, value)?;
        }
        self.get(host)
    }
}

// Derived impls would demand `V: Clone`/`V: Copy`; the descriptor itself
// is always copyable.
impl<V> Clone for ExtensionProperty<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ExtensionProperty<V> {}

impl<V> std::fmt::Debug for ExtensionProperty<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExtensionProperty({:?})", self.key)
    }
}
