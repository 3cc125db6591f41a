//! Typed per-request key-value store.
//!
//! Middleware communicates with downstream chain entries by writing values
//! here — an authenticated user, a parsed object, a tracing span — without
//! changing any handler signature. Keys are typed tokens, so reading a value
//! back at the wrong type is a compile error at the call site rather than a
//! failed downcast deep in a handler:
//!
//! ```rust
//! use trellis::Key;
//!
//! const CURRENT_USER: Key<String> = Key::new("auth.user");
//! ```
//!
//! Names share one flat namespace; the later `set` wins. Framework data
//! (path parameters, the continuation cursor) lives outside the store
//! entirely, so no name is reserved.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::error::Error;

/// A typed token naming one store slot.
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _marker: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

/// The per-request store. One instance per [`Context`](crate::Context),
/// never shared between requests.
#[derive(Default)]
pub struct Store {
    slots: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl Store {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites. Returns `&mut Self` so writes chain.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: Key<T>, value: T) -> &mut Self {
        self.slots.insert(key.name, Box::new(value));
        self
    }

    /// Non-failing lookup. `None` if the slot is unset or holds a value of
    /// a different type under the same name.
    pub fn get<T: 'static>(&self, key: Key<T>) -> Option<&T> {
        self.slots.get(key.name).and_then(|v| v.downcast_ref())
    }

    /// Lookup with a fallback value.
    pub fn get_or<T: Clone + 'static>(&self, key: Key<T>, default: T) -> T {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Lookup where absence is a programming error in the chain — an earlier
    /// entry was supposed to have set the slot. `?` on this inside a handler
    /// surfaces as a `500`.
    pub fn require<T: 'static>(&self, key: Key<T>) -> Result<&T, Error> {
        self.get(key).ok_or(Error::MissingState(key.name))
    }
}
