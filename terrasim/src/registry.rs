//! Process-wide object identity: the unique-ID counter and the live-object registry.
//!
//! Both are plain values owned by the simulation and passed by reference to the
//! code that creates or destroys objects. They are initialized once and never
//! reset while the simulation runs.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Process-lifetime identity of a movable object. Never reused.
///
/// Distinct from the frame-scoped [`Moid`](crate::moid::Moid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniqueId(u64);

impl UniqueId {
    /// Reserved value meaning "no object".
    pub const NONE: Self = Self(0);

    pub fn to_u64(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source of [`UniqueId`]s, starting at 1.
#[derive(Debug)]
pub struct UniqueIdCounter {
    next: u64,
}

impl UniqueIdCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> UniqueId {
        let id = UniqueId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .expect("unique id counter exhausted");
        id
    }
}

impl Default for UniqueIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// What the registry knows about a live object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveEntry {
    pub class_name: &'static str,
    pub preset_name: String,
}

/// Set of every object currently alive in the simulation.
///
/// Objects register once at creation and unregister once at destruction.
#[derive(Debug, Default)]
pub struct LiveRegistry {
    alive: HashMap<UniqueId, LiveEntry>,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created object. Registering the same id twice means two
    /// objects share an identity, which the rest of the simulation cannot survive.
    pub fn register(&mut self, id: UniqueId, entry: LiveEntry) {
        assert!(!id.is_none(), "cannot register the reserved unique id");
        let previous = self.alive.insert(id, entry);
        assert!(previous.is_none(), "object {id} registered twice");
    }

    /// Remove an object. Returns whether it was registered.
    pub fn unregister(&mut self, id: UniqueId) -> bool {
        self.alive.remove(&id).is_some()
    }

    pub fn is_alive(&self, id: UniqueId) -> bool {
        self.alive.contains_key(&id)
    }

    pub fn get(&self, id: UniqueId) -> Option<&LiveEntry> {
        self.alive.get(&id)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }
}
