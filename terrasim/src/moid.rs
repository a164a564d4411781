//! Frame-scoped dense object index (MOIDs).
//!
//! The index is rebuilt from empty every frame. Slot 0 is a placeholder so that
//! [`Moid::NONE`] never names a real object.

use std::fmt;

use crate::registry::UniqueId;

/// Movable Object ID: position of an object in this frame's [`MoidIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Moid(usize);

impl Moid {
    /// Sentinel meaning "no MOID this frame".
    pub const NONE: Self = Self(0);

    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for Moid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("no-moid")
        } else {
            write!(f, "moid:{}", self.0)
        }
    }
}

/// Dense per-frame registry mapping MOIDs back to the objects that own them.
#[derive(Debug, Default)]
pub struct MoidIndex {
    slots: Vec<Option<UniqueId>>,
}

impl MoidIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame. Every MOID handed out before this call is now meaningless.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    fn reserve_sentinel(&mut self) {
        if self.slots.is_empty() {
            self.slots.push(None);
        }
    }

    /// Append `owner` and return its new MOID.
    pub fn push(&mut self, owner: UniqueId) -> Moid {
        self.reserve_sentinel();
        let moid = Moid(self.slots.len());
        self.slots.push(Some(owner));
        moid
    }

    /// The most recently assigned slot. Used by objects fused with their parent.
    pub fn last(&mut self) -> Moid {
        self.reserve_sentinel();
        Moid(self.slots.len() - 1)
    }

    /// Number of slots, including the reserved one once anything was registered.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Owner of `moid` this frame.
    pub fn get(&self, moid: Moid) -> Option<UniqueId> {
        self.slots.get(moid.0).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UniqueIdCounter;

    #[test]
    fn first_real_moid_is_one() {
        let mut ids = UniqueIdCounter::new();
        let mut index = MoidIndex::new();
        let owner = ids.next_id();

        let moid = index.push(owner);
        assert_eq!(moid.index(), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(moid), Some(owner));
        assert_eq!(index.get(Moid::NONE), None);
    }

    #[test]
    fn last_on_empty_index_is_none() {
        let mut index = MoidIndex::new();
        assert_eq!(index.last(), Moid::NONE);
    }
}
