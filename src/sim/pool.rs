//! Fixed-capacity object pools
//!
//! Two reclaim strategies, each its own type so one pool never mixes them:
//! - [`SlotPool`]: mark-dead slots. `acquire` scans for the first inactive
//!   slot and iteration skips dead ones. A live slot keeps its index until
//!   released, so [`SlotId`]s stay valid.
//! - [`SwapPool`]: live items are packed at the front. Releasing swaps the
//!   last live item into the hole, so indices shuffle on removal.
//!
//! Neither pool grows after construction. Acquiring past capacity returns
//! `None` and the caller skips the spawn.

use serde::{Deserialize, Serialize};

/// Stable handle to a slot in a [`SlotPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub usize);

/// Mark-dead pool with stable slot order
#[derive(Debug, Clone)]
pub struct SlotPool<T> {
    slots: Vec<T>,
    active: Vec<bool>,
    live: usize,
}

impl<T: Default> SlotPool<T> {
    /// Allocate `capacity` slots up front, all inactive
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| T::default()).collect(),
            active: vec![false; capacity],
            live: 0,
        }
    }
}

impl<T> SlotPool<T> {
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active slots
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Claim the first inactive slot.
    ///
    /// The payload still holds whatever its last occupant left behind; the
    /// caller must overwrite every field it relies on.
    pub fn acquire(&mut self) -> Option<(SlotId, &mut T)> {
        let index = self.active.iter().position(|active| !active)?;
        self.active[index] = true;
        self.live += 1;
        Some((SlotId(index), &mut self.slots[index]))
    }

    /// Claim a slot and replace its payload with `value`
    pub fn spawn(&mut self, value: T) -> Option<SlotId> {
        let (id, slot) = self.acquire()?;
        *slot = value;
        Some(id)
    }

    /// Mark a slot inactive. Returns false if it was not active.
    pub fn release(&mut self, id: SlotId) -> bool {
        match self.active.get_mut(id.0) {
            Some(active) if *active => {
                *active = false;
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, id: SlotId) -> bool {
        self.active.get(id.0).copied().unwrap_or(false)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        if self.is_active(id) {
            self.slots.get(id.0)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if self.is_active(id) {
            self.slots.get_mut(id.0)
        } else {
            None
        }
    }

    /// Active slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> + '_ {
        self.slots
            .iter()
            .zip(&self.active)
            .enumerate()
            .filter(|(_, (_, active))| **active)
            .map(|(i, (slot, _))| (SlotId(i), slot))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .zip(&self.active)
            .enumerate()
            .filter(|(_, (_, active))| **active)
            .map(|(i, (slot, _))| (SlotId(i), slot))
    }

    /// Visit active slots in slot order
    pub fn for_each_active(&self, mut f: impl FnMut(SlotId, &T)) {
        for (id, slot) in self.iter() {
            f(id, slot);
        }
    }

    /// Visit active slots in order, releasing every one for which `keep`
    /// returns false. Returns how many were released.
    pub fn retain(&mut self, mut keep: impl FnMut(&mut T) -> bool) -> usize {
        let mut released = 0;
        for (slot, active) in self.slots.iter_mut().zip(self.active.iter_mut()) {
            if *active && !keep(slot) {
                *active = false;
                released += 1;
            }
        }
        self.live -= released;
        released
    }

    /// Deactivate every slot
    pub fn clear(&mut self) {
        self.active.iter_mut().for_each(|a| *a = false);
        self.live = 0;
    }
}

/// Packed pool with swap-and-pop removal
#[derive(Debug, Clone)]
pub struct SwapPool<T> {
    items: Vec<T>,
    live: usize,
}

impl<T: Default> SwapPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: (0..capacity).map(|_| T::default()).collect(),
            live: 0,
        }
    }
}

impl<T> SwapPool<T> {
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live == self.items.len()
    }

    /// Claim the slot at the write cursor. Stale payload, see [`SlotPool::acquire`].
    pub fn acquire(&mut self) -> Option<&mut T> {
        if self.is_full() {
            return None;
        }
        let slot = &mut self.items[self.live];
        self.live += 1;
        Some(slot)
    }

    /// Claim a slot and replace its payload. Returns false when full.
    pub fn spawn(&mut self, value: T) -> bool {
        match self.acquire() {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Release the live item at `index`; the last live item takes its place.
    pub fn release(&mut self, index: usize) -> bool {
        if index >= self.live {
            return false;
        }
        self.live -= 1;
        self.items.swap(index, self.live);
        true
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.live]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items[..self.live]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Release every item for which `keep` returns false.
    ///
    /// The item swapped into a freed index is visited next, so every live
    /// item is seen exactly once. Order among survivors is not preserved.
    pub fn retain(&mut self, mut keep: impl FnMut(&mut T) -> bool) -> usize {
        let mut released = 0;
        let mut i = 0;
        while i < self.live {
            if keep(&mut self.items[i]) {
                i += 1;
            } else {
                self.live -= 1;
                self.items.swap(i, self.live);
                released += 1;
            }
        }
        released
    }

    pub fn clear(&mut self) {
        self.live = 0;
    }
}
