use alloc::boxed::Box;
use core::iter;
use core::mem::MaybeUninit;

use super::bitmap::OccupancyBitmap;

/// Flat key storage paired with its occupancy bitmap.
///
/// The two sequences are index-aligned and always the same length. The bitmap
/// is authoritative: a slot whose bit is clear holds unspecified bytes and
/// must never be read. `write` and `clear` keep the bitmap in step with the
/// slot contents, so callers only ever observe the two in agreement.
pub(crate) struct SlotStore<K> {
    slots: Box<[MaybeUninit<K>]>,
    occupied: OccupancyBitmap,
}

impl<K: Copy> SlotStore<K> {
    /// Creates a store of `capacity` free slots.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: iter::repeat_with(MaybeUninit::uninit).take(capacity).collect(),
            occupied: OccupancyBitmap::with_len(capacity),
        }
    }

    /// Returns the total number of slots, free and occupied.
    pub(crate) const fn capacity(&self) -> usize {
        self.occupied.len()
    }

    #[inline]
    pub(crate) fn is_free(&self, index: usize) -> bool {
        !self.occupied.get(index)
    }

    /// Reads the key in an occupied slot.
    #[inline]
    pub(crate) fn read(&self, index: usize) -> K {
        debug_assert!(!self.is_free(index), "`SlotStore::read()` - slot is free!");
        // SAFETY: The occupancy bit for `index` is set, and a bit is only set
        // by `write`, which initializes the slot first.
        unsafe { self.slots[index].assume_init() }
    }

    /// Writes `key` into a slot and marks it occupied.
    #[inline]
    pub(crate) fn write(&mut self, index: usize, key: K) {
        self.slots[index] = MaybeUninit::new(key);
        self.occupied.set(index);
    }

    /// Marks a slot free. The stale key bytes are left in place and are
    /// never read again.
    #[inline]
    pub(crate) fn clear(&mut self, index: usize) {
        self.occupied.clear(index);
    }

    /// Returns the key in a slot, or `None` if the slot is free.
    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<K> {
        if self.is_free(index) { None } else { Some(self.read(index)) }
    }

    /// Counts the occupied slots in `[start, start + length)`.
    pub(crate) fn count_occupied(&self, start: usize, length: usize) -> usize {
        self.occupied.count_range(start, start + length)
    }

    /// Returns the index of the last occupied slot in `[start, start + length)`.
    pub(crate) fn last_occupied_in(&self, start: usize, length: usize) -> Option<usize> {
        self.occupied.last_one_in(start, start + length)
    }
}

impl<K: Copy> Clone for SlotStore<K> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            occupied: self.occupied.clone(),
        }
    }
}
