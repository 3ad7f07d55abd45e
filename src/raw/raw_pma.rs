use smallvec::SmallVec;

use super::density::{Geometry, INITIAL_CAPACITY, SCALE_FACTOR, density, spread_slot};
use super::store::SlotStore;

/// Scratch buffer for the keys of one window during redistribution. Windows
/// near the leaves fit inline; larger windows spill to the heap, bounded by
/// the window length.
type KeyBuffer<K> = SmallVec<[K; 64]>;

/// The core packed-memory array backing `PackedMemoryArray`.
///
/// Keys live in a flat slot store in sorted order, interleaved with free
/// slots. The store is carved into power-of-two segments, and aligned runs of
/// segments form the windows of an implicit binary tree. Insertions place a
/// key inside its segment, shifting at most one segment's worth of
/// neighbours; when a segment's density crosses its threshold, the smallest
/// enclosing window still inside its own threshold is redistributed, and a
/// saturated (or starved) root triggers a resize.
pub(crate) struct RawPma<K> {
    /// Key slots plus the authoritative occupancy bitmap.
    store: SlotStore<K>,
    /// Capacity, segment size, and implicit tree depth; fixed between resizes.
    geometry: Geometry,
    /// Number of live keys.
    len: usize,
}

impl<K: Copy> RawPma<K> {
    /// Creates an empty array at the initial capacity.
    pub(crate) fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Creates an empty array with `capacity` slots. `capacity` must be a
    /// power of two no smaller than the initial capacity.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            store: SlotStore::with_capacity(capacity),
            geometry: Geometry::new(capacity),
            len: 0,
        }
    }

    /// Returns the number of live keys.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array holds no keys.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the total number of slots, free and occupied.
    pub(crate) const fn capacity(&self) -> usize {
        self.geometry.capacity()
    }

    /// Returns the number of slots in one segment.
    pub(crate) const fn segment_size(&self) -> usize {
        self.geometry.segment_size()
    }

    /// Returns the number of levels in the implicit window tree.
    pub(crate) const fn tree_levels(&self) -> u32 {
        self.geometry.levels()
    }

    /// Returns the number of segments.
    pub(crate) const fn num_segments(&self) -> usize {
        self.geometry.num_segments()
    }

    /// Returns the key in slot `index`, or `None` if the slot is free.
    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<K> {
        self.store.get(index)
    }

    /// Replaces the whole backing store with one of `new_capacity` slots and
    /// spreads the live keys across it with uniform stride.
    ///
    /// This is the only operation that changes the segment size or the tree
    /// depth. The replacement store is fully populated before the old one is
    /// dropped, so an allocation failure aborts without touching `self`.
    fn resize(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(INITIAL_CAPACITY);
        let geometry = Geometry::new(new_capacity);
        let mut store = SlotStore::with_capacity(new_capacity);

        debug_assert!(self.len <= new_capacity, "`RawPma::resize()` - live keys exceed the new capacity!");
        let mut rank = 0;
        for index in 0..self.store.capacity() {
            if let Some(key) = self.store.get(index) {
                store.write(spread_slot(rank, self.len, new_capacity), key);
                rank += 1;
            }
        }

        self.store = store;
        self.geometry = geometry;
    }

    /// Empties the window `[window, window + length)` into a scratch buffer,
    /// preserving key order and clearing every occupancy bit.
    fn drain_window(&mut self, window: usize, length: usize) -> KeyBuffer<K> {
        let mut keys = KeyBuffer::new();
        for index in window..window + length {
            if !self.store.is_free(index) {
                keys.push(self.store.read(index));
                self.store.clear(index);
            }
        }
        keys
    }

    /// Writes `keys` back into the (drained) window at uniform stride.
    fn spread(&mut self, window: usize, length: usize, keys: &[K]) {
        if keys.is_empty() {
            return;
        }
        for (rank, &key) in keys.iter().enumerate() {
            self.store.write(window + spread_slot(rank, keys.len(), length), key);
        }
    }

    /// Evenly redistributes the live keys of one window.
    fn redistribute(&mut self, window: usize, length: usize) {
        let keys = self.drain_window(window, length);
        self.spread(window, length, &keys);
    }
}

impl<K: Copy + Ord> RawPma<K> {
    /// Returns the start of the segment `key` belongs to: the leftmost
    /// segment whose largest live key is `>= key`, skipping empty segments.
    /// A key above everything in the array belongs to the last non-empty
    /// segment (segment zero when the array is empty).
    fn segment_to_insert(&self, key: K) -> usize {
        let segment_size = self.geometry.segment_size();
        let mut last_live = 0;
        let mut segment = 0;
        while segment < self.capacity() {
            if let Some(index) = self.store.last_occupied_in(segment, segment_size) {
                if self.store.read(index) >= key {
                    return segment;
                }
                last_live = segment;
            }
            segment += segment_size;
        }
        last_live
    }

    /// Returns the slot inside `segment` where `key` preserves order: the
    /// first occupied slot holding a key strictly greater than `key`, or one
    /// past the last occupied slot (which may be the segment end). Equal keys
    /// therefore land immediately after the existing copies. The returned
    /// slot may be occupied; making room is the caller's problem.
    fn position_to_insert(&self, segment: usize, key: K) -> usize {
        let mut position = segment;
        for index in segment..segment + self.geometry.segment_size() {
            if self.store.is_free(index) {
                continue;
            }
            if self.store.read(index) > key {
                return index;
            }
            position = index + 1;
        }
        position
    }

    /// Returns the free slot in `[segment, end)` closest to `position`,
    /// preferring the right side on a tie.
    fn nearest_free_slot(&self, segment: usize, end: usize, position: usize) -> Option<usize> {
        for distance in 1..=end - segment {
            let right = position + distance;
            if right < end && self.store.is_free(right) {
                return Some(right);
            }
            if let Some(left) = position.checked_sub(distance)
                && left >= segment
                && self.store.is_free(left)
            {
                return Some(left);
            }
        }
        None
    }

    /// Places `key` inside its segment, shifting the run of keys between the
    /// insertion slot and the nearest free slot by one position. Returns
    /// false if the segment is saturated, in which case nothing is written
    /// and the rebalancer has to absorb the key.
    fn place_in_segment(&mut self, segment: usize, key: K) -> bool {
        let end = segment + self.geometry.segment_size();
        let position = self.position_to_insert(segment, key);
        if position < end && self.store.is_free(position) {
            self.store.write(position, key);
            return true;
        }

        let Some(free) = self.nearest_free_slot(segment, end, position) else {
            return false;
        };
        if free > position {
            // Shift [position, free) one slot right; the run is contiguous
            // because `free` is the nearest free slot.
            for index in (position..free).rev() {
                let shifted = self.store.read(index);
                self.store.write(index + 1, shifted);
            }
            self.store.write(position, key);
        } else {
            // Shift (free, position) one slot left; everything in that run
            // compares <= key, so the key lands just below `position`.
            for index in free + 1..position {
                let shifted = self.store.read(index);
                self.store.write(index - 1, shifted);
            }
            self.store.write(position - 1, key);
        }
        true
    }

    /// Inserts `key`, keeping the sorted order. Duplicates are allowed and
    /// stay adjacent to the existing copies.
    pub(crate) fn insert(&mut self, key: K) {
        loop {
            let segment = self.segment_to_insert(key);
            if self.place_in_segment(segment, key) {
                self.len += 1;
                self.rebalance_after_insert(segment);
                return;
            }
            if self.rebalance_with_pending(segment, key) {
                self.len += 1;
                return;
            }
            // Even the root cannot absorb the key: grow and retry. After the
            // resize no two keys are adjacent, so the retry places locally.
            self.resize(self.capacity() * SCALE_FACTOR);
        }
    }

    /// Upper-threshold sweep after a successful local placement: if the leaf
    /// is at or above its threshold, climb to the smallest enclosing aligned
    /// window still below its own threshold and redistribute it. A root
    /// failure doubles the capacity.
    fn rebalance_after_insert(&mut self, segment: usize) {
        let segment_size = self.geometry.segment_size();
        let occupancy = self.store.count_occupied(segment, segment_size);
        if density(occupancy, segment_size) < self.geometry.upper_density_threshold(0) {
            return;
        }
        for height in 1..self.geometry.levels() {
            let length = self.geometry.window_capacity(height);
            let window = self.geometry.window_containing(height, segment);
            let occupancy = self.store.count_occupied(window, length);
            if density(occupancy, length) < self.geometry.upper_density_threshold(height) {
                self.redistribute(window, length);
                return;
            }
        }
        self.resize(self.capacity() * SCALE_FACTOR);
    }

    /// Climb for a key whose segment has no free slot. The pending key is
    /// counted towards each window's density and folded into the
    /// redistribution of the first window that can take it. Returns false if
    /// even the root is over threshold with the key included.
    fn rebalance_with_pending(&mut self, segment: usize, key: K) -> bool {
        for height in 1..self.geometry.levels() {
            let length = self.geometry.window_capacity(height);
            let window = self.geometry.window_containing(height, segment);
            let occupancy = self.store.count_occupied(window, length);
            if density(occupancy + 1, length) < self.geometry.upper_density_threshold(height) {
                let mut keys = self.drain_window(window, length);
                let rank = keys.partition_point(|&live| live <= key);
                keys.insert(rank, key);
                self.spread(window, length, &keys);
                return true;
            }
        }
        false
    }

    /// Returns the slot holding an occurrence of `key`, if any.
    fn find(&self, key: K) -> Option<usize> {
        let segment = self.segment_to_insert(key);
        let segment_size = self.geometry.segment_size();
        (segment..segment + segment_size).find(|&index| self.store.get(index) == Some(key))
    }

    /// Returns true if at least one occurrence of `key` is present.
    pub(crate) fn contains(&self, key: K) -> bool {
        self.find(key).is_some()
    }

    /// Removes one occurrence of `key`. Returns false if the key is absent.
    pub(crate) fn erase(&mut self, key: K) -> bool {
        let Some(index) = self.find(key) else {
            return false;
        };
        self.store.clear(index);
        self.len -= 1;
        self.rebalance_after_erase(self.geometry.segment_containing(index));
        true
    }

    /// Lower-threshold sweep after a removal, the mirror image of
    /// [`Self::rebalance_after_insert`]. A starved root halves the capacity,
    /// or evens out the whole array once the capacity floor is reached.
    fn rebalance_after_erase(&mut self, segment: usize) {
        let segment_size = self.geometry.segment_size();
        let occupancy = self.store.count_occupied(segment, segment_size);
        if density(occupancy, segment_size) >= self.geometry.lower_density_threshold(0) {
            return;
        }
        for height in 1..self.geometry.levels() {
            let length = self.geometry.window_capacity(height);
            let window = self.geometry.window_containing(height, segment);
            let occupancy = self.store.count_occupied(window, length);
            if density(occupancy, length) >= self.geometry.lower_density_threshold(height) {
                self.redistribute(window, length);
                return;
            }
        }
        if self.capacity() > INITIAL_CAPACITY {
            self.resize(self.capacity() / SCALE_FACTOR);
        } else {
            self.redistribute(0, self.capacity());
        }
    }

    /// Returns the largest live key `<= key`, scanning from the start.
    pub(crate) fn predecessor(&self, key: K) -> Option<K> {
        let mut best = None;
        for index in 0..self.capacity() {
            if let Some(live) = self.store.get(index) {
                if live > key {
                    break;
                }
                best = Some(live);
            }
        }
        best
    }

    /// Calls `emit` for every live key in `[low, high]`, in ascending order.
    pub(crate) fn scan(&self, low: K, high: K, mut emit: impl FnMut(K)) {
        for index in 0..self.capacity() {
            if let Some(live) = self.store.get(index) {
                if live > high {
                    break;
                }
                if live >= low {
                    emit(live);
                }
            }
        }
    }

    /// Returns the smallest live key.
    pub(crate) fn first(&self) -> Option<K> {
        (0..self.capacity()).find_map(|index| self.store.get(index))
    }

    /// Returns the largest live key.
    pub(crate) fn last(&self) -> Option<K> {
        self.store.last_occupied_in(0, self.capacity()).map(|index| self.store.read(index))
    }
}

impl<K: Copy> Clone for RawPma<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            geometry: self.geometry,
            len: self.len,
        }
    }
}

#[cfg(test)]
impl<K: Copy + Ord + core::fmt::Debug> RawPma<K> {
    /// Checks every structural invariant. Panics with a descriptive message
    /// if any is violated; intended for use after each operation in tests.
    pub(crate) fn validate_invariants(&self) {
        let capacity = self.capacity();
        assert!(capacity.is_power_of_two(), "capacity {capacity} is not a power of two");
        assert!(capacity >= INITIAL_CAPACITY, "capacity {capacity} fell below the initial capacity");
        assert!(self.segment_size().is_power_of_two(), "segment size is not a power of two");
        assert_eq!(capacity % self.segment_size(), 0, "capacity is not a multiple of the segment size");
        assert_eq!(
            self.len,
            self.store.count_occupied(0, capacity),
            "live count disagrees with the occupancy bitmap"
        );

        let mut previous: Option<K> = None;
        for index in 0..capacity {
            if let Some(key) = self.store.get(index) {
                if let Some(previous) = previous {
                    assert!(previous <= key, "keys out of order at slot {index}: {previous:?} > {key:?}");
                }
                previous = Some(key);
            }
        }
    }
}
