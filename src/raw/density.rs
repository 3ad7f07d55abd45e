//! The density model: threshold constants, array geometry, and the spread
//! layout shared by rebalancing and resizing.
//!
//! The backing store is viewed as an implicit binary tree whose nodes are
//! aligned *windows* of slots. A window at height `h` spans `S << h` slots,
//! where `S` is the segment size; height `0` is a single segment (a leaf) and
//! height `H - 1` is the whole array (the root), with `H` the number of
//! levels. Each height carries an upper and a lower density threshold, and
//! the thresholds tighten towards the root:
//!
//! ```text
//! p_leaf <= ... <= p_h < t_h <= ... <= t_leaf
//! ```

/// Capacity of a freshly created array. A power of two.
pub(crate) const INITIAL_CAPACITY: usize = 4;

/// Growth/shrink factor applied by a resize.
pub(crate) const SCALE_FACTOR: usize = 2;

/// Lower density threshold of a leaf window.
pub(crate) const LEAF_LOWER_DENSITY: f64 = 0.1;

/// Lower density threshold of the root window.
pub(crate) const ROOT_LOWER_DENSITY: f64 = 0.2;

/// Upper density threshold of the root window.
pub(crate) const ROOT_UPPER_DENSITY: f64 = 0.5;

/// Upper density threshold of a leaf window.
pub(crate) const LEAF_UPPER_DENSITY: f64 = 1.0;

/// Shape of the backing store: capacity, segment size, and level count.
///
/// All three are fixed between resizes; a resize builds a fresh `Geometry`
/// from the new capacity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Geometry {
    capacity: usize,
    segment_size: usize,
    levels: u32,
}

impl Geometry {
    /// Derives the geometry for a backing store of `capacity` slots.
    ///
    /// The segment size targets `capacity / log2(capacity)` slots, rounded up
    /// to a power of two so that windows stay aligned and the capacity is an
    /// exact multiple of the segment size.
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity >= INITIAL_CAPACITY,
            "`Geometry::new()` - `capacity` must be a power of two >= INITIAL_CAPACITY!"
        );
        let levels_hint = capacity.ilog2() as usize + 1;
        let segment_size = capacity.div_ceil(levels_hint).next_power_of_two();
        let levels = (capacity / segment_size).ilog2() + 1;
        Self {
            capacity,
            segment_size,
            levels,
        }
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) const fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Number of levels in the implicit tree. The root sits at height
    /// `levels() - 1`.
    pub(crate) const fn levels(&self) -> u32 {
        self.levels
    }

    pub(crate) const fn num_segments(&self) -> usize {
        self.capacity / self.segment_size
    }

    /// Number of slots spanned by a window at `height`.
    pub(crate) const fn window_capacity(&self, height: u32) -> usize {
        self.segment_size << height
    }

    /// Start of the segment containing slot `index`.
    pub(crate) const fn segment_containing(&self, index: usize) -> usize {
        index & !(self.segment_size - 1)
    }

    /// Start of the aligned window at `height` containing slot `index`.
    pub(crate) const fn window_containing(&self, height: u32, index: usize) -> usize {
        index & !(self.window_capacity(height) - 1)
    }

    /// Maximum permitted density for a window at `height`.
    pub(crate) fn upper_density_threshold(&self, height: u32) -> f64 {
        debug_assert!(height < self.levels, "`Geometry::upper_density_threshold()` - `height` >= `levels`!");
        let slope = f64::from(self.levels - height) / f64::from(self.levels);
        ROOT_UPPER_DENSITY + (LEAF_UPPER_DENSITY - ROOT_UPPER_DENSITY) * slope
    }

    /// Minimum permitted density for a window at `height`.
    pub(crate) fn lower_density_threshold(&self, height: u32) -> f64 {
        debug_assert!(height < self.levels, "`Geometry::lower_density_threshold()` - `height` >= `levels`!");
        let slope = f64::from(self.levels - height) / f64::from(self.levels);
        ROOT_LOWER_DENSITY - (ROOT_LOWER_DENSITY - LEAF_LOWER_DENSITY) * slope
    }
}

/// Occupancy ratio of a window: live keys over slots.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn density(occupancy: usize, capacity: usize) -> f64 {
    occupancy as f64 / capacity as f64
}

/// Target slot for the `index`-th of `count` keys spread over `length` slots.
///
/// The stride is uniform and centered, so leftover slack is interleaved
/// between keys instead of pooling at one edge of the window. An edge-biased
/// layout can leave a boundary segment completely full even though the window
/// as a whole is inside its threshold, which would starve insertions landing
/// in that segment. Positions are strictly increasing in `index` whenever
/// `count <= length`, so no two keys collide.
pub(crate) const fn spread_slot(index: usize, count: usize, length: usize) -> usize {
    debug_assert!(count > 0 && count <= length, "`spread_slot()` - `count` out of range!");
    debug_assert!(index < count, "`spread_slot()` - `index` >= `count`!");
    ((2 * index + 1) * length) / (2 * count)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use static_assertions::const_assert;

    // Verify our assumptions about the threshold constants: the permitted
    // band must be ordered p_leaf < p_root < t_root < t_leaf.
    const_assert!(LEAF_LOWER_DENSITY < ROOT_LOWER_DENSITY);
    const_assert!(ROOT_LOWER_DENSITY < ROOT_UPPER_DENSITY);
    const_assert!(ROOT_UPPER_DENSITY < LEAF_UPPER_DENSITY);
    const_assert!(INITIAL_CAPACITY.is_power_of_two());
    const_assert!(SCALE_FACTOR >= 2);

    #[test]
    fn initial_geometry() {
        let geometry = Geometry::new(INITIAL_CAPACITY);
        assert_eq!(geometry.capacity(), 4);
        assert_eq!(geometry.segment_size(), 2);
        assert_eq!(geometry.levels(), 2);
        assert_eq!(geometry.num_segments(), 2);
        assert_eq!(geometry.window_capacity(0), 2);
        assert_eq!(geometry.window_capacity(1), 4);
    }

    #[test]
    fn window_alignment_masks() {
        let geometry = Geometry::new(64);
        let segment = geometry.segment_size();
        assert_eq!(geometry.segment_containing(0), 0);
        assert_eq!(geometry.segment_containing(segment - 1), 0);
        assert_eq!(geometry.segment_containing(segment), segment);
        assert_eq!(geometry.window_containing(geometry.levels() - 1, 63), 0);
    }

    #[test]
    #[should_panic(expected = "`Geometry::new()` - `capacity` must be a power of two >= INITIAL_CAPACITY!")]
    fn rejects_unaligned_capacity() {
        let _ = Geometry::new(24);
    }

    proptest! {
        #[test]
        fn geometry_shape(exponent in 2u32..24) {
            let capacity = 1usize << exponent;
            let geometry = Geometry::new(capacity);

            prop_assert!(geometry.segment_size().is_power_of_two());
            prop_assert_eq!(capacity % geometry.segment_size(), 0);
            prop_assert!(geometry.segment_size() <= capacity);
            prop_assert_eq!(
                u64::from(geometry.levels()),
                u64::from((capacity / geometry.segment_size()).ilog2()) + 1
            );
            // The root window spans the whole array.
            prop_assert_eq!(geometry.window_capacity(geometry.levels() - 1), capacity);
        }

        #[test]
        fn thresholds_are_monotone_and_ordered(exponent in 2u32..24) {
            let geometry = Geometry::new(1usize << exponent);

            // At the leaf, the slope term is exactly `levels / levels == 1.0`,
            // so both thresholds reduce to the leaf constants bit-for-bit.
            prop_assert_eq!(geometry.upper_density_threshold(0), LEAF_UPPER_DENSITY);
            prop_assert_eq!(geometry.lower_density_threshold(0), LEAF_LOWER_DENSITY);

            for height in 0..geometry.levels() {
                let upper = geometry.upper_density_threshold(height);
                let lower = geometry.lower_density_threshold(height);
                prop_assert!(lower < upper, "p_{} >= t_{}", height, height);
                if height + 1 < geometry.levels() {
                    prop_assert!(upper >= geometry.upper_density_threshold(height + 1));
                    prop_assert!(lower <= geometry.lower_density_threshold(height + 1));
                }
            }
        }

        #[test]
        fn spread_positions_are_distinct_and_in_range(
            length in 1usize..1024,
            count_seed in any::<usize>(),
        ) {
            let count = count_seed % length + 1;
            let mut previous: Option<usize> = None;
            for index in 0..count {
                let slot = spread_slot(index, count, length);
                prop_assert!(slot < length);
                if let Some(previous) = previous {
                    prop_assert!(slot > previous, "slot {} not after {}", slot, previous);
                }
                previous = Some(slot);
            }
        }

        #[test]
        fn spread_is_identity_at_full_density(length in 1usize..256) {
            for index in 0..length {
                prop_assert_eq!(spread_slot(index, length, length), index);
            }
        }
    }
}
