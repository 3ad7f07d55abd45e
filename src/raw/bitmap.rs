use alloc::boxed::Box;
use alloc::vec;

const BITS_PER_WORD: usize = u64::BITS as usize;

/// Word-packed occupancy bitmap for the slot store.
///
/// A set bit means the slot at the same index holds a live key. The bitmap is
/// the authoritative record of occupancy; slot contents are meaningless
/// wherever the corresponding bit is clear.
#[derive(Clone)]
pub(crate) struct OccupancyBitmap {
    words: Box<[u64]>,
    len: usize,
}

impl OccupancyBitmap {
    /// Creates an all-clear bitmap covering `len` slots.
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(BITS_PER_WORD)].into_boxed_slice(),
            len,
        }
    }

    /// Returns the number of slots the bitmap covers.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "`OccupancyBitmap::get()` - `index` >= `len`!");
        self.words[index / BITS_PER_WORD] & (1u64 << (index % BITS_PER_WORD)) != 0
    }

    #[inline]
    pub(crate) fn set(&mut self, index: usize) {
        debug_assert!(index < self.len, "`OccupancyBitmap::set()` - `index` >= `len`!");
        self.words[index / BITS_PER_WORD] |= 1u64 << (index % BITS_PER_WORD);
    }

    #[inline]
    pub(crate) fn clear(&mut self, index: usize) {
        debug_assert!(index < self.len, "`OccupancyBitmap::clear()` - `index` >= `len`!");
        self.words[index / BITS_PER_WORD] &= !(1u64 << (index % BITS_PER_WORD));
    }

    /// Counts the set bits in `[start, end)` with masked word popcounts.
    pub(crate) fn count_range(&self, start: usize, end: usize) -> usize {
        debug_assert!(start <= end && end <= self.len, "`OccupancyBitmap::count_range()` - range out of bounds!");
        if start == end {
            return 0;
        }

        let first_word = start / BITS_PER_WORD;
        let last_word = (end - 1) / BITS_PER_WORD;
        let head_mask = !0u64 << (start % BITS_PER_WORD);
        let tail_mask = !0u64 >> (BITS_PER_WORD - 1 - (end - 1) % BITS_PER_WORD);

        if first_word == last_word {
            return (self.words[first_word] & head_mask & tail_mask).count_ones() as usize;
        }

        let mut total = (self.words[first_word] & head_mask).count_ones() as usize;
        for word in &self.words[first_word + 1..last_word] {
            total += word.count_ones() as usize;
        }
        total + (self.words[last_word] & tail_mask).count_ones() as usize
    }

    /// Returns the index of the highest set bit in `[start, end)`, if any.
    pub(crate) fn last_one_in(&self, start: usize, end: usize) -> Option<usize> {
        debug_assert!(start <= end && end <= self.len, "`OccupancyBitmap::last_one_in()` - range out of bounds!");
        (start..end).rev().find(|&index| self.get(index))
    }
}
