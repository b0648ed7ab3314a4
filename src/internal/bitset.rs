//! Fixed-width resource bitmaps.
//!
//! Every resource kind (DMA channel, QDMA channel, TCC, PaRAM set) is tracked
//! with one [`Bitset`] per role: owned, reserved and available. The widths are
//! fixed at compile time so the manager never allocates.
//!
//! The contiguous-run search is the only non-trivial algorithm here: find the
//! first set bit, find the next clear bit after it (or the end of the search
//! space), measure the run and resume past it until a long enough run turns up.

/// A bitmap backed by `W` 32-bit words.
///
/// Bit `n` lives in word `n / 32` at position `n % 32`, which matches the
/// layout of the hardware enable/pending register pairs (low word, high word).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bitset<const W: usize> {
    words: [u32; W],
}

impl<const W: usize> Default for Bitset<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize> Bitset<W> {
    /// Number of bits the set can hold.
    pub const CAPACITY: usize = W * 32;

    /// Create an empty set.
    pub const fn new() -> Self {
        Self { words: [0; W] }
    }

    /// Create a set from raw words (word 0 holds bits 0..32).
    pub const fn from_words(words: [u32; W]) -> Self {
        Self { words }
    }

    /// Create a set with bits `0..len` set.
    pub fn first_n(len: usize) -> Self {
        let mut set = Self::new();
        set.insert_range(0, len);
        set
    }

    /// Raw words.
    #[inline(always)]
    pub const fn words(&self) -> &[u32; W] {
        &self.words
    }

    /// Raw word `index`, or zero past the end.
    #[inline(always)]
    pub fn word(&self, index: usize) -> u32 {
        self.words.get(index).copied().unwrap_or(0)
    }

    /// Whether bit `bit` is set. Bits past the capacity read as clear.
    #[inline]
    pub fn contains(&self, bit: usize) -> bool {
        bit < Self::CAPACITY && self.words[bit / 32] & (1 << (bit % 32)) != 0
    }

    /// Set bit `bit`. Out-of-range bits are ignored.
    #[inline]
    pub fn insert(&mut self, bit: usize) {
        if bit < Self::CAPACITY {
            self.words[bit / 32] |= 1 << (bit % 32);
        }
    }

    /// Clear bit `bit`. Out-of-range bits are ignored.
    #[inline]
    pub fn remove(&mut self, bit: usize) {
        if bit < Self::CAPACITY {
            self.words[bit / 32] &= !(1 << (bit % 32));
        }
    }

    /// Set bits `start..start + len`.
    pub fn insert_range(&mut self, start: usize, len: usize) {
        for bit in start..start.saturating_add(len).min(Self::CAPACITY) {
            self.insert(bit);
        }
    }

    /// Clear bits `start..start + len`.
    pub fn remove_range(&mut self, start: usize, len: usize) {
        for bit in start..start.saturating_add(len).min(Self::CAPACITY) {
            self.remove(bit);
        }
    }

    /// Clear every bit at or above `len`.
    pub fn truncate(&mut self, len: usize) {
        for (index, word) in self.words.iter_mut().enumerate() {
            let base = index * 32;
            if base >= len {
                *word = 0;
            } else if len - base < 32 {
                *word &= (1u32 << (len - base)) - 1;
            }
        }
    }

    /// Clear every bit.
    pub fn clear(&mut self) {
        self.words = [0; W];
    }

    /// Whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Bitwise AND.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        let mut out = *self;
        for (dst, src) in out.words.iter_mut().zip(other.words.iter()) {
            *dst &= *src;
        }
        out
    }

    /// Bits set in `self` but not in `other`.
    #[must_use]
    pub fn and_not(&self, other: &Self) -> Self {
        let mut out = *self;
        for (dst, src) in out.words.iter_mut().zip(other.words.iter()) {
            *dst &= !*src;
        }
        out
    }

    /// Bitwise OR.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        let mut out = *self;
        for (dst, src) in out.words.iter_mut().zip(other.words.iter()) {
            *dst |= *src;
        }
        out
    }

    /// Lowest set bit below `limit`.
    pub fn first_set(&self, limit: usize) -> Option<usize> {
        if limit == 0 {
            return None;
        }
        self.find_bit(0, limit - 1, true)
    }

    /// Iterate over the set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, word)| {
            let mut remaining = *word;
            core::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some(index * 32 + bit)
            })
        })
    }

    /// Find the first bit equal to `value` in the inclusive range `start..=end`.
    ///
    /// The search is word-boundary aware: the partial first word is masked from
    /// `start`, whole words are tested in one step, and the partial last word is
    /// masked up to `end`.
    pub fn find_bit(&self, start: usize, end: usize, value: bool) -> Option<usize> {
        if start > end || start >= Self::CAPACITY {
            return None;
        }
        let end = end.min(Self::CAPACITY - 1);
        let first_word = start / 32;
        let last_word = end / 32;

        for index in first_word..=last_word {
            let raw = if value {
                self.words[index]
            } else {
                !self.words[index]
            };
            let mut mask = u32::MAX;
            if index == first_word {
                mask &= u32::MAX << (start % 32);
            }
            if index == last_word {
                mask &= u32::MAX >> (31 - end % 32);
            }
            let hits = raw & mask;
            if hits != 0 {
                return Some(index * 32 + hits.trailing_zeros() as usize);
            }
        }
        None
    }

    /// Find the lowest start of a run of at least `len` set bits below `limit`.
    ///
    /// When the run reaches the end of the search space without hitting a
    /// clear bit its length is `limit - first_one`.
    pub fn find_run(&self, len: usize, limit: usize) -> Option<usize> {
        let limit = limit.min(Self::CAPACITY);
        if len == 0 || limit == 0 || len > limit {
            return None;
        }
        let end = limit - 1;
        let mut start = 0usize;

        while start <= end && end - start + 1 >= len {
            let first_one = self.find_bit(start, end, true)?;
            let next_zero = self
                .find_bit(first_one + 1, end, false)
                .unwrap_or(end + 1);

            if next_zero - first_one >= len {
                return Some(first_one);
            }
            start = next_zero + 1;
        }
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
