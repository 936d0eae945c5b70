//! Compact bitset representation for community occupancy.
//!
//! # Overview
//! During encoding every tree node carries the set of communities in which
//! at least one species below it occurs. Each bit position corresponds to a
//! community (a row of the occurrence matrix).
//!
//! # Example
//! For communities [s1, s2, s3, s4] mapped to indices [0, 1, 2, 3]:
//! - Species occurring in s1 and s3 → bitset `0b0101`
//! - Its parent, whose other child occurs in s4 → bitset `0b1101`

/// A compact bitset recording which communities occupy a tree node.
///
/// Internally stores bits in `Vec<u64>` words to support arbitrarily many
/// communities. Each u64 word holds 64 community indices.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Parameters
    /// - `words`: Number of u64 words needed. Use [`Bitset::words_for`].
    ///
    /// # Example
    /// ```
    /// # use phylo_diversity::bitset::Bitset;
    /// // 100 communities need 2 words (128 bits)
    /// let bs = Bitset::zeros(Bitset::words_for(100));
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Number of words needed to hold `bits` bits.
    #[inline]
    pub fn words_for(bits: usize) -> usize {
        bits.div_ceil(64)
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use phylo_diversity::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0[word] |= 1u64 << bit;
    }

    /// Returns whether the bit at `idx` is set.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        let word = idx >> 6;
        let bit = idx & 63;
        self.0.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Performs bitwise OR with another bitset (union operation).
    ///
    /// # Example
    /// ```
    /// # use phylo_diversity::bitset::Bitset;
    /// let mut left = Bitset::zeros(1);
    /// left.set(0);
    ///
    /// let mut right = Bitset::zeros(1);
    /// right.set(1);
    ///
    /// left.or_assign(&right);
    /// assert_eq!(left.0[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Counts the number of set bits (population count).
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no bit is set.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Iterates over the indices of set bits in ascending order.
    ///
    /// # Example
    /// ```
    /// # use phylo_diversity::bitset::Bitset;
    /// let mut bs = Bitset::zeros(2);
    /// bs.set(3);
    /// bs.set(64);
    /// assert_eq!(bs.iter_ones().collect::<Vec<_>>(), vec![3, 64]);
    /// ```
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some((w << 6) + bit)
            })
        })
    }
}
