//! 256-bit key bitset with rank queries, sized for the `u8` key domain.

/// Bit `k` set means byte key `k` is a member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct KeyBits {
    words: [u64; 4],
}

impl KeyBits {
    #[inline]
    pub(crate) fn contains(&self, k: u8) -> bool {
        self.words[(k >> 6) as usize] & (1u64 << (k & 63)) != 0
    }

    #[inline]
    pub(crate) fn insert(&mut self, k: u8) {
        self.words[(k >> 6) as usize] |= 1u64 << (k & 63);
    }

    #[inline]
    pub(crate) fn remove(&mut self, k: u8) {
        self.words[(k >> 6) as usize] &= !(1u64 << (k & 63));
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of members strictly below `k`.
    #[inline]
    pub(crate) fn rank(&self, k: u8) -> usize {
        let word = (k >> 6) as usize;
        let below: usize = self.words[..word].iter().map(|w| w.count_ones() as usize).sum();
        let mask = (1u64 << (k & 63)) - 1;
        below + (self.words[word] & mask).count_ones() as usize
    }

    /// Smallest member `>= from`, if any. `from` may be 256.
    pub(crate) fn next_from(&self, from: usize) -> Option<u8> {
        let mut word = from >> 6;
        if word >= self.words.len() {
            return None;
        }
        let mut bits = self.words[word] & (u64::MAX << (from & 63));
        loop {
            if bits != 0 {
                return Some((word * 64 + bits.trailing_zeros() as usize) as u8);
            }
            word += 1;
            if word == self.words.len() {
                return None;
            }
            bits = self.words[word];
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        let mut next = 0usize;
        core::iter::from_fn(move || {
            let k = self.next_from(next)?;
            next = k as usize + 1;
            Some(k)
        })
    }

    pub(crate) fn clear(&mut self) {
        self.words = [0; 4];
    }
}
