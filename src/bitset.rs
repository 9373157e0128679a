//! Dense bit set over concrete register states.
//!
//! State `s` of an `n`-register circuit is the number whose bit `r` is the value of
//! register `r`. Used to count the distinct states covered by overlapping cubes.

use crate::cube::{self, Ternary};

/// Widest circuit whose state space is materialized.
pub const MAX_DENSE_REGS: usize = 30;

#[derive(Debug, Clone)]
pub struct BitSet {
    /// Storage: each u64 holds 64 bits
    words: Vec<u64>,
    /// Number of set bits (cached for O(1) len())
    count: usize,
}

impl BitSet {
    /// Number of bits per word.
    const BITS_PER_WORD: usize = 64;

    /// Creates an empty set of `capacity` bits.
    pub fn new(capacity: usize) -> Self {
        let num_words = capacity.div_ceil(Self::BITS_PER_WORD);
        Self {
            words: vec![0; num_words],
            count: 0,
        }
    }

    /// Creates an empty set able to hold every state of `num_regs` registers.
    pub fn for_states(num_regs: usize) -> Self {
        assert!(
            num_regs <= MAX_DENSE_REGS,
            "Dense state sets support at most {} registers",
            MAX_DENSE_REGS
        );
        Self::new(1 << num_regs)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.len() * Self::BITS_PER_WORD
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (w, b) = (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD);
        self.words.get(w).is_some_and(|&word| word >> b & 1 != 0)
    }

    /// Sets the bit at `index`. Returns true if it was not set before.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let (w, b) = (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD);
        assert!(w < self.words.len(), "Bit {} is out of range", index);
        let mask = 1u64 << b;
        let was_clear = self.words[w] & mask == 0;
        if was_clear {
            self.words[w] |= mask;
            self.count += 1;
        }
        was_clear
    }

    /// Inserts every concrete state of a ternary cube over `num_regs` registers.
    ///
    /// Returns the number of states that were new.
    pub fn insert_cube(&mut self, words: &[u64], num_regs: usize) -> usize {
        let mut base = 0usize;
        let mut free = Vec::new();
        for r in 0..num_regs {
            match cube::value(words, r) {
                Ternary::Zero => {}
                Ternary::One => base |= 1 << r,
                Ternary::DontCare => free.push(r),
            }
        }
        let mut added = 0;
        for m in 0..1usize << free.len() {
            let state = free
                .iter()
                .enumerate()
                .filter(|&(i, _)| m >> i & 1 != 0)
                .fold(base, |s, (_, &r)| s | 1 << r);
            if self.insert(state) {
                added += 1;
            }
        }
        added
    }

    /// Returns an iterator over all set bit indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let b = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(w * Self::BITS_PER_WORD + b)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::Cube;

    #[test]
    fn test_insert_contains() {
        let mut bs = BitSet::new(100);
        assert!(!bs.contains(42));
        assert!(bs.insert(42));
        assert!(bs.contains(42));
        assert!(!bs.insert(42)); // Already set
        assert_eq!(bs.len(), 1);
        assert!(!bs.contains(1000));
    }

    #[test]
    fn test_iter() {
        let mut bs = BitSet::new(130);
        for i in [5, 10, 3, 64, 65, 129] {
            bs.insert(i);
        }
        let indices: Vec<_> = bs.iter().collect();
        assert_eq!(indices, vec![3, 5, 10, 64, 65, 129]);
    }

    #[test]
    fn test_insert_cube() {
        let mut bs = BitSet::for_states(3);
        assert_eq!(bs.capacity(), 64);
        // Register 0 is the first character.
        let c: Cube = "1-0".parse().unwrap();
        assert_eq!(bs.insert_cube(c.words(), 3), 2);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0b001, 0b011]);
        let d: Cube = "---".parse().unwrap();
        assert_eq!(bs.insert_cube(d.words(), 3), 6);
        assert_eq!(bs.len(), 8);
    }
}
