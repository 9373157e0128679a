//! Ternary state vectors.
//!
//! A state cube assigns each register one of `0`, `1` or `-` (don't-care).
//! Register `i` occupies two adjacent bits of a `u64` word:
//!
//! ```text
//! bit 2i   : has-zero
//! bit 2i+1 : has-one
//! 00 = '-'   01 = '0'   10 = '1'   11 = illegal
//! ```
//!
//! With this encoding a cube with fewer set bits is more general, so containment
//! is a plain subset test on the words, and two cubes conflict on a register
//! exactly when their words differ in both bits of the pair.
//!
//! All functions here take two word slices of equal length.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Registers per word.
pub const REGS_PER_WORD: usize = 32;

/// Selects the has-zero bit of every register pair.
const EVEN: u64 = 0x5555_5555_5555_5555;

/// Number of words needed to hold `num_regs` registers.
pub const fn words_for(num_regs: usize) -> usize {
    num_regs.div_ceil(REGS_PER_WORD)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Ternary {
    Zero,
    One,
    DontCare,
}

impl Ternary {
    pub fn is_concrete(self) -> bool {
        self != Ternary::DontCare
    }

    pub fn to_char(self) -> char {
        match self {
            Ternary::Zero => '0',
            Ternary::One => '1',
            Ternary::DontCare => '-',
        }
    }
}

impl From<bool> for Ternary {
    fn from(b: bool) -> Self {
        if b {
            Ternary::One
        } else {
            Ternary::Zero
        }
    }
}

#[inline]
fn locate(reg: usize) -> (usize, u32) {
    (reg / REGS_PER_WORD, 2 * (reg % REGS_PER_WORD) as u32)
}

/// Reads register `reg`.
///
/// # Panics
///
/// Panics on the illegal `11` pattern.
#[inline]
pub fn value(words: &[u64], reg: usize) -> Ternary {
    let (w, shift) = locate(reg);
    match (words[w] >> shift) & 3 {
        0 => Ternary::DontCare,
        1 => Ternary::Zero,
        2 => Ternary::One,
        _ => panic!("Illegal ternary pattern at register {}", reg),
    }
}

/// Writes register `reg`, overwriting whatever was there.
#[inline]
pub fn set_value(words: &mut [u64], reg: usize, value: Ternary) {
    let (w, shift) = locate(reg);
    let bits = match value {
        Ternary::DontCare => 0,
        Ternary::Zero => 1,
        Ternary::One => 2,
    };
    words[w] = (words[w] & !(3 << shift)) | (bits << shift);
}

pub fn equal(a: &[u64], b: &[u64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    a == b
}

/// Some register is concrete in both cubes, with opposite values.
#[inline]
pub fn disjoint(a: &[u64], b: &[u64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).any(|(&x, &y)| {
        let d = x ^ y;
        (d >> 1) & d & EVEN != 0
    })
}

/// Cube `a` contains cube `b`: every bit set in `a` is also set in `b`.
#[inline]
pub fn contains(a: &[u64], b: &[u64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).all(|(&x, &y)| x | y == y)
}

/// Per-word mask of registers that are `-` in `x` and concrete in `y` (has-zero positions).
#[inline]
fn dash_vs_concrete(x: u64, y: u64) -> u64 {
    !(x ^ (x >> 1)) & (y ^ (y >> 1)) & EVEN
}

/// Finds the only register set in the per-word masks; `None` if there are zero or several.
#[inline]
fn unique_register(masks: impl Iterator<Item = u64>) -> Option<usize> {
    let mut found = None;
    for (w, mask) in masks.enumerate() {
        if mask == 0 {
            continue;
        }
        if mask.count_ones() != 1 || found.is_some() {
            return None;
        }
        found = Some(w * REGS_PER_WORD + mask.trailing_zeros() as usize / 2);
    }
    found
}

/// The register that is `-` in `a` and concrete in `b`, if it is the only such register.
pub fn sharp_variable(a: &[u64], b: &[u64]) -> Option<usize> {
    debug_assert_eq!(a.len(), b.len());
    unique_register(a.iter().zip(b).map(|(&x, &y)| dash_vs_concrete(x, y)))
}

/// The register where `a` and `b` hold opposite concrete values, if there is exactly one.
pub fn disjoint_variable(a: &[u64], b: &[u64]) -> Option<usize> {
    debug_assert_eq!(a.len(), b.len());
    unique_register(a.iter().zip(b).map(|(&x, &y)| {
        let d = x ^ y;
        d & (d >> 1) & EVEN
    }))
}

/// Number of registers that are `-` in `a` and concrete in `b`.
pub fn dash_count(a: &[u64], b: &[u64]) -> usize {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&x, &y)| dash_vs_concrete(x, y).count_ones() as usize)
        .sum()
}

/// Number of don't-care registers among the first `num_regs`.
pub fn dashes(words: &[u64], num_regs: usize) -> usize {
    (0..num_regs)
        .filter(|&r| value(words, r) == Ternary::DontCare)
        .count()
}

/// Forces the sharp variable of `a` against `b` to the complement of `b`'s value.
///
/// Returns the register that was changed. Afterwards `disjoint(a, b)` holds.
pub fn sharp(a: &mut [u64], b: &[u64]) -> Option<usize> {
    let reg = sharp_variable(a, b)?;
    let forced = match value(b, reg) {
        Ternary::Zero => Ternary::One,
        Ternary::One => Ternary::Zero,
        Ternary::DontCare => unreachable!("sharp variable must be concrete in the other cube"),
    };
    set_value(a, reg, forced);
    Some(reg)
}

/// An owned ternary vector over a fixed number of registers.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Cube {
    words: Vec<u64>,
    len: usize,
}

impl Cube {
    /// All-`-` cube.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; words_for(len)],
            len,
        }
    }

    pub fn from_words(words: &[u64], len: usize) -> Self {
        assert_eq!(words.len(), words_for(len), "Word count does not match register count");
        Self {
            words: words.to_vec(),
            len,
        }
    }

    pub fn from_bools(values: &[bool]) -> Self {
        let mut cube = Self::new(values.len());
        for (i, &b) in values.iter().enumerate() {
            cube.set(i, Ternary::from(b));
        }
        cube
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    pub fn get(&self, reg: usize) -> Ternary {
        assert!(reg < self.len, "Register {} out of range", reg);
        value(&self.words, reg)
    }

    pub fn set(&mut self, reg: usize, value: Ternary) {
        assert!(reg < self.len, "Register {} out of range", reg);
        set_value(&mut self.words, reg, value);
    }

    pub fn contains(&self, other: &Cube) -> bool {
        contains(&self.words, &other.words)
    }

    pub fn is_disjoint(&self, other: &Cube) -> bool {
        disjoint(&self.words, &other.words)
    }

    pub fn dashes(&self) -> usize {
        dashes(&self.words, self.len)
    }

    /// Whether the concrete state `state` lies in this cube.
    pub fn matches(&self, state: &[bool]) -> bool {
        assert_eq!(state.len(), self.len);
        state.iter().enumerate().all(|(i, &b)| match self.get(i) {
            Ternary::DontCare => true,
            t => t == Ternary::from(b),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Ternary> + '_ {
        (0..self.len).map(move |i| value(&self.words, i))
    }
}

impl Display for Cube {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for t in self.iter() {
            write!(f, "{}", t.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for Cube {
    type Err = char;

    /// Parses a string of `0`, `1` and `-`; the error is the offending character.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        let mut cube = Cube::new(chars.len());
        for (i, c) in chars.into_iter().enumerate() {
            let t = match c {
                '0' => Ternary::Zero,
                '1' => Ternary::One,
                '-' | 'x' | 'X' => Ternary::DontCare,
                other => return Err(other),
            };
            cube.set(i, t);
        }
        Ok(cube)
    }
}
