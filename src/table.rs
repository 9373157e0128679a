//! Structural hashing table for AND nodes.
//!
//! Maps an ordered pair of fanin literals to the node built from them. Buckets hold the index
//! of the first entry of a chain; entry 0 is the sentry that terminates every chain.

/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

#[derive(Debug, Copy, Clone, Default)]
struct Entry {
    key: (u32, u32),
    value: u32,
    next: u32,
}

pub struct Table {
    entries: Vec<Entry>,
    buckets: Vec<u32>,
    bitmask: u64,
}

impl Default for Table {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Table {
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");
        let size = 1usize << bits;
        Self {
            // Sentry.
            entries: vec![Entry::default()],
            buckets: vec![0; size],
            bitmask: (size - 1) as u64,
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, key: (u32, u32)) -> usize {
        (pairing(key.0 as u64, key.1 as u64) & self.bitmask) as usize
    }

    pub fn get(&self, key: (u32, u32)) -> Option<u32> {
        let mut index = self.buckets[self.bucket(key)];
        while index != 0 {
            let entry = &self.entries[index as usize];
            if entry.key == key {
                return Some(entry.value);
            }
            index = entry.next;
        }
        None
    }

    /// Stores `key -> value`. The key must not be present yet.
    pub fn insert(&mut self, key: (u32, u32), value: u32) {
        debug_assert!(self.get(key).is_none(), "Key {:?} is already present", key);
        if self.entries.len() > 2 * self.buckets.len() {
            self.grow();
        }
        let bucket = self.bucket(key);
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            key,
            value,
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = index;
    }

    /// Doubles the number of buckets and rechains every entry.
    fn grow(&mut self) {
        let size = self.buckets.len() * 2;
        self.buckets = vec![0; size];
        self.bitmask = (size - 1) as u64;
        for index in 1..self.entries.len() {
            let bucket = self.bucket(self.entries[index].key);
            self.entries[index].next = self.buckets[bucket];
            self.buckets[bucket] = index as u32;
        }
    }

    pub fn clear(&mut self) {
        self.entries.truncate(1);
        self.buckets.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_szudzik() {
        // a\b  0  1  2  3
        // ---------------
        //  0:  0  1  4  9
        //  1:  2  3  5 10
        //  2:  6  7  8 11
        //  3: 12 13 14 15
        assert_eq!(pairing(0, 0), 0);
        assert_eq!(pairing(1, 0), 2);
        assert_eq!(pairing(0, 2), 4);
        assert_eq!(pairing(2, 1), 7);
        assert_eq!(pairing(1, 3), 10);
        assert_eq!(pairing(3, 3), 15);
    }

    #[test]
    fn test_insert_get() {
        let mut table = Table::new(2);
        for i in 0..100u32 {
            table.insert((i, i + 1), i + 1000);
        }
        assert_eq!(table.len(), 100);
        assert!(table.num_buckets() > 4);
        for i in 0..100u32 {
            assert_eq!(table.get((i, i + 1)), Some(i + 1000));
            assert_eq!(table.get((i + 1, i)), None);
        }
    }

    #[test]
    fn test_clear() {
        let mut table = Table::new(3);
        table.insert((2, 4), 7);
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.get((2, 4)), None);
    }
}
