use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Counters collected during one exploration run.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Cube-vs-cube comparisons made by the index.
    pub checks: u64,
    /// Cubes accepted into the index.
    pub accepted: u64,
    /// Candidates rejected because an existing cube contained them.
    pub rejected: u64,
    /// Existing cubes marked garbage by a more general candidate.
    pub subsumed: u64,
    /// Don't-cares removed from candidates by sharping.
    pub sharps: u64,
    pub compresses: u64,
    pub splits: u64,

    /// States expanded by the enumerator.
    pub expanded: u64,
    /// Enumerator calls over the whole run.
    pub rec_calls: u64,
    /// Largest number of enumerator calls spent on a single state.
    pub max_rec_calls: u64,
    /// Times the scratch graph was thrown away and rebuilt.
    pub scratch_recycles: u64,
    /// Next-state functions proven constant by SAT after structural hashing missed it.
    pub folded: u64,

    /// Cubes created (the discovery sequence length).
    pub cubes: u64,
    /// Cubes still live in the index.
    pub retained: u64,
    /// Back-reference depth of the last expanded state.
    pub depth: u64,
    pub memory_bytes: u64,

    pub time_cofactor: Duration,
    pub time_cube: Duration,
    pub time_total: Duration,
}

impl Stats {
    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / (1 << 20) as f64
    }

    /// Fraction of created cubes that have been expanded.
    pub fn ratio(&self) -> f64 {
        if self.cubes == 0 {
            0.0
        } else {
            self.expanded as f64 / self.cubes as f64
        }
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "States = {:>10}. Reached = {:>10}. R = {:5.3}. Depth = {:>6}. Mem = {:9.2} MB.",
            self.expanded,
            self.cubes,
            self.ratio(),
            self.depth,
            self.memory_mb(),
        )
    }
}
