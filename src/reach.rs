//! The exploration driver.
//!
//! States are expanded strictly in discovery order: the cube with flat index `i` is expanded
//! only after every cube before it. Garbage cubes are skipped, since the cube that subsumed
//! them was discovered later and is expanded in their place.

use std::fmt::{Display, Formatter};
use std::time::Instant;

use log::{info, warn};
use num_bigint::BigUint;
use thiserror::Error;

use crate::aig::Aig;
use crate::arena::{Arena, ArenaFull, RecordKind};
use crate::bitset::{BitSet, MAX_DENSE_REGS};
use crate::cex::{reconstruct, CexError, Trace};
use crate::config::EraConfig;
use crate::cube::{self, Cube, Ternary};
use crate::enumerate::{Enumerator, Step};
use crate::handle::Handle;
use crate::index::{CubeIndex, Insert};
use crate::stats::Stats;

/// Largest register count a decision node can branch on.
pub const MAX_REGS: usize = 1 << 14;

#[derive(Debug, Error)]
pub enum EraError {
    #[error("circuit has {regs} registers, at most {max} are supported")]
    TooManyRegisters { regs: usize, max: usize },

    #[error("no outputs to watch for bad states")]
    NoOutputs,

    #[error(transparent)]
    ArenaFull(#[from] ArenaFull),
}

/// Why a run stopped before exhausting the state space.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StopReason {
    ArenaFull(RecordKind),
    CallBudget,
    CubeCap,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ArenaFull(kind) => write!(f, "out of {} pages", kind),
            StopReason::CallBudget => write!(f, "call budget exceeded"),
            StopReason::CubeCap => write!(f, "cube cap exceeded"),
        }
    }
}

#[derive(Debug)]
pub enum ReachStatus {
    /// Every reachable state was found.
    Exhausted,
    /// A watched output is asserted in a reachable state.
    BadState {
        output: usize,
        trace: Result<Trace, CexError>,
    },
    Stopped(StopReason),
}

impl ReachStatus {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ReachStatus::Exhausted)
    }
}

#[derive(Debug)]
pub struct ReachResult {
    pub status: ReachStatus,
    pub stats: Stats,
}

pub struct Explorer<'a> {
    aig: &'a Aig,
    config: EraConfig,
    arena: Arena,
    index: CubeIndex,
    enumerator: Enumerator<'a>,
    stats: Stats,
    /// Flat index of the next cube to expand.
    cursor: u32,
    target: Option<(usize, Handle)>,
}

impl<'a> Explorer<'a> {
    /// Prepares a run and inserts the initial cube.
    pub fn new(aig: &'a Aig, config: EraConfig) -> Result<Self, EraError> {
        if aig.num_regs() > MAX_REGS {
            return Err(EraError::TooManyRegisters {
                regs: aig.num_regs(),
                max: MAX_REGS,
            });
        }
        if config.stop_on_bad && aig.num_outputs() == 0 {
            return Err(EraError::NoOutputs);
        }

        let mut arena = Arena::new(aig.num_regs(), config.page_bits, config.max_pages);
        let mut index = CubeIndex::new(&config);
        let mut stats = Stats::default();

        let init = arena.alloc_cube()?;
        let words = arena.cube_mut(init);
        for (r, latch) in aig.latches().iter().enumerate() {
            let t = match latch.init {
                Some(b) => Ternary::from(b),
                None => Ternary::DontCare,
            };
            cube::set_value(words, r, t);
        }
        let inserted = index.insert(&mut arena, init, &mut stats)?;
        debug_assert_eq!(inserted, Insert::Accepted(init));

        let enumerator = Enumerator::new(aig, &config);
        let cursor = arena.flat_index(init);
        Ok(Self {
            aig,
            config,
            arena,
            index,
            enumerator,
            stats,
            cursor,
            target: None,
        })
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }
    pub fn index(&self) -> &CubeIndex {
        &self.index
    }
    pub fn stats(&self) -> &Stats {
        &self.stats
    }
    /// The asserted output and the target cube, once found.
    pub fn target(&self) -> Option<(usize, Handle)> {
        self.target
    }

    /// Length of the discovery sequence.
    pub fn num_discovered(&self) -> usize {
        self.arena.num_cubes() as usize - 1 - self.target.is_some() as usize
    }

    /// Handle of the `i`-th discovered cube (1-based).
    pub fn discovered(&self, i: usize) -> Handle {
        assert!(
            (1..=self.num_discovered()).contains(&i),
            "Cube {} was not discovered",
            i
        );
        self.arena.cube_handle(i as u32)
    }

    /// Number of cubes on the back-reference chain starting at `h`, `h` included.
    pub fn depth(&self, h: Handle) -> usize {
        let mut depth = 0;
        let mut current = h;
        while let Some(c) = current.get() {
            depth += 1;
            current = self.arena.prev(c);
        }
        depth
    }

    /// Cubes currently live in the index.
    pub fn retained_cubes(&self) -> Vec<Cube> {
        self.index
            .live_cubes(&self.arena)
            .into_iter()
            .map(|h| self.arena.to_cube(h))
            .collect()
    }

    /// Exact number of distinct states covered by the retained cubes, for small circuits.
    pub fn count_minterms(&self) -> Option<u64> {
        let num_regs = self.aig.num_regs();
        if num_regs > MAX_DENSE_REGS {
            return None;
        }
        let mut states = BitSet::for_states(num_regs);
        for h in self.index.live_cubes(&self.arena) {
            states.insert_cube(self.arena.cube(h), num_regs);
        }
        Some(states.len() as u64)
    }

    /// Sum of the sizes of the retained cubes. Overlapping cubes are counted twice.
    pub fn volume(&self) -> BigUint {
        let num_regs = self.aig.num_regs();
        let mut total = BigUint::default();
        for h in self.index.live_cubes(&self.arena) {
            total += BigUint::from(1u8) << cube::dashes(self.arena.cube(h), num_regs);
        }
        total
    }

    fn refresh_stats(&mut self) {
        self.stats.cubes = self.num_discovered() as u64;
        self.stats.retained = self.index.live_count(&self.arena) as u64;
        self.stats.memory_bytes = self.arena.memory_bytes() as u64;
    }

    /// Explores until the state space is exhausted, a bad state is found, or a ceiling is hit.
    pub fn run(&mut self) -> ReachStatus {
        let start = Instant::now();
        let status = self.explore();
        self.stats.time_total += start.elapsed();
        self.refresh_stats();

        info!("{}", self.stats);
        info!(
            "{} after finding {} state cubes ({} not contained) with depth {}. Time = {:.2?}",
            if matches!(status, ReachStatus::Stopped(_)) {
                "Stopped"
            } else {
                "Completed"
            },
            self.stats.cubes,
            self.stats.retained,
            self.stats.depth,
            self.stats.time_total,
        );
        if self.config.verbose {
            info!(
                "Cofactoring = {:.2?}. Containment = {:.2?}. Calls = {} (max {} per state). Checks = {}.",
                self.stats.time_cofactor,
                self.stats.time_cube,
                self.stats.rec_calls,
                self.stats.max_rec_calls,
                self.stats.checks,
            );
            if let Some(count) = self.count_minterms() {
                info!("The number of unique state minterms in computed state cubes is {}.", count);
            }
        }
        status
    }

    fn explore(&mut self) -> ReachStatus {
        while self.cursor < self.arena.num_cubes() {
            let state = self.arena.cube_handle(self.cursor);
            self.cursor += 1;
            if self.arena.is_garbage(state) {
                continue;
            }
            self.index.set_cursor(self.arena.flat_index(state));
            let step = self
                .enumerator
                .expand(&mut self.arena, &mut self.index, state, &mut self.stats);
            self.stats.depth = self.depth(state) as u64;

            match step {
                Ok(Step::Continue) => {}
                Ok(Step::CallBudget) => {
                    warn!(
                        "Exceeded the limit on the number of transitions from a state cube ({}).",
                        self.config.max_calls
                    );
                    return ReachStatus::Stopped(StopReason::CallBudget);
                }
                Ok(Step::Target { output, cube }) => {
                    self.target = Some((output, cube));
                    return self.bad_state(output, cube);
                }
                Err(e) => {
                    warn!("{}", e);
                    return ReachStatus::Stopped(StopReason::ArenaFull(e.kind));
                }
            }

            if self.num_discovered() > self.config.max_cubes {
                warn!("Reached the limit of {} state cubes.", self.config.max_cubes);
                return ReachStatus::Stopped(StopReason::CubeCap);
            }
            if self.config.verbose && self.stats.expanded % self.config.report_interval.max(1) as u64 == 0 {
                self.refresh_stats();
                info!("{}", self.stats);
            }
        }
        ReachStatus::Exhausted
    }

    fn bad_state(&mut self, output: usize, target: Handle) -> ReachStatus {
        let frame = self.depth(self.arena.prev(target)) - 1;
        info!("Output {} was asserted in frame {}.", output, frame);
        let trace = reconstruct(self.aig, &self.arena, target, output);
        match &trace {
            Ok(trace) => {
                if trace.replay(self.aig) == Some(trace.frame()) {
                    info!("Counter-example of {} frames verified.", trace.len());
                } else {
                    warn!("Counter-example of {} frames is INVALID.", trace.len());
                }
            }
            Err(e) => warn!("Counter-example reconstruction failed: {}", e),
        }
        ReachStatus::BadState { output, trace }
    }
}

/// Runs one exploration of `aig` and returns its outcome with the final statistics.
pub fn explore(aig: &Aig, config: &EraConfig) -> Result<ReachResult, EraError> {
    let mut explorer = Explorer::new(aig, config.clone())?;
    let status = explorer.run();
    Ok(ReachResult {
        status,
        stats: explorer.stats().clone(),
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::aig::Lit;

    #[test]
    fn test_no_outputs() {
        let mut aig = Aig::new();
        aig.add_latch(Some(false));
        assert!(matches!(
            Explorer::new(&aig, EraConfig::default()),
            Err(EraError::NoOutputs)
        ));
        assert!(Explorer::new(&aig, EraConfig::default().with_stop_on_bad(false)).is_ok());
    }

    #[test]
    fn test_initial_cube() {
        let mut aig = Aig::new();
        aig.add_latch(Some(true));
        aig.add_latch(None);
        aig.add_latch(Some(false));
        let explorer = Explorer::new(&aig, EraConfig::default().with_stop_on_bad(false)).unwrap();
        assert_eq!(explorer.num_discovered(), 1);
        assert_eq!(explorer.arena().to_cube(explorer.discovered(1)).to_string(), "1-0");
        assert_eq!(explorer.depth(explorer.discovered(1)), 1);
    }

    #[test]
    fn test_counter_exhausted() {
        // Free-running 2-bit counter.
        let mut aig = Aig::new();
        let r0 = aig.add_latch(Some(false));
        let r1 = aig.add_latch(Some(false));
        aig.set_next(0, !r0);
        let n1 = aig.xor(r1, r0);
        aig.set_next(1, n1);
        let config = EraConfig::default().with_stop_on_bad(false).with_pages(6, 4);
        let mut explorer = Explorer::new(&aig, config).unwrap();
        assert!(explorer.run().is_exhausted());
        assert_eq!(explorer.num_discovered(), 4);
        assert_eq!(explorer.count_minterms(), Some(4));
        assert_eq!(explorer.volume(), BigUint::from(4u8));
        assert_eq!(explorer.stats().depth, 4);
        assert_eq!(explorer.stats().expanded, 4);
    }

    #[test]
    fn test_cube_cap() {
        let mut aig = Aig::new();
        let r0 = aig.add_latch(Some(false));
        let r1 = aig.add_latch(Some(false));
        aig.set_next(0, !r0);
        let n1 = aig.xor(r1, r0);
        aig.set_next(1, n1);
        let config = EraConfig::default()
            .with_stop_on_bad(false)
            .with_max_cubes(2)
            .with_pages(6, 4);
        let result = explore(&aig, &config).unwrap();
        assert!(matches!(result.status, ReachStatus::Stopped(StopReason::CubeCap)));
        assert_eq!(result.stats.cubes, 3);
    }

    #[test]
    fn test_arena_full() {
        // A 4-bit counter needs 16 cubes, the arena holds 7.
        let mut aig = Aig::new();
        let regs: Vec<_> = (0..4).map(|_| aig.add_latch(Some(false))).collect();
        let mut carry = Lit::TRUE;
        for (r, &q) in regs.iter().enumerate() {
            let next = aig.xor(q, carry);
            aig.set_next(r, next);
            carry = aig.and(q, carry);
        }
        let config = EraConfig::default().with_stop_on_bad(false).with_pages(1, 4);
        let result = explore(&aig, &config).unwrap();
        assert!(matches!(
            result.status,
            ReachStatus::Stopped(StopReason::ArenaFull(RecordKind::Cube))
        ));
        assert_eq!(result.stats.cubes, 7);
    }
}
