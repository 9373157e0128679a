//! Successor enumeration by case splitting.
//!
//! Expanding a state cube rebuilds the combinational logic of the circuit in a scratch graph,
//! with every register bound to its value in the cube (a constant, or a free scratch input for
//! a don't-care register) and every PI bound to a free scratch input. The next-state functions
//! are then cofactored on one combinational input at a time, always the one shared by the most
//! next-state cones, until no input is shared. At that point each next-state function is either
//! a constant or depends on inputs of its own, and reads off as `0`, `1` or `-` of a successor
//! cube. A `-` is only written for a function that SAT shows can take both values; structural
//! hashing alone does not fold every constant.
//!
//! Watched outputs are checked once per state, before any splitting: an output bound to a
//! non-constant literal is handed to a SAT solver over its scratch cone. The target cube is a
//! copy of the state itself.
//!
//! Bindings are plain vectors from node of the circuit to literal of the scratch graph. A
//! cofactor copies the parent binding and rebuilds the fanout cone of the fixed input, so
//! nothing has to be restored when the recursion unwinds.

use std::time::Instant;

use log::{debug, warn};

use crate::aig::{Aig, Lit, Node};
use crate::arena::{Arena, ArenaFull};
use crate::cnf::{ConeSolver, SatOutcome};
use crate::config::EraConfig;
use crate::cube::{self, Ternary};
use crate::handle::Handle;
use crate::index::{CubeIndex, Insert};
use crate::stats::Stats;

/// Outcome of expanding one state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Step {
    /// All successors were handed to the index.
    Continue,
    /// A watched output can be asserted in the expanded state; `cube` is a copy of that state,
    /// kept out of the index.
    Target { output: usize, cube: Handle },
    /// The per-state call budget ran out.
    CallBudget,
}

#[inline]
fn bind(binding: &[Lit], lit: Lit) -> Lit {
    let b = binding[lit.node() as usize];
    if lit.is_complement() {
        !b
    } else {
        b
    }
}

/// Marks the value each function took in a model.
fn record(seen: &mut [[bool; 2]], values: &[bool]) {
    for (s, &v) in seen.iter_mut().zip(values) {
        s[v as usize] = true;
    }
}

pub struct Enumerator<'a> {
    aig: &'a Aig,
    scratch: Aig,
    /// AND nodes in the fanout of each combinational input, topologically ordered.
    fanouts: Vec<Vec<u32>>,

    max_calls: u64,
    scratch_limit: usize,
    stop_on_bad: bool,

    /// Calls spent on the current state.
    calls: u64,
    counts: Vec<u32>,
    cis: Vec<usize>,
}

impl<'a> Enumerator<'a> {
    pub fn new(aig: &'a Aig, config: &EraConfig) -> Self {
        let fanouts = (0..aig.num_cis())
            .map(|k| aig.transitive_fanout(aig.ci(k).node()))
            .collect();
        Self {
            aig,
            scratch: Aig::with_inputs(aig.num_cis()),
            fanouts,
            max_calls: config.max_calls,
            scratch_limit: config.scratch_limit,
            stop_on_bad: config.stop_on_bad,
            calls: 0,
            counts: vec![0; aig.num_cis()],
            cis: Vec::new(),
        }
    }

    /// Calls spent on the last expanded state.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn scratch_size(&self) -> usize {
        self.scratch.num_nodes()
    }

    /// Computes the successors of `state` and inserts them into `index`.
    pub fn expand(
        &mut self,
        arena: &mut Arena,
        index: &mut CubeIndex,
        state: Handle,
        stats: &mut Stats,
    ) -> Result<Step, ArenaFull> {
        if self.scratch.num_nodes() > self.scratch_limit {
            debug!("enumerate: recycling scratch graph of {} nodes", self.scratch.num_nodes());
            self.scratch = Aig::with_inputs(self.aig.num_cis());
            stats.scratch_recycles += 1;
        }

        let start = Instant::now();
        let binding = self.initial_binding(arena.cube(state));
        stats.time_cofactor += start.elapsed();

        self.calls = 0;
        let step = match self.asserted_output(&binding) {
            Some(output) => self.target(arena, state, output),
            None => self.split(&binding, arena, index, state, stats),
        };
        stats.expanded += 1;
        stats.rec_calls += self.calls;
        stats.max_rec_calls = stats.max_rec_calls.max(self.calls);
        step
    }

    fn initial_binding(&mut self, state: &[u64]) -> Vec<Lit> {
        let aig = self.aig;
        let mut binding = vec![Lit::FALSE; aig.num_nodes()];
        for k in 0..aig.num_pis() {
            binding[aig.pi(k).node() as usize] = self.scratch.pi(k);
        }
        for r in 0..aig.num_regs() {
            binding[aig.ro(r).node() as usize] = match cube::value(state, r) {
                Ternary::Zero => Lit::FALSE,
                Ternary::One => Lit::TRUE,
                Ternary::DontCare => self.scratch.pi(aig.num_pis() + r),
            };
        }
        for id in 1..aig.num_nodes() as u32 {
            if let Node::And(a, b) = aig.node(id) {
                binding[id as usize] = self.scratch.and(bind(&binding, a), bind(&binding, b));
            }
        }
        binding
    }

    /// Copy of `binding` with combinational input `k` fixed to `value`.
    fn cofactor(&mut self, binding: &[Lit], k: usize, value: bool) -> Vec<Lit> {
        let aig = self.aig;
        let mut child = binding.to_vec();
        child[aig.ci(k).node() as usize] = Lit::from(value);
        for &id in &self.fanouts[k] {
            if let Node::And(a, b) = aig.node(id) {
                child[id as usize] = self.scratch.and(bind(&child, a), bind(&child, b));
            }
        }
        child
    }

    /// The scratch input referenced by the largest number of next-state cones, if more than one.
    fn most_used_input(&mut self, nexts: &[Lit]) -> Option<usize> {
        self.counts.fill(0);
        for &next in nexts {
            if next.is_const() {
                continue;
            }
            self.cis.clear();
            self.scratch.increment_trav_id();
            self.scratch.collect_cis(next, &mut self.cis);
            for &k in &self.cis {
                self.counts[k] += 1;
            }
        }
        let mut best: Option<(usize, u32)> = None;
        for (k, &count) in self.counts.iter().enumerate() {
            if count > best.map_or(1, |(_, c)| c) {
                best = Some((k, count));
            }
        }
        best.map(|(k, _)| k)
    }

    /// The first watched output that some input assignment asserts under `binding`.
    fn asserted_output(&mut self, binding: &[Lit]) -> Option<usize> {
        if !self.stop_on_bad {
            return None;
        }
        let aig = self.aig;
        for (output, &out) in aig.outputs().iter().enumerate() {
            let lit = bind(binding, out);
            let hit = match lit.const_value() {
                Some(value) => value,
                None => match ConeSolver::new(&mut self.scratch, &[lit]).solve(&[(lit, true)]) {
                    SatOutcome::Sat(_) => true,
                    SatOutcome::Unsat => false,
                    SatOutcome::Unknown => {
                        warn!("enumerate: could not decide output {}", output);
                        false
                    }
                },
            };
            if hit {
                return Some(output);
            }
        }
        None
    }

    fn target(&mut self, arena: &mut Arena, state: Handle, output: usize) -> Result<Step, ArenaFull> {
        let words = arena.cube(state).to_vec();
        let c = arena.alloc_cube()?;
        arena.cube_mut(c).copy_from_slice(&words);
        arena.set_prev(c, state);
        debug!("enumerate: output {} asserted in {} {}", output, state, arena.to_cube(c));
        Ok(Step::Target { output, cube: c })
    }

    /// Replaces next-state functions that can only take one value by that constant.
    ///
    /// Plain scratch inputs are always free. Functions over AND nodes are checked together:
    /// one model seeds the values seen for each, then every function seen at a single value is
    /// asked for the other one.
    fn fold_constants(&mut self, nexts: &mut [Lit], stats: &mut Stats) {
        let open: Vec<usize> = (0..nexts.len())
            .filter(|&r| matches!(self.scratch.node(nexts[r].node()), Node::And(..)))
            .collect();
        if open.is_empty() {
            return;
        }
        let roots: Vec<Lit> = open.iter().map(|&r| nexts[r]).collect();
        let mut solver = ConeSolver::new(&mut self.scratch, &roots);

        let mut seen = vec![[false; 2]; roots.len()];
        match solver.solve(&[]) {
            SatOutcome::Sat(values) => record(&mut seen, &values),
            _ => return,
        }
        for i in 0..roots.len() {
            if seen[i][0] && seen[i][1] {
                continue;
            }
            let value = seen[i][1];
            match solver.solve(&[(roots[i], !value)]) {
                SatOutcome::Sat(values) => record(&mut seen, &values),
                SatOutcome::Unsat => {
                    debug!("enumerate: next state of register {} is constant {}", open[i], value);
                    nexts[open[i]] = Lit::from(value);
                    stats.folded += 1;
                }
                SatOutcome::Unknown => {}
            }
        }
    }

    fn split(
        &mut self,
        binding: &[Lit],
        arena: &mut Arena,
        index: &mut CubeIndex,
        state: Handle,
        stats: &mut Stats,
    ) -> Result<Step, ArenaFull> {
        if self.calls >= self.max_calls {
            return Ok(Step::CallBudget);
        }
        self.calls += 1;

        let mut nexts: Vec<Lit> = self
            .aig
            .latches()
            .iter()
            .map(|latch| bind(binding, latch.next))
            .collect();
        let Some(k) = self.most_used_input(&nexts) else {
            self.fold_constants(&mut nexts, stats);
            return self.emit(&nexts, arena, index, state, stats);
        };

        for value in [false, true] {
            let start = Instant::now();
            let child = self.cofactor(binding, k, value);
            stats.time_cofactor += start.elapsed();
            match self.split(&child, arena, index, state, stats)? {
                Step::Continue => {}
                step => return Ok(step),
            }
        }
        Ok(Step::Continue)
    }

    /// Creates the successor cube read off the next-state functions.
    fn emit(
        &mut self,
        nexts: &[Lit],
        arena: &mut Arena,
        index: &mut CubeIndex,
        state: Handle,
        stats: &mut Stats,
    ) -> Result<Step, ArenaFull> {
        let start = Instant::now();
        let c = arena.alloc_cube()?;
        let words = arena.cube_mut(c);
        for (r, next) in nexts.iter().enumerate() {
            let t = match next.const_value() {
                Some(b) => Ternary::from(b),
                None => Ternary::DontCare,
            };
            cube::set_value(words, r, t);
        }
        arena.set_prev(c, state);

        let result = index.insert(arena, c, stats);
        stats.time_cube += start.elapsed();
        if let Insert::Accepted(h) = result? {
            debug!("enumerate: new cube {} {}", h, arena.to_cube(h));
        }
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::cube::Cube;

    fn run_one(aig: &Aig, config: &EraConfig, state: &str) -> (Arena, CubeIndex, Step, Stats) {
        let mut arena = Arena::new(aig.num_regs(), config.page_bits, config.max_pages);
        let mut index = CubeIndex::new(config);
        let mut stats = Stats::default();
        let init: Cube = state.parse().unwrap();
        let s = arena.alloc_cube_from(&init).unwrap();
        index.insert(&mut arena, s, &mut stats).unwrap();
        let mut e = Enumerator::new(aig, config);
        let step = e.expand(&mut arena, &mut index, s, &mut stats).unwrap();
        (arena, index, step, stats)
    }

    fn cubes(arena: &Arena, index: &CubeIndex) -> Vec<String> {
        let mut v: Vec<_> = index
            .live_cubes(arena)
            .into_iter()
            .map(|h| arena.to_cube(h).to_string())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn test_shift_register() {
        // r0' = i, r1' = r0
        let mut aig = Aig::new();
        let i = aig.add_input();
        let r0 = aig.add_latch(Some(false));
        aig.add_latch(Some(false));
        aig.set_next(0, i);
        aig.set_next(1, r0);
        let config = EraConfig::default().with_stop_on_bad(false).with_pages(8, 8);
        let (arena, index, step, stats) = run_one(&aig, &config, "10");
        assert_eq!(step, Step::Continue);
        // No input is shared: a single successor with a free first register.
        assert_eq!(stats.rec_calls, 1);
        assert_eq!(cubes(&arena, &index), vec!["-1", "10"]);
    }

    #[test]
    fn test_shared_input_is_split() {
        // r0' = i, r1' = !i
        let mut aig = Aig::new();
        let i = aig.add_input();
        aig.add_latch(Some(false));
        aig.add_latch(Some(false));
        aig.set_next(0, i);
        aig.set_next(1, !i);
        let config = EraConfig::default().with_stop_on_bad(false).with_pages(8, 8);
        let (arena, index, _, stats) = run_one(&aig, &config, "00");
        assert_eq!(stats.rec_calls, 3);
        assert_eq!(cubes(&arena, &index), vec!["00", "01", "10"]);
    }

    #[test]
    fn test_dont_care_register_is_split() {
        // r0' = r1, r1' = r1
        let mut aig = Aig::new();
        aig.add_latch(Some(false));
        let r1 = aig.add_latch(None);
        aig.set_next(0, r1);
        aig.set_next(1, r1);
        let config = EraConfig::default().with_stop_on_bad(false).with_pages(8, 8);
        let (arena, index, _, _) = run_one(&aig, &config, "0-");
        assert_eq!(cubes(&arena, &index), vec!["0-", "11"]);
    }

    #[test]
    fn test_target() {
        // r0' = i, bad = r0 & i
        let mut aig = Aig::new();
        let i = aig.add_input();
        let r0 = aig.add_latch(Some(true));
        aig.set_next(0, i);
        let bad = aig.and(r0, i);
        aig.add_output(bad);
        let config = EraConfig::default().with_pages(8, 8);
        let (arena, _, step, _) = run_one(&aig, &config, "1");
        let Step::Target { output, cube } = step else {
            panic!("expected a target, got {:?}", step);
        };
        assert_eq!(output, 0);
        assert_eq!(arena.to_cube(cube).to_string(), "1");
        assert_eq!(arena.flat_index(arena.prev(cube)), 1);
    }

    #[test]
    fn test_unfolded_constant_next_state() {
        // r0' = i & (!i & !j) is always 0, but strash does not fold it.
        let mut aig = Aig::new();
        let i = aig.add_input();
        let j = aig.add_input();
        aig.add_latch(Some(false));
        let nij = aig.and(!i, !j);
        let next = aig.and(i, nij);
        assert!(!next.is_const());
        aig.set_next(0, next);
        let config = EraConfig::default().with_stop_on_bad(false).with_pages(8, 8);
        let (arena, index, step, stats) = run_one(&aig, &config, "0");
        assert_eq!(step, Step::Continue);
        assert_eq!(stats.folded, 1);
        assert_eq!(cubes(&arena, &index), vec!["0"]);
    }

    #[test]
    fn test_free_next_states_stay_dont_care() {
        // r0' = i & j, r1' = k | l: independent and both free.
        let mut aig = Aig::new();
        let pis: Vec<_> = (0..4).map(|_| aig.add_input()).collect();
        aig.add_latch(Some(false));
        aig.add_latch(Some(false));
        let a = aig.and(pis[0], pis[1]);
        let b = aig.or(pis[2], pis[3]);
        aig.set_next(0, a);
        aig.set_next(1, b);
        let config = EraConfig::default().with_stop_on_bad(false).with_pages(8, 8);
        let (arena, index, _, stats) = run_one(&aig, &config, "00");
        assert_eq!(stats.folded, 0);
        assert_eq!(cubes(&arena, &index), vec!["--"]);
    }

    #[test]
    fn test_parity_output_is_not_split() {
        // bad = r0 & (i0 ^ i1 ^ ... ^ i15)
        let mut aig = Aig::new();
        let pis: Vec<_> = (0..16).map(|_| aig.add_input()).collect();
        let r0 = aig.add_latch(Some(true));
        aig.set_next(0, r0);
        let mut parity = Lit::FALSE;
        for &p in &pis {
            parity = aig.xor(parity, p);
        }
        let bad = aig.and(r0, parity);
        aig.add_output(bad);
        let config = EraConfig::default().with_pages(8, 8);

        let (arena, _, step, stats) = run_one(&aig, &config, "1");
        let Step::Target { output, cube } = step else {
            panic!("expected a target, got {:?}", step);
        };
        assert_eq!(output, 0);
        assert_eq!(arena.to_cube(cube).to_string(), "1");
        assert_eq!(stats.rec_calls, 0);

        let (_, _, step, stats) = run_one(&aig, &config, "0");
        assert_eq!(step, Step::Continue);
        assert_eq!(stats.rec_calls, 1);
    }

    #[test]
    fn test_unsatisfiable_output_is_not_a_target() {
        // bad = x & (!x & r0) with x = i ^ j
        let mut aig = Aig::new();
        let i = aig.add_input();
        let j = aig.add_input();
        let r0 = aig.add_latch(None);
        aig.set_next(0, r0);
        let x = aig.xor(i, j);
        let y = aig.and(!x, r0);
        let bad = aig.and(x, y);
        aig.add_output(bad);
        let config = EraConfig::default().with_pages(8, 8);
        let (arena, index, step, _) = run_one(&aig, &config, "-");
        assert_eq!(step, Step::Continue);
        assert_eq!(cubes(&arena, &index), vec!["-"]);
    }

    #[test]
    fn test_call_budget() {
        // Every register copies the same input: each split is shared.
        let mut aig = Aig::new();
        let a = aig.add_input();
        let b = aig.add_input();
        for _ in 0..4 {
            aig.add_latch(Some(false));
        }
        let x = aig.xor(a, b);
        for r in 0..4 {
            aig.set_next(r, if r % 2 == 0 { x } else { a });
        }
        let config = EraConfig::default()
            .with_stop_on_bad(false)
            .with_max_calls(2)
            .with_pages(8, 8);
        let (_, _, step, stats) = run_one(&aig, &config, "0000");
        assert_eq!(step, Step::CallBudget);
        assert_eq!(stats.rec_calls, 2);
    }

    #[test]
    fn test_scratch_recycling() {
        let mut aig = Aig::new();
        let i = aig.add_input();
        aig.add_latch(Some(false));
        let r1 = aig.add_latch(Some(false));
        let x = aig.and(i, r1);
        aig.set_next(0, x);
        aig.set_next(1, !x);
        let config = EraConfig::default()
            .with_stop_on_bad(false)
            .with_scratch_limit(0)
            .with_pages(8, 8);
        let mut arena = Arena::new(2, config.page_bits, config.max_pages);
        let mut index = CubeIndex::new(&config);
        let mut stats = Stats::default();
        let s = arena.alloc_cube_from(&"0-".parse().unwrap()).unwrap();
        index.insert(&mut arena, s, &mut stats).unwrap();
        let mut e = Enumerator::new(&aig, &config);
        e.expand(&mut arena, &mut index, s, &mut stats).unwrap();
        e.expand(&mut arena, &mut index, s, &mut stats).unwrap();
        assert_eq!(stats.scratch_recycles, 2);
        assert_eq!(stats.expanded, 2);
    }
}
