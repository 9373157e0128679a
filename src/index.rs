//! Index of the state cubes discovered so far.
//!
//! The index starts as a single flat list of cubes. A list that grows to the bucket limit is
//! either compressed (garbage dropped) or split on the register that divides its cubes best,
//! turning the list into a [`DecisionNode`] with three branches:
//!
//! ```text
//!              [ var v ]
//!            /    |     \
//!         v=0    v=1    v=-
//!        list   list   sub-tree
//! ```
//!
//! Each branch is again a list or a sub-tree (see [`DecisionNode::has_subtree`]).
//!
//! # Insertion
//!
//! A candidate `c` is compared against every live cube `e` it may interact with:
//!
//! - `e` and `c` are disjoint: nothing to do,
//! - `e` contains `c`: `c` is rejected and its slot reclaimed,
//! - `c` contains `e`: `e` is remembered,
//! - otherwise, if exactly one register is `-` in `c` and concrete in `e`, that register of
//!   `c` is forced to the opposite value and the whole check restarts from the root; if there
//!   are several such registers the overlap is kept.
//!
//! A surviving candidate is prepended to the list selected by its own values, and only then
//! are the cubes it contains marked garbage. A sharp can shrink `c` back to a cube it used to
//! contain, so marking them earlier would let `c` replace an identical cube.
//!
//! # Traversal
//!
//! At a decision node on `v`, a candidate with a concrete value at `v` visits the matching
//! branch and the don't-care branch. A candidate that is `-` at `v` visits only the
//! don't-care branch in [`Traversal::Fast`] mode, and all three in [`Traversal::Exact`] mode.
//! Fast mode never misses a containing cube (a cube containing `c` must itself be `-` at `v`),
//! it only misses cubes that `c` would subsume or sharp against.

use log::{debug, warn};

use crate::arena::{Arena, ArenaFull, DecisionNode, BRANCH_DASH, BRANCH_ONE, BRANCH_ZERO};
use crate::config::{EraConfig, TreeCheck, Traversal};
use crate::cube::{self, Ternary};
use crate::handle::Handle;
use crate::stats::Stats;

/// Outcome of [`CubeIndex::insert`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Insert {
    Accepted(Handle),
    Rejected,
}

impl Insert {
    pub fn is_accepted(self) -> bool {
        matches!(self, Insert::Accepted(_))
    }
}

/// Location of a list head: the index root or one branch of a decision node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Slot {
    Root,
    Branch(Handle, usize),
}

fn branch_of(t: Ternary) -> usize {
    match t {
        Ternary::Zero => BRANCH_ZERO,
        Ternary::One => BRANCH_ONE,
        Ternary::DontCare => BRANCH_DASH,
    }
}

/// Branches a query with value `t` at the decision variable has to visit.
fn branches_for(t: Ternary, traversal: Traversal) -> &'static [usize] {
    match (t, traversal) {
        (Ternary::Zero, _) => &[BRANCH_ZERO, BRANCH_DASH],
        (Ternary::One, _) => &[BRANCH_ONE, BRANCH_DASH],
        (Ternary::DontCare, Traversal::Fast) => &[BRANCH_DASH],
        (Ternary::DontCare, Traversal::Exact) => &[BRANCH_ZERO, BRANCH_ONE, BRANCH_DASH],
    }
}

enum Scan {
    Covered,
    Sharped,
    Subsumes,
    Done,
}

/// Compares the candidate `c` against one live cube `e`, sharping `c` if needed.
///
/// Cubes that `c` contains are only reported; they are marked garbage once `c` is final.
fn compare(arena: &mut Arena, c: Handle, e: Handle, stats: &mut Stats) -> Scan {
    stats.checks += 1;
    if arena.is_garbage(e) {
        return Scan::Done;
    }
    let (cw, ew) = (arena.cube(c), arena.cube(e));
    if cube::disjoint(cw, ew) {
        return Scan::Done;
    }
    if cube::contains(ew, cw) {
        debug!("index: {} is contained in {}", c, e);
        return Scan::Covered;
    }
    if cube::contains(cw, ew) {
        return Scan::Subsumes;
    }
    if cube::sharp_variable(cw, ew).is_none() {
        return Scan::Done;
    }
    let e_words = arena.cube(e).to_vec();
    let reg = cube::sharp(arena.cube_mut(c), &e_words);
    debug!("index: sharped {} against {} on register {:?}", c, e, reg);
    stats.sharps += 1;
    Scan::Sharped
}

pub struct CubeIndex {
    root: Handle,
    root_count: u8,
    is_tree: bool,

    bucket_limit: u8,
    traversal: Traversal,
    tree_check: TreeCheck,

    /// Flat index of the state being expanded.
    cursor: u32,
    /// Overlapping cubes discovered up to the cursor.
    before: Vec<Handle>,
    /// Overlapping cubes discovered after the cursor.
    after: Vec<Handle>,
    /// Cubes contained in the candidate, marked garbage once it is accepted.
    subsumed: Vec<Handle>,
}

impl CubeIndex {
    pub fn new(config: &EraConfig) -> Self {
        Self {
            root: Handle::NONE,
            root_count: 0,
            is_tree: false,
            bucket_limit: config.bucket_limit,
            traversal: config.traversal,
            tree_check: config.tree_check,
            cursor: 0,
            before: Vec::new(),
            after: Vec::new(),
            subsumed: Vec::new(),
        }
    }

    pub fn is_tree(&self) -> bool {
        self.is_tree
    }

    /// Root list head, or root decision node once the index is a tree.
    pub fn root(&self) -> Handle {
        self.root
    }

    pub fn set_cursor(&mut self, cursor: u32) {
        self.cursor = cursor;
    }

    /// Checks the freshly allocated cube `c` against the index and stores it if it adds states.
    ///
    /// `c` may be shrunk by sharping. A rejected `c` is handed back to the arena.
    pub fn insert(&mut self, arena: &mut Arena, c: Handle, stats: &mut Stats) -> Result<Insert, ArenaFull> {
        if !self.check(arena, c, stats) {
            arena.recycle_cube(c);
            stats.rejected += 1;
            return Ok(Insert::Rejected);
        }
        for i in 0..self.subsumed.len() {
            let e = self.subsumed[i];
            debug!("index: {} subsumes {}", c, e);
            arena.set_garbage(e);
            stats.subsumed += 1;
        }
        self.subsumed.clear();
        self.add(arena, c, stats)?;
        stats.accepted += 1;
        Ok(Insert::Accepted(c))
    }

    /// Whether `c` adds states to the index.
    ///
    /// Every sharp restarts the whole check: cubes scanned before the sharp were compared
    /// against a larger `c`.
    fn check(&mut self, arena: &mut Arena, c: Handle, stats: &mut Stats) -> bool {
        loop {
            self.subsumed.clear();
            let scan = if !self.is_tree {
                self.check_list(arena, self.root, c, stats)
            } else {
                match self.tree_check {
                    TreeCheck::Collect => self.check_collected(arena, c, stats),
                    TreeCheck::Recursive => self.check_tree(arena, self.root, c, stats),
                }
            };
            match scan {
                Scan::Covered => {
                    self.subsumed.clear();
                    return false;
                }
                Scan::Sharped => continue,
                Scan::Subsumes | Scan::Done => return true,
            }
        }
    }

    /// Scans the list at `head` until `c` is covered or sharped.
    fn check_list(&mut self, arena: &mut Arena, head: Handle, c: Handle, stats: &mut Stats) -> Scan {
        let mut current = head;
        while let Some(e) = current.get() {
            current = arena.next(e);
            match compare(arena, c, e, stats) {
                Scan::Subsumes => self.subsumed.push(e),
                Scan::Done => {}
                scan => return scan,
            }
        }
        Scan::Done
    }

    fn check_tree(&mut self, arena: &mut Arena, node: Handle, c: Handle, stats: &mut Stats) -> Scan {
        let n = *arena.node(node);
        let t = cube::value(arena.cube(c), n.var as usize);
        for &k in branches_for(t, self.traversal) {
            let scan = if n.has_subtree(k) {
                self.check_tree(arena, n.branches[k], c, stats)
            } else {
                self.check_list(arena, n.branches[k], c, stats)
            };
            if matches!(scan, Scan::Covered | Scan::Sharped) {
                return scan;
            }
        }
        Scan::Done
    }

    /// Collects every live cube overlapping `c` into the before/after sets.
    fn collect(&mut self, arena: &Arena, node: Handle, c: Handle) {
        let n = *arena.node(node);
        let t = cube::value(arena.cube(c), n.var as usize);
        for &k in branches_for(t, self.traversal) {
            if n.has_subtree(k) {
                self.collect(arena, n.branches[k], c);
                continue;
            }
            for e in arena.list(n.branches[k]) {
                if arena.is_garbage(e) || cube::disjoint(arena.cube(c), arena.cube(e)) {
                    continue;
                }
                if arena.flat_index(e) <= self.cursor {
                    self.before.push(e);
                } else {
                    self.after.push(e);
                }
            }
        }
    }

    fn check_collected(&mut self, arena: &mut Arena, c: Handle, stats: &mut Stats) -> Scan {
        self.before.clear();
        self.after.clear();
        self.collect(arena, self.root, c);
        for i in 0..self.before.len() + self.after.len() {
            let e = if i < self.before.len() {
                self.before[i]
            } else {
                self.after[i - self.before.len()]
            };
            match compare(arena, c, e, stats) {
                Scan::Subsumes => self.subsumed.push(e),
                Scan::Done => {}
                scan => return scan,
            }
        }
        Scan::Done
    }

    fn add(&mut self, arena: &mut Arena, c: Handle, stats: &mut Stats) -> Result<(), ArenaFull> {
        if !self.is_tree {
            return self.add_to_slot(arena, Slot::Root, c, stats);
        }
        let mut node = self.root;
        loop {
            let n = *arena.node(node);
            let k = branch_of(cube::value(arena.cube(c), n.var as usize));
            if n.has_subtree(k) {
                node = n.branches[k];
            } else {
                return self.add_to_slot(arena, Slot::Branch(node, k), c, stats);
            }
        }
    }

    fn head(&self, arena: &Arena, slot: Slot) -> Handle {
        match slot {
            Slot::Root => self.root,
            Slot::Branch(node, k) => arena.node(node).branches[k],
        }
    }

    fn set_head(&mut self, arena: &mut Arena, slot: Slot, head: Handle) {
        match slot {
            Slot::Root => self.root = head,
            Slot::Branch(node, k) => arena.node_mut(node).branches[k] = head,
        }
    }

    fn count(&self, arena: &Arena, slot: Slot) -> u8 {
        match slot {
            Slot::Root => self.root_count,
            Slot::Branch(node, k) => arena.node(node).counts[k],
        }
    }

    fn set_count(&mut self, arena: &mut Arena, slot: Slot, count: u8) {
        match slot {
            Slot::Root => self.root_count = count,
            Slot::Branch(node, k) => arena.node_mut(node).counts[k] = count,
        }
    }

    fn add_to_slot(&mut self, arena: &mut Arena, slot: Slot, c: Handle, stats: &mut Stats) -> Result<(), ArenaFull> {
        let head = self.head(arena, slot);
        arena.set_next(c, head);
        self.set_head(arena, slot, c);
        let count = self.count(arena, slot).saturating_add(1);
        self.set_count(arena, slot, count);
        if count < self.bucket_limit {
            return Ok(());
        }

        let live = arena.list(c).filter(|&e| !arena.is_garbage(e)).count();
        if live >= (self.bucket_limit as usize / 2).max(2) && self.split(arena, slot)? {
            stats.splits += 1;
        } else {
            self.compress(arena, slot);
            stats.compresses += 1;
        }
        Ok(())
    }

    /// Rebuilds the list at `slot` from its live cubes, keeping their order.
    fn compress(&mut self, arena: &mut Arena, slot: Slot) {
        let head = self.head(arena, slot);
        let live: Vec<Handle> = arena.list(head).filter(|&e| !arena.is_garbage(e)).collect();
        debug!("index: compressing list of {} live cubes", live.len());
        let mut next = Handle::NONE;
        for &e in live.iter().rev() {
            arena.set_next(e, next);
            next = e;
        }
        self.set_head(arena, slot, next);
        self.set_count(arena, slot, live.len() as u8);
    }

    /// Register maximizing `count0 + count1 - |count0 - count1|` over the live cubes of a list.
    ///
    /// Registers where two of the three counts are zero are skipped. Returns `None` when
    /// every register is skipped, which only happens for lists of identical cubes.
    fn best_var(&self, arena: &Arena, live: &[Handle]) -> Option<u32> {
        let mut best: Option<(u32, usize)> = None;
        for var in 0..arena.num_regs() {
            let mut counts = [0usize; 3];
            for &e in live {
                counts[branch_of(cube::value(arena.cube(e), var))] += 1;
            }
            let [c0, c1, c2] = counts;
            if (c0 == 0 && c1 == 0) || (c0 == 0 && c2 == 0) || (c1 == 0 && c2 == 0) {
                continue;
            }
            let weight = c0 + c1 - c0.abs_diff(c1);
            if best.map_or(true, |(_, w)| w < weight) {
                best = Some((var as u32, weight));
            }
        }
        best.map(|(var, _)| var)
    }

    /// Replaces the list at `slot` by a decision node distributing its live cubes.
    ///
    /// Returns false, leaving the list alone, when no register separates the cubes.
    fn split(&mut self, arena: &mut Arena, slot: Slot) -> Result<bool, ArenaFull> {
        let head = self.head(arena, slot);
        let live: Vec<Handle> = arena.list(head).filter(|&e| !arena.is_garbage(e)).collect();
        let Some(var) = self.best_var(arena, &live) else {
            warn!("index: no register separates {} live cubes", live.len());
            return Ok(false);
        };
        let node = arena.alloc_node()?;
        let mut n = DecisionNode::new(var);
        for &e in &live {
            let k = branch_of(cube::value(arena.cube(e), var as usize));
            arena.set_next(e, n.branches[k]);
            n.branches[k] = e;
            n.counts[k] += 1;
        }
        debug!(
            "index: split {} live cubes on register {} into {:?}",
            live.len(),
            var,
            n.counts
        );
        *arena.node_mut(node) = n;
        self.set_head(arena, slot, node);
        self.set_count(arena, slot, 0);
        if slot == Slot::Root {
            self.is_tree = true;
        }
        Ok(true)
    }
}

// Queries
impl CubeIndex {
    fn for_each_list(&self, arena: &Arena, f: &mut impl FnMut(Handle)) {
        if !self.is_tree {
            f(self.root);
        } else {
            Self::for_each_list_rec(arena, self.root, f);
        }
    }

    fn for_each_list_rec(arena: &Arena, node: Handle, f: &mut impl FnMut(Handle)) {
        let n = arena.node(node);
        for k in 0..3 {
            if n.has_subtree(k) {
                Self::for_each_list_rec(arena, n.branches[k], f);
            } else {
                f(n.branches[k]);
            }
        }
    }

    /// All live cubes, list by list.
    pub fn live_cubes(&self, arena: &Arena) -> Vec<Handle> {
        let mut result = Vec::new();
        self.for_each_list(arena, &mut |head| {
            result.extend(arena.list(head).filter(|&e| !arena.is_garbage(e)));
        });
        result
    }

    pub fn live_count(&self, arena: &Arena) -> usize {
        let mut count = 0;
        self.for_each_list(arena, &mut |head| {
            count += arena.list(head).filter(|&e| !arena.is_garbage(e)).count();
        });
        count
    }

    /// Whether some live cube contains `query`. Does not modify anything.
    pub fn covers(&self, arena: &Arena, query: &[u64]) -> bool {
        if !self.is_tree {
            return Self::list_covers(arena, self.root, query);
        }
        self.tree_covers(arena, self.root, query)
    }

    fn list_covers(arena: &Arena, head: Handle, query: &[u64]) -> bool {
        arena
            .list(head)
            .any(|e| !arena.is_garbage(e) && cube::contains(arena.cube(e), query))
    }

    fn tree_covers(&self, arena: &Arena, node: Handle, query: &[u64]) -> bool {
        let n = arena.node(node);
        // A containing cube is '-' wherever the query is.
        let t = cube::value(query, n.var as usize);
        branches_for(t, Traversal::Fast).iter().any(|&k| {
            if n.has_subtree(k) {
                self.tree_covers(arena, n.branches[k], query)
            } else {
                Self::list_covers(arena, n.branches[k], query)
            }
        })
    }

    /// Drops garbage from every list.
    pub fn compress_all(&mut self, arena: &mut Arena) {
        if !self.is_tree {
            self.compress(arena, Slot::Root);
            return;
        }
        let mut slots = Vec::new();
        Self::collect_slots(arena, self.root, &mut slots);
        for slot in slots {
            self.compress(arena, slot);
        }
    }

    fn collect_slots(arena: &Arena, node: Handle, slots: &mut Vec<Slot>) {
        let n = arena.node(node);
        for k in 0..3 {
            if n.has_subtree(k) {
                Self::collect_slots(arena, n.branches[k], slots);
            } else {
                slots.push(Slot::Branch(node, k));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::cube::Cube;

    fn setup(num_regs: usize) -> (Arena, CubeIndex, Stats) {
        let config = EraConfig::default().with_pages(8, 16);
        let arena = Arena::new(num_regs, config.page_bits, config.max_pages);
        (arena, CubeIndex::new(&config), Stats::default())
    }

    fn insert(arena: &mut Arena, index: &mut CubeIndex, stats: &mut Stats, s: &str) -> Insert {
        let cube: Cube = s.parse().unwrap();
        let h = arena.alloc_cube_from(&cube).unwrap();
        index.insert(arena, h, stats).unwrap()
    }

    fn live_strings(arena: &Arena, index: &CubeIndex) -> Vec<String> {
        let mut v: Vec<_> = index
            .live_cubes(arena)
            .into_iter()
            .map(|h| arena.to_cube(h).to_string())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn test_duplicate_rejected() {
        let (mut arena, mut index, mut stats) = setup(2);
        assert!(insert(&mut arena, &mut index, &mut stats, "00").is_accepted());
        assert_eq!(insert(&mut arena, &mut index, &mut stats, "00"), Insert::Rejected);
        assert_eq!(index.live_count(&arena), 1);
        // The rejected slot was reclaimed.
        assert_eq!(arena.num_cubes(), 2);
    }

    #[test]
    fn test_contained_rejected() {
        let (mut arena, mut index, mut stats) = setup(2);
        assert!(insert(&mut arena, &mut index, &mut stats, "0-").is_accepted());
        assert_eq!(insert(&mut arena, &mut index, &mut stats, "01"), Insert::Rejected);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_subsumed_marked_garbage() {
        let (mut arena, mut index, mut stats) = setup(3);
        let a = insert(&mut arena, &mut index, &mut stats, "011");
        let b = insert(&mut arena, &mut index, &mut stats, "100");
        assert!(insert(&mut arena, &mut index, &mut stats, "01-").is_accepted());
        let Insert::Accepted(a) = a else { panic!() };
        let Insert::Accepted(b) = b else { panic!() };
        assert!(arena.is_garbage(a));
        assert!(!arena.is_garbage(b));
        assert_eq!(live_strings(&arena, &index), vec!["01-", "100"]);
        assert_eq!(stats.subsumed, 1);
    }

    #[test]
    fn test_sharping() {
        let (mut arena, mut index, mut stats) = setup(3);
        insert(&mut arena, &mut index, &mut stats, "0-0");
        // Only register 0 is '-' here and concrete there.
        let r = insert(&mut arena, &mut index, &mut stats, "-10");
        let Insert::Accepted(h) = r else { panic!() };
        assert_eq!(arena.to_cube(h).to_string(), "110");
        assert_eq!(stats.sharps, 1);
        let cubes = index.live_cubes(&arena);
        for &x in &cubes {
            for &y in &cubes {
                if x != y {
                    assert!(cube::disjoint(arena.cube(x), arena.cube(y)));
                }
            }
        }
    }

    #[test]
    fn test_sharp_then_covered() {
        let (mut arena, mut index, mut stats) = setup(2);
        insert(&mut arena, &mut index, &mut stats, "01");
        insert(&mut arena, &mut index, &mut stats, "1-");
        // "-1" is sharped to "01" by "1-", and "01" is already there.
        assert_eq!(insert(&mut arena, &mut index, &mut stats, "-1"), Insert::Rejected);
    }

    #[test]
    fn test_unresolved_overlap_kept() {
        let (mut arena, mut index, mut stats) = setup(3);
        insert(&mut arena, &mut index, &mut stats, "01-");
        // Two registers are '-' here and concrete there: no sharping.
        assert!(insert(&mut arena, &mut index, &mut stats, "--1").is_accepted());
        assert_eq!(index.live_count(&arena), 2);
    }

    /// All 2^6 minterms of 6 registers differ pairwise in at least one bit.
    fn minterm(i: usize) -> String {
        (0..6).map(|b| if i >> b & 1 == 1 { '1' } else { '0' }).collect()
    }

    #[test]
    fn test_split_at_limit() {
        let (mut arena, mut index, mut stats) = setup(6);
        for i in 0..62 {
            assert!(insert(&mut arena, &mut index, &mut stats, &minterm(i)).is_accepted());
        }
        assert!(!index.is_tree());
        assert!(insert(&mut arena, &mut index, &mut stats, &minterm(62)).is_accepted());
        assert!(index.is_tree());
        assert_eq!(stats.splits, 1);

        let root = *arena.node(index.root());
        let total: usize = (0..3)
            .map(|k| arena.list(root.branches[k]).count())
            .sum();
        assert_eq!(total, 63);
        assert_eq!(root.counts.iter().map(|&c| c as usize).sum::<usize>(), 63);
        // Minterms have no don't-cares.
        assert_eq!(root.counts[BRANCH_DASH], 0);

        let mut all = live_strings(&arena, &index);
        all.dedup();
        assert_eq!(all.len(), 63);

        // The last one lands in the tree.
        assert!(insert(&mut arena, &mut index, &mut stats, &minterm(63)).is_accepted());
        assert_eq!(index.live_count(&arena), 64);
        for i in 0..64 {
            let q: Cube = minterm(i).parse().unwrap();
            assert!(index.covers(&arena, q.words()));
        }
    }

    #[test]
    fn test_compress_at_limit() {
        let config = EraConfig::default().with_pages(8, 16).with_bucket_limit(8);
        let mut arena = Arena::new(4, config.page_bits, config.max_pages);
        let mut index = CubeIndex::new(&config);
        let mut stats = Stats::default();
        // Seven concrete cubes, then one general cube subsuming six of them.
        for s in ["0000", "0001", "0010", "0011", "0100", "0101", "1111"] {
            insert(&mut arena, &mut index, &mut stats, s);
        }
        insert(&mut arena, &mut index, &mut stats, "0---");
        assert_eq!(stats.compresses, 1);
        assert!(!index.is_tree());
        assert_eq!(arena.list(index.root()).count(), 2);
        assert_eq!(live_strings(&arena, &index), vec!["0---", "1111"]);
    }

    #[test]
    fn test_tree_modes_agree_on_rejection() {
        for tree_check in [TreeCheck::Collect, TreeCheck::Recursive] {
            for traversal in [Traversal::Fast, Traversal::Exact] {
                let config = EraConfig::default()
                    .with_pages(8, 16)
                    .with_bucket_limit(4)
                    .with_tree_check(tree_check)
                    .with_traversal(traversal);
                let mut arena = Arena::new(4, config.page_bits, config.max_pages);
                let mut index = CubeIndex::new(&config);
                let mut stats = Stats::default();
                for s in ["0000", "0101", "1010", "1111", "0011", "1100"] {
                    assert!(insert(&mut arena, &mut index, &mut stats, s).is_accepted());
                }
                assert!(index.is_tree());
                for s in ["0000", "1111", "0011"] {
                    assert_eq!(insert(&mut arena, &mut index, &mut stats, s), Insert::Rejected);
                }
                assert_eq!(index.live_count(&arena), 6);
            }
        }
    }

    #[test]
    fn test_exact_traversal_finds_subsumed() {
        let config = EraConfig::default()
            .with_pages(8, 16)
            .with_bucket_limit(4)
            .with_traversal(Traversal::Exact);
        let mut arena = Arena::new(3, config.page_bits, config.max_pages);
        let mut index = CubeIndex::new(&config);
        let mut stats = Stats::default();
        for s in ["000", "011", "101", "110"] {
            insert(&mut arena, &mut index, &mut stats, s);
        }
        assert!(index.is_tree());
        assert!(insert(&mut arena, &mut index, &mut stats, "---").is_accepted());
        assert_eq!(live_strings(&arena, &index), vec!["---"]);
    }

    #[test]
    fn test_compress_all_removes_redundancy() {
        let (mut arena, mut index, mut stats) = setup(4);
        for s in ["0000", "0001", "001-", "00--", "1---", "11-1"] {
            insert(&mut arena, &mut index, &mut stats, s);
        }
        index.compress_all(&mut arena);
        let cubes = index.live_cubes(&arena);
        assert_eq!(arena.list(index.root()).count(), cubes.len());
        for &x in &cubes {
            for &y in &cubes {
                if x != y {
                    assert!(!cube::contains(arena.cube(x), arena.cube(y)));
                }
            }
        }
        assert_eq!(live_strings(&arena, &index), vec!["00--", "1---"]);
    }

    #[test]
    fn test_sharp_back_to_contained_cube() {
        let (mut arena, mut index, mut stats) = setup(2);
        insert(&mut arena, &mut index, &mut stats, "-0");
        let Insert::Accepted(a) = insert(&mut arena, &mut index, &mut stats, "11") else { panic!() };
        // "1-" contains "11", then "-0" sharps it down to "11".
        assert_eq!(insert(&mut arena, &mut index, &mut stats, "1-"), Insert::Rejected);
        assert!(!arena.is_garbage(a));
        assert_eq!(stats.subsumed, 0);
        assert_eq!(live_strings(&arena, &index), vec!["-0", "11"]);
    }

    #[test]
    fn test_sharp_in_later_branch_restarts_from_root() {
        for tree_check in [TreeCheck::Collect, TreeCheck::Recursive] {
            for traversal in [Traversal::Fast, Traversal::Exact] {
                let config = EraConfig::default()
                    .with_pages(8, 16)
                    .with_bucket_limit(4)
                    .with_tree_check(tree_check)
                    .with_traversal(traversal);
                let mut arena = Arena::new(3, config.page_bits, config.max_pages);
                let mut index = CubeIndex::new(&config);
                let mut stats = Stats::default();
                let Insert::Accepted(a) = insert(&mut arena, &mut index, &mut stats, "110") else { panic!() };
                for s in ["-11", "000", "01-"] {
                    assert!(insert(&mut arena, &mut index, &mut stats, s).is_accepted());
                }
                assert!(index.is_tree());
                assert_eq!(arena.node(index.root()).var, 0);

                // The 1-branch holds "110"; the '-' branch sharps "11-" down to "110".
                assert_eq!(insert(&mut arena, &mut index, &mut stats, "11-"), Insert::Rejected);
                assert!(!arena.is_garbage(a));
                assert_eq!(live_strings(&arena, &index), vec!["-11", "000", "010", "110"]);
            }
        }
    }

    #[test]
    fn test_no_duplicates_under_random_inserts() {
        for tree_check in [TreeCheck::Collect, TreeCheck::Recursive] {
            for traversal in [Traversal::Fast, Traversal::Exact] {
                let config = EraConfig::default()
                    .with_pages(10, 16)
                    .with_bucket_limit(4)
                    .with_tree_check(tree_check)
                    .with_traversal(traversal);
                let mut arena = Arena::new(5, config.page_bits, config.max_pages);
                let mut index = CubeIndex::new(&config);
                let mut stats = Stats::default();
                // Every cube over 5 registers, in a scrambled order.
                for i in 0..243usize {
                    let j = (i * 97) % 243;
                    let s: String = (0..5)
                        .map(|r| match j / 3usize.pow(r) % 3 {
                            0 => '0',
                            1 => '1',
                            _ => '-',
                        })
                        .collect();
                    insert(&mut arena, &mut index, &mut stats, &s);
                    let mut live = live_strings(&arena, &index);
                    let n = live.len();
                    live.dedup();
                    assert_eq!(live.len(), n, "duplicate after inserting {}", s);
                }
                let all: Cube = "-----".parse().unwrap();
                assert!(index.covers(&arena, all.words()));
            }
        }
    }
}
