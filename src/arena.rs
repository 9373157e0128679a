//! Paged, append-only storage for decision nodes and state cubes.
//!
//! Records are addressed by [`Handle`]s rather than references, so that pages can be added
//! without invalidating anything handed out before. Each record kind lives in its own
//! page table:
//!
//! ```text
//! nodes: [page 0: #, n1, n2, ...] [page 1: ...] ...
//! cubes: [page 0: #, c1, c2, ...] [page 1: ...] ...
//! ```
//!
//! Slot 0 of page 0 (`#`) is reserved in both tables, so [`Handle::NONE`] never refers to a
//! live record. Allocation is a bump of the flat item counter; the only deallocation is
//! [`Arena::recycle_cube`], which pops the most recent cube.
//!
//! A cube record is one header word followed by the ternary data words:
//!
//! ```text
//! word 0: [ next : 32 | prev : 32 ]     (the mark bit of `prev` is the garbage flag)
//! word 1..: ternary data, two bits per register
//! ```

use std::fmt::{Display, Formatter};

use crate::cube::{words_for, Cube};
use crate::handle::{Handle, ITEM_BITS, MAX_PAGES};

/// Branch slots of a decision node.
pub const BRANCH_ZERO: usize = 0;
pub const BRANCH_ONE: usize = 1;
pub const BRANCH_DASH: usize = 2;

/// One branch point of the cube index tree.
///
/// A branch with a zero counter and a non-null handle is a sub-tree; otherwise it is a flat
/// list of cubes with `counts[k]` entries added since it was last rebuilt.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DecisionNode {
    pub var: u32,
    pub counts: [u8; 3],
    pub branches: [Handle; 3],
}

impl DecisionNode {
    pub fn new(var: u32) -> Self {
        Self {
            var,
            ..Default::default()
        }
    }

    pub fn has_subtree(&self, k: usize) -> bool {
        self.counts[k] == 0 && self.branches[k].is_some()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RecordKind {
    Node,
    Cube,
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Node => write!(f, "node"),
            RecordKind::Cube => write!(f, "cube"),
        }
    }
}

/// The page ceiling of one record kind was reached.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("arena ran out of {kind} pages ({pages} pages of {items} items)")]
pub struct ArenaFull {
    pub kind: RecordKind,
    pub pages: usize,
    pub items: usize,
}

pub struct Arena {
    num_regs: usize,
    words: usize,
    stride: usize,
    page_bits: u32,
    max_pages: usize,

    nodes: Vec<Vec<DecisionNode>>,
    num_nodes: u32,

    cubes: Vec<Vec<u64>>,
    num_cubes: u32,
}

impl Arena {
    /// Creates an empty arena for cubes over `num_regs` registers,
    /// with `2^page_bits` items per page and at most `max_pages` pages per record kind.
    pub fn new(num_regs: usize, page_bits: u32, max_pages: usize) -> Self {
        assert!(
            (1..=ITEM_BITS).contains(&page_bits),
            "Page bits should be in the range 1..={}",
            ITEM_BITS
        );
        assert!(
            (1..=MAX_PAGES as usize).contains(&max_pages),
            "Max pages should be in the range 1..={}",
            MAX_PAGES
        );
        let words = words_for(num_regs);
        Self {
            num_regs,
            words,
            stride: 1 + words,
            page_bits,
            max_pages,
            nodes: Vec::new(),
            num_nodes: 0,
            cubes: Vec::new(),
            num_cubes: 0,
        }
    }

    pub fn num_regs(&self) -> usize {
        self.num_regs
    }
    /// Data words per cube.
    pub fn words(&self) -> usize {
        self.words
    }
    pub fn items_per_page(&self) -> usize {
        1 << self.page_bits
    }
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Number of cube slots handed out, including the sentinel.
    pub fn num_cubes(&self) -> u32 {
        self.num_cubes
    }
    /// Number of node slots handed out, including the sentinel.
    pub fn num_nodes(&self) -> u32 {
        self.num_nodes
    }
    pub fn cube_pages(&self) -> usize {
        self.cubes.len()
    }
    pub fn node_pages(&self) -> usize {
        self.nodes.len()
    }

    /// Estimated footprint of fully populated pages, in bytes.
    pub fn memory_bytes(&self) -> usize {
        let items = self.items_per_page();
        let cube_page = items * self.stride * std::mem::size_of::<u64>();
        let node_page = items * std::mem::size_of::<DecisionNode>();
        std::mem::size_of::<Self>()
            + 2 * self.max_pages * std::mem::size_of::<usize>()
            + self.cubes.len() * cube_page
            + self.nodes.len() * node_page
    }

    /// Handle of the cube with flat (discovery) index `index`.
    pub fn cube_handle(&self, index: u32) -> Handle {
        Handle::new(index >> self.page_bits, index & ((1 << self.page_bits) - 1))
    }

    /// Flat (discovery) index of a cube or node handle.
    pub fn flat_index(&self, h: Handle) -> u32 {
        (h.page() << self.page_bits) | h.item()
    }

    fn check_cube(&self, h: Handle) -> (usize, usize) {
        assert!(h.is_some(), "Dereferencing the null cube handle");
        assert!(
            self.flat_index(h) < self.num_cubes,
            "Cube handle {} is not allocated",
            h
        );
        (h.page() as usize, h.item() as usize * self.stride)
    }

    fn check_node(&self, h: Handle) -> (usize, usize) {
        assert!(h.is_some(), "Dereferencing the null node handle");
        assert!(
            self.flat_index(h) < self.num_nodes,
            "Node handle {} is not allocated",
            h
        );
        (h.page() as usize, h.item() as usize)
    }
}

// Nodes
impl Arena {
    pub fn alloc_node(&mut self) -> Result<Handle, ArenaFull> {
        let items = self.items_per_page() as u32;
        if self.num_nodes == self.nodes.len() as u32 * items {
            if self.nodes.len() == self.max_pages {
                return Err(ArenaFull {
                    kind: RecordKind::Node,
                    pages: self.max_pages,
                    items: items as usize,
                });
            }
            self.nodes.push(Vec::new());
            if self.num_nodes == 0 {
                // Sentry.
                self.nodes[0].push(DecisionNode::default());
                self.num_nodes = 1;
            }
        }
        let h = Handle::new(self.num_nodes >> self.page_bits, self.num_nodes & (items - 1));
        self.nodes[h.page() as usize].push(DecisionNode::default());
        self.num_nodes += 1;
        Ok(h)
    }

    pub fn node(&self, h: Handle) -> &DecisionNode {
        let (page, item) = self.check_node(h);
        &self.nodes[page][item]
    }

    pub fn node_mut(&mut self, h: Handle) -> &mut DecisionNode {
        let (page, item) = self.check_node(h);
        &mut self.nodes[page][item]
    }
}

// Cubes
impl Arena {
    /// Allocates an all-`-` cube with null links.
    pub fn alloc_cube(&mut self) -> Result<Handle, ArenaFull> {
        let items = self.items_per_page() as u32;
        if self.num_cubes == self.cubes.len() as u32 * items {
            if self.cubes.len() == self.max_pages {
                return Err(ArenaFull {
                    kind: RecordKind::Cube,
                    pages: self.max_pages,
                    items: items as usize,
                });
            }
            self.cubes.push(Vec::new());
            if self.num_cubes == 0 {
                // Sentry.
                self.cubes[0].resize(self.stride, 0);
                self.num_cubes = 1;
            }
        }
        let h = self.cube_handle(self.num_cubes);
        let page = &mut self.cubes[h.page() as usize];
        page.resize(page.len() + self.stride, 0);
        self.num_cubes += 1;
        Ok(h)
    }

    /// Allocates a cube holding a copy of `cube`.
    pub fn alloc_cube_from(&mut self, cube: &Cube) -> Result<Handle, ArenaFull> {
        assert_eq!(cube.len(), self.num_regs, "Cube width does not match the arena");
        let h = self.alloc_cube()?;
        self.cube_mut(h).copy_from_slice(cube.words());
        Ok(h)
    }

    /// Reclaims `h` if it is the most recently allocated cube.
    ///
    /// Otherwise the slot stays in place and is only marked garbage. Returns whether the
    /// slot was physically reclaimed.
    pub fn recycle_cube(&mut self, h: Handle) -> bool {
        let (page, offset) = self.check_cube(h);
        if self.flat_index(h) + 1 != self.num_cubes {
            self.set_garbage(h);
            return false;
        }
        self.cubes[page].truncate(offset);
        self.num_cubes -= 1;
        if self.cubes[page].is_empty() {
            self.cubes.pop();
        }
        true
    }

    /// Ternary data of a cube.
    pub fn cube(&self, h: Handle) -> &[u64] {
        let (page, offset) = self.check_cube(h);
        &self.cubes[page][offset + 1..offset + self.stride]
    }

    pub fn cube_mut(&mut self, h: Handle) -> &mut [u64] {
        let (page, offset) = self.check_cube(h);
        let stride = self.stride;
        &mut self.cubes[page][offset + 1..offset + stride]
    }

    /// Copies a cube out of the arena.
    pub fn to_cube(&self, h: Handle) -> Cube {
        Cube::from_words(self.cube(h), self.num_regs)
    }

    fn header(&self, h: Handle) -> u64 {
        let (page, offset) = self.check_cube(h);
        self.cubes[page][offset]
    }

    fn header_mut(&mut self, h: Handle) -> &mut u64 {
        let (page, offset) = self.check_cube(h);
        &mut self.cubes[page][offset]
    }

    fn raw_prev(&self, h: Handle) -> Handle {
        Handle::from_raw(self.header(h) as u32)
    }

    /// The cube this one was derived from (sentinel for the initial cube).
    pub fn prev(&self, h: Handle) -> Handle {
        self.raw_prev(h).unmarked()
    }

    pub fn set_prev(&mut self, h: Handle, prev: Handle) {
        let raw = prev.unmarked().with_mark_of(self.raw_prev(h)).raw();
        let header = self.header_mut(h);
        *header = (*header & !0xFFFF_FFFF) | raw as u64;
    }

    /// The next cube in the same bucket list.
    pub fn next(&self, h: Handle) -> Handle {
        Handle::from_raw((self.header(h) >> 32) as u32)
    }

    pub fn set_next(&mut self, h: Handle, next: Handle) {
        let header = self.header_mut(h);
        *header = (*header & 0xFFFF_FFFF) | ((next.raw() as u64) << 32);
    }

    pub fn is_garbage(&self, h: Handle) -> bool {
        self.raw_prev(h).is_marked()
    }

    pub fn set_garbage(&mut self, h: Handle) {
        let raw = self.raw_prev(h).marked().raw();
        let header = self.header_mut(h);
        *header = (*header & !0xFFFF_FFFF) | raw as u64;
    }

    /// Iterates over a bucket list starting at `head`.
    pub fn list(&self, head: Handle) -> ListIter<'_> {
        ListIter {
            arena: self,
            current: head,
        }
    }
}

/// Iterator over the cubes of a bucket list, garbage included.
pub struct ListIter<'a> {
    arena: &'a Arena,
    current: Handle,
}

impl Iterator for ListIter<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Self::Item> {
        let h = self.current.get()?;
        self.current = self.arena.next(h);
        Some(h)
    }
}
