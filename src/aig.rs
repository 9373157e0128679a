//! Sequential AND-inverter graphs.
//!
//! Node 0 is the constant-false node. Every other node is a primary input (PI), a register
//! output (RO), or a two-input AND gate whose fanins were created before it, so node order is
//! a topological order. Combinational inputs (CIs) are numbered PIs first, then ROs.
//!
//! AND gates are structurally hashed: building the same gate twice returns the same literal.

use std::fmt::{Debug, Display, Formatter};
use std::ops::Not;

use crate::table::Table;

/// A possibly complemented reference to a node.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Lit(u32);

// Constructors
impl Lit {
    pub const FALSE: Lit = Lit(0);
    pub const TRUE: Lit = Lit(1);

    pub const fn new(node: u32, complement: bool) -> Self {
        Self(node << 1 | complement as u32)
    }

    /// Literal in AIGER encoding (`2 * node + complement`).
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

// Getters
impl Lit {
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn node(self) -> u32 {
        self.0 >> 1
    }

    pub const fn is_complement(self) -> bool {
        self.0 & 1 != 0
    }

    pub const fn is_const(self) -> bool {
        self.node() == 0
    }

    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }

    pub const fn const_value(self) -> Option<bool> {
        if self.is_const() {
            Some(self.is_complement())
        } else {
            None
        }
    }
}

impl From<bool> for Lit {
    fn from(b: bool) -> Self {
        if b {
            Lit::TRUE
        } else {
            Lit::FALSE
        }
    }
}

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(b) = self.const_value() {
            return write!(f, "{}", b as u8);
        }
        if self.is_complement() {
            write!(f, "!")?;
        }
        write!(f, "n{}", self.node())
    }
}

impl Debug for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Node {
    Const,
    /// Primary input with its index.
    Pi(u32),
    /// Register output with its register index.
    Ro(u32),
    And(Lit, Lit),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Latch {
    /// The register output node.
    pub node: u32,
    /// Next-state function (the register input).
    pub next: Lit,
    /// Initial value; `None` for an uninitialised register.
    pub init: Option<bool>,
}

pub struct Aig {
    nodes: Vec<Node>,
    strash: Table,
    pis: Vec<u32>,
    latches: Vec<Latch>,
    outputs: Vec<Lit>,

    trav_ids: Vec<u32>,
    trav_id: u32,
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Aig {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Const],
            strash: Table::default(),
            pis: Vec::new(),
            latches: Vec::new(),
            outputs: Vec::new(),
            trav_ids: Vec::new(),
            trav_id: 0,
        }
    }

    /// A combinational graph with `num_inputs` PIs and nothing else.
    pub fn with_inputs(num_inputs: usize) -> Self {
        let mut aig = Self::new();
        for _ in 0..num_inputs {
            aig.add_input();
        }
        aig
    }

    fn push(&mut self, node: Node) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(node);
        id
    }

    pub fn add_input(&mut self) -> Lit {
        let id = self.push(Node::Pi(self.pis.len() as u32));
        self.pis.push(id);
        Lit::new(id, false)
    }

    /// Adds a register and returns its output literal. The next-state function is constant
    /// false until [`Aig::set_next`] is called.
    pub fn add_latch(&mut self, init: Option<bool>) -> Lit {
        let id = self.push(Node::Ro(self.latches.len() as u32));
        self.latches.push(Latch {
            node: id,
            next: Lit::FALSE,
            init,
        });
        Lit::new(id, false)
    }

    pub fn set_next(&mut self, reg: usize, next: Lit) {
        assert!(
            (next.node() as usize) < self.nodes.len(),
            "Next-state literal {} refers to a missing node",
            next
        );
        self.latches[reg].next = next;
    }

    pub fn add_output(&mut self, lit: Lit) -> usize {
        assert!(
            (lit.node() as usize) < self.nodes.len(),
            "Output literal {} refers to a missing node",
            lit
        );
        self.outputs.push(lit);
        self.outputs.len() - 1
    }

    pub fn and(&mut self, a: Lit, b: Lit) -> Lit {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        if a == Lit::FALSE || a == !b {
            return Lit::FALSE;
        }
        if a == Lit::TRUE || a == b {
            return b;
        }
        let key = (a.raw(), b.raw());
        if let Some(id) = self.strash.get(key) {
            return Lit::new(id, false);
        }
        let id = self.push(Node::And(a, b));
        self.strash.insert(key, id);
        Lit::new(id, false)
    }

    pub fn or(&mut self, a: Lit, b: Lit) -> Lit {
        !self.and(!a, !b)
    }

    pub fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        let x = self.and(a, !b);
        let y = self.and(!a, b);
        self.or(x, y)
    }

    /// `if s then t else e`
    pub fn mux(&mut self, s: Lit, t: Lit, e: Lit) -> Lit {
        let x = self.and(s, t);
        let y = self.and(!s, e);
        self.or(x, y)
    }
}

// Getters
impl Aig {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
    pub fn num_ands(&self) -> usize {
        self.strash.len()
    }
    pub fn num_pis(&self) -> usize {
        self.pis.len()
    }
    pub fn num_regs(&self) -> usize {
        self.latches.len()
    }
    pub fn num_cis(&self) -> usize {
        self.num_pis() + self.num_regs()
    }
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn node(&self, id: u32) -> Node {
        self.nodes[id as usize]
    }

    pub fn pi(&self, i: usize) -> Lit {
        Lit::new(self.pis[i], false)
    }

    pub fn ro(&self, reg: usize) -> Lit {
        Lit::new(self.latches[reg].node, false)
    }

    /// Combinational input `k`: PIs first, then register outputs.
    pub fn ci(&self, k: usize) -> Lit {
        if k < self.num_pis() {
            self.pi(k)
        } else {
            self.ro(k - self.num_pis())
        }
    }

    /// Combinational input number of node `id`, if it is one.
    pub fn ci_index(&self, id: u32) -> Option<usize> {
        match self.node(id) {
            Node::Pi(i) => Some(i as usize),
            Node::Ro(r) => Some(self.num_pis() + r as usize),
            _ => None,
        }
    }

    pub fn latches(&self) -> &[Latch] {
        &self.latches
    }

    pub fn outputs(&self) -> &[Lit] {
        &self.outputs
    }

    pub fn output(&self, i: usize) -> Lit {
        self.outputs[i]
    }
}

// Traversal
impl Aig {
    /// Starts a new traversal; every node becomes unvisited.
    pub fn increment_trav_id(&mut self) {
        self.trav_ids.resize(self.nodes.len(), 0);
        self.trav_id += 1;
    }

    pub fn is_visited(&self, id: u32) -> bool {
        self.trav_ids
            .get(id as usize)
            .is_some_and(|&t| t == self.trav_id)
    }

    pub fn set_visited(&mut self, id: u32) {
        let id = id as usize;
        if id >= self.trav_ids.len() {
            self.trav_ids.resize(self.nodes.len(), 0);
        }
        self.trav_ids[id] = self.trav_id;
    }

    /// Appends the CIs in the cone of `lit` not yet visited in the current traversal.
    pub fn collect_cis(&mut self, lit: Lit, cis: &mut Vec<usize>) {
        let mut stack = vec![lit.node()];
        while let Some(id) = stack.pop() {
            if self.is_visited(id) {
                continue;
            }
            self.set_visited(id);
            match self.node(id) {
                Node::Const => {}
                Node::Pi(_) | Node::Ro(_) => cis.extend(self.ci_index(id)),
                Node::And(a, b) => {
                    stack.push(a.node());
                    stack.push(b.node());
                }
            }
        }
    }

    /// CIs in the cone of `lit`, in increasing order.
    pub fn support(&mut self, lit: Lit) -> Vec<usize> {
        self.increment_trav_id();
        let mut cis = Vec::new();
        self.collect_cis(lit, &mut cis);
        cis.sort_unstable();
        cis
    }

    /// Nodes in the cones of `roots`, leaves and the constant node included.
    pub fn cone(&mut self, roots: &[Lit]) -> Vec<u32> {
        self.increment_trav_id();
        let mut nodes = Vec::new();
        let mut stack: Vec<u32> = roots.iter().map(|lit| lit.node()).collect();
        while let Some(id) = stack.pop() {
            if self.is_visited(id) {
                continue;
            }
            self.set_visited(id);
            nodes.push(id);
            if let Node::And(a, b) = self.node(id) {
                stack.push(a.node());
                stack.push(b.node());
            }
        }
        nodes
    }

    /// AND nodes depending on node `id`, in topological order.
    pub fn transitive_fanout(&self, id: u32) -> Vec<u32> {
        let mut marked = vec![false; self.nodes.len()];
        marked[id as usize] = true;
        let mut result = Vec::new();
        for n in id + 1..self.nodes.len() as u32 {
            if let Node::And(a, b) = self.node(n) {
                if marked[a.node() as usize] || marked[b.node() as usize] {
                    marked[n as usize] = true;
                    result.push(n);
                }
            }
        }
        result
    }
}

// Simulation
impl Aig {
    /// Values of all nodes under the given PI and register values.
    pub fn eval(&self, pis: &[bool], regs: &[bool]) -> Vec<bool> {
        assert_eq!(pis.len(), self.num_pis(), "Wrong number of input values");
        assert_eq!(regs.len(), self.num_regs(), "Wrong number of register values");
        let mut values = vec![false; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            values[id] = match *node {
                Node::Const => false,
                Node::Pi(i) => pis[i as usize],
                Node::Ro(r) => regs[r as usize],
                Node::And(a, b) => Self::lit_value(&values, a) && Self::lit_value(&values, b),
            };
        }
        values
    }

    pub fn lit_value(values: &[bool], lit: Lit) -> bool {
        values[lit.node() as usize] ^ lit.is_complement()
    }

    /// One clock cycle: returns the output values and the next register values.
    pub fn step(&self, pis: &[bool], regs: &[bool]) -> (Vec<bool>, Vec<bool>) {
        let values = self.eval(pis, regs);
        let outputs = self.outputs.iter().map(|&o| Self::lit_value(&values, o)).collect();
        let next = self
            .latches
            .iter()
            .map(|l| Self::lit_value(&values, l.next))
            .collect();
        (outputs, next)
    }
}
