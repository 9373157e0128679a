//! CNF encoding of the combinational part of an [`Aig`] and a thin SAT solver wrapper.
//!
//! Each AIG node `n` becomes SAT variable `n`. The constant node is forced false with a unit
//! clause, and every AND gate `n = a & b` contributes the three Tseitin clauses
//!
//! ```text
//! (!n | a)   (!n | b)   (n | !a | !b)
//! ```
//!
//! PIs and register outputs are left unconstrained, so one encoding serves every time frame.
//!
//! [`ConeSolver`] encodes only the cones of a few literals, for queries on large graphs.

use std::collections::HashMap;

use log::warn;
use varisat::{CnfFormula, ExtendFormula, Solver, Var};

use crate::aig::{self, Aig, Node};

/// Result of one SAT call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SatOutcome {
    /// Satisfiable, with the value of every AIG node.
    Sat(Vec<bool>),
    Unsat,
    /// The solver gave up or failed.
    Unknown,
}

fn sat_lit(lit: aig::Lit) -> varisat::Lit {
    let var = Var::from_index(lit.node() as usize);
    if lit.is_complement() {
        varisat::Lit::negative(var)
    } else {
        varisat::Lit::positive(var)
    }
}

/// Tseitin encoding of all AND gates of `aig`.
pub fn encode(aig: &Aig) -> CnfFormula {
    let mut formula = CnfFormula::new();
    formula.add_clause(&[varisat::Lit::negative(Var::from_index(0))]);
    for id in 1..aig.num_nodes() as u32 {
        if let Node::And(a, b) = aig.node(id) {
            let n = sat_lit(aig::Lit::new(id, false));
            let (a, b) = (sat_lit(a), sat_lit(b));
            formula.add_clause(&[!n, a]);
            formula.add_clause(&[!n, b]);
            formula.add_clause(&[n, !a, !b]);
        }
    }
    formula
}

/// Incremental solver over the encoding of one frame, queried under assumptions.
pub struct FrameSolver<'a> {
    solver: Solver<'a>,
    num_nodes: usize,
    calls: usize,
}

impl FrameSolver<'_> {
    pub fn new(aig: &Aig) -> Self {
        let mut solver = Solver::new();
        solver.add_formula(&encode(aig));
        Self {
            solver,
            num_nodes: aig.num_nodes(),
            calls: 0,
        }
    }

    /// Number of SAT calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Solves with each `(lit, value)` pair assumed.
    pub fn solve(&mut self, assumptions: &[(aig::Lit, bool)]) -> SatOutcome {
        self.calls += 1;
        let lits: Vec<varisat::Lit> = assumptions
            .iter()
            .map(|&(lit, value)| if value { sat_lit(lit) } else { !sat_lit(lit) })
            .collect();
        self.solver.assume(&lits);
        match self.solver.solve() {
            Ok(true) => {
                // Variables the solver never saw default to false.
                let mut values = vec![false; self.num_nodes];
                for lit in self.solver.model().unwrap_or_default() {
                    if let Some(v) = values.get_mut(lit.var().index()) {
                        *v = lit.is_positive();
                    }
                }
                SatOutcome::Sat(values)
            }
            Ok(false) => SatOutcome::Unsat,
            Err(e) => {
                warn!("SAT solver failed: {}", e);
                SatOutcome::Unknown
            }
        }
    }
}

/// Solver over the cones of a set of root literals.
///
/// Nodes are numbered densely in the order they were collected, so the encoding stays
/// proportional to the cones rather than to the whole graph.
pub struct ConeSolver<'a> {
    solver: Solver<'a>,
    vars: HashMap<u32, Var>,
    roots: Vec<aig::Lit>,
}

impl ConeSolver<'_> {
    pub fn new(aig: &mut Aig, roots: &[aig::Lit]) -> Self {
        let cone = aig.cone(roots);
        let vars: HashMap<u32, Var> = cone
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, Var::from_index(i)))
            .collect();
        let lit = |l: aig::Lit| varisat::Lit::from_var(vars[&l.node()], !l.is_complement());

        let mut formula = CnfFormula::new();
        for &id in &cone {
            match aig.node(id) {
                Node::Const => formula.add_clause(&[varisat::Lit::negative(vars[&id])]),
                Node::And(a, b) => {
                    let n = varisat::Lit::positive(vars[&id]);
                    let (a, b) = (lit(a), lit(b));
                    formula.add_clause(&[!n, a]);
                    formula.add_clause(&[!n, b]);
                    formula.add_clause(&[n, !a, !b]);
                }
                Node::Pi(_) | Node::Ro(_) => {}
            }
        }

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        Self {
            solver,
            vars,
            roots: roots.to_vec(),
        }
    }

    fn sat_lit(&self, lit: aig::Lit) -> varisat::Lit {
        varisat::Lit::from_var(self.vars[&lit.node()], !lit.is_complement())
    }

    /// Solves with the `(root, value)` pairs assumed.
    ///
    /// A model holds the values of the roots, in the order they were given.
    pub fn solve(&mut self, assumptions: &[(aig::Lit, bool)]) -> SatOutcome {
        let lits: Vec<varisat::Lit> = assumptions
            .iter()
            .map(|&(lit, value)| if value { self.sat_lit(lit) } else { !self.sat_lit(lit) })
            .collect();
        self.solver.assume(&lits);
        match self.solver.solve() {
            Ok(true) => {
                let mut values = vec![false; self.vars.len()];
                for lit in self.solver.model().unwrap_or_default() {
                    if let Some(v) = values.get_mut(lit.var().index()) {
                        *v = lit.is_positive();
                    }
                }
                let roots = self
                    .roots
                    .iter()
                    .map(|&r| values[self.vars[&r.node()].index()] ^ r.is_complement())
                    .collect();
                SatOutcome::Sat(roots)
            }
            Ok(false) => SatOutcome::Unsat,
            Err(e) => {
                warn!("SAT solver failed: {}", e);
                SatOutcome::Unknown
            }
        }
    }
}
