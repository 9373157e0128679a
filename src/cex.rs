//! Counter-example reconstruction.
//!
//! The back-references of the target lead through states `s[k-1], ..., s[0]` to the initial
//! cube. Frames are solved newest first with one frame of the circuit:
//!
//! - frame `k-1`: registers as in `s[k-1]`, the asserted output true,
//! - frame `j < k-1`: registers as in `s[j]`, next state equal to the concrete state chosen
//!   for frame `j+1`.
//!
//! Each model gives the PI values of its frame and a concrete state inside `s[j]`, which
//! becomes the constraint of the frame before it. The state chosen for frame 0 is the initial
//! state of the trace.

use log::{debug, warn};
use thiserror::Error;

use crate::aig::Aig;
use crate::arena::Arena;
use crate::cnf::{FrameSolver, SatOutcome};
use crate::cube::{self, Ternary};
use crate::handle::Handle;

/// A concrete input sequence driving the circuit from an initial state to an asserted output.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Trace {
    /// Initial register values.
    pub init: Vec<bool>,
    /// PI values, one vector per frame.
    pub inputs: Vec<Vec<bool>>,
    /// The output asserted in the last frame.
    pub output: usize,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The frame in which the output is asserted.
    pub fn frame(&self) -> usize {
        self.inputs.len().saturating_sub(1)
    }

    /// Simulates the trace and returns the first frame asserting the output.
    pub fn replay(&self, aig: &Aig) -> Option<usize> {
        let mut regs = self.init.clone();
        for (frame, pis) in self.inputs.iter().enumerate() {
            let (outputs, next) = aig.step(pis, &regs);
            if outputs[self.output] {
                return Some(frame);
            }
            regs = next;
        }
        None
    }
}

#[derive(Debug, Error)]
pub enum CexError {
    /// A frame has no solution. `partial` holds the inputs of the later frames, oldest first.
    #[error("frame {frame} of the counter-example is unsatisfiable")]
    Unsatisfiable { frame: usize, partial: Vec<Vec<bool>> },

    #[error("SAT solver gave up on frame {frame}")]
    Unknown { frame: usize, partial: Vec<Vec<bool>> },
}

/// Derives a trace for the target cube `target`, reached with `output` asserted.
pub fn reconstruct(aig: &Aig, arena: &Arena, target: Handle, output: usize) -> Result<Trace, CexError> {
    let mut states = Vec::new();
    let mut current = arena.prev(target);
    while let Some(h) = current.get() {
        states.push(h);
        current = arena.prev(h);
    }
    let k = states.len();
    debug!("cex: reconstructing {} frames for output {}", k, output);

    let mut solver = FrameSolver::new(aig);
    let mut inputs = vec![Vec::new(); k];
    let mut next: Option<Vec<bool>> = None;
    for (i, &state) in states.iter().enumerate() {
        let frame = k - 1 - i;
        let words = arena.cube(state);
        let mut assumptions = Vec::new();
        for r in 0..aig.num_regs() {
            match cube::value(words, r) {
                Ternary::Zero => assumptions.push((aig.ro(r), false)),
                Ternary::One => assumptions.push((aig.ro(r), true)),
                Ternary::DontCare => {}
            }
        }
        match &next {
            None => assumptions.push((aig.output(output), true)),
            Some(values) => {
                for (latch, &v) in aig.latches().iter().zip(values) {
                    assumptions.push((latch.next, v));
                }
            }
        }

        match solver.solve(&assumptions) {
            SatOutcome::Sat(model) => {
                inputs[frame] = (0..aig.num_pis())
                    .map(|p| Aig::lit_value(&model, aig.pi(p)))
                    .collect();
                next = Some(
                    (0..aig.num_regs())
                        .map(|r| Aig::lit_value(&model, aig.ro(r)))
                        .collect(),
                );
            }
            SatOutcome::Unsat => {
                warn!("cex: frame {} is unsatisfiable", frame);
                return Err(CexError::Unsatisfiable {
                    frame,
                    partial: inputs[frame + 1..].to_vec(),
                });
            }
            SatOutcome::Unknown => {
                warn!("cex: solver gave up on frame {}", frame);
                return Err(CexError::Unknown {
                    frame,
                    partial: inputs[frame + 1..].to_vec(),
                });
            }
        }
    }

    Ok(Trace {
        init: next.unwrap_or_default(),
        inputs,
        output,
    })
}
