//! # era-rs: Explicit-state Reachability Analysis in Rust
//!
//! **`era-rs`** computes the reachable states of a sequential AND-inverter graph (AIG).
//! Instead of enumerating concrete states one by one, it works with **ternary state cubes**:
//! assignments of `0`, `1` or `-` (don't-care) to every register, each standing for a whole
//! set of concrete states.
//!
//! ## How it works
//!
//! Starting from the initial cube, every discovered cube is expanded in discovery order.
//! The [`Enumerator`][crate::enumerate::Enumerator] cofactors the transition relation on the
//! primary inputs and the current-state registers until every next-state function becomes a
//! constant or a plain input, which yields one successor cube per leaf.
//! Each successor is offered to the [`CubeIndex`][crate::index::CubeIndex]:
//!
//! - a successor covered by an earlier cube is rejected,
//! - a successor covering earlier cubes marks them as garbage,
//! - a successor that overlaps an earlier cube on a single register is *sharped* to become
//!   disjoint from it.
//!
//! The run ends when no new cube appears, when a watched output is asserted (a *bad state*),
//! or when a resource ceiling is hit.
//! For bad states, a concrete counter-example is recovered by solving one frame of the
//! circuit per step with a SAT solver (see [`cex`]).
//!
//! ## Basic Usage
//!
//! ```rust
//! use era_rs::aig::Aig;
//! use era_rs::config::EraConfig;
//! use era_rs::reach::{explore, ReachStatus};
//!
//! // 1. Build a 2-bit counter that increments while `en` is high
//! let mut aig = Aig::new();
//! let en = aig.add_input();
//! let r0 = aig.add_latch(Some(false));
//! let r1 = aig.add_latch(Some(false));
//! let n0 = aig.xor(r0, en);
//! let carry = aig.and(r0, en);
//! let n1 = aig.xor(r1, carry);
//! aig.set_next(0, n0);
//! aig.set_next(1, n1);
//!
//! // 2. Watch the state `11`
//! let bad = aig.and(r0, r1);
//! aig.add_output(bad);
//!
//! // 3. Explore
//! let config = EraConfig::default().with_pages(8, 16);
//! let result = explore(&aig, &config).unwrap();
//!
//! // 4. Inspect the counter-example
//! match result.status {
//!     ReachStatus::BadState { output, trace } => {
//!         let trace = trace.unwrap();
//!         assert_eq!(output, 0);
//!         assert_eq!(trace.replay(&aig), Some(trace.frame()));
//!     }
//!     other => panic!("unexpected status: {:?}", other),
//! }
//! ```
//!
//! ## Core Components
//!
//! - **[`reach`]**: The exploration driver, [`Explorer`][crate::reach::Explorer].
//! - **[`index`]**: The cube index with containment checks and sharping.
//! - **[`enumerate`]**: Successor enumeration by cofactoring.
//! - **[`arena`]**: Paged storage for cubes and index nodes, addressed by [`Handle`][crate::handle::Handle]s.
//! - **[`cex`]**: Counter-example reconstruction.
//! - **[`aiger`]**: Reading circuits in the ASCII AIGER format.
//! - **[`dot`]**: Visualizing the cube index with Graphviz.

pub mod aig;
pub mod aiger;
pub mod arena;
pub mod bitset;
pub mod cex;
pub mod cnf;
pub mod config;
pub mod cube;
pub mod dot;
pub mod enumerate;
pub mod handle;
pub mod index;
pub mod reach;
pub mod stats;
pub mod table;
