//! VERIQ ZX-diagram rewriting backend.
//!
//! A compact ZX-calculus engine for the graph-rewrite equivalence checker:
//! diagrams with Z/X-spiders and normal/Hadamard wires, the standard
//! simplification rules (spider fusion, identity removal, local
//! complementation, pivoting, phase-gadget fusion), circuit-to-diagram
//! construction, diagram inversion/concatenation for miter building, and
//! Clifford phase approximation under a tolerance.

pub mod construction;
pub mod diagram;
pub mod error;
pub mod rules;
pub mod scalar;
pub mod simplify;

pub use construction::{rational_half_turns, Construction};
pub use diagram::{Diagram, EType, VData, VType, V};
pub use error::{ZxError, ZxResult};
pub use scalar::Scalar;
pub use simplify::{clifford_simp, full_reduce, interior_clifford_simp};
