//! VERIQ decision-diagram package.
//!
//! Canonical vector and matrix decision diagrams with weighted edges,
//! hash-consed nodes, tolerance-aware weight interning, explicit reference
//! counting and the arithmetic the equivalence-checking engine needs:
//! basis-state and gate construction, multiplication, conjugate transpose,
//! inner products, identity proximity, and ancillary/garbage reductions.
//!
//! # Example
//!
//! ```rust
//! use veriq_dd::DdPackage;
//! use num_complex::Complex64;
//!
//! let mut dd = DdPackage::new(2e-13);
//! let s = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
//! let h = dd.make_gate(1, [s, s, s, -s], 0, &[]).unwrap();
//! let hh = dd.multiply_matrices(h, h, 1);
//! assert!(dd.is_close_to_identity(hh, 1, 1e-8));
//! ```

pub mod error;
pub mod package;
pub mod weights;

pub use error::{DdError, DdResult};
pub use package::{DdPackage, Edge, NodeId, OneQubitBasis, TERMINAL, ZERO_EDGE};
pub use weights::{WeightId, WeightTable, W_ONE, W_ZERO};
