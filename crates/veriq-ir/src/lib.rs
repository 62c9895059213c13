//! VERIQ circuit intermediate representation.
//!
//! This crate provides the data structures the equivalence-checking engine
//! operates on: sequence-based circuits with layout bookkeeping, standard
//! gates with symbolic parameters, and partial qubit permutations.
//!
//! # Example: building a Bell pair
//!
//! ```rust
//! use veriq_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 0);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert!(circuit.is_variable_free());
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod operation;
pub mod parameter;
pub mod permutation;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{Matrix2, StandardGate};
pub use operation::{ClassicalCondition, Control, ControlPolarity, Operation, OperationKind};
pub use parameter::Parameter;
pub use permutation::Permutation;
pub use qubit::{ClbitId, QubitId};
