//! VERIQ — quantum circuit equivalence checking.
//!
//! Decides whether two circuits implement the same operator (possibly up
//! to a global phase) or the same measurement distributions on non-garbage
//! qubits. Orchestrates complementary strategies: three decision-diagram
//! checkers (construction, alternating, simulation) and a ZX-rewriting
//! checker, raced sequentially or in parallel workers under an optional
//! wall-clock budget.
//!
//! # Example
//!
//! ```rust
//! use veriq_check::{Configuration, EquivalenceCheckingManager};
//! use veriq_ir::{Circuit, QubitId};
//!
//! // (H ⊗ H) · CX · (H ⊗ H) reverses the direction of a CNOT
//! let mut c1 = Circuit::with_size("sandwich", 2, 0);
//! c1.h(QubitId(0)).unwrap();
//! c1.h(QubitId(1)).unwrap();
//! c1.cx(QubitId(0), QubitId(1)).unwrap();
//! c1.h(QubitId(0)).unwrap();
//! c1.h(QubitId(1)).unwrap();
//!
//! let mut c2 = Circuit::with_size("reversed", 2, 0);
//! c2.cx(QubitId(1), QubitId(0)).unwrap();
//!
//! let mut config = Configuration::default();
//! config.execution.parallel = false;
//! config.simulation.seed = 42;
//!
//! let mut manager = EquivalenceCheckingManager::new(c1, c2, config).unwrap();
//! manager.run().unwrap();
//! assert!(manager.equivalence().considered_equivalent());
//! ```

pub mod checker;
pub mod config;
pub mod criterion;
pub mod error;
pub mod executor;
pub mod manager;
pub mod preprocess;
pub mod scheme;
pub mod stimulus;

pub use checker::{CheckerKind, EquivalenceChecker};
pub use config::{ApplicationSchemeKind, Configuration, CostFunction, StateKind};
pub use criterion::EquivalenceCriterion;
pub use error::{CheckError, CheckResult, ExceptionKind};
pub use executor::{Executor, WorkerResult};
pub use manager::{EquivalenceCheckingManager, Results};
pub use scheme::{ApplicationScheme, CostProfile};
pub use stimulus::{StateGenerator, Stimulus};
