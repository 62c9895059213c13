//! Engine configuration.
//!
//! Options mirror the groups a caller can set: execution, preprocessor
//! optimizations, application schemes, functionality, simulation, and
//! parameterized checks. Every field has a default so partial
//! deserialization works.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Application scheme selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSchemeKind {
    /// Apply all of circuit 1, then all of circuit 2.
    Sequential,
    /// Alternate one operation per circuit.
    OneToOne,
    /// Balance by total operation counts.
    Proportional,
    /// Balance by per-gate cost.
    GateCost,
    /// Try both next operations, keep the smaller diagram (alternating
    /// checker only).
    Lookahead,
}

/// Stimulus family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Random computational basis states.
    ComputationalBasis,
    /// Random products of the six one-qubit basis states.
    OneQubitBasis,
    /// Random stabilizer states.
    Stabilizer,
}

/// A caller-supplied gate cost function `(gate name, control count) → cost`.
#[derive(Clone)]
pub struct CostFunction(pub Arc<dyn Fn(&str, usize) -> usize + Send + Sync>);

impl fmt::Debug for CostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CostFunction(..)")
    }
}

/// Execution options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Run checkers in parallel workers.
    pub parallel: bool,
    /// Maximum number of concurrent workers.
    pub nthreads: usize,
    /// Wall-clock budget in seconds; 0 disables the timeout.
    pub timeout_seconds: f64,
    /// Enable the construction checker.
    pub run_construction_checker: bool,
    /// Enable the simulation checker.
    pub run_simulation_checker: bool,
    /// Enable the alternating checker.
    pub run_alternating_checker: bool,
    /// Enable the graph-rewrite checker.
    pub run_graph_rewrite_checker: bool,
    /// Numerical tolerance of the DD package.
    pub numerical_tolerance: f64,
    /// Treat every ancillary qubit as garbage.
    pub set_all_ancillae_garbage: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            nthreads: std::thread::available_parallelism().map_or(2, usize::from),
            timeout_seconds: 0.0,
            run_construction_checker: false,
            run_simulation_checker: true,
            run_alternating_checker: true,
            run_graph_rewrite_checker: false,
            numerical_tolerance: 2e-13,
            set_all_ancillae_garbage: false,
        }
    }
}

/// Preprocessor toggles, in pipeline order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationOptions {
    /// Rewrite resets and mid-circuit measurements into unitaries.
    pub transform_dynamic_circuit: bool,
    /// Reconstruct SWAP gates from CNOT patterns.
    pub reconstruct_swaps: bool,
    /// Push the output permutation back to the initial layout.
    pub backpropagate_output_permutation: bool,
    /// Remove SWAPs by re-indexing subsequent operations.
    pub elide_permutations: bool,
    /// Fuse runs of single-qubit gates into compound operations.
    pub fuse_single_qubit_gates: bool,
    /// Drop diagonal gates immediately before measurements.
    pub remove_diagonal_gates_before_measure: bool,
    /// Reorder operations into a canonical dependency order.
    pub reorder_operations: bool,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            transform_dynamic_circuit: true,
            reconstruct_swaps: true,
            backpropagate_output_permutation: false,
            elide_permutations: true,
            fuse_single_qubit_gates: true,
            remove_diagonal_gates_before_measure: false,
            reorder_operations: true,
        }
    }
}

/// Application-scheme options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationOptions {
    /// Scheme of the construction checker.
    pub construction_scheme: ApplicationSchemeKind,
    /// Scheme of the simulation checker.
    pub simulation_scheme: ApplicationSchemeKind,
    /// Scheme of the alternating checker.
    pub alternating_scheme: ApplicationSchemeKind,
    /// Path of a gate-cost profile file.
    pub profile_path: Option<String>,
    /// Caller-supplied cost function; overrides the profile.
    #[serde(skip)]
    pub cost_function: Option<CostFunction>,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            construction_scheme: ApplicationSchemeKind::Proportional,
            simulation_scheme: ApplicationSchemeKind::Proportional,
            alternating_scheme: ApplicationSchemeKind::Proportional,
            profile_path: None,
            cost_function: None,
        }
    }
}

/// Functionality options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionalityOptions {
    /// Threshold of the identity-proximity test.
    pub trace_threshold: f64,
    /// Compare only measurement distributions on non-garbage qubits.
    pub check_partial_equivalence: bool,
}

impl Default for FunctionalityOptions {
    fn default() -> Self {
        Self {
            trace_threshold: 1e-8,
            check_partial_equivalence: false,
        }
    }
}

/// Simulation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Fidelity threshold of the vector comparison.
    pub fidelity_threshold: f64,
    /// Maximum number of simulations.
    pub max_sims: usize,
    /// Stimulus family.
    pub state_type: StateKind,
    /// PRNG seed; 0 seeds from entropy.
    pub seed: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        let nthreads = std::thread::available_parallelism().map_or(2, usize::from);
        Self {
            fidelity_threshold: 1e-8,
            max_sims: 16.max(nthreads.saturating_sub(2)),
            state_type: StateKind::ComputationalBasis,
            seed: 0,
        }
    }
}

/// Parameterized-circuit options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterizedOptions {
    /// Tolerance for snapping instantiated angles.
    pub parameterized_tolerance: f64,
    /// Extra random instantiations beyond the first special one.
    pub additional_instantiations: usize,
}

impl Default for ParameterizedOptions {
    fn default() -> Self {
        Self {
            parameterized_tolerance: 1e-12,
            additional_instantiations: 0,
        }
    }
}

/// The complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Execution options.
    pub execution: ExecutionOptions,
    /// Preprocessor toggles.
    pub optimizations: OptimizationOptions,
    /// Application-scheme options.
    pub application: ApplicationOptions,
    /// Functionality options.
    pub functionality: FunctionalityOptions,
    /// Simulation options.
    pub simulation: SimulationOptions,
    /// Parameterized-circuit options.
    pub parameterized: ParameterizedOptions,
}

impl Configuration {
    /// Whether any checker is enabled.
    pub fn anything_to_execute(&self) -> bool {
        let e = &self.execution;
        e.run_construction_checker
            || e.run_simulation_checker
            || e.run_alternating_checker
            || e.run_graph_rewrite_checker
    }

    /// Whether at most one unit of work is configured, in which case the
    /// parallel executor adds nothing.
    pub fn only_single_task(&self) -> bool {
        let e = &self.execution;
        let mut tasks = 0usize;
        if e.run_construction_checker {
            tasks += 1;
        }
        if e.run_alternating_checker {
            tasks += 1;
        }
        if e.run_graph_rewrite_checker {
            tasks += 1;
        }
        if e.run_simulation_checker {
            tasks += self.simulation.max_sims;
        }
        tasks <= 1
    }

    /// Whether the simulation checker is the only one configured.
    pub fn only_simulation_checker_configured(&self) -> bool {
        let e = &self.execution;
        e.run_simulation_checker
            && !e.run_construction_checker
            && !e.run_alternating_checker
            && !e.run_graph_rewrite_checker
    }

    /// Whether the graph-rewrite checker is the only one configured.
    pub fn only_graph_rewrite_checker_configured(&self) -> bool {
        let e = &self.execution;
        e.run_graph_rewrite_checker
            && !e.run_construction_checker
            && !e.run_alternating_checker
            && !e.run_simulation_checker
    }

    /// Set the same application scheme for every checker that takes one.
    pub fn set_application_scheme(&mut self, scheme: ApplicationSchemeKind) {
        self.application.construction_scheme = scheme;
        self.application.simulation_scheme = scheme;
        self.application.alternating_scheme = scheme;
    }

    /// Select the gate-cost scheme everywhere with a profile file.
    pub fn set_gate_cost_profile(&mut self, path: impl Into<String>) {
        self.set_application_scheme(ApplicationSchemeKind::GateCost);
        self.application.profile_path = Some(path.into());
    }

    /// Select the gate-cost scheme everywhere with a cost function.
    pub fn set_gate_cost_function(&mut self, f: CostFunction) {
        self.set_application_scheme(ApplicationSchemeKind::GateCost);
        self.application.cost_function = Some(f);
    }

    /// Disable every checker.
    pub fn disable_all_checkers(&mut self) {
        self.execution.run_construction_checker = false;
        self.execution.run_simulation_checker = false;
        self.execution.run_alternating_checker = false;
        self.execution.run_graph_rewrite_checker = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Configuration::default();
        assert!(c.execution.run_simulation_checker);
        assert!(c.execution.run_alternating_checker);
        assert!(!c.execution.run_construction_checker);
        assert!(c.anything_to_execute());
        assert!(c.simulation.max_sims >= 16);
        assert_eq!(c.execution.numerical_tolerance, 2e-13);
    }

    #[test]
    fn test_only_simulation() {
        let mut c = Configuration::default();
        c.disable_all_checkers();
        assert!(!c.anything_to_execute());
        c.execution.run_simulation_checker = true;
        assert!(c.only_simulation_checker_configured());
    }

    #[test]
    fn test_partial_deserialization() {
        let c: Configuration =
            serde_json::from_str(r#"{"execution": {"parallel": false}}"#).unwrap();
        assert!(!c.execution.parallel);
        assert!(c.execution.run_alternating_checker);
    }

    #[test]
    fn test_scheme_serde() {
        let s = serde_json::to_string(&ApplicationSchemeKind::OneToOne).unwrap();
        assert_eq!(s, "\"one_to_one\"");
    }
}
