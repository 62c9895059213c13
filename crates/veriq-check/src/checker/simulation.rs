//! The simulation checker: apply both circuits to a random input state and
//! compare the two output vectors.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use veriq_dd::{DdPackage, Edge};
use veriq_ir::Circuit;

use crate::checker::task::{TaskManager, TaskMode};
use crate::checker::{equals_vector, CheckerBase, CheckerKind, EquivalenceChecker};
use crate::config::Configuration;
use crate::criterion::EquivalenceCriterion;
use crate::error::CheckResult;
use crate::scheme::{ApplicationScheme, CostProfile};
use crate::stimulus::Stimulus;

/// A counterexample held by the checker that produced it. The edges stay
/// valid for as long as the checker (and with it the DD package) lives.
pub struct Counterexample {
    /// The stimulus that exposed the difference.
    pub input: Edge,
    /// Circuit 1's output.
    pub output1: Edge,
    /// Circuit 2's output.
    pub output2: Edge,
    /// The overlap ⟨output1|output2⟩.
    pub fidelity: f64,
}

/// Simulates both circuits on one stimulus.
pub struct DdSimulationChecker {
    base: CheckerBase,
    dd: DdPackage,
    stimulus: Stimulus,
    counterexample: Option<Counterexample>,
    max_nodes: usize,
}

impl DdSimulationChecker {
    /// Create the checker for one stimulus.
    pub fn new(
        qc1: Arc<Circuit>,
        qc2: Arc<Circuit>,
        config: Arc<Configuration>,
        profile: Arc<Option<CostProfile>>,
        abort: Arc<AtomicBool>,
        stimulus: Stimulus,
    ) -> Self {
        let tolerance = config.execution.numerical_tolerance;
        Self {
            base: CheckerBase::new(qc1, qc2, config, profile, abort),
            dd: DdPackage::new(tolerance),
            stimulus,
            counterexample: None,
            max_nodes: 0,
        }
    }

    /// The stimulus this checker simulates.
    pub fn stimulus(&self) -> &Stimulus {
        &self.stimulus
    }

    /// The counterexample, if the run proved non-equivalence.
    pub fn counterexample(&self) -> Option<&Counterexample> {
        self.counterexample.as_ref()
    }

    /// The package owning the counterexample's decision diagrams.
    pub fn package(&self) -> &DdPackage {
        &self.dd
    }
}

impl EquivalenceChecker for DdSimulationChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Simulation
    }

    fn run(&mut self) -> CheckResult<EquivalenceCriterion> {
        let start = Instant::now();
        let qc1 = Arc::clone(&self.base.qc1);
        let qc2 = Arc::clone(&self.base.qc2);
        let config = Arc::clone(&self.base.config);
        let n = qc1.num_qubits();
        let dd = &mut self.dd;

        let input = self.stimulus.materialize(dd)?;
        dd.inc_ref_vector(input);
        let mut state1 = input;
        dd.inc_ref_vector(state1);
        let mut state2 = input;
        dd.inc_ref_vector(state2);

        let mut task1 = TaskManager::new(&qc1, TaskMode::Vector);
        let mut task2 = TaskManager::new(&qc2, TaskMode::Vector);
        let mut scheme = ApplicationScheme::new(
            config.application.simulation_scheme,
            qc1.ops.len(),
            qc2.ops.len(),
            self.base.profile.as_ref().as_ref(),
            config.application.cost_function.as_ref(),
        )?;

        while !task1.finished(&qc1) && !task2.finished(&qc2) && !self.base.aborted() {
            task1.apply_swaps(&qc1);
            task2.apply_swaps(&qc2);
            if task1.finished(&qc1) || task2.finished(&qc2) || self.base.aborted() {
                break;
            }
            let (a, b) = scheme.next(
                task1.remaining(&qc1),
                task2.remaining(&qc2),
                task1.peek(&qc1),
            );
            task1.advance(dd, &qc1, &mut state1, a)?;
            if self.base.aborted() {
                break;
            }
            task2.advance(dd, &qc2, &mut state2, b)?;
        }
        if !self.base.aborted() {
            task1.finish(dd, &qc1, &mut state1)?;
            task2.finish(dd, &qc2, &mut state2)?;
        }

        let garbage = self.base.garbage_union();
        if !self.base.aborted() {
            task1.change_permutation(dd, &qc1, &mut state1)?;
            task1.reduce_ancillae(dd, &qc1, &garbage, &mut state1);
            task2.change_permutation(dd, &qc2, &mut state2)?;
            task2.reduce_ancillae(dd, &qc2, &garbage, &mut state2);
            if config.functionality.check_partial_equivalence {
                task1.reduce_garbage(dd, &garbage, &mut state1);
                task2.reduce_garbage(dd, &garbage, &mut state2);
            }
        }

        self.base.equivalence = if self.base.aborted() {
            EquivalenceCriterion::NoInformation
        } else {
            let (criterion, overlap) = equals_vector(
                dd,
                state1,
                state2,
                n,
                config.simulation.fidelity_threshold,
            );
            if criterion == EquivalenceCriterion::NotEquivalent {
                self.counterexample = Some(Counterexample {
                    input,
                    output1: state1,
                    output2: state2,
                    fidelity: overlap.norm_sqr(),
                });
            }
            criterion
        };

        self.max_nodes = dd.peak_nodes();
        self.base.runtime += start.elapsed().as_secs_f64();
        Ok(self.base.equivalence)
    }

    fn equivalence(&self) -> EquivalenceCriterion {
        self.base.equivalence
    }

    fn record(&self) -> serde_json::Value {
        json!({
            "checker": self.kind().as_str(),
            "equivalence": self.base.equivalence.as_str(),
            "runtime": self.base.runtime,
            "max_nodes": self.max_nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateKind;
    use crate::stimulus::StateGenerator;
    use approx::assert_abs_diff_eq;
    use veriq_ir::QubitId;

    fn run_once(qc1: Circuit, qc2: Circuit, stimulus: Stimulus) -> DdSimulationChecker {
        let mut checker = DdSimulationChecker::new(
            Arc::new(qc1),
            Arc::new(qc2),
            Arc::new(Configuration::default()),
            Arc::new(None),
            Arc::new(AtomicBool::new(false)),
            stimulus,
        );
        checker.run().unwrap();
        checker
    }

    #[test]
    fn test_equivalent_on_stimulus() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.h(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.h(QubitId(0)).unwrap();
        c2.z(QubitId(0)).unwrap();
        c2.z(QubitId(0)).unwrap();

        let checker = run_once(c1, c2, Stimulus::ComputationalBasis(vec![true]));
        assert_eq!(checker.equivalence(), EquivalenceCriterion::Equivalent);
        assert!(checker.counterexample().is_none());
    }

    #[test]
    fn test_counterexample_for_x_vs_z() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.x(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.z(QubitId(0)).unwrap();

        let checker = run_once(c1, c2, Stimulus::ComputationalBasis(vec![false]));
        assert_eq!(checker.equivalence(), EquivalenceCriterion::NotEquivalent);
        let cex = checker.counterexample().expect("counterexample recorded");
        assert_abs_diff_eq!(cex.fidelity, 0.0, epsilon = 1e-9);

        // outputs are |1⟩ and |0⟩
        let dd = checker.package();
        assert_abs_diff_eq!(dd.amplitude(cex.output1, &[true]).re, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dd.amplitude(cex.output2, &[false]).re, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_phase_difference_on_stimulus() {
        // S and Sdg agree on |0⟩/|1⟩ up to a phase on |1⟩
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.s(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.sdg(QubitId(0)).unwrap();

        let checker = run_once(c1, c2, Stimulus::ComputationalBasis(vec![true]));
        assert_eq!(
            checker.equivalence(),
            EquivalenceCriterion::EquivalentUpToPhase
        );
    }

    #[test]
    fn test_stabilizer_stimulus_round() {
        let mut gen = StateGenerator::new(123);
        let stim = gen.generate(StateKind::Stabilizer, 2, 0);
        let mut c1 = Circuit::with_size("c1", 2, 0);
        c1.cx(QubitId(0), QubitId(1)).unwrap();
        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.cx(QubitId(0), QubitId(1)).unwrap();
        let checker = run_once(c1, c2, stim);
        assert_eq!(checker.equivalence(), EquivalenceCriterion::Equivalent);
    }
}
