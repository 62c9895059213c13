//! The construction checker: build both unitaries, compare.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use veriq_dd::DdPackage;
use veriq_ir::Circuit;

use crate::checker::task::{TaskManager, TaskMode};
use crate::checker::{equals_matrix, CheckerBase, CheckerKind, EquivalenceChecker};
use crate::config::Configuration;
use crate::criterion::EquivalenceCriterion;
use crate::error::CheckResult;
use crate::scheme::{ApplicationScheme, CostProfile};

/// Builds the full unitary of each circuit as a matrix DD and compares the
/// two results.
pub struct DdConstructionChecker {
    base: CheckerBase,
    max_nodes: usize,
}

impl DdConstructionChecker {
    /// Create the checker.
    pub fn new(
        qc1: Arc<Circuit>,
        qc2: Arc<Circuit>,
        config: Arc<Configuration>,
        profile: Arc<Option<CostProfile>>,
        abort: Arc<AtomicBool>,
    ) -> Self {
        Self {
            base: CheckerBase::new(qc1, qc2, config, profile, abort),
            max_nodes: 0,
        }
    }
}

impl EquivalenceChecker for DdConstructionChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Construction
    }

    fn run(&mut self) -> CheckResult<EquivalenceCriterion> {
        let start = Instant::now();
        let qc1 = Arc::clone(&self.base.qc1);
        let qc2 = Arc::clone(&self.base.qc2);
        let config = Arc::clone(&self.base.config);
        let n = qc1.num_qubits();

        let mut dd = DdPackage::new(config.execution.numerical_tolerance);
        let mut task1 = TaskManager::new(&qc1, TaskMode::MatrixLeft);
        let mut task2 = TaskManager::new(&qc2, TaskMode::MatrixLeft);
        let mut state1 = dd.identity(n);
        dd.inc_ref_matrix(state1);
        let mut state2 = dd.identity(n);
        dd.inc_ref_matrix(state2);

        let mut scheme = ApplicationScheme::new(
            config.application.construction_scheme,
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
            task1.advance(&mut dd, &qc1, &mut state1, a)?;
            if self.base.aborted() {
                break;
            }
            task2.advance(&mut dd, &qc2, &mut state2, b)?;
        }
        if !self.base.aborted() {
            task1.finish(&mut dd, &qc1, &mut state1)?;
            task2.finish(&mut dd, &qc2, &mut state2)?;
        }

        let garbage = self.base.garbage_union();
        let partial = config.functionality.check_partial_equivalence;
        let reduced = qc1.num_ancillary() > 0
            || qc2.num_ancillary() > 0
            || (partial && garbage.iter().any(|&g| g));

        if !self.base.aborted() {
            task1.change_permutation(&mut dd, &qc1, &mut state1)?;
            task1.reduce_ancillae(&mut dd, &qc1, &garbage, &mut state1);
            task2.change_permutation(&mut dd, &qc2, &mut state2)?;
            task2.reduce_ancillae(&mut dd, &qc2, &garbage, &mut state2);
            if partial {
                task1.reduce_garbage(&mut dd, &garbage, &mut state1);
                task2.reduce_garbage(&mut dd, &garbage, &mut state2);
            }
        }

        self.base.equivalence = if self.base.aborted() {
            EquivalenceCriterion::NoInformation
        } else {
            equals_matrix(
                &mut dd,
                state1,
                state2,
                n,
                config.functionality.trace_threshold,
                reduced,
            )
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
    use veriq_ir::QubitId;

    fn check(qc1: Circuit, qc2: Circuit) -> EquivalenceCriterion {
        let mut config = Configuration::default();
        config.execution.run_construction_checker = true;
        let mut checker = DdConstructionChecker::new(
            Arc::new(qc1),
            Arc::new(qc2),
            Arc::new(config),
            Arc::new(None),
            Arc::new(AtomicBool::new(false)),
        );
        checker.run().unwrap()
    }

    #[test]
    fn test_reflexive() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.h(QubitId(0)).unwrap();
        c.cx(QubitId(0), QubitId(1)).unwrap();
        assert_eq!(check(c.clone(), c), EquivalenceCriterion::Equivalent);
    }

    #[test]
    fn test_x_vs_z() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.x(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.z(QubitId(0)).unwrap();
        assert_eq!(check(c1, c2), EquivalenceCriterion::NotEquivalent);
    }

    #[test]
    fn test_hadamard_sandwich() {
        let mut c1 = Circuit::with_size("c1", 2, 0);
        c1.h(QubitId(0)).unwrap();
        c1.h(QubitId(1)).unwrap();
        c1.cx(QubitId(0), QubitId(1)).unwrap();
        c1.h(QubitId(0)).unwrap();
        c1.h(QubitId(1)).unwrap();

        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.cx(QubitId(1), QubitId(0)).unwrap();

        assert_eq!(check(c1, c2), EquivalenceCriterion::Equivalent);
    }

    #[test]
    fn test_global_phase_detected() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.h(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.gphase(1.0).unwrap();
        c2.h(QubitId(0)).unwrap();
        assert_eq!(
            check(c1, c2),
            EquivalenceCriterion::EquivalentUpToGlobalPhase
        );
    }

    #[test]
    fn test_aborted_checker_yields_no_information() {
        let mut c = Circuit::with_size("c", 1, 0);
        c.x(QubitId(0)).unwrap();
        let mut checker = DdConstructionChecker::new(
            Arc::new(c.clone()),
            Arc::new(c),
            Arc::new(Configuration::default()),
            Arc::new(None),
            Arc::new(AtomicBool::new(true)),
        );
        assert_eq!(
            checker.run().unwrap(),
            EquivalenceCriterion::NoInformation
        );
    }

    #[test]
    fn test_ancilla_reduced_non_equivalence_detected() {
        // the reduced comparison path must still disprove equivalence
        let mut c1 = Circuit::with_size("c1", 2, 0);
        c1.x(QubitId(0)).unwrap();
        c1.set_ancillary(QubitId(1));

        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.h(QubitId(0)).unwrap();
        c2.set_ancillary(QubitId(1));

        assert_eq!(check(c1, c2), EquivalenceCriterion::NotEquivalent);
    }

    #[test]
    fn test_ancilla_reset_pattern() {
        // X on an ancillary garbage qubit vs an idle ancillary qubit
        let mut c1 = Circuit::with_size("c1", 2, 0);
        c1.h(QubitId(0)).unwrap();
        c1.x(QubitId(1)).unwrap();
        c1.set_ancillary(QubitId(1));
        c1.set_garbage(QubitId(1));

        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.h(QubitId(0)).unwrap();
        c2.set_ancillary(QubitId(1));
        c2.set_garbage(QubitId(1));

        assert_eq!(check(c1, c2), EquivalenceCriterion::Equivalent);
    }
}
