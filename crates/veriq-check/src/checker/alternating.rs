//! The alternating checker: apply circuit 1 from the left and the inverse
//! of circuit 2 from the right, keeping the running product close to the
//! identity.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use veriq_dd::DdPackage;
use veriq_ir::{Circuit, QubitId};

use crate::checker::task::{TaskManager, TaskMode};
use crate::checker::{equals_matrix, CheckerBase, CheckerKind, EquivalenceChecker};
use crate::config::{ApplicationSchemeKind, Configuration};
use crate::criterion::EquivalenceCriterion;
use crate::error::CheckResult;
use crate::scheme::{ApplicationScheme, CostProfile};

/// Keeps a single running matrix `U₁ · U₂⁻¹` and checks it stays the
/// identity.
pub struct DdAlternatingChecker {
    base: CheckerBase,
    max_nodes: usize,
}

impl DdAlternatingChecker {
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

    /// Whether the alternating strategy is applicable: the running product
    /// is only meaningful on the full space, so circuits with ancillary
    /// qubits are rejected, as are partial-equivalence checks over garbage
    /// qubits.
    pub fn can_handle(qc1: &Circuit, qc2: &Circuit, config: &Configuration) -> bool {
        if qc1.num_ancillary() > 0 || qc2.num_ancillary() > 0 {
            return false;
        }
        if config.functionality.check_partial_equivalence {
            let garbage = (0..qc1.num_qubits()).any(|q| {
                qc1.is_garbage(QubitId::from(q)) || qc2.is_garbage(QubitId::from(q))
            });
            if garbage {
                return false;
            }
        }
        true
    }

    fn execute_lookahead(
        &self,
        dd: &mut DdPackage,
        task1: &mut TaskManager,
        task2: &mut TaskManager,
        state: &mut veriq_dd::Edge,
        n: usize,
    ) -> CheckResult<()> {
        let qc1 = Arc::clone(&self.base.qc1);
        let qc2 = Arc::clone(&self.base.qc2);
        loop {
            task1.apply_swaps(&qc1);
            task2.apply_swaps(&qc2);
            if self.base.aborted() {
                return Ok(());
            }
            let have1 = !task1.finished(&qc1);
            let have2 = !task2.finished(&qc2);
            match (have1, have2) {
                (false, false) => return Ok(()),
                (true, false) => {
                    task1.finish(dd, &qc1, state)?;
                    continue;
                }
                (false, true) => {
                    task2.finish(dd, &qc2, state)?;
                    continue;
                }
                (true, true) => {}
            }

            // try both candidates, keep whichever stays smaller
            let op1 = task1.peek(&qc1).cloned().ok_or_else(|| {
                crate::error::CheckError::InvalidInput("lookahead raced past the end".into())
            })?;
            let op2 = task2.peek(&qc2).cloned().ok_or_else(|| {
                crate::error::CheckError::InvalidInput("lookahead raced past the end".into())
            })?;

            let dd1 = task1.op_to_dd(dd, &op1)?;
            let cand1 = dd.multiply_matrices(dd1, *state, n);

            let dd2 = task2.op_to_dd(dd, &op2)?;
            let inv2 = dd.conjugate_transpose(dd2, n);
            let cand2 = dd.multiply_matrices(*state, inv2, n);

            let old = *state;
            if dd.matrix_dd_size(cand1) <= dd.matrix_dd_size(cand2) {
                dd.inc_ref_matrix(cand1);
                *state = cand1;
                task1.skip_one();
            } else {
                dd.inc_ref_matrix(cand2);
                *state = cand2;
                task2.skip_one();
            }
            dd.dec_ref_matrix(old);
        }
    }
}

impl EquivalenceChecker for DdAlternatingChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Alternating
    }

    fn run(&mut self) -> CheckResult<EquivalenceCriterion> {
        let start = Instant::now();
        let qc1 = Arc::clone(&self.base.qc1);
        let qc2 = Arc::clone(&self.base.qc2);
        let config = Arc::clone(&self.base.config);
        let n = qc1.num_qubits();

        let mut dd = DdPackage::new(config.execution.numerical_tolerance);
        let mut task1 = TaskManager::new(&qc1, TaskMode::MatrixLeft);
        let mut task2 = TaskManager::new(&qc2, TaskMode::MatrixRightInverse);
        let mut state = dd.identity(n);
        dd.inc_ref_matrix(state);

        if config.application.alternating_scheme == ApplicationSchemeKind::Lookahead {
            self.execute_lookahead(&mut dd, &mut task1, &mut task2, &mut state, n)?;
        } else {
            let mut scheme = ApplicationScheme::new(
                config.application.alternating_scheme,
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
                task1.advance(&mut dd, &qc1, &mut state, a)?;
                if self.base.aborted() {
                    break;
                }
                task2.advance(&mut dd, &qc2, &mut state, b)?;
            }
            if !self.base.aborted() {
                task1.finish(&mut dd, &qc1, &mut state)?;
                task2.finish(&mut dd, &qc2, &mut state)?;
            }
        }

        if !self.base.aborted() {
            task1.change_permutation(&mut dd, &qc1, &mut state)?;
            task2.change_permutation(&mut dd, &qc2, &mut state)?;
        }

        self.base.equivalence = if self.base.aborted() {
            EquivalenceCriterion::NoInformation
        } else {
            let id = dd.identity(n);
            equals_matrix(
                &mut dd,
                state,
                id,
                n,
                config.functionality.trace_threshold,
                false,
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
