//! Per-circuit task state for the DD checkers.
//!
//! A task manager tracks a cursor into one circuit's operation sequence and
//! the permutation carried along with it. Operations are turned into matrix
//! DDs at the permuted levels and applied to a state owned by the checker;
//! SWAP operations only permute the carried layout.

use num_complex::Complex64;

use veriq_dd::{DdPackage, Edge};
use veriq_ir::{Circuit, ControlPolarity, Operation, OperationKind, Permutation, QubitId, StandardGate};

use crate::error::{CheckError, CheckResult};

/// How a task combines operation DDs with the checker's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Multiply operation matrices from the left (construction).
    MatrixLeft,
    /// Multiply inverted operation matrices from the right (alternating,
    /// second circuit).
    MatrixRightInverse,
    /// Apply operation matrices to a state vector (simulation).
    Vector,
}

impl TaskMode {
    fn is_vector(self) -> bool {
        matches!(self, TaskMode::Vector)
    }
}

/// Cursor plus carried permutation for one circuit.
pub struct TaskManager {
    mode: TaskMode,
    pos: usize,
    permutation: Permutation,
    n: usize,
}

impl TaskManager {
    /// Create a task at the start of the circuit.
    pub fn new(circuit: &Circuit, mode: TaskMode) -> Self {
        let n = circuit.num_qubits();
        Self {
            mode,
            pos: 0,
            permutation: circuit.initial_layout.complete(n),
            n,
        }
    }

    /// Rewind to the start of the circuit.
    pub fn reset(&mut self, circuit: &Circuit) {
        self.pos = 0;
        self.permutation = circuit.initial_layout.complete(self.n);
    }

    /// Whether every operation has been applied.
    pub fn finished(&self, circuit: &Circuit) -> bool {
        self.pos >= circuit.ops.len()
    }

    /// Number of operations left.
    pub fn remaining(&self, circuit: &Circuit) -> usize {
        circuit.ops.len() - self.pos.min(circuit.ops.len())
    }

    /// The next operation, if any.
    pub fn peek<'c>(&self, circuit: &'c Circuit) -> Option<&'c Operation> {
        circuit.ops.get(self.pos)
    }

    /// Consume leading SWAP operations (and barriers) by permuting the
    /// carried layout.
    pub fn apply_swaps(&mut self, circuit: &Circuit) {
        while let Some(op) = circuit.ops.get(self.pos) {
            if op.is_swap() {
                self.permutation.swap(op.qubits[0], op.qubits[1]);
                self.pos += 1;
            } else if op.is_barrier() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn level(&self, wire: QubitId) -> usize {
        self.permutation.apply(wire).index()
    }

    fn controls_at_levels(&self, op: &Operation, implicit: usize) -> Vec<(usize, bool)> {
        let mut controls: Vec<(usize, bool)> = op.qubits[..implicit]
            .iter()
            .map(|&q| (self.level(q), true))
            .collect();
        for c in &op.controls {
            controls.push((self.level(c.qubit), c.polarity == ControlPolarity::Positive));
        }
        controls
    }

    /// Build the matrix DD of a unitary operation at the permuted levels.
    pub fn op_to_dd(&self, dd: &mut DdPackage, op: &Operation) -> CheckResult<Edge> {
        match &op.kind {
            OperationKind::Compound(ops) => {
                let mut product = dd.identity(self.n);
                for member in ops {
                    let m = self.op_to_dd(dd, member)?;
                    product = dd.multiply_matrices(m, product, self.n);
                }
                Ok(product)
            }
            OperationKind::Gate(StandardGate::GPhase(p)) => {
                let theta = p
                    .evaluate()
                    .ok_or_else(|| CheckError::InvalidInput("unbound symbolic parameter".into()))?;
                let id = dd.identity(self.n);
                Ok(dd.scale(id, Complex64::from_polar(1.0, theta)))
            }
            OperationKind::Gate(gate) => {
                let (base, implicit) = gate.controlled_base();
                let controls = self.controls_at_levels(op, implicit);
                match base {
                    StandardGate::Swap => {
                        let a = self.level(op.qubits[implicit]);
                        let b = self.level(op.qubits[implicit + 1]);
                        Ok(dd.make_swap(self.n, a, b, &controls)?)
                    }
                    single => {
                        let matrix = single.matrix().ok_or_else(|| {
                            CheckError::InvalidInput(format!(
                                "cannot build a DD for symbolic '{}'",
                                single.name()
                            ))
                        })?;
                        let target = self.level(op.qubits[implicit]);
                        Ok(dd.make_gate(self.n, matrix, target, &controls)?)
                    }
                }
            }
            _ => Err(CheckError::InvalidInput(format!(
                "non-unitary operation '{}' survived preprocessing",
                op.name()
            ))),
        }
    }

    fn apply(&self, dd: &mut DdPackage, state: &mut Edge, op_dd: Edge) {
        let old = *state;
        let new = match self.mode {
            TaskMode::MatrixLeft => dd.multiply_matrices(op_dd, old, self.n),
            TaskMode::MatrixRightInverse => {
                let inv = dd.conjugate_transpose(op_dd, self.n);
                dd.multiply_matrices(old, inv, self.n)
            }
            TaskMode::Vector => dd.apply_matrix(op_dd, old, self.n),
        };
        if self.mode.is_vector() {
            dd.inc_ref_vector(new);
            dd.dec_ref_vector(old);
        } else {
            dd.inc_ref_matrix(new);
            dd.dec_ref_matrix(old);
        }
        *state = new;
    }

    /// Advance by up to `count` operations, applying them to `state`.
    pub fn advance(
        &mut self,
        dd: &mut DdPackage,
        circuit: &Circuit,
        state: &mut Edge,
        count: usize,
    ) -> CheckResult<()> {
        for _ in 0..count {
            let Some(op) = circuit.ops.get(self.pos) else {
                break;
            };
            if op.is_barrier() {
                self.pos += 1;
                continue;
            }
            if op.is_swap() {
                self.permutation.swap(op.qubits[0], op.qubits[1]);
                self.pos += 1;
                continue;
            }
            let op_dd = self.op_to_dd(dd, op)?;
            self.apply(dd, state, op_dd);
            self.pos += 1;
        }
        Ok(())
    }

    /// Skip one operation without applying it. Used by the lookahead
    /// scheme, which applies the operation's DD itself.
    pub fn skip_one(&mut self) {
        self.pos += 1;
    }

    /// Apply all remaining operations.
    pub fn finish(
        &mut self,
        dd: &mut DdPackage,
        circuit: &Circuit,
        state: &mut Edge,
    ) -> CheckResult<()> {
        let rest = self.remaining(circuit);
        self.advance(dd, circuit, state, rest)
    }

    /// Convenience used by stimulus materialization: run a fresh circuit to
    /// the end on a vector state.
    pub fn run_to_end(
        &mut self,
        dd: &mut DdPackage,
        state: &mut Edge,
        circuit: &Circuit,
    ) -> CheckResult<()> {
        self.finish(dd, circuit, state)
    }

    /// Rewire the state so that its levels carry the logical qubits the
    /// circuit's output permutation declares: level `perm[w]` is renamed to
    /// `out[w]` through a network of SWAP DDs.
    pub fn change_permutation(
        &mut self,
        dd: &mut DdPackage,
        circuit: &Circuit,
        state: &mut Edge,
    ) -> CheckResult<()> {
        let target = circuit.output_permutation.complete(self.n);
        let mut pi: Vec<usize> = (0..self.n).collect();
        for (wire, logical) in self.permutation.iter() {
            pi[logical.index()] = target.apply(wire).index();
        }

        for i in 0..self.n {
            while pi[i] != i {
                let j = pi[i];
                let swap = dd.make_swap(self.n, i, j, &[])?;
                self.apply(dd, state, swap);
                pi.swap(i, j);
            }
        }
        self.permutation = target;
        Ok(())
    }

    /// Reduce the effect of ancillary qubits: for matrices, project
    /// ancillary inputs to |0⟩ and fold the outputs of ancillary garbage
    /// qubits; for vectors, fold the amplitudes of ancillary garbage
    /// qubits.
    pub fn reduce_ancillae(
        &self,
        dd: &mut DdPackage,
        circuit: &Circuit,
        garbage: &[bool],
        state: &mut Edge,
    ) {
        let n = self.n;
        let ancillary: Vec<bool> = (0..n)
            .map(|q| circuit.is_ancillary(QubitId::from(q)))
            .collect();
        if !ancillary.iter().any(|&a| a) {
            return;
        }
        let old = *state;
        let new = if self.mode.is_vector() {
            let fold: Vec<bool> = (0..n).map(|q| ancillary[q] && garbage[q]).collect();
            if !fold.iter().any(|&f| f) {
                return;
            }
            let e = dd.reduce_garbage_vector(old, &fold);
            dd.inc_ref_vector(e);
            dd.dec_ref_vector(old);
            e
        } else {
            let e = dd.reduce_ancillae(old, &ancillary, garbage);
            dd.inc_ref_matrix(e);
            dd.dec_ref_matrix(old);
            e
        };
        *state = new;
    }

    /// Fold the contributions of garbage qubits (partial equivalence).
    pub fn reduce_garbage(&self, dd: &mut DdPackage, garbage: &[bool], state: &mut Edge) {
        if !garbage.iter().any(|&g| g) {
            return;
        }
        let old = *state;
        let new = if self.mode.is_vector() {
            let e = dd.reduce_garbage_vector(old, garbage);
            dd.inc_ref_vector(e);
            dd.dec_ref_vector(old);
            e
        } else {
            let e = dd.reduce_garbage(old, garbage);
            dd.inc_ref_matrix(e);
            dd.dec_ref_matrix(old);
            e
        };
        *state = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use veriq_ir::QubitId;

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_vector_task_runs_circuit() {
        let mut c = Circuit::with_size("bell", 2, 0);
        c.h(q(0)).unwrap().cx(q(0), q(1)).unwrap();

        let mut dd = DdPackage::new(2e-13);
        let mut state = dd.zero_state(2);
        dd.inc_ref_vector(state);
        let mut task = TaskManager::new(&c, TaskMode::Vector);
        task.finish(&mut dd, &c, &mut state).unwrap();

        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(dd.amplitude(state, &[false, false]).re, s, epsilon = 1e-12);
        assert_abs_diff_eq!(dd.amplitude(state, &[true, true]).re, s, epsilon = 1e-12);
    }

    #[test]
    fn test_swaps_only_permute_layout() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.swap(q(0), q(1)).unwrap();
        c.x(q(0)).unwrap();

        let mut dd = DdPackage::new(2e-13);
        let mut state = dd.zero_state(2);
        dd.inc_ref_vector(state);
        let mut task = TaskManager::new(&c, TaskMode::Vector);
        task.apply_swaps(&c);
        task.finish(&mut dd, &c, &mut state).unwrap();

        // X acted on wire 0, which carries logical 1 after the swap
        assert_abs_diff_eq!(dd.amplitude(state, &[false, true]).re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_change_permutation_restores_declared_outputs() {
        // circuit that swaps logicals via an (elided) SWAP and declares it
        let mut c = Circuit::with_size("c", 2, 0);
        c.x(q(0)).unwrap();
        c.swap(q(0), q(1)).unwrap();

        let mut dd = DdPackage::new(2e-13);
        let mut state = dd.zero_state(2);
        dd.inc_ref_vector(state);
        let mut task = TaskManager::new(&c, TaskMode::Vector);
        task.finish(&mut dd, &c, &mut state).unwrap();
        // before realignment the excitation still sits on level 0
        assert_abs_diff_eq!(dd.amplitude(state, &[true, false]).re, 1.0, epsilon = 1e-12);

        task.change_permutation(&mut dd, &c, &mut state).unwrap();
        // the swap moved logical 0 onto wire 1; the output permutation is
        // the identity, so the excitation must end up on level 1
        assert_abs_diff_eq!(dd.amplitude(state, &[false, true]).re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_left_builds_unitary() {
        let mut c = Circuit::with_size("c", 1, 0);
        c.x(q(0)).unwrap();

        let mut dd = DdPackage::new(2e-13);
        let mut state = dd.identity(1);
        dd.inc_ref_matrix(state);
        let mut task = TaskManager::new(&c, TaskMode::MatrixLeft);
        task.finish(&mut dd, &c, &mut state).unwrap();

        assert_abs_diff_eq!(
            dd.matrix_entry(state, &[true], &[false]).re,
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_right_inverse_cancels() {
        let mut c = Circuit::with_size("c", 1, 0);
        c.h(q(0)).unwrap();
        c.t(q(0)).unwrap();

        let mut dd = DdPackage::new(2e-13);
        let mut state = dd.identity(1);
        dd.inc_ref_matrix(state);

        let mut left = TaskManager::new(&c, TaskMode::MatrixLeft);
        left.finish(&mut dd, &c, &mut state).unwrap();
        let mut right = TaskManager::new(&c, TaskMode::MatrixRightInverse);
        right.finish(&mut dd, &c, &mut state).unwrap();

        assert!(dd.is_close_to_identity(state, 1, 1e-8));
    }

    #[test]
    fn test_compound_operation() {
        let mut c = Circuit::with_size("c", 1, 0);
        let compound = Operation::compound(
            vec![
                Operation::gate(StandardGate::H, [q(0)]),
                Operation::gate(StandardGate::Z, [q(0)]),
                Operation::gate(StandardGate::H, [q(0)]),
            ],
            q(0),
        );
        c.push(compound).unwrap();

        let mut dd = DdPackage::new(2e-13);
        let mut state = dd.zero_state(1);
        dd.inc_ref_vector(state);
        let mut task = TaskManager::new(&c, TaskMode::Vector);
        task.finish(&mut dd, &c, &mut state).unwrap();

        // HZH = X
        assert_abs_diff_eq!(dd.amplitude(state, &[true]).re, 1.0, epsilon = 1e-12);
    }
}
