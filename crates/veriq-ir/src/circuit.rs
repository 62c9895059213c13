//! Sequence-based quantum circuit with layout bookkeeping.
//!
//! A circuit is an ordered list of operations over `num_qubits` wires,
//! together with an initial layout and an output permutation (both partial
//! maps physical → logical) and per-logical-qubit ancillary/garbage flags.
//! The equivalence-checking preprocessor mutates circuits in place; after
//! preprocessing they are treated as immutable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::operation::{Operation, OperationKind};
use crate::parameter::Parameter;
use crate::permutation::Permutation;
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Number of qubit wires.
    num_qubits: usize,
    /// Number of classical bits.
    num_clbits: usize,
    /// The operation sequence.
    pub ops: Vec<Operation>,
    /// Initial layout: physical wire → logical qubit.
    pub initial_layout: Permutation,
    /// Output permutation: physical wire → logical qubit. Garbage qubits
    /// do not appear here.
    pub output_permutation: Permutation,
    /// Ancillary flag per logical qubit (input constrained to |0⟩).
    ancillary: Vec<bool>,
    /// Garbage flag per logical qubit (output ignored).
    garbage: Vec<bool>,
}

impl Circuit {
    /// Create a circuit with `num_qubits` wires and `num_clbits` classical
    /// bits, identity layouts and no ancillary or garbage qubits.
    pub fn with_size(name: impl Into<String>, num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            ops: vec![],
            initial_layout: Permutation::identity(num_qubits),
            output_permutation: Permutation::identity(num_qubits),
            ancillary: vec![false; num_qubits],
            garbage: vec![false; num_qubits],
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubit wires.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    /// Number of ancillary qubits.
    pub fn num_ancillary(&self) -> usize {
        self.ancillary.iter().filter(|&&a| a).count()
    }

    /// Number of garbage qubits.
    pub fn num_garbage(&self) -> usize {
        self.garbage.iter().filter(|&&g| g).count()
    }

    /// Number of primary (non-ancillary) qubits.
    pub fn num_qubits_without_ancillae(&self) -> usize {
        self.num_qubits - self.num_ancillary()
    }

    /// Check whether the circuit has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Check whether logical qubit `q` is ancillary.
    pub fn is_ancillary(&self, q: QubitId) -> bool {
        self.ancillary.get(q.index()).copied().unwrap_or(false)
    }

    /// Check whether logical qubit `q` is garbage.
    pub fn is_garbage(&self, q: QubitId) -> bool {
        self.garbage.get(q.index()).copied().unwrap_or(false)
    }

    /// Mark logical qubit `q` as ancillary.
    pub fn set_ancillary(&mut self, q: QubitId) {
        if q.index() < self.num_qubits {
            self.ancillary[q.index()] = true;
        }
    }

    /// Mark logical qubit `q` as garbage and drop it from the output
    /// permutation.
    pub fn set_garbage(&mut self, q: QubitId) {
        if q.index() < self.num_qubits {
            self.garbage[q.index()] = true;
            if let Some(p) = self.output_permutation.find_logical(q) {
                self.output_permutation.remove(p);
            }
        }
    }

    /// Check whether no operation touches physical wire `p`.
    pub fn is_idle(&self, p: QubitId) -> bool {
        !self.ops.iter().any(|op| op.used_qubits().any(|q| q == p))
    }

    /// Check whether the circuit contains dynamic primitives: resets,
    /// mid-circuit measurements, or classically controlled operations.
    pub fn is_dynamic(&self) -> bool {
        if self
            .ops
            .iter()
            .any(|op| op.is_reset() || op.is_classically_controlled())
        {
            return true;
        }
        // a measurement is mid-circuit if any later operation acts on qubits
        let mut seen_measure = false;
        for op in &self.ops {
            if op.is_measurement() {
                seen_measure = true;
            } else if seen_measure && !op.is_barrier() {
                return true;
            }
        }
        false
    }

    /// Check whether every parameter in the circuit is bound.
    pub fn is_variable_free(&self) -> bool {
        !self.ops.iter().any(Operation::is_symbolic)
    }

    /// The set of free variable names.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        for op in &self.ops {
            op.collect_variables(&mut vars);
        }
        vars
    }

    /// Bind every free variable using `assignment`; unlisted variables stay
    /// symbolic.
    pub fn instantiate(&mut self, assignment: &BTreeMap<String, f64>) {
        for op in &mut self.ops {
            op.map_parameters(&mut |p| {
                let mut bound = p.clone();
                for (name, value) in assignment {
                    bound = bound.bind(name, *value);
                }
                bound.simplified()
            });
        }
    }

    // =========================================================================
    // Structure editing
    // =========================================================================

    /// Append `count` ancillary qubits on top of the circuit, extending
    /// both layouts with identity entries.
    pub fn add_ancillary_register(&mut self, count: usize) {
        for _ in 0..count {
            let idx = QubitId::from(self.num_qubits);
            self.num_qubits += 1;
            self.initial_layout.insert(idx, idx);
            self.output_permutation.insert(idx, idx);
            self.ancillary.push(true);
            self.garbage.push(false);
        }
    }

    /// Append one fresh ancillary wire and return its index. The wire does
    /// not enter the output permutation until assigned.
    pub fn add_dangling_ancilla(&mut self) -> QubitId {
        let idx = QubitId::from(self.num_qubits);
        self.num_qubits += 1;
        self.initial_layout.insert(idx, idx);
        self.ancillary.push(true);
        self.garbage.push(false);
        idx
    }

    /// Remove an idle logical qubit. Both layouts lose the corresponding
    /// physical entry, higher physical wires shift down, and higher logical
    /// indices in both maps are decremented by the caller (see the
    /// preprocessor's stripping pass).
    ///
    /// Returns the physical index that was removed together with the
    /// logical index it mapped to in the output permutation, if any.
    pub fn remove_qubit(&mut self, logical: QubitId) -> IrResult<(QubitId, Option<QubitId>)> {
        let physical = self
            .initial_layout
            .find_logical(logical)
            .ok_or(IrError::QubitNotFound { qubit: logical })?;
        if !self.is_idle(physical) {
            return Err(IrError::QubitNotIdle { qubit: physical });
        }

        self.initial_layout.remove(physical);
        let in_output = self.output_permutation.remove(physical);

        // shift higher physical wires down by one, in ops and in both maps
        let shift = |q: QubitId| if q > physical { QubitId(q.0 - 1) } else { q };
        for op in &mut self.ops {
            op.remap_qubits(&mut |q| shift(q));
        }
        self.initial_layout = self.initial_layout.iter().map(|(p, l)| (shift(p), l)).collect();
        self.output_permutation = self
            .output_permutation
            .iter()
            .map(|(p, l)| (shift(p), l))
            .collect();

        self.ancillary.remove(logical.index());
        self.garbage.remove(logical.index());
        self.num_qubits -= 1;

        Ok((physical, in_output))
    }

    fn check_qubits(&self, op: &Operation) -> IrResult<()> {
        let mut seen = BTreeSet::new();
        for q in op.used_qubits() {
            if q.index() >= self.num_qubits {
                return Err(IrError::QubitNotFound { qubit: q });
            }
            if !seen.insert(q) {
                return Err(IrError::DuplicateQubit { qubit: q });
            }
        }
        for c in &op.clbits {
            if c.index() >= self.num_clbits {
                return Err(IrError::ClbitNotFound { clbit: *c });
            }
        }
        if let OperationKind::Gate(g) = &op.kind {
            let expected = g.num_qubits() as usize;
            if op.qubits.len() != expected {
                return Err(IrError::QubitCountMismatch {
                    gate_name: g.name().to_string(),
                    expected: expected as u32,
                    got: op.qubits.len() as u32,
                });
            }
        }
        Ok(())
    }

    /// Append an operation after validating its operands.
    pub fn push(&mut self, op: Operation) -> IrResult<&mut Self> {
        self.check_qubits(&op)?;
        self.ops.push(op);
        Ok(self)
    }

    // =========================================================================
    // Fluent gate builders
    // =========================================================================

    /// Apply a Hadamard gate.
    pub fn h(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::H, [q]))
    }

    /// Apply a Pauli-X gate.
    pub fn x(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::X, [q]))
    }

    /// Apply a Pauli-Y gate.
    pub fn y(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Y, [q]))
    }

    /// Apply a Pauli-Z gate.
    pub fn z(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Z, [q]))
    }

    /// Apply an S gate.
    pub fn s(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::S, [q]))
    }

    /// Apply an S-dagger gate.
    pub fn sdg(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Sdg, [q]))
    }

    /// Apply a T gate.
    pub fn t(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::T, [q]))
    }

    /// Apply a T-dagger gate.
    pub fn tdg(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Tdg, [q]))
    }

    /// Apply a sqrt(X) gate.
    pub fn sx(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::SX, [q]))
    }

    /// Apply an Rx rotation.
    pub fn rx(&mut self, theta: impl Into<Parameter>, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Rx(theta.into()), [q]))
    }

    /// Apply an Ry rotation.
    pub fn ry(&mut self, theta: impl Into<Parameter>, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Ry(theta.into()), [q]))
    }

    /// Apply an Rz rotation.
    pub fn rz(&mut self, theta: impl Into<Parameter>, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Rz(theta.into()), [q]))
    }

    /// Apply a phase gate.
    pub fn p(&mut self, lambda: impl Into<Parameter>, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::P(lambda.into()), [q]))
    }

    /// Apply a universal U gate.
    pub fn u(
        &mut self,
        theta: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        lambda: impl Into<Parameter>,
        q: QubitId,
    ) -> IrResult<&mut Self> {
        self.push(Operation::gate(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            [q],
        ))
    }

    /// Multiply the whole circuit by a global phase e^{iθ}.
    pub fn gphase(&mut self, theta: impl Into<Parameter>) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::GPhase(theta.into()), []))
    }

    /// Apply a CNOT gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::CX, [control, target]))
    }

    /// Apply a controlled-Y gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::CY, [control, target]))
    }

    /// Apply a controlled-Z gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::CZ, [control, target]))
    }

    /// Apply a controlled-Hadamard gate.
    pub fn ch(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::CH, [control, target]))
    }

    /// Apply a SWAP gate.
    pub fn swap(&mut self, a: QubitId, b: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::Swap, [a, b]))
    }

    /// Apply a Toffoli gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::CCX, [c1, c2, target]))
    }

    /// Apply a Fredkin gate.
    pub fn cswap(&mut self, control: QubitId, a: QubitId, b: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::gate(StandardGate::CSwap, [control, a, b]))
    }

    /// Measure a qubit into a classical bit.
    pub fn measure(&mut self, q: QubitId, c: ClbitId) -> IrResult<&mut Self> {
        self.push(Operation::measure(q, c))
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, q: QubitId) -> IrResult<&mut Self> {
        self.push(Operation::reset(q))
    }

    /// Apply a barrier over `qubits`.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.push(Operation::barrier(qubits))
    }
}
