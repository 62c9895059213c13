//! Circuit operations combining gates with operands.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::gate::StandardGate;
use crate::parameter::Parameter;
use crate::qubit::{ClbitId, QubitId};

/// Polarity of a quantum control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlPolarity {
    /// The controlled gate fires when the control qubit is |1⟩.
    Positive,
    /// The controlled gate fires when the control qubit is |0⟩.
    Negative,
}

/// A quantum control with polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// The controlling qubit.
    pub qubit: QubitId,
    /// When the control fires.
    pub polarity: ControlPolarity,
}

impl Control {
    /// A positive control on `qubit`.
    pub fn pos(qubit: QubitId) -> Self {
        Self {
            qubit,
            polarity: ControlPolarity::Positive,
        }
    }

    /// A negative control on `qubit`.
    pub fn neg(qubit: QubitId) -> Self {
        Self {
            qubit,
            polarity: ControlPolarity::Negative,
        }
    }
}

/// A single-bit classical condition attached to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// The classical bit being compared.
    pub clbit: ClbitId,
    /// The value the bit must hold for the operation to fire.
    pub value: bool,
}

/// The kind of operation in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationKind {
    /// A standard gate.
    Gate(StandardGate),
    /// Measurement of qubits into classical bits.
    Measure,
    /// Reset of a qubit to |0⟩.
    Reset,
    /// Barrier (no semantics for equivalence checking; kept as a
    /// reordering fence).
    Barrier,
    /// A fused run of single-qubit gates on one qubit.
    Compound(Vec<Operation>),
}

/// A complete operation with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// What the operation does.
    pub kind: OperationKind,
    /// Target qubits (controls of controlled standard gates lead).
    pub qubits: Vec<QubitId>,
    /// Classical bits (measurements only).
    pub clbits: Vec<ClbitId>,
    /// Additional quantum controls (deferred-measurement rewrites).
    pub controls: Vec<Control>,
    /// Optional classical condition.
    pub condition: Option<ClassicalCondition>,
}

impl Operation {
    /// Create a gate operation.
    pub fn gate(gate: StandardGate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: OperationKind::Gate(gate),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
            controls: vec![],
            condition: None,
        }
    }

    /// Create a measurement operation.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: OperationKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
            controls: vec![],
            condition: None,
        }
    }

    /// Create a reset operation.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: OperationKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
            controls: vec![],
            condition: None,
        }
    }

    /// Create a barrier over `qubits`.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: OperationKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
            controls: vec![],
            condition: None,
        }
    }

    /// Create a compound operation from a fused run of single-qubit gates.
    pub fn compound(ops: Vec<Operation>, qubit: QubitId) -> Self {
        Self {
            kind: OperationKind::Compound(ops),
            qubits: vec![qubit],
            clbits: vec![],
            controls: vec![],
            condition: None,
        }
    }

    /// Attach a classical condition.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Attach extra quantum controls.
    #[must_use]
    pub fn with_controls(mut self, controls: Vec<Control>) -> Self {
        self.controls = controls;
        self
    }

    /// The name of the operation.
    pub fn name(&self) -> &str {
        match &self.kind {
            OperationKind::Gate(g) => g.name(),
            OperationKind::Measure => "measure",
            OperationKind::Reset => "reset",
            OperationKind::Barrier => "barrier",
            OperationKind::Compound(_) => "compound",
        }
    }

    /// Check if this is a unitary operation (gate or compound, without a
    /// classical condition).
    pub fn is_unitary(&self) -> bool {
        self.condition.is_none()
            && matches!(
                self.kind,
                OperationKind::Gate(_) | OperationKind::Compound(_)
            )
    }

    /// Check if this is a measurement.
    pub fn is_measurement(&self) -> bool {
        matches!(self.kind, OperationKind::Measure)
    }

    /// Check if this is a reset.
    pub fn is_reset(&self) -> bool {
        matches!(self.kind, OperationKind::Reset)
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, OperationKind::Barrier)
    }

    /// Check if this operation fires on a classical condition.
    pub fn is_classically_controlled(&self) -> bool {
        self.condition.is_some()
    }

    /// Check if this is an uncontrolled SWAP.
    pub fn is_swap(&self) -> bool {
        matches!(self.kind, OperationKind::Gate(StandardGate::Swap)) && self.controls.is_empty()
    }

    /// Check if this is an uncontrolled single-qubit operation.
    pub fn is_single_qubit(&self) -> bool {
        self.controls.is_empty()
            && self.condition.is_none()
            && match &self.kind {
                OperationKind::Gate(g) => g.num_qubits() == 1,
                OperationKind::Compound(_) => true,
                _ => false,
            }
    }

    /// Check if the operation carries an unbound symbolic parameter.
    pub fn is_symbolic(&self) -> bool {
        match &self.kind {
            OperationKind::Gate(g) => g.is_symbolic(),
            OperationKind::Compound(ops) => ops.iter().any(Operation::is_symbolic),
            _ => false,
        }
    }

    /// Check whether the whole operation is diagonal in the computational
    /// basis.
    pub fn is_diagonal(&self) -> bool {
        self.controls.is_empty()
            && self.condition.is_none()
            && match &self.kind {
                OperationKind::Gate(g) => g.is_diagonal(),
                OperationKind::Compound(ops) => ops.iter().all(Operation::is_diagonal),
                _ => false,
            }
    }

    /// Collect the free variables of this operation into `vars`.
    pub fn collect_variables(&self, vars: &mut BTreeSet<String>) {
        match &self.kind {
            OperationKind::Gate(g) => {
                for p in g.parameters() {
                    p.collect_variables(vars);
                }
            }
            OperationKind::Compound(ops) => {
                for op in ops {
                    op.collect_variables(vars);
                }
            }
            _ => {}
        }
    }

    /// Rewrite every parameter through `f`.
    pub fn map_parameters(&mut self, f: &mut impl FnMut(&Parameter) -> Parameter) {
        match &mut self.kind {
            OperationKind::Gate(g) => *g = g.map_parameters(f),
            OperationKind::Compound(ops) => {
                for op in ops {
                    op.map_parameters(f);
                }
            }
            _ => {}
        }
    }

    /// All qubits the operation touches: targets and extra controls.
    pub fn used_qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.qubits
            .iter()
            .copied()
            .chain(self.controls.iter().map(|c| c.qubit))
    }

    /// Remap every qubit operand through `f`.
    pub fn remap_qubits(&mut self, f: &mut impl FnMut(QubitId) -> QubitId) {
        for q in &mut self.qubits {
            *q = f(*q);
        }
        for c in &mut self.controls {
            c.qubit = f(c.qubit);
        }
        if let OperationKind::Compound(ops) = &mut self.kind {
            for op in ops {
                op.remap_qubits(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_operation() {
        let op = Operation::gate(StandardGate::H, [QubitId(0)]);
        assert!(op.is_unitary());
        assert!(op.is_single_qubit());
        assert_eq!(op.name(), "h");
    }

    #[test]
    fn test_measure_operation() {
        let op = Operation::measure(QubitId(0), ClbitId(0));
        assert!(op.is_measurement());
        assert!(!op.is_unitary());
    }

    #[test]
    fn test_conditioned_gate_not_unitary() {
        let op = Operation::gate(StandardGate::X, [QubitId(0)]).with_condition(
            ClassicalCondition {
                clbit: ClbitId(0),
                value: true,
            },
        );
        assert!(op.is_classically_controlled());
        assert!(!op.is_unitary());
    }

    #[test]
    fn test_used_qubits_includes_controls() {
        let op = Operation::gate(StandardGate::X, [QubitId(2)])
            .with_controls(vec![Control::pos(QubitId(0)), Control::neg(QubitId(1))]);
        let used: Vec<_> = op.used_qubits().collect();
        assert_eq!(used, vec![QubitId(2), QubitId(0), QubitId(1)]);
        assert!(!op.is_single_qubit());
    }

    #[test]
    fn test_remap_qubits() {
        let mut op = Operation::gate(StandardGate::CX, [QubitId(0), QubitId(1)]);
        op.remap_qubits(&mut |q| QubitId(q.0 + 1));
        assert_eq!(op.qubits, vec![QubitId(1), QubitId(2)]);
    }

    #[test]
    fn test_diagonal_classification() {
        assert!(Operation::gate(StandardGate::Z, [QubitId(0)]).is_diagonal());
        assert!(Operation::gate(StandardGate::CZ, [QubitId(0), QubitId(1)]).is_diagonal());
        assert!(!Operation::gate(StandardGate::H, [QubitId(0)]).is_diagonal());
    }
}
