//! Dynamic-circuit transformation: reset elimination and measurement
//! deferral.

use rustc_hash::FxHashMap;

use veriq_ir::{Circuit, ClbitId, Control, ControlPolarity, Operation, QubitId};

use crate::error::{CheckError, CheckResult};

/// Replace every reset by retiring the wire: the retired wire's output
/// leaves the output permutation and its content becomes ancillary garbage,
/// while a fresh ancillary wire takes over the retired wire's role,
/// inheriting its output-permutation slot.
pub fn eliminate_resets(circ: &mut Circuit) -> CheckResult<()> {
    if !circ.ops.iter().any(Operation::is_reset) {
        return Ok(());
    }

    // original wire index → wire currently carrying that line
    let mut alias: Vec<QubitId> = (0..circ.num_qubits())
        .map(QubitId::from)
        .collect();

    let ops = std::mem::take(&mut circ.ops);
    let mut rewritten = Vec::with_capacity(ops.len());
    for mut op in ops {
        op.remap_qubits(&mut |q| alias[q.index()]);
        if !op.is_reset() {
            rewritten.push(op);
            continue;
        }

        let retired = op.qubits[0];
        let fresh = circ.add_dangling_ancilla();
        alias = alias
            .into_iter()
            .map(|q| if q == retired { fresh } else { q })
            .collect();
        // grow the alias table for the new wire
        alias.push(fresh);

        // the fresh wire inherits the retired wire's output slot; the
        // retired wire's final content is scratch
        let inherited = circ.output_permutation.remove(retired);
        circ.set_garbage(fresh);
        circ.output_permutation.insert(retired, fresh);
        if let Some(logical) = inherited {
            circ.output_permutation.insert(fresh, logical);
        }
    }
    circ.ops = rewritten;
    Ok(())
}

/// Defer measurements to the end of the circuit, rewriting classically
/// controlled operations into quantum-controlled ones.
pub fn defer_measurements(circ: &mut Circuit) -> CheckResult<()> {
    let has_mid_measure = circ
        .ops
        .iter()
        .any(|op| op.is_measurement() || op.is_classically_controlled());
    if !has_mid_measure {
        return Ok(());
    }

    let mut measured_into: FxHashMap<ClbitId, QubitId> = FxHashMap::default();
    let mut measured_wires: Vec<QubitId> = vec![];
    let mut deferred: Vec<Operation> = vec![];
    let ops = std::mem::take(&mut circ.ops);
    let mut rewritten = Vec::with_capacity(ops.len());

    for op in ops {
        if op.is_measurement() {
            for (&q, &c) in op.qubits.iter().zip(op.clbits.iter()) {
                measured_into.insert(c, q);
                measured_wires.push(q);
            }
            deferred.push(op);
            continue;
        }
        if op.is_barrier() {
            rewritten.push(op);
            continue;
        }
        // a measured qubit must stay untouched for deferral to be sound
        if op.used_qubits().any(|q| measured_wires.contains(&q)) {
            circ.ops = rewritten;
            return Err(CheckError::InvalidInput(
                "cannot defer measurement: a measured qubit is acted on afterwards".into(),
            ));
        }
        if let Some(cond) = op.condition {
            let Some(&control_qubit) = measured_into.get(&cond.clbit) else {
                circ.ops = rewritten;
                return Err(CheckError::InvalidInput(
                    "classically controlled operation conditioned on an unmeasured bit".into(),
                ));
            };
            let polarity = if cond.value {
                ControlPolarity::Positive
            } else {
                ControlPolarity::Negative
            };
            let mut rewritten_op = op.clone();
            rewritten_op.condition = None;
            rewritten_op.controls.push(Control {
                qubit: control_qubit,
                polarity,
            });
            rewritten.push(rewritten_op);
            continue;
        }
        rewritten.push(op);
    }

    rewritten.extend(deferred);
    circ.ops = rewritten;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriq_ir::{ClassicalCondition, OperationKind, StandardGate};

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_reset_allocates_fresh_ancilla() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.x(q(1)).unwrap();
        c.reset(q(1)).unwrap();
        c.h(q(1)).unwrap();

        eliminate_resets(&mut c).unwrap();

        assert_eq!(c.num_qubits(), 3);
        assert_eq!(c.num_ancillary(), 1);
        assert_eq!(c.num_garbage(), 1);
        assert!(!c.ops.iter().any(Operation::is_reset));
        // the H moved to the fresh wire
        assert_eq!(c.ops[1].qubits, vec![q(2)]);
        // the fresh wire inherits the output slot of the retired one
        assert_eq!(c.output_permutation.get(q(2)), Some(q(1)));
    }

    #[test]
    fn test_defer_measurement_rewrites_condition() {
        let mut c = Circuit::with_size("c", 2, 1);
        c.h(q(0)).unwrap();
        c.measure(q(0), ClbitId(0)).unwrap();
        c.push(
            Operation::gate(StandardGate::X, [q(1)]).with_condition(ClassicalCondition {
                clbit: ClbitId(0),
                value: true,
            }),
        )
        .unwrap();

        defer_measurements(&mut c).unwrap();

        // h, controlled-x, measure
        assert_eq!(c.ops.len(), 3);
        assert!(c.ops[2].is_measurement());
        let rewritten = &c.ops[1];
        assert!(rewritten.condition.is_none());
        assert_eq!(rewritten.controls.len(), 1);
        assert_eq!(rewritten.controls[0].qubit, q(0));
        assert_eq!(rewritten.controls[0].polarity, ControlPolarity::Positive);
        assert!(matches!(
            rewritten.kind,
            OperationKind::Gate(StandardGate::X)
        ));
    }

    #[test]
    fn test_defer_negative_condition() {
        let mut c = Circuit::with_size("c", 2, 1);
        c.measure(q(0), ClbitId(0)).unwrap();
        c.push(
            Operation::gate(StandardGate::Z, [q(1)]).with_condition(ClassicalCondition {
                clbit: ClbitId(0),
                value: false,
            }),
        )
        .unwrap();

        defer_measurements(&mut c).unwrap();
        assert_eq!(c.ops[0].controls[0].polarity, ControlPolarity::Negative);
    }

    #[test]
    fn test_defer_rejects_gate_on_measured_qubit() {
        let mut c = Circuit::with_size("c", 1, 1);
        c.measure(q(0), ClbitId(0)).unwrap();
        c.x(q(0)).unwrap();
        assert!(matches!(
            defer_measurements(&mut c),
            Err(CheckError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_condition_on_unmeasured_bit_rejected() {
        let mut c = Circuit::with_size("c", 1, 1);
        c.push(
            Operation::gate(StandardGate::X, [q(0)]).with_condition(ClassicalCondition {
                clbit: ClbitId(0),
                value: true,
            }),
        )
        .unwrap();
        assert!(matches!(
            defer_measurements(&mut c),
            Err(CheckError::InvalidInput(_))
        ));
    }
}
