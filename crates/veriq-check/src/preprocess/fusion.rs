//! Single-qubit gate fusion, diagonal-gate removal, final-measurement
//! removal.

use rustc_hash::FxHashMap;

use veriq_ir::{Circuit, Operation, OperationKind, QubitId};
#[cfg(test)]
use veriq_ir::StandardGate;

/// Cancel adjacent trivially-inverse gates inside a run.
fn push_cancelling(run: &mut Vec<Operation>, op: Operation) {
    let cancels = match (&op.kind, run.last().map(|l| &l.kind)) {
        (OperationKind::Gate(gate), Some(OperationKind::Gate(prev))) => prev.cancels_with(gate),
        _ => false,
    };
    if cancels {
        run.pop();
    } else {
        run.push(op);
    }
}

fn flush_run(out: &mut Vec<Operation>, wire: QubitId, run: Vec<Operation>) {
    match run.len() {
        0 => {}
        1 => out.extend(run),
        _ => out.push(Operation::compound(run, wire)),
    }
}

/// Replace maximal runs of single-qubit gates on one qubit by a compound
/// operation, applying trivial cancellation laws on the way.
pub fn fuse_single_qubit_gates(circ: &mut Circuit) {
    let ops = std::mem::take(&mut circ.ops);
    let mut out = Vec::with_capacity(ops.len());
    let mut runs: FxHashMap<QubitId, Vec<Operation>> = FxHashMap::default();
    let mut run_order: Vec<QubitId> = vec![];

    for op in ops {
        if op.is_single_qubit() && matches!(op.kind, OperationKind::Gate(_)) {
            let wire = op.qubits[0];
            let run = runs.entry(wire).or_default();
            if run.is_empty() {
                run_order.push(wire);
            }
            push_cancelling(run, op);
            continue;
        }
        // flush the runs of every wire this operation touches
        for wire in op.used_qubits().collect::<Vec<_>>() {
            if let Some(run) = runs.remove(&wire) {
                flush_run(&mut out, wire, run);
                run_order.retain(|&w| w != wire);
            }
        }
        out.push(op);
    }
    for wire in run_order {
        if let Some(run) = runs.remove(&wire) {
            flush_run(&mut out, wire, run);
        }
    }
    circ.ops = out;
}

/// Remove single-qubit diagonal gates that directly precede a measurement
/// of the same qubit.
pub fn remove_diagonal_gates_before_measure(circ: &mut Circuit) {
    loop {
        let mut remove_at: Option<usize> = None;
        'measures: for (mi, op) in circ.ops.iter().enumerate() {
            if !op.is_measurement() {
                continue;
            }
            for &wire in &op.qubits {
                // find the closest earlier operation on this wire
                let prev = circ.ops[..mi]
                    .iter()
                    .rposition(|p| p.used_qubits().any(|q| q == wire));
                if let Some(pi) = prev {
                    let p = &circ.ops[pi];
                    if p.is_diagonal() && p.qubits.len() == 1 {
                        remove_at = Some(pi);
                        break 'measures;
                    }
                }
            }
        }
        match remove_at {
            Some(idx) => {
                circ.ops.remove(idx);
            }
            None => return,
        }
    }
}

/// Strip trailing measurements (and trailing barriers) from the circuit.
pub fn remove_final_measurements(circ: &mut Circuit) {
    while circ
        .ops
        .last()
        .is_some_and(|op| op.is_measurement() || op.is_barrier())
    {
        circ.ops.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriq_ir::ClbitId;

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_run_becomes_compound() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.h(q(0)).unwrap();
        c.t(q(0)).unwrap();
        c.s(q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();

        fuse_single_qubit_gates(&mut c);
        assert_eq!(c.ops.len(), 2);
        match &c.ops[0].kind {
            OperationKind::Compound(members) => assert_eq!(members.len(), 3),
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn test_cancellation_during_fusion() {
        let mut c = Circuit::with_size("c", 1, 0);
        c.h(q(0)).unwrap();
        c.x(q(0)).unwrap();
        c.x(q(0)).unwrap();
        c.h(q(0)).unwrap();

        fuse_single_qubit_gates(&mut c);
        // everything cancels
        assert!(c.ops.is_empty());
    }

    #[test]
    fn test_singleton_run_stays_plain() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.h(q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();

        fuse_single_qubit_gates(&mut c);
        assert_eq!(c.ops.len(), 2);
        assert!(matches!(
            c.ops[0].kind,
            OperationKind::Gate(StandardGate::H)
        ));
    }

    #[test]
    fn test_two_qubit_gate_splits_runs() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.t(q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();
        c.tdg(q(0)).unwrap();

        fuse_single_qubit_gates(&mut c);
        // T and T† sit on opposite sides of the CX and must not cancel
        assert_eq!(c.ops.len(), 3);
    }

    #[test]
    fn test_remove_diagonal_before_measure() {
        let mut c = Circuit::with_size("c", 1, 1);
        c.h(q(0)).unwrap();
        c.z(q(0)).unwrap();
        c.measure(q(0), ClbitId(0)).unwrap();

        remove_diagonal_gates_before_measure(&mut c);
        assert_eq!(c.ops.len(), 2);
        assert!(matches!(
            c.ops[0].kind,
            OperationKind::Gate(StandardGate::H)
        ));
    }

    #[test]
    fn test_remove_final_measurements() {
        let mut c = Circuit::with_size("c", 2, 2);
        c.h(q(0)).unwrap();
        c.measure(q(0), ClbitId(0)).unwrap();
        c.measure(q(1), ClbitId(1)).unwrap();

        remove_final_measurements(&mut c);
        assert_eq!(c.ops.len(), 1);
        assert!(!c.ops.iter().any(Operation::is_measurement));
    }
}
