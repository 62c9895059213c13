//! SWAP reconstruction, permutation back-propagation and elision.

use veriq_ir::{Circuit, Operation, OperationKind, Permutation, QubitId, StandardGate};

fn is_plain_cx(op: &Operation) -> bool {
    matches!(op.kind, OperationKind::Gate(StandardGate::CX))
        && op.controls.is_empty()
        && op.condition.is_none()
}

fn same_pair(op: &Operation, a: QubitId, b: QubitId) -> bool {
    let qs: Vec<QubitId> = op.used_qubits().collect();
    qs.len() == 2 && ((qs[0] == a && qs[1] == b) || (qs[0] == b && qs[1] == a))
}

/// Find the next operation after `from` that touches `a` or `b`.
fn next_touching(ops: &[Operation], from: usize, a: QubitId, b: QubitId) -> Option<usize> {
    ops.iter()
        .enumerate()
        .skip(from)
        .find(|(_, op)| op.used_qubits().any(|q| q == a || q == b))
        .map(|(i, _)| i)
}

/// Rewrite CNOT patterns into SWAPs:
/// three alternating CNOTs on one pair become a SWAP, and a pair of
/// opposite CNOTs absorbed by an adjacent SWAP collapses into a single
/// CNOT. Adjacency is per qubit pair; unrelated operations in between do
/// not break a pattern unless they touch either qubit. Idempotent.
pub fn reconstruct_swaps(circ: &mut Circuit) {
    loop {
        let mut changed = false;
        let ops = &mut circ.ops;

        'scan: for i in 0..ops.len() {
            // SWAP followed by the two CNOTs it absorbs
            if ops[i].is_swap() {
                let (a, b) = (ops[i].qubits[0], ops[i].qubits[1]);
                let Some(j) = next_touching(ops, i + 1, a, b) else {
                    continue;
                };
                if !is_plain_cx(&ops[j]) || !same_pair(&ops[j], a, b) {
                    continue;
                }
                let Some(k) = next_touching(ops, j + 1, a, b) else {
                    continue;
                };
                if !is_plain_cx(&ops[k])
                    || !same_pair(&ops[k], a, b)
                    || ops[k].qubits[0] != ops[j].qubits[1]
                {
                    continue;
                }
                // [SWAP; CX(x,y); CX(y,x)] == CX(x,y)
                let replacement = ops[j].clone();
                ops[i] = replacement;
                let (first, second) = if j < k { (k, j) } else { (j, k) };
                ops.remove(first);
                ops.remove(second);
                changed = true;
                break 'scan;
            }

            if !is_plain_cx(&ops[i]) {
                continue;
            }
            let (a, b) = (ops[i].qubits[0], ops[i].qubits[1]);
            let Some(j) = next_touching(ops, i + 1, a, b) else {
                continue;
            };
            let Some(k) = next_touching(ops, j + 1, a, b) else {
                continue;
            };

            // three alternating CNOTs become a SWAP
            if is_plain_cx(&ops[j])
                && is_plain_cx(&ops[k])
                && same_pair(&ops[j], a, b)
                && same_pair(&ops[k], a, b)
                && ops[j].qubits[0] == b
                && ops[k].qubits[0] == a
            {
                ops[i] = Operation::gate(StandardGate::Swap, [a, b]);
                ops.remove(k);
                ops.remove(j);
                changed = true;
                break 'scan;
            }

            // two opposite CNOTs followed by the SWAP they absorb
            if is_plain_cx(&ops[j])
                && same_pair(&ops[j], a, b)
                && ops[j].qubits[0] == b
                && ops[k].is_swap()
                && same_pair(&ops[k], a, b)
            {
                // [CX(a,b); CX(b,a); SWAP] == CX(b,a)
                let replacement = ops[j].clone();
                ops[i] = replacement;
                ops.remove(k);
                ops.remove(j);
                changed = true;
                break 'scan;
            }
        }

        if !changed {
            return;
        }
    }
}

/// Push the output permutation back to the initial layout so both ends of
/// the circuit agree. Only sound for circuits whose wires keep their
/// identity, so circuits still containing SWAPs are left alone.
pub fn backpropagate_output_permutation(circ: &mut Circuit) {
    if circ.ops.iter().any(Operation::is_swap) {
        return;
    }
    let n = circ.num_qubits();
    let target = circ.output_permutation.complete(n);
    circ.initial_layout = target.clone();
    circ.output_permutation = target;
}

/// Remove SWAP operations by re-indexing every subsequent operation
/// through the accumulated permutation; the output permutation is adjusted
/// to match.
pub fn elide_permutations(circ: &mut Circuit) {
    if !circ.ops.iter().any(Operation::is_swap) {
        return;
    }
    let n = circ.num_qubits();
    let mut map: Vec<QubitId> = (0..n).map(QubitId::from).collect();

    let ops = std::mem::take(&mut circ.ops);
    let mut rewritten = Vec::with_capacity(ops.len());
    for mut op in ops {
        op.remap_qubits(&mut |q| map[q.index()]);
        if op.is_swap() {
            let (x, y) = (op.qubits[0], op.qubits[1]);
            for entry in &mut map {
                if *entry == x {
                    *entry = y;
                } else if *entry == y {
                    *entry = x;
                }
            }
            continue;
        }
        rewritten.push(op);
    }
    circ.ops = rewritten;

    let out = std::mem::take(&mut circ.output_permutation);
    circ.output_permutation = out
        .iter()
        .map(|(wire, logical)| (map[wire.index()], logical))
        .collect::<Permutation>();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_three_cnots_become_swap() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.cx(q(0), q(1)).unwrap();
        c.cx(q(1), q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();

        reconstruct_swaps(&mut c);
        assert_eq!(c.ops.len(), 1);
        assert!(c.ops[0].is_swap());
    }

    #[test]
    fn test_pattern_survives_unrelated_gates() {
        let mut c = Circuit::with_size("c", 3, 0);
        c.cx(q(0), q(1)).unwrap();
        c.h(q(2)).unwrap();
        c.cx(q(1), q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();

        reconstruct_swaps(&mut c);
        assert_eq!(c.ops.len(), 2);
        assert!(c.ops.iter().any(Operation::is_swap));
    }

    #[test]
    fn test_interfering_gate_blocks_pattern() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.cx(q(0), q(1)).unwrap();
        c.h(q(0)).unwrap();
        c.cx(q(1), q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();

        reconstruct_swaps(&mut c);
        assert_eq!(c.ops.len(), 4);
    }

    #[test]
    fn test_idempotent() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.cx(q(0), q(1)).unwrap();
        c.cx(q(1), q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();
        reconstruct_swaps(&mut c);
        let once = c.clone();
        reconstruct_swaps(&mut c);
        assert_eq!(c, once);
    }

    #[test]
    fn test_cnot_pair_absorbed_by_swap() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.swap(q(0), q(1)).unwrap();
        c.cx(q(0), q(1)).unwrap();
        c.cx(q(1), q(0)).unwrap();

        reconstruct_swaps(&mut c);
        assert_eq!(c.ops.len(), 1);
        assert!(is_plain_cx(&c.ops[0]));
        assert_eq!(c.ops[0].qubits, vec![q(0), q(1)]);
    }

    #[test]
    fn test_elide_permutations() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.swap(q(0), q(1)).unwrap();
        c.x(q(0)).unwrap();

        elide_permutations(&mut c);
        assert_eq!(c.ops.len(), 1);
        // the X follows the line that moved to wire 1
        assert_eq!(c.ops[0].qubits, vec![q(1)]);
        // the output permutation records the crossing
        assert_eq!(c.output_permutation.get(q(1)), Some(q(0)));
        assert_eq!(c.output_permutation.get(q(0)), Some(q(1)));
    }

    #[test]
    fn test_backpropagation_skips_swapful_circuits() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.swap(q(0), q(1)).unwrap();
        let before = c.clone();
        backpropagate_output_permutation(&mut c);
        assert_eq!(c, before);
    }
}
