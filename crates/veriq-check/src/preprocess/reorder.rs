//! Canonical operation reordering.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use veriq_ir::{Circuit, Operation, OperationKind};

/// A content key for deterministic tie-breaking between independent
/// operations: ready operations are emitted in key order, so the final
/// sequence does not depend on the order the source listed them in.
fn content_key(op: &Operation) -> (String, Vec<u32>, Vec<u32>) {
    let name = match &op.kind {
        OperationKind::Compound(members) => {
            let mut s = String::from("compound:");
            for m in members {
                s.push_str(m.name());
                s.push(',');
            }
            s
        }
        _ => op.name().to_string(),
    };
    let qubits = op.qubits.iter().map(|q| q.0).collect();
    let controls = op.controls.iter().map(|c| c.qubit.0).collect();
    (name, qubits, controls)
}

/// Emit the operations in a canonical order: a dependency DAG (edges
/// between operations sharing a qubit or classical bit) traversed
/// breadth-first from the roots, ready operations ordered by content key.
pub fn reorder_operations(circ: &mut Circuit) {
    if circ.ops.len() < 2 {
        return;
    }

    let ops = std::mem::take(&mut circ.ops);
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..ops.len()).map(|i| graph.add_node(i)).collect();

    for i in 0..ops.len() {
        for j in (i + 1)..ops.len() {
            if depends(&ops[i], &ops[j]) {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    let mut indegree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut layer: Vec<usize> = (0..ops.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(ops.len());
    while !layer.is_empty() {
        layer.sort_by_key(|&i| (content_key(&ops[i]), i));
        let mut next = vec![];
        for &i in &layer {
            order.push(i);
            for n in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
                let j = graph[n];
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    next.push(j);
                }
            }
        }
        layer = next;
    }

    let mut ops: Vec<Option<Operation>> = ops.into_iter().map(Some).collect();
    circ.ops = order.into_iter().filter_map(|i| ops[i].take()).collect();
}

fn depends(a: &Operation, b: &Operation) -> bool {
    let shares_qubit = a
        .used_qubits()
        .any(|qa| b.used_qubits().any(|qb| qa == qb));
    if shares_qubit {
        return true;
    }
    let mut a_bits = a
        .clbits
        .iter()
        .copied()
        .chain(a.condition.iter().map(|c| c.clbit));
    a_bits.any(|ca| {
        b.clbits
            .iter()
            .copied()
            .chain(b.condition.iter().map(|c| c.clbit))
            .any(|cb| ca == cb)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriq_ir::QubitId;

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_order_is_canonical_across_interleavings() {
        // the same commuting gates listed in two different orders
        let mut c1 = Circuit::with_size("c1", 2, 0);
        c1.h(q(0)).unwrap();
        c1.h(q(1)).unwrap();
        c1.cx(q(0), q(1)).unwrap();

        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.h(q(1)).unwrap();
        c2.h(q(0)).unwrap();
        c2.cx(q(0), q(1)).unwrap();

        reorder_operations(&mut c1);
        reorder_operations(&mut c2);
        assert_eq!(c1.ops, c2.ops);
    }

    #[test]
    fn test_dependencies_preserved() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.h(q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();
        c.h(q(1)).unwrap();

        let before = c.ops.clone();
        reorder_operations(&mut c);
        assert_eq!(c.ops, before);
    }

    #[test]
    fn test_ready_operations_sorted_by_content() {
        let mut c = Circuit::with_size("c", 3, 0);
        c.h(q(2)).unwrap();
        c.h(q(0)).unwrap();
        c.cx(q(0), q(1)).unwrap();

        reorder_operations(&mut c);
        // both H gates are roots; the one on the lower qubit comes first
        assert_eq!(c.ops[0].qubits, vec![q(0)]);
        assert_eq!(c.ops[1].qubits, vec![q(2)]);
        assert_eq!(c.ops[2].qubits, vec![q(0), q(1)]);
    }
}
