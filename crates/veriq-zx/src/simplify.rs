//! Simplification drivers.
//!
//! Each `*_simp` pass applies one rule to a fixpoint; the composite drivers
//! iterate the passes the way the equivalence checker needs them. All
//! drivers observe an abort flag between rule applications and return
//! whether they changed the diagram.

use std::sync::atomic::{AtomicBool, Ordering};

use num_traits::Zero;
use rustc_hash::FxHashMap;

use crate::diagram::{Diagram, VType, V};
use crate::rules::{
    check_local_comp, check_pivot_boundary, check_pivot_gadget, check_pivot_pauli,
    check_remove_id, check_spider_fusion, local_comp_unchecked, pivot_boundary_unchecked,
    pivot_gadget_unchecked, pivot_unchecked, remove_id_unchecked, spider_fusion_unchecked,
};

#[inline]
fn aborted(abort: &AtomicBool) -> bool {
    abort.load(Ordering::Relaxed)
}

fn vertex_simp(
    g: &mut Diagram,
    abort: &AtomicBool,
    check: fn(&Diagram, V) -> bool,
    rule: fn(&mut Diagram, V),
) -> bool {
    let mut got_match = false;
    while !aborted(abort) {
        let m = g.vertices().into_iter().find(|&v| check(g, v));
        match m {
            Some(v) => rule(g, v),
            None => break,
        }
        got_match = true;
    }
    got_match
}

fn edge_simp(
    g: &mut Diagram,
    abort: &AtomicBool,
    check: fn(&Diagram, V, V) -> bool,
    rule: fn(&mut Diagram, V, V),
) -> bool {
    let mut got_match = false;
    'outer: while !aborted(abort) {
        for v in g.vertices() {
            if !g.contains_vertex(v) {
                continue;
            }
            for (w, _) in g.incident_edges(v) {
                if check(g, v, w) {
                    rule(g, v, w);
                    got_match = true;
                    continue 'outer;
                }
            }
        }
        break;
    }
    got_match
}

/// Fuse all connected same-color spider pairs.
pub fn spider_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    edge_simp(g, abort, check_spider_fusion, spider_fusion_unchecked)
}

/// Remove all phase-free arity-2 spiders.
pub fn id_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    vertex_simp(g, abort, check_remove_id, remove_id_unchecked)
}

/// Apply local complementation wherever possible.
pub fn local_comp_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    vertex_simp(g, abort, check_local_comp, local_comp_unchecked)
}

/// Apply the interior Pauli pivot wherever possible.
pub fn pivot_pauli_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    edge_simp(g, abort, check_pivot_pauli, pivot_unchecked)
}

/// Apply the boundary pivot wherever possible.
pub fn pivot_boundary_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    edge_simp(g, abort, check_pivot_boundary, pivot_boundary_unchecked)
}

/// Apply the gadget pivot wherever possible.
pub fn pivot_gadget_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    edge_simp(g, abort, check_pivot_gadget, pivot_gadget_unchecked)
}

/// Fuse phase gadgets over the same neighborhood.
pub fn gadget_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    let mut simplified = false;
    while !aborted(abort) {
        if !fuse_gadgets_once(g) {
            break;
        }
        simplified = true;
    }
    simplified
}

fn fuse_gadgets_once(g: &mut Diagram) -> bool {
    // group gadgets (leaf, hub) by the hub's remaining neighborhood
    let mut gadgets: FxHashMap<Vec<V>, Vec<(V, V)>> = FxHashMap::default();
    for leaf in g.vertices() {
        if g.vertex_type(leaf) != VType::Z || g.degree(leaf) != 1 {
            continue;
        }
        let (hub, et) = g.incident_edges(leaf)[0];
        if g.vertex_type(hub) != VType::Z
            || !g.phase(hub).is_zero()
            || et != crate::diagram::EType::H
        {
            continue;
        }
        let mut nhd: Vec<V> = g.neighbors(hub).into_iter().filter(|&w| w != leaf).collect();
        if nhd.is_empty() {
            continue;
        }
        nhd.sort_unstable();
        gadgets.entry(nhd).or_default().push((hub, leaf));
    }

    let mut fused = false;
    for group in gadgets.values() {
        if group.len() < 2 {
            continue;
        }
        fused = true;
        let (_, keep_leaf) = group[0];
        for &(hub, leaf) in &group[1..] {
            let p = g.phase(leaf);
            g.add_to_phase(keep_leaf, p);
            g.remove_vertex(hub);
            g.remove_vertex(leaf);
        }
    }
    fused
}

/// Fuse spiders, convert everything to Z, then run identity removal,
/// fusion, Pauli pivoting, and local complementation to a fixpoint.
pub fn interior_clifford_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    let mut got_match = spider_simp(g, abort);
    g.x_to_z();
    while !aborted(abort) {
        let m = id_simp(g, abort)
            || spider_simp(g, abort)
            || pivot_pauli_simp(g, abort)
            || local_comp_simp(g, abort);
        if !m {
            break;
        }
        got_match = true;
    }
    got_match
}

/// Interior simplification plus boundary pivoting, to a fixpoint.
pub fn clifford_simp(g: &mut Diagram, abort: &AtomicBool) -> bool {
    let mut got_match = false;
    while !aborted(abort) {
        let m = interior_clifford_simp(g, abort) || pivot_boundary_simp(g, abort);
        if !m {
            break;
        }
        got_match = true;
    }
    got_match
}

/// The full reduction pipeline: graph-like conversion, Clifford
/// simplification, gadget fusion and gadget pivoting until nothing moves,
/// then removal of disconnected spiders.
pub fn full_reduce(g: &mut Diagram, abort: &AtomicBool) -> bool {
    let mut simplified = interior_clifford_simp(g, abort);
    while !aborted(abort) {
        let mut more = clifford_simp(g, abort);
        more |= gadget_simp(g, abort);
        more |= interior_clifford_simp(g, abort);
        more |= pivot_gadget_simp(g, abort);
        if !more {
            break;
        }
        simplified = true;
    }
    if !aborted(abort) {
        g.remove_disconnected_spiders();
    }
    simplified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::EType;
    use num_rational::Rational64;
    use num_traits::Zero;

    fn no_abort() -> AtomicBool {
        AtomicBool::new(false)
    }

    /// A 1-qubit wire with `spiders` phase-free Z-spiders in a row.
    fn wire_with_spiders(spiders: usize) -> (Diagram, V, V) {
        let mut g = Diagram::new();
        let i = g.add_vertex_with(VType::B, Rational64::zero(), 0);
        let mut prev = i;
        for _ in 0..spiders {
            let v = g.add_vertex_with(VType::Z, Rational64::zero(), 0);
            g.add_edge(prev, v);
            prev = v;
        }
        let o = g.add_vertex_with(VType::B, Rational64::zero(), 0);
        g.add_edge(prev, o);
        g.set_inputs(vec![i]);
        g.set_outputs(vec![o]);
        (g, i, o)
    }

    #[test]
    fn test_spider_chain_fuses_to_wire() {
        let (mut g, i, o) = wire_with_spiders(4);
        let abort = no_abort();
        assert!(spider_simp(&mut g, &abort));
        assert!(id_simp(&mut g, &abort));
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.edge_type_opt(i, o), Some(EType::N));
    }

    #[test]
    fn test_interior_clifford_simp_handles_x_spiders() {
        let mut g = Diagram::new();
        let i = g.add_vertex_with(VType::B, Rational64::zero(), 0);
        let x = g.add_vertex_with(VType::X, Rational64::zero(), 0);
        let z = g.add_vertex_with(VType::Z, Rational64::zero(), 0);
        let o = g.add_vertex_with(VType::B, Rational64::zero(), 0);
        g.add_edge(i, x);
        g.add_edge(x, z);
        g.add_edge(z, o);
        g.set_inputs(vec![i]);
        g.set_outputs(vec![o]);

        let abort = no_abort();
        interior_clifford_simp(&mut g, &abort);
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.edge_type_opt(i, o), Some(EType::N));
        assert!(g.global_phase_is_zero());
    }

    #[test]
    fn test_gadget_fusion_merges_phases() {
        let mut g = Diagram::new();
        // two gadgets over the same pair of spiders
        let a = g.add_vertex_with(VType::Z, Rational64::zero(), 0);
        let b = g.add_vertex_with(VType::Z, Rational64::zero(), 1);
        let hub1 = g.add_vertex(VType::Z);
        let leaf1 = g.add_vertex_with(VType::Z, Rational64::new(1, 4), -1);
        let hub2 = g.add_vertex(VType::Z);
        let leaf2 = g.add_vertex_with(VType::Z, Rational64::new(1, 4), -1);
        for (hub, leaf) in [(hub1, leaf1), (hub2, leaf2)] {
            g.add_edge_with_type(hub, leaf, EType::H);
            g.add_edge_with_type(hub, a, EType::H);
            g.add_edge_with_type(hub, b, EType::H);
        }

        let abort = no_abort();
        assert!(gadget_simp(&mut g, &abort));
        // one gadget left, with the summed phase
        let leaves: Vec<V> = g
            .vertices()
            .into_iter()
            .filter(|&v| g.degree(v) == 1)
            .collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(g.phase(leaves[0]), Rational64::new(1, 2));
    }

    #[test]
    fn test_abort_stops_simplification() {
        let (mut g, _, _) = wire_with_spiders(6);
        let abort = AtomicBool::new(true);
        assert!(!spider_simp(&mut g, &abort));
        assert_eq!(g.num_vertices(), 8);
    }
}
