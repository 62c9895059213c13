//! Basic rewrite rules.
//!
//! Rules come in pairs: `check_X(&g, ...) -> bool` tests applicability and
//! `X_unchecked(&mut g, ...)` applies the rule without re-checking. Applying
//! an unchecked rule outside its precondition produces an unsound rewrite.

use num_rational::Rational64;
use num_traits::Zero;

use crate::diagram::{Diagram, EType, VType, V};

/// Check whether two spiders can fuse: same color, connected by a normal
/// edge.
pub fn check_spider_fusion(g: &Diagram, v0: V, v1: V) -> bool {
    let t0 = g.vertex_type(v0);
    let t1 = g.vertex_type(v1);
    (t0 == t1 && (t0 == VType::Z || t0 == VType::X)) && g.edge_type_opt(v0, v1) == Some(EType::N)
}

/// Fuse `v1` into `v0`; `v0` survives.
pub fn spider_fusion_unchecked(g: &mut Diagram, v0: V, v1: V) {
    for (w, et) in g.incident_edges(v1) {
        if w != v0 {
            g.add_edge_smart(v0, w, et);
        }
    }
    let p = g.phase(v1);
    g.add_to_phase(v0, p);
    g.remove_vertex(v1);
}

/// Check whether a phase-free arity-2 spider can be removed.
pub fn check_remove_id(g: &Diagram, v: V) -> bool {
    let vt = g.vertex_type(v);
    (vt == VType::Z || vt == VType::X) && g.phase(v).is_zero() && g.degree(v) == 2
}

/// Remove an arity-2 spider with phase 0, connecting its two neighbors with
/// the Hadamard-parity of the two original edges.
pub fn remove_id_unchecked(g: &mut Diagram, v: V) {
    let nhd = g.incident_edges(v);
    let new_et = nhd[0].1.combined(nhd[1].1);
    g.remove_vertex(v);
    g.add_edge_smart(nhd[0].0, nhd[1].0, new_et);
}

fn is_interior_spider(g: &Diagram, v: V) -> bool {
    g.incident_edges(v)
        .iter()
        .all(|&(w, et)| g.vertex_type(w) == VType::Z && et == EType::H)
}

/// Check local complementation: a Z-spider with phase ±π/2 whose incident
/// edges are all Hadamard edges to other Z-spiders.
pub fn check_local_comp(g: &Diagram, v: V) -> bool {
    g.vertex_type(v) == VType::Z && *g.phase(v).denom() == 2 && is_interior_spider(g, v)
}

/// Apply local complementation at `v`, deleting it.
pub fn local_comp_unchecked(g: &mut Diagram, v: V) {
    let p = g.phase(v);
    let ns = g.neighbors(v);
    for i in 0..ns.len() {
        g.add_to_phase(ns[i], -p);
        for j in (i + 1)..ns.len() {
            g.add_edge_smart(ns[i], ns[j], EType::H);
        }
    }
    g.remove_vertex(v);

    let x = ns.len() as i32;
    g.scalar_mut().mul_sqrt2_pow(((x - 1) * (x - 2)) / 2);
    g.scalar_mut().mul_phase(Rational64::new(*p.numer(), 4));
}

/// Check the interior Pauli pivot: two Z-spiders with integer phases,
/// connected by a Hadamard edge, both surrounded by Hadamard edges to
/// Z-spiders.
pub fn check_pivot_pauli(g: &Diagram, v0: V, v1: V) -> bool {
    g.vertex_type(v0) == VType::Z
        && g.vertex_type(v1) == VType::Z
        && g.edge_type_opt(v0, v1) == Some(EType::H)
        && g.phase(v0).is_integer()
        && g.phase(v1).is_integer()
        && is_interior_spider(g, v0)
        && is_interior_spider(g, v1)
}

/// Apply pivoting to the pair, deleting both vertices.
pub fn pivot_unchecked(g: &mut Diagram, v0: V, v1: V) {
    let p0 = g.phase(v0);
    let p1 = g.phase(v1);

    let ns0 = g.neighbors(v0);
    let ns1 = g.neighbors(v1);
    for &n0 in &ns0 {
        g.add_to_phase(n0, p1);
        for &n1 in &ns1 {
            if n0 != v1 && n1 != v0 {
                g.add_edge_smart(n0, n1, EType::H);
            }
        }
    }
    for &n1 in &ns1 {
        g.add_to_phase(n1, p0);
    }

    g.remove_vertex(v0);
    g.remove_vertex(v1);

    let x = ns0.len() as i32;
    let y = ns1.len() as i32;
    g.scalar_mut().mul_sqrt2_pow((x - 2) * (y - 2));
    if !p0.is_zero() && !p1.is_zero() {
        g.scalar_mut().mul_phase(Rational64::from_integer(1));
    }
}

/// Detach a boundary `b` from spider `v` through a pair of fresh spiders,
/// moving the phase of `v` next to the boundary. Leaves `v` interior with
/// phase 0 towards `b`.
pub fn unfuse_boundary(g: &mut Diagram, v: V, b: V) {
    if g.vertex_type(b) != VType::B {
        return;
    }
    let q = g.qubit(v);
    let v1 = g.add_vertex_with(VType::Z, Rational64::zero(), q);
    let v2 = g.add_vertex_with(VType::Z, g.phase(v), q);
    g.set_phase(v, Rational64::zero());
    let et = g.edge_type_opt(v, b).expect("boundary edge");
    g.add_edge_with_type(v, v1, EType::H);
    g.add_edge_with_type(v1, v2, EType::H);
    g.add_edge_with_type(v2, b, et);
    g.remove_edge(v, b);
}

/// Split a non-Pauli phase off `v` into a phase gadget, leaving `v` with
/// phase 0.
pub fn unfuse_gadget(g: &mut Diagram, v: V) {
    if g.phase(v).is_integer() {
        return;
    }
    let q = g.qubit(v);
    let hub = g.add_vertex_with(VType::Z, Rational64::zero(), q);
    let leaf = g.add_vertex_with(VType::Z, g.phase(v), q);
    g.set_phase(v, Rational64::zero());
    g.add_edge_with_type(v, hub, EType::H);
    g.add_edge_with_type(hub, leaf, EType::H);
}

fn spider_edges_ok(g: &Diagram, v: V) -> bool {
    g.incident_edges(v).iter().all(|&(w, et)| {
        let wt = g.vertex_type(w);
        (wt == VType::Z && et == EType::H) || wt == VType::B
    })
}

fn touches_boundary(g: &Diagram, v: V) -> bool {
    g.neighbors(v)
        .iter()
        .any(|&w| g.vertex_type(w) == VType::B)
}

/// Check the boundary pivot: `v0` interior Pauli (it is removed, which
/// guarantees progress), `v1` Pauli next to a boundary, both surrounded by
/// Hadamard edges to Z-spiders apart from `v1`'s boundary wires.
pub fn check_pivot_boundary(g: &Diagram, v0: V, v1: V) -> bool {
    g.vertex_type(v0) == VType::Z
        && g.vertex_type(v1) == VType::Z
        && g.edge_type_opt(v0, v1) == Some(EType::H)
        && g.phase(v0).is_integer()
        && g.phase(v1).is_integer()
        && is_interior_spider(g, v0)
        && touches_boundary(g, v1)
        && spider_edges_ok(g, v1)
}

/// Apply the boundary pivot: unfuse `v1`'s boundary wires, then pivot.
pub fn pivot_boundary_unchecked(g: &mut Diagram, v0: V, v1: V) {
    for b in g.neighbors(v1) {
        unfuse_boundary(g, v1, b);
    }
    pivot_unchecked(g, v0, v1);
}

/// Check the gadget pivot: `v0` interior Pauli, `v1` interior non-Pauli
/// with more than one neighbor (not already a gadget leaf).
pub fn check_pivot_gadget(g: &Diagram, v0: V, v1: V) -> bool {
    g.vertex_type(v0) == VType::Z
        && g.vertex_type(v1) == VType::Z
        && g.edge_type_opt(v0, v1) == Some(EType::H)
        && g.phase(v0).is_integer()
        && !g.phase(v1).is_integer()
        && g.degree(v1) > 1
        && is_interior_spider(g, v0)
        && is_interior_spider(g, v1)
}

/// Apply the gadget pivot: split the non-Pauli phase off into a gadget and
/// pivot the now-Pauli pair.
pub fn pivot_gadget_unchecked(g: &mut Diagram, v0: V, v1: V) {
    unfuse_gadget(g, v1);
    pivot_unchecked(g, v0, v1);
}
