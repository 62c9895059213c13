//! ZX-diagram representation.
//!
//! Spiders and boundaries are vertices; edges are either normal wires or
//! Hadamard wires. The adjacency is simple (no parallel edges):
//! [`Diagram::add_edge_smart`] resolves parallel edges and self-loops with
//! the usual complementarity bookkeeping on the scalar.

use num_rational::Rational64;
use num_traits::Zero;
use rustc_hash::FxHashMap;

use crate::scalar::{normalize_phase, Scalar};

/// Vertex handle.
pub type V = usize;

/// Vertex kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VType {
    /// Boundary (input or output).
    B,
    /// Z-spider.
    Z,
    /// X-spider.
    X,
}

/// Edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EType {
    /// Normal wire.
    N,
    /// Hadamard wire.
    H,
}

impl EType {
    /// The other edge kind.
    pub fn toggled(self) -> EType {
        match self {
            EType::N => EType::H,
            EType::H => EType::N,
        }
    }

    /// Combine two wire kinds in series (Hadamard parity).
    pub fn combined(self, other: EType) -> EType {
        if self == other {
            EType::N
        } else {
            EType::H
        }
    }
}

/// Per-vertex data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VData {
    /// Vertex kind.
    pub ty: VType,
    /// Phase in half-turns, normalized to (-1, 1].
    pub phase: Rational64,
    /// Qubit annotation (for boundaries and residual-structure queries).
    pub qubit: i32,
}

/// A ZX-diagram.
#[derive(Debug, Clone)]
pub struct Diagram {
    vdata: Vec<Option<VData>>,
    adj: Vec<FxHashMap<V, EType>>,
    inputs: Vec<V>,
    outputs: Vec<V>,
    scalar: Scalar,
    nedges: usize,
}

impl Diagram {
    /// Create an empty diagram.
    pub fn new() -> Self {
        Self {
            vdata: vec![],
            adj: vec![],
            inputs: vec![],
            outputs: vec![],
            scalar: Scalar::one(),
            nedges: 0,
        }
    }

    // =========================================================================
    // Vertices
    // =========================================================================

    /// Add a vertex of the given kind with phase 0 and no qubit annotation.
    pub fn add_vertex(&mut self, ty: VType) -> V {
        self.add_vertex_with(ty, Rational64::zero(), -1)
    }

    /// Add a vertex with explicit phase and qubit annotation.
    pub fn add_vertex_with(&mut self, ty: VType, phase: Rational64, qubit: i32) -> V {
        let v = self.vdata.len();
        self.vdata.push(Some(VData {
            ty,
            phase: normalize_phase(phase),
            qubit,
        }));
        self.adj.push(FxHashMap::default());
        v
    }

    /// Check whether a vertex is still present.
    pub fn contains_vertex(&self, v: V) -> bool {
        self.vdata.get(v).is_some_and(Option::is_some)
    }

    /// All live vertices.
    pub fn vertices(&self) -> Vec<V> {
        (0..self.vdata.len())
            .filter(|&v| self.vdata[v].is_some())
            .collect()
    }

    /// Number of live vertices.
    pub fn num_vertices(&self) -> usize {
        self.vdata.iter().filter(|d| d.is_some()).count()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.nedges
    }

    fn data(&self, v: V) -> &VData {
        self.vdata[v].as_ref().expect("vertex was deleted")
    }

    fn data_mut(&mut self, v: V) -> &mut VData {
        self.vdata[v].as_mut().expect("vertex was deleted")
    }

    /// The kind of a vertex.
    pub fn vertex_type(&self, v: V) -> VType {
        self.data(v).ty
    }

    /// Re-type a vertex.
    pub fn set_vertex_type(&mut self, v: V, ty: VType) {
        self.data_mut(v).ty = ty;
    }

    /// The phase of a vertex.
    pub fn phase(&self, v: V) -> Rational64 {
        self.data(v).phase
    }

    /// Overwrite the phase of a vertex.
    pub fn set_phase(&mut self, v: V, phase: Rational64) {
        self.data_mut(v).phase = normalize_phase(phase);
    }

    /// Add to the phase of a vertex.
    pub fn add_to_phase(&mut self, v: V, delta: Rational64) {
        let p = self.data(v).phase;
        self.data_mut(v).phase = normalize_phase(p + delta);
    }

    /// The qubit annotation of a vertex.
    pub fn qubit(&self, v: V) -> i32 {
        self.data(v).qubit
    }

    /// Remove a vertex and all incident edges.
    pub fn remove_vertex(&mut self, v: V) {
        let nhd: Vec<V> = self.adj[v].keys().copied().collect();
        for w in nhd {
            self.adj[w].remove(&v);
            self.nedges -= 1;
        }
        self.adj[v].clear();
        self.vdata[v] = None;
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// The neighbors of a vertex.
    pub fn neighbors(&self, v: V) -> Vec<V> {
        self.adj[v].keys().copied().collect()
    }

    /// The incident edges of a vertex as `(neighbor, kind)` pairs.
    pub fn incident_edges(&self, v: V) -> Vec<(V, EType)> {
        self.adj[v].iter().map(|(&w, &e)| (w, e)).collect()
    }

    /// The degree of a vertex.
    pub fn degree(&self, v: V) -> usize {
        self.adj[v].len()
    }

    /// Check whether two vertices are connected.
    pub fn connected(&self, s: V, t: V) -> bool {
        self.adj[s].contains_key(&t)
    }

    /// The kind of the edge between two vertices, if present.
    pub fn edge_type_opt(&self, s: V, t: V) -> Option<EType> {
        self.adj[s].get(&t).copied()
    }

    /// Add an edge of the given kind. Panics if it already exists.
    pub fn add_edge_with_type(&mut self, s: V, t: V, ety: EType) {
        debug_assert!(s != t, "use add_edge_smart for self-loops");
        let prev = self.adj[s].insert(t, ety);
        debug_assert!(prev.is_none(), "edge already present");
        self.adj[t].insert(s, ety);
        self.nedges += 1;
    }

    /// Add a normal edge.
    pub fn add_edge(&mut self, s: V, t: V) {
        self.add_edge_with_type(s, t, EType::N);
    }

    /// Replace the kind of an existing edge.
    pub fn set_edge_type(&mut self, s: V, t: V, ety: EType) {
        self.adj[s].insert(t, ety);
        self.adj[t].insert(s, ety);
    }

    /// Toggle the kind of an existing edge.
    pub fn toggle_edge_type(&mut self, s: V, t: V) {
        let e = self.adj[s][&t].toggled();
        self.set_edge_type(s, t, e);
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, s: V, t: V) {
        self.adj[s].remove(&t);
        self.adj[t].remove(&s);
        self.nedges -= 1;
    }

    /// Add an edge, resolving self-loops and parallel edges between spiders
    /// with the complementarity rules and the matching scalar bookkeeping.
    pub fn add_edge_smart(&mut self, s: V, t: V, ety: EType) {
        let st = self.vertex_type(s);
        if s == t {
            assert!(
                st == VType::Z || st == VType::X,
                "self-loops only supported on spiders"
            );
            if ety == EType::H {
                self.add_to_phase(s, Rational64::from_integer(1));
                self.scalar.mul_sqrt2_pow(-1);
            }
            return;
        }
        let Some(ety0) = self.edge_type_opt(s, t) else {
            self.add_edge_with_type(s, t, ety);
            return;
        };
        let tt = self.vertex_type(t);
        match (st, tt) {
            (VType::Z, VType::Z) | (VType::X, VType::X) => match (ety0, ety) {
                (EType::N, EType::N) => {}
                (EType::H, EType::H) => {
                    self.remove_edge(s, t);
                    self.scalar.mul_sqrt2_pow(-2);
                }
                (EType::H, EType::N) => {
                    self.set_edge_type(s, t, EType::N);
                    self.add_to_phase(s, Rational64::from_integer(1));
                    self.scalar.mul_sqrt2_pow(-1);
                }
                (EType::N, EType::H) => {
                    self.add_to_phase(s, Rational64::from_integer(1));
                    self.scalar.mul_sqrt2_pow(-1);
                }
            },
            (VType::Z, VType::X) | (VType::X, VType::Z) => match (ety0, ety) {
                (EType::N, EType::N) => {
                    self.remove_edge(s, t);
                    self.scalar.mul_sqrt2_pow(-2);
                }
                (EType::N, EType::H) => {
                    self.set_edge_type(s, t, EType::H);
                    self.add_to_phase(s, Rational64::from_integer(1));
                    self.scalar.mul_sqrt2_pow(-1);
                }
                (EType::H, EType::N) => {
                    self.add_to_phase(s, Rational64::from_integer(1));
                    self.scalar.mul_sqrt2_pow(-1);
                }
                (EType::H, EType::H) => {}
            },
            _ => panic!("parallel edges only supported between spiders"),
        }
    }

    // =========================================================================
    // Boundaries and the scalar
    // =========================================================================

    /// The input boundary vertices, in qubit order. Entries whose boundary
    /// was converted into an ancilla spider are stale and must be skipped
    /// by the caller (see [`Diagram::make_ancilla`]).
    pub fn inputs(&self) -> &[V] {
        &self.inputs
    }

    /// The output boundary vertices, in qubit order.
    pub fn outputs(&self) -> &[V] {
        &self.outputs
    }

    /// Set the input boundary list.
    pub fn set_inputs(&mut self, inputs: Vec<V>) {
        self.inputs = inputs;
    }

    /// Set the output boundary list.
    pub fn set_outputs(&mut self, outputs: Vec<V>) {
        self.outputs = outputs;
    }

    /// The diagram scalar.
    pub fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    /// Mutable access to the diagram scalar.
    pub fn scalar_mut(&mut self) -> &mut Scalar {
        &mut self.scalar
    }

    /// Whether the accumulated global phase is zero.
    pub fn global_phase_is_zero(&self) -> bool {
        self.scalar.phase_is_zero()
    }

    /// Convert the input and output boundary at the given qubit positions
    /// into |0⟩ initialization and ⟨0| post-selection (the ancilla-is-garbage
    /// adjustment): the boundary vertices become phase-0 X-spiders.
    pub fn make_ancilla(&mut self, input_pos: usize, output_pos: usize) {
        let vin = self.inputs[input_pos];
        let vout = self.outputs[output_pos];
        for v in [vin, vout] {
            debug_assert_eq!(self.vertex_type(v), VType::B);
            self.set_vertex_type(v, VType::X);
            self.set_phase(v, Rational64::zero());
            self.scalar.mul_sqrt2_pow(-1);
        }
    }

    /// Convert all X-spiders to Z-spiders with the color-change rule.
    pub fn x_to_z(&mut self) {
        for v in self.vertices() {
            if self.vertex_type(v) == VType::X {
                self.set_vertex_type(v, VType::Z);
                for w in self.neighbors(v) {
                    self.toggle_edge_type(v, w);
                }
            }
        }
    }

    /// Remove spiders without any incident edge, folding their value
    /// (1 + e^{iπp}) into the scalar.
    pub fn remove_disconnected_spiders(&mut self) {
        for v in self.vertices() {
            if self.vertex_type(v) == VType::B || self.degree(v) > 0 {
                continue;
            }
            let p = self.phase(v);
            self.remove_vertex(v);
            if p == Rational64::from_integer(1) {
                self.scalar.set_zero();
            } else if p.is_zero() {
                self.scalar.mul_sqrt2_pow(2);
            } else if p == Rational64::new(1, 2) || p == Rational64::new(-1, 2) {
                self.scalar.mul_sqrt2_pow(1);
                self.scalar.mul_phase(p / 2);
            } else {
                // magnitude 2·cos(πp/2) is not a power of √2 and is not
                // tracked; the phase contribution is p/2 (cos(πp/2) > 0
                // for normalized p strictly inside (-1, 1))
                self.scalar.mul_phase(p / 2);
            }
        }
    }

    /// Round every spider phase that lies within `tolerance` half-turns of
    /// a Clifford angle (a multiple of π/2) onto that angle. Returns whether
    /// any phase moved.
    pub fn approximate_cliffords(&mut self, tolerance: f64) -> bool {
        let mut changed = false;
        for v in self.vertices() {
            let ty = self.vertex_type(v);
            if ty != VType::Z && ty != VType::X {
                continue;
            }
            let p = self.phase(v);
            let f = *p.numer() as f64 / *p.denom() as f64;
            let nearest = Rational64::new((f * 2.0).round() as i64, 2);
            if p != nearest {
                let nf = *nearest.numer() as f64 / *nearest.denom() as f64;
                if (f - nf).abs() <= tolerance {
                    self.set_phase(v, nearest);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Invert the diagram (adjoint): swap inputs and outputs, negate every
    /// phase, conjugate the scalar.
    pub fn invert(&mut self) {
        for v in self.vertices() {
            let p = self.phase(v);
            self.set_phase(v, -p);
        }
        std::mem::swap(&mut self.inputs, &mut self.outputs);
        self.scalar.conjugate();
    }

    /// Concatenate `other` after `self`: plug each of `self`'s outputs into
    /// the matching input of `other`. Both boundary lists must have the same
    /// length and consist of live boundary vertices.
    pub fn concat(&mut self, other: &Diagram) {
        assert_eq!(
            self.outputs.len(),
            other.inputs.len(),
            "qubit count mismatch in concat"
        );

        // import other's vertices with shifted handles
        let offset = self.vdata.len();
        for v in 0..other.vdata.len() {
            self.vdata.push(other.vdata[v]);
            self.adj.push(
                other.adj[v]
                    .iter()
                    .map(|(&w, &e)| (w + offset, e))
                    .collect(),
            );
        }
        self.nedges += other.nedges;
        self.scalar.mul(other.scalar());

        let outs = std::mem::take(&mut self.outputs);
        for (pos, &o) in outs.iter().enumerate() {
            let i2 = other.inputs[pos] + offset;
            // wires closed off by make_ancilla carry a post-selection on one
            // side and an initialization on the other; they are not plugged
            let o_is_boundary = self.contains_vertex(o) && self.vertex_type(o) == VType::B;
            let i_is_boundary = self.contains_vertex(i2) && self.vertex_type(i2) == VType::B;
            if !o_is_boundary || !i_is_boundary {
                debug_assert_eq!(o_is_boundary, i_is_boundary, "mismatched ancilla wires");
                continue;
            }

            let (n1, e1) = self.incident_edges(o)[0];
            let (n2, e2) = self.incident_edges(i2)[0];
            self.remove_vertex(o);
            self.remove_vertex(i2);
            self.add_edge_smart(n1, n2, e1.combined(e2));
        }

        self.outputs = other.outputs.iter().map(|&v| v + offset).collect();
    }
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_vertices() {
        let mut g = Diagram::new();
        let a = g.add_vertex(VType::Z);
        let b = g.add_vertex(VType::X);
        g.add_edge(a, b);
        assert_eq!(g.num_vertices(), 2);
        assert_eq!(g.num_edges(), 1);

        g.remove_vertex(b);
        assert_eq!(g.num_vertices(), 1);
        assert_eq!(g.num_edges(), 0);
        assert!(!g.contains_vertex(b));
    }

    #[test]
    fn test_parallel_h_edges_cancel() {
        let mut g = Diagram::new();
        let a = g.add_vertex(VType::Z);
        let b = g.add_vertex(VType::Z);
        g.add_edge_with_type(a, b, EType::H);
        g.add_edge_smart(a, b, EType::H);
        assert!(!g.connected(a, b));
        assert_eq!(g.scalar().sqrt2_pow, -2);
    }

    #[test]
    fn test_parallel_n_edges_between_colors_cancel() {
        let mut g = Diagram::new();
        let a = g.add_vertex(VType::Z);
        let b = g.add_vertex(VType::X);
        g.add_edge(a, b);
        g.add_edge_smart(a, b, EType::N);
        assert!(!g.connected(a, b));
    }

    #[test]
    fn test_h_self_loop_adds_pi() {
        let mut g = Diagram::new();
        let a = g.add_vertex(VType::Z);
        g.add_edge_smart(a, a, EType::H);
        assert_eq!(g.phase(a), Rational64::from_integer(1));
    }

    #[test]
    fn test_x_to_z_toggles_edges() {
        let mut g = Diagram::new();
        let a = g.add_vertex(VType::Z);
        let b = g.add_vertex(VType::X);
        g.add_edge(a, b);
        g.x_to_z();
        assert_eq!(g.vertex_type(b), VType::Z);
        assert_eq!(g.edge_type_opt(a, b), Some(EType::H));
    }

    #[test]
    fn test_invert_negates_phases() {
        let mut g = Diagram::new();
        let i = g.add_vertex(VType::B);
        let s = g.add_vertex_with(VType::Z, Rational64::new(1, 4), 0);
        let o = g.add_vertex(VType::B);
        g.add_edge(i, s);
        g.add_edge(s, o);
        g.set_inputs(vec![i]);
        g.set_outputs(vec![o]);

        g.invert();
        assert_eq!(g.phase(s), Rational64::new(-1, 4));
        assert_eq!(g.inputs(), &[o]);
        assert_eq!(g.outputs(), &[i]);
    }

    #[test]
    fn test_concat_identity_wires() {
        // two identity diagrams concatenate to one identity diagram
        let mut a = Diagram::new();
        let i1 = a.add_vertex_with(VType::B, Rational64::zero(), 0);
        let o1 = a.add_vertex_with(VType::B, Rational64::zero(), 0);
        a.add_edge(i1, o1);
        a.set_inputs(vec![i1]);
        a.set_outputs(vec![o1]);

        let mut b = Diagram::new();
        let i2 = b.add_vertex_with(VType::B, Rational64::zero(), 0);
        let o2 = b.add_vertex_with(VType::B, Rational64::zero(), 0);
        b.add_edge(i2, o2);
        b.set_inputs(vec![i2]);
        b.set_outputs(vec![o2]);

        a.concat(&b);
        assert_eq!(a.inputs().len(), 1);
        assert_eq!(a.outputs().len(), 1);
        assert_eq!(a.num_edges(), 1);
        let vin = a.inputs()[0];
        let vout = a.outputs()[0];
        assert_eq!(a.edge_type_opt(vin, vout), Some(EType::N));
    }

    #[test]
    fn test_disconnected_pauli_spider_zeroes_scalar() {
        let mut g = Diagram::new();
        g.add_vertex_with(VType::Z, Rational64::from_integer(1), -1);
        g.remove_disconnected_spiders();
        assert!(g.scalar().zero);
    }
}
