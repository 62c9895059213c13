//! The decision-diagram package.
//!
//! Vector and matrix decision diagrams are stored quasi-reduced: a path from
//! the top edge to the terminal visits every qubit level, and the all-zero
//! subtree is represented by the zero sentinel edge at any level. Nodes are
//! hash-consed through unique tables and edge weights are interned through
//! the tolerance-aware [`WeightTable`], so structurally equal functions share
//! their top node. Reference counting is explicit at the API boundary;
//! [`DdPackage::garbage_collect`] reclaims dead nodes and clears the compute
//! caches.

use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::error::{DdError, DdResult};
use crate::weights::{WeightId, WeightTable, W_ONE, W_ZERO};

/// Handle to a node in one of the package's arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// The terminal sentinel.
pub const TERMINAL: NodeId = NodeId(u32::MAX);

/// An edge: node handle plus interned weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Target node ([`TERMINAL`] for scalars and the zero sentinel).
    pub node: NodeId,
    /// Interned edge weight.
    pub weight: WeightId,
}

/// The zero sentinel edge, representing an all-zero subtree at any level.
pub const ZERO_EDGE: Edge = Edge {
    node: TERMINAL,
    weight: W_ZERO,
};

/// The six single-qubit basis states used by the stimulus generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OneQubitBasis {
    /// |0⟩
    Zero,
    /// |1⟩
    One,
    /// |+⟩
    Plus,
    /// |−⟩
    Minus,
    /// |L⟩ = (|0⟩ − i|1⟩)/√2
    Left,
    /// |R⟩ = (|0⟩ + i|1⟩)/√2
    Right,
}

impl OneQubitBasis {
    /// Amplitudes (⟨0|ψ⟩, ⟨1|ψ⟩) of the state.
    pub fn amplitudes(self) -> (Complex64, Complex64) {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        match self {
            OneQubitBasis::Zero => (Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)),
            OneQubitBasis::One => (Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)),
            OneQubitBasis::Plus => (Complex64::new(s, 0.0), Complex64::new(s, 0.0)),
            OneQubitBasis::Minus => (Complex64::new(s, 0.0), Complex64::new(-s, 0.0)),
            OneQubitBasis::Left => (Complex64::new(s, 0.0), Complex64::new(0.0, -s)),
            OneQubitBasis::Right => (Complex64::new(s, 0.0), Complex64::new(0.0, s)),
        }
    }
}

#[derive(Debug, Clone)]
struct VNode {
    level: u32,
    children: [Edge; 2],
    refs: u32,
}

#[derive(Debug, Clone)]
struct MNode {
    level: u32,
    children: [Edge; 4],
    refs: u32,
}

/// The decision-diagram package: arenas, unique tables, compute caches and
/// the weight table. One instance per checker; not shared across threads.
pub struct DdPackage {
    weights: WeightTable,

    vnodes: Vec<Option<VNode>>,
    v_unique: FxHashMap<(u32, [Edge; 2]), NodeId>,
    v_free: Vec<u32>,

    mnodes: Vec<Option<MNode>>,
    m_unique: FxHashMap<(u32, [Edge; 4]), NodeId>,
    m_free: Vec<u32>,

    cache_add_v: FxHashMap<(NodeId, NodeId, WeightId), Edge>,
    cache_add_m: FxHashMap<(NodeId, NodeId, WeightId), Edge>,
    cache_mul_mv: FxHashMap<(NodeId, NodeId), Edge>,
    cache_mul_mm: FxHashMap<(NodeId, NodeId), Edge>,
    cache_ct: FxHashMap<NodeId, Edge>,
    cache_ip_v: FxHashMap<(NodeId, NodeId), Complex64>,
    cache_ip_m: FxHashMap<(NodeId, NodeId), Complex64>,
    cache_trace: FxHashMap<NodeId, Complex64>,

    peak_nodes: usize,
}

impl DdPackage {
    /// Create a package with the given numerical tolerance.
    pub fn new(tolerance: f64) -> Self {
        Self {
            weights: WeightTable::new(tolerance),
            vnodes: vec![],
            v_unique: FxHashMap::default(),
            v_free: vec![],
            mnodes: vec![],
            m_unique: FxHashMap::default(),
            m_free: vec![],
            cache_add_v: FxHashMap::default(),
            cache_add_m: FxHashMap::default(),
            cache_mul_mv: FxHashMap::default(),
            cache_mul_mm: FxHashMap::default(),
            cache_ct: FxHashMap::default(),
            cache_ip_v: FxHashMap::default(),
            cache_ip_m: FxHashMap::default(),
            cache_trace: FxHashMap::default(),
            peak_nodes: 0,
        }
    }

    /// The configured numerical tolerance.
    pub fn tolerance(&self) -> f64 {
        self.weights.tolerance()
    }

    /// Resolve an interned weight.
    #[inline]
    pub fn weight_value(&self, id: WeightId) -> Complex64 {
        self.weights.value(id)
    }

    /// Check two weights for approximate equality under the tolerance.
    pub fn weights_approximately_equal(&self, a: WeightId, b: WeightId) -> bool {
        a == b || self.weights.approx_eq(self.weights.value(a), self.weights.value(b))
    }

    /// Number of live nodes (vector + matrix).
    pub fn num_nodes(&self) -> usize {
        let v = self.vnodes.iter().filter(|n| n.is_some()).count();
        let m = self.mnodes.iter().filter(|n| n.is_some()).count();
        v + m
    }

    /// Peak number of live nodes over the package's lifetime.
    pub fn peak_nodes(&self) -> usize {
        self.peak_nodes
    }

    fn terminal_edge(&mut self, w: Complex64) -> Edge {
        Edge {
            node: TERMINAL,
            weight: self.weights.intern(w),
        }
    }

    #[inline]
    fn val(&self, id: WeightId) -> Complex64 {
        self.weights.value(id)
    }

    fn vnode(&self, id: NodeId) -> &VNode {
        self.vnodes[id.0 as usize]
            .as_ref()
            .expect("dangling vector-node handle")
    }

    fn mnode(&self, id: NodeId) -> &MNode {
        self.mnodes[id.0 as usize]
            .as_ref()
            .expect("dangling matrix-node handle")
    }

    /// Scale an edge by a complex factor.
    pub fn scale(&mut self, e: Edge, c: Complex64) -> Edge {
        if e.weight == W_ZERO {
            return ZERO_EDGE;
        }
        let w = self.val(e.weight) * c;
        let weight = self.weights.intern(w);
        if weight == W_ZERO {
            return ZERO_EDGE;
        }
        Edge {
            node: e.node,
            weight,
        }
    }

    // =========================================================================
    // Node construction
    // =========================================================================

    fn make_vnode(&mut self, level: u32, children: [Edge; 2]) -> Edge {
        if children[0].weight == W_ZERO && children[1].weight == W_ZERO {
            return ZERO_EDGE;
        }
        let n0 = self.val(children[0].weight).norm_sqr();
        let n1 = self.val(children[1].weight).norm_sqr();
        let idx = usize::from(n1 > n0);
        let wmax = self.val(children[idx].weight);

        let mut norm = [ZERO_EDGE; 2];
        for i in 0..2 {
            if children[i].weight == W_ZERO {
                continue;
            }
            let weight = if i == idx {
                W_ONE
            } else {
                self.weights.intern(self.val(children[i].weight) / wmax)
            };
            norm[i] = Edge {
                node: children[i].node,
                weight,
            };
        }

        let key = (level, norm);
        if let Some(&node) = self.v_unique.get(&key) {
            return Edge {
                node,
                weight: self.weights.intern(wmax),
            };
        }

        let slot = match self.v_free.pop() {
            Some(s) => s,
            None => {
                self.vnodes.push(None);
                (self.vnodes.len() - 1) as u32
            }
        };
        self.vnodes[slot as usize] = Some(VNode {
            level,
            children: norm,
            refs: 0,
        });
        for c in norm {
            self.bump_node(c.node, true, 1);
        }
        let node = NodeId(slot);
        self.v_unique.insert(key, node);
        self.peak_nodes = self.peak_nodes.max(self.num_nodes());
        Edge {
            node,
            weight: self.weights.intern(wmax),
        }
    }

    fn make_mnode(&mut self, level: u32, children: [Edge; 4]) -> Edge {
        if children.iter().all(|c| c.weight == W_ZERO) {
            return ZERO_EDGE;
        }
        let mut idx = 0usize;
        let mut best = self.val(children[0].weight).norm_sqr();
        for (i, c) in children.iter().enumerate().skip(1) {
            let n = self.val(c.weight).norm_sqr();
            if n > best {
                best = n;
                idx = i;
            }
        }
        let wmax = self.val(children[idx].weight);

        let mut norm = [ZERO_EDGE; 4];
        for i in 0..4 {
            if children[i].weight == W_ZERO {
                continue;
            }
            let weight = if i == idx {
                W_ONE
            } else {
                self.weights.intern(self.val(children[i].weight) / wmax)
            };
            norm[i] = Edge {
                node: children[i].node,
                weight,
            };
        }

        let key = (level, norm);
        if let Some(&node) = self.m_unique.get(&key) {
            return Edge {
                node,
                weight: self.weights.intern(wmax),
            };
        }

        let slot = match self.m_free.pop() {
            Some(s) => s,
            None => {
                self.mnodes.push(None);
                (self.mnodes.len() - 1) as u32
            }
        };
        self.mnodes[slot as usize] = Some(MNode {
            level,
            children: norm,
            refs: 0,
        });
        for c in norm {
            self.bump_node(c.node, false, 1);
        }
        let node = NodeId(slot);
        self.m_unique.insert(key, node);
        self.peak_nodes = self.peak_nodes.max(self.num_nodes());
        Edge {
            node,
            weight: self.weights.intern(wmax),
        }
    }

    fn bump_node(&mut self, node: NodeId, vector: bool, delta: i64) {
        if node == TERMINAL {
            return;
        }
        let refs = if vector {
            &mut self.vnodes[node.0 as usize]
                .as_mut()
                .expect("dangling vector-node handle")
                .refs
        } else {
            &mut self.mnodes[node.0 as usize]
                .as_mut()
                .expect("dangling matrix-node handle")
                .refs
        };
        if delta > 0 {
            *refs += delta as u32;
        } else {
            *refs = refs.saturating_sub((-delta) as u32);
        }
    }

    // =========================================================================
    // Reference counting
    // =========================================================================

    /// Take an external reference on a vector DD.
    pub fn inc_ref_vector(&mut self, e: Edge) {
        self.bump_node(e.node, true, 1);
    }

    /// Release an external reference on a vector DD.
    pub fn dec_ref_vector(&mut self, e: Edge) {
        self.bump_node(e.node, true, -1);
    }

    /// Take an external reference on a matrix DD.
    pub fn inc_ref_matrix(&mut self, e: Edge) {
        self.bump_node(e.node, false, 1);
    }

    /// Release an external reference on a matrix DD.
    pub fn dec_ref_matrix(&mut self, e: Edge) {
        self.bump_node(e.node, false, -1);
    }

    /// Reclaim all nodes without references and clear the compute caches.
    pub fn garbage_collect(&mut self) {
        loop {
            let mut freed_any = false;

            let dead_v: Vec<u32> = self
                .vnodes
                .iter()
                .enumerate()
                .filter_map(|(i, n)| match n {
                    Some(node) if node.refs == 0 => Some(i as u32),
                    _ => None,
                })
                .collect();
            for slot in dead_v {
                let node = self.vnodes[slot as usize].take().expect("slot checked above");
                self.v_unique.remove(&(node.level, node.children));
                for c in node.children {
                    self.bump_node(c.node, true, -1);
                }
                self.v_free.push(slot);
                freed_any = true;
            }

            let dead_m: Vec<u32> = self
                .mnodes
                .iter()
                .enumerate()
                .filter_map(|(i, n)| match n {
                    Some(node) if node.refs == 0 => Some(i as u32),
                    _ => None,
                })
                .collect();
            for slot in dead_m {
                let node = self.mnodes[slot as usize].take().expect("slot checked above");
                self.m_unique.remove(&(node.level, node.children));
                for c in node.children {
                    self.bump_node(c.node, false, -1);
                }
                self.m_free.push(slot);
                freed_any = true;
            }

            if !freed_any {
                break;
            }
        }

        self.cache_add_v.clear();
        self.cache_add_m.clear();
        self.cache_mul_mv.clear();
        self.cache_mul_mm.clear();
        self.cache_ct.clear();
        self.cache_ip_v.clear();
        self.cache_ip_m.clear();
        self.cache_trace.clear();
    }

    // =========================================================================
    // State construction
    // =========================================================================

    /// The all-zeros computational basis state on `n` qubits.
    pub fn zero_state(&mut self, n: usize) -> Edge {
        let bits = vec![false; n];
        self.basis_state(&bits)
    }

    /// A computational basis state; `bits[q]` is the value of qubit `q`.
    pub fn basis_state(&mut self, bits: &[bool]) -> Edge {
        let mut e = Edge {
            node: TERMINAL,
            weight: W_ONE,
        };
        for (q, &bit) in bits.iter().enumerate() {
            let children = if bit { [ZERO_EDGE, e] } else { [e, ZERO_EDGE] };
            e = self.make_vnode(q as u32, children);
        }
        e
    }

    /// A product of single-qubit basis states.
    pub fn one_qubit_basis_state(&mut self, states: &[OneQubitBasis]) -> Edge {
        let mut e = Edge {
            node: TERMINAL,
            weight: W_ONE,
        };
        for (q, s) in states.iter().enumerate() {
            let (a, b) = s.amplitudes();
            let c0 = self.scale(e, a);
            let c1 = self.scale(e, b);
            e = self.make_vnode(q as u32, [c0, c1]);
        }
        e
    }

    /// The identity matrix DD on `n` qubits.
    pub fn identity(&mut self, n: usize) -> Edge {
        self.identity_chain(n)
    }

    fn identity_chain(&mut self, levels: usize) -> Edge {
        let mut e = Edge {
            node: TERMINAL,
            weight: W_ONE,
        };
        for q in 0..levels {
            e = self.make_mnode(q as u32, [e, ZERO_EDGE, ZERO_EDGE, e]);
        }
        e
    }

    /// Build the matrix DD of a single-qubit gate `u` applied to `target`,
    /// guarded by `controls` (`(qubit, positive)` pairs), on `n` qubits.
    pub fn make_gate(
        &mut self,
        n: usize,
        u: [Complex64; 4],
        target: usize,
        controls: &[(usize, bool)],
    ) -> DdResult<Edge> {
        if target >= n {
            return Err(DdError::QubitOutOfRange { qubit: target, n });
        }
        let mut ctrl = FxHashMap::default();
        for &(q, positive) in controls {
            if q >= n {
                return Err(DdError::QubitOutOfRange { qubit: q, n });
            }
            if q == target {
                return Err(DdError::ControlOnTarget { qubit: q });
            }
            ctrl.insert(q, positive);
        }

        let mut em = [ZERO_EDGE; 4];
        for i in 0..4 {
            em[i] = self.terminal_edge(u[i]);
        }
        let mut e = ZERO_EDGE;

        for q in 0..n {
            if q < target {
                if let Some(&positive) = ctrl.get(&q) {
                    let id_below = self.identity_chain(q);
                    for i in 0..4 {
                        let diag = i == 0 || i == 3;
                        let pass = if diag { id_below } else { ZERO_EDGE };
                        em[i] = if positive {
                            self.make_mnode(q as u32, [pass, ZERO_EDGE, ZERO_EDGE, em[i]])
                        } else {
                            self.make_mnode(q as u32, [em[i], ZERO_EDGE, ZERO_EDGE, pass])
                        };
                    }
                } else {
                    for i in 0..4 {
                        em[i] = self.make_mnode(q as u32, [em[i], ZERO_EDGE, ZERO_EDGE, em[i]]);
                    }
                }
            } else if q == target {
                e = self.make_mnode(q as u32, em);
            } else if let Some(&positive) = ctrl.get(&q) {
                let id_below = self.identity_chain(q);
                e = if positive {
                    self.make_mnode(q as u32, [id_below, ZERO_EDGE, ZERO_EDGE, e])
                } else {
                    self.make_mnode(q as u32, [e, ZERO_EDGE, ZERO_EDGE, id_below])
                };
            } else {
                e = self.make_mnode(q as u32, [e, ZERO_EDGE, ZERO_EDGE, e]);
            }
        }
        Ok(e)
    }

    /// Build the matrix DD of a (possibly controlled) SWAP between `a` and
    /// `b` via the three-CNOT identity.
    pub fn make_swap(
        &mut self,
        n: usize,
        a: usize,
        b: usize,
        controls: &[(usize, bool)],
    ) -> DdResult<Edge> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let x = [zero, one, one, zero];

        let mut ctrls_a: Vec<(usize, bool)> = controls.to_vec();
        ctrls_a.push((a, true));
        let mut ctrls_b: Vec<(usize, bool)> = controls.to_vec();
        ctrls_b.push((b, true));

        let cx_ab = self.make_gate(n, x, b, &ctrls_a)?;
        let cx_ba = self.make_gate(n, x, a, &ctrls_b)?;

        let inner = self.multiply_matrices(cx_ba, cx_ab, n);
        Ok(self.multiply_matrices(cx_ab, inner, n))
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    fn add_v(&mut self, e1: Edge, e2: Edge, level: i32) -> Edge {
        if e1.weight == W_ZERO {
            return e2;
        }
        if e2.weight == W_ZERO {
            return e1;
        }
        if level < 0 {
            let s = self.val(e1.weight) + self.val(e2.weight);
            return self.terminal_edge(s);
        }
        let (a, b) = if (e2.node, e2.weight) < (e1.node, e1.weight) {
            (e2, e1)
        } else {
            (e1, e2)
        };
        let wa = self.val(a.weight);
        let ratio_id = {
            let r = self.val(b.weight) / wa;
            self.weights.intern(r)
        };
        let key = (a.node, b.node, ratio_id);
        if let Some(&r) = self.cache_add_v.get(&key) {
            return self.scale(r, wa);
        }
        let ca = self.vnode(a.node).children;
        let cb = self.vnode(b.node).children;
        let ratio = self.val(ratio_id);
        let mut out = [ZERO_EDGE; 2];
        for i in 0..2 {
            let rb = self.scale(cb[i], ratio);
            out[i] = self.add_v(ca[i], rb, level - 1);
        }
        let res = self.make_vnode(level as u32, out);
        self.cache_add_v.insert(key, res);
        self.scale(res, wa)
    }

    fn add_m(&mut self, e1: Edge, e2: Edge, level: i32) -> Edge {
        if e1.weight == W_ZERO {
            return e2;
        }
        if e2.weight == W_ZERO {
            return e1;
        }
        if level < 0 {
            let s = self.val(e1.weight) + self.val(e2.weight);
            return self.terminal_edge(s);
        }
        let (a, b) = if (e2.node, e2.weight) < (e1.node, e1.weight) {
            (e2, e1)
        } else {
            (e1, e2)
        };
        let wa = self.val(a.weight);
        let ratio_id = {
            let r = self.val(b.weight) / wa;
            self.weights.intern(r)
        };
        let key = (a.node, b.node, ratio_id);
        if let Some(&r) = self.cache_add_m.get(&key) {
            return self.scale(r, wa);
        }
        let ca = self.mnode(a.node).children;
        let cb = self.mnode(b.node).children;
        let ratio = self.val(ratio_id);
        let mut out = [ZERO_EDGE; 4];
        for i in 0..4 {
            let rb = self.scale(cb[i], ratio);
            out[i] = self.add_m(ca[i], rb, level - 1);
        }
        let res = self.make_mnode(level as u32, out);
        self.cache_add_m.insert(key, res);
        self.scale(res, wa)
    }

    fn mul_mv(&mut self, m: Edge, v: Edge, level: i32) -> Edge {
        if m.weight == W_ZERO || v.weight == W_ZERO {
            return ZERO_EDGE;
        }
        let w = self.val(m.weight) * self.val(v.weight);
        if level < 0 {
            return self.terminal_edge(w);
        }
        let key = (m.node, v.node);
        if let Some(&r) = self.cache_mul_mv.get(&key) {
            return self.scale(r, w);
        }
        let mc = self.mnode(m.node).children;
        let vc = self.vnode(v.node).children;
        let mut out = [ZERO_EDGE; 2];
        for row in 0..2 {
            let p0 = self.mul_mv(mc[2 * row], vc[0], level - 1);
            let p1 = self.mul_mv(mc[2 * row + 1], vc[1], level - 1);
            out[row] = self.add_v(p0, p1, level - 1);
        }
        let res = self.make_vnode(level as u32, out);
        self.cache_mul_mv.insert(key, res);
        self.scale(res, w)
    }

    fn mul_mm(&mut self, a: Edge, b: Edge, level: i32) -> Edge {
        if a.weight == W_ZERO || b.weight == W_ZERO {
            return ZERO_EDGE;
        }
        let w = self.val(a.weight) * self.val(b.weight);
        if level < 0 {
            return self.terminal_edge(w);
        }
        let key = (a.node, b.node);
        if let Some(&r) = self.cache_mul_mm.get(&key) {
            return self.scale(r, w);
        }
        let ac = self.mnode(a.node).children;
        let bc = self.mnode(b.node).children;
        let mut out = [ZERO_EDGE; 4];
        for i in 0..2 {
            for j in 0..2 {
                let p0 = self.mul_mm(ac[2 * i], bc[j], level - 1);
                let p1 = self.mul_mm(ac[2 * i + 1], bc[2 + j], level - 1);
                out[2 * i + j] = self.add_m(p0, p1, level - 1);
            }
        }
        let res = self.make_mnode(level as u32, out);
        self.cache_mul_mm.insert(key, res);
        self.scale(res, w)
    }

    /// Apply a matrix DD to a vector DD: `m · v` on `n` qubits.
    pub fn apply_matrix(&mut self, m: Edge, v: Edge, n: usize) -> Edge {
        self.mul_mv(m, v, n as i32 - 1)
    }

    /// Multiply two matrix DDs: `a · b` on `n` qubits.
    pub fn multiply_matrices(&mut self, a: Edge, b: Edge, n: usize) -> Edge {
        self.mul_mm(a, b, n as i32 - 1)
    }

    /// The conjugate transpose of a matrix DD on `n` qubits.
    pub fn conjugate_transpose(&mut self, e: Edge, n: usize) -> Edge {
        self.ct_rec(e, n as i32 - 1)
    }

    fn ct_rec(&mut self, e: Edge, level: i32) -> Edge {
        if e.weight == W_ZERO {
            return ZERO_EDGE;
        }
        if level < 0 {
            let w = self.val(e.weight).conj();
            return self.terminal_edge(w);
        }
        let wconj = self.val(e.weight).conj();
        if let Some(&r) = self.cache_ct.get(&e.node) {
            return self.scale(r, wconj);
        }
        let c = self.mnode(e.node).children;
        let out = [
            self.ct_rec(c[0], level - 1),
            self.ct_rec(c[2], level - 1),
            self.ct_rec(c[1], level - 1),
            self.ct_rec(c[3], level - 1),
        ];
        let res = self.make_mnode(level as u32, out);
        self.cache_ct.insert(e.node, res);
        self.scale(res, wconj)
    }

    /// Inner product ⟨e|f⟩ of two vector DDs on `n` qubits.
    pub fn inner_product(&mut self, e: Edge, f: Edge, n: usize) -> Complex64 {
        self.ip_v_rec(e, f, n as i32 - 1)
    }

    fn ip_v_rec(&mut self, e: Edge, f: Edge, level: i32) -> Complex64 {
        if e.weight == W_ZERO || f.weight == W_ZERO {
            return Complex64::new(0.0, 0.0);
        }
        let w = self.val(e.weight).conj() * self.val(f.weight);
        if level < 0 {
            return w;
        }
        let key = (e.node, f.node);
        if let Some(&r) = self.cache_ip_v.get(&key) {
            return w * r;
        }
        let ec = self.vnode(e.node).children;
        let fc = self.vnode(f.node).children;
        let mut sum = Complex64::new(0.0, 0.0);
        for i in 0..2 {
            sum += self.ip_v_rec(ec[i], fc[i], level - 1);
        }
        self.cache_ip_v.insert(key, sum);
        w * sum
    }

    /// Frobenius inner product tr(E†F) of two matrix DDs on `n` qubits.
    pub fn frobenius_inner(&mut self, e: Edge, f: Edge, n: usize) -> Complex64 {
        self.ip_m_rec(e, f, n as i32 - 1)
    }

    fn ip_m_rec(&mut self, e: Edge, f: Edge, level: i32) -> Complex64 {
        if e.weight == W_ZERO || f.weight == W_ZERO {
            return Complex64::new(0.0, 0.0);
        }
        let w = self.val(e.weight).conj() * self.val(f.weight);
        if level < 0 {
            return w;
        }
        let key = (e.node, f.node);
        if let Some(&r) = self.cache_ip_m.get(&key) {
            return w * r;
        }
        let ec = self.mnode(e.node).children;
        let fc = self.mnode(f.node).children;
        let mut sum = Complex64::new(0.0, 0.0);
        for i in 0..4 {
            sum += self.ip_m_rec(ec[i], fc[i], level - 1);
        }
        self.cache_ip_m.insert(key, sum);
        w * sum
    }

    /// Frobenius fidelity |tr(E†F)| / √(tr(E†E)·tr(F†F)) of two matrix DDs.
    /// Well-defined for ancilla- and garbage-reduced (non-unitary) matrices.
    pub fn matrix_fidelity(&mut self, e: Edge, f: Edge, n: usize) -> f64 {
        let ef = self.frobenius_inner(e, f, n).norm();
        let ee = self.frobenius_inner(e, e, n).re;
        let ff = self.frobenius_inner(f, f, n).re;
        if ee <= 0.0 || ff <= 0.0 {
            return if ee <= 0.0 && ff <= 0.0 { 1.0 } else { 0.0 };
        }
        ef / (ee.sqrt() * ff.sqrt())
    }

    fn normalized_trace(&mut self, e: Edge, level: i32) -> Complex64 {
        if e.weight == W_ZERO {
            return Complex64::new(0.0, 0.0);
        }
        if level < 0 {
            return self.val(e.weight);
        }
        let w = self.val(e.weight);
        if let Some(&t) = self.cache_trace.get(&e.node) {
            return w * t;
        }
        let c = self.mnode(e.node).children;
        let t0 = self.normalized_trace(c[0], level - 1);
        let t3 = self.normalized_trace(c[3], level - 1);
        let t = (t0 + t3) / 2.0;
        self.cache_trace.insert(e.node, t);
        w * t
    }

    /// Check whether a matrix DD is close to the identity (up to a global
    /// phase) by comparing its normalized trace magnitude |tr(U)|/2ⁿ to 1.
    pub fn is_close_to_identity(&mut self, e: Edge, n: usize, threshold: f64) -> bool {
        let t = self.normalized_trace(e, n as i32 - 1);
        (t.norm() - 1.0).abs() < threshold
    }

    // =========================================================================
    // Ancillary and garbage reductions
    // =========================================================================

    /// Reduce the effect of ancillary qubits on a matrix DD: project
    /// ancillary inputs to |0⟩; for ancillary qubits that are also garbage,
    /// additionally fold the |1⟩ output row into the |0⟩ row.
    pub fn reduce_ancillae(&mut self, e: Edge, ancillary: &[bool], garbage: &[bool]) -> Edge {
        let mut memo = FxHashMap::default();
        self.reduce_anc_rec(e, ancillary, garbage, ancillary.len() as i32 - 1, &mut memo)
    }

    fn reduce_anc_rec(
        &mut self,
        e: Edge,
        ancillary: &[bool],
        garbage: &[bool],
        level: i32,
        memo: &mut FxHashMap<NodeId, Edge>,
    ) -> Edge {
        if e.weight == W_ZERO || level < 0 {
            return e;
        }
        let w = self.val(e.weight);
        if let Some(&r) = memo.get(&e.node) {
            return self.scale(r, w);
        }
        let c = self.mnode(e.node).children;
        let mut rc = [ZERO_EDGE; 4];
        for i in 0..4 {
            rc[i] = self.reduce_anc_rec(c[i], ancillary, garbage, level - 1, memo);
        }
        let q = level as usize;
        let arr = if ancillary[q] {
            if garbage[q] {
                let folded = self.add_m(rc[0], rc[2], level - 1);
                [folded, ZERO_EDGE, ZERO_EDGE, ZERO_EDGE]
            } else {
                [rc[0], ZERO_EDGE, rc[2], ZERO_EDGE]
            }
        } else {
            rc
        };
        let res = self.make_mnode(level as u32, arr);
        memo.insert(e.node, res);
        self.scale(res, w)
    }

    /// Fold the output rows of garbage qubits of a matrix DD into the |0⟩
    /// row (partial-equivalence reduction).
    pub fn reduce_garbage(&mut self, e: Edge, garbage: &[bool]) -> Edge {
        let mut memo = FxHashMap::default();
        self.reduce_garbage_rec(e, garbage, garbage.len() as i32 - 1, &mut memo)
    }

    fn reduce_garbage_rec(
        &mut self,
        e: Edge,
        garbage: &[bool],
        level: i32,
        memo: &mut FxHashMap<NodeId, Edge>,
    ) -> Edge {
        if e.weight == W_ZERO || level < 0 {
            return e;
        }
        let w = self.val(e.weight);
        if let Some(&r) = memo.get(&e.node) {
            return self.scale(r, w);
        }
        let c = self.mnode(e.node).children;
        let mut rc = [ZERO_EDGE; 4];
        for i in 0..4 {
            rc[i] = self.reduce_garbage_rec(c[i], garbage, level - 1, memo);
        }
        let arr = if garbage[level as usize] {
            let r0 = self.add_m(rc[0], rc[2], level - 1);
            let r1 = self.add_m(rc[1], rc[3], level - 1);
            [r0, r1, ZERO_EDGE, ZERO_EDGE]
        } else {
            rc
        };
        let res = self.make_mnode(level as u32, arr);
        memo.insert(e.node, res);
        self.scale(res, w)
    }

    /// Fold the amplitudes of garbage qubits of a vector DD into the |0⟩
    /// branch.
    pub fn reduce_garbage_vector(&mut self, e: Edge, garbage: &[bool]) -> Edge {
        let mut memo = FxHashMap::default();
        self.reduce_garbage_vec_rec(e, garbage, garbage.len() as i32 - 1, &mut memo)
    }

    fn reduce_garbage_vec_rec(
        &mut self,
        e: Edge,
        garbage: &[bool],
        level: i32,
        memo: &mut FxHashMap<NodeId, Edge>,
    ) -> Edge {
        if e.weight == W_ZERO || level < 0 {
            return e;
        }
        let w = self.val(e.weight);
        if let Some(&r) = memo.get(&e.node) {
            return self.scale(r, w);
        }
        let c = self.vnode(e.node).children;
        let rc = [
            self.reduce_garbage_vec_rec(c[0], garbage, level - 1, memo),
            self.reduce_garbage_vec_rec(c[1], garbage, level - 1, memo),
        ];
        let arr = if garbage[level as usize] {
            let folded = self.add_v(rc[0], rc[1], level - 1);
            [folded, ZERO_EDGE]
        } else {
            rc
        };
        let res = self.make_vnode(level as u32, arr);
        memo.insert(e.node, res);
        self.scale(res, w)
    }

    // =========================================================================
    // Inspection helpers
    // =========================================================================

    /// Number of distinct matrix nodes reachable from an edge.
    pub fn matrix_dd_size(&self, e: Edge) -> usize {
        let mut seen = FxHashMap::default();
        let mut stack = vec![e.node];
        while let Some(node) = stack.pop() {
            if node == TERMINAL || seen.insert(node, ()).is_some() {
                continue;
            }
            for c in self.mnode(node).children {
                stack.push(c.node);
            }
        }
        seen.len()
    }

    /// The amplitude ⟨bits|ψ⟩ of a vector DD.
    pub fn amplitude(&self, e: Edge, bits: &[bool]) -> Complex64 {
        let mut w = self.val(e.weight);
        let mut node = e.node;
        for q in (0..bits.len()).rev() {
            if w.norm_sqr() == 0.0 || node == TERMINAL {
                return Complex64::new(0.0, 0.0);
            }
            let c = self.vnode(node).children[usize::from(bits[q])];
            if c.weight == W_ZERO {
                return Complex64::new(0.0, 0.0);
            }
            w *= self.val(c.weight);
            node = c.node;
        }
        w
    }

    /// The entry ⟨row|U|col⟩ of a matrix DD.
    pub fn matrix_entry(&self, e: Edge, row: &[bool], col: &[bool]) -> Complex64 {
        debug_assert_eq!(row.len(), col.len());
        let mut w = self.val(e.weight);
        let mut node = e.node;
        for q in (0..row.len()).rev() {
            if w.norm_sqr() == 0.0 || node == TERMINAL {
                return Complex64::new(0.0, 0.0);
            }
            let idx = 2 * usize::from(row[q]) + usize::from(col[q]);
            let c = self.mnode(node).children[idx];
            if c.weight == W_ZERO {
                return Complex64::new(0.0, 0.0);
            }
            w *= self.val(c.weight);
            node = c.node;
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const TOL: f64 = 2e-13;

    fn x_matrix() -> [Complex64; 4] {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        [zero, one, one, zero]
    }

    fn h_matrix() -> [Complex64; 4] {
        let s = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
        [s, s, s, -s]
    }

    #[test]
    fn test_basis_state_amplitudes() {
        let mut dd = DdPackage::new(TOL);
        let e = dd.basis_state(&[true, false, true]);
        assert_abs_diff_eq!(dd.amplitude(e, &[true, false, true]).re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dd.amplitude(e, &[false, false, true]).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identity_is_close_to_identity() {
        let mut dd = DdPackage::new(TOL);
        let id = dd.identity(4);
        assert!(dd.is_close_to_identity(id, 4, 1e-8));
        assert_abs_diff_eq!(dd.matrix_entry(id, &[false; 4], &[false; 4]).re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_x_flips_basis_state() {
        let mut dd = DdPackage::new(TOL);
        let zero = dd.zero_state(2);
        let x0 = dd.make_gate(2, x_matrix(), 0, &[]).unwrap();
        let flipped = dd.apply_matrix(x0, zero, 2);
        assert_abs_diff_eq!(
            dd.amplitude(flipped, &[true, false]).re,
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_h_squared_is_identity() {
        let mut dd = DdPackage::new(TOL);
        let h = dd.make_gate(3, h_matrix(), 1, &[]).unwrap();
        let hh = dd.multiply_matrices(h, h, 3);
        let id = dd.identity(3);
        assert_eq!(hh.node, id.node);
        assert!(dd.weights_approximately_equal(hh.weight, id.weight));
    }

    #[test]
    fn test_cx_on_basis_states() {
        let mut dd = DdPackage::new(TOL);
        let cx = dd.make_gate(2, x_matrix(), 1, &[(0, true)]).unwrap();

        // |10⟩ (qubit 0 set) → |11⟩
        let s10 = dd.basis_state(&[true, false]);
        let out = dd.apply_matrix(cx, s10, 2);
        assert_abs_diff_eq!(dd.amplitude(out, &[true, true]).re, 1.0, epsilon = 1e-12);

        // |00⟩ stays put
        let s00 = dd.basis_state(&[false, false]);
        let out = dd.apply_matrix(cx, s00, 2);
        assert_abs_diff_eq!(dd.amplitude(out, &[false, false]).re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_control() {
        let mut dd = DdPackage::new(TOL);
        let cx_neg = dd.make_gate(2, x_matrix(), 1, &[(0, false)]).unwrap();
        let s00 = dd.basis_state(&[false, false]);
        let out = dd.apply_matrix(cx_neg, s00, 2);
        assert_abs_diff_eq!(dd.amplitude(out, &[false, true]).re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bell_state() {
        let mut dd = DdPackage::new(TOL);
        let h = dd.make_gate(2, h_matrix(), 0, &[]).unwrap();
        let cx = dd.make_gate(2, x_matrix(), 1, &[(0, true)]).unwrap();
        let zero = dd.zero_state(2);
        let plus = dd.apply_matrix(h, zero, 2);
        let bell = dd.apply_matrix(cx, plus, 2);

        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(dd.amplitude(bell, &[false, false]).re, s, epsilon = 1e-12);
        assert_abs_diff_eq!(dd.amplitude(bell, &[true, true]).re, s, epsilon = 1e-12);
        assert_abs_diff_eq!(dd.amplitude(bell, &[true, false]).norm(), 0.0, epsilon = 1e-12);

        let norm = dd.inner_product(bell, bell, 2);
        assert_abs_diff_eq!(norm.re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_swap_exchanges_qubits() {
        let mut dd = DdPackage::new(TOL);
        let swap = dd.make_swap(2, 0, 1, &[]).unwrap();
        let s10 = dd.basis_state(&[true, false]);
        let out = dd.apply_matrix(swap, s10, 2);
        assert_abs_diff_eq!(dd.amplitude(out, &[false, true]).re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_conjugate_transpose_inverts() {
        let mut dd = DdPackage::new(TOL);
        let s_mat = [
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 1.0),
        ];
        let s = dd.make_gate(2, s_mat, 0, &[]).unwrap();
        let sdg = dd.conjugate_transpose(s, 2);
        let prod = dd.multiply_matrices(s, sdg, 2);
        assert!(dd.is_close_to_identity(prod, 2, 1e-8));
    }

    #[test]
    fn test_global_phase_detected_by_trace() {
        let mut dd = DdPackage::new(TOL);
        let id = dd.identity(2);
        let phased = dd.scale(id, Complex64::from_polar(1.0, 1.0));
        // still identity up to a global phase
        assert!(dd.is_close_to_identity(phased, 2, 1e-8));
        // but the top weights differ
        assert!(!dd.weights_approximately_equal(phased.weight, id.weight));
    }

    #[test]
    fn test_z_is_not_identity() {
        let mut dd = DdPackage::new(TOL);
        let z_mat = [
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(-1.0, 0.0),
        ];
        let z = dd.make_gate(1, z_mat, 0, &[]).unwrap();
        assert!(!dd.is_close_to_identity(z, 1, 1e-8));
    }

    #[test]
    fn test_one_qubit_basis_states() {
        let mut dd = DdPackage::new(TOL);
        let e = dd.one_qubit_basis_state(&[OneQubitBasis::Plus, OneQubitBasis::Zero]);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(dd.amplitude(e, &[false, false]).re, s, epsilon = 1e-12);
        assert_abs_diff_eq!(dd.amplitude(e, &[true, false]).re, s, epsilon = 1e-12);
        assert_abs_diff_eq!(dd.amplitude(e, &[false, true]).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inner_product_orthogonal() {
        let mut dd = DdPackage::new(TOL);
        let a = dd.basis_state(&[false, false]);
        let b = dd.basis_state(&[true, false]);
        assert_abs_diff_eq!(dd.inner_product(a, b, 2).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reduce_garbage_vector_folds_amplitude() {
        let mut dd = DdPackage::new(TOL);
        // |01⟩ with qubit 1 garbage reduces to |00⟩
        let e = dd.basis_state(&[false, true]);
        let reduced = dd.reduce_garbage_vector(e, &[false, true]);
        assert_abs_diff_eq!(
            dd.amplitude(reduced, &[false, false]).re,
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_reduce_ancillae_garbage_equates_x_and_identity() {
        let mut dd = DdPackage::new(TOL);
        // X on an ancillary+garbage qubit is indistinguishable from identity
        let x1 = dd.make_gate(2, x_matrix(), 1, &[]).unwrap();
        let id = dd.identity(2);
        let anc = [false, true];
        let grb = [false, true];
        let rx = dd.reduce_ancillae(x1, &anc, &grb);
        let ri = dd.reduce_ancillae(id, &anc, &grb);
        assert_eq!(rx.node, ri.node);
        assert!(dd.weights_approximately_equal(rx.weight, ri.weight));
    }

    #[test]
    fn test_matrix_fidelity_reduced() {
        let mut dd = DdPackage::new(TOL);
        let x1 = dd.make_gate(2, x_matrix(), 1, &[]).unwrap();
        let id = dd.identity(2);
        assert!(dd.matrix_fidelity(x1, x1, 2) > 1.0 - 1e-10);
        assert!(dd.matrix_fidelity(x1, id, 2) < 0.5);
    }

    #[test]
    fn test_refcount_and_gc() {
        let mut dd = DdPackage::new(TOL);
        let keep = dd.basis_state(&[true, true]);
        dd.inc_ref_vector(keep);
        let _scratch = dd.basis_state(&[false, true]);
        let before = dd.num_nodes();
        dd.garbage_collect();
        assert!(dd.num_nodes() < before);
        // the referenced state survives
        assert_abs_diff_eq!(dd.amplitude(keep, &[true, true]).re, 1.0, epsilon = 1e-12);
        assert!(dd.peak_nodes() >= before);
    }
}
