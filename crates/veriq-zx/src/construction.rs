//! Circuit-to-diagram construction.

use num_rational::Rational64;
use num_traits::Zero;
use std::f64::consts::PI;

use veriq_ir::{Circuit, ControlPolarity, Operation, OperationKind, StandardGate};

use crate::diagram::{Diagram, EType, VType, V};
use crate::error::{ZxError, ZxResult};

/// Snap an angle (radians) to a rational number of half-turns. Angles
/// within `tol` (radians) of a multiple of π/2²⁰ are represented exactly on
/// the finest grid that matches; everything else is rounded onto that grid.
pub fn rational_half_turns(angle: f64, tol: f64) -> Option<Rational64> {
    if !angle.is_finite() {
        return None;
    }
    let h = angle / PI;
    let tol_h = (tol / PI).max(1e-11);
    let mut den = 1i64;
    while den <= (1 << 20) {
        let num = (h * den as f64).round();
        if (h - num / den as f64).abs() <= tol_h {
            return Some(Rational64::new(num as i64, den));
        }
        den *= 2;
    }
    let den = 1i64 << 20;
    Some(Rational64::new((h * den as f64).round() as i64, den))
}

/// Builds ZX-diagrams from circuits.
pub struct Construction {
    phase_tolerance: f64,
}

impl Construction {
    /// Create a builder with the given angle-snapping tolerance (radians).
    pub fn new(phase_tolerance: f64) -> Self {
        Self { phase_tolerance }
    }

    /// Check whether every operation of the circuit can be encoded.
    pub fn transformable(circ: &Circuit) -> bool {
        circ.ops.iter().all(Self::op_transformable)
    }

    fn op_transformable(op: &Operation) -> bool {
        if op.is_barrier() {
            return true;
        }
        if !op.is_unitary() || op.is_symbolic() {
            return false;
        }
        if !op.controls.is_empty() {
            if op.controls.len() > 1 {
                return false;
            }
            return matches!(
                op.kind,
                OperationKind::Gate(StandardGate::X) | OperationKind::Gate(StandardGate::Z)
            );
        }
        match &op.kind {
            OperationKind::Compound(ops) => ops.iter().all(Self::op_transformable),
            OperationKind::Gate(g) => !matches!(
                g,
                StandardGate::CH | StandardGate::CCX | StandardGate::CSwap
            ),
            _ => false,
        }
    }

    /// Build the functionality diagram of a circuit.
    pub fn build(&self, circ: &Circuit) -> ZxResult<Diagram> {
        let n = circ.num_qubits();
        let mut g = Diagram::new();

        let mut inputs = Vec::with_capacity(n);
        for q in 0..n {
            let v = g.add_vertex_with(VType::B, Rational64::zero(), q as i32);
            inputs.push(v);
        }
        g.set_inputs(inputs.clone());

        let mut frontier = inputs;
        for op in &circ.ops {
            self.emit(&mut g, &mut frontier, op)?;
        }

        let mut outputs = Vec::with_capacity(n);
        for (q, &last) in frontier.iter().enumerate() {
            let v = g.add_vertex_with(VType::B, Rational64::zero(), q as i32);
            g.add_edge(last, v);
            outputs.push(v);
        }
        g.set_outputs(outputs);
        Ok(g)
    }

    fn snap(&self, angle: f64) -> ZxResult<Rational64> {
        rational_half_turns(angle, self.phase_tolerance)
            .ok_or_else(|| ZxError::Unsupported("non-finite rotation angle".into()))
    }

    fn add_spider(
        g: &mut Diagram,
        frontier: &mut [V],
        wire: usize,
        ty: VType,
        et: EType,
        phase: Rational64,
    ) -> V {
        let v = g.add_vertex_with(ty, phase, wire as i32);
        g.add_edge_smart(frontier[wire], v, et);
        frontier[wire] = v;
        v
    }

    fn emit_zphase(g: &mut Diagram, frontier: &mut [V], wire: usize, h: Rational64) {
        Self::add_spider(g, frontier, wire, VType::Z, EType::N, h);
    }

    fn emit_xphase(g: &mut Diagram, frontier: &mut [V], wire: usize, h: Rational64) {
        Self::add_spider(g, frontier, wire, VType::X, EType::N, h);
    }

    fn emit_h(g: &mut Diagram, frontier: &mut [V], wire: usize) {
        Self::add_spider(g, frontier, wire, VType::Z, EType::H, Rational64::zero());
    }

    /// Exact X gate: an X-spider with phase π carries an extra factor
    /// e^{iπ/2} that is compensated on the scalar.
    fn emit_x(g: &mut Diagram, frontier: &mut [V], wire: usize) {
        Self::emit_xphase(g, frontier, wire, Rational64::from_integer(1));
        g.scalar_mut().mul_phase(Rational64::new(-1, 2));
    }

    fn emit_rx(g: &mut Diagram, frontier: &mut [V], wire: usize, h: Rational64) {
        Self::emit_xphase(g, frontier, wire, h);
        g.scalar_mut().mul_phase(-h / 2);
    }

    fn emit_rz(g: &mut Diagram, frontier: &mut [V], wire: usize, h: Rational64) {
        Self::emit_zphase(g, frontier, wire, h);
        g.scalar_mut().mul_phase(-h / 2);
    }

    /// Ry(θ) = S · Rx(θ) · S†.
    fn emit_ry(g: &mut Diagram, frontier: &mut [V], wire: usize, h: Rational64) {
        Self::emit_zphase(g, frontier, wire, Rational64::new(-1, 2));
        Self::emit_rx(g, frontier, wire, h);
        Self::emit_zphase(g, frontier, wire, Rational64::new(1, 2));
    }

    fn emit_cx(g: &mut Diagram, frontier: &mut [V], control: usize, target: usize) {
        let vc = Self::add_spider(g, frontier, control, VType::Z, EType::N, Rational64::zero());
        let vt = Self::add_spider(g, frontier, target, VType::X, EType::N, Rational64::zero());
        g.add_edge_smart(vc, vt, EType::N);
        g.scalar_mut().mul_sqrt2_pow(1);
    }

    fn emit_cz(g: &mut Diagram, frontier: &mut [V], a: usize, b: usize) {
        let va = Self::add_spider(g, frontier, a, VType::Z, EType::N, Rational64::zero());
        let vb = Self::add_spider(g, frontier, b, VType::Z, EType::N, Rational64::zero());
        g.add_edge_smart(va, vb, EType::H);
        g.scalar_mut().mul_sqrt2_pow(1);
    }

    fn emit(&self, g: &mut Diagram, frontier: &mut [V], op: &Operation) -> ZxResult<()> {
        if op.is_barrier() {
            return Ok(());
        }
        if !op.is_unitary() {
            return Err(ZxError::Unsupported(format!(
                "non-unitary operation '{}'",
                op.name()
            )));
        }

        // deferred-measurement controls: only single controls on X/Z bases
        if !op.controls.is_empty() {
            if op.controls.len() > 1 {
                return Err(ZxError::Unsupported("multiply-controlled operation".into()));
            }
            let ctl = op.controls[0];
            let c = ctl.qubit.index();
            let negated = ctl.polarity == ControlPolarity::Negative;
            if negated {
                Self::emit_x(g, frontier, c);
            }
            match &op.kind {
                OperationKind::Gate(StandardGate::X) => {
                    Self::emit_cx(g, frontier, c, op.qubits[0].index());
                }
                OperationKind::Gate(StandardGate::Z) => {
                    Self::emit_cz(g, frontier, c, op.qubits[0].index());
                }
                _ => {
                    return Err(ZxError::Unsupported(format!(
                        "controlled '{}' gate",
                        op.name()
                    )));
                }
            }
            if negated {
                Self::emit_x(g, frontier, c);
            }
            return Ok(());
        }

        if let OperationKind::Compound(ops) = &op.kind {
            for inner in ops {
                self.emit(g, frontier, inner)?;
            }
            return Ok(());
        }

        let OperationKind::Gate(gate) = &op.kind else {
            return Err(ZxError::Unsupported(format!(
                "operation '{}'",
                op.name()
            )));
        };
        let wire = |i: usize| op.qubits[i].index();
        let angle = |p: &veriq_ir::Parameter| {
            p.evaluate()
                .ok_or_else(|| ZxError::Unsupported("unbound symbolic parameter".into()))
        };

        match gate {
            StandardGate::I => {}
            StandardGate::Z => Self::emit_zphase(g, frontier, wire(0), Rational64::from_integer(1)),
            StandardGate::S => Self::emit_zphase(g, frontier, wire(0), Rational64::new(1, 2)),
            StandardGate::Sdg => Self::emit_zphase(g, frontier, wire(0), Rational64::new(-1, 2)),
            StandardGate::T => Self::emit_zphase(g, frontier, wire(0), Rational64::new(1, 4)),
            StandardGate::Tdg => Self::emit_zphase(g, frontier, wire(0), Rational64::new(-1, 4)),
            StandardGate::P(p) => {
                let h = self.snap(angle(p)?)?;
                Self::emit_zphase(g, frontier, wire(0), h);
            }
            StandardGate::Rz(p) => {
                let h = self.snap(angle(p)?)?;
                Self::emit_rz(g, frontier, wire(0), h);
            }
            StandardGate::X => Self::emit_x(g, frontier, wire(0)),
            StandardGate::SX => Self::emit_xphase(g, frontier, wire(0), Rational64::new(1, 2)),
            StandardGate::SXdg => Self::emit_xphase(g, frontier, wire(0), Rational64::new(-1, 2)),
            StandardGate::Rx(p) => {
                let h = self.snap(angle(p)?)?;
                Self::emit_rx(g, frontier, wire(0), h);
            }
            StandardGate::Y => {
                // Y = i·X·Z: the spider pair is exact
                Self::emit_zphase(g, frontier, wire(0), Rational64::from_integer(1));
                Self::emit_xphase(g, frontier, wire(0), Rational64::from_integer(1));
            }
            StandardGate::Ry(p) => {
                let h = self.snap(angle(p)?)?;
                Self::emit_ry(g, frontier, wire(0), h);
            }
            StandardGate::H => Self::emit_h(g, frontier, wire(0)),
            StandardGate::U(t, ph, la) => {
                let ht = self.snap(angle(t)?)?;
                let hph = self.snap(angle(ph)?)?;
                let hla = self.snap(angle(la)?)?;
                Self::emit_rz(g, frontier, wire(0), hla);
                Self::emit_ry(g, frontier, wire(0), ht);
                Self::emit_rz(g, frontier, wire(0), hph);
                g.scalar_mut().mul_phase((hph + hla) / 2);
            }
            StandardGate::GPhase(p) => {
                let h = self.snap(angle(p)?)?;
                g.scalar_mut().mul_phase(h);
            }
            StandardGate::CX => Self::emit_cx(g, frontier, wire(0), wire(1)),
            StandardGate::CZ => Self::emit_cz(g, frontier, wire(0), wire(1)),
            StandardGate::CY => {
                // CY = S_t · CX · S†_t
                Self::emit_zphase(g, frontier, wire(1), Rational64::new(-1, 2));
                Self::emit_cx(g, frontier, wire(0), wire(1));
                Self::emit_zphase(g, frontier, wire(1), Rational64::new(1, 2));
            }
            StandardGate::Swap => frontier.swap(wire(0), wire(1)),
            StandardGate::CH | StandardGate::CCX | StandardGate::CSwap => {
                return Err(ZxError::Unsupported(format!("'{}' gate", gate.name())));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use veriq_ir::QubitId;

    use crate::simplify::full_reduce;

    fn build(circ: &Circuit) -> Diagram {
        Construction::new(1e-12).build(circ).unwrap()
    }

    /// Reduce the miter of two circuits and check it collapses to plain
    /// identity wires.
    fn miter_reduces_to_identity(c1: &Circuit, c2: &Circuit) -> bool {
        let mut miter = build(c1);
        miter.invert();
        miter.concat(&build(c2));
        let abort = AtomicBool::new(false);
        full_reduce(&mut miter, &abort);

        if miter.num_edges() != c1.num_qubits() {
            return false;
        }
        for &vin in miter.inputs() {
            let edges = miter.incident_edges(vin);
            if edges.len() != 1 {
                return false;
            }
            let (out, et) = edges[0];
            if et != EType::N || !miter.outputs().contains(&out) || miter.qubit(out) != miter.qubit(vin)
            {
                return false;
            }
        }
        true
    }

    #[test]
    fn test_self_miter_reduces() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.h(QubitId(0)).unwrap();
        c.cx(QubitId(0), QubitId(1)).unwrap();
        c.t(QubitId(1)).unwrap();
        assert!(miter_reduces_to_identity(&c, &c.clone()));
    }

    #[test]
    fn test_hadamard_sandwich_equals_reversed_cx() {
        // H ⊗ H conjugation reverses the direction of a CNOT
        let mut c1 = Circuit::with_size("c1", 2, 0);
        c1.h(QubitId(0)).unwrap();
        c1.h(QubitId(1)).unwrap();
        c1.cx(QubitId(0), QubitId(1)).unwrap();
        c1.h(QubitId(0)).unwrap();
        c1.h(QubitId(1)).unwrap();

        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.cx(QubitId(1), QubitId(0)).unwrap();

        assert!(miter_reduces_to_identity(&c1, &c2));
    }

    #[test]
    fn test_x_vs_z_does_not_reduce() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.x(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.z(QubitId(0)).unwrap();
        assert!(!miter_reduces_to_identity(&c1, &c2));
    }

    #[test]
    fn test_global_phase_shows_in_scalar() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.h(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.gphase(std::f64::consts::PI).unwrap();
        c2.h(QubitId(0)).unwrap();

        let mut miter = build(&c1);
        miter.invert();
        miter.concat(&build(&c2));
        let abort = AtomicBool::new(false);
        full_reduce(&mut miter, &abort);
        assert_eq!(miter.num_edges(), 1);
        assert!(!miter.global_phase_is_zero());
    }

    #[test]
    fn test_swap_is_a_wire_crossing() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.swap(QubitId(0), QubitId(1)).unwrap();
        let g = build(&c);
        // no spiders at all, just crossed wires
        assert_eq!(g.num_vertices(), 4);
        assert_eq!(g.num_edges(), 2);
        let i0 = g.inputs()[0];
        let (o, _) = g.incident_edges(i0)[0];
        assert_eq!(g.qubit(o), 1);
    }

    #[test]
    fn test_transformable() {
        let mut ok = Circuit::with_size("ok", 2, 0);
        ok.h(QubitId(0)).unwrap();
        ok.cx(QubitId(0), QubitId(1)).unwrap();
        assert!(Construction::transformable(&ok));

        let mut bad = Circuit::with_size("bad", 3, 0);
        bad.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        assert!(!Construction::transformable(&bad));
    }

    #[test]
    fn test_rational_half_turns() {
        let q = rational_half_turns(PI / 2.0, 1e-12).unwrap();
        assert_eq!(q, Rational64::new(1, 2));
        let t = rational_half_turns(-PI / 4.0, 1e-12).unwrap();
        assert_eq!(t, Rational64::new(-1, 4));
    }
}
