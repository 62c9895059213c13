//! The graph-rewrite checker: build the miter of both circuits as a
//! ZX-diagram and try to reduce it to bare identity wires.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use veriq_ir::{Circuit, Permutation, QubitId};
use veriq_zx::{full_reduce, Construction, Diagram, EType, VType};

use crate::checker::{CheckerBase, CheckerKind, EquivalenceChecker};
use crate::config::Configuration;
use crate::criterion::EquivalenceCriterion;
use crate::error::CheckResult;
use crate::scheme::CostProfile;

/// Map every output-side logical qubit to the input-side logical qubit on
/// the same wire.
fn invert_permutations(qc: &Circuit) -> Permutation {
    let n = qc.num_qubits();
    qc.output_permutation
        .complete(n)
        .invert()
        .compose(&qc.initial_layout.complete(n))
}

/// Rewriting-based equivalence checker. Incomplete: rejection only ever
/// yields `ProbablyNotEquivalent`.
pub struct ZxEquivalenceChecker {
    base: CheckerBase,
    rewrite_rounds: usize,
}

impl ZxEquivalenceChecker {
    /// Create the checker.
    pub fn new(
        qc1: Arc<Circuit>,
        qc2: Arc<Circuit>,
        config: Arc<Configuration>,
        profile: Arc<Option<CostProfile>>,
        abort: Arc<AtomicBool>,
    ) -> Self {
        Self {
            base: CheckerBase::new(qc1, qc2, config, profile, abort),
            rewrite_rounds: 0,
        }
    }

    /// Whether the rewriter applies: every ancillary qubit must be garbage
    /// (the miter initializes and post-selects them to |0⟩) and both
    /// circuits must be encodable.
    pub fn can_handle(qc1: &Circuit, qc2: &Circuit) -> bool {
        for qc in [qc1, qc2] {
            for q in 0..qc.num_qubits() {
                let q = QubitId::from(q);
                if qc.is_ancillary(q) && !qc.is_garbage(q) {
                    return false;
                }
            }
        }
        Construction::transformable(qc1) && Construction::transformable(qc2)
    }

    fn build_miter(&self) -> CheckResult<Diagram> {
        let qc1 = &self.base.qc1;
        let qc2 = &self.base.qc2;
        let builder = Construction::new(self.base.config.parameterized.parameterized_tolerance);

        // after ancillary alignment both circuits share their primary count,
        // so a data-qubit-free first circuit implies the same for the second
        if qc1.num_qubits_without_ancillae() == 0 {
            return Ok(Diagram::new());
        }

        let mut miter = builder.build(qc1)?;
        let n1 = qc1.num_qubits();
        let p1 = invert_permutations(qc1);
        for i in 0..qc1.num_ancillary() {
            let anc = n1 - i - 1;
            let input_pos = p1.apply(QubitId::from(anc)).index();
            miter.make_ancilla(input_pos, anc);
        }
        miter.invert();
        let mut second = builder.build(qc2)?;
        let n2 = qc2.num_qubits();
        let p2 = invert_permutations(qc2);
        for i in 0..qc2.num_ancillary() {
            let anc = n2 - i - 1;
            let input_pos = p2.apply(QubitId::from(anc)).index();
            second.make_ancilla(input_pos, anc);
        }
        miter.concat(&second);
        Ok(miter)
    }

    /// Reduce until neither the rewriter nor an increasingly aggressive
    /// Clifford approximation changes the diagram.
    fn full_reduce_approximate(&mut self, miter: &mut Diagram) {
        let mut tolerance = self.base.config.functionality.trace_threshold;
        loop {
            full_reduce(miter, &self.base.abort);
            self.rewrite_rounds += 1;
            if self.base.aborted() || !miter.approximate_cliffords(tolerance) {
                break;
            }
            tolerance *= 10.0;
        }
    }

    fn residual_accepts(&self, miter: &Diagram) -> bool {
        let qc1 = &self.base.qc1;
        let qc2 = &self.base.qc2;
        let live_wires = miter
            .inputs()
            .iter()
            .filter(|&&v| miter.contains_vertex(v) && miter.vertex_type(v) == VType::B)
            .count();
        if miter.num_edges() != live_wires {
            return false;
        }

        let p1 = invert_permutations(qc1).invert();
        let p2 = invert_permutations(qc2).invert();

        for &vin in miter.inputs() {
            if !miter.contains_vertex(vin) || miter.vertex_type(vin) != VType::B {
                // ancilla wire, initialized and post-selected
                continue;
            }
            let q_in = miter.qubit(vin);
            if q_in >= 0
                && qc1.is_garbage(QubitId::from(q_in as usize))
                && qc2.is_garbage(QubitId::from(q_in as usize))
            {
                continue;
            }

            let edges = miter.incident_edges(vin);
            if edges.len() != 1 {
                return false;
            }
            let (out, et) = edges[0];
            if et == EType::H {
                return false;
            }
            if !miter.outputs().contains(&out) {
                return false;
            }
            let q_out = miter.qubit(out);
            if q_in < 0 || q_out < 0 {
                return false;
            }
            if p1.apply(QubitId::from(q_in as usize)) != p2.apply(QubitId::from(q_out as usize)) {
                return false;
            }
        }
        true
    }
}

impl EquivalenceChecker for ZxEquivalenceChecker {
    fn kind(&self) -> CheckerKind {
        CheckerKind::GraphRewrite
    }

    fn run(&mut self) -> CheckResult<EquivalenceCriterion> {
        let start = Instant::now();
        let ancilla =
            self.base.qc1.num_ancillary() > 0 || self.base.qc2.num_ancillary() > 0;

        let mut miter = self.build_miter()?;

        if miter.inputs().is_empty() && miter.num_vertices() == 0 {
            self.base.equivalence = if miter.global_phase_is_zero() {
                EquivalenceCriterion::Equivalent
            } else {
                EquivalenceCriterion::EquivalentUpToGlobalPhase
            };
            self.base.runtime += start.elapsed().as_secs_f64();
            return Ok(self.base.equivalence);
        }

        self.full_reduce_approximate(&mut miter);
        let equivalent = !self.base.aborted() && self.residual_accepts(&miter);

        // a rejection with ancillary assumptions in play proves nothing
        self.base.equivalence = if self.base.aborted() || (!equivalent && ancilla) {
            EquivalenceCriterion::NoInformation
        } else if equivalent {
            if miter.global_phase_is_zero() {
                EquivalenceCriterion::Equivalent
            } else {
                EquivalenceCriterion::EquivalentUpToGlobalPhase
            }
        } else {
            EquivalenceCriterion::ProbablyNotEquivalent
        };

        self.base.runtime += start.elapsed().as_secs_f64();
        Ok(self.base.equivalence)
    }

    fn equivalence(&self) -> EquivalenceCriterion {
        self.base.equivalence
    }

    fn record(&self) -> serde_json::Value {
        json!({
            "checker": self.kind().as_str(),
            "equivalence": self.base.equivalence.as_str(),
            "runtime": self.base.runtime,
            "rewrite_rounds": self.rewrite_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriq_ir::QubitId;

    fn check(qc1: Circuit, qc2: Circuit) -> EquivalenceCriterion {
        let mut checker = ZxEquivalenceChecker::new(
            Arc::new(qc1),
            Arc::new(qc2),
            Arc::new(Configuration::default()),
            Arc::new(None),
            Arc::new(AtomicBool::new(false)),
        );
        checker.run().unwrap()
    }

    #[test]
    fn test_reflexive() {
        let mut c = Circuit::with_size("c", 2, 0);
        c.h(QubitId(0)).unwrap();
        c.cx(QubitId(0), QubitId(1)).unwrap();
        c.t(QubitId(1)).unwrap();
        assert_eq!(check(c.clone(), c), EquivalenceCriterion::Equivalent);
    }

    #[test]
    fn test_hadamard_sandwich() {
        let mut c1 = Circuit::with_size("c1", 2, 0);
        c1.h(QubitId(0)).unwrap();
        c1.h(QubitId(1)).unwrap();
        c1.cx(QubitId(0), QubitId(1)).unwrap();
        c1.h(QubitId(0)).unwrap();
        c1.h(QubitId(1)).unwrap();

        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.cx(QubitId(1), QubitId(0)).unwrap();

        assert_eq!(check(c1, c2), EquivalenceCriterion::Equivalent);
    }

    #[test]
    fn test_incomplete_rejection() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.x(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.z(QubitId(0)).unwrap();
        assert_eq!(check(c1, c2), EquivalenceCriterion::ProbablyNotEquivalent);
    }

    #[test]
    fn test_global_phase_distinction() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.h(QubitId(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.gphase(std::f64::consts::PI).unwrap();
        c2.h(QubitId(0)).unwrap();
        assert_eq!(
            check(c1, c2),
            EquivalenceCriterion::EquivalentUpToGlobalPhase
        );
    }

    #[test]
    fn test_can_handle() {
        let mut plain = Circuit::with_size("p", 1, 0);
        plain.h(QubitId(0)).unwrap();
        assert!(ZxEquivalenceChecker::can_handle(&plain, &plain));

        let mut anc = Circuit::with_size("a", 2, 0);
        anc.set_ancillary(QubitId(1));
        assert!(!ZxEquivalenceChecker::can_handle(&anc, &plain.clone()));

        let mut toffoli = Circuit::with_size("t", 3, 0);
        toffoli.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
        assert!(!ZxEquivalenceChecker::can_handle(&toffoli, &toffoli));
    }
}
