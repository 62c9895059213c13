//! The checker family.
//!
//! Four checkers share one small contract: a tagged kind, a `run()` that
//! yields an [`EquivalenceCriterion`], cooperative cancellation through an
//! atomic abort flag, and a self-describing JSON record.

pub mod alternating;
pub mod construction;
pub mod simulation;
pub mod task;
pub mod zx;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use veriq_dd::{DdPackage, Edge};
use veriq_ir::{Circuit, QubitId};

use crate::config::Configuration;
use crate::criterion::EquivalenceCriterion;
use crate::error::CheckResult;
use crate::scheme::CostProfile;

/// The kind of a checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckerKind {
    /// Build both unitaries and compare.
    Construction,
    /// Keep one running product close to the identity.
    Alternating,
    /// Compare the action on a random input state.
    Simulation,
    /// Reduce the miter with the graph rewriter.
    GraphRewrite,
}

impl CheckerKind {
    /// The tag used in checker records.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckerKind::Construction => "construction",
            CheckerKind::Alternating => "alternating",
            CheckerKind::Simulation => "simulation",
            CheckerKind::GraphRewrite => "graph_rewrite",
        }
    }
}

/// The shared checker contract.
pub trait EquivalenceChecker: Send {
    /// The kind tag.
    fn kind(&self) -> CheckerKind;

    /// Run the check.
    fn run(&mut self) -> CheckResult<EquivalenceCriterion>;

    /// The verdict of the last run.
    fn equivalence(&self) -> EquivalenceCriterion;

    /// A self-describing record with checker-specific statistics.
    fn record(&self) -> serde_json::Value;
}

/// State shared by every checker implementation.
pub(crate) struct CheckerBase {
    pub qc1: Arc<Circuit>,
    pub qc2: Arc<Circuit>,
    pub config: Arc<Configuration>,
    pub profile: Arc<Option<CostProfile>>,
    pub abort: Arc<AtomicBool>,
    pub equivalence: EquivalenceCriterion,
    pub runtime: f64,
}

impl CheckerBase {
    pub fn new(
        qc1: Arc<Circuit>,
        qc2: Arc<Circuit>,
        config: Arc<Configuration>,
        profile: Arc<Option<CostProfile>>,
        abort: Arc<AtomicBool>,
    ) -> Self {
        Self {
            qc1,
            qc2,
            config,
            profile,
            abort,
            equivalence: EquivalenceCriterion::NoInformation,
            runtime: 0.0,
        }
    }

    #[inline]
    pub fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Garbage status unioned over both circuits, indexed by logical qubit.
    pub fn garbage_union(&self) -> Vec<bool> {
        let n = self.qc1.num_qubits();
        (0..n)
            .map(|q| {
                let q = QubitId::from(q);
                self.qc1.is_garbage(q) || self.qc2.is_garbage(q)
            })
            .collect()
    }
}

/// Compare two matrix DDs per the matrix comparison rule. `reduced` marks
/// matrices that went through ancillary or garbage reductions and are no
/// longer unitary; those are compared through the Frobenius fidelity, which
/// stays meaningful for projected matrices.
pub(crate) fn equals_matrix(
    dd: &mut DdPackage,
    u: Edge,
    v: Edge,
    n: usize,
    trace_threshold: f64,
    reduced: bool,
) -> EquivalenceCriterion {
    let phase_split = |dd: &DdPackage| {
        if dd.weights_approximately_equal(u.weight, v.weight) {
            EquivalenceCriterion::Equivalent
        } else {
            EquivalenceCriterion::EquivalentUpToGlobalPhase
        }
    };

    // for reduced matrices a proportionality constant must have unit
    // modulus to count as a phase; the norm ratio tests |c| through
    // tr(V†V)/tr(U†U)
    let unit_scale = |dd: &mut DdPackage| {
        let uu = dd.frobenius_inner(u, u, n).re;
        let vv = dd.frobenius_inner(v, v, n).re;
        (uu <= 0.0 && vv <= 0.0)
            || (uu > 0.0 && vv > 0.0 && ((vv / uu).sqrt() - 1.0).abs() < trace_threshold)
    };

    if u.node == v.node {
        // unitary matrices carry unit-modulus top weights, so a differing
        // weight is a global phase; reduced matrices can share their node
        // at any relative scale
        if reduced && !unit_scale(dd) {
            return EquivalenceCriterion::NotEquivalent;
        }
        return phase_split(dd);
    }

    if reduced {
        // reduced matrices are not unitary: the normalized trace no longer
        // separates the identity from a projection, so proportionality is
        // decided through the Frobenius fidelity plus the norm ratio
        let fidelity = dd.matrix_fidelity(u, v, n);
        if (fidelity - 1.0).abs() < trace_threshold && unit_scale(dd) {
            return phase_split(dd);
        }
        return EquivalenceCriterion::NotEquivalent;
    }

    let u_close = dd.is_close_to_identity(u, n, trace_threshold);
    let v_close = dd.is_close_to_identity(v, n, trace_threshold);
    if u_close || v_close {
        if u_close && v_close {
            return phase_split(dd);
        }
        return EquivalenceCriterion::NotEquivalent;
    }

    let v_dag = dd.conjugate_transpose(v, n);
    let w = dd.multiply_matrices(u, v_dag, n);
    if dd.is_close_to_identity(w, n, trace_threshold) {
        return phase_split(dd);
    }
    EquivalenceCriterion::NotEquivalent
}

/// Compare two vector DDs per the vector comparison rule. Returns the
/// verdict together with the computed overlap ⟨ψ|ψ'⟩.
pub(crate) fn equals_vector(
    dd: &mut DdPackage,
    a: Edge,
    b: Edge,
    n: usize,
    fidelity_threshold: f64,
) -> (EquivalenceCriterion, num_complex::Complex64) {
    let overlap = dd.inner_product(a, b, n);
    if (overlap.re - 1.0).abs() < fidelity_threshold {
        return (EquivalenceCriterion::Equivalent, overlap);
    }
    let fidelity = overlap.norm_sqr();
    if (fidelity - 1.0).abs() < fidelity_threshold {
        return (EquivalenceCriterion::EquivalentUpToPhase, overlap);
    }
    (EquivalenceCriterion::NotEquivalent, overlap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_equals_matrix_identity_cases() {
        let mut dd = DdPackage::new(2e-13);
        let id = dd.identity(2);
        assert_eq!(
            equals_matrix(&mut dd, id, id, 2, 1e-8, false),
            EquivalenceCriterion::Equivalent
        );

        let phased = dd.scale(id, Complex64::from_polar(1.0, 0.7));
        assert_eq!(
            equals_matrix(&mut dd, phased, id, 2, 1e-8, false),
            EquivalenceCriterion::EquivalentUpToGlobalPhase
        );
    }

    #[test]
    fn test_equals_matrix_reduced_rejects_non_unit_scale() {
        let mut dd = DdPackage::new(2e-13);
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let x = dd.make_gate(2, [zero, one, one, zero], 0, &[]).unwrap();
        let reduced_x = dd.reduce_ancillae(x, &[false, true], &[false, true]);

        // proportional with |c| = 2: not an equivalence
        let scaled = dd.scale(reduced_x, Complex64::new(2.0, 0.0));
        assert_eq!(
            equals_matrix(&mut dd, reduced_x, scaled, 2, 1e-8, true),
            EquivalenceCriterion::NotEquivalent
        );

        // proportional with a pure phase: equivalent up to that phase
        let phased = dd.scale(reduced_x, Complex64::from_polar(1.0, 0.9));
        assert_eq!(
            equals_matrix(&mut dd, reduced_x, phased, 2, 1e-8, true),
            EquivalenceCriterion::EquivalentUpToGlobalPhase
        );

        assert_eq!(
            equals_matrix(&mut dd, reduced_x, reduced_x, 2, 1e-8, true),
            EquivalenceCriterion::Equivalent
        );
    }

    #[test]
    fn test_equals_matrix_detects_difference() {
        let mut dd = DdPackage::new(2e-13);
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let x = dd.make_gate(1, [zero, one, one, zero], 0, &[]).unwrap();
        let z = dd.make_gate(1, [one, zero, zero, -one], 0, &[]).unwrap();
        assert_eq!(
            equals_matrix(&mut dd, x, z, 1, 1e-8, false),
            EquivalenceCriterion::NotEquivalent
        );
    }

    #[test]
    fn test_equals_vector() {
        let mut dd = DdPackage::new(2e-13);
        let a = dd.basis_state(&[false, true]);
        let b = dd.basis_state(&[false, true]);
        let (c, _) = equals_vector(&mut dd, a, b, 2, 1e-8);
        assert_eq!(c, EquivalenceCriterion::Equivalent);

        let phased = dd.scale(b, Complex64::from_polar(1.0, 1.2));
        let (c, _) = equals_vector(&mut dd, a, phased, 2, 1e-8);
        assert_eq!(c, EquivalenceCriterion::EquivalentUpToPhase);

        let other = dd.basis_state(&[true, true]);
        let (c, overlap) = equals_vector(&mut dd, a, other, 2, 1e-8);
        assert_eq!(c, EquivalenceCriterion::NotEquivalent);
        assert!(overlap.norm() < 1e-12);
    }
}
