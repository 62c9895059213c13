//! Standard quantum gates and their matrices.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::parameter::Parameter;

/// A 2×2 unitary in row-major order.
pub type Matrix2 = [Complex64; 4];

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,
    /// Rotation around X.
    Rx(Parameter),
    /// Rotation around Y.
    Ry(Parameter),
    /// Rotation around Z.
    Rz(Parameter),
    /// Phase gate.
    P(Parameter),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(Parameter, Parameter, Parameter),
    /// Global phase: multiplies the whole state by e^{iθ}. Acts on no qubit.
    GPhase(Parameter),
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::GPhase(_) => "gphase",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Number of qubit operands (controls of controlled gates included).
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::GPhase(_) => 0,
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(_, _, _) => 1,
            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap => 2,
            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Check if this gate carries an unbound symbolic parameter.
    pub fn is_symbolic(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get the parameters of this gate.
    pub fn parameters(&self) -> Vec<&Parameter> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::GPhase(p) => vec![p],
            StandardGate::U(a, b, c) => vec![a, b, c],
            _ => vec![],
        }
    }

    /// Rewrite every parameter through `f` (used for variable binding).
    pub fn map_parameters(&self, f: &mut impl FnMut(&Parameter) -> Parameter) -> Self {
        match self {
            StandardGate::Rx(p) => StandardGate::Rx(f(p)),
            StandardGate::Ry(p) => StandardGate::Ry(f(p)),
            StandardGate::Rz(p) => StandardGate::Rz(f(p)),
            StandardGate::P(p) => StandardGate::P(f(p)),
            StandardGate::GPhase(p) => StandardGate::GPhase(f(p)),
            StandardGate::U(a, b, c) => StandardGate::U(f(a), f(b), f(c)),
            other => other.clone(),
        }
    }

    /// The adjoint of this gate.
    pub fn inverse(&self) -> Self {
        match self {
            StandardGate::S => StandardGate::Sdg,
            StandardGate::Sdg => StandardGate::S,
            StandardGate::T => StandardGate::Tdg,
            StandardGate::Tdg => StandardGate::T,
            StandardGate::SX => StandardGate::SXdg,
            StandardGate::SXdg => StandardGate::SX,
            StandardGate::Rx(p) => StandardGate::Rx(-p.clone()),
            StandardGate::Ry(p) => StandardGate::Ry(-p.clone()),
            StandardGate::Rz(p) => StandardGate::Rz(-p.clone()),
            StandardGate::P(p) => StandardGate::P(-p.clone()),
            StandardGate::GPhase(p) => StandardGate::GPhase(-p.clone()),
            StandardGate::U(theta, phi, lambda) => {
                StandardGate::U(-theta.clone(), -lambda.clone(), -phi.clone())
            }
            // the remaining standard gates are self-inverse
            other => other.clone(),
        }
    }

    /// Check whether the gate is diagonal in the computational basis.
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::Z
                | StandardGate::S
                | StandardGate::Sdg
                | StandardGate::T
                | StandardGate::Tdg
                | StandardGate::Rz(_)
                | StandardGate::P(_)
                | StandardGate::GPhase(_)
                | StandardGate::CZ
        )
    }

    /// Decompose a controlled standard gate into its base gate and the
    /// number of leading control operands. Uncontrolled gates return
    /// themselves with zero controls.
    pub fn controlled_base(&self) -> (StandardGate, usize) {
        match self {
            StandardGate::CX => (StandardGate::X, 1),
            StandardGate::CY => (StandardGate::Y, 1),
            StandardGate::CZ => (StandardGate::Z, 1),
            StandardGate::CH => (StandardGate::H, 1),
            StandardGate::CCX => (StandardGate::X, 2),
            StandardGate::CSwap => (StandardGate::Swap, 1),
            other => (other.clone(), 0),
        }
    }

    /// The 2×2 matrix of a single-qubit gate with concrete parameters.
    ///
    /// Returns `None` for multi-qubit gates, `GPhase`, and gates with
    /// unbound symbolic parameters.
    pub fn matrix(&self) -> Option<Matrix2> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        match self {
            StandardGate::I => Some([one, zero, zero, one]),
            StandardGate::X => Some([zero, one, one, zero]),
            StandardGate::Y => Some([
                zero,
                Complex64::new(0.0, -1.0),
                Complex64::new(0.0, 1.0),
                zero,
            ]),
            StandardGate::Z => Some([one, zero, zero, -one]),
            StandardGate::H => {
                let s = Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0);
                Some([s, s, s, -s])
            }
            StandardGate::S => Some([one, zero, zero, Complex64::new(0.0, 1.0)]),
            StandardGate::Sdg => Some([one, zero, zero, Complex64::new(0.0, -1.0)]),
            StandardGate::T => Some([
                one,
                zero,
                zero,
                Complex64::from_polar(1.0, std::f64::consts::FRAC_PI_4),
            ]),
            StandardGate::Tdg => Some([
                one,
                zero,
                zero,
                Complex64::from_polar(1.0, -std::f64::consts::FRAC_PI_4),
            ]),
            StandardGate::SX => {
                let a = Complex64::new(0.5, 0.5);
                let b = Complex64::new(0.5, -0.5);
                Some([a, b, b, a])
            }
            StandardGate::SXdg => {
                let a = Complex64::new(0.5, -0.5);
                let b = Complex64::new(0.5, 0.5);
                Some([a, b, b, a])
            }
            StandardGate::Rx(p) => {
                let theta = p.evaluate()?;
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new(0.0, -(theta / 2.0).sin());
                Some([c, s, s, c])
            }
            StandardGate::Ry(p) => {
                let theta = p.evaluate()?;
                let c = Complex64::new((theta / 2.0).cos(), 0.0);
                let s = Complex64::new((theta / 2.0).sin(), 0.0);
                Some([c, -s, s, c])
            }
            StandardGate::Rz(p) => {
                let theta = p.evaluate()?;
                Some([
                    Complex64::from_polar(1.0, -theta / 2.0),
                    zero,
                    zero,
                    Complex64::from_polar(1.0, theta / 2.0),
                ])
            }
            StandardGate::P(p) => {
                let lambda = p.evaluate()?;
                Some([one, zero, zero, Complex64::from_polar(1.0, lambda)])
            }
            StandardGate::U(t, ph, la) => {
                let theta = t.evaluate()?;
                let phi = ph.evaluate()?;
                let lambda = la.evaluate()?;
                let c = (theta / 2.0).cos();
                let s = (theta / 2.0).sin();
                Some([
                    Complex64::new(c, 0.0),
                    -Complex64::from_polar(s, lambda),
                    Complex64::from_polar(s, phi),
                    Complex64::from_polar(c, phi + lambda),
                ])
            }
            _ => None,
        }
    }

    /// Check whether two gates cancel to the identity when adjacent on the
    /// same qubit. Only the trivial laws used by gate fusion are covered.
    pub fn cancels_with(&self, other: &StandardGate) -> bool {
        use StandardGate::*;
        match (self, other) {
            (X, X) | (Y, Y) | (Z, Z) | (H, H) => true,
            (S, Sdg) | (Sdg, S) | (T, Tdg) | (Tdg, T) | (SX, SXdg) | (SXdg, SX) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn mul2(a: &Matrix2, b: &Matrix2) -> Matrix2 {
        [
            a[0] * b[0] + a[1] * b[2],
            a[0] * b[1] + a[1] * b[3],
            a[2] * b[0] + a[3] * b[2],
            a[2] * b[1] + a[3] * b[3],
        ]
    }

    fn assert_identity(m: &Matrix2) {
        assert_abs_diff_eq!(m[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[3].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[1].norm(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m[2].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_names_and_arity() {
        assert_eq!(StandardGate::H.name(), "h");
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);
        assert_eq!(StandardGate::GPhase(Parameter::value(PI)).num_qubits(), 0);
    }

    #[test]
    fn test_inverse_matrices() {
        for g in [
            StandardGate::S,
            StandardGate::T,
            StandardGate::SX,
            StandardGate::Rx(Parameter::value(0.3)),
            StandardGate::Ry(Parameter::value(1.1)),
            StandardGate::Rz(Parameter::value(-0.7)),
            StandardGate::P(Parameter::value(0.4)),
            StandardGate::U(
                Parameter::value(0.3),
                Parameter::value(0.5),
                Parameter::value(-0.2),
            ),
        ] {
            let m = g.matrix().unwrap();
            let minv = g.inverse().matrix().unwrap();
            assert_identity(&mul2(&m, &minv));
        }
    }

    #[test]
    fn test_hadamard_squared() {
        let h = StandardGate::H.matrix().unwrap();
        assert_identity(&mul2(&h, &h));
    }

    #[test]
    fn test_controlled_base() {
        assert_eq!(StandardGate::CX.controlled_base(), (StandardGate::X, 1));
        assert_eq!(StandardGate::CCX.controlled_base(), (StandardGate::X, 2));
        assert_eq!(StandardGate::H.controlled_base(), (StandardGate::H, 0));
    }

    #[test]
    fn test_symbolic_matrix_is_none() {
        let g = StandardGate::Rx(Parameter::variable("theta"));
        assert!(g.is_symbolic());
        assert!(g.matrix().is_none());
    }

    #[test]
    fn test_cancellation_table() {
        assert!(StandardGate::H.cancels_with(&StandardGate::H));
        assert!(StandardGate::S.cancels_with(&StandardGate::Sdg));
        assert!(!StandardGate::S.cancels_with(&StandardGate::S));
        assert!(!StandardGate::X.cancels_with(&StandardGate::Z));
    }
}
