//! Diagram scalars.
//!
//! Rewrite rules multiply the diagram by scalar factors of the form
//! √2^k · e^{iπp}. The equivalence checker only ever asks whether the
//! accumulated phase is zero (and whether the scalar vanished), so the
//! magnitude is tracked as a power of √2 on a best-effort basis and the
//! phase exactly, as a rational number of half-turns.

use num_rational::Rational64;
use num_traits::Zero;

/// Normalize a phase in half-turns into the interval (-1, 1].
pub fn normalize_phase(p: Rational64) -> Rational64 {
    let two = Rational64::from_integer(2);
    let mut r = p % two;
    if r > Rational64::from_integer(1) {
        r -= two;
    }
    if r <= Rational64::from_integer(-1) {
        r += two;
    }
    r
}

/// A diagram scalar √2^k · e^{iπ·phase}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scalar {
    /// Phase in half-turns, normalized to (-1, 1].
    pub phase: Rational64,
    /// Magnitude as a power of √2.
    pub sqrt2_pow: i32,
    /// Whether the scalar (and with it the whole diagram) is zero.
    pub zero: bool,
}

impl Scalar {
    /// The scalar 1.
    pub fn one() -> Self {
        Self {
            phase: Rational64::zero(),
            sqrt2_pow: 0,
            zero: false,
        }
    }

    /// Multiply by e^{iπp}.
    pub fn mul_phase(&mut self, p: Rational64) {
        self.phase = normalize_phase(self.phase + p);
    }

    /// Multiply by √2^k.
    pub fn mul_sqrt2_pow(&mut self, k: i32) {
        self.sqrt2_pow += k;
    }

    /// Mark the scalar as zero.
    pub fn set_zero(&mut self) {
        self.zero = true;
    }

    /// Complex-conjugate the scalar.
    pub fn conjugate(&mut self) {
        self.phase = normalize_phase(-self.phase);
    }

    /// Multiply by another scalar.
    pub fn mul(&mut self, other: &Scalar) {
        self.zero |= other.zero;
        self.mul_phase(other.phase);
        self.sqrt2_pow += other.sqrt2_pow;
    }

    /// Whether the accumulated phase is zero (mod 2π).
    pub fn phase_is_zero(&self) -> bool {
        self.phase.is_zero()
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Self::one()
    }
}
