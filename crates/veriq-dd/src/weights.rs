//! Tolerance-aware interning of complex edge weights.
//!
//! Every edge weight in the package is a handle into this table. Lookups
//! merge values that agree within the configured tolerance, so weights that
//! are algebraically equal but differ by floating-point noise share one
//! handle. Handle equality is what makes node hashing (and with it the
//! canonicity of the diagrams) exact.

use num_complex::Complex64;
use rustc_hash::FxHashMap;

/// Handle to an interned complex value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeightId(pub u32);

/// The interned zero.
pub const W_ZERO: WeightId = WeightId(0);
/// The interned one.
pub const W_ONE: WeightId = WeightId(1);

/// Interning table for complex edge weights.
#[derive(Debug)]
pub struct WeightTable {
    values: Vec<Complex64>,
    buckets: FxHashMap<(i64, i64), Vec<WeightId>>,
    tolerance: f64,
}

impl WeightTable {
    /// Create a table with the given numerical tolerance.
    pub fn new(tolerance: f64) -> Self {
        let mut table = Self {
            values: vec![],
            buckets: FxHashMap::default(),
            tolerance,
        };
        let zero = table.insert_new(Complex64::new(0.0, 0.0));
        let one = table.insert_new(Complex64::new(1.0, 0.0));
        debug_assert_eq!(zero, W_ZERO);
        debug_assert_eq!(one, W_ONE);
        table
    }

    /// The configured tolerance.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Get the value behind a handle.
    #[inline]
    pub fn value(&self, id: WeightId) -> Complex64 {
        self.values[id.0 as usize]
    }

    /// Check whether two values agree within the tolerance.
    pub fn approx_eq(&self, a: Complex64, b: Complex64) -> bool {
        (a - b).norm() <= self.tolerance
    }

    fn cell(&self, v: Complex64) -> (i64, i64) {
        (
            (v.re / self.tolerance).round() as i64,
            (v.im / self.tolerance).round() as i64,
        )
    }

    fn insert_new(&mut self, v: Complex64) -> WeightId {
        let id = WeightId(self.values.len() as u32);
        self.values.push(v);
        self.buckets.entry(self.cell(v)).or_default().push(id);
        id
    }

    /// Intern a value, merging it with an existing entry within tolerance.
    /// Values within tolerance of zero collapse to [`W_ZERO`].
    pub fn intern(&mut self, v: Complex64) -> WeightId {
        if !v.re.is_finite() || !v.im.is_finite() {
            // clamp non-finite noise to zero rather than poisoning the table
            return W_ZERO;
        }
        if v.norm() <= self.tolerance {
            return W_ZERO;
        }
        let (kx, ky) = self.cell(v);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(ids) = self.buckets.get(&(kx + dx, ky + dy)) {
                    for &id in ids {
                        if self.approx_eq(self.values[id.0 as usize], v) {
                            return id;
                        }
                    }
                }
            }
        }
        self.insert_new(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let t = WeightTable::new(1e-12);
        assert_eq!(t.value(W_ZERO), Complex64::new(0.0, 0.0));
        assert_eq!(t.value(W_ONE), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_merge_within_tolerance() {
        let mut t = WeightTable::new(1e-10);
        let a = t.intern(Complex64::new(0.5, 0.0));
        let b = t.intern(Complex64::new(0.5 + 1e-12, 0.0));
        assert_eq!(a, b);

        let c = t.intern(Complex64::new(0.5 + 1e-6, 0.0));
        assert_ne!(a, c);
    }

    #[test]
    fn test_near_zero_collapses() {
        let mut t = WeightTable::new(1e-10);
        assert_eq!(t.intern(Complex64::new(1e-14, -1e-14)), W_ZERO);
    }

    #[test]
    fn test_one_is_reused() {
        let mut t = WeightTable::new(1e-10);
        let sqrt_half = std::f64::consts::FRAC_1_SQRT_2;
        let w = t.intern(Complex64::new(sqrt_half * sqrt_half * 2.0, 0.0));
        assert_eq!(w, W_ONE);
    }
}
