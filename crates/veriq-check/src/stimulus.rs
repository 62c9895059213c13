//! Random stimulus generation for the simulation checker.
//!
//! Stimuli are generated as package-neutral descriptions so the executor can
//! draw them before spawning workers; each worker materializes its stimulus
//! in its own DD package.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use veriq_dd::{DdPackage, Edge, OneQubitBasis};
use veriq_ir::{Circuit, QubitId};

use crate::config::StateKind;
use crate::error::CheckResult;

/// A package-neutral stimulus description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stimulus {
    /// A computational basis state, one bit per qubit.
    ComputationalBasis(Vec<bool>),
    /// A product of one-qubit basis states.
    OneQubitBasis(Vec<OneQubitBasisLabel>),
    /// A stabilizer state given by the Clifford circuit preparing it.
    Stabilizer(Circuit),
}

/// Serializable labels for the six one-qubit basis states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneQubitBasisLabel {
    /// |0⟩
    Zero,
    /// |1⟩
    One,
    /// |+⟩
    Plus,
    /// |−⟩
    Minus,
    /// |L⟩
    Left,
    /// |R⟩
    Right,
}

impl From<OneQubitBasisLabel> for OneQubitBasis {
    fn from(label: OneQubitBasisLabel) -> Self {
        match label {
            OneQubitBasisLabel::Zero => OneQubitBasis::Zero,
            OneQubitBasisLabel::One => OneQubitBasis::One,
            OneQubitBasisLabel::Plus => OneQubitBasis::Plus,
            OneQubitBasisLabel::Minus => OneQubitBasis::Minus,
            OneQubitBasisLabel::Left => OneQubitBasis::Left,
            OneQubitBasisLabel::Right => OneQubitBasis::Right,
        }
    }
}

impl Stimulus {
    /// Build the state in the given package. The result is not yet
    /// reference-counted; the caller takes ownership.
    pub fn materialize(&self, dd: &mut DdPackage) -> CheckResult<Edge> {
        match self {
            Stimulus::ComputationalBasis(bits) => Ok(dd.basis_state(bits)),
            Stimulus::OneQubitBasis(labels) => {
                let states: Vec<OneQubitBasis> =
                    labels.iter().map(|&l| OneQubitBasis::from(l)).collect();
                Ok(dd.one_qubit_basis_state(&states))
            }
            Stimulus::Stabilizer(prep) => {
                use crate::checker::task::{TaskManager, TaskMode};
                let mut state = dd.zero_state(prep.num_qubits());
                let mut task = TaskManager::new(prep, TaskMode::Vector);
                task.run_to_end(dd, &mut state, prep)?;
                Ok(state)
            }
        }
    }

    /// The number of qubits the stimulus spans.
    pub fn num_qubits(&self) -> usize {
        match self {
            Stimulus::ComputationalBasis(bits) => bits.len(),
            Stimulus::OneQubitBasis(labels) => labels.len(),
            Stimulus::Stabilizer(prep) => prep.num_qubits(),
        }
    }
}

/// Deterministically seeded generator for the three stimulus families.
pub struct StateGenerator {
    rng: StdRng,
    seed: u64,
    generated_basis_states: FxHashSet<u64>,
}

impl StateGenerator {
    /// Create a generator. A seed of 0 draws the seed from entropy.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(seed)
        };
        Self {
            rng,
            seed,
            generated_basis_states: FxHashSet::default(),
        }
    }

    /// The seed the generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseed and forget previously generated basis states.
    pub fn reseed(&mut self, seed: u64) {
        *self = Self::new(seed);
    }

    /// Forget previously generated basis states.
    pub fn clear(&mut self) {
        self.generated_basis_states.clear();
    }

    /// Generate a stimulus over `total_qubits` qubits of which the top
    /// `ancillary_qubits` are fixed to |0⟩.
    pub fn generate(
        &mut self,
        kind: StateKind,
        total_qubits: usize,
        ancillary_qubits: usize,
    ) -> Stimulus {
        match kind {
            StateKind::ComputationalBasis => {
                self.generate_computational_basis(total_qubits, ancillary_qubits)
            }
            StateKind::OneQubitBasis => self.generate_one_qubit_basis(total_qubits, ancillary_qubits),
            StateKind::Stabilizer => self.generate_stabilizer(total_qubits, ancillary_qubits),
        }
    }

    fn generate_computational_basis(&mut self, total: usize, ancillary: usize) -> Stimulus {
        let random_qubits = total - ancillary;
        let mut bits = vec![false; total];

        if random_qubits <= 63 {
            let max_states = 1u64 << random_qubits;
            assert!(
                (self.generated_basis_states.len() as u64) < max_states,
                "all computational basis states have been exhausted"
            );
            let mut state = self.rng.gen_range(0..max_states);
            while !self.generated_basis_states.insert(state) {
                state = self.rng.gen_range(0..max_states);
            }
            for (i, bit) in bits.iter_mut().enumerate().take(random_qubits) {
                *bit = (state >> i) & 1 == 1;
            }
        } else {
            for bit in bits.iter_mut().take(random_qubits) {
                *bit = self.rng.gen_bool(0.5);
            }
        }
        Stimulus::ComputationalBasis(bits)
    }

    fn generate_one_qubit_basis(&mut self, total: usize, ancillary: usize) -> Stimulus {
        use OneQubitBasisLabel::*;
        const STATES: [OneQubitBasisLabel; 6] = [Zero, One, Plus, Minus, Left, Right];
        let random_qubits = total - ancillary;
        let mut labels = vec![Zero; total];
        for label in labels.iter_mut().take(random_qubits) {
            *label = STATES[self.rng.gen_range(0..STATES.len())];
        }
        Stimulus::OneQubitBasis(labels)
    }

    fn generate_stabilizer(&mut self, total: usize, ancillary: usize) -> Stimulus {
        let random_qubits = total - ancillary;
        // ⌈log₂ r⌉ layers; a single randomized qubit gets no layers and the
        // prepared state stays |0…0⟩
        let depth = if random_qubits > 1 {
            (random_qubits as f64).log2().ceil() as usize
        } else {
            0
        };

        // layers of random one-qubit Cliffords followed by staggered
        // entangling gates; gates only touch the randomized qubits, so the
        // ancillary qubits of the prepared state stay |0⟩
        let mut prep = Circuit::with_size("stabilizer_prep", total, 0);
        for layer in 0..depth {
            for q in 0..random_qubits {
                let q = QubitId::from(q);
                // builder calls on in-range qubits cannot fail
                match self.rng.gen_range(0..6) {
                    0 => {}
                    1 => {
                        let _ = prep.h(q);
                    }
                    2 => {
                        let _ = prep.s(q);
                    }
                    3 => {
                        let _ = prep.x(q);
                    }
                    4 => {
                        let _ = prep.z(q);
                    }
                    _ => {
                        let _ = prep.h(q).and_then(|c| c.s(q));
                    }
                }
            }
            let mut q = layer % 2;
            while q + 1 < random_qubits {
                let (a, b) = (QubitId::from(q), QubitId::from(q + 1));
                if self.rng.gen_bool(0.5) {
                    let _ = prep.cx(a, b);
                } else {
                    let _ = prep.cz(a, b);
                }
                q += 2;
            }
        }
        Stimulus::Stabilizer(prep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_determinism() {
        let mut a = StateGenerator::new(42);
        let mut b = StateGenerator::new(42);
        for _ in 0..8 {
            let sa = a.generate(StateKind::ComputationalBasis, 4, 0);
            let sb = b.generate(StateKind::ComputationalBasis, 4, 0);
            match (sa, sb) {
                (Stimulus::ComputationalBasis(x), Stimulus::ComputationalBasis(y)) => {
                    assert_eq!(x, y);
                }
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn test_basis_states_are_unique() {
        let mut g = StateGenerator::new(7);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..8 {
            let Stimulus::ComputationalBasis(bits) = g.generate(StateKind::ComputationalBasis, 3, 0)
            else {
                unreachable!()
            };
            assert!(seen.insert(bits));
        }
    }

    #[test]
    fn test_ancillaries_stay_zero() {
        let mut g = StateGenerator::new(3);
        for _ in 0..4 {
            let Stimulus::ComputationalBasis(bits) = g.generate(StateKind::ComputationalBasis, 4, 2)
            else {
                unreachable!()
            };
            assert!(!bits[2] && !bits[3]);
        }

        let Stimulus::OneQubitBasis(labels) = g.generate(StateKind::OneQubitBasis, 4, 2) else {
            unreachable!()
        };
        assert_eq!(labels[2], OneQubitBasisLabel::Zero);
        assert_eq!(labels[3], OneQubitBasisLabel::Zero);
    }

    #[test]
    fn test_stabilizer_state_is_normalized() {
        let mut g = StateGenerator::new(11);
        let stim = g.generate(StateKind::Stabilizer, 3, 1);
        let mut dd = DdPackage::new(2e-13);
        let state = stim.materialize(&mut dd).unwrap();
        let norm = dd.inner_product(state, state, 3);
        assert_abs_diff_eq!(norm.re, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(norm.im, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reseed_clears_duplicates() {
        let mut g = StateGenerator::new(5);
        for _ in 0..4 {
            g.generate(StateKind::ComputationalBasis, 2, 0);
        }
        // the 2-qubit space is exhausted; reseeding makes room again
        g.reseed(5);
        g.generate(StateKind::ComputationalBasis, 2, 0);
    }
}
