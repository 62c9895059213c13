//! Partial qubit permutations.
//!
//! Initial layouts and output permutations are partial maps from physical
//! wire indices to logical qubit indices. The map is ordered so that
//! iteration (and in particular reverse iteration during idle-qubit
//! stripping) is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::qubit::QubitId;

/// A partial map physical → logical qubit index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permutation {
    map: BTreeMap<QubitId, QubitId>,
}

impl Permutation {
    /// Create an empty permutation.
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity permutation on `n` qubits.
    pub fn identity(n: usize) -> Self {
        let map = (0..n as u32).map(|i| (QubitId(i), QubitId(i))).collect();
        Self { map }
    }

    /// Insert or replace a mapping.
    pub fn insert(&mut self, physical: QubitId, logical: QubitId) {
        self.map.insert(physical, logical);
    }

    /// Remove a mapping by physical index.
    pub fn remove(&mut self, physical: QubitId) -> Option<QubitId> {
        self.map.remove(&physical)
    }

    /// Look up the logical index mapped to `physical`.
    pub fn get(&self, physical: QubitId) -> Option<QubitId> {
        self.map.get(&physical).copied()
    }

    /// Look up, falling back to the identity for unmapped indices.
    pub fn apply(&self, physical: QubitId) -> QubitId {
        self.get(physical).unwrap_or(physical)
    }

    /// Find the physical index mapped to `logical`, if any.
    pub fn find_logical(&self, logical: QubitId) -> Option<QubitId> {
        self.map
            .iter()
            .find(|(_, &l)| l == logical)
            .map(|(&p, _)| p)
    }

    /// Check whether `physical` has a mapping.
    pub fn contains(&self, physical: QubitId) -> bool {
        self.map.contains_key(&physical)
    }

    /// Check whether any entry maps to `logical`.
    pub fn maps_to(&self, logical: QubitId) -> bool {
        self.map.values().any(|&l| l == logical)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check whether the permutation has no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Largest logical index in the image, if any.
    pub fn max_logical(&self) -> Option<QubitId> {
        self.map.values().max().copied()
    }

    /// Iterate over `(physical, logical)` pairs in ascending physical order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (QubitId, QubitId)> + '_ {
        self.map.iter().map(|(&p, &l)| (p, l))
    }

    /// Swap the images of two physical indices (both must be mapped).
    pub fn swap(&mut self, a: QubitId, b: QubitId) {
        let la = self.apply(a);
        let lb = self.apply(b);
        self.map.insert(a, lb);
        self.map.insert(b, la);
    }

    /// The inverse map (logical → physical).
    pub fn invert(&self) -> Self {
        let map = self.map.iter().map(|(&p, &l)| (l, p)).collect();
        Self { map }
    }

    /// Compose with `after`: the result maps `p ↦ after[self[p]]`, keeping
    /// only entries defined on both sides.
    pub fn compose(&self, after: &Permutation) -> Self {
        let mut out = Permutation::new();
        for (p, l) in self.iter() {
            if let Some(l2) = after.get(l) {
                out.insert(p, l2);
            }
        }
        out
    }

    /// Extend to a full permutation of `{0, …, n-1}`, greedily assigning
    /// unmapped physical indices to unused logical indices.
    pub fn complete(&self, n: usize) -> Self {
        if self.map.len() == n {
            return self.clone();
        }
        let mut out = self.clone();
        let mut mapped_to = vec![false; n];
        for &l in self.map.values() {
            if l.index() < n {
                mapped_to[l.index()] = true;
            }
        }
        let mut next_free = 0usize;
        for p in 0..n as u32 {
            let p = QubitId(p);
            if out.contains(p) {
                continue;
            }
            while next_free < n && mapped_to[next_free] {
                next_free += 1;
            }
            if next_free < n {
                out.insert(p, QubitId::from(next_free));
                mapped_to[next_free] = true;
            }
        }
        out
    }
}

impl FromIterator<(QubitId, QubitId)> for Permutation {
    fn from_iter<T: IntoIterator<Item = (QubitId, QubitId)>>(iter: T) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
