//! Equivalence criteria.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The possible outcomes of an equivalence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquivalenceCriterion {
    /// The check produced no information.
    NoInformation,
    /// The circuits are proven non-equivalent.
    NotEquivalent,
    /// The circuits implement the same operator.
    Equivalent,
    /// The circuits agree up to a global phase factor.
    EquivalentUpToGlobalPhase,
    /// The circuits agree up to a phase (vector comparison).
    EquivalentUpToPhase,
    /// Simulations found no difference; no proof.
    ProbablyEquivalent,
    /// The rewriter could not reduce the miter; no proof.
    ProbablyNotEquivalent,
}

impl EquivalenceCriterion {
    /// The wire string of this criterion.
    pub fn as_str(self) -> &'static str {
        match self {
            EquivalenceCriterion::NoInformation => "no_information",
            EquivalenceCriterion::NotEquivalent => "not_equivalent",
            EquivalenceCriterion::Equivalent => "equivalent",
            EquivalenceCriterion::EquivalentUpToGlobalPhase => "equivalent_up_to_global_phase",
            EquivalenceCriterion::EquivalentUpToPhase => "equivalent_up_to_phase",
            EquivalenceCriterion::ProbablyEquivalent => "probably_equivalent",
            EquivalenceCriterion::ProbablyNotEquivalent => "probably_not_equivalent",
        }
    }

    /// Whether the criterion counts as an equivalence.
    pub fn considered_equivalent(self) -> bool {
        matches!(
            self,
            EquivalenceCriterion::Equivalent
                | EquivalenceCriterion::EquivalentUpToGlobalPhase
                | EquivalenceCriterion::EquivalentUpToPhase
                | EquivalenceCriterion::ProbablyEquivalent
        )
    }

    /// The weaker of two positive criteria, used when merging verdicts of
    /// parameter instantiations.
    pub fn weakest(self, other: Self) -> Self {
        fn rank(c: EquivalenceCriterion) -> u8 {
            match c {
                EquivalenceCriterion::Equivalent => 5,
                EquivalenceCriterion::EquivalentUpToGlobalPhase => 4,
                EquivalenceCriterion::EquivalentUpToPhase => 3,
                EquivalenceCriterion::ProbablyEquivalent => 2,
                EquivalenceCriterion::ProbablyNotEquivalent => 1,
                EquivalenceCriterion::NotEquivalent | EquivalenceCriterion::NoInformation => 0,
            }
        }
        if self == EquivalenceCriterion::NotEquivalent || other == EquivalenceCriterion::NotEquivalent
        {
            return EquivalenceCriterion::NotEquivalent;
        }
        if self == EquivalenceCriterion::NoInformation || other == EquivalenceCriterion::NoInformation
        {
            return EquivalenceCriterion::NoInformation;
        }
        if rank(self) <= rank(other) {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for EquivalenceCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings() {
        assert_eq!(
            EquivalenceCriterion::EquivalentUpToGlobalPhase.as_str(),
            "equivalent_up_to_global_phase"
        );
        // the two phase criteria stay distinct on the wire
        assert_ne!(
            EquivalenceCriterion::EquivalentUpToPhase.as_str(),
            EquivalenceCriterion::EquivalentUpToGlobalPhase.as_str()
        );
    }

    #[test]
    fn test_considered_equivalent() {
        assert!(EquivalenceCriterion::Equivalent.considered_equivalent());
        assert!(EquivalenceCriterion::ProbablyEquivalent.considered_equivalent());
        assert!(!EquivalenceCriterion::NotEquivalent.considered_equivalent());
        assert!(!EquivalenceCriterion::NoInformation.considered_equivalent());
    }

    #[test]
    fn test_weakest() {
        use EquivalenceCriterion::*;
        assert_eq!(Equivalent.weakest(EquivalentUpToGlobalPhase), EquivalentUpToGlobalPhase);
        assert_eq!(Equivalent.weakest(NotEquivalent), NotEquivalent);
        assert_eq!(ProbablyEquivalent.weakest(Equivalent), ProbablyEquivalent);
        assert_eq!(Equivalent.weakest(NoInformation), NoInformation);
    }

    #[test]
    fn test_serde_round_trip() {
        let s = serde_json::to_string(&EquivalenceCriterion::ProbablyNotEquivalent).unwrap();
        assert_eq!(s, "\"probably_not_equivalent\"");
        let c: EquivalenceCriterion = serde_json::from_str(&s).unwrap();
        assert_eq!(c, EquivalenceCriterion::ProbablyNotEquivalent);
    }
}
