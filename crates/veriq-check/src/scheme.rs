//! Application schemes.
//!
//! A scheme decides, once per iteration of a DD checker's main loop, how
//! many operations to advance in each circuit. Schemes never know how many
//! iterations will occur.

use rustc_hash::FxHashMap;
use std::path::Path;

use veriq_ir::{Operation, OperationKind};

use crate::config::{ApplicationSchemeKind, CostFunction};
use crate::error::{CheckError, CheckResult};

/// A tabulated gate-cost profile: `(gate name, control count) → cost`.
#[derive(Debug, Clone, Default)]
pub struct CostProfile {
    entries: FxHashMap<(String, usize), usize>,
}

impl CostProfile {
    /// Parse a profile from its text format: one `KIND CONTROLS COST` entry
    /// per non-empty line, `#` starting a comment.
    pub fn parse(text: &str) -> CheckResult<Self> {
        let mut entries = FxHashMap::default();
        for (lineno, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(idx) => &raw[..idx],
                None => raw,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(kind), Some(controls), Some(cost), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(CheckError::InvalidInput(format!(
                    "malformed gate-cost profile line {}: '{raw}'",
                    lineno + 1
                )));
            };
            let controls: usize = controls.parse().map_err(|_| {
                CheckError::InvalidInput(format!(
                    "malformed control count in profile line {}",
                    lineno + 1
                ))
            })?;
            let cost: usize = cost.parse().map_err(|_| {
                CheckError::InvalidInput(format!("malformed cost in profile line {}", lineno + 1))
            })?;
            entries.insert((kind.to_ascii_lowercase(), controls), cost);
        }
        Ok(Self { entries })
    }

    /// Read and parse a profile file.
    pub fn from_file(path: impl AsRef<Path>) -> CheckResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Look up a cost; unknown entries cost 1.
    pub fn cost(&self, kind: &str, controls: usize) -> usize {
        self.entries
            .get(&(kind.to_ascii_lowercase(), controls))
            .copied()
            .unwrap_or(1)
    }
}

/// How the gate-cost scheme prices operations.
#[derive(Clone)]
enum CostSource {
    Profile(CostProfile),
    Function(CostFunction),
    Unit,
}

/// The cost of one operation under a cost source. Compound operations cost
/// the sum of their members.
fn op_cost(source: &CostSource, op: &Operation) -> usize {
    match &op.kind {
        OperationKind::Compound(ops) => ops.iter().map(|o| op_cost(source, o)).sum(),
        OperationKind::Gate(g) => {
            let (base, implicit) = g.controlled_base();
            let controls = implicit + op.controls.len();
            match source {
                CostSource::Profile(p) => p.cost(base.name(), controls),
                CostSource::Function(f) => (f.0)(base.name(), controls),
                CostSource::Unit => 1,
            }
        }
        _ => 1,
    }
}

/// A stateful producer of `(advance₁, advance₂)` pairs.
pub struct ApplicationScheme {
    inner: SchemeImpl,
}

enum SchemeImpl {
    Sequential,
    OneToOne,
    Proportional {
        first_is_smaller: bool,
        ratio: usize,
    },
    GateCost {
        source: CostSource,
    },
}

impl ApplicationScheme {
    /// Create a scheme. `Lookahead` is handled inside the alternating
    /// checker and rejected here.
    pub fn new(
        kind: ApplicationSchemeKind,
        ops1: usize,
        ops2: usize,
        profile: Option<&CostProfile>,
        cost_function: Option<&CostFunction>,
    ) -> CheckResult<Self> {
        let inner = match kind {
            ApplicationSchemeKind::Sequential => SchemeImpl::Sequential,
            ApplicationSchemeKind::OneToOne => SchemeImpl::OneToOne,
            ApplicationSchemeKind::Proportional => {
                let first_is_smaller = ops1 <= ops2;
                let (small, large) = if first_is_smaller {
                    (ops1, ops2)
                } else {
                    (ops2, ops1)
                };
                let ratio = if small == 0 {
                    large.max(1)
                } else {
                    large.div_ceil(small)
                };
                SchemeImpl::Proportional {
                    first_is_smaller,
                    ratio: ratio.max(1),
                }
            }
            ApplicationSchemeKind::GateCost => {
                let source = if let Some(f) = cost_function {
                    CostSource::Function(f.clone())
                } else if let Some(p) = profile {
                    CostSource::Profile(p.clone())
                } else {
                    CostSource::Unit
                };
                SchemeImpl::GateCost { source }
            }
            ApplicationSchemeKind::Lookahead => {
                return Err(CheckError::UnsupportedConfiguration(
                    "the lookahead scheme is only available to the alternating checker".into(),
                ));
            }
        };
        Ok(Self { inner })
    }

    /// Produce the next `(advance₁, advance₂)` pair given the remaining
    /// operation counts and the next operation of circuit 1.
    pub fn next(
        &mut self,
        remaining1: usize,
        remaining2: usize,
        next_op1: Option<&Operation>,
    ) -> (usize, usize) {
        match &mut self.inner {
            SchemeImpl::Sequential => {
                if remaining1 > 0 {
                    (remaining1, 0)
                } else {
                    (0, remaining2)
                }
            }
            SchemeImpl::OneToOne => match (remaining1, remaining2) {
                (0, r2) => (0, r2.min(1)),
                (r1, 0) => (r1.min(1), 0),
                _ => (1, 1),
            },
            SchemeImpl::Proportional {
                first_is_smaller,
                ratio,
            } => {
                if *first_is_smaller {
                    (1.min(remaining1), (*ratio).min(remaining2))
                } else {
                    ((*ratio).min(remaining1), 1.min(remaining2))
                }
            }
            SchemeImpl::GateCost { source } => {
                let cost = next_op1.map_or(1, |op| op_cost(source, op)).max(1);
                (1.min(remaining1), cost.min(remaining2))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriq_ir::{QubitId, StandardGate};

    #[test]
    fn test_profile_parsing() {
        let p = CostProfile::parse("x 0 1\nx 2 15\n# comment\n\nz 1 3  # trailing\n").unwrap();
        assert_eq!(p.cost("x", 0), 1);
        assert_eq!(p.cost("x", 2), 15);
        assert_eq!(p.cost("z", 1), 3);
        // fallback
        assert_eq!(p.cost("h", 0), 1);
    }

    #[test]
    fn test_profile_rejects_malformed_lines() {
        assert!(CostProfile::parse("x 0").is_err());
        assert!(CostProfile::parse("x zero 1").is_err());
        assert!(CostProfile::parse("x 0 1 extra").is_err());
    }

    #[test]
    fn test_sequential() {
        let mut s = ApplicationScheme::new(ApplicationSchemeKind::Sequential, 3, 2, None, None)
            .unwrap();
        assert_eq!(s.next(3, 2, None), (3, 0));
        assert_eq!(s.next(0, 2, None), (0, 2));
    }

    #[test]
    fn test_one_to_one() {
        let mut s =
            ApplicationScheme::new(ApplicationSchemeKind::OneToOne, 2, 5, None, None).unwrap();
        assert_eq!(s.next(2, 5, None), (1, 1));
        assert_eq!(s.next(0, 3, None), (0, 1));
        assert_eq!(s.next(1, 0, None), (1, 0));
    }

    #[test]
    fn test_proportional_ratio() {
        let mut s =
            ApplicationScheme::new(ApplicationSchemeKind::Proportional, 2, 5, None, None).unwrap();
        // ceil(5/2) = 3 operations of circuit 2 per operation of circuit 1
        assert_eq!(s.next(2, 5, None), (1, 3));

        let mut s =
            ApplicationScheme::new(ApplicationSchemeKind::Proportional, 6, 2, None, None).unwrap();
        assert_eq!(s.next(6, 2, None), (3, 1));
    }

    #[test]
    fn test_gate_cost_uses_profile() {
        let p = CostProfile::parse("x 1 7").unwrap();
        let mut s =
            ApplicationScheme::new(ApplicationSchemeKind::GateCost, 4, 40, Some(&p), None).unwrap();
        let cx = Operation::gate(StandardGate::CX, [QubitId(0), QubitId(1)]);
        assert_eq!(s.next(4, 40, Some(&cx)), (1, 7));
        // fallback cost 1
        let h = Operation::gate(StandardGate::H, [QubitId(0)]);
        assert_eq!(s.next(4, 40, Some(&h)), (1, 1));
    }

    #[test]
    fn test_lookahead_rejected_here() {
        assert!(ApplicationScheme::new(ApplicationSchemeKind::Lookahead, 1, 1, None, None).is_err());
    }
}
