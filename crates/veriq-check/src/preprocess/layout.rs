//! Idle-qubit stripping and ancillary alignment.

use tracing::debug;

use veriq_ir::{Circuit, QubitId};

use crate::error::CheckResult;

/// A qubit may only leave a circuit if its removal cannot change the
/// declared outputs: either neither its physical nor its logical index is
/// referenced by the output permutation, or the physical index maps
/// identity-style to the very logical qubit being removed.
fn safe_to_remove(circ: &Circuit, physical: QubitId, logical: QubitId) -> bool {
    let physical_used = circ.output_permutation.contains(physical);
    let logical_used = circ.output_permutation.maps_to(logical);
    (!physical_used && !logical_used)
        || (physical_used && circ.output_permutation.get(physical) == Some(logical))
}

fn decrement_logicals_above(circ: &mut Circuit, logical: QubitId) {
    let fix = |p: veriq_ir::Permutation| {
        p.iter()
            .map(|(phys, l)| {
                if l > logical {
                    (phys, QubitId(l.0 - 1))
                } else {
                    (phys, l)
                }
            })
            .collect()
    };
    circ.initial_layout = fix(std::mem::take(&mut circ.initial_layout));
    circ.output_permutation = fix(std::mem::take(&mut circ.output_permutation));
}

/// Strip idle qubits from the larger circuit (and, where the logical qubit
/// exists and is idle in both, from both circuits).
pub fn strip_idle_qubits(qc1: &mut Circuit, qc2: &mut Circuit) -> CheckResult<()> {
    let (larger, smaller) = if qc1.num_qubits() > qc2.num_qubits() {
        (qc1, qc2)
    } else {
        (qc2, qc1)
    };
    let mut difference = larger.num_qubits() - smaller.num_qubits();

    let layout_snapshot: Vec<(QubitId, QubitId)> = larger.initial_layout.iter().collect();
    for &(physical, _) in layout_snapshot.iter().rev() {
        // the layout may have shifted under earlier removals; re-resolve
        let Some(logical) = larger.initial_layout.get(physical) else {
            continue;
        };
        if !larger.is_idle(physical) {
            continue;
        }

        let beyond_smaller = smaller.num_qubits() == 0
            || smaller
                .initial_layout
                .max_logical()
                .map_or(true, |max| logical > max);

        if difference > 0 && beyond_smaller {
            if !safe_to_remove(larger, physical, logical) {
                continue;
            }
            larger.remove_qubit(logical)?;
            decrement_logicals_above(larger, logical);
            difference -= 1;
            debug!("stripped idle qubit {logical} from the larger circuit");
        } else {
            let Some(physical_smaller) = smaller.initial_layout.find_logical(logical) else {
                continue;
            };
            if !smaller.is_idle(physical_smaller) {
                continue;
            }
            if !safe_to_remove(larger, physical, logical)
                || !safe_to_remove(smaller, physical_smaller, logical)
            {
                continue;
            }
            larger.remove_qubit(logical)?;
            decrement_logicals_above(larger, logical);
            smaller.remove_qubit(logical)?;
            decrement_logicals_above(smaller, logical);
            debug!("stripped idle qubit {logical} from both circuits");
        }
    }
    Ok(())
}

/// Attribute the remaining qubit-count difference to ancillary qubits: the
/// surplus qubits of the larger circuit become ancillary, the smaller
/// circuit gains a matching ancillary register, and garbage status is
/// mirrored (every added ancillary of the smaller circuit is garbage).
pub fn align_ancillaries(qc1: &mut Circuit, qc2: &mut Circuit) {
    let (larger, smaller) = if qc1.num_qubits() > qc2.num_qubits() {
        (qc1, qc2)
    } else {
        (qc2, qc1)
    };
    let difference = larger.num_qubits() - smaller.num_qubits();
    if difference == 0 {
        return;
    }

    let n = larger.num_qubits();
    for q in (n - difference)..n {
        larger.set_ancillary(QubitId::from(q));
    }
    smaller.add_ancillary_register(difference);
    for q in (n - difference)..n {
        smaller.set_garbage(QubitId::from(q));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_strip_idle_from_larger_only() {
        let mut big = Circuit::with_size("big", 3, 0);
        big.h(q(0)).unwrap();
        big.x(q(1)).unwrap();
        let mut small = Circuit::with_size("small", 2, 0);
        small.h(q(0)).unwrap();

        strip_idle_qubits(&mut big, &mut small).unwrap();
        assert_eq!(big.num_qubits(), 2);
        assert_eq!(small.num_qubits(), 2);
    }

    #[test]
    fn test_strip_idle_from_both() {
        let mut a = Circuit::with_size("a", 3, 0);
        a.h(q(0)).unwrap();
        a.x(q(2)).unwrap();
        let mut b = Circuit::with_size("b", 3, 0);
        b.h(q(0)).unwrap();
        b.z(q(2)).unwrap();

        // qubit 1 is idle in both
        strip_idle_qubits(&mut a, &mut b).unwrap();
        assert_eq!(a.num_qubits(), 2);
        assert_eq!(b.num_qubits(), 2);
        // the higher wire shifted down
        assert_eq!(a.ops[1].qubits, vec![q(1)]);
        assert_eq!(b.ops[1].qubits, vec![q(1)]);
    }

    #[test]
    fn test_used_qubit_is_kept() {
        let mut a = Circuit::with_size("a", 2, 0);
        a.h(q(0)).unwrap();
        a.x(q(1)).unwrap();
        let mut b = Circuit::with_size("b", 2, 0);
        b.h(q(0)).unwrap();

        strip_idle_qubits(&mut a, &mut b).unwrap();
        // qubit 1 is used in a, so neither circuit loses it
        assert_eq!(a.num_qubits(), 2);
        assert_eq!(b.num_qubits(), 2);
    }

    #[test]
    fn test_align_ancillaries() {
        let mut big = Circuit::with_size("big", 3, 0);
        big.h(q(0)).unwrap();
        big.x(q(2)).unwrap();
        let mut small = Circuit::with_size("small", 2, 0);
        small.h(q(0)).unwrap();

        align_ancillaries(&mut big, &mut small);
        assert_eq!(small.num_qubits(), 3);
        assert!(big.is_ancillary(q(2)));
        assert!(small.is_ancillary(q(2)));
        assert!(small.is_garbage(q(2)));
        assert_eq!(
            big.num_qubits_without_ancillae(),
            small.num_qubits_without_ancillae()
        );
    }
}
