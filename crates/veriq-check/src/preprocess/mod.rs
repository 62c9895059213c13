//! The preprocessing pipeline.
//!
//! Normalizes both circuits into a comparable form before any checker
//! runs. Each step is gated by its configuration flag; the order is fixed.

pub mod dynamic;
pub mod fusion;
pub mod layout;
pub mod reorder;
pub mod swaps;

use tracing::{debug, warn};

use veriq_ir::Circuit;

use crate::config::Configuration;
use crate::error::{CheckError, CheckResult};

/// Run every configured pass over both circuits, in pipeline order.
pub fn run(qc1: &mut Circuit, qc2: &mut Circuit, config: &Configuration) -> CheckResult<()> {
    if qc1.is_empty() && qc2.is_empty() {
        return Ok(());
    }
    let opts = &config.optimizations;

    let dynamic1 = qc1.is_dynamic();
    let dynamic2 = qc2.is_dynamic();
    if dynamic1 || dynamic2 {
        if !opts.transform_dynamic_circuit {
            return Err(CheckError::InvalidInput(
                "at least one circuit contains non-unitary primitives; enable \
                 `transform_dynamic_circuit` to check dynamic circuits"
                    .into(),
            ));
        }
        if dynamic1 {
            dynamic::eliminate_resets(qc1)?;
            dynamic::defer_measurements(qc1)?;
        }
        if dynamic2 {
            dynamic::eliminate_resets(qc2)?;
            dynamic::defer_measurements(qc2)?;
        }
        debug!("transformed dynamic circuit primitives");
    }

    if opts.reconstruct_swaps {
        swaps::reconstruct_swaps(qc1);
        swaps::reconstruct_swaps(qc2);
    }

    if opts.backpropagate_output_permutation {
        swaps::backpropagate_output_permutation(qc1);
        swaps::backpropagate_output_permutation(qc2);
    }

    if opts.elide_permutations {
        swaps::elide_permutations(qc1);
        swaps::elide_permutations(qc2);
    }

    if opts.fuse_single_qubit_gates {
        fusion::fuse_single_qubit_gates(qc1);
        fusion::fuse_single_qubit_gates(qc2);
    }

    if opts.remove_diagonal_gates_before_measure {
        fusion::remove_diagonal_gates_before_measure(qc1);
        fusion::remove_diagonal_gates_before_measure(qc2);
    }

    if opts.reorder_operations {
        reorder::reorder_operations(qc1);
        reorder::reorder_operations(qc2);
    }

    layout::strip_idle_qubits(qc1, qc2)?;
    layout::align_ancillaries(qc1, qc2);

    if qc1.num_qubits_without_ancillae() != qc2.num_qubits_without_ancillae() {
        warn!(
            "circuits have different numbers of primary inputs ({} vs {}); proceed with caution",
            qc1.num_qubits_without_ancillae(),
            qc2.num_qubits_without_ancillae()
        );
    }

    fusion::remove_final_measurements(qc1);
    fusion::remove_final_measurements(qc2);

    debug!(
        "preprocessing done: {} and {} operations over {} qubits",
        qc1.ops.len(),
        qc2.ops.len(),
        qc1.num_qubits()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriq_ir::{ClbitId, QubitId};

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_dynamic_without_transform_is_rejected() {
        let mut c1 = Circuit::with_size("c1", 1, 0);
        c1.reset(q(0)).unwrap();
        let mut c2 = Circuit::with_size("c2", 1, 0);
        c2.h(q(0)).unwrap();

        let mut config = Configuration::default();
        config.optimizations.transform_dynamic_circuit = false;
        assert!(matches!(
            run(&mut c1, &mut c2, &config),
            Err(CheckError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_full_pipeline_on_dynamic_circuit() {
        let mut c1 = Circuit::with_size("c1", 2, 1);
        c1.x(q(1)).unwrap();
        c1.reset(q(1)).unwrap();
        c1.h(q(0)).unwrap();
        c1.measure(q(0), ClbitId(0)).unwrap();

        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.h(q(0)).unwrap();

        let config = Configuration::default();
        run(&mut c1, &mut c2, &config).unwrap();

        // no dynamic primitives survive
        assert!(!c1.is_dynamic());
        assert!(!c1.ops.iter().any(|op| op.is_measurement()));
        // both circuits end with the same width
        assert_eq!(c1.num_qubits(), c2.num_qubits());
    }

    #[test]
    fn test_pipeline_aligns_ancillaries() {
        let mut c1 = Circuit::with_size("c1", 3, 0);
        c1.h(q(0)).unwrap();
        c1.cx(q(0), q(2)).unwrap();
        let mut c2 = Circuit::with_size("c2", 2, 0);
        c2.h(q(0)).unwrap();

        let config = Configuration::default();
        run(&mut c1, &mut c2, &config).unwrap();

        assert_eq!(c1.num_qubits(), c2.num_qubits());
        assert_eq!(
            c1.num_qubits_without_ancillae(),
            c2.num_qubits_without_ancillae()
        );
    }
}
