//! The equivalence-checking manager.
//!
//! Owns the preprocessed circuits, routes variable-free and symbolic
//! checks, drives the sequential and parallel flows, combines per-checker
//! verdicts, and emits the structured result record.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::{debug, warn};

use veriq_ir::{Circuit, QubitId};

use crate::checker::alternating::DdAlternatingChecker;
use crate::checker::construction::DdConstructionChecker;
use crate::checker::simulation::{Counterexample, DdSimulationChecker};
use crate::checker::zx::ZxEquivalenceChecker;
use crate::checker::{CheckerKind, EquivalenceChecker};
use crate::config::{ApplicationSchemeKind, Configuration, StateKind};
use crate::criterion::EquivalenceCriterion;
use crate::error::{CheckError, CheckResult};
use crate::executor::{execute_with_optional_timeout, Executor};
use crate::preprocess;
use crate::scheme::CostProfile;
use crate::stimulus::{StateGenerator, Stimulus};

/// The aggregated result record of one check.
#[derive(Debug, Clone, Default)]
pub struct Results {
    /// Time spent preprocessing, in seconds.
    pub preprocessing_time: f64,
    /// Time spent checking, in seconds.
    pub check_time: f64,
    /// The combined verdict.
    pub equivalence: Option<EquivalenceCriterion>,
    /// Number of simulations started.
    pub started_simulations: usize,
    /// Number of simulations that ran to completion.
    pub performed_simulations: usize,
    /// Number of parameter instantiations performed.
    pub performed_instantiations: usize,
    /// Whether the check hit the wall-clock budget.
    pub timed_out: bool,
    /// The stimulus of the counterexample, if one was found.
    pub cex_input: Option<Stimulus>,
    /// Per-checker records, in completion order.
    pub checker_records: Vec<serde_json::Value>,
}

impl Results {
    /// The combined verdict (`NoInformation` before `run()`).
    pub fn equivalence(&self) -> EquivalenceCriterion {
        self.equivalence
            .unwrap_or(EquivalenceCriterion::NoInformation)
    }

    /// Whether the verdict counts as an equivalence.
    pub fn considered_equivalent(&self) -> bool {
        self.equivalence().considered_equivalent()
    }

    /// Serialize to the nested result map.
    pub fn json(&self) -> serde_json::Value {
        let mut res = json!({
            "preprocessing_time": self.preprocessing_time,
            "check_time": self.check_time,
            "equivalence": self.equivalence().as_str(),
            "parameterized": { "performed_instantiations": self.performed_instantiations },
            "checkers": self.checker_records,
        });
        if self.started_simulations > 0 {
            res["simulations"] = json!({
                "started": self.started_simulations,
                "performed": self.performed_simulations,
            });
        }
        res
    }
}

enum WorkerSpec {
    Alternating,
    Construction,
    GraphRewrite,
    Simulation(Stimulus),
}

/// The top-level engine object.
pub struct EquivalenceCheckingManager {
    qc1: Arc<Circuit>,
    qc2: Arc<Circuit>,
    original1: Circuit,
    original2: Circuit,
    configuration: Configuration,
    profile: Arc<Option<CostProfile>>,
    generator: StateGenerator,
    checkers: Vec<Box<dyn EquivalenceChecker>>,
    cex_checker: Option<DdSimulationChecker>,
    results: Results,
}

impl EquivalenceCheckingManager {
    /// Create a manager: preprocesses both circuits (for variable-free
    /// inputs), validates checker applicability, and seeds the stimulus
    /// generator.
    pub fn new(circ1: Circuit, circ2: Circuit, config: Configuration) -> CheckResult<Self> {
        let start = Instant::now();
        let mut configuration = config;

        let profile = match (&configuration.application.profile_path, uses_gate_cost(&configuration)) {
            (Some(path), true) => Arc::new(Some(CostProfile::from_file(path)?)),
            _ => Arc::new(None),
        };

        let original1 = circ1.clone();
        let original2 = circ2.clone();
        let mut qc1 = circ1;
        let mut qc2 = circ2;

        let variable_free = qc1.is_variable_free() && qc2.is_variable_free();
        if variable_free {
            preprocess::run(&mut qc1, &mut qc2, &configuration)?;

            if configuration.execution.set_all_ancillae_garbage {
                for qc in [&mut qc1, &mut qc2] {
                    for q in 0..qc.num_qubits() {
                        let q = QubitId::from(q);
                        if qc.is_ancillary(q) {
                            qc.set_garbage(q);
                        }
                    }
                }
            }

            if configuration.execution.run_alternating_checker
                && !DdAlternatingChecker::can_handle(&qc1, &qc2, &configuration)
            {
                warn!(
                    "alternating checker cannot handle the circuits; falling back to the \
                     construction checker"
                );
                configuration.execution.run_alternating_checker = false;
                configuration.execution.run_construction_checker = true;
            }

            // the computational-basis stimulus space may be smaller than the
            // requested number of simulations
            if configuration.execution.run_simulation_checker
                && configuration.simulation.state_type == StateKind::ComputationalBasis
            {
                let r = qc1.num_qubits_without_ancillae();
                if r <= 63 {
                    let unique = 1u64 << r;
                    if configuration.simulation.max_sims as u64 > unique {
                        configuration.simulation.max_sims = unique as usize;
                    }
                }
            }
        }

        let generator = StateGenerator::new(configuration.simulation.seed);
        let mut results = Results::default();
        results.preprocessing_time = start.elapsed().as_secs_f64();

        Ok(Self {
            qc1: Arc::new(qc1),
            qc2: Arc::new(qc2),
            original1,
            original2,
            configuration,
            profile,
            generator,
            checkers: vec![],
            cex_checker: None,
            results,
        })
    }

    /// The combined verdict.
    pub fn equivalence(&self) -> EquivalenceCriterion {
        self.results.equivalence()
    }

    /// The result record.
    pub fn results(&self) -> &Results {
        &self.results
    }

    /// The configuration (mutable, to tweak between runs).
    pub fn configuration_mut(&mut self) -> &mut Configuration {
        &mut self.configuration
    }

    /// The first circuit after preprocessing.
    pub fn first_circuit(&self) -> &Circuit {
        &self.qc1
    }

    /// The second circuit after preprocessing.
    pub fn second_circuit(&self) -> &Circuit {
        &self.qc2
    }

    /// The counterexample produced by a sequential simulation checker, if
    /// any, together with the package that owns its decision diagrams.
    pub fn counterexample(&self) -> Option<(&veriq_dd::DdPackage, &Counterexample)> {
        self.cex_checker
            .as_ref()
            .and_then(|c| c.counterexample().map(|cex| (c.package(), cex)))
    }

    /// Discard all results so the check can be run again.
    pub fn reset(&mut self) {
        self.results = Results {
            preprocessing_time: self.results.preprocessing_time,
            ..Results::default()
        };
        self.checkers.clear();
        self.cex_checker = None;
        self.generator = StateGenerator::new(self.configuration.simulation.seed);
    }

    /// Run the equivalence check.
    pub fn run(&mut self) -> CheckResult<()> {
        self.results.equivalence = Some(EquivalenceCriterion::NoInformation);

        if !self.configuration.anything_to_execute() {
            warn!("nothing to be executed; check the configuration");
            return Ok(());
        }

        if self.qc1.is_empty() && self.qc2.is_empty() {
            self.results.equivalence = Some(EquivalenceCriterion::Equivalent);
            return Ok(());
        }

        let variable_free = self.qc1.is_variable_free() && self.qc2.is_variable_free();
        if variable_free {
            let exec = &self.configuration.execution;
            if !exec.parallel || exec.nthreads <= 1 || self.configuration.only_single_task() {
                self.check_sequential()?;
            } else {
                self.check_parallel()?;
            }
        } else {
            self.check_symbolic()?;
        }

        let records: Vec<serde_json::Value> =
            self.checkers.iter().map(|c| c.record()).collect();
        self.results.checker_records.extend(records);
        if let Some(cex) = &self.cex_checker {
            self.results.checker_records.push(cex.record());
        }

        let garbage_present = self.qc1.num_garbage() > 0 || self.qc2.num_garbage() > 0;
        if !self.configuration.functionality.check_partial_equivalence
            && garbage_present
            && self.equivalence() == EquivalenceCriterion::NotEquivalent
        {
            warn!(
                "at least one circuit has garbage qubits but partial equivalence checking is \
                 off; enable it to take garbage qubits into account"
            );
        }
        Ok(())
    }

    // =========================================================================
    // Sequential flow
    // =========================================================================

    fn check_sequential(&mut self) -> CheckResult<()> {
        let start = Instant::now();
        let timeout = timeout_duration(self.configuration.execution.timeout_seconds);

        if timeout.is_zero() {
            let verdict = self.run_sequential_checks()?;
            self.results.equivalence = Some(verdict);
        } else {
            // the timeout path runs in a worker; per-checker records and
            // counterexamples are not carried back
            let qc1 = Arc::clone(&self.qc1);
            let qc2 = Arc::clone(&self.qc2);
            let config = self.configuration.clone();
            let profile = Arc::clone(&self.profile);
            let (verdict, timed_out) = execute_with_optional_timeout(
                move || run_sequential_standalone(qc1, qc2, config, profile),
                timeout,
            )?;
            self.results.equivalence = Some(verdict);
            self.results.timed_out = timed_out;
        }

        self.results.check_time = start.elapsed().as_secs_f64();
        Ok(())
    }

    fn run_sequential_checks(&mut self) -> CheckResult<EquivalenceCriterion> {
        let mut local = EquivalenceCriterion::NoInformation;
        let config = Arc::new(self.configuration.clone());
        let no_abort = || Arc::new(AtomicBool::new(false));

        if self.configuration.execution.run_simulation_checker {
            let total = self.qc1.num_qubits();
            let ancillary = self.qc1.num_ancillary();
            let mut last: Option<DdSimulationChecker> = None;

            while self.results.performed_simulations < self.configuration.simulation.max_sims {
                let stimulus = self.generator.generate(
                    self.configuration.simulation.state_type,
                    total,
                    ancillary,
                );
                let mut checker = DdSimulationChecker::new(
                    Arc::clone(&self.qc1),
                    Arc::clone(&self.qc2),
                    Arc::clone(&config),
                    Arc::clone(&self.profile),
                    no_abort(),
                    stimulus,
                );
                self.results.started_simulations += 1;
                let result = checker.run()?;
                self.results.performed_simulations += 1;

                if result == EquivalenceCriterion::NoInformation {
                    self.cex_checker = Some(checker);
                    return Ok(EquivalenceCriterion::NoInformation);
                }
                if result == EquivalenceCriterion::NotEquivalent {
                    self.results.cex_input = Some(checker.stimulus().clone());
                    self.cex_checker = Some(checker);
                    return Ok(EquivalenceCriterion::NotEquivalent);
                }
                local = EquivalenceCriterion::ProbablyEquivalent;
                last = Some(checker);
            }
            if let Some(checker) = last {
                self.checkers.push(Box::new(checker));
            }

            if self.configuration.only_simulation_checker_configured() {
                return Ok(local);
            }
        }

        if self.configuration.execution.run_alternating_checker {
            let mut checker = DdAlternatingChecker::new(
                Arc::clone(&self.qc1),
                Arc::clone(&self.qc2),
                Arc::clone(&config),
                Arc::clone(&self.profile),
                no_abort(),
            );
            let result = checker.run()?;
            self.checkers.push(Box::new(checker));
            if result != EquivalenceCriterion::NoInformation {
                return Ok(result);
            }
        }

        if self.configuration.execution.run_construction_checker {
            let mut checker = DdConstructionChecker::new(
                Arc::clone(&self.qc1),
                Arc::clone(&self.qc2),
                Arc::clone(&config),
                Arc::clone(&self.profile),
                no_abort(),
            );
            let result = checker.run()?;
            self.checkers.push(Box::new(checker));
            if result != EquivalenceCriterion::NoInformation {
                return Ok(result);
            }
        }

        if self.configuration.execution.run_graph_rewrite_checker {
            if ZxEquivalenceChecker::can_handle(&self.qc1, &self.qc2) {
                let mut checker = ZxEquivalenceChecker::new(
                    Arc::clone(&self.qc1),
                    Arc::clone(&self.qc2),
                    Arc::clone(&config),
                    Arc::clone(&self.profile),
                    no_abort(),
                );
                let result = checker.run()?;
                self.checkers.push(Box::new(checker));
                match result {
                    EquivalenceCriterion::Equivalent
                    | EquivalenceCriterion::EquivalentUpToGlobalPhase => return Ok(result),
                    EquivalenceCriterion::ProbablyNotEquivalent => {
                        if local == EquivalenceCriterion::ProbablyEquivalent {
                            warn!(
                                "the rewriter suggests non-equivalence while simulations suggest \
                                 equivalence; no conclusion can be drawn"
                            );
                            return Ok(EquivalenceCriterion::NoInformation);
                        }
                        return Ok(EquivalenceCriterion::ProbablyNotEquivalent);
                    }
                    EquivalenceCriterion::NoInformation
                        if self.configuration.only_graph_rewrite_checker_configured() =>
                    {
                        return Ok(EquivalenceCriterion::NoInformation);
                    }
                    _ => {}
                }
            } else if self.configuration.only_graph_rewrite_checker_configured() {
                return Ok(EquivalenceCriterion::NoInformation);
            }
        }

        Ok(local)
    }

    // =========================================================================
    // Parallel flow
    // =========================================================================

    fn check_parallel(&mut self) -> CheckResult<()> {
        let start = Instant::now();
        let timeout = timeout_duration(self.configuration.execution.timeout_seconds);
        let deadline = (!timeout.is_zero()).then(|| start + timeout);

        if let Ok(hw) = std::thread::available_parallelism() {
            if self.configuration.execution.nthreads > hw.get() {
                warn!(
                    "requested {} workers but the host reports {} cores; oversubscription may \
                     hurt performance",
                    self.configuration.execution.nthreads,
                    hw.get()
                );
            }
        }

        let mut run_zx = self.configuration.execution.run_graph_rewrite_checker;
        if run_zx && !ZxEquivalenceChecker::can_handle(&self.qc1, &self.qc2) {
            run_zx = false;
        }

        let mut tasks = 0usize;
        if self.configuration.execution.run_alternating_checker {
            tasks += 1;
        }
        if self.configuration.execution.run_construction_checker {
            tasks += 1;
        }
        if run_zx {
            tasks += 1;
        }
        if self.configuration.execution.run_simulation_checker {
            tasks += self.configuration.simulation.max_sims;
        }
        let effective = self.configuration.execution.nthreads.min(tasks);

        let mut executor = Executor::new();
        let mut next_id = 0usize;
        let config = Arc::new(self.configuration.clone());

        if self.configuration.execution.run_alternating_checker {
            self.spawn_worker(&mut executor, next_id, WorkerSpec::Alternating, &config);
            next_id += 1;
        }
        if self.configuration.execution.run_construction_checker {
            self.spawn_worker(&mut executor, next_id, WorkerSpec::Construction, &config);
            next_id += 1;
        }
        if run_zx {
            self.spawn_worker(&mut executor, next_id, WorkerSpec::GraphRewrite, &config);
            next_id += 1;
        }
        if self.configuration.execution.run_simulation_checker {
            let slots = effective.saturating_sub(executor.num_running());
            let to_start = slots.min(self.configuration.simulation.max_sims);
            for _ in 0..to_start {
                let stimulus = self.draw_stimulus();
                self.spawn_worker(
                    &mut executor,
                    next_id,
                    WorkerSpec::Simulation(stimulus),
                    &config,
                );
                next_id += 1;
                self.results.started_simulations += 1;
            }
        }

        let mut done = false;
        while executor.has_running() && !done {
            let Some(result) = executor.wait_any(deadline) else {
                self.results.timed_out = deadline.is_some();
                break;
            };

            if let Some(kind) = result.exception {
                executor.terminate_all();
                self.results.check_time = start.elapsed().as_secs_f64();
                return Err(CheckError::Checker(kind));
            }
            if !result.completed {
                warn!("a worker did not complete; ignoring its result");
                continue;
            }

            let verdict = result.verdict;
            match result.kind {
                CheckerKind::Alternating | CheckerKind::Construction => {
                    if verdict == EquivalenceCriterion::NoInformation {
                        warn!("a decision-diagram checker finished without information");
                        self.results.equivalence = Some(verdict);
                        done = true;
                    } else {
                        self.results.equivalence = Some(verdict);
                        done = true;
                    }
                }
                CheckerKind::GraphRewrite => match verdict {
                    EquivalenceCriterion::Equivalent
                    | EquivalenceCriterion::EquivalentUpToGlobalPhase => {
                        self.results.equivalence = Some(verdict);
                        done = true;
                    }
                    EquivalenceCriterion::NotEquivalent => {
                        self.results.equivalence = Some(verdict);
                        done = true;
                    }
                    EquivalenceCriterion::ProbablyNotEquivalent => {
                        if self.equivalence() == EquivalenceCriterion::ProbablyEquivalent {
                            if self.simulations_finished() {
                                warn!(
                                    "rewriter and simulations disagree; no conclusion can be \
                                     drawn"
                                );
                                self.results.equivalence =
                                    Some(EquivalenceCriterion::NoInformation);
                                done = true;
                            } else {
                                self.results.equivalence = Some(verdict);
                            }
                        } else if self.equivalence() == EquivalenceCriterion::NoInformation {
                            self.results.equivalence = Some(verdict);
                            if self.configuration.only_graph_rewrite_checker_configured() {
                                done = true;
                            }
                        }
                    }
                    EquivalenceCriterion::NoInformation => {
                        if self.configuration.only_graph_rewrite_checker_configured() {
                            warn!(
                                "only the graph-rewrite checker was configured and it could not \
                                 conclude anything; it is incomplete in general"
                            );
                            done = true;
                        }
                    }
                    _ => {}
                },
                CheckerKind::Simulation => {
                    self.results.performed_simulations += 1;
                    match verdict {
                        EquivalenceCriterion::NotEquivalent => {
                            // counterexample DDs stay in the worker; only the
                            // fact of non-equivalence survives
                            self.results.equivalence = Some(verdict);
                            done = true;
                        }
                        EquivalenceCriterion::NoInformation => {
                            warn!("a simulation finished without information");
                            self.results.equivalence = Some(verdict);
                            done = true;
                        }
                        _ => {
                            if self.equivalence() == EquivalenceCriterion::NoInformation {
                                self.results.equivalence =
                                    Some(EquivalenceCriterion::ProbablyEquivalent);
                            }
                            if self.simulations_finished() {
                                if self.configuration.only_simulation_checker_configured() {
                                    done = true;
                                } else if self.equivalence()
                                    == EquivalenceCriterion::ProbablyNotEquivalent
                                {
                                    warn!(
                                        "rewriter and simulations disagree; no conclusion can \
                                         be drawn"
                                    );
                                    self.results.equivalence =
                                        Some(EquivalenceCriterion::NoInformation);
                                    done = true;
                                }
                            } else if self.results.started_simulations
                                < self.configuration.simulation.max_sims
                                && executor.num_running() < effective
                            {
                                let stimulus = self.draw_stimulus();
                                self.spawn_worker(
                                    &mut executor,
                                    next_id,
                                    WorkerSpec::Simulation(stimulus),
                                    &config,
                                );
                                next_id += 1;
                                self.results.started_simulations += 1;
                            }
                        }
                    }
                }
            }
        }

        executor.terminate_all();
        if self.results.timed_out {
            self.results.equivalence = Some(EquivalenceCriterion::NoInformation);
        }
        self.results.check_time = start.elapsed().as_secs_f64();
        Ok(())
    }

    fn draw_stimulus(&mut self) -> Stimulus {
        self.generator.generate(
            self.configuration.simulation.state_type,
            self.qc1.num_qubits(),
            self.qc1.num_ancillary(),
        )
    }

    fn spawn_worker(
        &self,
        executor: &mut Executor,
        id: usize,
        spec: WorkerSpec,
        config: &Arc<Configuration>,
    ) {
        let qc1 = Arc::clone(&self.qc1);
        let qc2 = Arc::clone(&self.qc2);
        let config = Arc::clone(config);
        let profile = Arc::clone(&self.profile);
        let abort = Arc::new(AtomicBool::new(false));
        let worker_abort = Arc::clone(&abort);

        let kind = match &spec {
            WorkerSpec::Alternating => CheckerKind::Alternating,
            WorkerSpec::Construction => CheckerKind::Construction,
            WorkerSpec::GraphRewrite => CheckerKind::GraphRewrite,
            WorkerSpec::Simulation(_) => CheckerKind::Simulation,
        };

        executor.spawn(id, kind, abort, move || match spec {
            WorkerSpec::Alternating => {
                DdAlternatingChecker::new(qc1, qc2, config, profile, worker_abort).run()
            }
            WorkerSpec::Construction => {
                DdConstructionChecker::new(qc1, qc2, config, profile, worker_abort).run()
            }
            WorkerSpec::GraphRewrite => {
                ZxEquivalenceChecker::new(qc1, qc2, config, profile, worker_abort).run()
            }
            WorkerSpec::Simulation(stimulus) => {
                DdSimulationChecker::new(qc1, qc2, config, profile, worker_abort, stimulus).run()
            }
        });
    }

    fn simulations_finished(&self) -> bool {
        self.results.performed_simulations >= self.configuration.simulation.max_sims
    }

    // =========================================================================
    // Symbolic flow
    // =========================================================================

    fn check_symbolic(&mut self) -> CheckResult<()> {
        let start = Instant::now();

        let mut vars = self.original1.free_variables();
        vars.extend(self.original2.free_variables());
        let vars: Vec<String> = vars.into_iter().collect();
        let rounds = 1 + self.configuration.parameterized.additional_instantiations;

        let seed = self.configuration.simulation.seed;
        let mut rng = if seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(seed)
        };

        let mut combined = EquivalenceCriterion::NoInformation;
        for round in 0..rounds {
            let mut inst1 = self.original1.clone();
            let mut inst2 = self.original2.clone();
            let assignment = vars
                .iter()
                .enumerate()
                .map(|(j, name)| {
                    let value = if round == 0 {
                        // angles avoiding symmetry axes
                        std::f64::consts::PI * (j as f64 + 1.0) / (vars.len() as f64 + 1.0)
                    } else {
                        rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI)
                    };
                    (name.clone(), value)
                })
                .collect();
            inst1.instantiate(&assignment);
            inst2.instantiate(&assignment);

            let mut sub_config = self.configuration.clone();
            sub_config.execution.timeout_seconds = 0.0;
            let mut sub = EquivalenceCheckingManager::new(inst1, inst2, sub_config)?;
            sub.run()?;
            self.results.performed_instantiations += 1;

            let verdict = sub.equivalence();
            debug!("instantiation {round} returned {verdict}");
            if verdict == EquivalenceCriterion::NotEquivalent {
                combined = EquivalenceCriterion::NotEquivalent;
                break;
            }
            combined = if round == 0 {
                verdict
            } else {
                combined.weakest(verdict)
            };
        }

        self.results.equivalence = Some(combined);
        self.results.check_time = start.elapsed().as_secs_f64();
        Ok(())
    }
}

fn uses_gate_cost(config: &Configuration) -> bool {
    let a = &config.application;
    a.construction_scheme == ApplicationSchemeKind::GateCost
        || a.simulation_scheme == ApplicationSchemeKind::GateCost
        || a.alternating_scheme == ApplicationSchemeKind::GateCost
}

fn timeout_duration(seconds: f64) -> Duration {
    if seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

/// Sequential checks in a standalone worker, used for the timeout path.
fn run_sequential_standalone(
    qc1: Arc<Circuit>,
    qc2: Arc<Circuit>,
    config: Configuration,
    profile: Arc<Option<CostProfile>>,
) -> CheckResult<EquivalenceCriterion> {
    let config_arc = Arc::new(config.clone());
    let no_abort = || Arc::new(AtomicBool::new(false));
    let mut generator = StateGenerator::new(config.simulation.seed);
    let mut local = EquivalenceCriterion::NoInformation;

    if config.execution.run_simulation_checker {
        let total = qc1.num_qubits();
        let ancillary = qc1.num_ancillary();
        for _ in 0..config.simulation.max_sims {
            let stimulus = generator.generate(config.simulation.state_type, total, ancillary);
            let mut checker = DdSimulationChecker::new(
                Arc::clone(&qc1),
                Arc::clone(&qc2),
                Arc::clone(&config_arc),
                Arc::clone(&profile),
                no_abort(),
                stimulus,
            );
            let result = checker.run()?;
            if result == EquivalenceCriterion::NoInformation
                || result == EquivalenceCriterion::NotEquivalent
            {
                return Ok(result);
            }
            local = EquivalenceCriterion::ProbablyEquivalent;
        }
        if config.only_simulation_checker_configured() {
            return Ok(local);
        }
    }

    if config.execution.run_alternating_checker {
        let result = DdAlternatingChecker::new(
            Arc::clone(&qc1),
            Arc::clone(&qc2),
            Arc::clone(&config_arc),
            Arc::clone(&profile),
            no_abort(),
        )
        .run()?;
        if result != EquivalenceCriterion::NoInformation {
            return Ok(result);
        }
    }

    if config.execution.run_construction_checker {
        let result = DdConstructionChecker::new(
            Arc::clone(&qc1),
            Arc::clone(&qc2),
            Arc::clone(&config_arc),
            Arc::clone(&profile),
            no_abort(),
        )
        .run()?;
        if result != EquivalenceCriterion::NoInformation {
            return Ok(result);
        }
    }

    if config.execution.run_graph_rewrite_checker && ZxEquivalenceChecker::can_handle(&qc1, &qc2) {
        let result = ZxEquivalenceChecker::new(
            Arc::clone(&qc1),
            Arc::clone(&qc2),
            Arc::clone(&config_arc),
            Arc::clone(&profile),
            no_abort(),
        )
        .run()?;
        match result {
            EquivalenceCriterion::Equivalent | EquivalenceCriterion::EquivalentUpToGlobalPhase => {
                return Ok(result)
            }
            EquivalenceCriterion::ProbablyNotEquivalent => {
                if local == EquivalenceCriterion::ProbablyEquivalent {
                    return Ok(EquivalenceCriterion::NoInformation);
                }
                return Ok(EquivalenceCriterion::ProbablyNotEquivalent);
            }
            _ => {}
        }
    }

    Ok(local)
}
