//! Worker execution with cooperative cancellation.
//!
//! Workers are threads sharing the address space; this is the documented
//! weaker cancellation model for hosts without copy-on-write process
//! isolation, which is the portable choice for a Rust library. Every
//! worker owns its own DD package, treats the preprocessed circuits as
//! read-only, and writes exactly one record into a channel before exiting.
//! Termination raises the abort flags; stragglers observe them at the next
//! operation boundary and drain in the background.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::checker::CheckerKind;
use crate::criterion::EquivalenceCriterion;
use crate::error::{CheckResult, ExceptionKind};

/// The record a worker writes when it finishes.
#[derive(Debug, Clone, Copy)]
pub struct WorkerResult {
    /// Identifier assigned at spawn time.
    pub id: usize,
    /// The kind of checker the worker ran.
    pub kind: CheckerKind,
    /// The verdict; `NoInformation` if the worker failed.
    pub verdict: EquivalenceCriterion,
    /// Whether the worker ran to completion.
    pub completed: bool,
    /// Whether the executor gave up on the worker pool before this result.
    pub timed_out: bool,
    /// The exception kind, if the worker raised.
    pub exception: Option<ExceptionKind>,
}

/// Spawns workers and multiplexes their single-record results.
pub struct Executor {
    tx: Sender<WorkerResult>,
    rx: Receiver<WorkerResult>,
    aborts: Vec<Arc<AtomicBool>>,
    running: usize,
}

impl Executor {
    /// Create an executor.
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            aborts: vec![],
            running: 0,
        }
    }

    /// Number of workers that have not reported yet.
    pub fn num_running(&self) -> usize {
        self.running
    }

    /// Whether any worker is still outstanding.
    pub fn has_running(&self) -> bool {
        self.running > 0
    }

    /// Spawn a worker. The task receives nothing and returns its verdict;
    /// panics and errors are converted into exception records.
    pub fn spawn<F>(&mut self, id: usize, kind: CheckerKind, abort: Arc<AtomicBool>, task: F)
    where
        F: FnOnce() -> CheckResult<EquivalenceCriterion> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.aborts.push(abort);
        self.running += 1;

        // workers are detached; they always report through the channel
        let _ = std::thread::spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task));
            let result = match outcome {
                Ok(Ok(verdict)) => WorkerResult {
                    id,
                    kind,
                    verdict,
                    completed: true,
                    timed_out: false,
                    exception: None,
                },
                Ok(Err(err)) => WorkerResult {
                    id,
                    kind,
                    verdict: EquivalenceCriterion::NoInformation,
                    completed: false,
                    timed_out: false,
                    exception: Some(err.exception_kind()),
                },
                Err(_) => WorkerResult {
                    id,
                    kind,
                    verdict: EquivalenceCriterion::NoInformation,
                    completed: false,
                    timed_out: false,
                    exception: Some(ExceptionKind::Other),
                },
            };
            // the executor may already have moved on; a closed channel is fine
            let _ = tx.send(result);
        });
    }

    /// Wait until any worker reports, or until `deadline` passes. `None`
    /// means the wait timed out.
    pub fn wait_any(&mut self, deadline: Option<Instant>) -> Option<WorkerResult> {
        if self.running == 0 {
            return None;
        }
        let result = match deadline {
            None => self.rx.recv().ok(),
            Some(deadline) => loop {
                let now = Instant::now();
                if now >= deadline {
                    break None;
                }
                match self.rx.recv_timeout(deadline - now) {
                    Ok(r) => break Some(r),
                    Err(RecvTimeoutError::Timeout) => break None,
                    Err(RecvTimeoutError::Disconnected) => break None,
                }
            },
        };
        if result.is_some() {
            self.running -= 1;
        } else {
            debug!("executor wait timed out with {} workers outstanding", self.running);
        }
        result
    }

    /// Raise every worker's abort flag. Workers observe the flag between
    /// operation applications and exit with `NoInformation`.
    pub fn terminate_all(&mut self) {
        for abort in &self.aborts {
            abort.store(true, Ordering::Relaxed);
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a task with an optional wall-clock budget. Without a budget the
/// task runs in the caller's thread; with one it runs in a worker and a
/// timeout yields `NoInformation`.
pub fn execute_with_optional_timeout<F>(
    task: F,
    timeout: Duration,
) -> CheckResult<(EquivalenceCriterion, bool)>
where
    F: FnOnce() -> CheckResult<EquivalenceCriterion> + Send + 'static,
{
    if timeout.is_zero() {
        return task().map(|c| (c, false));
    }

    let mut executor = Executor::new();
    let abort = Arc::new(AtomicBool::new(false));
    executor.spawn(0, CheckerKind::Construction, Arc::clone(&abort), task);
    match executor.wait_any(Some(Instant::now() + timeout)) {
        Some(result) => {
            if let Some(kind) = result.exception {
                return Err(crate::error::CheckError::Checker(kind));
            }
            Ok((result.verdict, false))
        }
        None => {
            executor.terminate_all();
            Ok((EquivalenceCriterion::NoInformation, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workers_report_results() {
        let mut ex = Executor::new();
        for id in 0..3 {
            ex.spawn(
                id,
                CheckerKind::Simulation,
                Arc::new(AtomicBool::new(false)),
                move || Ok(EquivalenceCriterion::Equivalent),
            );
        }
        let mut seen = vec![];
        while ex.has_running() {
            let r = ex.wait_any(None).expect("worker reports");
            assert!(r.completed);
            assert_eq!(r.verdict, EquivalenceCriterion::Equivalent);
            seen.push(r.id);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_panic_becomes_exception() {
        let mut ex = Executor::new();
        ex.spawn(
            0,
            CheckerKind::Construction,
            Arc::new(AtomicBool::new(false)),
            || panic!("boom"),
        );
        let r = ex.wait_any(None).expect("worker reports");
        assert!(!r.completed);
        assert_eq!(r.exception, Some(ExceptionKind::Other));
    }

    #[test]
    fn test_error_kind_travels() {
        let mut ex = Executor::new();
        ex.spawn(
            0,
            CheckerKind::Construction,
            Arc::new(AtomicBool::new(false)),
            || Err(crate::error::CheckError::InvalidInput("bad".into())),
        );
        let r = ex.wait_any(None).expect("worker reports");
        assert_eq!(r.exception, Some(ExceptionKind::InvalidArgument));
    }

    #[test]
    fn test_timeout_returns_none_and_aborts() {
        let mut ex = Executor::new();
        let abort = Arc::new(AtomicBool::new(false));
        let worker_abort = Arc::clone(&abort);
        ex.spawn(0, CheckerKind::Simulation, Arc::clone(&abort), move || {
            while !worker_abort.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(EquivalenceCriterion::NoInformation)
        });
        let r = ex.wait_any(Some(Instant::now() + Duration::from_millis(20)));
        assert!(r.is_none());
        ex.terminate_all();
        assert!(abort.load(Ordering::Relaxed));
    }

    #[test]
    fn test_execute_with_timeout() {
        let (verdict, timed_out) = execute_with_optional_timeout(
            || Ok(EquivalenceCriterion::Equivalent),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(verdict, EquivalenceCriterion::Equivalent);
        assert!(!timed_out);

        let (verdict, timed_out) = execute_with_optional_timeout(
            || {
                std::thread::sleep(Duration::from_millis(100));
                Ok(EquivalenceCriterion::Equivalent)
            },
            Duration::from_millis(10),
        )
        .unwrap();
        assert_eq!(verdict, EquivalenceCriterion::NoInformation);
        assert!(timed_out);
    }
}
