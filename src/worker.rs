//! Background worker: a single-task queue for run and undo requests.
//!
//! Exactly one job is in flight at a time, and jobs are processed strictly
//! in submission order, so two runs can never mutate the same destination
//! tree concurrently. "In flight" lasts from a successful [`SortWorker::try_submit`]
//! until the caller collects the result with [`SortWorker::wait`]; a submit
//! in between is rejected with [`WorkerBusy`] instead of queueing a second
//! run. There is no cancellation: a started job always runs to completion
//! over its full plan.

use crate::mover::{DuplicatePolicy, MoveError, RunReport, execute_plan};
use crate::preview::PreviewEntry;
use crate::undo::{UndoLog, UndoReport};
use std::sync::mpsc::{Receiver, RecvError, Sender, channel};
use std::thread::JoinHandle;

/// A request the worker knows how to process.
#[derive(Debug)]
pub enum Job {
    /// Execute a move plan under a duplicate policy.
    Run {
        plan: Vec<PreviewEntry>,
        policy: DuplicatePolicy,
    },
    /// Reverse the moves of a previous run.
    Undo { log: UndoLog },
}

/// What a finished job produced.
#[derive(Debug)]
pub enum JobResult {
    Run(Result<(RunReport, UndoLog), MoveError>),
    Undo(UndoReport),
}

/// A previous job's result has not been collected yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerBusy;

impl std::fmt::Display for WorkerBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("A run is already in progress")
    }
}

impl std::error::Error for WorkerBusy {}

/// The dedicated worker thread and its job queue.
pub struct SortWorker {
    job_tx: Option<Sender<Job>>,
    result_rx: Receiver<JobResult>,
    handle: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl SortWorker {
    /// Spawns the worker thread.
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = channel::<Job>();
        let (result_tx, result_rx) = channel::<JobResult>();

        let handle = std::thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let result = match job {
                    Job::Run { plan, policy } => JobResult::Run(execute_plan(&plan, policy)),
                    Job::Undo { mut log } => JobResult::Undo(log.undo()),
                };
                // The caller may have dropped the worker; nothing to do then.
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });

        Self {
            job_tx: Some(job_tx),
            result_rx,
            handle: Some(handle),
            in_flight: false,
        }
    }

    /// Submits a job unless one is still in flight.
    pub fn try_submit(&mut self, job: Job) -> Result<(), WorkerBusy> {
        if self.in_flight {
            return Err(WorkerBusy);
        }
        let Some(tx) = &self.job_tx else {
            return Err(WorkerBusy);
        };
        if tx.send(job).is_err() {
            return Err(WorkerBusy);
        }
        self.in_flight = true;
        Ok(())
    }

    /// Whether a submitted job's result is still outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Blocks until the in-flight job finishes and returns its result.
    ///
    /// Returns `Err` when no job was submitted or the worker thread is gone.
    pub fn wait(&mut self) -> Result<JobResult, RecvError> {
        if !self.in_flight {
            return Err(RecvError);
        }
        let result = self.result_rx.recv();
        self.in_flight = false;
        result
    }
}

impl Drop for SortWorker {
    fn drop(&mut self) {
        // Closing the queue lets the thread drain and exit.
        self.job_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
