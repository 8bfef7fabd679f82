//! Recurring job scheduler.
//!
//! Each registered job gets its own tokio task that sleeps until the next
//! slot of its [`Cadence`], runs the job to completion, then computes the
//! next slot strictly after the completion time. A job therefore never
//! overlaps with itself; slots that elapse while it is still running are
//! skipped. Slots missed while the process was down are not replayed.

pub mod cadence;
pub mod clock;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::NotifyResult;
use crate::services::dispatcher::BatchReport;

pub use cadence::Cadence;
pub use clock::{Clock, SystemClock};

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    /// One firing. `today` is the service-local date at the moment of firing.
    async fn run(&self, today: NaiveDate) -> NotifyResult<BatchReport>;
}

struct JobEntry {
    cadence: Cadence,
    job: Arc<dyn Job>,
    next_fire: Mutex<Option<NaiveDateTime>>,
    running: AtomicBool,
}

impl JobEntry {
    fn set_next_fire(&self, at: NaiveDateTime) {
        if let Ok(mut next) = self.next_fire.lock() {
            *next = Some(at);
        }
    }

    fn status(&self) -> JobStatus {
        JobStatus {
            name: self.job.name(),
            cadence: self.cadence.to_string(),
            next_fire_at: self.next_fire.lock().ok().and_then(|n| *n),
            running: self.running.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub name: &'static str,
    pub cadence: String,
    pub next_fire_at: Option<NaiveDateTime>,
    pub running: bool,
}

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    entries: Vec<Arc<JobEntry>>,
    started: AtomicBool,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Vec::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Registers a job. Jobs registered after `start` are never run.
    pub fn register(&mut self, cadence: Cadence, job: Arc<dyn Job>) -> &mut Self {
        let next = cadence.next_after(self.clock.now());
        tracing::info!(job = job.name(), cadence = %cadence, next_fire_at = %next, "Job registered");
        self.entries.push(Arc::new(JobEntry {
            cadence,
            job,
            next_fire: Mutex::new(Some(next)),
            running: AtomicBool::new(false),
        }));
        self
    }

    /// Spawns one background task per registered job and returns
    /// immediately. Returns the number of jobs launched; a second call
    /// launches nothing.
    pub fn start(&self) -> usize {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Scheduler already started");
            return 0;
        }

        for entry in &self.entries {
            tokio::spawn(run_job_loop(self.clock.clone(), entry.clone()));
        }
        tracing::info!(jobs = self.entries.len(), "Scheduler started");
        self.entries.len()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> Vec<JobStatus> {
        self.entries.iter().map(|e| e.status()).collect()
    }

    pub fn job_status(&self, name: &str) -> Option<JobStatus> {
        self.entries
            .iter()
            .find(|e| e.job.name() == name)
            .map(|e| e.status())
    }
}

async fn run_job_loop(clock: Arc<dyn Clock>, entry: Arc<JobEntry>) {
    let name = entry.job.name();
    loop {
        let next = entry.cadence.next_after(clock.now());
        entry.set_next_fire(next);
        tracing::debug!(job = name, next_fire_at = %next, "Waiting for next firing");

        clock.sleep_until(next).await;

        entry.running.store(true, Ordering::SeqCst);
        let today = clock.now().date();
        let job = entry.job.clone();
        // Own task so a panicking job body cannot take the loop down with it.
        let outcome = tokio::spawn(async move { job.run(today).await }).await;
        entry.running.store(false, Ordering::SeqCst);

        match outcome {
            Ok(Ok(report)) => tracing::info!(
                job = name,
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                skipped = report.skipped,
                "Job firing finished"
            ),
            Ok(Err(e)) => tracing::error!(job = name, error = %e, "Job firing aborted"),
            Err(e) => tracing::error!(job = name, error = %e, "Job firing panicked"),
        }
    }
}
