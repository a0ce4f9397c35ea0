//! Background scheduler
//!
//! One long-lived loop that periodically scans the ledger for pending tasks,
//! registers each with the readiness gate and spawns one processing unit per
//! task. The gate registration doubles as the "already dispatched" marker: a
//! task stays registered until its processor finishes, so a task is never
//! dispatched twice concurrently.
//!
//! The loop is not started with the process. [`Scheduler::start`] is the
//! activation switch and only the first call has an effect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::ledger::TaskStatus;
use crate::worker::TaskProcessor;

pub struct Scheduler {
    processor: Arc<TaskProcessor>,
    poll_interval: Duration,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(processor: Arc<TaskProcessor>, config: &SchedulerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            processor,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the scan loop
    ///
    /// Returns `true` for the call that started it; concurrent or repeated
    /// calls return `false` and never start a second loop.
    pub fn start(self: &Arc<Self>) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Scheduler already running");
            return false;
        }

        let scheduler = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            scheduler.run(&mut shutdown_rx).await;
        });

        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Scheduler started"
        );
        true
    }

    /// Stop scanning; in-flight tasks keep running to completion
    ///
    /// Sticky: a loop started after this call exits before its first scan.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    async fn run(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; wait one full interval like every later scan
        ticker.tick().await;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown_rx.changed() => continue,
                _ = ticker.tick() => {}
            }

            self.scan_once().await;
        }

        info!("Scheduler stopped");
    }

    /// Dispatch every pending task not already registered with the gate
    ///
    /// Returns the handles of the processing units started by this scan.
    pub async fn scan_once(&self) -> Vec<JoinHandle<()>> {
        let tasks = match self.processor.store().list().await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Failed to list tasks");
                return Vec::new();
            }
        };

        let gate = self.processor.gate();
        let mut handles = Vec::new();

        for task in tasks {
            if task.status != TaskStatus::Pending || !gate.register(&task.id) {
                continue;
            }

            // The snapshot may predate a run that finished and left the gate
            if !self.still_pending(&task.id).await {
                gate.remove(&task.id);
                continue;
            }

            let processor = Arc::clone(&self.processor);
            let task_id = task.id;
            info!(task_id = %task_id, "Task dispatched");
            processor.metrics().task_dispatched();

            handles.push(tokio::spawn(async move {
                processor.process(&task_id).await;
            }));
        }

        handles
    }

    async fn still_pending(&self, task_id: &str) -> bool {
        match self.processor.store().get(task_id).await {
            Ok(Some(task)) => task.status == TaskStatus::Pending,
            Ok(None) => false,
            Err(e) => {
                warn!(task_id, error = %e, "Failed to re-read task");
                false
            }
        }
    }
}
