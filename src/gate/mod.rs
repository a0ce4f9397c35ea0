//! Readiness gate
//!
//! Per-task one-shot latches that decide when a dispatched task may start
//! processing. A latch is released exactly once, either manually through
//! [`ReadinessGate::release`] or by the timeout fallback inside
//! [`ReadinessGate::await_release`], so no task can be held forever.

mod latch;

pub use latch::Latch;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

/// Result of waiting on a task's latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Released manually (before or during the wait)
    Released,
    /// Timeout elapsed; the latch was force-released
    TimedOut,
    /// No entry for this task
    Unregistered,
}

/// Table of latches keyed by task id
#[derive(Debug, Default)]
pub struct ReadinessGate {
    entries: Mutex<HashMap<String, Arc<Latch>>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<Latch>>> {
        // Bookkeeping stays consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn latch(&self, id: &str) -> Option<Arc<Latch>> {
        self.entries().get(id).cloned()
    }

    /// Create a held entry for `id`
    ///
    /// Returns `true` if a new entry was created, `false` if one already existed.
    pub fn register(&self, id: &str) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(id) {
            return false;
        }
        entries.insert(id.to_string(), Arc::new(Latch::new()));
        debug!(task_id = id, "Gate entry registered");
        true
    }

    /// Release the latch for `id`
    ///
    /// Returns `true` only for the call that performed the release.
    pub fn release(&self, id: &str) -> bool {
        match self.latch(id) {
            Some(latch) => {
                let released = latch.release();
                if released {
                    debug!(task_id = id, "Gate entry released");
                }
                released
            }
            None => false,
        }
    }

    /// `true` while an entry exists and has not been released
    pub fn is_held(&self, id: &str) -> bool {
        self.entries()
            .get(id)
            .is_some_and(|latch| !latch.is_released())
    }

    /// `true` while any entry exists for `id`, released or not
    pub fn is_registered(&self, id: &str) -> bool {
        self.entries().contains_key(id)
    }

    /// Wait until `id` is released or `timeout` elapses
    ///
    /// On timeout the latch is forced open so later waits return immediately.
    pub async fn await_release(&self, id: &str, timeout: Duration) -> GateOutcome {
        let Some(latch) = self.latch(id) else {
            return GateOutcome::Unregistered;
        };

        match tokio::time::timeout(timeout, latch.wait()).await {
            Ok(()) => GateOutcome::Released,
            Err(_) => {
                latch.release();
                warn!(
                    task_id = id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Gate wait timed out, releasing"
                );
                GateOutcome::TimedOut
            }
        }
    }

    /// Drop the entry for `id`, if any
    pub fn remove(&self, id: &str) {
        if self.entries().remove(id).is_some() {
            debug!(task_id = id, "Gate entry removed");
        }
    }

    /// Number of registered entries
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_register_is_idempotent() {
        let gate = ReadinessGate::new();
        assert!(gate.register("t1"));
        assert!(!gate.register("t1"));
        assert_eq!(gate.len(), 1);
        assert!(gate.is_held("t1"));
    }

    #[test]
    fn test_release_once() {
        let gate = ReadinessGate::new();
        gate.register("t1");

        assert!(gate.release("t1"));
        assert!(!gate.release("t1"));
        assert!(!gate.is_held("t1"));
        assert!(gate.is_registered("t1"));
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let gate = ReadinessGate::new();
        assert!(!gate.release("ghost"));
        assert!(!gate.is_held("ghost"));
        assert!(gate.is_empty());
    }

    #[test]
    fn test_register_after_release_keeps_released() {
        let gate = ReadinessGate::new();
        gate.register("t1");
        gate.release("t1");

        assert!(!gate.register("t1"));
        assert!(!gate.is_held("t1"));
    }

    #[test]
    fn test_remove() {
        let gate = ReadinessGate::new();
        gate.register("t1");
        gate.remove("t1");
        gate.remove("t1");

        assert!(!gate.is_registered("t1"));
        assert!(gate.register("t1"));
    }

    #[tokio::test]
    async fn test_await_unknown_returns_immediately() {
        let gate = ReadinessGate::new();
        let outcome = gate.await_release("ghost", Duration::from_secs(60)).await;
        assert_eq!(outcome, GateOutcome::Unregistered);
    }

    #[tokio::test]
    async fn test_release_before_wait_is_observed() {
        let gate = ReadinessGate::new();
        gate.register("t1");
        gate.release("t1");

        let started = Instant::now();
        let outcome = gate.await_release("t1", Duration::from_secs(60)).await;
        assert_eq!(outcome, GateOutcome::Released);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_concurrent_release_wakes_waiter() {
        let gate = Arc::new(ReadinessGate::new());
        gate.register("t1");

        let releaser = {
            let gate = gate.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                gate.release("t1")
            })
        };

        let started = Instant::now();
        let outcome = gate.await_release("t1", Duration::from_secs(60)).await;
        assert_eq!(outcome, GateOutcome::Released);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(releaser.await.unwrap());
    }

    #[tokio::test]
    async fn test_timeout_forces_release() {
        let gate = ReadinessGate::new();
        gate.register("t1");

        let outcome = gate.await_release("t1", Duration::from_millis(20)).await;
        assert_eq!(outcome, GateOutcome::TimedOut);
        assert!(!gate.is_held("t1"));

        // Later waits return immediately
        let outcome = gate.await_release("t1", Duration::from_secs(60)).await;
        assert_eq!(outcome, GateOutcome::Released);
    }

    #[tokio::test]
    async fn test_remove_during_wait_does_not_hang() {
        let gate = Arc::new(ReadinessGate::new());
        gate.register("t1");

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.await_release("t1", Duration::from_millis(50)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        gate.remove("t1");

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, GateOutcome::TimedOut);
        assert!(!gate.is_registered("t1"));
    }

    #[tokio::test]
    async fn test_multiple_waiters_all_wake() {
        let gate = Arc::new(ReadinessGate::new());
        gate.register("t1");

        let mut waiters = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            waiters.push(tokio::spawn(async move {
                gate.await_release("t1", Duration::from_secs(60)).await
            }));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.release("t1");

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), GateOutcome::Released);
        }
    }
}
