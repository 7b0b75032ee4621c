//! Run guard for the scenario sequencer.
//!
//! [`ScenarioControl`] owns the answer to "is a scenario running". Claiming
//! the guard, cancelling the live run, and releasing the guard after an
//! aborted run all happen under one lock, so two triggers arriving in the
//! same instant cannot both start a run, and a stale run cannot release
//! the newer run's guard. A completed run keeps the guard until a reset.
//!
//! Each run gets its own [`CancellationToken`], a child of the control's
//! root token. Cancelling the root (process shutdown) aborts any live run.

use clearpath_types::RunId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Handle given to the sequencer for one claimed run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: RunId,
    token: CancellationToken,
}

impl RunHandle {
    /// The run's identifier.
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// The run's cancellation token.
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Shared guard allowing at most one live scenario run.
#[derive(Debug, Default)]
pub struct ScenarioControl {
    root: CancellationToken,
    active: Mutex<Option<RunHandle>>,
}

impl ScenarioControl {
    /// Create an idle control.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle control whose runs are also cancelled when `root` is.
    pub fn with_root(root: CancellationToken) -> Self {
        Self {
            root,
            active: Mutex::new(None),
        }
    }

    /// Claim the guard for a new run.
    ///
    /// Returns `None` if a run is already live.
    pub async fn begin(&self) -> Option<RunHandle> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return None;
        }
        let run = RunHandle {
            id: RunId::new(),
            token: self.root.child_token(),
        };
        *active = Some(run.clone());
        Some(run)
    }

    /// Cancel the live run, if any, and clear the guard.
    ///
    /// Returns the cancelled run's ID.
    pub async fn cancel(&self) -> Option<RunId> {
        self.cancel_while(async {}).await.0
    }

    /// Cancel the live run, then run `reset` before releasing the guard.
    ///
    /// No new run can be claimed until `reset` finishes, so a trigger never
    /// lands between the cancel and the state it restores.
    pub async fn cancel_while<R>(&self, reset: impl Future<Output = R>) -> (Option<RunId>, R) {
        let mut active = self.active.lock().await;
        let cancelled = active.take().map(|run| {
            run.token.cancel();
            run.id
        });
        let output = reset.await;
        drop(active);
        (cancelled, output)
    }

    /// Release the guard at the end of run `id`.
    ///
    /// Does nothing (and returns `false`) if `id` is no longer the live
    /// run, which happens when it was cancelled and replaced.
    pub async fn finish(&self, id: RunId) -> bool {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|run| run.id == id) {
            *active = None;
            true
        } else {
            false
        }
    }

    /// Whether a run currently holds the guard.
    pub async fn is_running(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Cancel the root token, aborting any current and future runs.
    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn second_begin_is_refused() {
        let control = ScenarioControl::new();
        assert!(control.begin().await.is_some());
        assert!(control.begin().await.is_none());
        assert!(control.is_running().await);
    }

    #[tokio::test]
    async fn cancel_trips_token_and_frees_guard() {
        let control = ScenarioControl::new();
        let run = control.begin().await;
        assert!(run.is_some());
        let cancelled = control.cancel().await;
        assert_eq!(cancelled, run.as_ref().map(RunHandle::id));
        assert!(run.is_some_and(|r| r.is_cancelled()));
        assert!(!control.is_running().await);
        assert!(control.begin().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn begin_waits_for_reset_to_finish() {
        let control = Arc::new(ScenarioControl::new());
        assert!(control.begin().await.is_some());

        let restored = Arc::new(AtomicBool::new(false));
        let reset = tokio::spawn({
            let control = Arc::clone(&control);
            let restored = Arc::clone(&restored);
            async move {
                control
                    .cancel_while(async {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        restored.store(true, Ordering::SeqCst);
                    })
                    .await
            }
        });
        tokio::task::yield_now().await;

        let run = control.begin().await;
        assert!(run.is_some_and(|r| !r.is_cancelled()));
        assert!(restored.load(Ordering::SeqCst));
        assert!(reset.await.is_ok_and(|(cancelled, ())| cancelled.is_some()));
    }

    #[tokio::test]
    async fn stale_finish_keeps_newer_run() {
        let control = ScenarioControl::new();
        let old = control.begin().await.map(|r| r.id());
        control.cancel().await;
        let new = control.begin().await.map(|r| r.id());

        if let Some(old) = old {
            assert!(!control.finish(old).await);
        }
        assert!(control.is_running().await);
        if let Some(new) = new {
            assert!(control.finish(new).await);
        }
        assert!(!control.is_running().await);
    }

    #[tokio::test]
    async fn shutdown_cancels_live_run() {
        let control = ScenarioControl::new();
        let run = control.begin().await;
        control.shutdown();
        assert!(run.is_some_and(|r| r.is_cancelled()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_begins_claim_once() {
        let control = Arc::new(ScenarioControl::new());
        let attempts = (0..32).map(|_| {
            let control = Arc::clone(&control);
            tokio::spawn(async move { control.begin().await.is_some() })
        });
        let results = futures::future::join_all(attempts).await;
        let claimed = results.into_iter().filter(|r| matches!(r, Ok(true))).count();
        assert_eq!(claimed, 1);
    }
}
