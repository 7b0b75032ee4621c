//! Command handling shared by the HTTP API and the WebSocket.
//!
//! [`Dispatcher`] is the one place where inbound commands become state
//! changes. Each operation mutates the [`StateStore`] and, where the
//! command is news to other observers, broadcasts from inside the same
//! write lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use clearpath_types::{
    Alert, AlertId, AnalyticsSnapshot, ContactRequest, ContactSubmission, Notification,
    ServerEvent, SignalId, SignalState, SimulationState,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::analytics;
use crate::broadcast::Broadcaster;
use crate::config::ScenarioConfig;
use crate::control::ScenarioControl;
use crate::error::DispatchError;
use crate::scenario::{self, ScenarioContext};
use crate::store::StateStore;

/// Cloneable entry point for every client command.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<StateStore>,
    broadcaster: Broadcaster,
    control: Arc<ScenarioControl>,
    scenario: Arc<ScenarioConfig>,
}

impl Dispatcher {
    /// Assemble a dispatcher from its parts.
    pub fn new(
        store: Arc<StateStore>,
        broadcaster: Broadcaster,
        control: Arc<ScenarioControl>,
        scenario: ScenarioConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            control,
            scenario: Arc::new(scenario),
        }
    }

    /// A dispatcher over fresh default state with the given timeline.
    pub fn with_scenario(scenario: ScenarioConfig) -> Self {
        Self::new(
            Arc::new(StateStore::new()),
            Broadcaster::new(),
            Arc::new(ScenarioControl::new()),
            scenario,
        )
    }

    /// The shared state store.
    pub const fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// The event channel.
    pub const fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Subscribe to the event channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.broadcaster.subscribe()
    }

    // -----------------------------------------------------------------------
    // Emergency lifecycle
    // -----------------------------------------------------------------------

    /// Start an emergency run.
    ///
    /// Marks the emergency live, broadcasts `emergency_triggered`, and
    /// spawns the sequencer.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlreadyActive`] if a run is live, or if a
    /// run completed and no reset has happened since. The existing run is
    /// not disturbed.
    pub async fn trigger_emergency(&self) -> Result<SimulationState, DispatchError> {
        let Some(run) = self.control.begin().await else {
            warn!("Emergency trigger rejected: run already live");
            return Err(DispatchError::AlreadyActive);
        };

        let broadcaster = &self.broadcaster;
        let state = self
            .store
            .mutate(|state| {
                // A reset that slipped in between claiming the guard and
                // taking the lock wins; the run below exits immediately.
                if !run.is_cancelled() {
                    scenario::apply_trigger(state);
                    broadcaster
                        .broadcast(ServerEvent::EmergencyTriggered(Box::new(state.clone())));
                }
                state.clone()
            })
            .await;

        info!(run_id = %run.id(), "Emergency triggered");

        let ctx = ScenarioContext {
            store: Arc::clone(&self.store),
            broadcaster: self.broadcaster.clone(),
            control: Arc::clone(&self.control),
        };
        let script = scenario::build_script(&self.scenario);
        tokio::spawn(scenario::run_scenario(ctx, run, script));

        Ok(state)
    }

    /// Cancel any live run and restore the idle state.
    ///
    /// Broadcasts `emergency_reset` with the restored state.
    pub async fn reset_emergency(&self) -> SimulationState {
        let broadcaster = &self.broadcaster;
        let (cancelled, state) = self
            .control
            .cancel_while(self.store.mutate(|state| {
                state.reset_scenario();
                broadcaster.broadcast(ServerEvent::EmergencyReset(Box::new(state.clone())));
                state.clone()
            }))
            .await;
        info!(cancelled_run = ?cancelled, "Emergency reset");
        state
    }

    /// Whether a run holds the guard: live, or completed and not yet reset.
    pub async fn is_running(&self) -> bool {
        self.control.is_running().await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Full state snapshot.
    pub async fn status(&self) -> SimulationState {
        self.store.snapshot().await
    }

    /// All alerts in creation order.
    pub async fn alerts(&self) -> Vec<Alert> {
        self.store.read(|s| s.alerts.clone()).await
    }

    /// All notifications in creation order.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.store.read(|s| s.notifications.clone()).await
    }

    /// The signal table.
    pub async fn traffic_signals(&self) -> BTreeMap<SignalId, SignalState> {
        self.store.read(|s| s.traffic_signals.clone()).await
    }

    /// Regenerate and return analytics.
    ///
    /// Fetching analytics re-randomizes them; the new values are not
    /// broadcast.
    pub async fn refresh_analytics(&self) -> AnalyticsSnapshot {
        analytics::refresh(&self.store).await
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Accept a contact form submission. It is logged and echoed back,
    /// never stored.
    pub fn submit_contact(&self, request: ContactRequest) -> ContactSubmission {
        let submission = ContactSubmission::from_request(request);
        info!(
            id = %submission.id,
            name = submission.name.as_deref().unwrap_or_default(),
            email = submission.email.as_deref().unwrap_or_default(),
            organization = submission.organization.as_deref().unwrap_or_default(),
            interest = submission.interest.as_deref().unwrap_or_default(),
            "New contact form submission"
        );
        submission
    }

    /// Preempt the signal named by `raw_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::SignalNotFound`] if `raw_id` names no
    /// signal. Nothing is mutated or broadcast in that case.
    pub async fn preempt_signal(&self, raw_id: &str) -> Result<SignalState, DispatchError> {
        let signal: SignalId = raw_id
            .parse()
            .map_err(|_unknown| DispatchError::SignalNotFound(raw_id.to_owned()))?;
        let broadcaster = &self.broadcaster;
        let updated = self
            .store
            .mutate(|state| scenario::preempt_signal(state, signal, broadcaster))
            .await
            .ok_or_else(|| DispatchError::SignalNotFound(raw_id.to_owned()))?;
        info!(%signal, "Signal preempted");
        Ok(updated)
    }

    /// Acknowledge the pending alert named by `raw_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlertNotFound`] if `raw_id` is not a valid
    /// alert ID, names no alert, or names an alert that was already
    /// acknowledged.
    pub async fn acknowledge_alert(&self, raw_id: &str) -> Result<Alert, DispatchError> {
        let id: AlertId = raw_id
            .parse()
            .map_err(|_invalid| DispatchError::AlertNotFound)?;
        let broadcaster = &self.broadcaster;
        let alert = self
            .store
            .mutate(|state| scenario::acknowledge_alert(state, id, broadcaster))
            .await
            .ok_or(DispatchError::AlertNotFound)?;
        info!(alert_id = %id, "Alert acknowledged");
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clearpath_types::AlertStatus;

    use super::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_scenario(ScenarioConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_sets_live_fields() {
        let dispatcher = dispatcher();
        let state = dispatcher.trigger_emergency().await;
        let state = state.unwrap_or_default();
        assert!(state.emergency_active);
        assert_eq!(state.current_speed, 65);
        assert_eq!(state.eta, "3:24");
        assert_eq!(state.severity_code, "P1");
        assert!(dispatcher.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn second_trigger_is_rejected_without_restarting_clock() {
        let dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        assert!(dispatcher.trigger_emergency().await.is_ok());
        assert!(matches!(rx.recv().await, Ok(ServerEvent::EmergencyTriggered(_))));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(
            dispatcher.trigger_emergency().await,
            Err(DispatchError::AlreadyActive)
        );

        // First alert still lands 1.0s after the first trigger.
        let before = tokio::time::Instant::now();
        assert!(matches!(rx.recv().await, Ok(ServerEvent::NewAlert(_))));
        assert_eq!(before.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_after_completion_needs_reset() {
        let dispatcher = dispatcher();
        assert!(dispatcher.trigger_emergency().await.is_ok());
        tokio::time::sleep(Duration::from_secs(35)).await;

        let finished = dispatcher.status().await;
        assert!(finished.emergency_active);
        assert_eq!(finished.ambulance_position, 95);
        assert_eq!(finished.eta, "0:30");
        assert!(dispatcher.is_running().await);

        assert_eq!(
            dispatcher.trigger_emergency().await,
            Err(DispatchError::AlreadyActive)
        );
        assert_eq!(dispatcher.alerts().await.len(), 3);
        assert_eq!(dispatcher.status().await.ambulance_position, 95);

        dispatcher.reset_emergency().await;
        assert!(!dispatcher.is_running().await);
        let restarted = dispatcher.trigger_emergency().await;
        assert!(restarted.is_ok_and(|s| s.emergency_active && s.alerts.is_empty()));
        dispatcher.reset_emergency().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_defaults_mid_run() {
        let dispatcher = dispatcher();
        assert!(dispatcher.trigger_emergency().await.is_ok());
        tokio::time::sleep(Duration::from_millis(12_500)).await;

        let before = dispatcher.status().await;
        assert!(before.ambulance_position > 30);
        assert_eq!(before.alerts.len(), 3);

        let analytics = before.analytics;
        let state = dispatcher.reset_emergency().await;
        let mut expected = SimulationState::default();
        expected.analytics = analytics;
        assert_eq!(state, expected);
        assert!(!dispatcher.is_running().await);

        // Nothing from the aborted run trickles in afterwards.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(dispatcher.status().await, expected);
    }

    #[tokio::test]
    async fn preempt_unknown_signal_does_not_mutate() {
        let dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        let before = dispatcher.status().await;

        assert_eq!(
            dispatcher.preempt_signal("Z").await,
            Err(DispatchError::SignalNotFound(String::from("Z")))
        );
        assert_eq!(dispatcher.status().await, before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn preempt_known_signal_broadcasts() {
        let dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        let updated = dispatcher.preempt_signal("B").await;
        assert_eq!(updated, Ok(SignalState::PREEMPTED));
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerEvent::SignalPreempted(event)) if event.signal_id == SignalId::B
        ));
    }

    #[tokio::test]
    async fn acknowledge_once_then_not_found() {
        let dispatcher = dispatcher();
        let alert = Alert::officer(SignalId::A);
        let id = alert.id;
        dispatcher
            .store()
            .mutate(|state| state.alerts.push(alert))
            .await;

        let first = dispatcher.acknowledge_alert(&id.to_string()).await;
        assert!(first.as_ref().is_ok_and(|a| a.status == AlertStatus::Acknowledged));

        let second = dispatcher.acknowledge_alert(&id.to_string()).await;
        assert_eq!(second, Err(DispatchError::AlertNotFound));

        let stored = dispatcher.alerts().await;
        assert_eq!(
            stored.first().and_then(|a| a.acknowledged_at),
            first.ok().and_then(|a| a.acknowledged_at)
        );
    }

    #[tokio::test]
    async fn acknowledge_garbage_id_is_not_found() {
        let dispatcher = dispatcher();
        assert_eq!(
            dispatcher.acknowledge_alert("nope").await,
            Err(DispatchError::AlertNotFound)
        );
    }

    #[test]
    fn contact_submission_gets_id_and_status() {
        let dispatcher = dispatcher();
        let submission = dispatcher.submit_contact(ContactRequest {
            name: Some(String::from("Dana")),
            ..ContactRequest::default()
        });
        assert_eq!(submission.name.as_deref(), Some("Dana"));
        assert_eq!(submission.status, "new");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_triggers_start_one_run() {
        let dispatcher = dispatcher();
        let attempts = (0..16).map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.trigger_emergency().await.is_ok() })
        });
        let results = futures::future::join_all(attempts).await;
        let started = results.into_iter().filter(|r| matches!(r, Ok(true))).count();
        assert_eq!(started, 1);
        dispatcher.reset_emergency().await;
    }
}
