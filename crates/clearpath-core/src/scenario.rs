//! The scripted emergency run.
//!
//! A run is a fixed timeline: alert, notify, and preempt each junction in
//! turn, then advance the ambulance in steps, then arrive. The timeline is
//! built as data by [`build_script`] and played back by [`run_scenario`],
//! which waits out each step's delay and then applies its action to the
//! shared state, broadcasting the matching event.
//!
//! # Cancellation
//!
//! Every wait races the run's cancellation token, and the token is checked
//! again under the state write lock before each action. A reset therefore
//! stops the run before its next action, at any point on the timeline.
//!
//! # Default timeline
//!
//! ```text
//!  1.0s  new_alert A          4.0s  new_alert B          7.0s  new_alert C
//!  1.5s  new_notification A   4.5s  new_notification B   7.5s  new_notification C
//!  2.0s  signal_preempted A   5.0s  signal_preempted B   8.0s  signal_preempted C
//! 10.0s .. 32.0s  ambulance_position_update every 2s (30, 35, .. 85)
//! 34.0s  emergency_complete
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clearpath_types::{
    Alert, AlertAcknowledged, AlertId, AlertStatus, Notification, PositionUpdate, ServerEvent,
    SignalId, SignalPreempted, SignalState, SimulationState,
};
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::config::ScenarioConfig;
use crate::control::{RunHandle, ScenarioControl};
use crate::store::StateStore;

/// Ambulance speed while a run is live, in km/h.
pub const EMERGENCY_SPEED: u32 = 65;
/// ETA shown when a run starts.
pub const EMERGENCY_ETA: &str = "3:24";
/// Severity code of the simulated dispatch.
pub const EMERGENCY_SEVERITY: &str = "P1";
/// Position where the ambulance starts advancing.
pub const START_POSITION: u32 = 30;
/// Position gained per update.
pub const POSITION_STEP: u32 = 5;
/// Highest position reported before arrival.
pub const MAX_EN_ROUTE_POSITION: u32 = 90;
/// Position reported on arrival.
pub const ARRIVAL_POSITION: u32 = 95;
/// ETA reported on arrival.
pub const ARRIVAL_ETA: &str = "0:30";

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// One thing the scenario does to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptAction {
    /// Raise an officer alert for a junction.
    RaiseAlert(SignalId),
    /// Notify drivers near a junction.
    NotifyDrivers(SignalId),
    /// Preempt a junction's signal.
    PreemptSignal(SignalId),
    /// Move the ambulance to a position.
    Advance(u32),
    /// The ambulance arrives.
    Arrive,
}

/// An action and the wait that precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStep {
    /// Time to wait after the previous step.
    pub delay: Duration,
    /// What to do once the wait is over.
    pub action: ScriptAction,
}

/// Position reported by the `step`-th position update.
pub fn position_at(step: u32) -> u32 {
    START_POSITION
        .saturating_add(POSITION_STEP.saturating_mul(step))
        .min(MAX_EN_ROUTE_POSITION)
}

/// Build the run timeline from the configured delays.
pub fn build_script(config: &ScenarioConfig) -> Vec<ScriptStep> {
    let mut script = Vec::with_capacity(SignalId::ALL.len().saturating_mul(3));

    for (index, signal) in SignalId::ALL.into_iter().enumerate() {
        let lead_in = if index == 0 {
            config.initial_delay()
        } else {
            config.next_signal_delay()
        };
        script.push(ScriptStep {
            delay: lead_in,
            action: ScriptAction::RaiseAlert(signal),
        });
        script.push(ScriptStep {
            delay: config.notification_delay(),
            action: ScriptAction::NotifyDrivers(signal),
        });
        script.push(ScriptStep {
            delay: config.preempt_delay(),
            action: ScriptAction::PreemptSignal(signal),
        });
    }

    script.extend((0..config.position_steps).map(|step| ScriptStep {
        delay: config.position_interval(),
        action: ScriptAction::Advance(position_at(step)),
    }));

    script.push(ScriptStep {
        delay: config.completion_delay(),
        action: ScriptAction::Arrive,
    });

    script
}

/// Sum of all delays in a script.
pub fn total_duration(script: &[ScriptStep]) -> Duration {
    script
        .iter()
        .fold(Duration::ZERO, |total, step| total.saturating_add(step.delay))
}

// ---------------------------------------------------------------------------
// State transitions shared with the dispatcher
// ---------------------------------------------------------------------------

/// Set the fields that mark an emergency as live.
pub fn apply_trigger(state: &mut SimulationState) {
    state.emergency_active = true;
    state.current_speed = EMERGENCY_SPEED;
    EMERGENCY_ETA.clone_into(&mut state.eta);
    EMERGENCY_SEVERITY.clone_into(&mut state.severity_code);
}

/// Preempt `signal` and broadcast `signal_preempted`.
///
/// Returns the new signal state, or `None` if the signal is not in the
/// table.
pub fn preempt_signal(
    state: &mut SimulationState,
    signal: SignalId,
    broadcaster: &Broadcaster,
) -> Option<SignalState> {
    let entry = state.traffic_signals.get_mut(&signal)?;
    entry.preempt();
    let updated = *entry;
    broadcaster.broadcast(ServerEvent::SignalPreempted(SignalPreempted::now(signal)));
    Some(updated)
}

/// Acknowledge the pending alert `id` and broadcast `alert_acknowledged`.
///
/// Returns the updated alert, or `None` if no pending alert has that ID.
pub fn acknowledge_alert(
    state: &mut SimulationState,
    id: AlertId,
    broadcaster: &Broadcaster,
) -> Option<Alert> {
    let alert = state.alert_mut(id).filter(|a| a.is_pending())?;
    let now = Utc::now();
    alert.status = AlertStatus::Acknowledged;
    alert.acknowledged_at = Some(now);
    let updated = alert.clone();
    broadcaster.broadcast(ServerEvent::AlertAcknowledged(AlertAcknowledged {
        alert_id: id,
        timestamp: now,
    }));
    Some(updated)
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Handles a run needs to reach the rest of the system.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Shared state.
    pub store: Arc<StateStore>,
    /// Event channel.
    pub broadcaster: Broadcaster,
    /// Run guard, released when the run ends.
    pub control: Arc<ScenarioControl>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// Every step ran and the ambulance arrived.
    Completed,
    /// The run was cancelled; the field holds the number of steps applied.
    Aborted(usize),
}

/// Play `script` back against the shared state.
///
/// An aborted run releases the run guard before returning. A completed
/// run keeps it, so the emergency stays active until a reset.
pub async fn run_scenario(
    ctx: ScenarioContext,
    run: RunHandle,
    script: Vec<ScriptStep>,
) -> ScenarioOutcome {
    let run_id = run.id();
    info!(%run_id, steps = script.len(), "Scenario run started");

    let mut outcome = ScenarioOutcome::Completed;
    for (applied, step) in script.into_iter().enumerate() {
        tokio::select! {
            biased;
            () = run.token().cancelled() => {
                outcome = ScenarioOutcome::Aborted(applied);
                break;
            }
            () = tokio::time::sleep(step.delay) => {}
        }

        if !apply_step(&ctx, &run, step.action).await {
            outcome = ScenarioOutcome::Aborted(applied);
            break;
        }
        debug!(%run_id, action = ?step.action, "Scenario step applied");
    }

    match outcome {
        ScenarioOutcome::Completed => info!(%run_id, "Scenario run completed"),
        ScenarioOutcome::Aborted(applied) => {
            ctx.control.finish(run_id).await;
            info!(%run_id, applied, "Scenario run aborted");
        }
    }
    outcome
}

/// Apply one action under the write lock.
///
/// Returns `false` without touching the state if the run was cancelled
/// while the step was waiting for the lock.
async fn apply_step(ctx: &ScenarioContext, run: &RunHandle, action: ScriptAction) -> bool {
    let broadcaster = &ctx.broadcaster;
    ctx.store
        .mutate(|state| {
            if run.is_cancelled() {
                return false;
            }
            match action {
                ScriptAction::RaiseAlert(signal) => {
                    let alert = Alert::officer(signal);
                    state.alerts.push(alert.clone());
                    broadcaster.broadcast(ServerEvent::NewAlert(alert));
                }
                ScriptAction::NotifyDrivers(signal) => {
                    let notification = Notification::driver(signal);
                    state.notifications.push(notification.clone());
                    broadcaster.broadcast(ServerEvent::NewNotification(notification));
                }
                ScriptAction::PreemptSignal(signal) => {
                    preempt_signal(state, signal, broadcaster);
                }
                ScriptAction::Advance(position) => {
                    state.ambulance_position = position;
                    broadcaster.broadcast(ServerEvent::AmbulancePositionUpdate(PositionUpdate {
                        position,
                        speed: state.current_speed,
                    }));
                }
                ScriptAction::Arrive => {
                    state.ambulance_position = ARRIVAL_POSITION;
                    ARRIVAL_ETA.clone_into(&mut state.eta);
                    broadcaster.broadcast(ServerEvent::EmergencyComplete(Box::new(state.clone())));
                }
            }
            true
        })
        .await
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    fn context() -> ScenarioContext {
        ScenarioContext {
            store: Arc::new(StateStore::new()),
            broadcaster: Broadcaster::new(),
            control: Arc::new(ScenarioControl::new()),
        }
    }

    #[test]
    fn default_script_shape() {
        let script = build_script(&ScenarioConfig::default());
        assert_eq!(script.len(), 9 + 12 + 1);
        assert_eq!(total_duration(&script), Duration::from_secs(34));

        let first: Vec<ScriptAction> = script.iter().take(3).map(|s| s.action).collect();
        assert_eq!(
            first,
            vec![
                ScriptAction::RaiseAlert(SignalId::A),
                ScriptAction::NotifyDrivers(SignalId::A),
                ScriptAction::PreemptSignal(SignalId::A),
            ]
        );
        assert_eq!(script.last().map(|s| s.action), Some(ScriptAction::Arrive));
    }

    #[test]
    fn positions_climb_by_five_and_cap_at_ninety() {
        let positions: Vec<u32> = (0..12).map(position_at).collect();
        assert_eq!(positions.first(), Some(&30));
        assert_eq!(positions.last(), Some(&85));
        assert!(
            positions
                .windows(2)
                .all(|w| matches!(w, [a, b] if b.checked_sub(*a) == Some(5)))
        );
        assert_eq!(position_at(100), MAX_EN_ROUTE_POSITION);
    }

    #[test]
    fn acknowledge_is_one_way() {
        let broadcaster = Broadcaster::new();
        let mut state = SimulationState::default();
        let alert = Alert::officer(SignalId::A);
        let id = alert.id;
        state.alerts.push(alert);

        let first = acknowledge_alert(&mut state, id, &broadcaster);
        assert!(first.as_ref().is_some_and(|a| a.acknowledged_at.is_some()));
        assert_eq!(acknowledge_alert(&mut state, id, &broadcaster), None);
        assert_eq!(acknowledge_alert(&mut state, AlertId::new(), &broadcaster), None);
    }

    #[tokio::test(start_paused = true)]
    async fn full_run_follows_timeline() {
        let ctx = context();
        let mut rx = ctx.broadcaster.subscribe();
        let run = ctx.control.begin().await;
        assert!(run.is_some());
        let Some(run) = run else { return };

        ctx.store.mutate(apply_trigger).await;
        let started = Instant::now();
        let handle = tokio::spawn(run_scenario(
            ctx.clone(),
            run,
            build_script(&ScenarioConfig::default()),
        ));

        let mut seen = Vec::new();
        while let Ok(event) = rx.recv().await {
            let done = matches!(event, ServerEvent::EmergencyComplete(_));
            seen.push((started.elapsed(), event));
            if done {
                break;
            }
        }

        let timeline: Vec<(u64, &str)> = seen
            .iter()
            .take(3)
            .map(|(at, event)| (u64::try_from(at.as_millis()).unwrap_or(u64::MAX), event.name()))
            .collect();
        assert_eq!(
            timeline,
            vec![
                (1000, "new_alert"),
                (1500, "new_notification"),
                (2000, "signal_preempted"),
            ]
        );
        assert_eq!(seen.len(), 22);

        let positions: Vec<u32> = seen
            .iter()
            .filter_map(|(_, event)| match event {
                ServerEvent::AmbulancePositionUpdate(update) => Some(update.position),
                _ => None,
            })
            .collect();
        assert_eq!(positions, (0..12).map(position_at).collect::<Vec<_>>());

        let last = seen.last();
        assert!(matches!(last, Some((_, ServerEvent::EmergencyComplete(_)))));
        let Some((at, ServerEvent::EmergencyComplete(state))) = last else {
            return;
        };
        assert_eq!(*at, Duration::from_secs(34));
        assert_eq!(state.ambulance_position, ARRIVAL_POSITION);
        assert_eq!(state.eta, ARRIVAL_ETA);
        assert_eq!(state.alerts.len(), 3);
        assert!(state.traffic_signals.values().all(|s| s.preempted));

        assert!(matches!(handle.await, Ok(ScenarioOutcome::Completed)));
        // The guard stays held until a reset.
        assert!(ctx.control.is_running().await);
        assert!(ctx.control.begin().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_signal_phase_stops_further_steps() {
        let ctx = context();
        let mut rx = ctx.broadcaster.subscribe();
        let run = ctx.control.begin().await;
        assert!(run.is_some());
        let Some(run) = run else { return };
        let handle = tokio::spawn(run_scenario(
            ctx.clone(),
            run,
            build_script(&ScenarioConfig::default()),
        ));

        // First alert lands at 1.0s; cancel before the notification at 1.5s.
        assert!(matches!(rx.recv().await, Ok(ServerEvent::NewAlert(_))));
        tokio::time::sleep(Duration::from_millis(200)).await;
        ctx.control.cancel().await;

        assert!(matches!(handle.await, Ok(ScenarioOutcome::Aborted(1))));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
        assert_eq!(ctx.store.read(|s| s.notifications.len()).await, 0);
    }
}
