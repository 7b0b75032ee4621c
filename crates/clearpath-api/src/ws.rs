//! `WebSocket` handler for the live event stream.
//!
//! Clients connect to `GET /ws`. The server sends `connected` and a full
//! `status_update`, then forwards every broadcast [`ServerEvent`] as a
//! JSON text frame. Clients may send [`ClientCommand`]s on the same
//! socket; `request_status` is answered to the requester only, the other
//! commands act on the shared state and are seen by everyone through the
//! broadcast.
//!
//! If a client falls behind, lagged messages are skipped and the client
//! resumes from the most recent event.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use clearpath_core::Dispatcher;
use clearpath_types::{ClientCommand, Connected, ServerEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming events.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let dispatcher = &state.dispatcher;

    // Subscribe before the snapshot so nothing falls between them.
    let mut rx = dispatcher.subscribe();
    info!(
        observers = dispatcher.broadcaster().observer_count(),
        "WebSocket client connected"
    );

    for event in &greeting(dispatcher).await {
        if send_event(&mut socket, event).await.is_err() {
            debug!("WebSocket client disconnected during greeting");
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Some(reply) = handle_text(dispatcher, text.as_str()).await else {
                            continue;
                        };
                        if send_event(&mut socket, &reply).await.is_err() {
                            debug!("WebSocket client disconnected (reply failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("WebSocket client gone");
}

/// The first two events sent to a new client, ahead of any broadcast.
pub(crate) async fn greeting(dispatcher: &Dispatcher) -> [ServerEvent; 2] {
    [
        ServerEvent::Connected(Connected::default()),
        ServerEvent::StatusUpdate(Box::new(dispatcher.status().await)),
    ]
}

/// Serialize one event as a text frame, or `None` if it cannot be encoded.
fn event_frame(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(event = event.name(), "Failed to serialize event: {e}");
            None
        }
    }
}

/// Serialize and send one event as a text frame.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match event_frame(event) {
        Some(frame) => socket.send(frame).await,
        None => Ok(()),
    }
}

/// Parse one inbound text frame and run it.
async fn handle_text(dispatcher: &Dispatcher, text: &str) -> Option<ServerEvent> {
    match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => handle_command(dispatcher, command).await,
        Err(e) => {
            debug!("Ignoring unrecognized client message: {e}");
            None
        }
    }
}

/// Run a client command. Returns the reply meant for the requester only.
pub(crate) async fn handle_command(
    dispatcher: &Dispatcher,
    command: ClientCommand,
) -> Option<ServerEvent> {
    match command {
        ClientCommand::RequestStatus => Some(ServerEvent::StatusUpdate(Box::new(
            dispatcher.status().await,
        ))),
        ClientCommand::EmergencyTrigger => {
            if let Err(e) = dispatcher.trigger_emergency().await {
                debug!("WebSocket trigger ignored: {e}");
            }
            None
        }
        ClientCommand::EmergencyReset => {
            dispatcher.reset_emergency().await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use clearpath_core::config::ScenarioConfig;
    use clearpath_types::{SignalId, SignalPreempted};

    use super::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_scenario(ScenarioConfig::default())
    }

    #[tokio::test]
    async fn greeting_is_connected_then_snapshot() {
        let dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        dispatcher
            .store()
            .mutate(|state| state.ambulance_position = 55)
            .await;

        let [first, second] = greeting(&dispatcher).await;
        assert!(matches!(
            &first,
            ServerEvent::Connected(c) if c.message == "Connected to ClearPath system"
        ));
        assert!(matches!(
            &second,
            ServerEvent::StatusUpdate(s) if s.ambulance_position == 55 && !s.emergency_active
        ));

        // Sent to the new client only.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn frames_carry_event_and_data() {
        let event = ServerEvent::SignalPreempted(SignalPreempted::now(SignalId::C));
        let frame = event_frame(&event);
        assert!(matches!(frame, Some(Message::Text(_))));
        let Some(Message::Text(text)) = frame else {
            return;
        };

        let json: serde_json::Value =
            serde_json::from_str(text.as_str()).unwrap_or_default();
        assert_eq!(json["event"], "signal_preempted");
        assert_eq!(json["data"]["signal_id"], "C");
        assert_eq!(json["data"]["status"], "preempted");
    }

    #[tokio::test]
    async fn request_status_replies_without_broadcasting() {
        let dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();

        let reply = handle_command(&dispatcher, ClientCommand::RequestStatus).await;
        assert!(matches!(reply, Some(ServerEvent::StatusUpdate(s)) if !s.emergency_active));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_over_socket_broadcasts_to_everyone() {
        let dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();

        let reply = handle_command(&dispatcher, ClientCommand::EmergencyTrigger).await;
        assert!(reply.is_none());
        assert!(matches!(rx.recv().await, Ok(ServerEvent::EmergencyTriggered(_))));
        assert!(dispatcher.is_running().await);

        // A second trigger while running is a no-op.
        let reply = handle_command(&dispatcher, ClientCommand::EmergencyTrigger).await;
        assert!(reply.is_none());
        assert!(rx.try_recv().is_err());

        dispatcher.reset_emergency().await;
    }

    #[tokio::test]
    async fn reset_over_socket_broadcasts_reset() {
        let dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();

        let reply = handle_command(&dispatcher, ClientCommand::EmergencyReset).await;
        assert!(reply.is_none());
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::EmergencyReset(_))));
    }

    #[tokio::test]
    async fn garbage_text_is_ignored() {
        let dispatcher = dispatcher();
        assert!(handle_text(&dispatcher, "not json").await.is_none());
        assert!(handle_text(&dispatcher, r#"{"event":"reboot"}"#).await.is_none());

        let reply = handle_text(&dispatcher, r#"{"event":"request_status"}"#).await;
        assert!(matches!(reply, Some(ServerEvent::StatusUpdate(_))));
    }
}
