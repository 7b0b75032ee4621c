//! Synthetic dashboard analytics.
//!
//! Each refresh draws all four numbers fresh around fixed baselines and
//! rounds them to one decimal. [`run_analytics_ticker`] refreshes and
//! broadcasts on a fixed interval from process start, whether or not an
//! emergency is running.

use std::sync::Arc;
use std::time::Duration;

use clearpath_types::{AnalyticsSnapshot, ServerEvent};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::store::StateStore;

/// Round to one decimal place.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Draw a fresh analytics snapshot.
///
/// | Field | Baseline | Offset |
/// |---|---|---|
/// | `response_time` | 2.0 | -0.5 ..= 0.5 |
/// | `route_efficiency` | 90 | -5 ..= 10 |
/// | `success_rate` | 95 | -3 ..= 5 |
/// | `officer_response` | 1.5 | -0.3 ..= 0.5 |
pub fn perturb<R: Rng + ?Sized>(rng: &mut R) -> AnalyticsSnapshot {
    AnalyticsSnapshot {
        response_time: round_tenth(2.0 + rng.random_range(-0.5..=0.5)),
        route_efficiency: round_tenth(90.0 + rng.random_range(-5.0..=10.0)),
        success_rate: round_tenth(95.0 + rng.random_range(-3.0..=5.0)),
        officer_response: round_tenth(1.5 + rng.random_range(-0.3..=0.5)),
    }
}

/// Regenerate the stored analytics and return the new values.
///
/// Does not broadcast; callers decide whether the refresh is news.
pub async fn refresh(store: &StateStore) -> AnalyticsSnapshot {
    let snapshot = perturb(&mut rand::rng());
    store.mutate(|state| state.analytics = snapshot).await;
    snapshot
}

/// Refresh analytics every `interval` and broadcast `analytics_update`,
/// until `shutdown` is cancelled.
pub async fn run_analytics_ticker(
    store: Arc<StateStore>,
    broadcaster: Broadcaster,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!(interval_ms = interval.as_millis(), "Analytics ticker started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }

        let snapshot = perturb(&mut rand::rng());
        let receivers = store
            .mutate(|state| {
                state.analytics = snapshot;
                broadcaster.broadcast(ServerEvent::AnalyticsUpdate(snapshot))
            })
            .await;
        debug!(receivers, ?snapshot, "Analytics refreshed");
    }

    info!("Analytics ticker stopped");
}

#[cfg(test)]
mod tests {
    use std::ops::RangeInclusive;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const EPSILON: f64 = 1e-9;

    fn within(value: f64, range: &RangeInclusive<f64>) -> bool {
        value >= range.start() - EPSILON && value <= range.end() + EPSILON
    }

    fn is_tenth(value: f64) -> bool {
        ((value * 10.0) - (value * 10.0).round()).abs() < 1e-6
    }

    #[test]
    fn values_stay_within_bounds() {
        let response_time = 1.5..=2.5;
        let route_efficiency = 85.0..=100.0;
        let success_rate = 92.0..=100.0;
        let officer_response = 1.2..=2.0;

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let s = perturb(&mut rng);
            assert!(within(s.response_time, &response_time), "{s:?}");
            assert!(within(s.route_efficiency, &route_efficiency), "{s:?}");
            assert!(within(s.success_rate, &success_rate), "{s:?}");
            assert!(within(s.officer_response, &officer_response), "{s:?}");
            assert!(is_tenth(s.response_time) && is_tenth(s.officer_response), "{s:?}");
        }
    }

    #[test]
    fn rounding_is_to_one_decimal() {
        assert!((round_tenth(2.349) - 2.3).abs() < EPSILON);
        assert!((round_tenth(2.35) - 2.4).abs() < EPSILON);
        assert!((round_tenth(97.0) - 97.0).abs() < EPSILON);
    }

    #[tokio::test]
    async fn refresh_updates_store() {
        let store = StateStore::new();
        let snapshot = refresh(&store).await;
        assert_eq!(store.read(|s| s.analytics).await, snapshot);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_broadcasts_each_interval_until_shutdown() {
        let store = Arc::new(StateStore::new());
        let broadcaster = Broadcaster::new();
        let mut rx = broadcaster.subscribe();
        let shutdown = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let handle = tokio::spawn(run_analytics_ticker(
            Arc::clone(&store),
            broadcaster.clone(),
            Duration::from_secs(30),
            shutdown.clone(),
        ));

        for tick in 1..=3u64 {
            let event = rx.recv().await;
            assert!(matches!(event, Ok(ServerEvent::AnalyticsUpdate(_))));
            assert_eq!(started.elapsed(), Duration::from_secs(30 * tick));
        }

        shutdown.cancel();
        assert!(handle.await.is_ok());
    }
}
