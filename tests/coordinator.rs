// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the polling coordinator using a simulated plug.
//!
//! Every test runs on a paused Tokio clock, so minutes of polling take no
//! real time and timings can be asserted exactly.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use zuli_lib::client::{SimulatedConnector, SimulatedPlug};
use zuli_lib::{
    Brightness, CommandError, Coordinator, CoordinatorConfig, CoordinatorPhase, DeviceMode,
    Error, RefreshError, SetupError, StateSnapshot,
};

const ADDRESS: &str = "C4:BE:84:0A:11:22";

type SimCoordinator = Coordinator<Arc<SimulatedPlug>>;

fn secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

fn plug() -> Arc<SimulatedPlug> {
    let plug = Arc::new(SimulatedPlug::new(ADDRESS));
    plug.set_brightness(Brightness::new(40).unwrap());
    plug
}

fn coordinator(plug: &Arc<SimulatedPlug>) -> SimCoordinator {
    Coordinator::new(CoordinatorConfig::new(ADDRESS), Arc::clone(plug)).unwrap()
}

/// Records every notification with the (paused) time it arrived.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<(Instant, StateSnapshot, bool)>>>,
}

impl Recorder {
    fn attach(coordinator: &SimCoordinator) -> Self {
        let recorder = Self::default();
        let events = Arc::clone(&recorder.events);
        coordinator.register_subscriber(move |snapshot, success| {
            events.lock().push((Instant::now(), *snapshot, success));
        });
        recorder
    }

    fn len(&self) -> usize {
        self.events.lock().len()
    }

    fn successes(&self) -> Vec<bool> {
        self.events.lock().iter().map(|(_, _, ok)| *ok).collect()
    }

    fn gaps(&self) -> Vec<Duration> {
        let events = self.events.lock();
        events.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }

    fn last(&self) -> Option<(StateSnapshot, bool)> {
        self.events.lock().last().map(|(_, snapshot, ok)| (*snapshot, *ok))
    }
}

// ============================================================================
// Scheduling and backoff
// ============================================================================

mod scheduling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn initial_interval_is_default() {
        let plug = plug();
        let coordinator = coordinator(&plug);

        assert_eq!(coordinator.current_interval(), secs(60));
        coordinator.start().await.unwrap();
        assert_eq!(coordinator.current_interval(), secs(60));

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_device_is_polled_every_minute() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let recorder = Recorder::attach(&coordinator);

        coordinator.start().await.unwrap();
        tokio::time::sleep(secs(181)).await;

        // Initial refresh plus three scheduled ones
        assert_eq!(plug.read_sequences(), 4);
        assert_eq!(recorder.gaps(), vec![secs(60); 3]);
        assert!(recorder.successes().iter().all(|ok| *ok));
        assert_eq!(coordinator.current_interval(), secs(60));

        let (snapshot, success) = coordinator.current_snapshot();
        assert!(success);
        assert_eq!(snapshot.brightness(), Some(Brightness::new(40).unwrap()));
        assert_eq!(snapshot.mode(), Some(DeviceMode::DimmableLight));

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_device_backs_off_to_max() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let recorder = Recorder::attach(&coordinator);

        coordinator.start().await.unwrap();
        let (healthy, _) = coordinator.current_snapshot();
        plug.set_unreachable(true);

        // Failures at 60, 180, 420, 900, 1800 and 2700
        tokio::time::sleep(secs(2701)).await;

        assert_eq!(
            recorder.gaps(),
            vec![secs(60), secs(120), secs(240), secs(480), secs(900), secs(900)]
        );
        assert_eq!(
            recorder.successes(),
            vec![true, false, false, false, false, false, false]
        );
        assert_eq!(coordinator.current_interval(), secs(900));
        assert_eq!(coordinator.consecutive_failures(), 6);

        // The last good snapshot is retained
        assert_eq!(coordinator.current_snapshot(), (healthy, false));
        assert_eq!(recorder.last(), Some((healthy, false)));

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn recovery_resets_interval() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let recorder = Recorder::attach(&coordinator);

        coordinator.start().await.unwrap();
        plug.set_unreachable(true);
        // Failures at 60, 180 and 420; next attempt due at 900
        tokio::time::sleep(secs(421)).await;
        assert_eq!(coordinator.current_interval(), secs(480));

        plug.set_unreachable(false);
        plug.set_brightness(Brightness::new(90).unwrap());
        tokio::time::sleep(secs(480)).await;

        assert_eq!(coordinator.current_interval(), secs(60));
        assert_eq!(coordinator.consecutive_failures(), 0);
        let (snapshot, success) = coordinator.current_snapshot();
        assert!(success);
        assert_eq!(snapshot.brightness(), Some(Brightness::new(90).unwrap()));

        // Back to the healthy cadence
        tokio::time::sleep(secs(60)).await;
        let gaps = recorder.gaps();
        assert_eq!(gaps.last(), Some(&secs(60)));

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_request_resets_timer() {
        let plug = plug();
        let coordinator = coordinator(&plug);

        coordinator.start().await.unwrap();
        tokio::time::sleep(secs(30)).await;
        coordinator.request_refresh_and_await().await.unwrap();
        assert_eq!(plug.read_sequences(), 2);

        // Next poll is due 60s after the explicit refresh, not at 60s
        tokio::time::sleep(secs(59)).await;
        assert_eq!(plug.read_sequences(), 2);

        tokio::time::sleep(secs(2)).await;
        assert_eq!(plug.read_sequences(), 3);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_refresh_is_retried_with_backoff() {
        let plug = plug();
        plug.set_unreachable(true);
        let coordinator = coordinator(&plug);

        coordinator.start().await.unwrap();
        assert_eq!(coordinator.current_snapshot(), (StateSnapshot::unknown(), false));
        assert_eq!(coordinator.current_interval(), secs(120));

        plug.set_unreachable(false);
        tokio::time::sleep(secs(121)).await;

        assert!(coordinator.current_snapshot().1);
        assert_eq!(coordinator.current_interval(), secs(60));

        coordinator.stop().await;
    }
}

// ============================================================================
// Single flight and timeouts
// ============================================================================

mod single_flight {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_share_one_refresh() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let recorder = Recorder::attach(&coordinator);
        coordinator.start().await.unwrap();
        plug.set_latency(secs(1));
        plug.set_brightness(Brightness::new(70).unwrap());
        let before = plug.read_sequences();

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.request_refresh_and_await().await })
            })
            .collect();
        coordinator.request_refresh();

        for waiter in waiters {
            let snapshot = waiter.await.unwrap().unwrap();
            assert_eq!(snapshot.brightness(), Some(Brightness::new(70).unwrap()));
        }

        assert_eq!(plug.read_sequences(), before + 1);
        // Initial refresh plus the shared one
        assert_eq!(recorder.len(), 2);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_times_out_after_fifteen_seconds() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        plug.set_latency(secs(20));

        let started = Instant::now();
        let result = coordinator.request_refresh_and_await().await;

        assert_eq!(result, Err(RefreshError::Timeout(secs(15))));
        assert_eq!(started.elapsed(), secs(15));
        assert!(!coordinator.current_snapshot().1);
        assert_eq!(coordinator.current_interval(), secs(120));

        // The slot was released by the cancelled read
        plug.set_latency(Duration::ZERO);
        coordinator.turn_off().await.unwrap();
        assert_eq!(plug.brightness(), Brightness::OFF);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn custom_timeout_is_honored() {
        let plug = plug();
        let config = CoordinatorConfig::new(ADDRESS).with_refresh_timeout(secs(5));
        let coordinator = Coordinator::new(config, Arc::clone(&plug)).unwrap();
        coordinator.start().await.unwrap();
        plug.set_latency(secs(2));

        // Three sequential reads of 2s each exceed 5s
        let result = coordinator.request_refresh_and_await().await;
        assert!(result.unwrap_err().is_timeout());

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn current_snapshot_does_no_io() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        plug.set_latency(secs(10));
        let before = plug.read_sequences();
        let expected = coordinator.current_snapshot();

        coordinator.request_refresh();
        let started = Instant::now();
        for _ in 0..100 {
            assert_eq!(coordinator.current_snapshot(), expected);
        }

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(coordinator.is_refreshing());
        // Only the refresh requested above touches the device
        tokio::time::sleep(secs(1)).await;
        assert_eq!(plug.read_sequences(), before + 1);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sub_read_fails_whole_refresh() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        let (before, _) = coordinator.current_snapshot();
        plug.set_brightness(Brightness::new(10).unwrap());
        plug.fail_next(1);

        let result = coordinator.request_refresh_and_await().await;

        assert!(matches!(result, Err(RefreshError::Device(_))));
        // The new brightness is not applied
        assert_eq!(coordinator.current_snapshot(), (before, false));

        coordinator.stop().await;
    }
}

// ============================================================================
// Device access and writes
// ============================================================================

mod device_access {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn writes_queue_behind_refresh() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        plug.set_latency(secs(1));

        let started = Instant::now();
        coordinator.request_refresh();
        // Let the refresh task take the slot
        tokio::task::yield_now().await;
        coordinator
            .turn_on(Brightness::new(55).unwrap())
            .await
            .unwrap();

        // Three reads, then the write
        assert_eq!(started.elapsed(), secs(4));
        assert_eq!(plug.max_concurrent_calls(), 1);
        assert_eq!(plug.brightness(), Brightness::new(55).unwrap());

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_write_queued_behind_refresh_succeeds() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        plug.set_latency(secs(4));

        let started = Instant::now();
        coordinator.request_refresh();
        tokio::task::yield_now().await;
        let result = coordinator.turn_on(Brightness::new(55).unwrap()).await;

        // 12s of reads, then a 4s write; only the write counts against its timeout
        assert_eq!(result, Ok(()));
        assert_eq!(started.elapsed(), secs(16));
        assert_eq!(plug.brightness(), Brightness::new(55).unwrap());
        assert!(coordinator.current_snapshot().1);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_queued_behind_write_succeeds() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        plug.set_latency(secs(4));

        let write = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.turn_off().await })
        };
        tokio::task::yield_now().await;
        let started = Instant::now();
        let result = coordinator.request_refresh_and_await().await;

        assert_eq!(result.unwrap().brightness(), Some(Brightness::OFF));
        assert_eq!(started.elapsed(), secs(16));
        assert_eq!(write.await.unwrap(), Ok(()));
        assert_eq!(coordinator.current_interval(), secs(60));
        assert!(coordinator.current_snapshot().1);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_operations_never_share_the_link() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        plug.set_latency(Duration::from_millis(250));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        coordinator.turn_off().await.map_err(Error::from)
                    } else {
                        coordinator
                            .request_refresh_and_await()
                            .await
                            .map(|_| ())
                            .map_err(Error::from)
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        tokio::time::sleep(secs(120)).await;

        assert_eq!(plug.max_concurrent_calls(), 1);
        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn mode_change_is_seen_by_next_refresh() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();

        coordinator.set_mode(DeviceMode::Appliance).await.unwrap();
        let snapshot = coordinator.request_refresh_and_await().await.unwrap();

        assert_eq!(snapshot.mode(), Some(DeviceMode::Appliance));
        assert_eq!(snapshot.is_appliance(), Some(true));

        coordinator.stop().await;
    }
}

// ============================================================================
// Subscribers
// ============================================================================

mod subscribers {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn every_completion_is_notified() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let recorder = Recorder::attach(&coordinator);

        coordinator.start().await.unwrap();
        plug.fail_next(1);
        let _ = coordinator.request_refresh_and_await().await;
        coordinator.request_refresh_and_await().await.unwrap();

        assert_eq!(recorder.successes(), vec![true, false, true]);
        assert_eq!(coordinator.generation(), 3);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_listener_is_not_called() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let recorder = Recorder::default();
        let events = Arc::clone(&recorder.events);
        let id = coordinator.register_subscriber(move |snapshot, ok| {
            events.lock().push((Instant::now(), *snapshot, ok));
        });

        coordinator.start().await.unwrap();
        assert!(coordinator.unregister_subscriber(id));
        assert!(!coordinator.unregister_subscriber(id));
        coordinator.request_refresh_and_await().await.unwrap();

        assert_eq!(recorder.len(), 1);
        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn listener_may_use_coordinator_reentrantly() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = coordinator.clone();
        let seen_clone = Arc::clone(&seen);
        coordinator.register_subscriber(move |snapshot, _| {
            // Reads the committed state and registers another listener
            let (cached, _) = inner.current_snapshot();
            seen_clone.lock().push(cached == *snapshot);
            inner.register_subscriber(|_, _| {});
        });

        coordinator.start().await.unwrap();
        coordinator.request_refresh_and_await().await.unwrap();

        assert_eq!(*seen.lock(), vec![true, true]);
        assert_eq!(coordinator.subscriber_count(), 3);

        coordinator.stop().await;
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

mod lifecycle {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn setup_connects_and_starts() {
        let plug = plug();
        let connector = SimulatedConnector::new().with_plug(Arc::clone(&plug));
        let config = CoordinatorConfig::new(ADDRESS.to_lowercase()).with_name("Desk Lamp");

        let coordinator = Coordinator::setup(config, &connector).await.unwrap();

        assert_eq!(coordinator.phase(), CoordinatorPhase::Running);
        assert_eq!(coordinator.name(), "Desk Lamp");
        assert_eq!(plug.read_sequences(), 1);
        assert!(coordinator.current_snapshot().1);

        coordinator.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn setup_unknown_address_fails() {
        let connector = SimulatedConnector::new();

        let result: Result<SimCoordinator, _> =
            Coordinator::setup(CoordinatorConfig::new(ADDRESS), &connector).await;

        assert!(matches!(
            result,
            Err(Error::Setup(SetupError::NotFound { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn setup_unreachable_device_fails() {
        let plug = plug();
        plug.set_unreachable(true);
        let connector = SimulatedConnector::new().with_plug(plug);

        let result = Coordinator::setup(CoordinatorConfig::new(ADDRESS), &connector).await;

        assert!(matches!(
            result,
            Err(Error::Setup(SetupError::Connect { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_in_flight_refresh() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        let recorder = Recorder::attach(&coordinator);
        coordinator.start().await.unwrap();
        plug.set_latency(secs(5));

        let joiner = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.request_refresh_and_await().await })
        };
        tokio::time::sleep(secs(1)).await;
        assert!(coordinator.is_refreshing());

        coordinator.stop().await;

        assert_eq!(joiner.await.unwrap(), Err(RefreshError::Cancelled));
        assert_eq!(coordinator.phase(), CoordinatorPhase::Stopped);
        assert_eq!(coordinator.current_interval(), secs(60));
        assert!(!coordinator.is_refreshing());
        assert_eq!(recorder.successes(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_coordinator_is_inert() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        coordinator.stop().await;
        let reads = plug.read_sequences();

        coordinator.request_refresh();
        assert_eq!(
            coordinator.request_refresh_and_await().await,
            Err(RefreshError::NotRunning)
        );
        assert_eq!(coordinator.turn_off().await, Err(CommandError::NotRunning));

        tokio::time::sleep(secs(3600)).await;
        assert_eq!(plug.read_sequences(), reads);
        assert_eq!(plug.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_all_handles_ends_polling() {
        let plug = plug();
        let coordinator = coordinator(&plug);
        coordinator.start().await.unwrap();
        drop(coordinator);

        tokio::time::sleep(secs(600)).await;
        assert_eq!(plug.read_sequences(), 1);
    }
}
