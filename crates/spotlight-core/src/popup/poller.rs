//! Mounted popup scheduler.
//!
//! [`PopupPoller`] runs one check synchronously when started and then one
//! per poll period on a tokio interval. The host calls `dismiss()` from its
//! close button while the poll loop keeps running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::scheduler::{NotificationScheduler, PopupStatus, DEFAULT_POLL_PERIOD};
use crate::clock::Clock;
use crate::events::Event;
use crate::storage::KeyValueStore;

struct Shared<S, C> {
    scheduler: NotificationScheduler<S, C>,
    stopped: bool,
}

/// Owns the repeating check timer for one scheduler.
///
/// Dropping the poller cancels the timer.
pub struct PopupPoller<S, C> {
    shared: Arc<Mutex<Shared<S, C>>>,
    handle: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<Event>,
}

impl<S, C> PopupPoller<S, C>
where
    S: KeyValueStore + 'static,
    C: Clock + 'static,
{
    /// Check once now, then every `poll_period` from the scheduler's settings.
    pub fn start(
        mut scheduler: NotificationScheduler<S, C>,
        events_tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let mut period = scheduler.settings().poll_period;
        if period.is_zero() {
            warn!(
                fallback_ms = DEFAULT_POLL_PERIOD.as_millis() as u64,
                "Zero popup poll period, using default"
            );
            period = DEFAULT_POLL_PERIOD;
        }
        let _ = events_tx.send(Event::PopupPollerStarted {
            poll_period_ms: period.as_millis() as u64,
            at: Utc::now(),
        });
        let _ = events_tx.send(scheduler.poll());

        let shared = Arc::new(Mutex::new(Shared {
            scheduler,
            stopped: false,
        }));

        let first_tick = Instant::now() + period;
        let task_shared = Arc::clone(&shared);
        let task_events = events_tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let mut guard = lock(&task_shared);
                if guard.stopped {
                    break;
                }
                let event = guard.scheduler.poll();
                let _ = task_events.send(event);
            }
        });

        info!(period_ms = period.as_millis() as u64, "Popup poller started");
        Self {
            shared,
            handle: Some(handle),
            events_tx,
        }
    }

    pub fn is_visible(&self) -> bool {
        lock(&self.shared).scheduler.is_visible()
    }

    pub fn status(&self) -> PopupStatus {
        lock(&self.shared).scheduler.status()
    }

    /// User closed the popup. Idempotent.
    pub fn dismiss(&self) {
        if let Some(event) = lock(&self.shared).scheduler.dismiss() {
            let _ = self.events_tx.send(event);
        }
    }
}

impl<S, C> PopupPoller<S, C> {
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel the repeating check.
    ///
    /// Once this returns no further check runs and nothing more is written
    /// to the store. Calling it again is a no-op.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        lock(&self.shared).stopped = true;
        handle.abort();
        let _ = self.events_tx.send(Event::PopupPollerStopped { at: Utc::now() });
        debug!("Popup poller stopped");
    }
}

impl<S, C> Drop for PopupPoller<S, C> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<S, C>(shared: &Mutex<Shared<S, C>>) -> MutexGuard<'_, Shared<S, C>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::popup::{PopupSettings, DEFAULT_STORAGE_KEY};
    use crate::storage::MemoryStore;
    use std::time::Duration;

    const INTERVAL: u64 = 1_800_000;
    const MINUTE: Duration = Duration::from_secs(60);
    const T0: u64 = 1_700_000_000_000;

    fn mount(
        store: &Arc<MemoryStore>,
        clock: &ManualClock,
    ) -> (
        PopupPoller<Arc<MemoryStore>, ManualClock>,
        mpsc::UnboundedReceiver<Event>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = NotificationScheduler::new(
            Arc::clone(store),
            clock.clone(),
            PopupSettings::default(),
        );
        (PopupPoller::start(scheduler, tx), rx)
    }

    /// Advance both the wall clock and tokio's paused clock by one poll
    /// period, then let the poll task run.
    async fn one_poll(clock: &ManualClock) {
        clock.advance_ms(60_000);
        time::advance(MINUTE).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn checks_on_mount() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let (poller, mut rx) = mount(&store, &clock);
        assert!(poller.is_visible());
        assert_eq!(
            store.get(DEFAULT_STORAGE_KEY).unwrap(),
            Some(T0.to_string())
        );
        assert_eq!(drain(&mut rx), vec!["popup_poller_started", "popup_shown"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reappears_after_interval() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let (poller, mut rx) = mount(&store, &clock);
        poller.dismiss();
        drain(&mut rx);

        for _ in 0..29 {
            one_poll(&clock).await;
            assert!(!poller.is_visible());
        }
        assert_eq!(store.writes(), 1);

        one_poll(&clock).await;
        assert!(poller.is_visible());
        assert_eq!(
            store.get(DEFAULT_STORAGE_KEY).unwrap(),
            Some((T0 + INTERVAL).to_string())
        );
        let kinds = drain(&mut rx);
        assert_eq!(kinds.len(), 30);
        assert_eq!(kinds.last(), Some(&"popup_shown"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_poll_period_keeps_polling() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let settings = PopupSettings {
            poll_period: Duration::ZERO,
            ..PopupSettings::default()
        };
        let scheduler = NotificationScheduler::new(Arc::clone(&store), clock.clone(), settings);
        let poller = PopupPoller::start(scheduler, tx);
        poller.dismiss();
        drain(&mut rx);

        for _ in 0..30 {
            one_poll(&clock).await;
        }
        assert!(poller.is_running());
        assert!(poller.is_visible());
        assert_eq!(store.writes(), 2);
        assert_eq!(drain(&mut rx).len(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_twice_emits_once() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let (poller, mut rx) = mount(&store, &clock);
        drain(&mut rx);
        poller.dismiss();
        poller.dismiss();
        assert!(!poller.is_visible());
        assert_eq!(drain(&mut rx), vec!["popup_dismissed"]);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_writes() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let (mut poller, mut rx) = mount(&store, &clock);
        poller.stop();
        assert!(!poller.is_running());

        clock.advance_ms(10 * INTERVAL);
        for _ in 0..5 {
            one_poll(&clock).await;
        }
        assert_eq!(store.writes(), 1);
        assert_eq!(
            drain(&mut rx),
            vec!["popup_poller_started", "popup_shown", "popup_poller_stopped"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_poll_loop() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let (poller, _rx) = mount(&store, &clock);
        drop(poller);

        clock.advance_ms(10 * INTERVAL);
        one_poll(&clock).await;
        assert_eq!(store.writes(), 1);
        assert_eq!(
            store.get(DEFAULT_STORAGE_KEY).unwrap(),
            Some(T0.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remount_respects_persisted_cooldown() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let (first, _rx) = mount(&store, &clock);
        drop(first);

        clock.advance_ms(5 * 60_000);
        let (second, _rx) = mount(&store, &clock);
        assert!(!second.is_visible());
        assert_eq!(second.status().next_due_at_ms, Some(T0 + INTERVAL));
    }
}
