//! Recurring notification scheduler.
//!
//! Decides whether the promotional popup should be shown, based on how long
//! ago it was last shown. The last-shown timestamp lives in a
//! [`KeyValueStore`] so the cooldown survives restarts; visibility is
//! in-memory only.
//!
//! Storage problems never reach the caller. An unreadable store or a value
//! that is not a plain integer counts as "never shown", so the popup errs on
//! the side of appearing.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::StorageError;
use crate::events::Event;
use crate::storage::{KeyValueStore, PopupContent};

pub const DEFAULT_STORAGE_KEY: &str = "commercial_popup_last_shown";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(60);

/// Scheduler timing and copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupSettings {
    /// Cooldown between displays.
    pub interval: Duration,
    /// How often a mounted poller re-checks.
    pub poll_period: Duration,
    pub storage_key: String,
    pub content: PopupContent,
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            poll_period: DEFAULT_POLL_PERIOD,
            storage_key: DEFAULT_STORAGE_KEY.into(),
            content: PopupContent::default(),
        }
    }
}

/// Host-facing summary of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupStatus {
    pub visible: bool,
    pub last_shown_at_ms: Option<u64>,
    /// `None` means the next check will show the popup.
    pub next_due_at_ms: Option<u64>,
    pub interval_ms: u64,
}

pub struct NotificationScheduler<S, C> {
    store: S,
    clock: C,
    settings: PopupSettings,
    visible: bool,
}

impl<S: KeyValueStore, C: Clock> NotificationScheduler<S, C> {
    pub fn new(store: S, clock: C, settings: PopupSettings) -> Self {
        Self {
            store,
            clock,
            settings,
            visible: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn settings(&self) -> &PopupSettings {
        &self.settings
    }

    pub fn content(&self) -> &PopupContent {
        &self.settings.content
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn interval_ms(&self) -> u64 {
        self.settings.interval.as_millis() as u64
    }

    /// Persisted last-shown time, or `None` if absent, unreadable or corrupt.
    pub fn last_shown_at(&self) -> Option<u64> {
        let key = &self.settings.storage_key;
        match self.store.get(key) {
            Ok(Some(raw)) => match parse_timestamp(&raw) {
                Some(ts) => Some(ts),
                None => {
                    warn!(key = %key, value = %raw, "Ignoring corrupt popup timestamp");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Popup store unavailable, treating as first visit");
                None
            }
        }
    }

    /// When the cooldown ends, or `None` if the popup is due now.
    pub fn next_due_at(&self) -> Option<u64> {
        self.last_shown_at()
            .map(|last| last.saturating_add(self.interval_ms()))
    }

    pub fn status(&self) -> PopupStatus {
        let last_shown_at_ms = self.last_shown_at();
        PopupStatus {
            visible: self.visible,
            last_shown_at_ms,
            next_due_at_ms: last_shown_at_ms.map(|last| last.saturating_add(self.interval_ms())),
            interval_ms: self.interval_ms(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Show the popup if it has never been shown or the interval elapsed.
    ///
    /// Records `now_ms` when it decides to show; otherwise writes nothing.
    pub fn check_and_maybe_show(&mut self, now_ms: u64) -> bool {
        matches!(self.check_at(now_ms), Event::PopupShown { .. })
    }

    /// Run a check against the injected clock.
    pub fn poll(&mut self) -> Event {
        let now_ms = self.clock.now_ms();
        self.check_at(now_ms)
    }

    /// Run a check at `now_ms` and describe the outcome.
    pub fn check_at(&mut self, now_ms: u64) -> Event {
        let Some(last) = self.last_shown_at() else {
            return self.show(now_ms, true);
        };

        // A timestamp from the future counts as zero elapsed.
        let elapsed = now_ms.saturating_sub(last);
        if elapsed >= self.interval_ms() {
            return self.show(now_ms, false);
        }

        let next_due_at_ms = last.saturating_add(self.interval_ms());
        debug!(elapsed, next_due_at_ms, "Popup suppressed");
        Event::PopupSuppressed {
            last_shown_at_ms: last,
            next_due_at_ms,
            at: Utc::now(),
        }
    }

    /// Hide the popup. Persisted state is untouched, so the cooldown keeps
    /// running from the last display.
    ///
    /// Returns `None` if it was already hidden.
    pub fn dismiss(&mut self) -> Option<Event> {
        if !self.visible {
            return None;
        }
        self.visible = false;
        debug!("Popup dismissed");
        Some(Event::PopupDismissed { at: Utc::now() })
    }

    /// Forget the persisted timestamp so the next check behaves like a first
    /// visit.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        self.store.remove(&self.settings.storage_key)?;
        self.visible = false;
        info!("Popup history cleared");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn show(&mut self, now_ms: u64, first_visit: bool) -> Event {
        self.visible = true;
        if let Err(e) = self
            .store
            .set(&self.settings.storage_key, &now_ms.to_string())
        {
            warn!(error = %e, "Failed to persist popup timestamp");
        }
        info!(now_ms, first_visit, "Popup shown");
        Event::PopupShown {
            shown_at_ms: now_ms,
            first_visit,
            at: Utc::now(),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    const INTERVAL: u64 = 1_800_000;
    const T0: u64 = 1_700_000_000_000;

    fn scheduler() -> NotificationScheduler<Arc<MemoryStore>, ManualClock> {
        NotificationScheduler::new(
            Arc::new(MemoryStore::new()),
            ManualClock::new(T0),
            PopupSettings::default(),
        )
    }

    fn persisted(s: &NotificationScheduler<Arc<MemoryStore>, ManualClock>) -> Option<String> {
        s.store().get(DEFAULT_STORAGE_KEY).unwrap()
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk on fire".into()))
        }
    }

    #[test]
    fn first_visit_shows_and_persists() {
        let mut s = scheduler();
        assert!(!s.is_visible());
        assert!(s.check_and_maybe_show(T0));
        assert!(s.is_visible());
        assert_eq!(persisted(&s), Some(T0.to_string()));
    }

    #[test]
    fn within_interval_is_suppressed() {
        let mut s = scheduler();
        s.check_and_maybe_show(T0);
        s.dismiss();
        assert!(!s.check_and_maybe_show(T0 + INTERVAL - 1));
        assert!(!s.is_visible());
        assert_eq!(persisted(&s), Some(T0.to_string()));
        assert_eq!(s.store().writes(), 1);
    }

    #[test]
    fn exactly_interval_shows_again() {
        let mut s = scheduler();
        s.check_and_maybe_show(T0);
        s.dismiss();
        assert!(s.check_and_maybe_show(T0 + INTERVAL));
        assert!(s.is_visible());
        assert_eq!(persisted(&s), Some((T0 + INTERVAL).to_string()));
    }

    #[test]
    fn suppressed_event_reports_next_due() {
        let mut s = scheduler();
        s.check_and_maybe_show(T0);
        match s.check_at(T0 + 60_000) {
            Event::PopupSuppressed {
                last_shown_at_ms,
                next_due_at_ms,
                ..
            } => {
                assert_eq!(last_shown_at_ms, T0);
                assert_eq!(next_due_at_ms, T0 + INTERVAL);
            }
            other => panic!("Expected PopupSuppressed, got {other:?}"),
        }
    }

    #[test]
    fn shown_event_marks_first_visit() {
        let mut s = scheduler();
        assert!(matches!(
            s.check_at(T0),
            Event::PopupShown { first_visit: true, shown_at_ms: T0, .. }
        ));
        assert!(matches!(
            s.check_at(T0 + INTERVAL),
            Event::PopupShown { first_visit: false, .. }
        ));
    }

    #[test]
    fn poll_uses_injected_clock() {
        let mut s = scheduler();
        assert!(matches!(s.poll(), Event::PopupShown { .. }));
        s.clock().advance_ms(INTERVAL - 1);
        assert!(matches!(s.poll(), Event::PopupSuppressed { .. }));
        s.clock().advance_ms(1);
        assert!(matches!(s.poll(), Event::PopupShown { .. }));
        assert_eq!(persisted(&s), Some((T0 + INTERVAL).to_string()));
    }

    #[test]
    fn dismiss_does_not_touch_store() {
        let mut s = scheduler();
        s.check_and_maybe_show(T0);
        let writes = s.store().writes();
        assert!(s.dismiss().is_some());
        assert!(!s.is_visible());
        assert_eq!(s.store().writes(), writes);
        assert_eq!(persisted(&s), Some(T0.to_string()));
    }

    #[test]
    fn dismiss_is_idempotent() {
        let mut s = scheduler();
        s.check_and_maybe_show(T0);
        assert!(s.dismiss().is_some());
        assert!(s.dismiss().is_none());
        assert!(!s.is_visible());
        assert_eq!(persisted(&s), Some(T0.to_string()));
    }

    #[test]
    fn dismiss_before_any_show_is_noop() {
        let mut s = scheduler();
        assert!(s.dismiss().is_none());
        assert_eq!(s.store().writes(), 0);
    }

    #[test]
    fn suppressed_check_keeps_popup_visible() {
        let mut s = scheduler();
        s.check_and_maybe_show(T0);
        assert!(!s.check_and_maybe_show(T0 + 60_000));
        assert!(s.is_visible());
    }

    #[test]
    fn corrupt_value_is_treated_as_absent() {
        for raw in ["", "abc", "12abc", "-5", "1.5e12", "NaN"] {
            let mut s = scheduler();
            s.store().set(DEFAULT_STORAGE_KEY, raw).unwrap();
            assert!(s.last_shown_at().is_none(), "{raw:?}");
            assert!(s.check_and_maybe_show(T0), "{raw:?}");
            assert_eq!(persisted(&s), Some(T0.to_string()));
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let mut s = scheduler();
        s.store()
            .set(DEFAULT_STORAGE_KEY, &format!(" {T0}\n"))
            .unwrap();
        assert_eq!(s.last_shown_at(), Some(T0));
        assert!(!s.check_and_maybe_show(T0 + 1));
    }

    #[test]
    fn unavailable_store_always_shows() {
        let mut s = NotificationScheduler::new(
            BrokenStore,
            ManualClock::new(T0),
            PopupSettings::default(),
        );
        assert!(s.check_and_maybe_show(T0));
        assert!(s.check_and_maybe_show(T0 + 1));
        assert!(s.is_visible());
        assert!(s.next_due_at().is_none());
        assert!(s.reset().is_err());
    }

    #[test]
    fn future_timestamp_suppresses_until_due() {
        let mut s = scheduler();
        s.store()
            .set(DEFAULT_STORAGE_KEY, &(T0 + 10_000).to_string())
            .unwrap();
        assert!(!s.check_and_maybe_show(T0));
        assert!(!s.check_and_maybe_show(T0 + INTERVAL));
        assert!(s.check_and_maybe_show(T0 + 10_000 + INTERVAL));
    }

    #[test]
    fn custom_interval_and_key() {
        let settings = PopupSettings {
            interval: Duration::from_secs(5),
            storage_key: "promo".into(),
            ..PopupSettings::default()
        };
        let store = Arc::new(MemoryStore::new());
        let mut s = NotificationScheduler::new(Arc::clone(&store), ManualClock::new(0), settings);
        assert!(s.check_and_maybe_show(1_000));
        assert!(!s.check_and_maybe_show(5_999));
        assert!(s.check_and_maybe_show(6_000));
        assert_eq!(store.get("promo").unwrap().as_deref(), Some("6000"));
        assert!(store.get(DEFAULT_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn reset_returns_to_first_visit() {
        let mut s = scheduler();
        s.check_and_maybe_show(T0);
        s.reset().unwrap();
        assert!(!s.is_visible());
        assert!(s.last_shown_at().is_none());
        assert!(s.check_and_maybe_show(T0 + 1));
    }

    #[test]
    fn status_reports_schedule() {
        let mut s = scheduler();
        assert_eq!(
            s.status(),
            PopupStatus {
                visible: false,
                last_shown_at_ms: None,
                next_due_at_ms: None,
                interval_ms: INTERVAL,
            }
        );
        s.check_and_maybe_show(T0);
        let status = s.status();
        assert!(status.visible);
        assert_eq!(status.last_shown_at_ms, Some(T0));
        assert_eq!(status.next_due_at_ms, Some(T0 + INTERVAL));
    }

    proptest! {
        #[test]
        fn absent_record_always_shows(now in any::<u64>()) {
            let mut s = scheduler();
            prop_assert!(s.check_and_maybe_show(now));
            prop_assert_eq!(persisted(&s), Some(now.to_string()));
        }

        #[test]
        fn shows_iff_interval_elapsed(now1 in 0u64..u64::MAX / 2, gap in 0u64..10 * INTERVAL) {
            let mut s = scheduler();
            s.check_and_maybe_show(now1);
            s.dismiss();
            let now2 = now1 + gap;
            let shown = s.check_and_maybe_show(now2);
            prop_assert_eq!(shown, gap >= INTERVAL);
            let expected = if shown { now2 } else { now1 };
            prop_assert_eq!(persisted(&s), Some(expected.to_string()));
            prop_assert_eq!(s.is_visible(), shown);
        }

        #[test]
        fn dismiss_never_writes(now in any::<u64>(), dismissals in 1usize..5) {
            let mut s = scheduler();
            s.check_and_maybe_show(now);
            let before = persisted(&s);
            for _ in 0..dismissals {
                s.dismiss();
            }
            prop_assert_eq!(persisted(&s), before);
            prop_assert_eq!(s.store().writes(), 1);
        }
    }
}
