//! Tokio driver for [`TypewriterEngine`].
//!
//! One spawned task runs the timer chain: sleep for the engine's next delay,
//! tick, repeat. Because each sleep is awaited before the next is created,
//! at most one timer is pending per instance.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::engine::{TypewriterEngine, TypewriterSnapshot};
use crate::events::Event;

struct Shared {
    engine: TypewriterEngine,
    stopped: bool,
}

/// A running typewriter animation.
///
/// Dropping it stops the animation.
pub struct Typewriter {
    shared: Arc<Mutex<Shared>>,
    handle: Option<JoinHandle<()>>,
    text_rx: watch::Receiver<String>,
    events_tx: mpsc::UnboundedSender<Event>,
}

impl Typewriter {
    /// Spawn the timer chain on the current tokio runtime.
    ///
    /// Events are sent to `events_tx`; a closed receiver is ignored.
    pub fn start(engine: TypewriterEngine, events_tx: mpsc::UnboundedSender<Event>) -> Self {
        let (text_tx, text_rx) = watch::channel(engine.displayed_text().to_string());
        let phrases = engine.settings().phrases.len();
        let shared = Arc::new(Mutex::new(Shared {
            engine,
            stopped: false,
        }));

        let task_shared = Arc::clone(&shared);
        let task_events = events_tx.clone();
        let handle = tokio::spawn(async move {
            let mut delay = lock(&task_shared).engine.next_delay();
            loop {
                tokio::time::sleep(delay).await;
                let mut guard = lock(&task_shared);
                if guard.stopped {
                    break;
                }
                if let Some(event) = guard.engine.tick() {
                    let _ = task_events.send(event);
                }
                let text = guard.engine.displayed_text();
                text_tx.send_if_modified(|current| {
                    if current.as_str() != text {
                        text.clone_into(current);
                        true
                    } else {
                        false
                    }
                });
                trace!(text, mode = ?guard.engine.mode(), "Typewriter tick");
                delay = guard.engine.next_delay();
            }
        });

        info!(phrases, "Typewriter started");
        Self {
            shared,
            handle: Some(handle),
            text_rx,
            events_tx,
        }
    }

    /// Currently displayed text.
    pub fn text(&self) -> String {
        self.text_rx.borrow().clone()
    }

    /// Receiver notified on every text change.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.text_rx.clone()
    }

    pub fn snapshot(&self) -> TypewriterSnapshot {
        lock(&self.shared).engine.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel the pending tick.
    ///
    /// Once this returns no further tick runs. Calling it again is a no-op.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        lock(&self.shared).stopped = true;
        handle.abort();
        let _ = self.events_tx.send(Event::TypewriterStopped { at: Utc::now() });
        debug!("Typewriter stopped");
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
