//! Typewriter engine implementation.
//!
//! A pure state machine: it never sleeps and never spawns. The caller waits
//! [`TypewriterEngine::next_delay`] and then calls [`TypewriterEngine::tick`].
//!
//! ## State Transitions
//!
//! ```text
//! Typing --(phrase fully typed)--> Pausing --(pause elapsed)--> Deleting
//!    ^                                                             |
//!    +------------(text empty, advance to next phrase)-------------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TypewriterEngine::new(settings)?;
//! loop {
//!     sleep(engine.next_delay());
//!     engine.tick(); // Returns Some(Event) on every step
//! }
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingMode {
    Typing,
    /// Full phrase on screen, text frozen.
    Pausing,
    Deleting,
}

/// Phrases and per-step delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypewriterSettings {
    pub phrases: Vec<String>,
    /// Delay before each inserted character.
    pub typing_delay: Duration,
    /// Delay before each removed character.
    pub deleting_delay: Duration,
    /// How long a fully typed phrase stays on screen.
    pub pause_duration: Duration,
}

impl TypewriterSettings {
    pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(100);
    pub const DEFAULT_DELETING_DELAY: Duration = Duration::from_millis(50);
    pub const DEFAULT_PAUSE_DURATION: Duration = Duration::from_millis(2000);

    /// Settings with the default delays.
    pub fn new<I, P>(phrases: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
            typing_delay: Self::DEFAULT_TYPING_DELAY,
            deleting_delay: Self::DEFAULT_DELETING_DELAY,
            pause_duration: Self::DEFAULT_PAUSE_DURATION,
        }
    }

    pub fn with_delays(mut self, typing: Duration, deleting: Duration, pause: Duration) -> Self {
        self.typing_delay = typing;
        self.deleting_delay = deleting;
        self.pause_duration = pause;
        self
    }

    /// Check that a driver running these settings always makes progress.
    ///
    /// # Errors
    /// Returns an error if there are no phrases, if a typing or deleting
    /// delay is zero, or if every phrase is empty and the pause is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.phrases.is_empty() {
            return Err(ValidationError::EmptyCollection("phrases".into()));
        }
        for (field, delay) in [
            ("typing_delay", self.typing_delay),
            ("deleting_delay", self.deleting_delay),
        ] {
            if delay.is_zero() {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }
        // Empty phrases are skipped through Pausing, so the pause is the only
        // delay left between ticks.
        if self.pause_duration.is_zero() && self.phrases.iter().all(String::is_empty) {
            return Err(ValidationError::InvalidValue {
                field: "pause_duration".into(),
                message: "must be greater than zero when every phrase is empty".into(),
            });
        }
        Ok(())
    }
}

/// Serializable view of the engine for hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypewriterSnapshot {
    pub phrase_index: usize,
    pub char_index: usize,
    pub mode: TypingMode,
    pub text: String,
}

/// Core typewriter engine.
///
/// Invariant: `displayed` is always the first `char_index` characters of
/// the current phrase.
#[derive(Debug, Clone)]
pub struct TypewriterEngine {
    settings: TypewriterSettings,
    /// Characters of `settings.phrases[phrase_index]`.
    current: Vec<char>,
    phrase_index: usize,
    char_index: usize,
    displayed: String,
    mode: TypingMode,
}

impl TypewriterEngine {
    /// Create an engine positioned at the start of the first phrase.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyCollection`] if there are no phrases,
    /// or [`ValidationError::InvalidValue`] for delays that would let a
    /// driver spin (see [`TypewriterSettings::validate`]).
    pub fn new(settings: TypewriterSettings) -> Result<Self, ValidationError> {
        settings.validate()?;
        let current = settings.phrases[0].chars().collect();
        let mut engine = Self {
            settings,
            current,
            phrase_index: 0,
            char_index: 0,
            displayed: String::new(),
            mode: TypingMode::Typing,
        };
        engine.settle();
        Ok(engine)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn displayed_text(&self) -> &str {
        &self.displayed
    }

    pub fn mode(&self) -> TypingMode {
        self.mode
    }

    pub fn phrase_index(&self) -> usize {
        self.phrase_index
    }

    pub fn char_index(&self) -> usize {
        self.char_index
    }

    pub fn current_phrase(&self) -> &str {
        &self.settings.phrases[self.phrase_index]
    }

    pub fn settings(&self) -> &TypewriterSettings {
        &self.settings
    }

    /// How long to wait before the next `tick()`.
    pub fn next_delay(&self) -> Duration {
        match self.mode {
            TypingMode::Typing => self.settings.typing_delay,
            TypingMode::Pausing => self.settings.pause_duration,
            TypingMode::Deleting => self.settings.deleting_delay,
        }
    }

    pub fn snapshot(&self) -> TypewriterSnapshot {
        TypewriterSnapshot {
            phrase_index: self.phrase_index,
            char_index: self.char_index,
            mode: self.mode,
            text: self.displayed.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Advance by one step.
    ///
    /// Typing and deleting steps return `TypewriterFrame`; the end of a
    /// pause returns `TypewriterDeletionStarted`.
    pub fn tick(&mut self) -> Option<Event> {
        match self.mode {
            TypingMode::Typing => {
                let next = *self.current.get(self.char_index)?;
                self.displayed.push(next);
                self.char_index += 1;
                self.settle();
                Some(self.frame())
            }
            TypingMode::Pausing => {
                let phrase_index = self.phrase_index;
                self.mode = TypingMode::Deleting;
                self.settle();
                Some(Event::TypewriterDeletionStarted {
                    phrase_index,
                    at: Utc::now(),
                })
            }
            TypingMode::Deleting => {
                self.displayed.pop()?;
                self.char_index -= 1;
                self.settle();
                Some(self.frame())
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Apply the zero-delay transitions: a fully typed phrase starts its
    /// pause, an emptied phrase hands over to the next one.
    fn settle(&mut self) {
        if self.mode == TypingMode::Deleting && self.char_index == 0 {
            self.advance();
        }
        if self.mode == TypingMode::Typing && self.char_index == self.current.len() {
            self.mode = TypingMode::Pausing;
        }
    }

    fn advance(&mut self) {
        self.phrase_index = (self.phrase_index + 1) % self.settings.phrases.len();
        self.current = self.settings.phrases[self.phrase_index].chars().collect();
        self.char_index = 0;
        self.displayed.clear();
        self.mode = TypingMode::Typing;
    }

    fn frame(&self) -> Event {
        Event::TypewriterFrame {
            phrase_index: self.phrase_index,
            text: self.displayed.clone(),
            mode: self.mode,
            at: Utc::now(),
        }
    }
}

/// One step of a simulated run: the text visible from `offset` onwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub offset: Duration,
    pub text: String,
    pub mode: TypingMode,
}

/// Deterministic, timer-free replay of an engine.
///
/// Yields the state after each tick together with the cumulative delay at
/// which that tick would fire. Never ends on its own.
pub struct Timeline {
    engine: TypewriterEngine,
    offset: Duration,
}

impl Timeline {
    pub fn new(engine: TypewriterEngine) -> Self {
        Self {
            engine,
            offset: Duration::ZERO,
        }
    }
}

impl Iterator for Timeline {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.offset += self.engine.next_delay();
        self.engine.tick()?;
        Some(Frame {
            offset: self.offset,
            text: self.engine.displayed_text().to_string(),
            mode: self.engine.mode(),
        })
    }
}
