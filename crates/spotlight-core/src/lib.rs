//! # Spotlight Core Library
//!
//! Timing logic behind a profile site's animated presentation: a recurring
//! promotional popup and a typewriter headline. Rendering is left to the
//! host; this crate decides *what* is shown and *when*.
//!
//! ## Architecture
//!
//! - **Popup**: a persisted cooldown scheduler plus a tokio poller that
//!   re-checks it on a fixed period
//! - **Typewriter**: a pure typing/pausing/deleting state machine plus a
//!   tokio driver that runs its timer chain
//! - **Storage**: SQLite key-value store and TOML configuration
//! - **Clock**: injectable time source so nothing depends on the wall clock
//!
//! ## Key Components
//!
//! - [`NotificationScheduler`] / [`PopupPoller`]
//! - [`TypewriterEngine`] / [`Typewriter`]
//! - [`KeyValueStore`], [`Database`], [`MemoryStore`]
//! - [`Config`]

pub mod clock;
pub mod error;
pub mod events;
pub mod popup;
pub mod storage;
pub mod typewriter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, StorageError, ValidationError};
pub use events::Event;
pub use popup::{NotificationScheduler, PopupPoller, PopupSettings, PopupStatus};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, PopupContent};
pub use typewriter::{Timeline, Typewriter, TypewriterEngine, TypewriterSettings, TypingMode};
