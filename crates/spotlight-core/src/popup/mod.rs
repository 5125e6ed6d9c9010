//! Recurring promotional popup.
//!
//! [`NotificationScheduler`] holds the show/suppress decision;
//! [`PopupPoller`] mounts it on a repeating tokio timer.

mod poller;
mod scheduler;

pub use poller::PopupPoller;
pub use scheduler::{
    NotificationScheduler, PopupSettings, PopupStatus, DEFAULT_INTERVAL, DEFAULT_POLL_PERIOD,
    DEFAULT_STORAGE_KEY,
};
