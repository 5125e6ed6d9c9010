//! Typewriter text animation.
//!
//! [`TypewriterEngine`] is the synchronous state machine; [`Typewriter`]
//! drives it with tokio timers.

mod driver;
mod engine;

pub use driver::Typewriter;
pub use engine::{
    Frame, Timeline, TypewriterEngine, TypewriterSettings, TypewriterSnapshot, TypingMode,
};
