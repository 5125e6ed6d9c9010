use std::io::Write;

use clap::Subcommand;
use serde::Serialize;
use spotlight_core::typewriter::Frame;
use spotlight_core::{Config, Event, Timeline, Typewriter, TypewriterEngine, TypingMode};
use tokio::sync::mpsc;

#[derive(Subcommand)]
pub enum TypewriterAction {
    /// Animate the phrases on this terminal line
    Run {
        /// Phrases to cycle through (defaults to the configured ones)
        #[arg(long, num_args = 1..)]
        phrases: Vec<String>,
        /// Stop after this many full rotations (runs until killed if omitted)
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Print the frame sequence as JSON lines without waiting
    Trace {
        #[arg(long, num_args = 1..)]
        phrases: Vec<String>,
        /// Number of ticks to print
        #[arg(long, default_value = "20")]
        steps: usize,
    },
}

#[derive(Serialize)]
struct TraceLine {
    offset_ms: u64,
    text: String,
    mode: TypingMode,
}

impl From<Frame> for TraceLine {
    fn from(frame: Frame) -> Self {
        Self {
            offset_ms: frame.offset.as_millis() as u64,
            text: frame.text,
            mode: frame.mode,
        }
    }
}

fn build_engine(
    config: &Config,
    phrases: Vec<String>,
) -> Result<TypewriterEngine, Box<dyn std::error::Error>> {
    let settings = if phrases.is_empty() {
        config.typewriter_settings()?
    } else {
        let mut config = config.clone();
        config.typewriter.phrases = phrases;
        config.typewriter_settings()?
    };
    Ok(TypewriterEngine::new(settings)?)
}

pub fn run(action: TypewriterAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TypewriterAction::Run { phrases, cycles } => {
            let engine = build_engine(config, phrases)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(animate(engine, cycles))?;
        }
        TypewriterAction::Trace { phrases, steps } => {
            let engine = build_engine(config, phrases)?;
            for frame in Timeline::new(engine).take(steps) {
                println!("{}", serde_json::to_string(&TraceLine::from(frame))?);
            }
        }
    }
    Ok(())
}

async fn animate(
    engine: TypewriterEngine,
    cycles: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let last_phrase = engine.settings().phrases.len() - 1;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut typewriter = Typewriter::start(engine, tx);
    let mut out = std::io::stdout();
    let mut completed = 0u32;

    while let Some(event) = rx.recv().await {
        match event {
            Event::TypewriterFrame { text, .. } => {
                write!(out, "\r\x1b[2K{text}|")?;
                out.flush()?;
                if finished(cycles, completed) && text.is_empty() {
                    break;
                }
            }
            Event::TypewriterDeletionStarted { phrase_index, .. } if phrase_index == last_phrase => {
                completed += 1;
                if finished(cycles, completed) && typewriter.text().is_empty() {
                    break;
                }
            }
            _ => {}
        }
    }

    typewriter.stop();
    writeln!(out)?;
    Ok(())
}

fn finished(cycles: Option<u32>, completed: u32) -> bool {
    cycles.is_some_and(|n| completed >= n)
}
