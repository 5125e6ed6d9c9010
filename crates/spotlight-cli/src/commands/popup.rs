use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use spotlight_core::storage::Database;
use spotlight_core::{
    Config, Event, NotificationScheduler, PopupContent, PopupPoller, PopupStatus, SystemClock,
};
use tokio::sync::mpsc;

#[derive(Subcommand)]
pub enum PopupAction {
    /// Run one check now and record it if the popup is due
    Check,
    /// Print last-shown and next-due times as JSON
    Status,
    /// Forget when the popup was last shown
    Reset,
    /// Mount the poller and print events as JSON lines
    Watch {
        /// Stop after this many seconds (runs until killed if omitted)
        #[arg(long)]
        for_secs: Option<u64>,
    },
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    event: &'a Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a PopupContent>,
}

#[derive(Serialize)]
struct StatusOutput {
    #[serde(flatten)]
    status: PopupStatus,
    last_shown_at: Option<DateTime<Utc>>,
    next_due_at: Option<DateTime<Utc>>,
}

fn to_datetime(ms: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(i64::try_from(ms).ok()?)
}

type DiskScheduler = NotificationScheduler<Database, SystemClock>;

fn scheduler(config: &Config) -> Result<DiskScheduler, Box<dyn std::error::Error>> {
    let settings = config.popup_settings()?;
    let db = Database::open()?;
    Ok(NotificationScheduler::new(db, SystemClock, settings))
}

pub fn run(action: PopupAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PopupAction::Check => {
            if !config.popup.enabled {
                eprintln!("popup disabled in config");
                return Ok(());
            }
            let mut scheduler = scheduler(config)?;
            let event = scheduler.poll();
            let output = CheckOutput {
                content: scheduler.is_visible().then(|| scheduler.content()),
                event: &event,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        PopupAction::Status => {
            let scheduler = scheduler(config)?;
            let status = scheduler.status();
            let output = StatusOutput {
                last_shown_at: status.last_shown_at_ms.and_then(to_datetime),
                next_due_at: status.next_due_at_ms.and_then(to_datetime),
                status,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        PopupAction::Reset => {
            let mut scheduler = scheduler(config)?;
            scheduler.reset()?;
            println!("popup history cleared");
        }
        PopupAction::Watch { for_secs } => {
            if !config.popup.enabled {
                eprintln!("popup disabled in config");
                return Ok(());
            }
            let scheduler = scheduler(config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(watch(scheduler, for_secs.map(Duration::from_secs)))?;
        }
    }
    Ok(())
}

async fn watch(
    scheduler: DiskScheduler,
    limit: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = PopupPoller::start(scheduler, tx);

    let deadline = limit.map(|d| tokio::time::Instant::now() + d);
    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(event) => event,
                Err(_) => break,
            },
            None => rx.recv().await,
        };
        let Some(event) = next else { break };
        println!("{}", serde_json::to_string(&event)?);
    }

    poller.stop();
    while let Ok(event) = rx.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
