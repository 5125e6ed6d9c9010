//! Tracing setup for the CLI.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr subscriber so stdout stays machine-readable.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("spotlight_core={level},spotlight_cli={level}"))
    });

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
