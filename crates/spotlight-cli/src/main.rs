use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "spotlight-cli", version, about = "Spotlight CLI")]
struct Cli {
    /// Log level for spotlight crates (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Promotional popup scheduling
    Popup {
        #[command(subcommand)]
        action: commands::popup::PopupAction,
    },
    /// Typewriter animation
    Typewriter {
        #[command(subcommand)]
        action: commands::typewriter::TypewriterAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = spotlight_core::Config::load_or_default();
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    logging::init(level);

    let result = match cli.command {
        Commands::Popup { action } => commands::popup::run(action, &config),
        Commands::Typewriter { action } => commands::typewriter::run(action, &config),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
