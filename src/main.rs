mod clients;
mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::ping::PingOptions;
use config::Config;

#[derive(Parser)]
#[command(name = "runclub-cli")]
#[command(about = "Correlate calendar runs with RSVPs and message the people involved")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find upcoming runs, correlate them across sources, message attendees
    Ping {
        /// Log every would-be message instead of sending
        #[arg(long)]
        dry_run: bool,

        /// Also send organizer assignment nudges with re-engagement lists
        #[arg(long)]
        include_nudges: bool,

        /// Walk upcoming RSVP events and match each back to a calendar run
        #[arg(long)]
        rsvp_first: bool,

        /// Override the reference time, e.g. "2024-12-02,19:30" (Eastern)
        #[arg(long)]
        simulate_time: Option<String>,
    },
    /// Exercise every external collaborator and report
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Ping {
            dry_run,
            include_nudges,
            rsvp_first,
            simulate_time,
        } => {
            let options = PingOptions {
                dry_run,
                include_nudges,
                rsvp_first,
                simulate_time,
            };
            commands::ping::run(&config, &options).await
        }
        Commands::Check => commands::check::run(&config).await,
    }
}
