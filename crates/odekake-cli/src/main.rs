use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "odekake", version, about = "Odekake event discovery CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Event catalog: seed, list, rank, show
    Events {
        #[command(subcommand)]
        action: commands::events::EventsAction,
    },
    /// Swipe through the ranked deck on stdin
    Deck {
        /// Persona mode (housewife, worker, student, tourist); defaults to config
        #[arg(long)]
        mode: Option<String>,
        /// Fix the serendipity draw
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Saved events
    Saved {
        #[command(subcommand)]
        action: commands::saved::SavedAction,
    },
    /// Events related to an event
    Recommend {
        /// Event id
        id: String,
    },
    /// Great-circle distance in km between two points
    Distance {
        #[arg(allow_hyphen_values = true)]
        lat1: f64,
        #[arg(allow_hyphen_values = true)]
        lon1: f64,
        #[arg(allow_hyphen_values = true)]
        lat2: f64,
        #[arg(allow_hyphen_values = true)]
        lon2: f64,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Events { action } => commands::events::run(action),
        Commands::Deck { mode, seed } => commands::deck::run(mode, seed),
        Commands::Saved { action } => commands::saved::run(action),
        Commands::Recommend { id } => commands::events::recommend(&id),
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => {
            println!("{:.1}", odekake_core::distance_km(lat1, lon1, lat2, lon2));
            Ok(())
        }
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
