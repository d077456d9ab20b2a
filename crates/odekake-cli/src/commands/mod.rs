pub mod config;
pub mod deck;
pub mod events;
pub mod saved;

use odekake_core::{Config, Database, EventScorer, PersonaMode};
use tracing::warn;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the data store with the configured timestamp handling.
pub fn open_database(config: &Config) -> Result<Database, Box<dyn std::error::Error>> {
    Ok(Database::open()?.with_normalize_options(config.normalize_options()))
}

/// `--mode` wins over `deck.default_mode`. Unknown names score without a
/// persona.
pub fn resolve_mode(arg: Option<&str>, config: &Config) -> Option<PersonaMode> {
    let name = arg.unwrap_or(&config.deck.default_mode);
    let mode = PersonaMode::parse(name);
    if mode.is_none() && !name.eq_ignore_ascii_case("none") {
        warn!(mode = %name, "unknown mode, ranking without persona bonuses");
    }
    mode
}

pub fn scorer(config: &Config, seed: Option<u64>) -> EventScorer {
    let mut scoring = config.scoring.clone();
    if seed.is_some() {
        scoring.seed = seed;
    }
    EventScorer::from_config(scoring)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
