mod config;
pub mod database;
mod kv;

pub use config::{CalendarConfig, Config, DataConfig, DeckConfig, LocationConfig};
pub use database::{Database, EventSource, SwipeCounts};
pub use kv::{KvStore, MemoryKv};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `ODEKAKE_DATA_DIR` wins when set; otherwise `~/.config/odekake`, or
/// `~/.config/odekake-dev` when `ODEKAKE_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ODEKAKE_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ODEKAKE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("odekake-dev")
            } else {
                base_dir.join("odekake")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
