mod config;
pub mod database;
pub mod snapshot;
mod store;

pub use config::{Config, LibraryConfig, NotificationsConfig, TimerConfig};
pub use database::Database;
pub use snapshot::{AppSnapshot, SNAPSHOT_KEY, SNAPSHOT_VERSION};
pub use store::AppStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding the database and config file.
///
/// `READTRACK_DATA_DIR` wins when set. Otherwise `~/.config/readtrack[-dev]/`,
/// with the `-dev` suffix when `READTRACK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("READTRACK_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("READTRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("readtrack-dev")
            } else {
                base_dir.join("readtrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
