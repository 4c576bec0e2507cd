//! Configuration module for remote-backup-agent
//!
//! Loads the agent configuration from a TOML file once at startup. The
//! resulting [`Config`] is immutable and handed by reference to every
//! component.
//!
//! ## Example Usage
//!
//! ```no_run
//! use remote_backup_agent::config;
//!
//! let config = config::load_config("config.toml")?;
//! println!("Backing up {}:{}", config.server.destination(), config.server.directory);
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{load_config, parse_config, validate_config, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
