//! Remote Backup Agent Library
//!
//! Periodically archives a directory on a remote host over SSH, pulls the
//! archive into local storage under a quota, and reports each cycle to a
//! webhook.

pub mod config;
pub mod error;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, Config, ConfigError, Mention};
pub use error::CycleError;
pub use managers::cycle::CycleExecutor;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::notification::{Notifier, WebhookNotifier};
pub use managers::scheduler::{CycleReport, Outcome, Scheduler};
