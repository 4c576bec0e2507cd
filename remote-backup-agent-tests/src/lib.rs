//! Test utilities for remote-backup-agent
//!
//! This crate provides shared test utilities, re-exported mock
//! implementations and helper functions for testing the agent.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockConnector, MockNotifier};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let (config, _dir) = ConfigBuilder::new().with_pre_save("save-off").persist();
//!     let scheduler = Scheduler::new(config, MockConnector::new(), MockNotifier::new());
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::{ConfigBuilder, GIB};
pub use fixtures::*;
pub use test_context::{OptionAssertions, ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use remote_backup_agent::config::{
    AuthMode, BackupConfig, Config, LoggingSettings, Mention, NotificationConfig, ScheduleConfig,
    ServerConfig,
};
pub use remote_backup_agent::error::CycleError;
pub use remote_backup_agent::utils::command::CommandResult;

// Re-export mock implementations from the main crate
pub use remote_backup_agent::managers::notification::mock::MockNotifier;
pub use remote_backup_agent::utils::remote::mock::{MockConnector, RemoteCall};

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
