//! Test context and harness for scheduler scenarios
//!
//! Bundles a persisted configuration with the mock connector and notifier so
//! scenario tests can run whole cycles and inspect what happened.

use crate::config_builder::ConfigBuilder;
use crate::fixtures::render_config;
use remote_backup_agent::config::Config;
use remote_backup_agent::managers::notification::mock::MockNotifier;
use remote_backup_agent::managers::scheduler::Scheduler;
use remote_backup_agent::utils::remote::mock::MockConnector;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    /// The test configuration
    config: Config,
    /// Remote side of every cycle
    pub connector: MockConnector,
    /// Everything the agent reported
    pub notifier: MockNotifier,
}

impl TestContext {
    /// Create a test context with default configuration
    pub fn new() -> Self {
        Self::from_builder(ConfigBuilder::new())
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();

        Self {
            temp_dir,
            config,
            connector: MockConnector::new(),
            notifier: MockNotifier::new(),
        }
    }

    /// Replace the mock connector (e.g. one configured to fail)
    pub fn with_connector(mut self, connector: MockConnector) -> Self {
        self.connector = connector;
        self
    }

    /// Scheduler wired to this context's mocks
    pub fn scheduler(&self) -> Scheduler<MockConnector, MockNotifier> {
        Scheduler::new(
            self.config.clone(),
            self.connector.clone(),
            self.notifier.clone(),
        )
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Local backup directory
    pub fn backup_dir(&self) -> &Path {
        &self.config.backup.directory
    }

    /// Names of the files currently in the backup directory
    pub fn backup_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.backup_dir())
            .expect("Failed to read backup dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Write a config file rendered from a fixture template
    pub fn create_config(&self, template: &str) -> PathBuf {
        self.create_file("config.toml", &render_config(template, self.backup_dir()))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}

/// Extension trait for Option assertions
pub trait OptionAssertions<T> {
    /// Assert that the option is Some and return the value
    fn assert_some(self) -> T;

    /// Assert that the option is None
    fn assert_none(self);
}

impl<T: std::fmt::Debug> OptionAssertions<T> for Option<T> {
    fn assert_some(self) -> T {
        match self {
            Some(v) => v,
            None => panic!("Expected Some, got None"),
        }
    }

    fn assert_none(self) {
        if let Some(v) = self {
            panic!("Expected None, got Some: {:?}", v);
        }
    }
}
