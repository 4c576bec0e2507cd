//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use remote_backup_agent::config::{
    AuthMode, BackupConfig, Config, LoggingSettings, Mention, NotificationConfig, ScheduleConfig,
    ServerConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Bytes in one gigabyte as the quota check counts them
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    schedule: ScheduleConfig,
    notifications: NotificationConfig,
    server: ServerConfig,
    backup: BackupConfig,
    logging: LoggingSettings,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with a backup directory inside a temp dir
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let backup_directory = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_directory).expect("Failed to create backup dir");

        Self {
            temp_dir,
            schedule: ScheduleConfig {
                iteration_seconds: 3600,
                error_iteration_seconds: 300,
                command_timeout_seconds: 60,
            },
            notifications: NotificationConfig::default(),
            server: ServerConfig {
                host: "mc.example.org".to_string(),
                port: 22,
                user: "minecraft".to_string(),
                auth: AuthMode::HostKeys,
                password: String::new(),
                identity_file: None,
                directory: "/srv/minecraft".to_string(),
                target: "world".to_string(),
                archive_prefix: "world".to_string(),
                pre_save_command: String::new(),
                post_save_command: String::new(),
            },
            backup: BackupConfig {
                directory: backup_directory,
                allowed_gigabytes: 10.0,
                warning_ratio: 0.8,
            },
            logging: LoggingSettings::default(),
        }
    }

    /// Get the temp directory path (for creating additional files)
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the backup directory path
    pub fn backup_dir(&self) -> PathBuf {
        self.backup.directory.clone()
    }

    /// Set the success and error intervals
    pub fn with_intervals(mut self, success_secs: u64, error_secs: u64) -> Self {
        self.schedule.iteration_seconds = success_secs;
        self.schedule.error_iteration_seconds = error_secs;
        self
    }

    /// Set the quota and warning threshold
    pub fn with_quota(mut self, allowed_gigabytes: f64, warning_ratio: f64) -> Self {
        self.backup.allowed_gigabytes = allowed_gigabytes;
        self.backup.warning_ratio = warning_ratio;
        self
    }

    /// Set the remote working directory
    pub fn with_remote_directory(mut self, directory: &str) -> Self {
        self.server.directory = directory.to_string();
        self
    }

    /// Set the pre-save hook
    pub fn with_pre_save(mut self, command: &str) -> Self {
        self.server.pre_save_command = command.to_string();
        self
    }

    /// Set the post-save hook
    pub fn with_post_save(mut self, command: &str) -> Self {
        self.server.post_save_command = command.to_string();
        self
    }

    /// Switch to password authentication
    pub fn with_password(mut self, password: &str) -> Self {
        self.server.auth = AuthMode::Password;
        self.server.password = password.to_string();
        self
    }

    /// Set the webhook URL
    pub fn with_webhook(mut self, url: &str) -> Self {
        self.notifications.webhook = url.to_string();
        self
    }

    /// Set who gets pinged on warnings and errors
    pub fn with_mentions(mut self, warning: Vec<Mention>, error: Vec<Mention>) -> Self {
        self.notifications.warning_mentions = warning;
        self.notifications.error_mentions = error;
        self
    }

    /// Pre-fill the backup directory with a sparse file of `bytes`
    pub fn with_existing_backup(self, name: &str, bytes: u64) -> Self {
        let file = fs::File::create(self.backup.directory.join(name))
            .expect("Failed to create existing backup");
        file.set_len(bytes).expect("Failed to size existing backup");
        self
    }

    /// Build the config and keep the temp dir alive alongside it
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            schedule: self.schedule,
            notifications: self.notifications,
            server: self.server,
            backup: self.backup,
            logging: self.logging,
        };
        (config, self.temp_dir)
    }

    /// Serialize the config into a TOML file inside the temp dir
    pub fn write_toml(self) -> (PathBuf, TempDir) {
        let (config, temp_dir) = self.persist();
        let path = temp_dir.path().join("config.toml");
        let text = toml::to_string_pretty(&config).expect("Failed to serialize config");
        fs::write(&path, text).expect("Failed to write config");
        (path, temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
