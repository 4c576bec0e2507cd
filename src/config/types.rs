use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    pub server: ServerConfig,
    pub backup: BackupConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// How often the agent runs a cycle
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Seconds to sleep after a successful cycle
    pub iteration_seconds: u64,

    /// Seconds to sleep after a failed cycle
    pub error_iteration_seconds: u64,

    /// Upper bound for any single remote command or transfer
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
}

impl ScheduleConfig {
    pub fn success_interval(&self) -> Duration {
        Duration::from_secs(self.iteration_seconds)
    }

    pub fn error_interval(&self) -> Duration {
        Duration::from_secs(self.error_iteration_seconds)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Webhook endpoint; empty means messages only go to the log
    #[serde(default)]
    pub webhook: String,

    #[serde(default)]
    pub warning_mentions: Vec<Mention>,

    #[serde(default)]
    pub error_mentions: Vec<Mention>,
}

/// A user or role to ping in a notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Mention {
    pub id: String,
    #[serde(default)]
    pub is_role: bool,
}

impl Mention {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_role: false,
        }
    }

    pub fn role(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_role: true,
        }
    }
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_role {
            write!(f, "<@&{}>", self.id)
        } else {
            write!(f, "<@{}>", self.id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// System known_hosts plus the default (or configured) identity
    HostKeys,
    /// Password fed to ssh through sshpass
    Password,
}

/// Remote host and the directory being archived
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    #[serde(default = "default_auth")]
    pub auth: AuthMode,

    #[serde(default)]
    pub password: String,

    /// Private key used in host_keys mode (ssh picks its defaults when absent)
    #[serde(default)]
    pub identity_file: Option<PathBuf>,

    /// Remote working directory, the parent of `target`
    pub directory: String,

    /// Directory inside `directory` that gets compressed
    #[serde(default = "default_target")]
    pub target: String,

    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,

    /// Runs before the archive is created
    #[serde(default)]
    pub pre_save_command: String,

    /// Runs after the archive is created
    #[serde(default)]
    pub post_save_command: String,
}

impl ServerConfig {
    /// `user@host` as passed to ssh and used in diagnostics
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Local destination and storage quota
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    pub directory: PathBuf,
    pub allowed_gigabytes: f64,
    pub warning_ratio: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Directory for rotated log files; console only when absent
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

// Default value functions

fn default_command_timeout() -> u64 { 1800 }
fn default_port() -> u16 { 22 }
fn default_auth() -> AuthMode { AuthMode::HostKeys }
fn default_target() -> String { "world".to_string() }
fn default_archive_prefix() -> String { "world".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
