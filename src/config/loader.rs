use super::types::*;
use super::expand_tilde;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Glob and shell metacharacters rejected in remote path components
const UNSAFE_PATH_CHARS: &str = "*?[]{}$`\\'\";&|<>()!";

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(contents)?;
    expand_paths(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn expand_paths(config: &mut Config) {
    config.backup.directory = expand_tilde(&config.backup.directory);
    if let Some(ref identity) = config.server.identity_file {
        config.server.identity_file = Some(expand_tilde(identity));
    }
    if let Some(ref dir) = config.logging.directory {
        config.logging.directory = Some(expand_tilde(dir));
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_schedule(&config.schedule)?;
    validate_server(&config.server)?;
    validate_backup(&config.backup)?;
    Ok(())
}

fn validate_schedule(schedule: &ScheduleConfig) -> Result<()> {
    if schedule.iteration_seconds == 0 || schedule.error_iteration_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "Iteration intervals must be greater than zero".to_string(),
        ));
    }

    if schedule.command_timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "Command timeout must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<()> {
    let required = [
        ("server.host", &server.host),
        ("server.user", &server.user),
        ("server.directory", &server.directory),
        ("server.target", &server.target),
        ("server.archive_prefix", &server.archive_prefix),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} must not be empty",
                name
            )));
        }
    }

    // Both end up in the remote path handed to scp, which globs and may pass
    // it through the remote shell unquoted.
    for (name, value) in [
        ("server.directory", &server.directory),
        ("server.archive_prefix", &server.archive_prefix),
    ] {
        if let Some(c) = value
            .chars()
            .find(|c| c.is_whitespace() || UNSAFE_PATH_CHARS.contains(*c))
        {
            return Err(ConfigError::ValidationError(format!(
                "{} must not contain {:?}, got {:?}",
                name, c, value
            )));
        }
    }

    if server.auth == AuthMode::Password && server.password.is_empty() {
        return Err(ConfigError::ValidationError(
            "server.password is required when auth = \"password\"".to_string(),
        ));
    }

    Ok(())
}

fn validate_backup(backup: &BackupConfig) -> Result<()> {
    if !(backup.allowed_gigabytes > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "backup.allowed_gigabytes must be greater than zero, got {}",
            backup.allowed_gigabytes
        )));
    }

    if !(backup.warning_ratio > 0.0 && backup.warning_ratio < 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "backup.warning_ratio must be between 0 and 1 (exclusive), got {}",
            backup.warning_ratio
        )));
    }

    if !backup.directory.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "Backup directory does not exist: {:?}",
            backup.directory
        )));
    }

    Ok(())
}
