//! Unit tests for configuration loading and validation

use remote_backup_agent::config::{load_config, AuthMode, ConfigError, Mention};
use test_utils::{full_config_toml, minimal_config_toml, ConfigBuilder, TestContext};

#[test]
fn test_config_loading_minimal() {
    let ctx = TestContext::new();
    let path = ctx.create_config(minimal_config_toml());

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.destination(), "minecraft@mc.example.org");
    assert_eq!(config.server.auth, AuthMode::HostKeys);
    assert_eq!(config.schedule.success_interval().as_secs(), 3600);
    assert_eq!(config.schedule.error_interval().as_secs(), 300);
}

#[test]
fn test_config_loading_full() {
    let ctx = TestContext::new();
    let path = ctx.create_config(full_config_toml());

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.port, 2222);
    assert_eq!(config.server.auth, AuthMode::Password);
    assert_eq!(config.server.target, "world_nether");
    assert_eq!(config.server.archive_prefix, "nether");
    assert_eq!(config.schedule.command_timeout().as_secs(), 900);
    assert_eq!(config.notifications.warning_mentions, vec![Mention::user("123")]);
    assert_eq!(
        config.notifications.error_mentions,
        vec![Mention::role("456"), Mention::user("789")]
    );
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.directory.is_none());
}

#[test]
fn test_config_missing_file() {
    let ctx = TestContext::new();
    let result = load_config(ctx.temp_dir().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::ReadError(_))));
}

#[test]
fn test_config_missing_required_section() {
    let ctx = TestContext::new();
    let path = ctx.create_file(
        "config.toml",
        "[schedule]\niteration_seconds = 1\nerror_iteration_seconds = 1\n",
    );
    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_config_round_trips_through_builder() {
    let (path, _temp_dir) = ConfigBuilder::new()
        .with_password("secret")
        .with_post_save("save-on")
        .with_intervals(7200, 120)
        .write_toml();

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.auth, AuthMode::Password);
    assert_eq!(config.server.post_save_command, "save-on");
    assert_eq!(config.schedule.iteration_seconds, 7200);
    assert_eq!(config.schedule.error_iteration_seconds, 120);
}

#[test]
fn test_config_zero_interval_rejected() {
    let (path, _temp_dir) = ConfigBuilder::new().with_intervals(0, 120).write_toml();
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("greater than zero"));
}
