//! Backup cycle executor scenarios
//!
//! Short-circuit ordering, unconditional cleanup and single close.

use chrono::NaiveDate;
use remote_backup_agent::managers::cycle::CycleExecutor;
use rstest::rstest;
use test_utils::{
    directory_listing, missing_directory, tar_failure, CommandResult, ConfigBuilder, CycleError,
    MockConnector, RemoteCall, ResultAssertions,
};

const ARCHIVE: &str = "world-2025-01-31_23_59.tar.gz";

fn at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 31)
        .unwrap()
        .and_hms_opt(23, 59, 59)
        .unwrap()
}

#[tokio::test]
async fn test_full_cycle_issues_cleanup_and_closes_once() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let connector = MockConnector::new().respond("ls -la", directory_listing());

    let archive = CycleExecutor::new(&connector, &config.server, &config.backup)
        .execute_at(at())
        .await
        .assert_ok();

    assert_eq!(archive, ARCHIVE);
    assert!(config.backup.directory.join(ARCHIVE).exists());
    assert!(connector.ran(&format!("rm -f {}", ARCHIVE)));
    assert_eq!(connector.count(&RemoteCall::Close), 1);
}

#[tokio::test]
async fn test_connect_failure_sends_nothing() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let connector = MockConnector::new().fail_connect("No route to host");

    let result = CycleExecutor::new(&connector, &config.server, &config.backup)
        .execute_at(at())
        .await;

    result.clone().assert_err_contains("minecraft@mc.example.org");
    assert!(matches!(result, Err(CycleError::Connection(_))));
    assert!(connector.commands().is_empty());
    assert_eq!(connector.count(&RemoteCall::Close), 0);
}

#[tokio::test]
async fn test_failing_pre_hook_short_circuits() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .with_pre_save("save-off")
        .with_post_save("save-on")
        .persist();
    let connector = MockConnector::new()
        .respond("save-off", CommandResult::failed("No screen session found.\n"));

    let err = CycleExecutor::new(&connector, &config.server, &config.backup)
        .execute_at(at())
        .await
        .unwrap_err();

    assert!(matches!(err, CycleError::RemoteCommand(_)));
    let message = err.to_string();
    assert!(message.contains("pre-save"));
    assert!(message.contains("No screen session found."));

    assert!(!connector.ran("tar -czf"));
    assert!(!connector.ran("save-on"));
    assert!(!connector
        .calls()
        .iter()
        .any(|c| matches!(c, RemoteCall::Fetch { .. })));
    // Cleanup still runs once the directory was found
    assert!(connector.ran(&format!("rm -f {}", ARCHIVE)));
    assert_eq!(connector.count(&RemoteCall::Close), 1);
}

#[rstest]
#[case::archive("tar -czf", tar_failure(), "Could not compress")]
#[case::post_hook("save-on", CommandResult::failed("boom\n"), "post-save")]
#[tokio::test]
async fn test_failure_after_directory_cleans_up(
    #[case] pattern: &str,
    #[case] response: CommandResult,
    #[case] expected: &str,
) {
    let (config, _temp_dir) = ConfigBuilder::new().with_post_save("save-on").persist();
    let connector = MockConnector::new().respond(pattern, response);

    let err = CycleExecutor::new(&connector, &config.server, &config.backup)
        .execute_at(at())
        .await
        .unwrap_err();

    assert!(err.to_string().contains(expected), "got {}", err);
    assert!(!connector
        .calls()
        .iter()
        .any(|c| matches!(c, RemoteCall::Fetch { .. })));

    let calls = connector.calls();
    let tail: Vec<_> = calls.iter().rev().take(3).rev().cloned().collect();
    assert_eq!(
        tail,
        vec![
            RemoteCall::CloseTransfer,
            RemoteCall::Command(format!("cd /srv/minecraft && rm -f {}", ARCHIVE)),
            RemoteCall::Close,
        ]
    );
}

#[tokio::test]
async fn test_missing_directory_names_directory() {
    let (config, _temp_dir) = ConfigBuilder::new()
        .with_remote_directory("/srv/gone")
        .persist();
    let connector = MockConnector::new().respond("ls -la", missing_directory("/srv/gone"));

    let err = CycleExecutor::new(&connector, &config.server, &config.backup)
        .execute_at(at())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("\"/srv/gone\""));
    assert_eq!(connector.commands(), vec!["cd /srv/gone && ls -la".to_string()]);
    assert_eq!(connector.count(&RemoteCall::Close), 1);
}

#[tokio::test]
async fn test_transfer_failure_reports_local_directory() {
    let (config, _temp_dir) = ConfigBuilder::new().persist();
    let connector = MockConnector::new().fail_transfer("No space left on device");

    let err = CycleExecutor::new(&connector, &config.server, &config.backup)
        .execute_at(at())
        .await
        .unwrap_err();

    assert!(matches!(err, CycleError::Transfer(_)));
    assert!(err
        .to_string()
        .contains(&config.backup.directory.display().to_string()));
    assert!(connector.ran("rm -f"));
}
