//! Unit tests for the local quota check

use remote_backup_agent::utils::capacity::{check_local, directory_size, evaluate};
use rstest::rstest;
use std::fs;
use test_utils::{ConfigBuilder, CycleError, OptionAssertions, GIB};

#[rstest]
#[case::empty(0.0, None, false)]
#[case::at_threshold(8.0, None, false)]
#[case::above_threshold(9.0, Some("0.9"), false)]
#[case::at_quota(10.0, None, true)]
#[case::over_quota(11.5, None, true)]
fn test_quota_classification(
    #[case] gigabytes: f64,
    #[case] ratio_text: Option<&str>,
    #[case] expect_error: bool,
) {
    let size = (gigabytes * GIB as f64) as u64;
    let report = evaluate(size, 10.0, 0.8);

    assert_eq!(report.error.is_some(), expect_error);
    match ratio_text {
        Some(ratio) => {
            let warning = report.warning.assert_some();
            assert!(warning.contains(ratio), "warning was {}", warning);
            assert!(warning.contains("10.0 GB"));
        }
        None => report.warning.assert_none(),
    }
}

#[test]
fn test_fractional_quota_in_message() {
    let report = evaluate(GIB, 1.5, 0.5);
    assert_eq!(
        report.warning.as_deref(),
        Some("Backup folder has ratio of 0.667 of the maximum size of 1.5 GB")
    );
}

#[test]
fn test_check_local_counts_existing_backups() {
    let builder = ConfigBuilder::new()
        .with_existing_backup("world-2024-03-08_07_05.tar.gz", 4 * GIB)
        .with_existing_backup("world-2024-03-09_07_05.tar.gz", 5 * GIB);
    let backup_dir = builder.backup_dir();
    let (_config, _temp_dir) = builder.persist();

    assert_eq!(directory_size(&backup_dir).unwrap(), 9 * GIB);
    let report = check_local(&backup_dir, 10.0, 0.8);
    assert!(report.error.is_none());
    assert!(report.warning.is_some());
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_reported() {
    use std::os::unix::fs::PermissionsExt;

    let builder = ConfigBuilder::new();
    let backup_dir = builder.backup_dir();
    let (_config, _temp_dir) = builder.persist();

    let locked = backup_dir.join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let report = check_local(&backup_dir, 10.0, 0.8);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    // root ignores directory permissions
    if let Some(error) = report.error {
        assert!(matches!(error, CycleError::LocalIo(_)));
        assert!(error.to_string().starts_with("Could not read backup directory"));
    }
}
