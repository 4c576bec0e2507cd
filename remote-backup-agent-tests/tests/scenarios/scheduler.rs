//! Scheduler scenarios: classification, notification and interval choice

use remote_backup_agent::managers::notification::STARTUP_MESSAGE;
use remote_backup_agent::managers::scheduler::Outcome;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use test_utils::{ConfigBuilder, CycleError, Mention, MockConnector, RemoteCall, TestContext, GIB};

#[tokio::test]
async fn test_warning_still_backs_up_and_uses_success_interval() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .with_quota(10.0, 0.8)
            .with_intervals(3600, 300)
            .with_mentions(vec![Mention::user("123")], vec![Mention::role("456")])
            .with_existing_backup("old.tar.gz", 9 * GIB),
    );

    let report = ctx.scheduler().run_cycle().await;

    assert!(matches!(report.outcome, Outcome::Success(_)));
    assert_eq!(report.next_interval, Duration::from_secs(3600));
    assert!(ctx.connector.ran("tar -czf"));
    assert!(report.message.starts_with("Successful backup! Archive: world-"));
    assert!(report.message.ends_with(
        "\n\n**WARNING**\n<@123>\nBackup folder has ratio of 0.9 of the maximum size of 10.0 GB"
    ));
    assert_eq!(ctx.notifier.messages(), vec![report.message]);
}

#[tokio::test]
async fn test_connect_failure_uses_error_interval() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_intervals(3600, 300))
        .with_connector(MockConnector::new().fail_connect("Connection timed out"));

    let report = ctx.scheduler().run_cycle().await;

    assert!(report.failed());
    assert!(matches!(report.outcome, Outcome::Error(CycleError::Connection(_))));
    assert_eq!(report.next_interval, Duration::from_secs(300));
    assert_eq!(
        report.message,
        "**ERROR**\nError while connecting to minecraft@mc.example.org: Connection timed out"
    );
    assert!(!ctx
        .connector
        .calls()
        .iter()
        .any(|c| matches!(c, RemoteCall::Command(_))));
}

#[tokio::test]
async fn test_full_quota_skips_remote_work() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .with_quota(10.0, 0.8)
            .with_existing_backup("old.tar.gz", 10 * GIB),
    );

    let report = ctx.scheduler().run_cycle().await;

    assert!(matches!(
        report.outcome,
        Outcome::Error(CycleError::QuotaExceeded(_))
    ));
    assert!(report.warning.is_none());
    assert!(ctx.connector.calls().is_empty());
    assert_eq!(
        report.message,
        "**ERROR**\nBackup directory has reached the maximum size of 10.0 GB"
    );
}

#[tokio::test]
async fn test_successful_cycle_message_and_archive() {
    let ctx = TestContext::new();

    let report = ctx.scheduler().run_cycle().await;

    let archive = match report.outcome {
        Outcome::Success(ref archive) => archive.clone(),
        ref other => panic!("Expected success, got {:?}", other),
    };
    assert_eq!(report.message, format!("Successful backup! Archive: {}", archive));
    assert_eq!(ctx.backup_files(), vec![archive]);
    assert!(report.warning.is_none());
}

fn connects(ctx: &TestContext) -> usize {
    ctx.connector.count(&RemoteCall::Connect {
        destination: "minecraft@mc.example.org".to_string(),
    })
}

#[tokio::test(start_paused = true)]
async fn test_loop_announces_once_then_sleeps_success_interval() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_intervals(3600, 300));
    let scheduler = ctx.scheduler();
    let start = Instant::now();
    let handle = tokio::spawn(async move { scheduler.run_forever().await });

    sleep_until(start + Duration::from_secs(1)).await;
    let messages = ctx.notifier.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], STARTUP_MESSAGE);
    assert!(messages[1].starts_with("Successful backup! Archive: world-"));
    assert_eq!(connects(&ctx), 1);

    sleep_until(start + Duration::from_secs(3599)).await;
    assert_eq!(connects(&ctx), 1);

    sleep_until(start + Duration::from_secs(3601)).await;
    assert_eq!(connects(&ctx), 2);

    sleep_until(start + Duration::from_secs(7201)).await;
    assert_eq!(connects(&ctx), 3);

    let messages = ctx.notifier.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(
        messages.iter().filter(|m| m.as_str() == STARTUP_MESSAGE).count(),
        1
    );

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_loop_retries_after_error_interval() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().with_intervals(3600, 300))
        .with_connector(MockConnector::new().fail_connect("Connection refused"));
    let scheduler = ctx.scheduler();
    let start = Instant::now();
    let handle = tokio::spawn(async move { scheduler.run_forever().await });

    sleep_until(start + Duration::from_secs(1)).await;
    assert_eq!(connects(&ctx), 1);

    sleep_until(start + Duration::from_secs(299)).await;
    assert_eq!(connects(&ctx), 1);

    sleep_until(start + Duration::from_secs(301)).await;
    assert_eq!(connects(&ctx), 2);

    sleep_until(start + Duration::from_secs(601)).await;
    assert_eq!(connects(&ctx), 3);

    let messages = ctx.notifier.messages();
    assert_eq!(messages[0], STARTUP_MESSAGE);
    assert_eq!(messages.len(), 4);
    assert!(messages[1..].iter().all(|m| m.starts_with("**ERROR**")));

    handle.abort();
}
