//! Scheduler loop - check capacity, back up, notify, sleep, forever

use crate::config::Config;
use crate::error::CycleError;
use crate::managers::cycle::CycleExecutor;
use crate::managers::notification::{compose_message, Notifier, STARTUP_MESSAGE};
use crate::utils::capacity::check_local;
use crate::utils::remote::SessionConnector;
use std::time::Duration;
use tracing::{error, info, warn};

/// How a cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(String),
    Error(CycleError),
}

/// Everything decided by one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub outcome: Outcome,
    pub warning: Option<String>,
    pub message: String,
    pub next_interval: Duration,
}

impl CycleReport {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}

pub struct Scheduler<C: SessionConnector, N: Notifier> {
    config: Config,
    connector: C,
    notifier: N,
}

impl<C: SessionConnector, N: Notifier> Scheduler<C, N> {
    pub fn new(config: Config, connector: C, notifier: N) -> Self {
        Self {
            config,
            connector,
            notifier,
        }
    }

    /// Announce startup, then run cycles until the process is killed
    pub async fn run_forever(&self) {
        self.notifier.notify(STARTUP_MESSAGE).await;

        loop {
            let report = self.run_cycle().await;
            info!("Next cycle in {:?}", report.next_interval);
            tokio::time::sleep(report.next_interval).await;
        }
    }

    /// Run a single cycle and deliver its notification, without sleeping
    pub async fn run_cycle(&self) -> CycleReport {
        let backup = &self.config.backup;
        let capacity = check_local(&backup.directory, backup.allowed_gigabytes, backup.warning_ratio);

        if let Some(ref warning) = capacity.warning {
            warn!("{}", warning);
        }

        let outcome = match capacity.error {
            Some(e) => Outcome::Error(e),
            None => {
                let executor = CycleExecutor::new(&self.connector, &self.config.server, backup);
                match executor.execute().await {
                    Ok(archive) => Outcome::Success(archive),
                    Err(e) => Outcome::Error(e),
                }
            }
        };

        let (message, next_interval) = match &outcome {
            Outcome::Success(archive) => (
                compose_message(Ok(archive), capacity.warning.as_deref(), &self.config.notifications),
                self.config.schedule.success_interval(),
            ),
            Outcome::Error(e) => {
                error!("Backup cycle failed: {}", e);
                (
                    compose_message(
                        Err(&e.to_string()),
                        capacity.warning.as_deref(),
                        &self.config.notifications,
                    ),
                    self.config.schedule.error_interval(),
                )
            }
        };

        self.notifier.notify(&message).await;

        CycleReport {
            outcome,
            warning: capacity.warning,
            message,
            next_interval,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
