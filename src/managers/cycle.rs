//! Backup cycle executor - drives one remote session from connect to cleanup
//!
//! The steps run in a fixed order and stop at the first failure:
//! connect, locate the working directory, pre-save hook, archive, post-save
//! hook, transfer. Once the working directory is confirmed, removing the
//! remote archive is always attempted before the session is closed.

use crate::config::{BackupConfig, ServerConfig};
use crate::error::CycleResult;
use crate::utils::remote::{RemoteSession, SessionConnector};
use chrono::{Local, NaiveDateTime};
use shell_escape::unix::escape;
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Archive file name for a cycle started at `now`
pub fn archive_name(prefix: &str, now: NaiveDateTime) -> String {
    format!("{}-{}.tar.gz", prefix, now.format("%Y-%m-%d_%H_%M"))
}

/// Remote shell commands for one server, with configured values quoted
struct RemoteCommands<'a> {
    server: &'a ServerConfig,
    directory: Cow<'a, str>,
}

impl<'a> RemoteCommands<'a> {
    fn new(server: &'a ServerConfig) -> Self {
        Self {
            server,
            directory: escape(server.directory.as_str().into()),
        }
    }

    fn in_directory(&self, command: &str) -> String {
        format!("cd {} && {}", self.directory, command)
    }

    fn list(&self) -> String {
        self.in_directory("ls -la")
    }

    /// Hooks are opaque shell fragments, grouped so `;` or `||` inside
    /// them cannot escape the `cd` guard
    fn hook(&self, hook: &str) -> String {
        self.in_directory(&format!("{{ {}\n}}", hook))
    }

    fn archive(&self, archive: &str) -> String {
        self.in_directory(&format!(
            "tar -czf {} {}",
            escape(archive.into()),
            escape(self.server.target.as_str().into())
        ))
    }

    fn remove(&self, archive: &str) -> String {
        self.in_directory(&format!("rm -f {}", escape(archive.into())))
    }

    fn remote_path(&self, archive: &str) -> String {
        format!("{}/{}", self.server.directory.trim_end_matches('/'), archive)
    }
}

/// Runs backup cycles against the configured server
pub struct CycleExecutor<'a, C: SessionConnector> {
    connector: &'a C,
    server: &'a ServerConfig,
    backup: &'a BackupConfig,
}

impl<'a, C: SessionConnector> CycleExecutor<'a, C> {
    pub fn new(connector: &'a C, server: &'a ServerConfig, backup: &'a BackupConfig) -> Self {
        Self {
            connector,
            server,
            backup,
        }
    }

    /// Run one cycle, naming the archive after the current local time
    pub async fn execute(&self) -> CycleResult<String> {
        self.execute_at(Local::now().naive_local()).await
    }

    /// Run one cycle with an explicit timestamp for the archive name.
    ///
    /// Returns the archive name on success. The session is closed exactly
    /// once on every path that opened it.
    pub async fn execute_at(&self, now: NaiveDateTime) -> CycleResult<String> {
        let start_time = Instant::now();
        let destination = self.server.destination();
        info!("Starting backup cycle for {}", destination);

        let mut session = self.connector.connect(self.server).await?;
        let commands = RemoteCommands::new(self.server);

        let outcome = match self.locate_directory(&mut session, &commands).await {
            Err(e) => Err(e),
            Ok(()) => {
                let archive = archive_name(&self.server.archive_prefix, now);
                let result = self.produce_and_fetch(&mut session, &commands, &archive).await;

                session.close_transfer().await;
                remove_remote_archive(&mut session, &commands, &archive).await;

                result.map(|()| archive)
            }
        };

        session.close().await;

        match &outcome {
            Ok(archive) => info!(
                "Backup cycle for {} produced {} in {:.2}s",
                destination,
                archive,
                start_time.elapsed().as_secs_f64()
            ),
            Err(e) => warn!(
                "Backup cycle for {} failed after {:.2}s: {}",
                destination,
                start_time.elapsed().as_secs_f64(),
                e
            ),
        }

        outcome
    }

    async fn locate_directory(
        &self,
        session: &mut C::Session,
        commands: &RemoteCommands<'_>,
    ) -> CycleResult<()> {
        session
            .run_command(&commands.list())
            .await?
            .check(|err| {
                format!(
                    "Could not open directory \"{}\" on {}: {}",
                    self.server.directory,
                    self.server.destination(),
                    err
                )
            })?;
        debug!("Found remote directory {}", self.server.directory);
        Ok(())
    }

    async fn produce_and_fetch(
        &self,
        session: &mut C::Session,
        commands: &RemoteCommands<'_>,
        archive: &str,
    ) -> CycleResult<()> {
        self.run_hook(session, commands, "pre-save", &self.server.pre_save_command)
            .await?;

        info!("Compressing {} into {}", self.server.target, archive);
        session
            .run_command(&commands.archive(archive))
            .await?
            .check(|err| {
                format!(
                    "Could not compress \"{}\" in {} on {}: {}",
                    self.server.target,
                    self.server.directory,
                    self.server.destination(),
                    err
                )
            })?;

        self.run_hook(session, commands, "post-save", &self.server.post_save_command)
            .await?;

        info!("Copying {} to {:?}", archive, self.backup.directory);
        session
            .fetch_file(&commands.remote_path(archive), &self.backup.directory)
            .await
    }

    async fn run_hook(
        &self,
        session: &mut C::Session,
        commands: &RemoteCommands<'_>,
        name: &str,
        hook: &str,
    ) -> CycleResult<()> {
        if hook.trim().is_empty() {
            return Ok(());
        }

        info!("Running {} command: {}", name, hook);
        session
            .run_command(&commands.hook(hook))
            .await?
            .check(|err| {
                format!(
                    "The {} command \"{}\" failed on {}: {}",
                    name,
                    hook,
                    self.server.destination(),
                    err
                )
            })?;
        Ok(())
    }
}

/// Best-effort delete of the remote archive; failures are only logged
async fn remove_remote_archive<S: RemoteSession>(
    session: &mut S,
    commands: &RemoteCommands<'_>,
    archive: &str,
) {
    match session.run_command(&commands.remove(archive)).await {
        Ok(result) if result.is_failure() => {
            warn!("Could not remove remote archive {}: {}", archive, result.stderr.trim_end())
        }
        Ok(_) => debug!("Removed remote archive {}", archive),
        Err(e) => warn!("Could not remove remote archive {}: {}", archive, e),
    }
}
