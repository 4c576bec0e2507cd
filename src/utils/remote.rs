//! Remote session abstraction over SSH
//!
//! A session is one authenticated connection to the backup source. The
//! OpenSSH implementation keeps a multiplexing master alive for the lifetime
//! of the session so every command and the file transfer reuse the same
//! authenticated transport. The `mock` module records every call for tests.

#![allow(async_fn_in_trait)]

use super::command::{run_command, CommandResult};
use crate::config::{AuthMode, ServerConfig};
use crate::error::{CycleError, CycleResult};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Opens sessions to the configured server
pub trait SessionConnector {
    type Session: RemoteSession;

    /// Establish and authenticate a new session.
    ///
    /// On failure nothing is left open; the error names `user@host`.
    async fn connect(&self, server: &ServerConfig) -> CycleResult<Self::Session>;
}

/// One live, authenticated connection
pub trait RemoteSession {
    /// Run a shell command remotely and capture both streams
    async fn run_command(&mut self, command: &str) -> CycleResult<CommandResult>;

    /// Copy one remote file into a local directory
    async fn fetch_file(&mut self, remote_path: &str, local_dir: &Path) -> CycleResult<()>;

    /// Tear down a file transfer that is still running. No-op otherwise.
    async fn close_transfer(&mut self);

    /// Release the transport. Safe to call more than once.
    async fn close(&mut self);
}

/// Connector backed by the OpenSSH client binaries
#[derive(Debug, Clone)]
pub struct OpenSshConnector {
    timeout: Duration,
}

impl OpenSshConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Warn about missing client binaries before the first cycle runs
    pub fn check_binaries(auth: AuthMode) {
        let mut required = vec!["ssh", "scp"];
        if auth == AuthMode::Password {
            required.push("sshpass");
        }

        for binary in required {
            if which::which(binary).is_err() {
                warn!("'{}' not found in PATH; backup cycles will fail", binary);
            }
        }
    }

    fn master_command(&self, server: &ServerConfig, control_path: &Path) -> Command {
        let mut args = ssh_options(server.port, control_path);
        args.extend(
            [
                "-M",
                "-N",
                "-f",
                "-o",
                "ControlPersist=yes",
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-o",
                "ServerAliveInterval=30",
            ]
            .map(String::from),
        );
        args.push("-o".to_string());
        args.push(format!("ConnectTimeout={}", self.timeout.as_secs().max(1)));

        let mut cmd = match server.auth {
            AuthMode::HostKeys => {
                args.extend(["-o", "BatchMode=yes"].map(String::from));
                if let Some(ref identity) = server.identity_file {
                    args.push("-i".to_string());
                    args.push(identity.display().to_string());
                }
                Command::new("ssh")
            }
            AuthMode::Password => {
                args.extend(
                    [
                        "-o",
                        "PubkeyAuthentication=no",
                        "-o",
                        "PreferredAuthentications=password,keyboard-interactive",
                        "-o",
                        "NumberOfPasswordPrompts=1",
                    ]
                    .map(String::from),
                );
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg("ssh").env("SSHPASS", &server.password);
                cmd
            }
        };

        args.push(server.destination());
        cmd.args(args);
        cmd
    }
}

impl SessionConnector for OpenSshConnector {
    type Session = OpenSshSession;

    async fn connect(&self, server: &ServerConfig) -> CycleResult<OpenSshSession> {
        let destination = server.destination();
        let connect_error =
            |reason: String| CycleError::Connection(format!("Error while connecting to {}: {}", destination, reason));

        let control_dir = tempfile::Builder::new()
            .prefix("rba-ssh-")
            .tempdir()
            .map_err(|e| connect_error(format!("could not create control directory: {}", e)))?;
        let control_path = control_dir.path().join("ctl");

        // The master backgrounds itself after authenticating and keeps any
        // inherited pipe open, so its stderr goes to a file instead.
        let log_path = control_dir.path().join("connect.log");
        let log_file = File::create(&log_path)
            .map_err(|e| connect_error(format!("could not create connect log: {}", e)))?;

        let mut cmd = self.master_command(server, &control_path);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log_file))
            .kill_on_drop(true);

        debug!("Opening SSH master connection to {}", destination);

        let status = tokio::time::timeout(self.timeout, cmd.status())
            .await
            .map_err(|_| connect_error(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| connect_error(format!("could not start ssh: {}", e)))?;

        if !status.success() {
            let reason = std::fs::read_to_string(&log_path).unwrap_or_default();
            let reason = reason.trim();
            return Err(connect_error(if reason.is_empty() {
                format!("ssh exited with {}", status)
            } else {
                reason.to_string()
            }));
        }

        info!("Connected to {}", destination);

        Ok(OpenSshSession {
            destination,
            port: server.port,
            timeout: self.timeout,
            control_path,
            _control_dir: control_dir,
            transfer: None,
            closed: false,
        })
    }
}

/// Session multiplexed over an OpenSSH control socket
pub struct OpenSshSession {
    destination: String,
    port: u16,
    timeout: Duration,
    control_path: PathBuf,
    _control_dir: TempDir,
    transfer: Option<Child>,
    closed: bool,
}

impl OpenSshSession {
    fn exit_args(&self) -> Vec<String> {
        let mut args = ssh_options(self.port, &self.control_path);
        args.extend(["-O".to_string(), "exit".to_string(), self.destination.clone()]);
        args
    }

    fn spawn_exit(&self) -> std::io::Result<()> {
        if tokio::runtime::Handle::try_current().is_ok() {
            // The runtime reaps the detached child
            Command::new("ssh")
                .args(self.exit_args())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(false)
                .spawn()
                .map(drop)
        } else {
            std::process::Command::new("ssh")
                .args(self.exit_args())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map(drop)
        }
    }
}

impl RemoteSession for OpenSshSession {
    async fn run_command(&mut self, command: &str) -> CycleResult<CommandResult> {
        let mut args = ssh_options(self.port, &self.control_path);
        args.extend(["-o", "BatchMode=yes"].map(String::from));
        args.push(self.destination.clone());
        args.push("--".to_string());
        args.push(command.to_string());

        let mut cmd = Command::new("ssh");
        cmd.args(args);

        let label = format!("ssh {} -- {}", self.destination, command);
        let output = run_command(cmd, &label, self.timeout)
            .await
            .map_err(|e| CycleError::RemoteCommand(format!("{:#}", e)))?;

        Ok(CommandResult::from_output(&output))
    }

    async fn fetch_file(&mut self, remote_path: &str, local_dir: &Path) -> CycleResult<()> {
        let destination = self.destination.clone();
        let transfer_error = |reason: String| {
            CycleError::Transfer(format!(
                "Could not copy {}:{} to the local directory {}: {}",
                destination,
                remote_path,
                local_dir.display(),
                reason
            ))
        };

        let mut cmd = Command::new("scp");
        cmd.args([
            "-q".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path.display()),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-P".to_string(),
            self.port.to_string(),
        ]);
        cmd.arg(format!("{}:{}", destination, remote_path));
        cmd.arg(local_dir);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Fetching {}:{} into {:?}", destination, remote_path, local_dir);

        let mut child = cmd
            .spawn()
            .map_err(|e| transfer_error(format!("could not start scp: {}", e)))?;
        let mut stderr_pipe = child.stderr.take();

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(transfer_error(e.to_string())),
            Err(_) => {
                let reason = format!("timed out after {:?}", self.timeout);
                self.transfer = Some(child);
                return Err(transfer_error(reason));
            }
        };

        if !status.success() {
            let mut stderr = String::new();
            if let Some(ref mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            let stderr = stderr.trim();
            return Err(transfer_error(if stderr.is_empty() {
                format!("scp exited with {}", status)
            } else {
                stderr.to_string()
            }));
        }

        Ok(())
    }

    async fn close_transfer(&mut self) {
        if let Some(mut child) = self.transfer.take() {
            debug!("Killing unfinished transfer from {}", self.destination);
            if let Err(e) = child.kill().await {
                warn!("Failed to stop transfer from {}: {}", self.destination, e);
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut cmd = Command::new("ssh");
        cmd.args(self.exit_args());
        match run_command(cmd, "ssh -O exit", self.timeout).await {
            Ok(_) => debug!("Closed connection to {}", self.destination),
            Err(e) => warn!("Failed to close connection to {}: {:#}", self.destination, e),
        }
    }
}

impl Drop for OpenSshSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        // Reached only if the owning future was dropped before `close` ran.
        // Fire and forget: a runtime worker must not wait on ssh here.
        if let Err(e) = self.spawn_exit() {
            debug!("Could not signal master for {} to exit: {}", self.destination, e);
        }
    }
}

fn ssh_options(port: u16, control_path: &Path) -> Vec<String> {
    vec![
        "-o".to_string(),
        format!("ControlPath={}", control_path.display()),
        "-o".to_string(),
        "LogLevel=ERROR".to_string(),
        "-p".to_string(),
        port.to_string(),
    ]
}

/// Recording connector for tests
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recorded session interaction
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RemoteCall {
        Connect { destination: String },
        Command(String),
        Fetch { remote_path: String, local_dir: PathBuf },
        CloseTransfer,
        Close,
    }

    #[derive(Default)]
    struct MockState {
        calls: Vec<RemoteCall>,
        responses: Vec<(String, CommandResult)>,
        connect_error: Option<String>,
        transfer_error: Option<String>,
    }

    /// Mock connector; every session it hands out shares the same recording
    #[derive(Clone, Default)]
    pub struct MockConnector {
        state: Arc<Mutex<MockState>>,
    }

    impl MockConnector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `connect` fail with the given reason
        pub fn fail_connect(self, reason: &str) -> Self {
            self.state.lock().unwrap().connect_error = Some(reason.to_string());
            self
        }

        /// Reply with `result` to the first command containing `pattern`
        pub fn respond(self, pattern: &str, result: CommandResult) -> Self {
            self.state
                .lock()
                .unwrap()
                .responses
                .push((pattern.to_string(), result));
            self
        }

        /// Make `fetch_file` fail with the given reason
        pub fn fail_transfer(self, reason: &str) -> Self {
            self.state.lock().unwrap().transfer_error = Some(reason.to_string());
            self
        }

        /// Get all recorded calls
        pub fn calls(&self) -> Vec<RemoteCall> {
            self.state.lock().unwrap().calls.clone()
        }

        /// Commands issued, in order
        pub fn commands(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    RemoteCall::Command(command) => Some(command),
                    _ => None,
                })
                .collect()
        }

        /// Check if any command contained `needle`
        pub fn ran(&self, needle: &str) -> bool {
            self.commands().iter().any(|c| c.contains(needle))
        }

        /// Number of recorded calls equal to `call`
        pub fn count(&self, call: &RemoteCall) -> usize {
            self.calls().iter().filter(|c| *c == call).count()
        }

        fn record(&self, call: RemoteCall) {
            self.state.lock().unwrap().calls.push(call);
        }
    }

    impl SessionConnector for MockConnector {
        type Session = MockSession;

        async fn connect(&self, server: &ServerConfig) -> CycleResult<MockSession> {
            let destination = server.destination();
            self.record(RemoteCall::Connect {
                destination: destination.clone(),
            });

            if let Some(reason) = self.state.lock().unwrap().connect_error.clone() {
                return Err(CycleError::Connection(format!(
                    "Error while connecting to {}: {}",
                    destination, reason
                )));
            }

            Ok(MockSession {
                connector: self.clone(),
            })
        }
    }

    /// Session handed out by [`MockConnector`]
    pub struct MockSession {
        connector: MockConnector,
    }

    impl RemoteSession for MockSession {
        async fn run_command(&mut self, command: &str) -> CycleResult<CommandResult> {
            self.connector.record(RemoteCall::Command(command.to_string()));
            let state = self.connector.state.lock().unwrap();
            Ok(state
                .responses
                .iter()
                .find(|(pattern, _)| command.contains(pattern.as_str()))
                .map(|(_, result)| result.clone())
                .unwrap_or_default())
        }

        async fn fetch_file(&mut self, remote_path: &str, local_dir: &Path) -> CycleResult<()> {
            self.connector.record(RemoteCall::Fetch {
                remote_path: remote_path.to_string(),
                local_dir: local_dir.to_path_buf(),
            });

            if let Some(reason) = self.connector.state.lock().unwrap().transfer_error.clone() {
                return Err(CycleError::Transfer(format!(
                    "Could not copy {} to the local directory {}: {}",
                    remote_path,
                    local_dir.display(),
                    reason
                )));
            }

            let name = Path::new(remote_path)
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            std::fs::write(local_dir.join(name), b"archive")
                .map_err(|e| CycleError::Transfer(e.to_string()))
        }

        async fn close_transfer(&mut self) {
            self.connector.record(RemoteCall::CloseTransfer);
        }

        async fn close(&mut self) {
            self.connector.record(RemoteCall::Close);
        }
    }
}
