//! File-based locking so only one agent writes into a backup directory

use anyhow::{Context, Result};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LOCK_FILE_NAME: &str = ".remote-backup-agent.lock";

/// Exclusive lock on a backup directory, held for the life of the agent
pub struct AgentLock {
    _guard: RwLockWriteGuard<'static, File>,
    lock_path: PathBuf,
}

impl AgentLock {
    /// Acquire the lock for `backup_dir`.
    /// Returns error if another agent already holds it.
    pub fn acquire(backup_dir: &Path) -> Result<Self> {
        let lock_path = backup_dir.join(LOCK_FILE_NAME);

        debug!("Attempting to acquire lock: {:?}", lock_path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .context(format!("Failed to open lock file: {:?}", lock_path))?;

        // The agent holds this lock until exit, so the lock object itself is
        // leaked to give the guard a 'static borrow.
        let lock: &'static mut RwLock<File> = Box::leak(Box::new(RwLock::new(file)));
        let guard = lock.try_write().context(format!(
            "Backup directory {:?} is already in use by another agent (lock held)",
            backup_dir
        ))?;

        info!("Acquired agent lock: {:?}", lock_path);

        Ok(Self {
            _guard: guard,
            lock_path,
        })
    }

    /// Get the lock file path
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for AgentLock {
    fn drop(&mut self) {
        info!("Released agent lock: {:?}", self.lock_path);

        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            debug!("Failed to remove lock file: {}", e);
        }
    }
}
