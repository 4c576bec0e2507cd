//! Unit tests for remote-backup-agent
//!
//! Configuration loading, quota evaluation and message construction.

mod capacity;
mod config;
