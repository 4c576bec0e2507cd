//! Scenario tests for full backup cycles
//!
//! These run the cycle executor and scheduler against the recording mock
//! connector, so every remote interaction can be checked in order.

mod cycle;
mod scheduler;
