//! Shared E2E test helpers.

pub mod commands;
pub mod testbed;
