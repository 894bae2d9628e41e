//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`init`] - Write the default configuration file
//! - [`exec`] - Single commands: raw command, fill, state verify and set
//! - [`clear`] - Region clear with progress and report

pub mod clear;
pub mod exec;
pub mod init;
