//! Thoth CLI - command-line interface for the Transkribus-to-TEI exporter
//!
//! This crate provides the CLI application that ties together all Thoth components.

pub mod config;

pub use config::{Cli, Command};
