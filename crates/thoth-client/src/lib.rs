//! Thoth Client - adapters for the exporter's external collaborators
//!
//! This crate provides the two production implementations behind the
//! capability traits of `thoth-core`:
//!
//! - [`transkribus`] - HTTP client for the Transkribus REST API
//! - [`saxon`] - external Saxon process driving the PAGE-to-TEI conversion
//!
//! # Overview
//!
//! The clients handle authentication, request building, response parsing,
//! and error handling; the pipeline itself never touches HTTP or processes.

pub mod saxon;
pub mod transkribus;

// Re-export main client types
pub use saxon::SaxonTransformer;
pub use transkribus::TranskribusClient;
