//! Library facade for the `advisor-relayer` binary.
//!
//! Re-exporting the config loader and service logic lets integration tests
//! and examples run the full profile, recommendation and reveal workflow
//! without going through the CLI entrypoint.

pub mod config;
pub mod service;
