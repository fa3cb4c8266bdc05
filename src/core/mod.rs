//! Core functionality module
//!
//! Configuration and error types shared by the reproducers and the CLI.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and per-case inputs
//! - `error` - Error types and result aliases

pub mod config;
pub mod error;
