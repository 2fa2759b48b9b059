//! odps-review - SQL review and execution engine for ODPS / MaxCompute.
//!
//! This library exposes the core modules for use by the CLI and in
//! integration tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod odps;
pub mod review;
pub mod sql;
