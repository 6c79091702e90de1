//! Command implementations for the CLI
//!
//! - replay: Run a recorded request through the adapter
//! - config: Configuration display and validation

pub mod config;
pub mod replay;
