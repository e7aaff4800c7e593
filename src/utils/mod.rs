//! Utility modules for common functionality
//!
//! Logging and progress reporting shared by the library and the CLI.

pub mod logger;
pub mod progress;
