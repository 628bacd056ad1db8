//! bitcheck command line library
//!
//! Configuration, error presentation, progress rendering and the run command
//! orchestrator behind the `bitcheck` binary.

pub mod config;
pub mod error;
pub mod orchestrators;
pub mod paths;
pub mod progress;
pub mod terminal;
