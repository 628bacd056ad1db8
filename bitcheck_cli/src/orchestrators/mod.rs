//! Command orchestrators
//!
//! Orchestrators sit between argument parsing and the core library: they
//! assemble concrete components from configuration and present results.

pub mod run_orchestrator;

pub use run_orchestrator::{
    OutputFormat, RunCommandOptions, RunCommandOrchestrator, exit_code_for, render_human,
};
