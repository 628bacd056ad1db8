//! Progress reporting module for the CLI
//!
//! A channel-backed provider hands the orchestrator's progress events to a
//! rendering task that draws them with indicatif.

pub mod provider;
pub mod renderer;
pub mod utils;

// Re-export main helpers
pub use provider::{ChannelProvider, create_progress_infrastructure};
pub use renderer::{ProgressRenderer, render_progress};
pub use utils::{format_duration, format_elapsed_ms};
