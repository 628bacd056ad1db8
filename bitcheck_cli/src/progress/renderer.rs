//! Progress rendering for the CLI
//!
//! Turns run progress events into a single indicatif bar on stderr, with a
//! line printed above it for every asset that does not validate cleanly.

use bitcheck_core::progress::ProgressUpdate;
use bitcheck_core::run::{ItemStatus, RunState};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

const BAR_TEMPLATE: &str =
    "{msg}\n[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} assets | {percent}% | {prefix}";

/// Render progress updates from a channel until it closes
pub async fn render_progress(mut rx: mpsc::UnboundedReceiver<ProgressUpdate>) {
    let mut renderer = ProgressRenderer::new();

    while let Some(update) = rx.recv().await {
        renderer.handle_update(update);
    }

    renderer.finish();
}

/// Progress renderer that manages the run's progress bar
pub struct ProgressRenderer {
    bar: Option<ProgressBar>,
    current_name: String,
    valid: usize,
    failed: usize,
    finished: Option<(RunState, String)>,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            bar: None,
            current_name: String::new(),
            valid: 0,
            failed: 0,
            finished: None,
        }
    }

    /// Handle a progress update
    pub fn handle_update(&mut self, update: ProgressUpdate) {
        match update {
            ProgressUpdate::RunStarted { total } => self.start(total),

            ProgressUpdate::AssetStarted {
                index,
                total,
                identifier,
                display_name,
            } => {
                let bar = self.bar_for(total);
                bar.set_message(format!(
                    "{} [{}/{}]: {} ({})",
                    "Validating".bold(),
                    index + 1,
                    total,
                    display_name.cyan(),
                    identifier
                ));
                self.current_name = display_name;
            }

            ProgressUpdate::AssetFinished { status, .. } => self.finish_asset(&status),

            ProgressUpdate::Status { message } => self.show_status(&message),

            ProgressUpdate::RunFinished { state, headline } => {
                self.finished = Some((state, headline));
            }
        }
    }

    fn start(&mut self, total: usize) {
        self.bar = Some(new_bar(total));
    }

    fn bar_for(&mut self, total: usize) -> &ProgressBar {
        self.bar.get_or_insert_with(|| new_bar(total))
    }

    fn finish_asset(&mut self, status: &ItemStatus) {
        let line = match status {
            ItemStatus::Valid | ItemStatus::Planned => {
                self.valid += 1;
                None
            }
            ItemStatus::ValidationFailure { exit_status } => {
                self.failed += 1;
                Some(format!(
                    "{} {}: validator exited with {}",
                    "✗".yellow(),
                    self.current_name,
                    exit_status
                ))
            }
            ItemStatus::Failed { stage } => {
                self.failed += 1;
                Some(format!(
                    "{} {}: {} failed",
                    "✗".red(),
                    self.current_name,
                    stage
                ))
            }
        };

        if let Some(bar) = &self.bar {
            if let Some(line) = line {
                bar.println(line);
            }
            bar.set_prefix(format!("{} ok, {} failed", self.valid, self.failed));
            bar.inc(1);
        }
    }

    /// Show a status message
    fn show_status(&self, message: &str) {
        let line = format!("{} {}", "→".green(), message);
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    /// Closing line for the bar, following how the run ended
    pub fn final_message(&self) -> String {
        match &self.finished {
            Some((RunState::Aborted, headline)) => format!("{} {}", "✗".red(), headline),
            Some((_, headline)) => format!("{} {}", "✓".green(), headline),
            // Channel closed without a final event
            None => format!("{} Run ended", "•".yellow()),
        }
    }

    /// Finish the progress bar
    pub fn finish(self) {
        let message = self.final_message();
        if let Some(bar) = &self.bar {
            match &self.finished {
                Some((RunState::Aborted, _)) => bar.abandon_with_message(message),
                _ => bar.finish_with_message(message),
            }
        }
    }

    /// Assets that ended in a validation failure or error so far
    pub fn failed(&self) -> usize {
        self.failed
    }
}

fn new_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.set_message("Starting validation run".bold().to_string());
    bar
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}
