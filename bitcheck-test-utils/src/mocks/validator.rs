//! Scripted validator double
//!
//! Behaviour is chosen per asset by the last component of the input path,
//! which is the asset identifier after location resolution.

use async_trait::async_trait;
use bitcheck_core::dispatcher::OUTPUT_FLAG;
use bitcheck_core::error::LaunchError;
use bitcheck_core::{Error, Result, ValidationProfile, Validator, ValidatorRun};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Report written when no behaviour is configured
pub const DEFAULT_REPORT: &str = "Status: Well-Formed and valid\n";

/// What the validator does for one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorBehavior {
    /// Write `content` to the output path and exit with `exit_status`
    Report {
        content: String,
        exit_status: i32,
        stderr: String,
    },
    /// Exit without writing anything
    NoReport { exit_status: i32, stderr: String },
    /// The executable cannot be started
    LaunchFailure,
    /// The invocation runs past its limit
    Timeout,
}

impl Default for ValidatorBehavior {
    fn default() -> Self {
        ValidatorBehavior::Report {
            content: DEFAULT_REPORT.to_string(),
            exit_status: 0,
            stderr: String::new(),
        }
    }
}

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorCall {
    pub profile: ValidationProfile,
    pub output: PathBuf,
    pub input: PathBuf,
}

/// Validator double that writes reports in-process
#[derive(Debug, Clone, Default)]
pub struct MockValidator {
    behaviors: HashMap<String, ValidatorBehavior>,
    fallback: ValidatorBehavior,
    calls: Arc<Mutex<Vec<ValidatorCall>>>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `behavior` for the asset `identifier`
    pub fn on(mut self, identifier: &str, behavior: ValidatorBehavior) -> Self {
        self.behaviors.insert(identifier.to_string(), behavior);
        self
    }

    /// Use `behavior` for every asset without its own
    pub fn otherwise(mut self, behavior: ValidatorBehavior) -> Self {
        self.fallback = behavior;
        self
    }

    /// Set `flag` once `count` invocations have finished
    pub fn cancel_after(mut self, count: usize, flag: Arc<AtomicBool>) -> Self {
        self.cancel_after = Some((count, flag));
        self
    }

    /// Invocations so far, in order
    pub fn calls(&self) -> Vec<ValidatorCall> {
        self.calls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn behavior_for(&self, input: &Path) -> &ValidatorBehavior {
        input
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.behaviors.get(name))
            .unwrap_or(&self.fallback)
    }

    fn record(&self, call: ValidatorCall) {
        let count = match self.calls.lock() {
            Ok(mut guard) => {
                guard.push(call);
                guard.len()
            }
            Err(_) => return,
        };
        if let Some((after, flag)) = &self.cancel_after
            && count >= *after
        {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Validator for MockValidator {
    async fn validate(
        &self,
        profile: &ValidationProfile,
        output: &Path,
        input: &Path,
    ) -> Result<ValidatorRun> {
        let behavior = self.behavior_for(input).clone();
        self.record(ValidatorCall {
            profile: profile.clone(),
            output: output.to_path_buf(),
            input: input.to_path_buf(),
        });

        match behavior {
            ValidatorBehavior::Report {
                content,
                exit_status,
                stderr,
            } => {
                std::fs::write(output, content)?;
                Ok(ValidatorRun {
                    stdout: String::new(),
                    stderr,
                    exit_status,
                })
            }
            ValidatorBehavior::NoReport {
                exit_status,
                stderr,
            } => Ok(ValidatorRun {
                stdout: String::new(),
                stderr,
                exit_status,
            }),
            ValidatorBehavior::LaunchFailure => Err(LaunchError::new(
                Path::new("mock-validator"),
                io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            )
            .into()),
            ValidatorBehavior::Timeout => Err(Error::timeout(input, Duration::from_secs(1))),
        }
    }

    fn command_line(&self, profile: &ValidationProfile, output: &Path, input: &Path) -> String {
        let mut parts = vec!["mock-validator".to_string()];
        parts.extend(profile.tool_args.iter().cloned());
        parts.push(OUTPUT_FLAG.to_string());
        parts.push(output.display().to_string());
        parts.push(input.display().to_string());
        parts.join(" ")
    }
}
