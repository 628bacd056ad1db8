//! External validator invocation
//!
//! The validator is a black box: it takes an optional module flag, an output
//! path and an input path, writes its report to the output path and exits.
//! A non-zero exit is data, not an error. Only failing to start the process
//! at all is fatal.

use crate::config::ValidatorConfig;
use crate::error::{Error, IoError, LaunchError};
use crate::format::ValidationProfile;
use crate::Result;
use async_trait::async_trait;
use log::{debug, trace, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Flag that points the validator at its report destination
pub const OUTPUT_FLAG: &str = "-o";

/// Exit status recorded when the process was ended by a signal
pub const SIGNALLED_EXIT: i32 = -1;

/// What one validator invocation left behind, besides the report file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRun {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

impl ValidatorRun {
    pub fn succeeded(&self) -> bool {
        self.exit_status == 0
    }
}

/// Runs the validator for one asset
#[async_trait]
pub trait Validator: Send + Sync {
    /// Validate `input`, leaving the report at `output`
    ///
    /// Returns [`Error::Launch`] only when the validator cannot be started.
    async fn validate(
        &self,
        profile: &ValidationProfile,
        output: &Path,
        input: &Path,
    ) -> Result<ValidatorRun>;

    /// The command line `validate` would run, for display
    fn command_line(&self, profile: &ValidationProfile, output: &Path, input: &Path) -> String;
}

/// Runs the validator as a child process
#[derive(Debug, Clone)]
pub struct ProcessValidator {
    executable: PathBuf,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessValidator {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            extra_args: Vec::new(),
            timeout: None,
        }
    }

    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            extra_args: config.extra_args.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments in invocation order: extra args, mode flag, output, input
    pub fn build_args(
        &self,
        profile: &ValidationProfile,
        output: &Path,
        input: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.extra_args.iter().map(OsString::from).collect();
        args.extend(profile.tool_args.iter().map(OsString::from));
        args.push(OsString::from(OUTPUT_FLAG));
        args.push(output.as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl Validator for ProcessValidator {
    async fn validate(
        &self,
        profile: &ValidationProfile,
        output: &Path,
        input: &Path,
    ) -> Result<ValidatorRun> {
        let args = self.build_args(profile, output, input);
        debug!("Running {} {:?}", self.executable.display(), args);

        let mut command = Command::new(&self.executable);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a terminal Ctrl-C reaches only bitcheck, which
        // lets the asset in flight finish before stopping.
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| LaunchError::new(&self.executable, e))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let finished = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "Validator exceeded {}s on {}, killed",
                        limit.as_secs(),
                        input.display()
                    );
                    return Err(Error::timeout(input, limit));
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::Io(IoError::from_std(e).with_path(input)))?;

        let run = ValidatorRun {
            stdout: String::from_utf8_lossy(&finished.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&finished.stderr).into_owned(),
            exit_status: finished.status.code().unwrap_or(SIGNALLED_EXIT),
        };
        trace!("Validator stdout: {}", run.stdout.trim_end());
        debug!("Validator exited with {}", run.exit_status);
        Ok(run)
    }

    fn command_line(&self, profile: &ValidationProfile, output: &Path, input: &Path) -> String {
        let mut parts = vec![self.executable.display().to_string()];
        parts.extend(
            self.build_args(profile, output, input)
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}
