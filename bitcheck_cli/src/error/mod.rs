use bitcheck_core::AbortReason;
use colored::*;
use std::error::Error as StdError;
use std::fmt;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Store,
    Launch,
    Interrupted,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    StoreError = 3,
    LaunchError = 4,
    Interrupted = 130,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
    fn with_source(self, source: Box<dyn StdError + Send + Sync>) -> Self;
}

impl CliError {
    fn new(message: &str, category: ErrorCategory) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(message, ErrorCategory::General)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        Self::new(message, ErrorCategory::Misuse)
            .with_suggestion("Run 'bitcheck --help' for usage information")
    }

    /// Create a metadata store error
    pub fn store(message: &str) -> Self {
        Self::new(message, ErrorCategory::Store)
            .with_suggestion("Check store.url and that the database accepts connections")
            .with_suggestion("Verify store.collection_id names an existing collection")
    }

    /// Create a validator launch error
    pub fn launch(message: &str) -> Self {
        Self::new(message, ErrorCategory::Launch)
            .with_suggestion("Check that validator.executable points at an installed validator")
    }

    /// The run was stopped by the operator
    pub fn interrupted(message: &str) -> Self {
        Self::new(message, ErrorCategory::Interrupted)
    }

    /// Classify a core library error
    pub fn from_core(error: bitcheck_core::Error) -> Self {
        let message = error.to_string();
        let cli_error = match &error {
            bitcheck_core::Error::Query(_) => Self::store(&message),
            bitcheck_core::Error::Launch(_) => Self::launch(&message),
            bitcheck_core::Error::Config(_) => Self::misuse(&message)
                .with_suggestion("Run 'bitcheck config list' to inspect the effective settings"),
            _ => Self::general(&message),
        };
        cli_error.with_source(Box::new(error))
    }

    /// Turn an aborted run into the error that explains it
    pub fn from_abort(reason: &AbortReason) -> Self {
        let message = format!("Run aborted: {reason}");
        match reason {
            AbortReason::RecordSource(_) | AbortReason::Store(_) => Self::store(&message),
            AbortReason::Launch(_) => Self::launch(&message),
            AbortReason::OutputDir(_) => Self::general(&message)
                .with_suggestion("Check storage.output_dir is a writable directory"),
            AbortReason::Interrupted => Self::interrupted(&message),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Store => ExitCode::StoreError,
            ErrorCategory::Launch => ExitCode::LaunchError,
            ErrorCategory::Interrupted => ExitCode::Interrupted,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Store => "Store Error",
            ErrorCategory::Launch => "Validator Error",
            ErrorCategory::Interrupted => "Interrupted",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse | ErrorCategory::Interrupted => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

/// Convert anyhow errors to CLI errors
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        // Keep the whole context chain on one line
        Self::general(&format!("{error:#}"))
    }
}
