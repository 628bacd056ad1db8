//! Configuration errors

use thiserror::Error;

/// Invalid configuration values, detected before the run starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required setting: {key}")]
    Missing { key: String },
}

impl ConfigError {
    pub fn invalid(message: &str) -> Self {
        Self::Invalid {
            message: message.to_string(),
        }
    }

    pub fn missing(key: &str) -> Self {
        Self::Missing {
            key: key.to_string(),
        }
    }
}
