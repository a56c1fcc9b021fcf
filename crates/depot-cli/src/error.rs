//! CLI error types with exit code handling
//!
//! A unified error type for CLI operations that maps each failure to an
//! exit code. Server-side failures keep the server's own status and
//! message rather than being rephrased here.

use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration missing or unreadable
    #[error("Config error: {message}")]
    #[diagnostic(code(depot::cli::config))]
    Config { message: String },

    /// User provided invalid input
    #[error("{message}")]
    #[diagnostic(code(depot::cli::input))]
    Input { message: String },

    /// Server answered with a failure status
    #[error("Server error ({status}): {message}")]
    #[diagnostic(code(depot::cli::server))]
    Server { status: u16, message: String },

    /// Network-level failure talking to the server
    #[error("Network error: {message}")]
    #[diagnostic(code(depot::cli::network))]
    Network { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(depot::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            _ => exit_codes::ERROR,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CliError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            CliError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            CliError::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::input("bad flag").exit_code(), exit_codes::USAGE_ERROR);
        assert_eq!(CliError::config("missing").exit_code(), exit_codes::ERROR);
        let server = CliError::Server {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(server.exit_code(), exit_codes::ERROR);
    }
}
