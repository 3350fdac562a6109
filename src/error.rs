//! Error types for the command line layer.
//!
//! Engine failures arrive as [`crate::bundler::Error`] and are wrapped here
//! together with argument, manifest and output problems.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for all CLI operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Packaging engine errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Hints printed below the error message.
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            Self::Toml(_) => vec![format!(
                "Check {} against the documented [game], [paths], [build], [archive], [scripts] and [standalone] sections",
                crate::metadata::MANIFEST_FILE
            )],
            Self::Cli(CliError::MissingArgument { argument }) => {
                vec![format!("Pass {argument}")]
            }
            Self::Bundler(crate::bundler::Error::InvalidArchive(_)) => {
                vec!["The file was not written by pakforge or is truncated".to_string()]
            }
            Self::Bundler(crate::bundler::Error::Configuration(_)) => {
                vec!["Fix the project paths in the manifest and run the build again".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_message() {
        let err: BundlerError = crate::bundler::Error::DuplicateLocator("a/b.png".into()).into();
        assert!(err.to_string().contains("a/b.png"));
        assert!(err.recovery_suggestions().is_empty());
    }

    #[test]
    fn configuration_errors_suggest_a_fix() {
        let err: BundlerError =
            crate::bundler::Error::Configuration("media directory missing".into()).into();
        assert_eq!(err.recovery_suggestions().len(), 1);
    }
}
