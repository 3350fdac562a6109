//! Error types for packaging operations.
//!
//! Script diagnostics are not errors at this level: the compilation adapter
//! returns them as data and the packaging driver decides per file. Everything
//! in [`Error`] aborts the running build.

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error as DeriveError;

/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a build.
#[derive(DeriveError, Debug)]
pub enum Error {
    /// Invalid or inaccessible configuration, detected before any work starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A source file, engine binary or output could not be read or written.
    #[error("{context} `{}`: {source}", path.display())]
    ResourceIo {
        /// What was being done when the failure happened
        context: String,
        /// Path involved in the failure
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The locator is already present in the current archive.
    #[error("duplicate locator in archive: {0}")]
    DuplicateLocator(String),

    /// Archive or standalone data does not follow the expected layout.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The external script compiler could not be launched.
    #[error("failed to run script compiler `{program}`: {source}")]
    CompilerFailed {
        /// Program that was invoked
        program: String,
        /// Launch error
        #[source]
        source: io::Error,
    },

    /// The build was cancelled by the caller.
    #[error("build cancelled")]
    Cancelled,

    /// A blocking task panicked or was aborted.
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// Bare I/O errors without path context.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Walkdir traversal errors.
    #[error("directory traversal failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Plugin pattern errors.
    #[error("invalid plugin pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Game configuration could not be parsed for rewriting.
    #[error("invalid game configuration: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    /// Path prefix stripping failed while computing a locator.
    #[error("path is outside of the walked root: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Anything else.
    #[error("{0}")]
    GenericError(String),
}

/// Attaches filesystem context to I/O results.
pub trait ErrorExt<T> {
    /// Converts an I/O failure into [`Error::ResourceIo`] naming `path`.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::ResourceIo {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Adds a message to failures and missing values.
pub trait Context<T> {
    /// Wraps the failure (or `None`) in [`Error::GenericError`].
    fn context<C: Display>(self, context: C) -> Result<T>;
}

impl<T, E: Display> Context<T> for std::result::Result<T, E> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

/// Returns early with [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_context_names_the_path() {
        let err: Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
            .fs_context("reading engine binary", "/engine/core.so");
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("reading engine binary"));
        assert!(msg.contains("/engine/core.so"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn option_context_becomes_generic_error() {
        let missing: Option<u8> = None;
        let err = missing.context("no stub configured").unwrap_err();
        assert!(matches!(err, Error::GenericError(ref m) if m == "no stub configured"));
    }
}
