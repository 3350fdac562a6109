//! Game asset packaging library.
//!
//! Packages a game project's media, language and configuration directories
//! into one of:
//! - a loose mirrored tree with scripts compiled in place
//! - size-bounded `.pk` archives
//! - a single distributable `.pk` archive
//! - a standalone executable with everything appended to an engine stub
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};

use bundler::{BuildConfiguration, BuildResult, Bundler};

/// Runs one build to completion.
///
/// Progress is only mirrored to the `log` facade; use [`Bundler::spawn`] to
/// receive [`bundler::BuildEvent`]s or to cancel.
pub async fn build_project(config: BuildConfiguration) -> BuildResult {
    let mut handle = Bundler::new(config).spawn();
    while handle.next_event().await.is_some() {}
    handle.wait().await
}
