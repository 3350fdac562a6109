//! External tool detection.
//!
//! The default script compiler is looked up once per process.

use crate::bundler::script::DEFAULT_COMPILER;
use std::{path::PathBuf, sync::LazyLock};

/// Location of the default script compiler on `PATH`, if any.
///
/// Cached result to avoid repeated `PATH` scans across builds.
pub static DEFAULT_COMPILER_PATH: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| match which::which(DEFAULT_COMPILER) {
        Ok(path) => {
            log::debug!("Found {} at: {}", DEFAULT_COMPILER, path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!(
                "{} not found in PATH: {}. Script compilation needs an explicit compiler.",
                DEFAULT_COMPILER,
                e
            );
            None
        }
    });
