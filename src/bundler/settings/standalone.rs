//! Engine inputs for standalone executables.

use serde::Serialize;
use std::path::PathBuf;

/// Engine-provided binaries embedded into a standalone executable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StandaloneSettings {
    /// Host stub executable the records are appended to.
    pub stub: Option<PathBuf>,

    /// Engine libraries embedded first, in this order.
    pub engine_binaries: Vec<PathBuf>,

    /// Directory holding plugin libraries.
    pub plugin_dir: Option<PathBuf>,

    /// Explicit plugin list (file names relative to `plugin_dir`).
    ///
    /// When `None` every dynamic library in `plugin_dir` is embedded.
    pub plugin_manifest: Option<Vec<String>>,

    /// Engine configuration file. Embedded empty when absent.
    pub engine_config: Option<PathBuf>,
}
