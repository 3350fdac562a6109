//! Script compilation settings.

use serde::Serialize;
use std::path::PathBuf;

/// Controls how script sources are compiled and embedded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScriptSettings {
    /// Compile `.fs`/`.fso` sources to byte-code before embedding.
    pub compile_scripts: bool,

    /// Preprocessor defines passed to the compiler.
    pub defines: Vec<String>,

    /// Include directories passed to the compiler.
    pub include_paths: Vec<PathBuf>,

    /// Emit debug information and log `Message` diagnostics.
    pub debug_mode: bool,

    /// Warnings skip the file.
    pub treat_warnings_as_errors: bool,

    /// Messages skip the file.
    pub treat_messages_as_errors: bool,

    /// Also embed sources (`<locator>.source`) and script libraries.
    pub keep_source: bool,

    /// Explicit compiler program. `None` looks up the default on `PATH`.
    pub compiler: Option<PathBuf>,
}
