//! Standalone executables.
//!
//! A standalone build appends the engine, its plugins, both configuration
//! files and the game archive to a stub executable. The runtime finds them
//! through a fixed-size trailer at the very end of the file:
//!
//! ```text
//! [stub executable bytes]
//! base ->   record_count u32
//!           name_len u32 | name | length u64 | bytes      (record_count times)
//! trailer:  identifier u64 | base u64 | "GPAKEXE1"
//! ```

mod bundler;
mod format;
mod plugins;
mod reader;

pub use bundler::{StandaloneBundler, game_identifier};
pub use format::{
    BuildRecord, DATA_RECORD, ENGINE_CONFIG_RECORD, GAME_CONFIG_RECORD, TRAILER_LEN,
    TRAILER_MAGIC, Trailer,
};
pub use plugins::resolve_plugins;
pub use reader::{RecordEntry, StandaloneReader};

/// File name of the executable built for `title`.
pub fn executable_name(title: &str) -> String {
    let stem = crate::bundler::utils::fs::sanitize_file_name(title);
    if std::env::consts::EXE_SUFFIX.is_empty() {
        stem
    } else {
        format!("{stem}{}", std::env::consts::EXE_SUFFIX)
    }
}
