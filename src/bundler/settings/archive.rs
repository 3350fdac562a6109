//! Archive splitting and naming settings.

use serde::Serialize;

/// Bytes per megabyte as used by archive size limits.
pub const MEGABYTE: u64 = 1024 * 1024;

/// Default archive name pattern; `#` is replaced by the archive index.
pub const DEFAULT_NAME_PATTERN: &str = "data#";

/// Pak archive configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSettings {
    /// Upper bound for one archive in bytes. Zero disables splitting.
    pub max_archive_size_bytes: u64,

    /// Archive file name pattern without extension.
    ///
    /// The first `#` is replaced by the zero-based archive index; without a
    /// `#` the index is appended.
    pub name_prefix_pattern: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            max_archive_size_bytes: 0,
            name_prefix_pattern: DEFAULT_NAME_PATTERN.to_string(),
        }
    }
}

impl ArchiveSettings {
    /// Settings with a limit expressed in megabytes.
    pub fn with_max_megabytes(max_mb: u64) -> Self {
        Self {
            max_archive_size_bytes: max_mb.saturating_mul(MEGABYTE),
            ..Default::default()
        }
    }
}
