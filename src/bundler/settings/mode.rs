//! Output mode selection.

use serde::Serialize;
use std::fmt;

/// What a build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildMode {
    /// Mirrored directory tree with scripts compiled in place.
    Loose,
    /// Size-bounded `.pk` archives plus a configuration copy.
    Archives,
    /// One `.pk` named after the game, repacked from a loose build.
    Distributable,
    /// One executable: stub plus appended records and trailer.
    Standalone,
}

impl BuildMode {
    /// Whether embedded files go into archives rather than being copied.
    pub fn uses_archives(self) -> bool {
        !matches!(self, Self::Loose)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loose => "loose",
            Self::Archives => "archives",
            Self::Distributable => "distributable",
            Self::Standalone => "standalone",
        };
        f.write_str(name)
    }
}
