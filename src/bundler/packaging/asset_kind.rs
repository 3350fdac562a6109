//! File classification by extension.

use std::path::Path;

/// How a file is treated when packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Embedded as-is.
    PlainAsset,
    /// `.fs` / `.fso`: compiled when script compilation is enabled.
    ScriptSource,
    /// `.fsl`: only embedded when sources are kept.
    ScriptLibrary,
}

impl AssetKind {
    /// Classifies by extension, case-insensitively.
    pub fn classify(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("fs") | Some("fso") => Self::ScriptSource,
            Some("fsl") => Self::ScriptLibrary,
            _ => Self::PlainAsset,
        }
    }
}
