//! Rewrites the copied game configuration for the chosen output mode.

use crate::bundler::{Result, error::ErrorExt};
use std::path::Path;
use toml_edit::{DocumentMut, value};

/// Keys set on the copied game configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameConfigPatch {
    pub use_archives: bool,
    /// Set for standalone builds: marks the config and records the build id.
    pub standalone_build: Option<u64>,
}

impl GameConfigPatch {
    /// Applies the patch, preserving comments and formatting.
    pub fn apply(&self, text: &str) -> Result<String> {
        let mut doc = text.parse::<DocumentMut>()?;
        doc["use_archives"] = value(self.use_archives);
        if let Some(identifier) = self.standalone_build {
            doc["standalone"] = value(true);
            doc["build_id"] = value(hex::encode(identifier.to_be_bytes()));
        }
        Ok(doc.to_string())
    }

    /// Reads `source`, applies the patch and returns the new text.
    pub async fn render(&self, source: &Path) -> Result<String> {
        let text = tokio::fs::read_to_string(source)
            .await
            .fs_context("reading game configuration", source)?;
        self.apply(&text)
    }

    /// Rewrites `path` in place.
    pub async fn rewrite(&self, path: &Path) -> Result<()> {
        let text = self.render(path).await?;
        tokio::fs::write(path, text)
            .await
            .fs_context("writing game configuration", path)
    }
}
