//! Destinations for embedded files.

use crate::bundler::{
    Result,
    archive::{ArchiveSplitter, Resource},
    builder::EventSink,
    error::ErrorExt,
    utils::fs,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Where embedded files end up.
#[derive(Debug)]
pub enum EmbedSink {
    /// Added to archives, flushed by the splitter.
    Archive(ArchiveSplitter),
    /// Copied below this directory, preserving the locator path.
    Directory(PathBuf),
}

impl EmbedSink {
    /// Embeds a file from disk under `locator`.
    pub async fn embed_file(
        &mut self,
        locator: &str,
        source: &Path,
        length: u64,
        events: &mut EventSink,
    ) -> Result<()> {
        match self {
            Self::Archive(splitter) => {
                let flushed = splitter
                    .add(Resource::from_file(locator, source, length))
                    .await?;
                report_flush(flushed, events);
            }
            Self::Directory(root) => {
                fs::copy_file(source, &destination(root, locator)).await?;
            }
        }
        Ok(())
    }

    /// Embeds generated bytes under `locator`.
    pub async fn embed_bytes(
        &mut self,
        locator: &str,
        bytes: Bytes,
        events: &mut EventSink,
    ) -> Result<()> {
        match self {
            Self::Archive(splitter) => {
                let flushed = splitter.add(Resource::from_bytes(locator, bytes)).await?;
                report_flush(flushed, events);
            }
            Self::Directory(root) => {
                let dest = destination(root, locator);
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .fs_context("creating output directory", parent)?;
                }
                tokio::fs::write(&dest, &bytes)
                    .await
                    .fs_context("writing compiled script", &dest)?;
            }
        }
        Ok(())
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive(_))
    }
}

fn report_flush(flushed: Option<PathBuf>, events: &mut EventSink) {
    if let Some(path) = flushed {
        events.info(format!("Wrote archive {}", path.display()));
    }
}

fn destination(root: &Path, locator: &str) -> PathBuf {
    locator
        .split('/')
        .fold(root.to_path_buf(), |path, part| path.join(part))
}
