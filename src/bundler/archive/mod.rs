//! Resource archives (`.pk` files).
//!
//! An [`Archive`] is an append-only list of [`Resource`]s keyed by locator.
//! Payloads are bound lazily: file-backed resources are only read when the
//! archive is flushed, so a large media tree never sits in memory at once.
//!
//! # Module Organization
//!
//! - [`format`] - On-disk layout and the streaming writer
//! - [`reader`] - Table-first random access reader
//! - [`splitter`] - Size-bounded flushing across several archives

pub mod format;
mod reader;
mod splitter;

pub use reader::{ArchiveEntry, ArchiveReader};
pub use splitter::{ArchiveNaming, ArchiveSplitter, should_split};

use crate::bundler::{Error, Result, error::ErrorExt};
use bytes::Bytes;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tokio::io::BufWriter;

/// Where a resource's bytes come from.
#[derive(Debug, Clone)]
pub enum ResourceData {
    /// Read from this file at flush time.
    File(PathBuf),
    /// Already in memory (compiled byte-code, generated configuration).
    Memory(Bytes),
}

/// One named blob inside an archive.
#[derive(Debug, Clone)]
pub struct Resource {
    locator: String,
    length: u64,
    data: ResourceData,
}

impl Resource {
    /// File-backed resource; `length` is the file size observed when walking.
    pub fn from_file(locator: impl Into<String>, path: impl Into<PathBuf>, length: u64) -> Self {
        Self {
            locator: locator.into(),
            length,
            data: ResourceData::File(path.into()),
        }
    }

    /// In-memory resource.
    pub fn from_bytes(locator: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            locator: locator.into(),
            length: bytes.len() as u64,
            data: ResourceData::Memory(bytes),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Payload length in bytes (uncompressed).
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn data(&self) -> &ResourceData {
        &self.data
    }

    /// Materialises the payload.
    pub async fn load(&self) -> Result<Bytes> {
        match &self.data {
            ResourceData::Memory(bytes) => Ok(bytes.clone()),
            ResourceData::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .fs_context("reading resource", path),
        }
    }
}

/// Append-only resource container.
///
/// Owned by exactly one build worker; never shared.
#[derive(Debug, Default)]
pub struct Archive {
    resources: Vec<Resource>,
    locators: HashSet<String>,
    size: u64,
    index: u32,
    compress: bool,
}

impl Archive {
    /// Creates an empty archive. `compress` deflates payloads on flush.
    pub fn new(compress: bool) -> Self {
        Self {
            compress,
            ..Default::default()
        }
    }

    /// Adds a resource.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateLocator`] if the locator is already present.
    pub fn add(&mut self, resource: Resource) -> Result<()> {
        if !self.locators.insert(resource.locator.clone()) {
            return Err(Error::DuplicateLocator(resource.locator));
        }
        self.size += resource.length;
        self.resources.push(resource);
        Ok(())
    }

    /// Adds an in-memory blob under `locator`.
    pub fn add_bytes(&mut self, locator: impl Into<String>, bytes: impl Into<Bytes>) -> Result<()> {
        self.add(Resource::from_bytes(locator, bytes))
    }

    /// Sum of all resource lengths.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of resources currently held.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Sequential number of the next flush.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_compressed(&self) -> bool {
        self.compress
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.locators.contains(locator)
    }

    /// Writes the archive to `path`, then clears it and advances the index.
    ///
    /// Returns the written path.
    pub async fn flush(&mut self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating archive directory", parent)?;
        }
        let file = tokio::fs::File::create(path)
            .await
            .fs_context("creating archive", path)?;
        let mut out = BufWriter::new(file);

        let written = format::write_archive(&self.resources, self.compress, &mut out)
            .await
            .map_err(|e| with_path(e, "writing archive", path))?;

        log::debug!(
            "Flushed archive #{} ({} resources, {} bytes) to {}",
            self.index,
            self.resources.len(),
            written,
            path.display()
        );
        self.reset();
        Ok(path.to_path_buf())
    }

    /// Serializes the archive into memory, then clears it and advances the index.
    pub async fn flush_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size as usize);
        format::write_archive(&self.resources, self.compress, &mut out).await?;
        self.reset();
        Ok(out)
    }

    fn reset(&mut self) {
        self.resources.clear();
        self.locators.clear();
        self.size = 0;
        self.index += 1;
    }
}

fn with_path(err: Error, context: &str, path: &Path) -> Error {
    match err {
        Error::IoError(source) => Error::ResourceIo {
            context: context.to_string(),
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn add_tracks_size_and_rejects_duplicates() {
        let mut archive = Archive::new(false);
        archive.add_bytes("a.txt", vec![0u8; 10]).unwrap();
        archive.add_bytes("b.txt", vec![0u8; 5]).unwrap();
        assert_eq!(archive.size(), 15);
        assert_eq!(archive.len(), 2);

        let err = archive.add_bytes("a.txt", vec![1u8]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLocator(ref l) if l == "a.txt"));
        assert_eq!(archive.size(), 15);
    }

    #[tokio::test]
    async fn flush_clears_and_advances_index() {
        let dir = TempDir::new().unwrap();
        let mut archive = Archive::new(false);
        archive.add_bytes("a.txt", b"hello".to_vec()).unwrap();

        let path = archive.flush(&dir.path().join("data0.pk")).await.unwrap();
        assert!(path.is_file());
        assert!(archive.is_empty());
        assert_eq!(archive.size(), 0);
        assert_eq!(archive.index(), 1);

        // Locators are scoped to one archive instance.
        archive.add_bytes("a.txt", b"again".to_vec()).unwrap();
    }

    #[tokio::test]
    async fn round_trip_preserves_bytes() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("texture.png");
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std::fs::write(&source, &payload).unwrap();

        for compress in [false, true] {
            let mut archive = Archive::new(compress);
            archive
                .add(Resource::from_file("textures/texture.png", &source, payload.len() as u64))
                .unwrap();
            archive.add_bytes("empty.bin", Vec::new()).unwrap();
            archive.add_bytes("scripts/main.fs", b"bytecode".to_vec()).unwrap();

            let out = dir.path().join(format!("rt{compress}.pk"));
            archive.flush(&out).await.unwrap();

            let mut reader = ArchiveReader::open(&out).await.unwrap();
            assert_eq!(reader.entries().len(), 3);
            assert_eq!(
                reader.read("textures/texture.png").await.unwrap().unwrap().as_ref(),
                payload.as_slice()
            );
            assert_eq!(reader.read("empty.bin").await.unwrap().unwrap().len(), 0);
            assert_eq!(
                reader.read("scripts/main.fs").await.unwrap().unwrap().as_ref(),
                b"bytecode"
            );
            assert!(reader.read("missing").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn missing_source_file_is_resource_io_error() {
        let dir = TempDir::new().unwrap();
        let mut archive = Archive::new(false);
        archive
            .add(Resource::from_file("gone.png", dir.path().join("gone.png"), 3))
            .unwrap();
        let err = archive.flush(&dir.path().join("x.pk")).await.unwrap_err();
        assert!(matches!(err, Error::ResourceIo { .. }));
    }
}
