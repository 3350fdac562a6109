//! Size-bounded archive splitting.
//!
//! Before each resource is added the splitter decides whether the current
//! archive has to be written out first. Archives never exceed the limit
//! unless they hold a single resource that is larger than the limit on its
//! own; such a resource gets an archive to itself and is never split.

use super::{Archive, Resource, format::EXTENSION};
use crate::bundler::Result;
use std::path::{Path, PathBuf};

/// Whether the current archive must be flushed before adding `incoming` bytes.
///
/// `max == 0` disables splitting. An empty archive always accepts the next
/// resource, which is what lets an oversized resource occupy an archive alone.
pub fn should_split(max: u64, current: u64, incoming: u64, resident: usize) -> bool {
    max > 0 && resident > 0 && current.saturating_add(incoming) > max
}

/// Sequential archive file naming inside the build directory.
#[derive(Debug, Clone)]
pub struct ArchiveNaming {
    directory: PathBuf,
    pattern: String,
    numbered: bool,
}

impl ArchiveNaming {
    /// `pattern` may contain `#`, replaced by the archive index.
    pub fn new(directory: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            pattern: pattern.into(),
            numbered: true,
        }
    }

    /// Always uses `stem` as-is, for single-archive outputs.
    pub fn fixed(directory: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            pattern: stem.into(),
            numbered: false,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File stem for `index`, before collision handling.
    pub fn stem(&self, index: u32) -> String {
        if !self.numbered {
            return self.pattern.clone();
        }
        match self.pattern.find('#') {
            Some(at) => format!(
                "{}{}{}",
                &self.pattern[..at],
                index,
                &self.pattern[at + 1..]
            ),
            None => format!("{}{}", self.pattern, index),
        }
    }

    /// First free path for `index`: `<stem>.pk`, then `<stem>_1.pk`, `<stem>_2.pk`, ...
    pub async fn free_path(&self, index: u32) -> Result<PathBuf> {
        let stem = self.stem(index);
        let candidate = self.directory.join(format!("{stem}.{EXTENSION}"));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        let mut suffix = 1u32;
        loop {
            let candidate = self.directory.join(format!("{stem}_{suffix}.{EXTENSION}"));
            if !tokio::fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}

/// Owns the active archive and flushes it whenever the limit would be crossed.
#[derive(Debug)]
pub struct ArchiveSplitter {
    archive: Archive,
    max_size: u64,
    naming: ArchiveNaming,
    written: Vec<PathBuf>,
}

impl ArchiveSplitter {
    /// `max_size == 0` produces exactly one archive regardless of size.
    pub fn new(max_size: u64, naming: ArchiveNaming, compress: bool) -> Self {
        Self {
            archive: Archive::new(compress),
            max_size,
            naming,
            written: Vec::new(),
        }
    }

    /// The archive currently being filled.
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Archives written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Adds a resource, flushing the current archive first when required.
    ///
    /// Returns the path of the archive flushed by this call, if any.
    pub async fn add(&mut self, resource: Resource) -> Result<Option<PathBuf>> {
        let flushed = if should_split(
            self.max_size,
            self.archive.size(),
            resource.len(),
            self.archive.len(),
        ) {
            Some(self.flush_current().await?)
        } else {
            None
        };
        self.archive.add(resource)?;
        Ok(flushed)
    }

    /// Writes any remaining resources and returns every archive written.
    pub async fn finish(mut self) -> Result<Vec<PathBuf>> {
        if !self.archive.is_empty() {
            self.flush_current().await?;
        }
        Ok(self.written)
    }

    async fn flush_current(&mut self) -> Result<PathBuf> {
        let path = self.naming.free_path(self.archive.index()).await?;
        let path = self.archive.flush(&path).await?;
        self.written.push(path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::archive::ArchiveReader;
    use tempfile::TempDir;

    const MB: u64 = 1024 * 1024;

    fn sized(locator: &str, len: u64) -> Resource {
        Resource::from_bytes(locator, vec![0u8; len as usize])
    }

    async fn layout(dir: &Path, max: u64, sizes: &[u64]) -> Vec<Vec<String>> {
        let mut splitter = ArchiveSplitter::new(max, ArchiveNaming::new(dir, "data#"), false);
        for (i, size) in sizes.iter().enumerate() {
            splitter.add(sized(&format!("r{}", i + 1), *size)).await.unwrap();
        }
        let mut out = Vec::new();
        for path in splitter.finish().await.unwrap() {
            let reader = ArchiveReader::open(&path).await.unwrap();
            out.push(reader.locators().map(String::from).collect());
        }
        out
    }

    #[test]
    fn split_policy() {
        assert!(!should_split(0, 100, 100, 5));
        assert!(!should_split(25, 20, 5, 2));
        assert!(should_split(25, 20, 10, 2));
        assert!(!should_split(25, 0, 30, 0));
        assert!(should_split(25, 30, 1, 1));
    }

    #[test]
    fn naming_replaces_placeholder() {
        let naming = ArchiveNaming::new("/b", "data#");
        assert_eq!(naming.stem(0), "data0");
        assert_eq!(ArchiveNaming::new("/b", "pak#_core").stem(3), "pak3_core");
        assert_eq!(ArchiveNaming::new("/b", "assets").stem(2), "assets2");
        assert_eq!(ArchiveNaming::fixed("/b", "Hero #1").stem(4), "Hero #1");
    }

    #[tokio::test]
    async fn naming_skips_existing_files() {
        let dir = TempDir::new().unwrap();
        let naming = ArchiveNaming::new(dir.path(), "data#");
        std::fs::write(dir.path().join("data0.pk"), b"old").unwrap();
        std::fs::write(dir.path().join("data0_1.pk"), b"old").unwrap();
        assert_eq!(
            naming.free_path(0).await.unwrap(),
            dir.path().join("data0_2.pk")
        );
        assert_eq!(naming.free_path(1).await.unwrap(), dir.path().join("data1.pk"));
    }

    #[tokio::test]
    async fn three_ten_megabyte_files_with_25_megabyte_limit() {
        let dir = TempDir::new().unwrap();
        let archives = layout(dir.path(), 25 * MB, &[10 * MB, 10 * MB, 10 * MB]).await;
        assert_eq!(archives, vec![vec!["r1", "r2"], vec!["r3"]]);
        assert!(dir.path().join("data0.pk").is_file());
        assert!(dir.path().join("data1.pk").is_file());
    }

    #[tokio::test]
    async fn oversized_resource_gets_its_own_archive() {
        let dir = TempDir::new().unwrap();
        let archives = layout(dir.path(), 25, &[30, 5, 40, 40]).await;
        assert_eq!(
            archives,
            vec![vec!["r1"], vec!["r2"], vec!["r3"], vec!["r4"]]
        );
    }

    #[tokio::test]
    async fn no_archive_exceeds_limit_unless_single() {
        let dir = TempDir::new().unwrap();
        let sizes = [3u64, 9, 1, 12, 4, 4, 4, 20, 2, 7, 7, 1];
        let max = 10;
        let mut splitter =
            ArchiveSplitter::new(max, ArchiveNaming::new(dir.path(), "p#"), false);
        for (i, size) in sizes.iter().enumerate() {
            splitter.add(sized(&format!("r{i}"), *size)).await.unwrap();
        }
        for path in splitter.finish().await.unwrap() {
            let reader = ArchiveReader::open(&path).await.unwrap();
            let total: u64 = reader.entries().iter().map(|e| e.raw_len).sum();
            assert!(total <= max || reader.entries().len() == 1, "{path:?} holds {total}");
        }
    }

    #[tokio::test]
    async fn zero_limit_never_splits() {
        let dir = TempDir::new().unwrap();
        let archives = layout(dir.path(), 0, &[10 * MB, 10 * MB, 10 * MB]).await;
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].len(), 3);
    }

    #[tokio::test]
    async fn empty_splitter_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let splitter = ArchiveSplitter::new(10, ArchiveNaming::new(dir.path(), "data#"), false);
        assert!(splitter.finish().await.unwrap().is_empty());
    }
}
