//! Random access over a written archive.

use super::format::{EXTENSION, FLAG_DEFLATE, FOOTER_LEN, HEADER_LEN, MAGIC, MAX_LOCATOR_LEN, VERSION};
use crate::bundler::{Error, Result, error::ErrorExt};
use bytes::Bytes;
use flate2::read::DeflateDecoder;
use serde::Serialize;
use std::{collections::HashMap, io::Read, path::Path};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, SeekFrom};

/// One table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub locator: String,
    /// Absolute offset of the stored payload.
    pub offset: u64,
    /// Bytes occupied in the file.
    pub stored_len: u64,
    /// Bytes after decompression.
    pub raw_len: u64,
}

/// Reads the table once, then seeks per resource.
#[derive(Debug)]
pub struct ArchiveReader<R> {
    inner: R,
    compressed: bool,
    entries: Vec<ArchiveEntry>,
    by_locator: HashMap<String, usize>,
}

impl ArchiveReader<tokio::fs::File> {
    /// Opens an archive file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .fs_context("opening archive", path)?;
        Self::new(file).await.map_err(|e| match e {
            Error::InvalidArchive(reason) => {
                Error::InvalidArchive(format!("{}: {reason}", path.display()))
            }
            other => other,
        })
    }
}

impl ArchiveReader<std::io::Cursor<Vec<u8>>> {
    /// Reads an archive held in memory, such as a standalone record payload.
    pub async fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(std::io::Cursor::new(bytes.into())).await
    }
}

impl<R: AsyncRead + AsyncSeek + Unpin> ArchiveReader<R> {
    /// Parses header, footer and table from `inner`.
    pub async fn new(mut inner: R) -> Result<Self> {
        let total = inner.seek(SeekFrom::End(0)).await?;
        if total < HEADER_LEN + 4 + FOOTER_LEN {
            return Err(Error::InvalidArchive(format!(
                "{total} bytes is too short for a .{EXTENSION} archive"
            )));
        }

        inner.seek(SeekFrom::Start(0)).await?;
        let mut magic = [0u8; 4];
        inner.read_exact(&mut magic).await?;
        if &magic != MAGIC {
            return Err(Error::InvalidArchive("bad header magic".into()));
        }
        let version = inner.read_u16_le().await?;
        if version != VERSION {
            return Err(Error::InvalidArchive(format!(
                "unsupported version {version}"
            )));
        }
        let flags = inner.read_u16_le().await?;

        inner.seek(SeekFrom::Start(total - FOOTER_LEN)).await?;
        let table_offset = inner.read_u64_le().await?;
        inner.read_exact(&mut magic).await?;
        if &magic != MAGIC {
            return Err(Error::InvalidArchive("bad footer magic".into()));
        }
        let table_end = total - FOOTER_LEN;
        let count_fits = table_offset
            .checked_add(4)
            .is_some_and(|count_end| count_end <= table_end);
        if table_offset < HEADER_LEN || !count_fits {
            return Err(Error::InvalidArchive(format!(
                "table offset {table_offset} out of range"
            )));
        }

        inner.seek(SeekFrom::Start(table_offset)).await?;
        let count = inner.read_u32_le().await?;
        // Each entry takes at least 28 bytes.
        if u64::from(count) * 28 > table_end - table_offset - 4 {
            return Err(Error::InvalidArchive(format!(
                "table claims {count} entries"
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        let mut by_locator = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let len = inner.read_u32_le().await?;
            if len > MAX_LOCATOR_LEN {
                return Err(Error::InvalidArchive(format!(
                    "locator length {len} exceeds {MAX_LOCATOR_LEN}"
                )));
            }
            let mut name = vec![0u8; len as usize];
            inner.read_exact(&mut name).await?;
            let locator = String::from_utf8(name)
                .map_err(|_| Error::InvalidArchive("locator is not UTF-8".into()))?;
            let offset = inner.read_u64_le().await?;
            let stored_len = inner.read_u64_le().await?;
            let raw_len = inner.read_u64_le().await?;

            let in_bounds = offset >= HEADER_LEN
                && offset
                    .checked_add(stored_len)
                    .is_some_and(|end| end <= table_offset);
            if !in_bounds {
                return Err(Error::InvalidArchive(format!(
                    "resource `{locator}` lies outside the data section"
                )));
            }
            if by_locator.insert(locator.clone(), entries.len()).is_some() {
                return Err(Error::DuplicateLocator(locator));
            }
            entries.push(ArchiveEntry {
                locator,
                offset,
                stored_len,
                raw_len,
            });
        }

        Ok(Self {
            inner,
            compressed: flags & FLAG_DEFLATE != 0,
            entries,
            by_locator,
        })
    }

    /// Table entries in write order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn locators(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.locator.as_str())
    }

    pub fn entry(&self, locator: &str) -> Option<&ArchiveEntry> {
        self.by_locator.get(locator).map(|&i| &self.entries[i])
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Reads one resource by locator. `Ok(None)` if absent.
    pub async fn read(&mut self, locator: &str) -> Result<Option<Bytes>> {
        let Some(entry) = self.entry(locator).cloned() else {
            return Ok(None);
        };

        self.inner.seek(SeekFrom::Start(entry.offset)).await?;
        let mut stored = vec![0u8; entry.stored_len as usize];
        self.inner.read_exact(&mut stored).await?;

        let raw = if self.compressed {
            let mut raw = Vec::with_capacity(entry.raw_len as usize);
            DeflateDecoder::new(stored.as_slice()).read_to_end(&mut raw)?;
            raw
        } else {
            stored
        };

        if raw.len() as u64 != entry.raw_len {
            return Err(Error::InvalidArchive(format!(
                "resource `{locator}` decoded to {} bytes, expected {}",
                raw.len(),
                entry.raw_len
            )));
        }
        Ok(Some(Bytes::from(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::archive::Archive;

    #[tokio::test]
    async fn rejects_garbage() {
        let err = ArchiveReader::from_bytes(vec![0u8; 64]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(_)));

        let err = ArchiveReader::from_bytes(b"GPAK".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(_)));
    }

    #[tokio::test]
    async fn rejects_truncated_archive() {
        let mut archive = Archive::new(false);
        archive.add_bytes("a", vec![9u8; 100]).unwrap();
        let mut bytes = archive.flush_to_vec().await.unwrap();
        bytes.drain(20..60);
        assert!(ArchiveReader::from_bytes(bytes).await.is_err());
    }

    #[tokio::test]
    async fn in_memory_round_trip_with_compression() {
        let mut archive = Archive::new(true);
        archive.add_bytes("levels/one.map", vec![b'x'; 10_000]).unwrap();
        let bytes = archive.flush_to_vec().await.unwrap();

        let mut reader = ArchiveReader::from_bytes(bytes).await.unwrap();
        assert!(reader.is_compressed());
        let entry = reader.entry("levels/one.map").unwrap();
        assert_eq!(entry.raw_len, 10_000);
        assert!(entry.stored_len < 10_000);
        let data = reader.read("levels/one.map").await.unwrap().unwrap();
        assert!(data.iter().all(|&b| b == b'x'));
    }

    fn with_table_offset(table_offset: u64) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&table_offset.to_le_bytes());
        bytes.extend_from_slice(MAGIC);
        bytes
    }

    #[tokio::test]
    async fn rejects_out_of_range_offsets() {
        for table_offset in [u64::MAX, u64::MAX - 3, 1 << 40] {
            let err = ArchiveReader::from_bytes(with_table_offset(table_offset))
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::InvalidArchive(ref m) if m.contains("out of range")),
                "{err}"
            );
        }
        let empty = ArchiveReader::from_bytes(with_table_offset(HEADER_LEN)).await.unwrap();
        assert!(empty.entries().is_empty());
    }
}
