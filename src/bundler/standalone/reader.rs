//! Reads the records back out of a standalone executable.

use super::format::{MAX_RECORD_NAME_LEN, TRAILER_LEN, Trailer};
use crate::bundler::{Error, Result, error::ErrorExt};
use bytes::Bytes;
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

/// Location of one record's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordEntry {
    pub name: String,
    pub offset: u64,
    pub length: u64,
}

/// Parses the trailer and record headers of a standalone executable.
#[derive(Debug)]
pub struct StandaloneReader {
    file: tokio::fs::File,
    trailer: Trailer,
    records: Vec<RecordEntry>,
}

impl StandaloneReader {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::open(path)
            .await
            .fs_context("opening executable", path)?;
        let total = file
            .metadata()
            .await
            .fs_context("reading executable size", path)?
            .len();
        if total < TRAILER_LEN + 4 {
            return Err(invalid(path, "file is too short"));
        }

        file.seek(SeekFrom::Start(total - TRAILER_LEN)).await?;
        let mut raw = [0u8; TRAILER_LEN as usize];
        file.read_exact(&mut raw).await?;
        let trailer = Trailer::parse(&raw).map_err(|e| invalid(path, &e.to_string()))?;

        let end = total - TRAILER_LEN;
        let count_fits = trailer
            .base_offset
            .checked_add(4)
            .is_some_and(|count_end| count_end <= end);
        if !count_fits {
            return Err(invalid(path, "record section offset out of range"));
        }

        file.seek(SeekFrom::Start(trailer.base_offset)).await?;
        let count = file.read_u32_le().await?;
        let mut position = trailer.base_offset + 4;
        let mut records = Vec::new();
        for _ in 0..count {
            if position + 12 > end {
                return Err(invalid(path, "record header runs into the trailer"));
            }
            let name_len = file.read_u32_le().await?;
            if name_len > MAX_RECORD_NAME_LEN {
                return Err(invalid(path, "record name too long"));
            }
            let mut name = vec![0u8; name_len as usize];
            file.read_exact(&mut name).await?;
            let name = String::from_utf8(name)
                .map_err(|_| invalid(path, "record name is not UTF-8"))?;
            let length = file.read_u64_le().await?;
            let offset = position + 4 + u64::from(name_len) + 8;
            let next = offset
                .checked_add(length)
                .filter(|&next| next <= end)
                .ok_or_else(|| invalid(path, &format!("record `{name}` runs past the trailer")))?;

            records.push(RecordEntry {
                name,
                offset,
                length,
            });
            position = next;
            file.seek(SeekFrom::Start(position)).await?;
        }

        if position != end {
            return Err(invalid(path, "unexpected bytes between records and trailer"));
        }

        Ok(Self {
            file,
            trailer,
            records,
        })
    }

    pub fn trailer(&self) -> Trailer {
        self.trailer
    }

    /// Records in write order.
    pub fn records(&self) -> &[RecordEntry] {
        &self.records
    }

    /// Reads the first record called `name`.
    pub async fn read(&mut self, name: &str) -> Result<Option<Bytes>> {
        let Some(entry) = self.records.iter().find(|r| r.name == name).cloned() else {
            return Ok(None);
        };
        self.file.seek(SeekFrom::Start(entry.offset)).await?;
        let mut data = vec![0u8; entry.length as usize];
        self.file.read_exact(&mut data).await?;
        Ok(Some(Bytes::from(data)))
    }
}

fn invalid(path: &Path, reason: &str) -> Error {
    Error::InvalidArchive(format!("{}: {reason}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn rejects_executables_without_trailer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain");
        std::fs::write(&path, vec![1u8; 200]).unwrap();
        assert!(matches!(
            StandaloneReader::open(&path).await,
            Err(Error::InvalidArchive(_))
        ));
    }

    #[tokio::test]
    async fn rejects_lengths_past_the_trailer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forged");
        let mut bytes = b"STUB".to_vec();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(b'a');
        bytes.extend_from_slice(&1_000_000u64.to_le_bytes());
        bytes.extend_from_slice(
            &Trailer {
                identifier: 7,
                base_offset: 4,
            }
            .to_bytes(),
        );
        std::fs::write(&path, bytes).unwrap();
        assert!(StandaloneReader::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn rejects_out_of_range_offsets() {
        let dir = TempDir::new().unwrap();
        for base_offset in [u64::MAX, u64::MAX - 3, 1 << 40] {
            let path = dir.path().join("forged");
            let mut bytes = b"STUB".to_vec();
            bytes.extend_from_slice(&0u32.to_le_bytes());
            bytes.extend_from_slice(
                &Trailer {
                    identifier: 7,
                    base_offset,
                }
                .to_bytes(),
            );
            std::fs::write(&path, bytes).unwrap();
            let err = StandaloneReader::open(&path).await.unwrap_err();
            assert!(
                matches!(err, Error::InvalidArchive(ref m) if m.contains("out of range")),
                "{err}"
            );
        }
    }
}
