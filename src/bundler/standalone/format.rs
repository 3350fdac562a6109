//! Record and trailer encodings.

use crate::bundler::{Error, Result, archive::ResourceData, error::ErrorExt};
use bytes::Bytes;
use std::path::PathBuf;

/// Trailer magic, the last eight bytes of a standalone executable.
pub const TRAILER_MAGIC: &[u8; 8] = b"GPAKEXE1";

/// identifier u64 | base offset u64 | magic.
pub const TRAILER_LEN: u64 = 24;

/// Longest record name accepted when reading.
pub const MAX_RECORD_NAME_LEN: u32 = 4096;

pub const ENGINE_CONFIG_RECORD: &str = "engine.toml";
pub const GAME_CONFIG_RECORD: &str = "game.toml";
pub const DATA_RECORD: &str = "data.pk";

/// Where the appended section starts, and which build wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub identifier: u64,
    pub base_offset: u64,
}

impl Trailer {
    pub fn to_bytes(self) -> [u8; TRAILER_LEN as usize] {
        let mut out = [0u8; TRAILER_LEN as usize];
        out[..8].copy_from_slice(&self.identifier.to_le_bytes());
        out[8..16].copy_from_slice(&self.base_offset.to_le_bytes());
        out[16..].copy_from_slice(TRAILER_MAGIC);
        out
    }

    /// Parses the last [`TRAILER_LEN`] bytes of a file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() as u64 != TRAILER_LEN {
            return Err(Error::InvalidArchive(format!(
                "trailer must be {TRAILER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if &bytes[16..] != TRAILER_MAGIC {
            return Err(Error::InvalidArchive(
                "no standalone trailer found".into(),
            ));
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        let identifier = u64::from_le_bytes(word);
        word.copy_from_slice(&bytes[8..16]);
        let base_offset = u64::from_le_bytes(word);
        Ok(Self {
            identifier,
            base_offset,
        })
    }
}

/// One named blob appended to the stub.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    name: String,
    data: ResourceData,
}

impl BuildRecord {
    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            data: ResourceData::File(path.into()),
        }
    }

    /// In-memory blob, fully serialized so its length is known up front.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: ResourceData::Memory(bytes.into()),
        }
    }

    /// A file record named after the file itself.
    pub fn named_after(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_file(name, path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ResourceData {
        &self.data
    }

    /// Payload length, read from the file system for file records.
    pub async fn len(&self) -> Result<u64> {
        match &self.data {
            ResourceData::Memory(bytes) => Ok(bytes.len() as u64),
            ResourceData::File(path) => Ok(tokio::fs::metadata(path)
                .await
                .fs_context("reading record source", path)?
                .len()),
        }
    }
}
