//! Appends records and the trailer to a stub executable.

use super::format::{BuildRecord, Trailer};
use crate::bundler::{
    Error, Result,
    archive::ResourceData,
    builder::EventSink,
    error::ErrorExt,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;

/// Build identifier: `timestamp XOR hash(title)`.
///
/// The timestamp is in UTC nanoseconds; the hash is the first eight bytes of
/// the title's SHA-256, read little-endian.
pub fn game_identifier(title: &str, at: DateTime<Utc>) -> u64 {
    let digest = Sha256::digest(title.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let nanos = at.timestamp_nanos_opt().unwrap_or_default() as u64;
    nanos ^ u64::from_le_bytes(head)
}

/// Writes a standalone executable.
#[derive(Debug, Clone)]
pub struct StandaloneBundler {
    stub: PathBuf,
    identifier: u64,
    records: Vec<BuildRecord>,
}

impl StandaloneBundler {
    pub fn new(stub: impl Into<PathBuf>, identifier: u64) -> Self {
        Self {
            stub: stub.into(),
            identifier,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: BuildRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[BuildRecord] {
        &self.records
    }

    pub fn identifier(&self) -> u64 {
        self.identifier
    }

    /// Copies the stub to `output` and appends every record plus the trailer.
    ///
    /// A partially written `output` is removed when writing fails.
    ///
    /// # Errors
    ///
    /// [`Error::ResourceIo`] for unreadable records or write failures,
    /// [`Error::Cancelled`] when cancellation is observed between records.
    pub async fn write(
        &self,
        output: &Path,
        cancel: &CancellationToken,
        events: &mut EventSink,
    ) -> Result<Trailer> {
        let result = self.write_executable(output, cancel, events).await;
        if result.is_err() {
            match tokio::fs::remove_file(output).await {
                Ok(()) => log::debug!("Removed incomplete {}", output.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove incomplete {}: {e}", output.display()),
            }
        }
        result
    }

    async fn write_executable(
        &self,
        output: &Path,
        cancel: &CancellationToken,
        events: &mut EventSink,
    ) -> Result<Trailer> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating output directory", parent)?;
        }
        tokio::fs::copy(&self.stub, output)
            .await
            .fs_context("copying stub executable", &self.stub)?;

        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(output)
            .await
            .fs_context("opening executable for append", output)?;
        let base_offset = file
            .metadata()
            .await
            .fs_context("reading executable size", output)?
            .len();
        let mut writer = BufWriter::new(file);

        let trailer = self
            .append(&mut writer, base_offset, output, cancel, events)
            .await?;
        writer.flush().await.fs_context("flushing executable", output)?;

        set_executable(output).await?;
        Ok(trailer)
    }

    /// Writes the record section and trailer to `writer`, which currently
    /// ends at `base_offset`.
    async fn append<W>(
        &self,
        writer: &mut W,
        base_offset: u64,
        output: &Path,
        cancel: &CancellationToken,
        events: &mut EventSink,
    ) -> Result<Trailer>
    where
        W: AsyncWrite + Unpin,
    {
        let count = u32::try_from(self.records.len())
            .map_err(|_| Error::GenericError("too many standalone records".into()))?;
        writer
            .write_u32_le(count)
            .await
            .fs_context("writing record count", output)?;

        let total = self.records.len();
        for (i, record) in self.records.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            events.subtask(record.name(), i + 1, total);
            let length = write_record(writer, record, output).await?;
            events.info(format!("Embedded {} ({length} bytes)", record.name()));
        }

        let trailer = Trailer {
            identifier: self.identifier,
            base_offset,
        };
        writer
            .write_all(&trailer.to_bytes())
            .await
            .fs_context("writing trailer", output)?;
        Ok(trailer)
    }
}

async fn write_record<W>(writer: &mut W, record: &BuildRecord, output: &Path) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let name = record.name().as_bytes();
    let length = record.len().await?;
    let name_len = u32::try_from(name.len())
        .map_err(|_| Error::GenericError(format!("record name too long: {}", record.name())))?;

    writer
        .write_u32_le(name_len)
        .await
        .fs_context("writing record", output)?;
    writer.write_all(name).await.fs_context("writing record", output)?;
    writer
        .write_u64_le(length)
        .await
        .fs_context("writing record", output)?;

    match record.data() {
        ResourceData::Memory(bytes) => {
            writer
                .write_all(bytes)
                .await
                .fs_context("writing record", output)?;
        }
        ResourceData::File(path) => {
            let mut source = tokio::fs::File::open(path)
                .await
                .fs_context("opening record source", path)?;
            let copied = tokio::io::copy(&mut source, writer)
                .await
                .fs_context("copying record source", path)?;
            if copied != length {
                return Err(Error::GenericError(format!(
                    "{} changed size while being embedded ({length} -> {copied} bytes)",
                    path.display()
                )));
            }
        }
    }
    Ok(length)
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = tokio::fs::metadata(path)
        .await
        .fs_context("reading executable permissions", path)?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    tokio::fs::set_permissions(path, permissions)
        .await
        .fs_context("marking executable", path)
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::standalone::StandaloneReader;
    use chrono::TimeZone;
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };
    use tempfile::TempDir;

    #[test]
    fn identifier_mixes_time_and_title() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let a = game_identifier("Hero", at);
        assert_eq!(a, game_identifier("Hero", at));
        assert_ne!(a, game_identifier("Villain", at));
        assert_ne!(a, game_identifier("Hero", at + chrono::Duration::nanoseconds(1)));
    }

    #[tokio::test]
    async fn appends_records_after_stub() {
        let dir = TempDir::new().unwrap();
        let stub = dir.path().join("stub");
        std::fs::write(&stub, vec![0x7fu8; 1000]).unwrap();
        let engine = dir.path().join("engine.so");
        std::fs::write(&engine, b"ENGINE").unwrap();

        let mut bundler = StandaloneBundler::new(&stub, 42);
        bundler.push(BuildRecord::named_after(&engine));
        bundler.push(BuildRecord::from_bytes("game.toml", &b"title = 'x'"[..]));

        let output = dir.path().join("out/Hero");
        let mut events = EventSink::detached();
        let trailer = bundler
            .write(&output, &CancellationToken::new(), &mut events)
            .await
            .unwrap();
        assert_eq!(trailer.base_offset, 1000);
        assert_eq!(trailer.identifier, 42);

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..1000], &vec![0x7fu8; 1000][..]);

        let mut reader = StandaloneReader::open(&output).await.unwrap();
        assert_eq!(reader.trailer(), trailer);
        let names: Vec<_> = reader.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["engine.so", "game.toml"]);
        assert_eq!(reader.read("engine.so").await.unwrap().unwrap(), &b"ENGINE"[..]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&output).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn missing_record_source_aborts() {
        let dir = TempDir::new().unwrap();
        let stub = dir.path().join("stub");
        std::fs::write(&stub, b"MZ").unwrap();

        let mut bundler = StandaloneBundler::new(&stub, 1);
        bundler.push(BuildRecord::from_file("core.so", dir.path().join("missing.so")));

        let err = bundler
            .write(
                &dir.path().join("Hero"),
                &CancellationToken::new(),
                &mut EventSink::detached(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceIo { .. }));
        assert!(!dir.path().join("Hero").exists());
    }

    #[tokio::test]
    async fn cancelled_write_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let stub = dir.path().join("stub");
        std::fs::write(&stub, b"MZ").unwrap();
        let mut bundler = StandaloneBundler::new(&stub, 1);
        bundler.push(BuildRecord::from_bytes("game.toml", &b"x"[..]));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let output = dir.path().join("Hero");
        let err = bundler
            .write(&output, &cancel, &mut EventSink::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!output.exists());
    }

    /// Cancels `cancel` once `limit` bytes have been written.
    struct CancelAfter {
        written: Vec<u8>,
        limit: usize,
        cancel: CancellationToken,
    }

    impl AsyncWrite for CancelAfter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.written.extend_from_slice(buf);
            if self.written.len() >= self.limit {
                self.cancel.cancel();
            }
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn cancellation_stops_between_records() {
        let mut bundler = StandaloneBundler::new("stub", 9);
        bundler.push(BuildRecord::from_bytes("a", &b"AAAA"[..]));
        bundler.push(BuildRecord::from_bytes("b", &b"BBBB"[..]));
        bundler.push(BuildRecord::from_bytes("c", &b"CCCC"[..]));

        // count + name_len + "a" + length + payload
        let first_record_end = 4 + 4 + 1 + 8 + 4;
        let cancel = CancellationToken::new();
        let mut writer = CancelAfter {
            written: Vec::new(),
            limit: first_record_end,
            cancel: cancel.clone(),
        };
        let mut events = EventSink::detached();
        let err = bundler
            .append(&mut writer, 0, Path::new("Hero"), &cancel, &mut events)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(writer.written.len(), first_record_end);
        assert_eq!(&writer.written[writer.written.len() - 4..], b"AAAA");
        let embedded: Vec<_> = events
            .lines()
            .iter()
            .filter(|l| l.message.starts_with("Embedded"))
            .collect();
        assert_eq!(embedded.len(), 1);
    }
}
