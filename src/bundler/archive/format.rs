//! On-disk archive layout.
//!
//! All integers are little-endian.
//!
//! ```text
//! header   magic "GPAK" | version u16 | flags u16
//! data     payloads back to back (deflated when FLAG_DEFLATE is set)
//! table    count u32 | { locator_len u32 | locator | offset u64 | stored_len u64 | raw_len u64 }*
//! footer   table_offset u64 | magic "GPAK"
//! ```
//!
//! The table trails the data so the writer never has to know compressed
//! sizes up front; readers start from the fixed-size footer.

use super::Resource;
use crate::bundler::Result;
use flate2::{Compression, write::DeflateEncoder};
use std::io::Write;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Leading and trailing magic.
pub const MAGIC: &[u8; 4] = b"GPAK";

/// Current format version.
pub const VERSION: u16 = 1;

/// Payloads are raw deflate streams.
pub const FLAG_DEFLATE: u16 = 0x0001;

/// Header length in bytes.
pub const HEADER_LEN: u64 = 8;

/// Footer length in bytes.
pub const FOOTER_LEN: u64 = 12;

/// Upper bound on locator length accepted by readers.
pub const MAX_LOCATOR_LEN: u32 = 4096;

/// File extension of archives.
pub const EXTENSION: &str = "pk";

/// Streams `resources` to `out` and returns the number of bytes written.
pub async fn write_archive<W>(resources: &[Resource], compress: bool, out: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let flags = if compress { FLAG_DEFLATE } else { 0 };
    out.write_all(MAGIC).await?;
    out.write_u16_le(VERSION).await?;
    out.write_u16_le(flags).await?;

    let mut position = HEADER_LEN;
    let mut table = Vec::with_capacity(resources.len());

    for resource in resources {
        let raw = resource.load().await?;
        let raw_len = raw.len() as u64;
        let stored_len = if compress {
            let packed = deflate(&raw)?;
            out.write_all(&packed).await?;
            packed.len() as u64
        } else {
            out.write_all(&raw).await?;
            raw_len
        };
        table.push((resource.locator(), position, stored_len, raw_len));
        position += stored_len;
    }

    let table_offset = position;
    out.write_u32_le(table.len() as u32).await?;
    position += 4;
    for (locator, offset, stored_len, raw_len) in table {
        out.write_u32_le(locator.len() as u32).await?;
        out.write_all(locator.as_bytes()).await?;
        out.write_u64_le(offset).await?;
        out.write_u64_le(stored_len).await?;
        out.write_u64_le(raw_len).await?;
        position += 4 + locator.len() as u64 + 24;
    }

    out.write_u64_le(table_offset).await?;
    out.write_all(MAGIC).await?;
    out.flush().await?;

    Ok(position + FOOTER_LEN)
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_archive_is_header_table_footer() {
        let mut out = Vec::new();
        let written = write_archive(&[], false, &mut out).await.unwrap();
        assert_eq!(written, HEADER_LEN + 4 + FOOTER_LEN);
        assert_eq!(out.len() as u64, written);
        assert_eq!(&out[..4], MAGIC);
        assert_eq!(&out[out.len() - 4..], MAGIC);
    }

    #[tokio::test]
    async fn table_offset_points_past_payloads() {
        let resources = vec![
            Resource::from_bytes("a", vec![1u8; 7]),
            Resource::from_bytes("b", vec![2u8; 3]),
        ];
        let mut out = Vec::new();
        write_archive(&resources, false, &mut out).await.unwrap();

        let footer = &out[out.len() - FOOTER_LEN as usize..];
        let table_offset = u64::from_le_bytes(footer[..8].try_into().unwrap());
        assert_eq!(table_offset, HEADER_LEN + 10);
        let count_at = table_offset as usize;
        assert_eq!(
            u32::from_le_bytes(out[count_at..count_at + 4].try_into().unwrap()),
            2
        );
    }
}
