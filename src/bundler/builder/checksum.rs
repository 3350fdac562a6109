//! Artifact checksum calculation.
//!
//! SHA-256 over single files (archives, executables) and directory trees
//! (loose-media mirrors).

use crate::{
    bail,
    bundler::{Result, error::ErrorExt},
};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Calculates SHA256 checksum of a file or directory.
///
/// Directories are hashed file by file in sorted path order, each file
/// contributing its relative path and then its content.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact", path)?;

    let mut hasher = Sha256::new();
    if metadata.is_file() {
        hash_file(&mut hasher, path).await?;
    } else if metadata.is_dir() {
        for file in sorted_files(path)? {
            if let Ok(rel_path) = file.strip_prefix(path) {
                hasher.update(rel_path.to_string_lossy().replace('\\', "/").as_bytes());
            }
            hash_file(&mut hasher, &file).await?;
        }
    } else {
        bail!("Path is neither file nor directory: {}", path.display())
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Size of a file, or the summed size of every file under a directory.
pub async fn artifact_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact", path)?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    let mut total = 0;
    for file in sorted_files(path)? {
        total += tokio::fs::metadata(&file)
            .await
            .fs_context("reading artifact", &file)?
            .len();
    }
    Ok(total)
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

async fn hash_file(hasher: &mut Sha256, file_path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::open(file_path)
        .await
        .fs_context("opening file for hashing", file_path)?;
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", file_path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(())
}
