//! File-backed [`ByteSource`]/[`ByteSink`] adapters and the storage-directory
//! lookup rules for the two operations a session can request.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use shared::engine::{ByteSink, ByteSource};
use shared::error::TransferError;

pub struct FileSink {
    file: File,
}

impl ByteSink for FileSink {
    async fn write_chunk(&mut self, data: &[u8]) -> Result<(), TransferError> {
        self.file.write_all(data).await.map_err(TransferError::FileIo)
    }
}

pub struct FileSource {
    file: File,
    remaining: u64,
}

impl ByteSource for FileSource {
    async fn read_chunk(&mut self, max: usize) -> Result<(Vec<u8>, bool), TransferError> {
        let take = (self.remaining as usize).min(max);
        let mut buf = vec![0u8; take];
        if take > 0 {
            self.file
                .read_exact(&mut buf)
                .await
                .map_err(TransferError::FileIo)?;
        }
        self.remaining -= take as u64;
        Ok((buf, self.remaining == 0))
    }
}

/// Opens `name` for an UPLOAD: the file must not already exist.
pub async fn open_for_upload(storage_dir: &Path, name: &str) -> Result<FileSink, TransferError> {
    let path = resolve(storage_dir, name)?;
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => TransferError::FileExists,
            _ => TransferError::FileIo(e),
        })?;
    Ok(FileSink { file })
}

/// Opens `name` for a DOWNLOAD, returning the source plus its size for the
/// SYN-ACK's `file_size` field.
pub async fn open_for_download(
    storage_dir: &Path,
    name: &str,
) -> Result<(FileSource, u64), TransferError> {
    let path = resolve(storage_dir, name)?;
    let file = File::open(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TransferError::FileNotFound,
        _ => TransferError::FileIo(e),
    })?;
    let size = file.metadata().await.map_err(TransferError::FileIo)?.len();
    Ok((FileSource { file, remaining: size }, size))
}

/// Rejects remote names that would escape the storage directory.
fn resolve(storage_dir: &Path, name: &str) -> Result<PathBuf, TransferError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
        return Err(TransferError::FileIo(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "remote name must be a bare filename",
        )));
    }
    Ok(storage_dir.join(name))
}
