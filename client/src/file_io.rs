//! Local file-backed [`ByteSource`]/[`ByteSink`] adapters for the client
//! side. Unlike the server, the client trusts whatever local path the caller
//! gave it — there's no storage-directory confinement to enforce here.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use shared::engine::{ByteSink, ByteSource};
use shared::error::TransferError;

pub struct FileSource {
    file: File,
    remaining: u64,
}

impl FileSource {
    pub async fn open(path: &Path) -> Result<(Self, u64), TransferError> {
        let file = File::open(path).await.map_err(TransferError::FileIo)?;
        let size = file.metadata().await.map_err(TransferError::FileIo)?.len();
        Ok((FileSource { file, remaining: size }, size))
    }
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

pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Downloads overwrite an existing destination file; the caller chose it.
    pub async fn create(path: &Path) -> Result<Self, TransferError> {
        let file = File::create(path).await.map_err(TransferError::FileIo)?;
        Ok(FileSink { file })
    }
}

impl ByteSink for FileSink {
    async fn write_chunk(&mut self, data: &[u8]) -> Result<(), TransferError> {
        self.file.write_all(data).await.map_err(TransferError::FileIo)
    }
}
