use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use utils::ChannelSender;

use crate::error::{FusionClientError, Result};

/// Where downloaded bytes go, strictly in order.
pub(crate) enum SequentialOutput {
    File(FileOutput),
    Channel(ChannelSender),
}

impl SequentialOutput {
    pub async fn write(&mut self, data: Bytes) -> Result<()> {
        match self {
            SequentialOutput::File(file) => file.write(&data).await,
            SequentialOutput::Channel(sender) => {
                if sender.send(data).await {
                    Ok(())
                } else {
                    Err(FusionClientError::FileDownload("download stream was dropped by its reader".to_owned()))
                }
            },
        }
    }

    /// Flushes a file sink; a channel sink closes when dropped.
    pub async fn finish(self) -> Result<u64> {
        match self {
            SequentialOutput::File(file) => file.finish().await,
            SequentialOutput::Channel(_) => Ok(0),
        }
    }
}

/// A destination file, truncated on creation.  Any failure is reported as a write error on
/// `path`.
pub(crate) struct FileOutput {
    path: PathBuf,
    file: tokio::fs::File,
    written: u64,
}

impl FileOutput {
    pub async fn create(path: &Path) -> Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
            .await
            .map_err(|source| write_error(path, source))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            written: 0,
        })
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data).await.map_err(|source| write_error(&self.path, source))?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flushes buffered writes and returns the number of bytes written.
    pub async fn finish(mut self) -> Result<u64> {
        self.file.flush().await.map_err(|source| write_error(&self.path, source))?;
        Ok(self.written)
    }
}

fn write_error(path: &Path, source: std::io::Error) -> FusionClientError {
    FusionClientError::DestinationWrite {
        path: Some(path.to_path_buf()),
        source,
    }
}
