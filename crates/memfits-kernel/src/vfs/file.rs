//! An open backing file.
//!
//! The descriptor stays open from `open`/`create` until the last clone is
//! dropped at `release`, so reads and writes keep working after the path
//! is unlinked or renamed. All I/O is positional; clones share nothing
//! but the descriptor.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use super::error::{VfsError, VfsResult};

/// Shared handle to one open descriptor.
#[derive(Debug, Clone)]
pub struct OpenFile {
    file: Arc<File>,
}

impl OpenFile {
    pub fn new(file: File) -> Self {
        Self {
            file: Arc::new(file),
        }
    }

    /// Read up to `size` bytes at `offset`; short only at end of file.
    pub async fn read_at(&self, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        self.blocking(move |file| {
            let mut buffer = vec![0u8; size as usize];
            let mut filled = 0;
            // pread may return short counts before EOF
            while filled < buffer.len() {
                match file.read_at(&mut buffer[filled..], offset + filled as u64) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            buffer.truncate(filled);
            Ok(buffer)
        })
        .await
    }

    /// Write all of `data` at `offset`. With `O_APPEND` the kernel places
    /// the bytes at the end regardless of `offset`.
    pub async fn write_at(&self, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let data = data.to_vec();
        self.blocking(move |file| {
            file.write_all_at(&data, offset)?;
            Ok(data.len() as u32)
        })
        .await
    }

    pub async fn set_len(&self, len: u64) -> VfsResult<()> {
        self.blocking(move |file| file.set_len(len)).await
    }

    /// Flush to storage; `datasync` skips metadata.
    pub async fn sync(&self, datasync: bool) -> VfsResult<()> {
        self.blocking(move |file| {
            if datasync {
                file.sync_data()
            } else {
                file.sync_all()
            }
        })
        .await
    }

    async fn blocking<T, F>(&self, op: F) -> VfsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&File) -> io::Result<T> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || op(&file))
            .await
            .map_err(|e| VfsError::Io(io::Error::other(e)))?
            .map_err(VfsError::from)
    }
}
