//! Build-once, read-many state for one open of the synthetic file.
//!
//! A session starts unbuilt. The first `read_chunk` renders the whole
//! image under the session lock and publishes it; every later read,
//! from any thread and at any offset, slices that buffer. Release drops
//! it, and the next open starts over.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::fits::{FitsImage, FitsResult};

/// One open→read*→release cycle against the synthetic file.
#[derive(Debug)]
pub struct VirtualFileSession {
    image: Arc<FitsImage>,
    /// `None` until the first successful build, and again after release.
    buffer: Mutex<Option<Arc<[u8]>>>,
    builds: AtomicU64,
}

impl VirtualFileSession {
    /// Begin a session. Nothing is rendered yet.
    pub fn open(image: Arc<FitsImage>) -> Self {
        Self {
            image,
            buffer: Mutex::new(None),
            builds: AtomicU64::new(0),
        }
    }

    /// Read up to `len` bytes at `offset`, building the image first if
    /// this is the session's first read.
    ///
    /// The result is clipped to the end of the image; reads at or past the
    /// end return an empty vector. A failed build leaves the session
    /// unbuilt so the next read can try again.
    pub fn read_chunk(&self, offset: u64, len: usize) -> FitsResult<Vec<u8>> {
        let buffer = self.buffer()?;
        let total = buffer.len();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(total);
        let end = start.saturating_add(len).min(total);
        Ok(buffer[start..end].to_vec())
    }

    /// Drop the buffer. Safe to call more than once.
    pub fn release(&self) {
        if self.buffer.lock().take().is_some() {
            tracing::debug!("released synthetic image buffer");
        }
    }

    pub fn is_built(&self) -> bool {
        self.buffer.lock().is_some()
    }

    /// Number of times this session rendered the image.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Acquire)
    }

    /// Return the built buffer, rendering it if needed.
    ///
    /// The lock is held for the whole build, so concurrent first reads
    /// wait for one build instead of racing to start their own.
    fn buffer(&self) -> FitsResult<Arc<[u8]>> {
        let mut slot = self.buffer.lock();
        if let Some(buffer) = slot.as_ref() {
            return Ok(Arc::clone(buffer));
        }

        let rendered: Arc<[u8]> = match self.image.render() {
            Ok(bytes) => bytes.into(),
            Err(e) => {
                tracing::warn!(error = %e, "synthetic image build failed");
                return Err(e);
            }
        };
        self.builds.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(size = rendered.len(), "built synthetic image");

        *slot = Some(Arc::clone(&rendered));
        Ok(rendered)
    }
}
