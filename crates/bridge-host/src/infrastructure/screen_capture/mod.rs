//! Screen capture contract and pixel buffer pool.
//!
//! The capture primitive is a blocking OS call (Windows Desktop Duplication's
//! `AcquireNextFrame`): pacing comes from that call's own timeout, never from
//! a sleep loop. [`ScreenCapture::next_frame`] is meant to be driven from a
//! dedicated OS thread (see `bridge_host::application::video_pipeline`), not
//! a `tokio` task — it genuinely blocks for up to `timeout`.
//!
//! # Sub-modules
//!
//! - **`windows`** – DXGI Desktop Duplication implementation.
//! - **`mock`** – A scripted in-memory capture source for unit tests.

pub mod mock;
#[cfg(target_os = "windows")]
pub mod windows;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors a screen capture source can report.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No display adapter / output is attached for the requested monitor.
    #[error("capture device not present")]
    DeviceNotPresent,
    /// The OS refused to grant desktop capture (e.g. a secure desktop / UAC
    /// prompt is active).
    #[error("access denied to capture the desktop")]
    AccessDenied,
    /// Access was lost (monitor unplug, mode change, secure-desktop
    /// transition) and could not be recovered after exhausting retries.
    #[error("capture access lost and could not be recovered")]
    AccessLostUnrecoverable,
    /// An underlying OS/driver call failed for a reason not covered above.
    #[error("capture backend error: {0}")]
    Backend(String),
}

/// One captured desktop image, with pixels rented from a [`PixelBufferPool`].
pub struct CapturedFrame {
    /// BGRA8 pixel data, `stride * height` bytes, rented from the pool.
    pub pixels: PooledBuffer,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub timestamp: Instant,
    pub frame_number: u32,
}

/// Outcome of one `next_frame` poll.
pub enum CaptureOutcome {
    /// A frame with new desktop content.
    Frame(CapturedFrame),
    /// The capture call returned but carried no new image (cursor-only
    /// update, or the timeout elapsed with nothing new) — must not be
    /// forwarded to the video pipeline.
    NoChange,
}

/// Drives a single monitor's capture stream.
///
/// Implementations are not required to be `Sync`; capture sources are driven
/// from exactly one dedicated thread.
pub trait ScreenCapture: Send {
    /// Blocks up to `timeout` waiting for the next frame.
    ///
    /// Returns [`CaptureOutcome::NoChange`] on a cursor-only update or a
    /// timed-out poll with nothing new — both are normal idle returns, not
    /// errors. On [`CaptureError::AccessLostUnrecoverable`] the caller should
    /// treat the capture pipeline as fatally broken; any other error is
    /// retried internally by the implementation before surfacing.
    fn next_frame(&mut self, timeout: Duration) -> Result<CaptureOutcome, CaptureError>;

    /// Returns a previously rented pixel buffer to the pool. Must be called
    /// on every exit path once a [`CapturedFrame`]'s pixels are no longer
    /// needed — a dropped, unreturned buffer is a leak.
    fn return_buffer(&mut self, buffer: PooledBuffer);
}

/// A pixel buffer rented from a [`PixelBufferPool`].
///
/// Carries its pool-assigned id so [`PixelBufferPool::release`] can track
/// rent/return balance; does not auto-return on `Drop` — callers must return
/// it explicitly so that silently dropping a frame is visibly a bug rather
/// than a buffer silently vanishing back into the pool.
#[derive(Debug)]
pub struct PooledBuffer {
    id: u64,
    data: Vec<u8>,
}

impl PooledBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// A pool of reusable BGRA pixel buffers, grounded in the same
/// acquire/release/leak-accounting shape used for encode buffers elsewhere in
/// the pipeline — sized lazily, since monitor resolution is only known once
/// capture starts.
pub struct PixelBufferPool {
    available: VecDeque<PooledBuffer>,
    next_id: u64,
    rented: u64,
    returned: u64,
    max_pool_size: usize,
}

impl PixelBufferPool {
    pub fn new(max_pool_size: usize) -> Self {
        Self {
            available: VecDeque::new(),
            next_id: 0,
            rented: 0,
            returned: 0,
            max_pool_size,
        }
    }

    /// Rents a buffer of at least `len` bytes, reusing a pooled one if it's
    /// large enough, otherwise allocating fresh.
    pub fn acquire(&mut self, len: usize) -> PooledBuffer {
        self.rented += 1;
        if let Some(pos) = self.available.iter().position(|b| b.data.len() >= len) {
            let mut buf = self.available.remove(pos).expect("position just checked");
            buf.data.truncate(len);
            return buf;
        }
        let id = self.next_id;
        self.next_id += 1;
        PooledBuffer {
            id,
            data: vec![0u8; len],
        }
    }

    /// Returns a rented buffer to the pool.
    pub fn release(&mut self, buffer: PooledBuffer) {
        self.returned += 1;
        if self.available.len() < self.max_pool_size {
            self.available.push_back(buffer);
        }
    }

    /// Rent count minus return count — must be zero at session end.
    pub fn outstanding(&self) -> i64 {
        self.rented as i64 - self.returned as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_allocates_when_pool_empty() {
        let mut pool = PixelBufferPool::new(2);
        let buf = pool.acquire(64);
        assert_eq!(buf.len(), 64);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn release_then_acquire_reuses_buffer() {
        let mut pool = PixelBufferPool::new(2);
        let buf = pool.acquire(64);
        let id = buf.id();
        pool.release(buf);
        assert_eq!(pool.outstanding(), 0);

        let buf2 = pool.acquire(64);
        assert_eq!(buf2.id(), id);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn pool_drops_buffers_beyond_max_size() {
        let mut pool = PixelBufferPool::new(1);
        let a = pool.acquire(16);
        let b = pool.acquire(16);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.available.len(), 1);
    }

    #[test]
    fn outstanding_reflects_unreturned_rents() {
        let mut pool = PixelBufferPool::new(4);
        let a = pool.acquire(16);
        let _b = pool.acquire(16);
        pool.release(a);
        assert_eq!(pool.outstanding(), 1);
    }
}
