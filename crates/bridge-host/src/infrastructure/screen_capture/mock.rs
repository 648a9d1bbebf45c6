//! A scripted screen capture source for tests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{CaptureError, CaptureOutcome, CapturedFrame, PixelBufferPool, PooledBuffer, ScreenCapture};

/// One scripted capture response.
pub enum ScriptedEvent {
    /// Deliver a frame with the given pixel contents (width/height/stride
    /// derived from `pixels.len()` assuming a 1-row-per-call caller, or
    /// explicit dims via [`ScriptedEvent::frame_with_dims`]).
    Frame(Vec<u8>, u32, u32, u32),
    /// Cursor-only update — must surface as [`CaptureOutcome::NoChange`].
    NoChange,
    /// The next call fails with the given error.
    Fail(CaptureError),
}

/// A [`ScreenCapture`] driven entirely by a pre-programmed script, used to
/// exercise the video pipeline's keyframe/delta/skip logic deterministically.
pub struct MockScreenCapture {
    script: VecDeque<ScriptedEvent>,
    pool: PixelBufferPool,
    frame_number: u32,
}

impl MockScreenCapture {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            pool: PixelBufferPool::new(4),
            frame_number: 0,
        }
    }

    pub fn push_frame(&mut self, pixels: Vec<u8>, width: u32, height: u32, stride: u32) {
        self.script
            .push_back(ScriptedEvent::Frame(pixels, width, height, stride));
    }

    pub fn push_no_change(&mut self) {
        self.script.push_back(ScriptedEvent::NoChange);
    }

    pub fn push_failure(&mut self, err: CaptureError) {
        self.script.push_back(ScriptedEvent::Fail(err));
    }

    /// Outstanding rent/return balance on the internal pixel pool.
    pub fn outstanding_buffers(&self) -> i64 {
        self.pool.outstanding()
    }
}

impl Default for MockScreenCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenCapture for MockScreenCapture {
    fn next_frame(&mut self, _timeout: Duration) -> Result<CaptureOutcome, CaptureError> {
        match self.script.pop_front() {
            Some(ScriptedEvent::Frame(pixels, width, height, stride)) => {
                let mut buf: PooledBuffer = self.pool.acquire(pixels.len());
                buf.copy_from_slice(&pixels);
                self.frame_number += 1;
                Ok(CaptureOutcome::Frame(CapturedFrame {
                    pixels: buf,
                    width,
                    height,
                    stride,
                    timestamp: Instant::now(),
                    frame_number: self.frame_number,
                }))
            }
            Some(ScriptedEvent::NoChange) => Ok(CaptureOutcome::NoChange),
            Some(ScriptedEvent::Fail(err)) => Err(err),
            None => Ok(CaptureOutcome::NoChange),
        }
    }

    fn return_buffer(&mut self, buffer: PooledBuffer) {
        self.pool.release(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_scripted_frame() {
        let mut mock = MockScreenCapture::new();
        mock.push_frame(vec![1, 2, 3, 4], 1, 1, 4);

        match mock.next_frame(Duration::from_millis(16)).unwrap() {
            CaptureOutcome::Frame(f) => {
                assert_eq!(&*f.pixels, &[1, 2, 3, 4]);
                assert_eq!(f.frame_number, 1);
                mock.return_buffer(f.pixels);
            }
            CaptureOutcome::NoChange => panic!("expected a frame"),
        }
        assert_eq!(mock.outstanding_buffers(), 0);
    }

    #[test]
    fn cursor_only_update_surfaces_as_no_change() {
        let mut mock = MockScreenCapture::new();
        mock.push_no_change();
        assert!(matches!(
            mock.next_frame(Duration::from_millis(16)).unwrap(),
            CaptureOutcome::NoChange
        ));
    }

    #[test]
    fn scripted_failure_propagates() {
        let mut mock = MockScreenCapture::new();
        mock.push_failure(CaptureError::AccessLostUnrecoverable);
        assert!(matches!(
            mock.next_frame(Duration::from_millis(16)),
            Err(CaptureError::AccessLostUnrecoverable)
        ));
    }

    #[test]
    fn exhausted_script_is_no_change() {
        let mut mock = MockScreenCapture::new();
        assert!(matches!(
            mock.next_frame(Duration::from_millis(16)).unwrap(),
            CaptureOutcome::NoChange
        ));
    }
}
