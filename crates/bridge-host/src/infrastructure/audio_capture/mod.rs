//! Loopback audio capture contract.
//!
//! Like screen capture, the real implementation's poll call
//! (`IAudioCaptureClient::GetBuffer`) blocks/polls on its own schedule; there
//! is no sleep loop here either. [`AudioCapture::next_buffer`] is meant to be
//! driven from a dedicated OS capture-callback thread.
//!
//! # Sub-modules
//!
//! - **`windows`** – WASAPI loopback capture on the default render device.
//! - **`mock`** – A scripted in-memory capture source for unit tests.

pub mod mock;
#[cfg(target_os = "windows")]
pub mod windows;

use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors the audio capture source can report.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No default render device is present to loop back from.
    #[error("no audio device present")]
    NoDevice,
    /// The device's native mix format could not be represented.
    #[error("unsupported audio format: {0}")]
    FormatUnsupported(String),
    /// An underlying OS/driver call failed for a reason not covered above.
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// One captured buffer of interleaved PCM in the device's native format.
pub struct CapturedAudio {
    /// Interleaved samples, native format (typically 32-bit float).
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub timestamp: Instant,
}

/// Drives a loopback audio capture stream.
pub trait AudioCapture: Send {
    /// Polls for the next buffer, waiting up to `timeout`.
    ///
    /// Returns `Ok(None)` when the device had nothing new within the
    /// timeout — a normal idle return, not an error.
    fn next_buffer(&mut self, timeout: Duration) -> Result<Option<CapturedAudio>, AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_audio_carries_format_fields() {
        let buf = CapturedAudio {
            samples: vec![0.0; 4],
            channels: 2,
            sample_rate: 48_000,
            timestamp: Instant::now(),
        };
        assert_eq!(buf.channels, 2);
        assert_eq!(buf.sample_rate, 48_000);
    }
}
