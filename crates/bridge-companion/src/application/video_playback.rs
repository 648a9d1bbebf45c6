//! Video frame reconstruction: undoes the XOR delta the host's
//! `RawVideoWorker` applies against its held reference frame and hands the
//! reconstructed frame to a sink.
//!
//! Actual on-screen rendering is a GUI concern and explicitly out of scope
//! here; [`FrameSink`] exists so this use case has something to hand
//! finished frames to, mirroring how `audio_playback` hands PCM to
//! `AudioSink`.

use bridge_core::protocol::messages::{RawVideoFrame, VideoConfigPayload, VideoFramePayload};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum VideoPlaybackError {
    #[error("frame payload size {got} does not match the held reference size {expected}")]
    SizeMismatch { got: usize, expected: usize },
}

/// Receives fully reconstructed raw frames. Implemented by a real renderer
/// in the infrastructure layer; test doubles record frames instead.
pub trait FrameSink: Send {
    fn present(&mut self, frame: &RawVideoFrame);
}

/// Consumes `VideoConfig`/`VideoFrame` messages and reconstructs the raw
/// pixel buffer from the host's keyframe + XOR-delta stream.
pub struct VideoPlaybackUseCase<S: FrameSink> {
    sink: S,
    reference: Option<Vec<u8>>,
    config: Option<VideoConfigPayload>,
    pub frames_presented: u64,
}

impl<S: FrameSink> VideoPlaybackUseCase<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            reference: None,
            config: None,
            frames_presented: 0,
        }
    }

    pub fn on_video_config(&mut self, payload: VideoConfigPayload) {
        debug!(codec = ?payload.codec, width = payload.width, height = payload.height, "video config negotiated");
        self.config = Some(payload);
    }

    pub fn config(&self) -> Option<&VideoConfigPayload> {
        self.config.as_ref()
    }

    /// Applies one incoming frame. `is_key_frame` comes from the message's
    /// `KeyFrame` flag, not the payload itself: the host always sends an
    /// uncompressed buffer on a keyframe and an XOR delta otherwise, and
    /// that distinction lives entirely in the framing flags.
    pub fn on_video_frame(&mut self, payload: VideoFramePayload, is_key_frame: bool) -> Result<(), VideoPlaybackError> {
        match payload {
            VideoFramePayload::Raw(frame) => self.on_raw_frame(frame, is_key_frame),
            VideoFramePayload::Encoded(frame) => {
                // No H.264/H.265 decoder ships with this crate; encoded
                // frames are acknowledged but not reconstructed.
                debug!(width = frame.width, height = frame.height, "encoded video frame received, decode out of scope");
                Ok(())
            }
        }
    }

    fn on_raw_frame(&mut self, frame: RawVideoFrame, is_key_frame: bool) -> Result<(), VideoPlaybackError> {
        let needs_new_reference = is_key_frame
            || self
                .reference
                .as_ref()
                .map(|r| r.len() != frame.pixels.len())
                .unwrap_or(true);

        if needs_new_reference {
            self.reference = Some(frame.pixels.clone());
            self.frames_presented += 1;
            self.sink.present(&frame);
            return Ok(());
        }

        let reference = self.reference.as_mut().expect("needs_new_reference handled the None case");
        if reference.len() != frame.pixels.len() {
            warn!("delta frame size mismatch despite matching reference, dropping");
            return Err(VideoPlaybackError::SizeMismatch {
                got: frame.pixels.len(),
                expected: reference.len(),
            });
        }

        for (r, d) in reference.iter_mut().zip(frame.pixels.iter()) {
            *r ^= d;
        }

        let reconstructed = RawVideoFrame {
            pixels: reference.clone(),
            ..frame
        };
        self.frames_presented += 1;
        self.sink.present(&reconstructed);
        Ok(())
    }
}
