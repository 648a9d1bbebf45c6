//! Frame sink for reconstructed video.
//!
//! Presenting a reconstructed frame to a window is a GUI toolkit concern
//! and out of scope here; this sink just tracks the stream is alive so the
//! rest of the pipeline (`video_playback::VideoPlaybackUseCase`) has
//! somewhere real to hand finished frames.

use bridge_core::protocol::messages::RawVideoFrame;
use tracing::trace;

use crate::application::video_playback::FrameSink;

/// Records the most recently presented frame's metadata. A real GUI build
/// would swap this for a sink that blits `pixels` into a window surface.
pub struct LoggingFrameSink {
    last_frame_number: Option<i32>,
}

impl LoggingFrameSink {
    pub fn new() -> Self {
        Self { last_frame_number: None }
    }

    pub fn last_frame_number(&self) -> Option<i32> {
        self.last_frame_number
    }
}

impl Default for LoggingFrameSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for LoggingFrameSink {
    fn present(&mut self, frame: &RawVideoFrame) {
        trace!(width = frame.width, height = frame.height, frame_number = frame.frame_number, "frame reconstructed");
        self.last_frame_number = Some(frame.frame_number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_the_most_recently_presented_frame_number() {
        let mut sink = LoggingFrameSink::new();
        assert_eq!(sink.last_frame_number(), None);

        sink.present(&RawVideoFrame {
            width: 2,
            height: 2,
            stride: 8,
            frame_number: 7,
            pixels: vec![0; 16],
        });

        assert_eq!(sink.last_frame_number(), Some(7));
    }
}
