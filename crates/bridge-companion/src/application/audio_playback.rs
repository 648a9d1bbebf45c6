//! Audio playback: jitter-buffers incoming `AudioData` packets and hands
//! them to the platform audio sink, honoring `AudioConfig` and
//! `AudioControl` routing.
//!
//! Mirrors the shape of the host's `audio_pipeline`/`video_pipeline`: a
//! small bounded backlog (`DropOldest` when full) sits between network
//! arrival and the consumer, here the OS audio callback instead of the
//! network socket.

use std::collections::VecDeque;

use bridge_core::protocol::messages::{AudioConfigPayload, AudioDataPayload, AudioRouting};
use thiserror::Error;
use tracing::{debug, warn};

/// Packets buffered before being handed to the sink, beyond which the
/// oldest pending packet is dropped.
const MAX_PENDING: usize = 5;

#[derive(Debug, Error)]
pub enum AudioPlaybackError {
    #[error("failed to configure audio output: {0}")]
    Configure(String),
    #[error("failed to push samples to audio output: {0}")]
    Push(String),
}

/// The OS-facing audio output. Implemented over `cpal` in the
/// infrastructure layer; test doubles record calls instead.
pub trait AudioSink: Send {
    /// (Re)configures the output stream. Called whenever an `AudioConfig`
    /// message negotiates a new sample rate or channel count.
    fn configure(&mut self, sample_rate: u32, channels: u8) -> Result<(), AudioPlaybackError>;
    /// Enqueues decoded PCM16 samples for playback.
    fn push_samples(&mut self, samples: &[i16]) -> Result<(), AudioPlaybackError>;
}

/// Consumes `AudioConfig`/`AudioData`/`AudioControl` messages and drives an
/// [`AudioSink`].
pub struct AudioPlaybackUseCase<S: AudioSink> {
    sink: S,
    pending: VecDeque<AudioDataPayload>,
    routing: AudioRouting,
    configured: bool,
    pub packets_played: u64,
    pub packets_dropped: u64,
}

impl<S: AudioSink> AudioPlaybackUseCase<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            pending: VecDeque::with_capacity(MAX_PENDING),
            routing: AudioRouting::WindowsToMac,
            configured: false,
            packets_played: 0,
            packets_dropped: 0,
        }
    }

    /// Negotiates the output stream's format. Must be called before the
    /// first `AudioData` packet for gapless playback, though a packet
    /// arriving first is simply buffered until this runs.
    pub fn on_audio_config(&mut self, payload: AudioConfigPayload) -> Result<(), AudioPlaybackError> {
        self.sink.configure(payload.sample_rate, payload.channels)?;
        self.configured = true;
        Ok(())
    }

    /// Updates which direction(s) of audio are currently allowed to play.
    pub fn on_audio_control(&mut self, routing: AudioRouting) {
        debug!(?routing, "audio routing changed");
        self.routing = routing;
        if !self.routing_allows_playback() {
            self.pending.clear();
        }
    }

    /// Buffers one decoded packet and, if playback is currently permitted,
    /// immediately drains the backlog into the sink.
    pub fn on_audio_data(&mut self, payload: AudioDataPayload) -> Result<(), AudioPlaybackError> {
        if !self.routing_allows_playback() {
            return Ok(());
        }

        if self.pending.len() >= MAX_PENDING {
            self.pending.pop_front();
            self.packets_dropped += 1;
            debug!("audio jitter buffer full, dropped oldest packet");
        }
        self.pending.push_back(payload);

        self.drain()
    }

    fn routing_allows_playback(&self) -> bool {
        matches!(self.routing, AudioRouting::WindowsToMac | AudioRouting::Both)
    }

    fn drain(&mut self) -> Result<(), AudioPlaybackError> {
        while let Some(packet) = self.pending.pop_front() {
            match self.sink.push_samples(&packet.pcm) {
                Ok(()) => self.packets_played += 1,
                Err(e) => {
                    warn!("audio sink rejected packet, continuing: {e}");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        configured: Option<(u32, u8)>,
        played: Vec<Vec<i16>>,
    }

    impl AudioSink for RecordingSink {
        fn configure(&mut self, sample_rate: u32, channels: u8) -> Result<(), AudioPlaybackError> {
            self.configured = Some((sample_rate, channels));
            Ok(())
        }
        fn push_samples(&mut self, samples: &[i16]) -> Result<(), AudioPlaybackError> {
            self.played.push(samples.to_vec());
            Ok(())
        }
    }

    fn payload(pcm: Vec<i16>) -> AudioDataPayload {
        AudioDataPayload { timestamp_us: 0, pcm }
    }

    #[test]
    fn default_routing_plays_windows_to_mac_audio() {
        let mut uc = AudioPlaybackUseCase::new(RecordingSink::default());
        uc.on_audio_data(payload(vec![1, 2, 3])).unwrap();

        assert_eq!(uc.packets_played, 1);
        assert_eq!(uc.sink.played, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn muted_routing_drops_incoming_packets() {
        let mut uc = AudioPlaybackUseCase::new(RecordingSink::default());
        uc.on_audio_control(AudioRouting::Muted);
        uc.on_audio_data(payload(vec![1, 2, 3])).unwrap();

        assert_eq!(uc.packets_played, 0);
        assert!(uc.sink.played.is_empty());
    }

    #[test]
    fn mac_to_windows_routing_suppresses_local_playback() {
        let mut uc = AudioPlaybackUseCase::new(RecordingSink::default());
        uc.on_audio_control(AudioRouting::MacToWindows);
        uc.on_audio_data(payload(vec![4, 5])).unwrap();

        assert_eq!(uc.packets_played, 0);
    }

    #[test]
    fn switching_back_to_both_resumes_playback() {
        let mut uc = AudioPlaybackUseCase::new(RecordingSink::default());
        uc.on_audio_control(AudioRouting::Muted);
        uc.on_audio_data(payload(vec![1])).unwrap();
        uc.on_audio_control(AudioRouting::Both);
        uc.on_audio_data(payload(vec![2])).unwrap();

        assert_eq!(uc.packets_played, 1);
        assert_eq!(uc.sink.played, vec![vec![2]]);
    }

    #[test]
    fn audio_config_configures_the_sink() {
        let mut uc = AudioPlaybackUseCase::new(RecordingSink::default());
        uc.on_audio_config(AudioConfigPayload {
            sample_rate: 48_000,
            channels: 2,
            bits_per_sample: 16,
            buffer_ms: 20,
        })
        .unwrap();

        assert_eq!(uc.sink.configured, Some((48_000, 2)));
    }

    #[test]
    fn jitter_buffer_drops_oldest_when_sink_is_never_drained_externally() {
        // Since `drain` runs synchronously inside `on_audio_data`, the
        // backlog here only grows if pushes are queued without draining in
        // between — exercise that by manually filling `pending`.
        let mut uc = AudioPlaybackUseCase::new(RecordingSink::default());
        for i in 0..(MAX_PENDING + 2) {
            uc.pending.push_back(payload(vec![i as i16]));
        }
        assert_eq!(uc.pending.len(), MAX_PENDING + 2);

        uc.on_audio_data(payload(vec![99])).unwrap();
        assert_eq!(uc.packets_dropped, 1);
    }
}
