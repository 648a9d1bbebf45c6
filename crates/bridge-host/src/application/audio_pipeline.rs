//! Audio capture/convert/send pipeline: drains captured loopback buffers
//! from a dedicated OS capture thread, converts them to the wire format,
//! and ships them to the companion over a bounded DropOldest queue.
//!
//! Mirrors the shape of [`crate::application::video_pipeline`]: capture is a
//! blocking OS call running on a dedicated `std::thread`; conversion and
//! send happen on a single long-running `tokio` task so a slow companion
//! link never stalls capture.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bridge_core::protocol::messages::AudioDataPayload;
use bridge_core::queue::DropOldestQueue;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::infrastructure::audio_capture::{AudioCapture, AudioError, CapturedAudio};

/// Silence threshold for float samples; a buffer whose samples are all
/// within this of zero is dropped rather than sent.
const SILENCE_EPSILON: f32 = 1e-4;

#[derive(Debug, Error)]
pub enum AudioPipelineError {
    #[error("failed to send audio data: {0}")]
    Send(String),
}

/// Sends an encoded `AudioData` payload to the companion.
#[async_trait]
pub trait AudioSender: Send + Sync {
    async fn send_audio_data(&self, payload: Vec<u8>) -> Result<(), AudioPipelineError>;
}

/// Runs the blocking capture call on a dedicated OS thread and feeds
/// buffers into `queue`, matching [`crate::application::video_pipeline::spawn_capture_producer`]'s
/// shape.
pub fn spawn_capture_producer(
    mut capture: Box<dyn AudioCapture>,
    queue: Arc<DropOldestQueue<CapturedAudio>>,
    timeout: Duration,
    cancel: CancellationToken,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !cancel.is_cancelled() {
            match capture.next_buffer(timeout) {
                Ok(Some(buf)) => {
                    if let Some(_evicted) = queue.push(buf) {
                        debug!("audio queue full, dropping oldest buffer");
                    }
                }
                Ok(None) => {}
                Err(AudioError::NoDevice) => {
                    warn!("no loopback audio device present, stopping producer");
                    break;
                }
                Err(e) => {
                    warn!("audio capture error: {e}");
                }
            }
        }
    })
}

/// Returns `true` if every sample in `samples` is within `SILENCE_EPSILON`
/// of zero.
fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|s| s.abs() <= SILENCE_EPSILON)
}

/// Converts a float sample in `[-1.0, 1.0]` to `i16`, clamping out-of-range
/// input before scaling by `i16::MAX`.
fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Linearly resamples a single channel's samples from `from_rate` to
/// `to_rate`.
fn resample_channel(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

/// Deinterleaves `samples` into `channels` separate channel buffers,
/// resamples each independently, then re-interleaves the result.
fn resample_interleaved(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || channels == 0 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    let mut per_channel: Vec<Vec<f32>> = vec![Vec::new(); channels];
    for (i, &s) in samples.iter().enumerate() {
        per_channel[i % channels].push(s);
    }

    let resampled: Vec<Vec<f32>> = per_channel
        .iter()
        .map(|ch| resample_channel(ch, from_rate, to_rate))
        .collect();

    let out_len = resampled.first().map(|c| c.len()).unwrap_or(0);
    let mut out = Vec::with_capacity(out_len * channels);
    for i in 0..out_len {
        for ch in &resampled {
            out.push(ch[i]);
        }
    }
    out
}

/// Converts one captured buffer to the wire's `AudioDataPayload`, applying
/// the silence predicate, Float32->Int16 conversion, and resampling (when
/// the capture rate differs from the configured send rate).
///
/// Returns `None` if the buffer was silent and should be dropped entirely.
fn convert(buf: &CapturedAudio, target_rate: u32, epoch: Instant) -> Option<AudioDataPayload> {
    if is_silent(&buf.samples) {
        return None;
    }

    let resampled = resample_interleaved(&buf.samples, buf.channels, buf.sample_rate, target_rate);
    let pcm: Vec<i16> = resampled.iter().copied().map(f32_to_i16).collect();
    let timestamp_us = buf.timestamp.duration_since(epoch).as_micros() as i64;

    Some(AudioDataPayload { timestamp_us, pcm })
}

/// Drains the capture queue, converts buffers, and sends them to the
/// companion.
pub struct AudioWorker<S: AudioSender> {
    queue: Arc<DropOldestQueue<CapturedAudio>>,
    sender: S,
    target_rate: u32,
    epoch: Instant,
    pub buffers_sent: u64,
    pub buffers_silent: u64,
}

impl<S: AudioSender> AudioWorker<S> {
    pub fn new(queue: Arc<DropOldestQueue<CapturedAudio>>, sender: S, target_rate: u32, epoch: Instant) -> Self {
        Self {
            queue,
            sender,
            target_rate,
            epoch,
            buffers_sent: 0,
            buffers_silent: 0,
        }
    }

    /// Runs until `cancel` fires, processing one buffer per queue pop.
    pub async fn run(&mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                buf = self.queue.pop() => {
                    if let Err(e) = self.process_buffer(&buf).await {
                        warn!("audio send failed, continuing: {e}");
                    }
                }
            }
        }
    }

    async fn process_buffer(&mut self, buf: &CapturedAudio) -> Result<(), AudioPipelineError> {
        match convert(buf, self.target_rate, self.epoch) {
            Some(payload) => {
                self.sender
                    .send_audio_data(bridge_core::protocol::codec::encode_audio_data(&payload))
                    .await?;
                self.buffers_sent += 1;
                Ok(())
            }
            None => {
                self.buffers_silent += 1;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl AudioSender for RecordingSender {
        async fn send_audio_data(&self, payload: Vec<u8>) -> Result<(), AudioPipelineError> {
            self.sent.lock().unwrap().push(payload);
            Ok(())
        }
    }

    fn buffer(samples: Vec<f32>, channels: u16, sample_rate: u32) -> CapturedAudio {
        CapturedAudio {
            samples,
            channels,
            sample_rate,
            timestamp: Instant::now(),
        }
    }

    fn worker() -> AudioWorker<RecordingSender> {
        let queue = Arc::new(DropOldestQueue::new(10));
        AudioWorker::new(queue, RecordingSender::default(), 48_000, Instant::now())
    }

    #[test]
    fn is_silent_detects_near_zero_buffer() {
        assert!(is_silent(&[0.0, 0.00001, -0.00001]));
        assert!(!is_silent(&[0.0, 0.5]));
    }

    #[test]
    fn f32_to_i16_clamps_out_of_range() {
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), -i16::MAX);
    }

    #[test]
    fn f32_to_i16_maps_full_scale() {
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(0.0), 0);
    }

    #[test]
    fn resample_channel_passes_through_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        let out = resample_channel(&samples, 48_000, 48_000);
        assert_eq!(out, samples);
    }

    #[test]
    fn resample_channel_upsamples_longer() {
        let samples = vec![0.0, 1.0];
        let out = resample_channel(&samples, 24_000, 48_000);
        assert!(out.len() > samples.len());
    }

    #[test]
    fn resample_channel_downsamples_shorter() {
        let samples = vec![0.0, 0.5, 1.0, 0.5];
        let out = resample_channel(&samples, 48_000, 24_000);
        assert!(out.len() < samples.len());
    }

    #[tokio::test]
    async fn silent_buffer_is_dropped_not_sent() {
        let mut worker = worker();
        let buf = buffer(vec![0.0; 8], 2, 48_000);
        worker.process_buffer(&buf).await.unwrap();

        assert_eq!(worker.buffers_sent, 0);
        assert_eq!(worker.buffers_silent, 1);
        assert!(worker.sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn loud_buffer_at_matching_rate_is_sent() {
        let mut worker = worker();
        let buf = buffer(vec![0.5, -0.5, 0.25, -0.25], 2, 48_000);
        worker.process_buffer(&buf).await.unwrap();

        assert_eq!(worker.buffers_sent, 1);
        assert_eq!(worker.buffers_silent, 0);
        assert_eq!(worker.sender.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn buffer_at_different_rate_is_resampled_before_send() {
        let mut worker = worker();
        worker.target_rate = 48_000;
        let buf = buffer(vec![0.5, -0.5, 0.25, -0.25, 0.1, -0.1], 2, 24_000);
        worker.process_buffer(&buf).await.unwrap();

        assert_eq!(worker.buffers_sent, 1);
        let sent = worker.sender.sent.lock().unwrap();
        let decoded = bridge_core::protocol::codec::decode_audio_data(&sent[0]).unwrap();
        // Upsampling 2x should roughly double the per-channel sample count.
        assert!(decoded.pcm.len() > 6);
    }
}
