//! `cpal`-backed audio output.
//!
//! The `cpal::Stream` handle is not `Send` on every backend (CoreAudio and
//! WASAPI both wrap non-Send OS objects), so it is never stored directly on
//! [`CpalAudioSink`]. Instead, a dedicated `std::thread` owns the device
//! and stream for as long as the sink is configured, and is torn down by
//! dropping an `end_on_drop`
//! channel sender when `configure` is called again or the sink itself
//! drops. Samples cross the thread boundary through a shared ring buffer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, warn};

use crate::application::audio_playback::{AudioPlaybackError, AudioSink};

/// Samples retained in the ring buffer beyond which the oldest are
/// discarded, bounding memory if the device callback stalls.
const MAX_BUFFERED_SAMPLES: usize = 48_000 * 2; // ~1s of 48kHz stereo audio

pub struct CpalAudioSink {
    buffer: Arc<Mutex<VecDeque<i16>>>,
    end_on_drop: Option<std::sync::mpsc::Sender<()>>,
}

impl CpalAudioSink {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            end_on_drop: None,
        }
    }
}

impl Default for CpalAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for CpalAudioSink {
    fn configure(&mut self, sample_rate: u32, channels: u8) -> Result<(), AudioPlaybackError> {
        // Dropping the previous sender signals the old playback thread's
        // `recv()` to return, tearing down its stream before we start a new one.
        self.end_on_drop.take();
        self.buffer.lock().unwrap().clear();

        let (end_tx, end_rx) = std::sync::mpsc::channel::<()>();
        let buffer = self.buffer.clone();
        let config = cpal::StreamConfig {
            channels: channels as u16,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();
        std::thread::spawn(move || {
            let host = cpal::default_host();
            let device = match host.default_output_device() {
                Some(d) => d,
                None => {
                    let _ = ready_tx.send(Err("no default audio output device".to_string()));
                    return;
                }
            };

            let stream = device.build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let mut buf = buffer.lock().unwrap();
                    for sample in data.iter_mut() {
                        *sample = buf.pop_front().map(|s| s as f32 / i16::MAX as f32).unwrap_or(0.0);
                    }
                },
                |err| error!("cpal output stream error: {err}"),
                None,
            );

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            // Block forever to keep the stream alive until told to stop.
            let _ = end_rx.recv();
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.end_on_drop = Some(end_tx);
                Ok(())
            }
            Ok(Err(e)) => Err(AudioPlaybackError::Configure(e)),
            Err(_) => Err(AudioPlaybackError::Configure("audio output thread exited before starting".to_string())),
        }
    }

    fn push_samples(&mut self, samples: &[i16]) -> Result<(), AudioPlaybackError> {
        if self.end_on_drop.is_none() {
            return Err(AudioPlaybackError::Push("sink not configured".to_string()));
        }
        let mut buf = self.buffer.lock().unwrap();
        buf.extend(samples.iter().copied());
        while buf.len() > MAX_BUFFERED_SAMPLES {
            buf.pop_front();
            warn!("audio output buffer overflow, dropping oldest sample");
        }
        Ok(())
    }
}
