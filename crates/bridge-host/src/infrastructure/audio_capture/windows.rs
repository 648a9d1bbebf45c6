//! WASAPI loopback audio capture on the default render device.
//!
//! Loopback capture mirrors whatever is playing on the system's default
//! output device — there is no cross-platform abstraction for this (cpal
//! does not expose WASAPI loopback), so this talks to `IAudioClient`
//! directly with `AUDCLNT_STREAMFLAGS_LOOPBACK`.

use std::time::{Duration, Instant};

use tracing::debug;
use windows::Win32::Media::Audio::{
    eConsole, eRender, IAudioCaptureClient, IAudioClient, IMMDeviceEnumerator, MMDeviceEnumerator,
    AUDCLNT_BUFFERFLAGS_SILENT, AUDCLNT_SHAREMODE_SHARED, AUDCLNT_STREAMFLAGS_LOOPBACK,
    WAVEFORMATEX,
};
use windows::Win32::System::Com::{CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_MULTITHREADED};

use super::{AudioCapture, AudioError, CapturedAudio};

/// REFTIMES_PER_SEC equivalent buffer duration request (100ns units, 200ms).
const BUFFER_DURATION_100NS: i64 = 2_000_000;

pub struct WasapiLoopbackCapture {
    audio_client: IAudioClient,
    capture_client: IAudioCaptureClient,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    block_align: u32,
}

impl WasapiLoopbackCapture {
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| AudioError::Backend(e.message()))?;

            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| AudioError::Backend(e.message()))?;

            let device = enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|_| AudioError::NoDevice)?;

            let audio_client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| AudioError::Backend(e.message()))?;

            let format_ptr = audio_client
                .GetMixFormat()
                .map_err(|e| AudioError::Backend(e.message()))?;
            let format: WAVEFORMATEX = *format_ptr;

            audio_client
                .Initialize(
                    AUDCLNT_SHAREMODE_SHARED,
                    AUDCLNT_STREAMFLAGS_LOOPBACK,
                    BUFFER_DURATION_100NS,
                    0,
                    format_ptr,
                    None,
                )
                .map_err(|e| AudioError::Backend(e.message()))?;

            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| AudioError::Backend(e.message()))?;

            audio_client
                .Start()
                .map_err(|e| AudioError::Backend(e.message()))?;

            if format.wFormatTag != 3 /* WAVE_FORMAT_IEEE_FLOAT */ && format.wBitsPerSample != 32 {
                return Err(AudioError::FormatUnsupported(format!(
                    "unsupported mix format tag {} / {} bits",
                    format.wFormatTag, format.wBitsPerSample
                )));
            }

            Ok(Self {
                audio_client,
                capture_client,
                channels: format.nChannels,
                sample_rate: format.nSamplesPerSec,
                bits_per_sample: format.wBitsPerSample,
                block_align: format.nBlockAlign as u32,
            })
        }
    }
}

impl AudioCapture for WasapiLoopbackCapture {
    fn next_buffer(&mut self, timeout: Duration) -> Result<Option<CapturedAudio>, AudioError> {
        // WASAPI's shared-mode capture is poll-driven: GetNextPacketSize
        // returning 0 is the normal "nothing new yet" idle case. We spin the
        // poll at a short interval bounded by `timeout` rather than blocking
        // on an event handle, matching the simple-polling mode documented for
        // IAudioCaptureClient.
        let deadline = Instant::now() + timeout;
        loop {
            let packet_size = unsafe { self.capture_client.GetNextPacketSize() }
                .map_err(|e| AudioError::Backend(e.message()))?;

            if packet_size == 0 {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                std::thread::yield_now();
                continue;
            }

            let mut data = std::ptr::null_mut();
            let mut frames_available = 0u32;
            let mut flags = 0u32;
            unsafe {
                self.capture_client
                    .GetBuffer(&mut data, &mut frames_available, &mut flags, None, None)
                    .map_err(|e| AudioError::Backend(e.message()))?;
            }

            let silent = flags & AUDCLNT_BUFFERFLAGS_SILENT.0 as u32 != 0;
            let sample_count = frames_available as usize * self.channels as usize;
            let samples: Vec<f32> = if silent || data.is_null() {
                vec![0.0; sample_count]
            } else {
                let floats = data as *const f32;
                unsafe { std::slice::from_raw_parts(floats, sample_count) }.to_vec()
            };

            unsafe {
                self.capture_client
                    .ReleaseBuffer(frames_available)
                    .map_err(|e| AudioError::Backend(e.message()))?;
            }

            debug!(
                frames = frames_available,
                channels = self.channels,
                bits = self.bits_per_sample,
                block_align = self.block_align,
                "captured loopback buffer"
            );

            return Ok(Some(CapturedAudio {
                samples,
                channels: self.channels,
                sample_rate: self.sample_rate,
                timestamp: Instant::now(),
            }));
        }
    }
}

impl Drop for WasapiLoopbackCapture {
    fn drop(&mut self) {
        let _ = unsafe { self.audio_client.Stop() };
    }
}
