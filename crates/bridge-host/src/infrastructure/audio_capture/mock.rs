//! A scripted audio capture source for tests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{AudioCapture, AudioError, CapturedAudio};

enum ScriptedEvent {
    Buffer(Vec<f32>),
    Silence,
    Fail(AudioError),
}

/// An [`AudioCapture`] driven entirely by a pre-programmed script.
pub struct MockAudioCapture {
    script: VecDeque<ScriptedEvent>,
    channels: u16,
    sample_rate: u32,
}

impl MockAudioCapture {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            script: VecDeque::new(),
            channels,
            sample_rate,
        }
    }

    pub fn push_samples(&mut self, samples: Vec<f32>) {
        self.script.push_back(ScriptedEvent::Buffer(samples));
    }

    pub fn push_silence(&mut self) {
        self.script.push_back(ScriptedEvent::Silence);
    }

    pub fn push_failure(&mut self, err: AudioError) {
        self.script.push_back(ScriptedEvent::Fail(err));
    }
}

impl AudioCapture for MockAudioCapture {
    fn next_buffer(&mut self, _timeout: Duration) -> Result<Option<CapturedAudio>, AudioError> {
        match self.script.pop_front() {
            Some(ScriptedEvent::Buffer(samples)) => Ok(Some(CapturedAudio {
                samples,
                channels: self.channels,
                sample_rate: self.sample_rate,
                timestamp: Instant::now(),
            })),
            Some(ScriptedEvent::Silence) => Ok(Some(CapturedAudio {
                samples: vec![0.0; self.channels as usize * 64],
                channels: self.channels,
                sample_rate: self.sample_rate,
                timestamp: Instant::now(),
            })),
            Some(ScriptedEvent::Fail(err)) => Err(err),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_scripted_buffer() {
        let mut mock = MockAudioCapture::new(2, 48_000);
        mock.push_samples(vec![0.5, -0.5, 0.25, -0.25]);

        let buf = mock
            .next_buffer(Duration::from_millis(10))
            .unwrap()
            .expect("buffer expected");
        assert_eq!(buf.samples, vec![0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn exhausted_script_returns_none() {
        let mut mock = MockAudioCapture::new(2, 48_000);
        assert!(mock.next_buffer(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn scripted_failure_propagates() {
        let mut mock = MockAudioCapture::new(2, 48_000);
        mock.push_failure(AudioError::NoDevice);
        assert!(matches!(
            mock.next_buffer(Duration::from_millis(10)),
            Err(AudioError::NoDevice)
        ));
    }
}
