//! Session orchestrator: `Idle -> Discovering -> Connecting -> Handshaking ->
//! Streaming -> TearingDown -> Idle`.
//!
//! Connecting opens Control, Video, then Audio in that order and rolls back
//! whatever opened so far if a later channel fails. Handshaking exchanges
//! `Handshake`/`HandshakeAck` on Control. Streaming always starts the audio
//! pipeline and the KVM state machine; the video pipeline only starts when
//! the configured display mode streams to the companion. TearingDown stops
//! KVM, then video, then audio, then closes Control last — the reverse of
//! connect order.
//!
//! There is no pairing/PIN/lockout step here — that belongs to a security
//! model out of scope for this bridge.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::config::{BridgeConfig, NetworkConfig};
use bridge_core::domain::kvm::{KvmState, KvmStateMachine};
use bridge_core::protocol::codec;
use bridge_core::protocol::messages::{
    AudioRouting, DisplayMode, HandshakePayload, Message, MessageFlags, MessageType, Platform, VideoCodec,
    VideoConfigPayload,
};
use bridge_core::transport::{Listener, MessageReader, Transport, TransportError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::audio_pipeline::{spawn_capture_producer as spawn_audio_producer, AudioPipelineError, AudioSender, AudioWorker};
use crate::application::route_input::{CursorController, InputTransmitter, RouteInputError, RouteInputUseCase};
use crate::application::video_pipeline::{
    new_keyframe_request_flag, spawn_capture_producer as spawn_video_producer, RawVideoWorker, VideoPipelineError,
    VideoSender,
};
use crate::infrastructure::audio_capture::AudioCapture;
use crate::infrastructure::input_capture::{InputSource, RawInputEvent};
use crate::infrastructure::screen_capture::ScreenCapture;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const MAX_MISSED_HEARTBEATS: u32 = 3;
const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("handshake payload error: {0}")]
    Handshake(#[from] codec::PayloadError),
    #[error("companion did not complete the handshake: {0}")]
    HandshakeRejected(String),
    #[error("heartbeat timed out after {0} missed beats")]
    HeartbeatTimeout(u32),
}

/// State the orchestrator reports to callers (status line, logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Discovering,
    Connecting,
    Handshaking,
    Streaming,
    TearingDown,
}

/// The three connected channels, held together so teardown can close them
/// in the reverse order they were connected in (Control last).
struct Channels {
    control_tx: Transport,
    control_rx: MessageReader,
    video_tx: Transport,
    video_rx: MessageReader,
    audio_tx: Transport,
    audio_rx: MessageReader,
}

/// Opens Control, Video, then Audio against `peer`, in that order. If Video
/// or Audio fails to connect, the channels opened so far are dropped
/// (closing their sockets) before returning the error.
async fn connect_channels(peer: IpAddr, net: &NetworkConfig) -> Result<Channels, SessionError> {
    let control_addr = SocketAddr::new(peer, net.control_port);
    let (control_tx, control_rx) = Transport::connect_with_retry(control_addr, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await?;
    info!(%control_addr, "control channel connected");

    let video_addr = SocketAddr::new(peer, net.video_port);
    let (video_tx, video_rx) = match Transport::connect_with_retry(video_addr, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await {
        Ok(pair) => pair,
        Err(e) => {
            warn!("video channel connect failed, rolling back control channel: {e}");
            drop((control_tx, control_rx));
            return Err(e.into());
        }
    };
    info!(%video_addr, "video channel connected");

    let audio_addr = SocketAddr::new(peer, net.audio_port);
    let (audio_tx, audio_rx) = match Transport::connect_with_retry(audio_addr, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await {
        Ok(pair) => pair,
        Err(e) => {
            warn!("audio channel connect failed, rolling back control+video channels: {e}");
            drop((control_tx, control_rx));
            drop((video_tx, video_rx));
            return Err(e.into());
        }
    };
    info!(%audio_addr, "audio channel connected");

    Ok(Channels {
        control_tx,
        control_rx,
        video_tx,
        video_rx,
        audio_tx,
        audio_rx,
    })
}

/// Sends `Handshake` on Control and waits for the companion's `HandshakeAck`.
async fn perform_handshake(
    control_tx: &Transport,
    control_rx: &mut MessageReader,
    outgoing: &HandshakePayload,
) -> Result<HandshakePayload, SessionError> {
    control_tx
        .send(&Message::new(
            MessageType::Handshake,
            MessageFlags::NONE,
            codec::encode_handshake(outgoing),
        ))
        .await?;

    let message = control_rx.recv().await?;
    if message.message_type != MessageType::HandshakeAck {
        return Err(SessionError::HandshakeRejected(format!(
            "expected HandshakeAck, got {:?}",
            message.message_type
        )));
    }
    Ok(codec::decode_handshake(&message.payload)?)
}

/// Thin `Transport` wrapper implementing [`VideoSender`] over the video
/// channel.
struct VideoChannelSender(Transport);

#[async_trait]
impl VideoSender for VideoChannelSender {
    async fn send_video_frame(&self, flags: MessageFlags, payload: Vec<u8>) -> Result<(), VideoPipelineError> {
        self.0
            .send(&Message::new(MessageType::VideoFrame, flags, payload))
            .await
            .map_err(|e| VideoPipelineError::Send(e.to_string()))
    }
}

/// Thin `Transport` wrapper implementing [`AudioSender`] over the audio
/// channel.
struct AudioChannelSender(Transport);

#[async_trait]
impl AudioSender for AudioChannelSender {
    async fn send_audio_data(&self, payload: Vec<u8>) -> Result<(), AudioPipelineError> {
        self.0
            .send(&Message::new(MessageType::AudioData, MessageFlags::NONE, payload))
            .await
            .map_err(|e| AudioPipelineError::Send(e.to_string()))
    }
}

/// Thin `Transport` wrapper implementing [`InputTransmitter`] over the
/// control channel, used by [`RouteInputUseCase`] while focus is away from
/// the host.
pub struct ControlChannelTransmitter(pub Arc<Transport>);

#[async_trait]
impl InputTransmitter for ControlChannelTransmitter {
    async fn send_mouse_move(&self, payload: bridge_core::protocol::messages::MouseMovePayload) -> Result<(), RouteInputError> {
        self.0
            .send(&Message::new(
                MessageType::MouseMove,
                MessageFlags::NONE.with(MessageFlags::PRIORITY),
                codec::encode_mouse_move(&payload),
            ))
            .await
            .map_err(|e| RouteInputError::Transmit(e.to_string()))
    }

    async fn send_mouse_button(
        &self,
        payload: bridge_core::protocol::messages::MouseButtonPayload,
    ) -> Result<(), RouteInputError> {
        self.0
            .send(&Message::new(
                MessageType::MouseButton,
                MessageFlags::NONE.with(MessageFlags::PRIORITY),
                codec::encode_mouse_button(&payload),
            ))
            .await
            .map_err(|e| RouteInputError::Transmit(e.to_string()))
    }

    async fn send_mouse_scroll(
        &self,
        payload: bridge_core::protocol::messages::MouseScrollPayload,
    ) -> Result<(), RouteInputError> {
        self.0
            .send(&Message::new(
                MessageType::MouseScroll,
                MessageFlags::NONE.with(MessageFlags::PRIORITY),
                codec::encode_mouse_scroll(&payload),
            ))
            .await
            .map_err(|e| RouteInputError::Transmit(e.to_string()))
    }

    async fn send_key_event(
        &self,
        payload: bridge_core::protocol::messages::KeyEventPayload,
        kind: bridge_core::protocol::messages::KeyEventKind,
    ) -> Result<(), RouteInputError> {
        let message_type = match kind {
            bridge_core::protocol::messages::KeyEventKind::Down => MessageType::KeyDown,
            bridge_core::protocol::messages::KeyEventKind::Up => MessageType::KeyUp,
        };
        self.0
            .send(&Message::new(
                message_type,
                MessageFlags::NONE.with(MessageFlags::PRIORITY),
                codec::encode_key_event(&payload),
            ))
            .await
            .map_err(|e| RouteInputError::Transmit(e.to_string()))
    }
}

/// No-op cursor controller used where the platform adapter is not yet
/// available; production wiring in `main.rs` supplies the Win32-backed one.
#[derive(Clone)]
pub struct NullCursorController;

impl CursorController for NullCursorController {
    fn clip_to(&self, _rect: bridge_core::domain::kvm::Rect) -> Result<(), RouteInputError> {
        Ok(())
    }
    fn release_clip(&self) -> Result<(), RouteInputError> {
        Ok(())
    }
    fn hide(&self) {}
    fn show(&self) {}
}

/// Drives one connected session end-to-end: handshake, streaming, and
/// teardown. Built fresh for each companion connection.
pub struct HostSession<C: CursorController> {
    config: BridgeConfig,
    screen_capture_factory: Box<dyn Fn() -> Result<Box<dyn ScreenCapture>, String> + Send>,
    audio_capture_factory: Box<dyn Fn() -> Result<Box<dyn AudioCapture>, String> + Send>,
    input_source: Box<dyn InputSource>,
    cursor: C,
    local_display: (u32, u32),
}

impl<C: CursorController + Clone + 'static> HostSession<C> {
    pub fn new(
        config: BridgeConfig,
        screen_capture_factory: Box<dyn Fn() -> Result<Box<dyn ScreenCapture>, String> + Send>,
        audio_capture_factory: Box<dyn Fn() -> Result<Box<dyn AudioCapture>, String> + Send>,
        input_source: Box<dyn InputSource>,
        cursor: C,
        local_display: (u32, u32),
    ) -> Self {
        Self {
            config,
            screen_capture_factory,
            audio_capture_factory,
            input_source,
            cursor,
            local_display,
        }
    }

    /// Connects to `peer`, handshakes, streams until the companion
    /// disconnects or the heartbeat times out, then tears the session down.
    /// Returns once `TearingDown` has fully drained.
    pub async fn run(&mut self, peer: IpAddr) -> Result<(), SessionError> {
        let net = self.config.network.clone();
        let channels = connect_channels(peer, &net).await?;

        let outgoing = HandshakePayload {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: hostname(),
            platform: Platform::Windows,
            display_width: self.local_display.0,
            display_height: self.local_display.1,
            refresh_rate: 60,
            supports_audio: self.config.audio.enabled,
            supports_input: true,
        };

        let Channels {
            control_tx,
            mut control_rx,
            video_tx,
            video_rx,
            audio_tx,
            audio_rx,
        } = channels;

        let peer_info = perform_handshake(&control_tx, &mut control_rx, &outgoing).await?;
        info!(device = %peer_info.device_name, platform = ?peer_info.platform, "companion handshake complete");

        let control_tx = Arc::new(control_tx);
        let cancel = CancellationToken::new();
        let mut join_handles = Vec::new();

        // Audio pipeline always starts.
        let audio_handle = self.spawn_audio(AudioChannelSender(audio_tx), cancel.clone());
        join_handles.push(audio_handle);

        // Video pipeline only when configured to stream by default.
        let display_mode = if self.config.video.stream_by_default {
            DisplayMode::StreamToCompanion
        } else {
            DisplayMode::Local
        };
        if display_mode == DisplayMode::StreamToCompanion {
            control_tx
                .send(&Message::new(
                    MessageType::VideoConfig,
                    MessageFlags::NONE,
                    codec::encode_video_config(&VideoConfigPayload {
                        codec: VideoCodec::Raw,
                        width: self.local_display.0,
                        height: self.local_display.1,
                        fps: self.config.video.fps,
                    }),
                ))
                .await?;
            match self.spawn_video(VideoChannelSender(video_tx), cancel.clone()) {
                Ok(handle) => join_handles.push(handle),
                Err(e) => warn!("video pipeline failed to start, continuing without it: {e}"),
            }
        } else {
            drop(video_tx);
        }
        drop(video_rx);
        drop(audio_rx);

        let kvm_state = KvmState::new(
            rect_from_dims(self.local_display),
            rect_from_dims((peer_info.display_width, peer_info.display_height)),
            self.config.kvm.edge,
            self.config.kvm.dead_zone_px,
            self.config.kvm.edge_offset,
        )
        .map_err(|e| SessionError::HandshakeRejected(e.to_string()))?;
        let kvm = KvmStateMachine::new(kvm_state);

        let cursor = self.cursor.clone();
        let transmitter = ControlChannelTransmitter(control_tx.clone());
        let mut route = RouteInputUseCase::new(kvm, transmitter, cursor);

        let raw_events = self.input_source.start().map_err(|e| SessionError::HandshakeRejected(e.to_string()))?;
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<RawInputEvent>();
        std::thread::spawn(move || {
            while let Ok(event) = raw_events.recv() {
                if input_tx.send(event).is_err() {
                    break;
                }
            }
        });

        let result = self
            .stream_loop(&mut control_rx, &mut route, &mut input_rx, cancel.clone())
            .await;

        info!("tearing down session");
        cancel.cancel();
        self.input_source.stop();
        for handle in join_handles {
            let _ = handle.await;
        }
        drop(control_tx);

        result
    }

    fn spawn_audio(&self, sender: AudioChannelSender, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let capture = (self.audio_capture_factory)();
        let target_rate = self.config.audio.sample_rate;
        tokio::spawn(async move {
            let capture = match capture {
                Ok(c) => c,
                Err(e) => {
                    error!("audio capture unavailable, audio pipeline disabled: {e}");
                    return;
                }
            };
            let queue = Arc::new(bridge_core::queue::DropOldestQueue::new(10));
            let producer = spawn_audio_producer(capture, queue.clone(), Duration::from_millis(100), cancel.clone());
            let mut worker = AudioWorker::new(queue, sender, target_rate, std::time::Instant::now());
            worker.run(cancel).await;
            let _ = producer.join();
        })
    }

    fn spawn_video(
        &self,
        sender: VideoChannelSender,
        cancel: CancellationToken,
    ) -> Result<tokio::task::JoinHandle<()>, String> {
        let capture = (self.screen_capture_factory)()?;
        Ok(tokio::spawn(async move {
            let queue = Arc::new(bridge_core::queue::DropOldestQueue::new(2));
            let (return_tx, return_rx) = std::sync::mpsc::channel();
            let producer = spawn_video_producer(capture, queue.clone(), return_rx, Duration::from_millis(50), cancel.clone());
            let force_keyframe = new_keyframe_request_flag();
            let mut worker = RawVideoWorker::new(queue, return_tx, sender, force_keyframe);
            worker.run(cancel).await;
            let _ = producer.join();
        }))
    }

    /// Runs the Control-channel receive loop and the 30s heartbeat timer
    /// concurrently until the connection closes or the heartbeat times out.
    async fn stream_loop<T: InputTransmitter, CC: CursorController>(
        &mut self,
        control_rx: &mut MessageReader,
        route: &mut RouteInputUseCase<T, CC>,
        input_rx: &mut mpsc::UnboundedReceiver<RawInputEvent>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError> {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        let mut missed: u32 = 0;

        loop {
            tokio::select! {
                message = control_rx.recv() => {
                    match message {
                        Ok(msg) => {
                            missed = 0;
                            self.handle_control_message(msg, route).await;
                        }
                        Err(TransportError::Closed) => {
                            info!("control channel closed by companion");
                            return Ok(());
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                _ = heartbeat.tick() => {
                    missed += 1;
                    if missed >= MAX_MISSED_HEARTBEATS {
                        return Err(SessionError::HeartbeatTimeout(missed));
                    }
                    debug!(missed, "heartbeat tick, awaiting companion traffic");
                }
                Some(event) = input_rx.recv() => {
                    match route.handle_event(event).await {
                        Ok(suppress) => {
                            if !suppress {
                                // Focus is Host; the OS already delivered this
                                // event locally, nothing further to do.
                            }
                        }
                        Err(e) => warn!("route_input error, continuing: {e}"),
                    }
                }
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    }

    async fn handle_control_message<T: InputTransmitter, CC: CursorController>(
        &mut self,
        message: Message,
        route: &mut RouteInputUseCase<T, CC>,
    ) {
        match message.message_type {
            MessageType::CursorReturn => match codec::decode_cursor_return(&message.payload) {
                Ok(payload) => {
                    if let Err(e) = route.handle_cursor_return(payload).await {
                        warn!("failed to process CursorReturn: {e}");
                    }
                }
                Err(e) => warn!("malformed CursorReturn payload: {e}"),
            },
            MessageType::Heartbeat => {
                debug!("heartbeat received from companion");
            }
            MessageType::Disconnect => {
                info!("companion requested disconnect");
            }
            other => {
                debug!(?other, "unhandled control message");
            }
        }
    }
}

fn rect_from_dims((width, height): (u32, u32)) -> bridge_core::domain::kvm::Rect {
    bridge_core::domain::kvm::Rect::new(0, 0, width as i32, height as i32)
}

fn hostname() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "macwinbridge-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::audio_capture::{AudioCapture, AudioError, CapturedAudio};
    use crate::infrastructure::screen_capture::{CaptureError as ScCaptureError, CaptureOutcome, PooledBuffer, ScreenCapture};

    #[test]
    fn rect_from_dims_matches_requested_extent() {
        let rect = rect_from_dims((1920, 1080));
        assert_eq!(rect.width(), 1920);
        assert_eq!(rect.height(), 1080);
    }

    struct NeverCapture;
    impl ScreenCapture for NeverCapture {
        fn next_frame(&mut self, _timeout: Duration) -> Result<CaptureOutcome, ScCaptureError> {
            Ok(CaptureOutcome::NoChange)
        }
        fn return_buffer(&mut self, _buffer: PooledBuffer) {}
    }

    struct NeverAudio;
    impl AudioCapture for NeverAudio {
        fn next_buffer(&mut self, _timeout: Duration) -> Result<Option<CapturedAudio>, AudioError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn connect_channels_fails_cleanly_when_control_port_is_closed() {
        // Nothing is listening on this ephemeral localhost port combination,
        // so control connection itself must fail fast and return an error
        // rather than hang or panic.
        let net = NetworkConfig {
            control_port: 1,
            video_port: 2,
            audio_port: 3,
            discovery_port: 4,
            bind_address: "127.0.0.1".to_string(),
        };
        let result = connect_channels(IpAddr::from([127, 0, 0, 1]), &net).await;
        assert!(result.is_err());
    }
}
