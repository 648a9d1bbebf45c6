//! Session orchestrator for the companion side: accept the three channels
//! a host dials in, handshake, then dispatch video/audio/input messages
//! until the host disconnects.
//!
//! Mirrors the host's `HostSession` from the listening end: Control, Video,
//! and Audio are accepted in that order by `ChannelListeners::bind` before
//! this runs; handshaking exchanges `Handshake`/`HandshakeAck`; streaming
//! dispatches all three channels concurrently until Control closes.
//!
//! `KvmConfigPayload` carries only `dead_zone_px`/`edge_offset`, never the
//! configured `Edge`, so the companion's own edge-excursion tracker
//! (`cursor_watch::CursorExcursionTracker`) starts with the protocol
//! default dead zone and is reconfigured the moment a `KvmConfig` message
//! arrives.

use std::sync::Arc;
use std::time::Duration;

use bridge_core::config::CompanionConfig;
use bridge_core::domain::kvm::Rect;
use bridge_core::protocol::codec;
use bridge_core::protocol::messages::{HandshakePayload, KeyEventKind, Message, MessageFlags, MessageType, Platform, VideoCodec};
use bridge_core::transport::{MessageReader, Transport, TransportError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::audio_playback::{AudioPlaybackUseCase, AudioSink};
use crate::application::cursor_watch::CursorExcursionTracker;
use crate::application::emulate_input::{EmulateInputUseCase, PlatformInputEmulator};
use crate::application::video_playback::{FrameSink, VideoPlaybackUseCase};
use crate::infrastructure::network::CompanionChannels;
use crate::infrastructure::screen_info::PlatformDisplayInfo;

/// Protocol default dead zone, matching `KvmConfig`'s default on the host
/// until the host's actual `KvmConfig` message arrives.
const DEFAULT_DEAD_ZONE_PX: u32 = 2;

/// How often the companion emits its own `Heartbeat` so the host's
/// 3-missed-beats teardown timer never fires while the link is healthy.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("handshake payload error: {0}")]
    Handshake(#[from] codec::PayloadError),
    #[error("host did not complete the handshake: {0}")]
    HandshakeRejected(String),
    #[error("local display info unavailable: {0}")]
    DisplayInfo(String),
}

/// Sends `Handshake` on Control. `local_port` is unused by the wire format
/// but kept here for symmetry with the host's `perform_handshake`.
async fn perform_handshake(
    control_tx: &Transport,
    control_rx: &mut MessageReader,
    outgoing: &HandshakePayload,
) -> Result<HandshakePayload, SessionError> {
    let message = control_rx.recv().await?;
    if message.message_type != MessageType::Handshake {
        return Err(SessionError::HandshakeRejected(format!(
            "expected Handshake, got {:?}",
            message.message_type
        )));
    }
    let host_info = codec::decode_handshake(&message.payload)?;

    control_tx
        .send(&Message::new(MessageType::HandshakeAck, MessageFlags::NONE, codec::encode_handshake(outgoing)))
        .await?;

    Ok(host_info)
}

fn rect_from_dims(width: u32, height: u32) -> Rect {
    Rect::new(0, 0, width as i32, height as i32)
}

fn hostname(configured: &str) -> String {
    if configured.is_empty() {
        "macwinbridge companion".to_string()
    } else {
        configured.to_string()
    }
}

/// Runs one accepted session end-to-end: handshake, dispatch, teardown.
/// Built fresh for each host connection.
pub struct CompanionSession<A: AudioSink, F: FrameSink, D: PlatformDisplayInfo> {
    config: CompanionConfig,
    emulator: Arc<dyn PlatformInputEmulator>,
    audio: AudioPlaybackUseCase<A>,
    video: VideoPlaybackUseCase<F>,
    display_info: D,
}

impl<A: AudioSink, F: FrameSink, D: PlatformDisplayInfo> CompanionSession<A, F, D> {
    pub fn new(config: CompanionConfig, emulator: Arc<dyn PlatformInputEmulator>, audio_sink: A, frame_sink: F, display_info: D) -> Self {
        Self {
            config,
            emulator,
            audio: AudioPlaybackUseCase::new(audio_sink),
            video: VideoPlaybackUseCase::new(frame_sink),
            display_info,
        }
    }

    /// Handshakes over `channels`, then dispatches all three channels
    /// concurrently until Control closes or `cancel` fires.
    pub async fn run(&mut self, channels: CompanionChannels, cancel: CancellationToken) -> Result<(), SessionError> {
        let CompanionChannels {
            control_tx,
            mut control_rx,
            video_tx,
            mut video_rx,
            audio_tx,
            mut audio_rx,
        } = channels;
        // Companion never writes back on the video/audio channels; only the
        // receive halves are used.
        drop(video_tx);
        drop(audio_tx);

        let local_display = self
            .display_info
            .primary_display()
            .map_err(|e| SessionError::DisplayInfo(e.to_string()))?;

        let outgoing = HandshakePayload {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: hostname(&self.config.device_name),
            platform: Platform::MacOs,
            display_width: local_display.width,
            display_height: local_display.height,
            refresh_rate: 60,
            supports_audio: self.config.audio.enabled,
            supports_input: true,
        };

        let host_info = perform_handshake(&control_tx, &mut control_rx, &outgoing).await?;
        info!(device = %host_info.device_name, platform = ?host_info.platform, "host handshake complete");

        let control_tx = Arc::new(control_tx);
        let mut input = EmulateInputUseCase::new(self.emulator.clone());
        let mut tracker = CursorExcursionTracker::new(rect_from_dims(local_display.width, local_display.height), DEFAULT_DEAD_ZONE_PX);
        let mut video_codec = VideoCodec::Raw;

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

        loop {
            tokio::select! {
                message = control_rx.recv() => {
                    match message {
                        Ok(msg) => {
                            if self.handle_control_message(msg, &mut input, &mut tracker, &control_tx).await? {
                                return Ok(());
                            }
                        }
                        Err(TransportError::Closed) => {
                            info!("control channel closed by host");
                            return Ok(());
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                message = video_rx.recv() => {
                    match message {
                        Ok(msg) => self.handle_video_message(msg, &mut video_codec),
                        Err(TransportError::Closed) => debug!("video channel closed"),
                        Err(e) => warn!("video channel read error: {e}"),
                    }
                }
                message = audio_rx.recv() => {
                    match message {
                        Ok(msg) => self.handle_audio_message(msg),
                        Err(TransportError::Closed) => debug!("audio channel closed"),
                        Err(e) => warn!("audio channel read error: {e}"),
                    }
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = control_tx.send(&Message::empty(MessageType::Heartbeat)).await {
                        warn!("failed to send heartbeat: {e}");
                    }
                }
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    }

    /// Dispatches one Control message. Returns `true` if the session should
    /// end (the host requested disconnect).
    async fn handle_control_message(
        &mut self,
        message: Message,
        input: &mut EmulateInputUseCase,
        tracker: &mut CursorExcursionTracker,
        control_tx: &Arc<Transport>,
    ) -> Result<bool, SessionError> {
        match message.message_type {
            MessageType::MouseMove => match codec::decode_mouse_move(&message.payload) {
                Ok(payload) => {
                    let returned = tracker.observe(payload.x, payload.y);
                    if let Err(e) = input.handle_mouse_move(payload.x, payload.y) {
                        warn!("mouse move emulation failed: {e}");
                    }
                    if let Some(cursor_return) = returned {
                        if let Err(e) = control_tx
                            .send(&Message::new(MessageType::CursorReturn, MessageFlags::NONE, codec::encode_cursor_return(&cursor_return)))
                            .await
                        {
                            warn!("failed to send CursorReturn: {e}");
                        }
                    }
                }
                Err(e) => warn!("malformed MouseMove payload: {e}"),
            },
            MessageType::MouseButton => {
                if !tracker.is_suppressed() {
                    match codec::decode_mouse_button(&message.payload) {
                        Ok(payload) => {
                            if let Err(e) = input.handle_mouse_button(payload.button, payload.event_type, payload.x, payload.y) {
                                warn!("mouse button emulation failed: {e}");
                            }
                        }
                        Err(e) => warn!("malformed MouseButton payload: {e}"),
                    }
                }
            }
            MessageType::MouseScroll => {
                if !tracker.is_suppressed() {
                    match codec::decode_mouse_scroll(&message.payload) {
                        Ok(payload) => {
                            if let Err(e) = input.handle_mouse_scroll(payload.delta_x, payload.delta_y) {
                                warn!("mouse scroll emulation failed: {e}");
                            }
                        }
                        Err(e) => warn!("malformed MouseScroll payload: {e}"),
                    }
                }
            }
            MessageType::KeyDown => {
                if !tracker.is_suppressed() {
                    match codec::decode_key_event(&message.payload) {
                        Ok(payload) => {
                            if let Err(e) = input.handle_key_event(payload.hid_code, payload.modifiers, KeyEventKind::Down) {
                                warn!("key down emulation failed: {e}");
                            }
                        }
                        Err(e) => warn!("malformed KeyDown payload: {e}"),
                    }
                }
            }
            MessageType::KeyUp => {
                if !tracker.is_suppressed() {
                    match codec::decode_key_event(&message.payload) {
                        Ok(payload) => {
                            if let Err(e) = input.handle_key_event(payload.hid_code, payload.modifiers, KeyEventKind::Up) {
                                warn!("key up emulation failed: {e}");
                            }
                        }
                        Err(e) => warn!("malformed KeyUp payload: {e}"),
                    }
                }
            }
            MessageType::KvmConfig => match codec::decode_kvm_config(&message.payload) {
                Ok(payload) => {
                    debug!(dead_zone_px = payload.dead_zone_px, "kvm config updated");
                    tracker.reconfigure(payload.dead_zone_px);
                }
                Err(e) => warn!("malformed KvmConfig payload: {e}"),
            },
            MessageType::DisplaySwitch => match codec::decode_display_switch(&message.payload) {
                // Display-mode inversion (companion becomes the video
                // source) is out of scope: this crate's video pipeline is a
                // one-directional mirror of the host's display.
                Ok(payload) => debug!(mode = ?payload.mode, "display switch received, reverse streaming not implemented"),
                Err(e) => warn!("malformed DisplaySwitch payload: {e}"),
            },
            MessageType::Heartbeat => debug!("heartbeat received from host"),
            MessageType::Disconnect => {
                info!("host requested disconnect");
                return Ok(true);
            }
            other => debug!(?other, "unhandled control message"),
        }
        Ok(false)
    }

    fn handle_video_message(&mut self, message: Message, codec_state: &mut VideoCodec) {
        match message.message_type {
            MessageType::VideoConfig => match codec::decode_video_config(&message.payload) {
                Ok(payload) => {
                    *codec_state = payload.codec;
                    self.video.on_video_config(payload);
                }
                Err(e) => warn!("malformed VideoConfig payload: {e}"),
            },
            MessageType::VideoFrame => match codec::decode_video_frame(&message.payload, *codec_state) {
                Ok(frame) => {
                    if let Err(e) = self.video.on_video_frame(frame, message.flags.is_key_frame()) {
                        warn!("failed to reconstruct video frame: {e}");
                    }
                }
                Err(e) => warn!("malformed VideoFrame payload: {e}"),
            },
            MessageType::DisplayStatus => debug!("display status received"),
            other => debug!(?other, "unhandled video channel message"),
        }
    }

    fn handle_audio_message(&mut self, message: Message) {
        match message.message_type {
            MessageType::AudioConfig => match codec::decode_audio_config(&message.payload) {
                Ok(payload) => {
                    if let Err(e) = self.audio.on_audio_config(payload) {
                        warn!("failed to configure audio sink: {e}");
                    }
                }
                Err(e) => warn!("malformed AudioConfig payload: {e}"),
            },
            MessageType::AudioData => match codec::decode_audio_data(&message.payload) {
                Ok(payload) => {
                    if let Err(e) = self.audio.on_audio_data(payload) {
                        warn!("audio playback error: {e}");
                    }
                }
                Err(e) => warn!("malformed AudioData payload: {e}"),
            },
            MessageType::AudioControl => match codec::decode_audio_control(&message.payload) {
                Ok(routing) => self.audio.on_audio_control(routing),
                Err(e) => warn!("malformed AudioControl payload: {e}"),
            },
            other => debug!(?other, "unhandled audio channel message"),
        }
    }
}

/// The UDP discovery responder: answers `MACWINBRIDGE_DISCOVER` broadcasts
/// with this companion's name until `cancel` fires. Relocated here from the
/// host side, since only the companion listens for discovery requests — the
/// host is the broadcaster (`bridge_host::infrastructure::network::discovery::discover_companion`).
pub async fn run_discovery_responder(discovery_port: u16, device_name: String, cancel: CancellationToken) {
    use tokio::net::UdpSocket;

    let socket = match UdpSocket::bind(("0.0.0.0", discovery_port)).await {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to bind discovery socket: {e}");
            return;
        }
    };
    if let Err(e) = socket.set_broadcast(true) {
        warn!("failed to enable broadcast on discovery socket: {e}");
    }

    let mut buf = [0u8; 256];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, peer)) => {
                        if bridge_core::discovery::is_valid_request(&buf[..len]) {
                            let response = bridge_core::discovery::encode_response(Some(&device_name));
                            if let Err(e) = socket.send_to(&response, peer).await {
                                warn!("failed to send discovery response to {peer}: {e}");
                            }
                        }
                    }
                    Err(e) => warn!("discovery socket recv error: {e}"),
                }
            }
        }
    }
}
