//! Binary codec for the bridge wire protocol.
//!
//! Two layers:
//!
//! - The **envelope** layer (`encode_message`/`decode_message`/
//!   [`FrameDecoder`]) only knows about the 8-byte little-endian header and
//!   raw payload bytes. It never looks inside the payload.
//! - The **payload** layer (the `encode_*`/`decode_*` free functions below)
//!   knows the byte layout of each `MessageType`'s payload and is used by
//!   the application layer once it already has a `Message` in hand.

use thiserror::Error;

use super::messages::{
    AudioConfigPayload, AudioDataPayload, AudioRouting, ButtonEventType, CursorReturnPayload,
    DisplaySwitchPayload, EncodedFrameType, EncodedVideoFrame, HandshakePayload, KeyEventPayload,
    KvmConfigPayload, Message, MessageFlags, MessageType, MouseButton, MouseButtonPayload,
    MouseMovePayload, MouseScrollPayload, RawVideoFrame, VideoCodec, VideoConfigPayload,
    VideoFramePayload,
};
use crate::domain::kvm::Edge;

/// Header size in bytes: `message_type:u16 + flags:u16 + payload_length:u32`.
pub const HEADER_LEN: usize = 8;

/// Recommended upper bound on a single message's payload.
pub const MAX_PAYLOAD_LEN: u32 = 64 * 1024 * 1024;

/// Errors from the envelope (header + length) layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("buffer has {available} bytes, header needs {HEADER_LEN}")]
    ShortHeader { available: usize },

    #[error("payload_length={declared} but only {available} bytes available")]
    ShortPayload { declared: u32, available: usize },

    #[error("payload_length={declared} exceeds cap of {MAX_PAYLOAD_LEN}")]
    OversizedPayload { declared: u32 },

    #[error("unknown message_type 0x{0:04X}")]
    UnknownMessageType(u16),
}

/// Writes the 8-byte header + payload into a single buffer.
///
/// `payload_length` is always `payload.len()`; the caller cannot desync the
/// two because there is nowhere to write a different value.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + message.payload.len());
    out.extend_from_slice(&message.message_type.as_u16().to_le_bytes());
    out.extend_from_slice(&message.flags.0.to_le_bytes());
    out.extend_from_slice(&(message.payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&message.payload);
    out
}

/// Decodes exactly one message from the front of `buf`.
///
/// Returns the decoded [`Message`] and the number of bytes it consumed.
/// `buf` may contain trailing bytes belonging to the next message — the
/// caller is responsible for advancing past the consumed prefix.
pub fn decode_message(buf: &[u8]) -> Result<(Message, usize), FramingError> {
    if buf.len() < HEADER_LEN {
        return Err(FramingError::ShortHeader {
            available: buf.len(),
        });
    }

    let type_raw = u16::from_le_bytes([buf[0], buf[1]]);
    let flags_raw = u16::from_le_bytes([buf[2], buf[3]]);
    let payload_len = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

    if payload_len > MAX_PAYLOAD_LEN {
        return Err(FramingError::OversizedPayload {
            declared: payload_len,
        });
    }

    let total = HEADER_LEN + payload_len as usize;
    if buf.len() < total {
        return Err(FramingError::ShortPayload {
            declared: payload_len,
            available: buf.len() - HEADER_LEN,
        });
    }

    let message_type = MessageType::from_u16(type_raw)
        .ok_or(FramingError::UnknownMessageType(type_raw))?;

    let payload = buf[HEADER_LEN..total].to_vec();

    Ok((
        Message {
            message_type,
            flags: MessageFlags(flags_raw),
            payload,
        },
        total,
    ))
}

/// Incremental decoder backing a transport read loop.
///
/// Bytes arrive via [`FrameDecoder::feed`] in whatever chunks the socket
/// hands back; [`FrameDecoder::try_decode_one`] only returns a message once
/// a complete frame is buffered, and never panics on a partial frame —
/// `ShortHeader`/`ShortPayload` encountered here are "not yet", not errors.
/// An [`FramingError::OversizedPayload`] or [`FramingError::UnknownMessageType`]
/// is a genuine protocol violation and is returned immediately.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Attempts to decode the next complete message.
    ///
    /// Returns `Ok(None)` when the buffer holds an incomplete frame so far.
    pub fn try_decode_one(&mut self) -> Result<Option<Message>, FramingError> {
        match decode_message(&self.buffer) {
            Ok((message, consumed)) => {
                self.buffer.drain(..consumed);
                Ok(Some(message))
            }
            Err(FramingError::ShortHeader { .. } | FramingError::ShortPayload { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

/// Errors from the payload (per-`MessageType`) layer.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload too short: need at least {need} bytes, have {have}")]
    TooShort { need: usize, have: usize },

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid field value: {0}")]
    InvalidField(&'static str),
}

fn require_len(buf: &[u8], need: usize) -> Result<(), PayloadError> {
    if buf.len() < need {
        return Err(PayloadError::TooShort {
            need,
            have: buf.len(),
        });
    }
    Ok(())
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn read_i64(buf: &[u8], offset: usize) -> i64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[offset..offset + 8]);
    i64::from_le_bytes(b)
}

// ── Handshake ──────────────────────────────────────────────────────────────

pub fn encode_handshake(payload: &HandshakePayload) -> Vec<u8> {
    serde_json::to_vec(payload).expect("HandshakePayload is always serializable")
}

pub fn decode_handshake(buf: &[u8]) -> Result<HandshakePayload, PayloadError> {
    Ok(serde_json::from_slice(buf)?)
}

// ── Video ──────────────────────────────────────────────────────────────────

pub fn encode_video_config(payload: &VideoConfigPayload) -> Vec<u8> {
    serde_json::to_vec(payload).expect("VideoConfigPayload is always serializable")
}

pub fn decode_video_config(buf: &[u8]) -> Result<VideoConfigPayload, PayloadError> {
    Ok(serde_json::from_slice(buf)?)
}

pub fn encode_display_switch(payload: &DisplaySwitchPayload) -> Vec<u8> {
    serde_json::to_vec(payload).expect("DisplaySwitchPayload is always serializable")
}

pub fn decode_display_switch(buf: &[u8]) -> Result<DisplaySwitchPayload, PayloadError> {
    Ok(serde_json::from_slice(buf)?)
}

/// Raw BGRA sub-header: `[width:i32][height:i32][stride:i32][frame_number:i32][pixels:n]`.
const RAW_FRAME_HEADER_LEN: usize = 16;

pub fn encode_raw_video_frame(frame: &RawVideoFrame) -> Vec<u8> {
    let mut out = Vec::with_capacity(RAW_FRAME_HEADER_LEN + frame.pixels.len());
    out.extend_from_slice(&frame.width.to_le_bytes());
    out.extend_from_slice(&frame.height.to_le_bytes());
    out.extend_from_slice(&frame.stride.to_le_bytes());
    out.extend_from_slice(&frame.frame_number.to_le_bytes());
    out.extend_from_slice(&frame.pixels);
    out
}

pub fn decode_raw_video_frame(buf: &[u8]) -> Result<RawVideoFrame, PayloadError> {
    require_len(buf, RAW_FRAME_HEADER_LEN)?;
    Ok(RawVideoFrame {
        width: read_i32(buf, 0),
        height: read_i32(buf, 4),
        stride: read_i32(buf, 8),
        frame_number: read_i32(buf, 12),
        pixels: buf[RAW_FRAME_HEADER_LEN..].to_vec(),
    })
}

/// Encoded sub-header: `[width:i32][height:i32][codec:u8][frame_type:u8][pts_us:i64][data_len:i32][nal:n]`.
const ENCODED_FRAME_HEADER_LEN: usize = 22;

pub fn encode_encoded_video_frame(frame: &EncodedVideoFrame) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENCODED_FRAME_HEADER_LEN + frame.data.len());
    out.extend_from_slice(&frame.width.to_le_bytes());
    out.extend_from_slice(&frame.height.to_le_bytes());
    out.push(frame.codec);
    out.push(frame.frame_type as u8);
    out.extend_from_slice(&frame.pts_us.to_le_bytes());
    out.extend_from_slice(&(frame.data.len() as i32).to_le_bytes());
    out.extend_from_slice(&frame.data);
    out
}

pub fn decode_encoded_video_frame(buf: &[u8]) -> Result<EncodedVideoFrame, PayloadError> {
    require_len(buf, ENCODED_FRAME_HEADER_LEN)?;
    let frame_type = EncodedFrameType::from_u8(buf[9])
        .ok_or(PayloadError::InvalidField("frame_type"))?;
    let data_len = read_i32(buf, 18).max(0) as usize;
    require_len(buf, ENCODED_FRAME_HEADER_LEN + data_len)?;
    Ok(EncodedVideoFrame {
        width: read_i32(buf, 0),
        height: read_i32(buf, 4),
        codec: buf[8],
        frame_type,
        pts_us: read_i64(buf, 10),
        data: buf[ENCODED_FRAME_HEADER_LEN..ENCODED_FRAME_HEADER_LEN + data_len].to_vec(),
    })
}

/// Decodes a `VideoFrame` payload per the codec committed for the session.
pub fn decode_video_frame(
    buf: &[u8],
    codec: VideoCodec,
) -> Result<VideoFramePayload, PayloadError> {
    match codec {
        VideoCodec::Raw => decode_raw_video_frame(buf).map(VideoFramePayload::Raw),
        VideoCodec::H264 | VideoCodec::H265 => {
            decode_encoded_video_frame(buf).map(VideoFramePayload::Encoded)
        }
    }
}

// ── Audio ──────────────────────────────────────────────────────────────────

const AUDIO_TIMESTAMP_LEN: usize = 8;

pub fn encode_audio_data(payload: &AudioDataPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(AUDIO_TIMESTAMP_LEN + payload.pcm.len() * 2);
    out.extend_from_slice(&payload.timestamp_us.to_le_bytes());
    for sample in &payload.pcm {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

pub fn decode_audio_data(buf: &[u8]) -> Result<AudioDataPayload, PayloadError> {
    require_len(buf, AUDIO_TIMESTAMP_LEN)?;
    let timestamp_us = read_i64(buf, 0);
    let sample_bytes = &buf[AUDIO_TIMESTAMP_LEN..];
    if sample_bytes.len() % 2 != 0 {
        return Err(PayloadError::InvalidField("pcm"));
    }
    let pcm = sample_bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();
    Ok(AudioDataPayload { timestamp_us, pcm })
}

pub fn encode_audio_config(payload: &AudioConfigPayload) -> Vec<u8> {
    serde_json::to_vec(payload).expect("AudioConfigPayload is always serializable")
}

pub fn decode_audio_config(buf: &[u8]) -> Result<AudioConfigPayload, PayloadError> {
    Ok(serde_json::from_slice(buf)?)
}

pub fn encode_audio_control(routing: AudioRouting) -> Vec<u8> {
    vec![routing as u8]
}

pub fn decode_audio_control(buf: &[u8]) -> Result<AudioRouting, PayloadError> {
    require_len(buf, 1)?;
    AudioRouting::from_u8(buf[0]).ok_or(PayloadError::InvalidField("routing"))
}

// ── Input ──────────────────────────────────────────────────────────────────

pub fn encode_mouse_move(payload: &MouseMovePayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&payload.x.to_le_bytes());
    out.extend_from_slice(&payload.y.to_le_bytes());
    out
}

pub fn decode_mouse_move(buf: &[u8]) -> Result<MouseMovePayload, PayloadError> {
    require_len(buf, 8)?;
    Ok(MouseMovePayload {
        x: read_i32(buf, 0),
        y: read_i32(buf, 4),
    })
}

pub fn encode_mouse_button(payload: &MouseButtonPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    out.push(payload.button.as_u8());
    out.push(if payload.event_type == ButtonEventType::Press { 0 } else { 1 });
    out.extend_from_slice(&payload.x.to_le_bytes());
    out.extend_from_slice(&payload.y.to_le_bytes());
    out
}

pub fn decode_mouse_button(buf: &[u8]) -> Result<MouseButtonPayload, PayloadError> {
    require_len(buf, 10)?;
    let button = MouseButton::from_u8(buf[0]).ok_or(PayloadError::InvalidField("button"))?;
    let event_type = match buf[1] {
        0 => ButtonEventType::Press,
        1 => ButtonEventType::Release,
        _ => return Err(PayloadError::InvalidField("event_type")),
    };
    Ok(MouseButtonPayload {
        button,
        event_type,
        x: read_i32(buf, 2),
        y: read_i32(buf, 6),
    })
}

pub fn encode_mouse_scroll(payload: &MouseScrollPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&payload.delta_x.to_le_bytes());
    out.extend_from_slice(&payload.delta_y.to_le_bytes());
    out.extend_from_slice(&payload.x.to_le_bytes());
    out.extend_from_slice(&payload.y.to_le_bytes());
    out
}

pub fn decode_mouse_scroll(buf: &[u8]) -> Result<MouseScrollPayload, PayloadError> {
    require_len(buf, 12)?;
    Ok(MouseScrollPayload {
        delta_x: i16::from_le_bytes([buf[0], buf[1]]),
        delta_y: i16::from_le_bytes([buf[2], buf[3]]),
        x: read_i32(buf, 4),
        y: read_i32(buf, 8),
    })
}

pub fn encode_cursor_return(payload: &CursorReturnPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    out.push(payload.edge as u8);
    out.extend_from_slice(&payload.normalized_position.to_le_bytes());
    out
}

pub fn decode_cursor_return(buf: &[u8]) -> Result<CursorReturnPayload, PayloadError> {
    require_len(buf, 5)?;
    let edge = Edge::from_u8(buf[0]).ok_or(PayloadError::InvalidField("edge"))?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[1..5]);
    Ok(CursorReturnPayload {
        edge,
        normalized_position: f32::from_le_bytes(bytes),
    })
}

pub fn encode_key_event(payload: &KeyEventPayload) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    out.extend_from_slice(&payload.hid_code.to_le_bytes());
    out.push(payload.modifiers);
    out
}

pub fn decode_key_event(buf: &[u8]) -> Result<KeyEventPayload, PayloadError> {
    require_len(buf, 3)?;
    Ok(KeyEventPayload {
        hid_code: u16::from_le_bytes([buf[0], buf[1]]),
        modifiers: buf[2],
    })
}

pub fn encode_kvm_config(payload: &KvmConfigPayload) -> Vec<u8> {
    serde_json::to_vec(payload).expect("KvmConfigPayload is always serializable")
}

pub fn decode_kvm_config(buf: &[u8]) -> Result<KvmConfigPayload, PayloadError> {
    Ok(serde_json::from_slice(buf)?)
}

pub fn encode_clipboard_sync(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

pub fn decode_clipboard_sync(buf: &[u8]) -> Result<String, PayloadError> {
    String::from_utf8(buf.to_vec()).map_err(|_| PayloadError::InvalidField("clipboard"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::Platform;

    fn round_trip(message: Message) {
        let encoded = encode_message(&message);
        let (decoded, consumed) = decode_message(&encoded).expect("decode should succeed");
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, message);
    }

    #[test]
    fn envelope_round_trips_empty_payload() {
        round_trip(Message::empty(MessageType::Heartbeat));
    }

    #[test]
    fn envelope_round_trips_with_flags_and_payload() {
        round_trip(Message::new(
            MessageType::VideoFrame,
            MessageFlags::NONE.with(MessageFlags::KEY_FRAME),
            vec![1, 2, 3, 4],
        ));
    }

    #[test]
    fn envelope_round_trip_is_chunking_independent() {
        let message = Message::new(
            MessageType::AudioData,
            MessageFlags::NONE,
            vec![9u8; 4096],
        );
        let encoded = encode_message(&message);

        let mut decoder = FrameDecoder::new();
        for chunk in encoded.chunks(7) {
            decoder.feed(chunk);
        }
        let decoded = decoder
            .try_decode_one()
            .expect("decode should succeed")
            .expect("message should be complete");
        assert_eq!(decoded, message);
    }

    #[test]
    fn decode_does_not_panic_on_truncated_header() {
        let err = decode_message(&[0x01, 0x00]).unwrap_err();
        assert_eq!(err, FramingError::ShortHeader { available: 2 });
    }

    #[test]
    fn decode_does_not_panic_on_truncated_payload() {
        let message = Message::new(MessageType::Heartbeat, MessageFlags::NONE, vec![1, 2, 3]);
        let mut encoded = encode_message(&message);
        encoded.truncate(encoded.len() - 1);
        let err = decode_message(&encoded).unwrap_err();
        assert_eq!(
            err,
            FramingError::ShortPayload {
                declared: 3,
                available: 2
            }
        );
    }

    #[test]
    fn frame_decoder_returns_none_for_partial_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(decoder.try_decode_one().unwrap(), None);
    }

    #[test]
    fn frame_decoder_decodes_two_back_to_back_messages_in_order() {
        let a = Message::new(MessageType::Heartbeat, MessageFlags::NONE, vec![]);
        let b = Message::new(MessageType::Disconnect, MessageFlags::NONE, vec![7]);
        let mut bytes = encode_message(&a);
        bytes.extend(encode_message(&b));

        let mut decoder = FrameDecoder::new();
        decoder.feed(&bytes);
        let first = decoder.try_decode_one().unwrap().unwrap();
        let second = decoder.try_decode_one().unwrap().unwrap();
        assert_eq!(first, a);
        assert_eq!(second, b);
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut header = Vec::new();
        header.extend_from_slice(&MessageType::VideoFrame.as_u16().to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes());
        header.extend_from_slice(&(MAX_PAYLOAD_LEN + 1).to_le_bytes());
        let err = decode_message(&header).unwrap_err();
        assert_eq!(
            err,
            FramingError::OversizedPayload {
                declared: MAX_PAYLOAD_LEN + 1
            }
        );
    }

    #[test]
    fn handshake_payload_round_trips_through_json() {
        let payload = HandshakePayload {
            app_version: "1.0.0".into(),
            device_name: "Desk PC".into(),
            platform: Platform::Windows,
            display_width: 2560,
            display_height: 1440,
            refresh_rate: 144,
            supports_audio: true,
            supports_input: true,
        };
        let encoded = encode_handshake(&payload);
        let decoded = decode_handshake(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn handshake_ignores_unknown_fields() {
        let json = br#"{"AppVersion":"1.0","DeviceName":"d","Platform":"Windows",
            "DisplayWidth":1,"DisplayHeight":1,"RefreshRate":60,
            "SupportsAudio":false,"SupportsInput":false,"SomeFutureField":42}"#;
        assert!(decode_handshake(json).is_ok());
    }

    #[test]
    fn handshake_missing_required_field_is_an_error() {
        let json = br#"{"AppVersion":"1.0"}"#;
        assert!(decode_handshake(json).is_err());
    }

    #[test]
    fn raw_video_frame_round_trips() {
        let frame = RawVideoFrame {
            width: 1920,
            height: 1080,
            stride: 1920 * 4,
            frame_number: 42,
            pixels: vec![0xAB; 64],
        };
        let encoded = encode_raw_video_frame(&frame);
        let decoded = decode_raw_video_frame(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn encoded_video_frame_round_trips() {
        let frame = EncodedVideoFrame {
            width: 1920,
            height: 1080,
            codec: 1,
            frame_type: EncodedFrameType::Idr,
            pts_us: 123_456,
            data: vec![0x00, 0x00, 0x00, 0x01, 0x67],
        };
        let encoded = encode_encoded_video_frame(&frame);
        let decoded = decode_encoded_video_frame(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn audio_data_round_trips_with_timestamp_prefix() {
        let payload = AudioDataPayload {
            timestamp_us: -5,
            pcm: vec![0, 1, -1, i16::MAX, i16::MIN],
        };
        let encoded = encode_audio_data(&payload);
        assert_eq!(encoded.len(), 8 + payload.pcm.len() * 2);
        let decoded = decode_audio_data(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn mouse_move_round_trips() {
        let payload = MouseMovePayload { x: -10, y: 2000 };
        let decoded = decode_mouse_move(&encode_mouse_move(&payload)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn cursor_return_round_trips() {
        let payload = CursorReturnPayload {
            edge: Edge::Left,
            normalized_position: 0.42,
        };
        let decoded = decode_cursor_return(&encode_cursor_return(&payload)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn key_event_round_trips() {
        let payload = KeyEventPayload {
            hid_code: 0x04,
            modifiers: 0b0000_0001,
        };
        let decoded = decode_key_event(&encode_key_event(&payload)).unwrap();
        assert_eq!(decoded, payload);
    }
}
