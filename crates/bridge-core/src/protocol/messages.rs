//! Message catalog for the bridge wire protocol.
//!
//! Every message travels inside a [`Message`] envelope: an 8-byte
//! little-endian header (`message_type`, `flags`, `payload_length`) followed
//! by exactly `payload_length` bytes. The envelope never inspects the
//! payload — [`crate::protocol::codec`] owns per-type encode/decode.
//!
//! `MessageType` values are grouped by high byte: `0x00xx` Control, `0x01xx`
//! Video, `0x02xx` Audio, `0x03xx` Input. `DisplaySwitch` and
//! `VideoKeyRequest` are video-family types that travel on the Control
//! channel, not Video — see [`MessageType::channel`].

use serde::{Deserialize, Serialize};

/// The channel (TCP connection) a message travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Control,
    Video,
    Audio,
}

/// Closed set of message types. The high byte groups the type by family;
/// the family does not always match the channel the type travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    // Control (0x00xx)
    Handshake = 0x0001,
    HandshakeAck = 0x0002,
    Heartbeat = 0x0003,
    Disconnect = 0x0004,

    // Video (0x01xx)
    VideoFrame = 0x0100,
    VideoConfig = 0x0101,
    DisplaySwitch = 0x0102,
    DisplayStatus = 0x0103,
    VideoKeyRequest = 0x0104,

    // Audio (0x02xx)
    AudioData = 0x0200,
    AudioConfig = 0x0201,
    AudioControl = 0x0202,

    // Input (0x03xx)
    MouseMove = 0x0300,
    MouseButton = 0x0301,
    MouseScroll = 0x0302,
    CursorReturn = 0x0303,
    KeyDown = 0x0310,
    KeyUp = 0x0311,
    ClipboardSync = 0x0320,
    KvmConfig = 0x0330,
}

impl MessageType {
    pub fn from_u16(value: u16) -> Option<Self> {
        use MessageType::*;
        Some(match value {
            0x0001 => Handshake,
            0x0002 => HandshakeAck,
            0x0003 => Heartbeat,
            0x0004 => Disconnect,
            0x0100 => VideoFrame,
            0x0101 => VideoConfig,
            0x0102 => DisplaySwitch,
            0x0103 => DisplayStatus,
            0x0104 => VideoKeyRequest,
            0x0200 => AudioData,
            0x0201 => AudioConfig,
            0x0202 => AudioControl,
            0x0300 => MouseMove,
            0x0301 => MouseButton,
            0x0302 => MouseScroll,
            0x0303 => CursorReturn,
            0x0310 => KeyDown,
            0x0311 => KeyUp,
            0x0320 => ClipboardSync,
            0x0330 => KvmConfig,
            _ => return None,
        })
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// The channel this message type is carried on. `DisplaySwitch` and
    /// `VideoKeyRequest` are video-family types but travel on Control.
    pub fn channel(self) -> Channel {
        use MessageType::*;
        match self {
            Handshake | HandshakeAck | Heartbeat | Disconnect | DisplaySwitch
            | VideoKeyRequest => Channel::Control,
            VideoFrame | VideoConfig | DisplayStatus => Channel::Video,
            AudioData | AudioConfig | AudioControl => Channel::Audio,
            MouseMove | MouseButton | MouseScroll | CursorReturn | KeyDown | KeyUp
            | ClipboardSync | KvmConfig => Channel::Control,
        }
    }
}

/// Bitfield carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageFlags(pub u16);

impl MessageFlags {
    pub const COMPRESSED: u16 = 1 << 0;
    pub const ENCRYPTED: u16 = 1 << 1;
    pub const PRIORITY: u16 = 1 << 2;
    pub const KEY_FRAME: u16 = 1 << 3;

    pub const NONE: MessageFlags = MessageFlags(0);

    pub fn is_compressed(self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn is_priority(self) -> bool {
        self.0 & Self::PRIORITY != 0
    }

    pub fn is_key_frame(self) -> bool {
        self.0 & Self::KEY_FRAME != 0
    }

    pub fn with(self, bit: u16) -> Self {
        MessageFlags(self.0 | bit)
    }
}

/// A fully-framed message: type, flags, and an opaque payload.
///
/// `Message` never validates its own payload against `message_type` — that
/// is the codec's job. It exists so the transport layer can move a
/// completely generic unit across the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_type: MessageType,
    pub flags: MessageFlags,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(message_type: MessageType, flags: MessageFlags, payload: Vec<u8>) -> Self {
        Self {
            message_type,
            flags,
            payload,
        }
    }

    pub fn empty(message_type: MessageType) -> Self {
        Self::new(message_type, MessageFlags::NONE, Vec::new())
    }
}

// ── Application-level payload schemas ─────────────────────────────────────

/// `Handshake` / `HandshakeAck` JSON payload.
///
/// Unknown fields are ignored on decode (`#[serde(deny_unknown_fields)]` is
/// deliberately absent). A missing required field aborts the session —
/// callers surface `serde_json`'s error through `HandshakeError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    #[serde(rename = "AppVersion")]
    pub app_version: String,
    #[serde(rename = "DeviceName")]
    pub device_name: String,
    #[serde(rename = "Platform")]
    pub platform: Platform,
    #[serde(rename = "DisplayWidth")]
    pub display_width: u32,
    #[serde(rename = "DisplayHeight")]
    pub display_height: u32,
    #[serde(rename = "RefreshRate")]
    pub refresh_rate: u32,
    #[serde(rename = "SupportsAudio")]
    pub supports_audio: bool,
    #[serde(rename = "SupportsInput")]
    pub supports_input: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
}

/// Codec committed for the session's `VideoFrame` sub-header layout.
/// `VideoConfig` is only meaningful once, before the first `VideoFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    Raw,
    H264,
    H265,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoConfigPayload {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Local,
    StreamToCompanion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySwitchPayload {
    pub mode: DisplayMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayStatusPayload {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

/// Raw BGRA `VideoFrame` sub-header (16 bytes) + pixel payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVideoFrame {
    pub width: i32,
    pub height: i32,
    pub stride: i32,
    pub frame_number: i32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedFrameType {
    P = 0,
    Idr = 1,
    B = 2,
}

impl EncodedFrameType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::P),
            1 => Some(Self::Idr),
            2 => Some(Self::B),
            _ => None,
        }
    }
}

/// Encoded H.264/H.265 `VideoFrame` sub-header (22 bytes) + NAL payload.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVideoFrame {
    pub width: i32,
    pub height: i32,
    pub codec: u8,
    pub frame_type: EncodedFrameType,
    pub pts_us: i64,
    pub data: Vec<u8>,
}

/// Decoded `VideoFrame` payload; which variant to expect is fixed per
/// session by the `VideoConfig` exchanged before streaming starts.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoFramePayload {
    Raw(RawVideoFrame),
    Encoded(EncodedVideoFrame),
}

/// `AudioData` payload: an 8-byte timestamp prefix followed by interleaved
/// little-endian PCM16 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDataPayload {
    pub timestamp_us: i64,
    pub pcm: Vec<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioConfigPayload {
    #[serde(rename = "SampleRate")]
    pub sample_rate: u32,
    #[serde(rename = "Channels")]
    pub channels: u8,
    #[serde(rename = "BitsPerSample")]
    pub bits_per_sample: u8,
    #[serde(rename = "BufferMs")]
    pub buffer_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRouting {
    WindowsToMac = 0,
    MacToWindows = 1,
    Both = 2,
    Muted = 3,
}

impl AudioRouting {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::WindowsToMac),
            1 => Some(Self::MacToWindows),
            2 => Some(Self::Both),
            3 => Some(Self::Muted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Button4,
    Button5,
}

impl MouseButton {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Middle),
            3 => Some(Self::Button4),
            4 => Some(Self::Button5),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Middle => 2,
            Self::Button4 => 3,
            Self::Button5 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEventType {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseMovePayload {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseButtonPayload {
    pub button: MouseButton,
    pub event_type: ButtonEventType,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseScrollPayload {
    pub delta_x: i16,
    pub delta_y: i16,
    pub x: i32,
    pub y: i32,
}

/// `CursorReturn` carries the edge and normalized crossing position the
/// companion observed informationally — the host does not need it to
/// compute the handback, but it makes the handback feel continuous.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorReturnPayload {
    pub edge: crate::domain::kvm::Edge,
    pub normalized_position: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventPayload {
    pub hid_code: u16,
    pub modifiers: u8,
}

/// `KvmConfig`: initial dead-zone/edge-offset configuration pushed from the
/// host to the companion at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KvmConfigPayload {
    pub dead_zone_px: u32,
    pub edge_offset: f32,
}
