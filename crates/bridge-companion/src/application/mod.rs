//! Application layer use cases for the companion process.
//!
//! # What use cases does the companion have?
//!
//! - **`session`** – The top-level state machine: listen for the host on
//!   the three fixed ports, handshake, then dispatch incoming video/audio/
//!   input messages until the host disconnects.
//! - **`emulate_input`** – Translates received input events (platform-
//!   independent HID key codes) into OS-native input calls. The actual OS
//!   call is made by a `PlatformInputEmulator` implementation injected at
//!   construction time.
//! - **`audio_playback`** – Jitter-buffers incoming `AudioData` packets and
//!   schedules them for playback, honoring `AudioControl` routing.
//! - **`video_playback`** – Reconstructs raw frames from the host's
//!   keyframe + XOR-delta stream.
//! - **`cursor_watch`** – Mirrors the host's edge detection: watches
//!   forwarded cursor positions and signals `CursorReturn` when they reach
//!   an edge of the companion's own screen rectangle.

pub mod audio_playback;
pub mod cursor_watch;
pub mod emulate_input;
pub mod session;
pub mod video_playback;
