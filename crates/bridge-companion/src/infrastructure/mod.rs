//! Infrastructure layer for the companion.
//!
//! Contains OS-facing adapters: input emulation APIs, TCP network I/O
//! (listening and handshaking with the host), audio playback, and primary
//! display queries.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `bridge_core`, but MUST NOT be imported by the domain layer.

pub mod audio_playback;
pub mod input_emulation;
pub mod network;
pub mod screen_info;
pub mod video_playback;
