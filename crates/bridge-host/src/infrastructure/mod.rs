//! Infrastructure layer for the host process.
//!
//! Contains OS-facing adapters: input capture hooks, screen capture, audio
//! capture, and network sockets.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `bridge_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod audio_capture;
pub mod cursor_control;
pub mod input_capture;
pub mod network;
pub mod screen_capture;
