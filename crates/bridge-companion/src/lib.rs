//! bridge-companion library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the companion do? (for beginners)
//!
//! The companion is the macOS (or Linux) side of the bridge. When the host
//! user's cursor crosses the configured screen edge, the host starts
//! forwarding mouse and keyboard events to the companion over the Control
//! channel. The companion:
//!
//! 1. Listens on the three fixed TCP ports and completes the handshake.
//! 2. Receives `MouseMove`/`MouseButton`/`MouseScroll`/`KeyDown`/`KeyUp`
//!    messages and replays them as real system input.
//! 3. Translates the platform-independent HID key codes to OS-native codes.
//! 4. Decodes `VideoFrame` messages and plays back `AudioData` through the
//!    platform's audio mixer.
//! 5. Watches its own injected cursor position and emits `CursorReturn` when
//!    it would leave its screen, handing focus back to the host.

/// Application layer: use cases for the companion.
pub mod application;

/// Infrastructure layer: OS adapters and network I/O.
pub mod infrastructure;
