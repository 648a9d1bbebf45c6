//! EmulateInputUseCase: translates received protocol messages to OS input events.
//!
//! This use case sits at the application layer and delegates to a
//! [`PlatformInputEmulator`] trait object for OS-level event injection.
//! The platform-specific implementations are in the infrastructure layer.
//! Key codes are HID Usage IDs; unmapped codes are silently dropped rather
//! than surfaced as errors.

use bridge_core::keymap::HidKeyCode;
use bridge_core::protocol::messages::{ButtonEventType, KeyEventKind, MouseButton};
use thiserror::Error;
use tracing::debug;

/// Error type for input emulation operations.
#[derive(Debug, Error)]
pub enum EmulationError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("invalid key code: {0:?}")]
    InvalidKeyCode(HidKeyCode),
    #[error("emulator not initialized")]
    NotInitialized,
}

/// Platform-agnostic input emulation trait.
///
/// Each supported OS provides an implementation in the infrastructure layer.
/// `modifiers` is the bitfield carried on [`KeyEventPayload`](bridge_core::protocol::messages::KeyEventPayload)
/// (bit 0 ctrl, bit 1 shift, bit 2 alt, bit 3 meta); most backends ignore it
/// since the modifier keys arrive as their own key events, but it is passed
/// through for platforms that want it.
pub trait PlatformInputEmulator: Send + Sync {
    /// Emulates a key press (key-down event).
    fn emit_key_down(&self, key: HidKeyCode, modifiers: u8) -> Result<(), EmulationError>;

    /// Emulates a key release (key-up event).
    fn emit_key_up(&self, key: HidKeyCode, modifiers: u8) -> Result<(), EmulationError>;

    /// Moves the cursor to an absolute position in the companion's
    /// coordinate space.
    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError>;

    /// Emulates a mouse button press or release.
    fn emit_mouse_button(
        &self,
        button: MouseButton,
        pressed: bool,
        x: i32,
        y: i32,
    ) -> Result<(), EmulationError>;

    /// Emulates mouse wheel scroll.
    fn emit_mouse_scroll(&self, delta_x: i16, delta_y: i16) -> Result<(), EmulationError>;
}

/// Filters duplicate consecutive mouse-move events to avoid injecting the
/// same position twice back to back (the host may forward a position that
/// didn't actually change while scaling rounds to the same companion pixel).
#[derive(Default)]
struct DedupFilter {
    last_mouse_pos: Option<(i32, i32)>,
}

impl DedupFilter {
    fn should_send_mouse_move(&mut self, x: i32, y: i32) -> bool {
        if self.last_mouse_pos == Some((x, y)) {
            return false;
        }
        self.last_mouse_pos = Some((x, y));
        true
    }

    fn reset(&mut self) {
        self.last_mouse_pos = None;
    }
}

/// The Emulate Input use case.
///
/// Receives decoded protocol payloads and dispatches them to the platform
/// emulator. An unmapped HID code is logged and dropped — it is never
/// surfaced as an error that would tear down the session.
pub struct EmulateInputUseCase {
    emulator: std::sync::Arc<dyn PlatformInputEmulator>,
    dedup: DedupFilter,
}

impl EmulateInputUseCase {
    /// Creates a new use case with the given platform emulator.
    pub fn new(emulator: std::sync::Arc<dyn PlatformInputEmulator>) -> Self {
        Self {
            emulator,
            dedup: DedupFilter::default(),
        }
    }

    /// Handles a key event from the host.
    pub fn handle_key_event(
        &self,
        hid_code: u16,
        modifiers: u8,
        kind: KeyEventKind,
    ) -> Result<(), EmulationError> {
        let key = HidKeyCode::from_u16(hid_code);
        let result = match kind {
            KeyEventKind::Down => self.emulator.emit_key_down(key, modifiers),
            KeyEventKind::Up => self.emulator.emit_key_up(key, modifiers),
        };
        if let Err(EmulationError::InvalidKeyCode(k)) = &result {
            debug!(hid_code = k.as_u16(), "unmapped key code, dropping");
            return Ok(());
        }
        result
    }

    /// Handles a mouse move event from the host.
    ///
    /// Duplicate consecutive positions are filtered out.
    pub fn handle_mouse_move(&mut self, x: i32, y: i32) -> Result<(), EmulationError> {
        if self.dedup.should_send_mouse_move(x, y) {
            self.emulator.emit_mouse_move(x, y)?;
        }
        Ok(())
    }

    /// Handles a mouse button event from the host.
    pub fn handle_mouse_button(
        &self,
        button: MouseButton,
        event_type: ButtonEventType,
        x: i32,
        y: i32,
    ) -> Result<(), EmulationError> {
        let pressed = matches!(event_type, ButtonEventType::Press);
        self.emulator.emit_mouse_button(button, pressed, x, y)
    }

    /// Handles a mouse scroll event from the host.
    pub fn handle_mouse_scroll(&self, delta_x: i16, delta_y: i16) -> Result<(), EmulationError> {
        self.emulator.emit_mouse_scroll(delta_x, delta_y)
    }

    /// Resets internal state (e.g., on a fresh `DisplaySwitch`/reconnect).
    pub fn reset(&mut self) {
        self.dedup.reset();
    }
}
