//! Input routing: drives the Smart KVM state machine off raw capture events
//! and forwards them to the companion while focus is away from the host.
//!
//! This is the hottest path in the host process — every mouse move and key
//! stroke passes through it — so it stays allocation-light and never blocks:
//! transmission happens through the [`InputTransmitter`] trait, implemented
//! by a thin async wrapper around the Control-channel transport.

use bridge_core::domain::kvm::{CursorPosition, Edge, EnterHost, Focus, KvmStateMachine};
use bridge_core::keymap::KeyMapper;
use bridge_core::protocol::messages::{
    ButtonEventType, CursorReturnPayload, KeyEventKind, KeyEventPayload, MouseButton as ProtoMouseButton,
    MouseButtonPayload, MouseMovePayload, MouseScrollPayload,
};
use thiserror::Error;
use tracing::info;

use crate::infrastructure::input_capture::{MouseButton as CapturedMouseButton, RawInputEvent};

/// Windows virtual-key codes for the modifier keys tracked independently of
/// focus so the toggle hotkey works while the companion owns input.
mod vk {
    pub const LCONTROL: u8 = 0xA2;
    pub const RCONTROL: u8 = 0xA3;
    pub const LSHIFT: u8 = 0xA0;
    pub const RSHIFT: u8 = 0xA1;
    pub const LMENU: u8 = 0xA4; // Alt
    pub const RMENU: u8 = 0xA5;
    pub const LWIN: u8 = 0x5B;
    pub const RWIN: u8 = 0x5C;
    pub const K: u8 = 0x4B;
}

/// Errors raised while routing input. All are recoverable — the caller logs
/// and continues rather than tearing the session down, since a single
/// dropped input event is not session-fatal.
#[derive(Debug, Error)]
pub enum RouteInputError {
    #[error("failed to transmit input event: {0}")]
    Transmit(String),
    #[error("failed to update cursor confinement: {0}")]
    CursorControl(String),
}

/// Sends framed input messages to the companion over the Control channel.
///
/// Implemented by a thin wrapper around `bridge_core::transport::Transport`
/// in the infrastructure layer; test doubles record calls instead.
#[async_trait::async_trait]
pub trait InputTransmitter: Send + Sync {
    async fn send_mouse_move(&self, payload: MouseMovePayload) -> Result<(), RouteInputError>;
    async fn send_mouse_button(&self, payload: MouseButtonPayload) -> Result<(), RouteInputError>;
    async fn send_mouse_scroll(&self, payload: MouseScrollPayload) -> Result<(), RouteInputError>;
    async fn send_key_event(&self, payload: KeyEventPayload, kind: KeyEventKind) -> Result<(), RouteInputError>;
}

/// Confines, releases, and hides/shows the host OS cursor on a KVM
/// transition. Implemented over the Win32 `ClipCursor`/`ShowCursor` APIs;
/// test doubles record calls instead.
pub trait CursorController: Send + Sync {
    fn clip_to(&self, rect: bridge_core::domain::kvm::Rect) -> Result<(), RouteInputError>;
    fn release_clip(&self) -> Result<(), RouteInputError>;
    fn hide(&self);
    fn show(&self);
}

/// Tracks modifier key state independently of KVM focus so the toggle
/// hotkey (Ctrl+Alt+K) is detected even while the companion owns input.
#[derive(Debug, Default, Clone, Copy)]
struct ModifierState {
    ctrl: bool,
    shift: bool,
    alt: bool,
    meta: bool,
}

impl ModifierState {
    fn apply(&mut self, vk_code: u8, down: bool) {
        match vk_code {
            vk::LCONTROL | vk::RCONTROL => self.ctrl = down,
            vk::LSHIFT | vk::RSHIFT => self.shift = down,
            vk::LMENU | vk::RMENU => self.alt = down,
            vk::LWIN | vk::RWIN => self.meta = down,
            _ => {}
        }
    }

    fn as_bits(&self) -> u8 {
        (self.ctrl as u8) | ((self.shift as u8) << 1) | ((self.alt as u8) << 2) | ((self.meta as u8) << 3)
    }
}

/// Consumes raw capture events, drives the Smart KVM state machine, and
/// forwards events to the companion while focus is `Companion`.
pub struct RouteInputUseCase<T: InputTransmitter, C: CursorController> {
    kvm: KvmStateMachine,
    transmitter: T,
    cursor: C,
    modifiers: ModifierState,
}

impl<T: InputTransmitter, C: CursorController> RouteInputUseCase<T, C> {
    pub fn new(kvm: KvmStateMachine, transmitter: T, cursor: C) -> Self {
        Self {
            kvm,
            transmitter,
            cursor,
            modifiers: ModifierState::default(),
        }
    }

    pub fn focus(&self) -> Focus {
        self.kvm.focus()
    }

    /// Handles one raw capture event. Returns `true` if the host hook should
    /// suppress delivering this event to the local OS (focus is, or just
    /// became, `Companion`).
    pub async fn handle_event(&mut self, event: RawInputEvent) -> Result<bool, RouteInputError> {
        self.track_modifiers(&event);

        if self.hotkey_just_completed(&event) {
            return self.toggle().await;
        }

        match self.kvm.focus() {
            Focus::Host => self.handle_while_host(event).await,
            Focus::Companion => self.handle_while_companion(event).await,
        }
    }

    /// Companion signaled `CursorReturn`: release focus back to the host.
    pub async fn handle_cursor_return(&mut self, payload: CursorReturnPayload) -> Result<(), RouteInputError> {
        let info = EnterHost {
            normalized_position: payload.normalized_position,
        };
        if self.kvm.return_to_host(Some(info)).is_some() {
            info!(edge = ?payload.edge, "companion returned focus to host");
            self.cursor.release_clip()?;
            self.cursor.show();
        }
        Ok(())
    }

    async fn toggle(&mut self) -> Result<bool, RouteInputError> {
        match self.kvm.toggle() {
            Focus::Companion => {
                info!("focus toggled to companion via hotkey");
                let rect = self.kvm.state().host_primary_rect;
                self.cursor.clip_to(rect)?;
                self.cursor.hide();
                Ok(true)
            }
            Focus::Host => {
                info!("focus toggled to host via hotkey");
                self.cursor.release_clip()?;
                self.cursor.show();
                Ok(false)
            }
        }
    }

    async fn handle_while_host(&mut self, event: RawInputEvent) -> Result<bool, RouteInputError> {
        if let RawInputEvent::MouseMove { x, y, .. } = event {
            if let Some(entry) = self.kvm.evaluate_edge(CursorPosition { x, y }) {
                info!(entry_x = entry.entry_x, entry_y = entry.entry_y, "cursor crossed edge into companion");
                let rect = self.kvm.state().host_primary_rect;
                self.cursor.clip_to(rect)?;
                self.cursor.hide();
                self.transmitter
                    .send_mouse_move(MouseMovePayload {
                        x: entry.entry_x,
                        y: entry.entry_y,
                    })
                    .await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn handle_while_companion(&mut self, event: RawInputEvent) -> Result<bool, RouteInputError> {
        match event {
            RawInputEvent::MouseMove { x, y, .. } => {
                let (cx, cy) = self.kvm.scale_to_companion(CursorPosition { x, y });
                self.transmitter
                    .send_mouse_move(MouseMovePayload { x: cx, y: cy })
                    .await?;
            }
            RawInputEvent::MouseButtonDown { button, x, y, .. } => {
                let (cx, cy) = self.kvm.scale_to_companion(CursorPosition { x, y });
                self.transmitter
                    .send_mouse_button(MouseButtonPayload {
                        button: translate_mouse_button(button),
                        event_type: ButtonEventType::Press,
                        x: cx,
                        y: cy,
                    })
                    .await?;
            }
            RawInputEvent::MouseButtonUp { button, x, y, .. } => {
                let (cx, cy) = self.kvm.scale_to_companion(CursorPosition { x, y });
                self.transmitter
                    .send_mouse_button(MouseButtonPayload {
                        button: translate_mouse_button(button),
                        event_type: ButtonEventType::Release,
                        x: cx,
                        y: cy,
                    })
                    .await?;
            }
            RawInputEvent::MouseWheel { delta, x, y, .. } => {
                let (cx, cy) = self.kvm.scale_to_companion(CursorPosition { x, y });
                self.transmitter
                    .send_mouse_scroll(MouseScrollPayload {
                        delta_x: 0,
                        delta_y: delta,
                        x: cx,
                        y: cy,
                    })
                    .await?;
            }
            RawInputEvent::MouseWheelH { delta, x, y, .. } => {
                let (cx, cy) = self.kvm.scale_to_companion(CursorPosition { x, y });
                self.transmitter
                    .send_mouse_scroll(MouseScrollPayload {
                        delta_x: delta,
                        delta_y: 0,
                        x: cx,
                        y: cy,
                    })
                    .await?;
            }
            RawInputEvent::KeyDown { vk_code, .. } => {
                let hid = KeyMapper::windows_vk_to_hid(vk_code);
                self.transmitter
                    .send_key_event(
                        KeyEventPayload {
                            hid_code: hid.as_u16(),
                            modifiers: self.modifiers.as_bits(),
                        },
                        KeyEventKind::Down,
                    )
                    .await?;
            }
            RawInputEvent::KeyUp { vk_code, .. } => {
                let hid = KeyMapper::windows_vk_to_hid(vk_code);
                self.transmitter
                    .send_key_event(
                        KeyEventPayload {
                            hid_code: hid.as_u16(),
                            modifiers: self.modifiers.as_bits(),
                        },
                        KeyEventKind::Up,
                    )
                    .await?;
            }
        }
        Ok(true)
    }

    fn track_modifiers(&mut self, event: &RawInputEvent) {
        match *event {
            RawInputEvent::KeyDown { vk_code, .. } => self.modifiers.apply(vk_code, true),
            RawInputEvent::KeyUp { vk_code, .. } => self.modifiers.apply(vk_code, false),
            _ => {}
        }
    }

    /// Detects the Ctrl+Alt+K toggle hotkey completing on this event (the
    /// 'K' keydown, with ctrl+alt already held).
    fn hotkey_just_completed(&self, event: &RawInputEvent) -> bool {
        matches!(
            event,
            RawInputEvent::KeyDown { vk_code, .. } if *vk_code == vk::K
        ) && self.modifiers.ctrl
            && self.modifiers.alt
    }
}

fn translate_mouse_button(button: CapturedMouseButton) -> ProtoMouseButton {
    match button {
        CapturedMouseButton::Left => ProtoMouseButton::Left,
        CapturedMouseButton::Right => ProtoMouseButton::Right,
        CapturedMouseButton::Middle => ProtoMouseButton::Middle,
        CapturedMouseButton::X1 => ProtoMouseButton::Button4,
        CapturedMouseButton::X2 => ProtoMouseButton::Button5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::domain::kvm::{KvmState, Rect};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransmitter {
        moves: Mutex<Vec<MouseMovePayload>>,
        buttons: Mutex<Vec<MouseButtonPayload>>,
        scrolls: Mutex<Vec<MouseScrollPayload>>,
        keys: Mutex<Vec<(KeyEventPayload, KeyEventKind)>>,
    }

    #[async_trait::async_trait]
    impl InputTransmitter for RecordingTransmitter {
        async fn send_mouse_move(&self, payload: MouseMovePayload) -> Result<(), RouteInputError> {
            self.moves.lock().unwrap().push(payload);
            Ok(())
        }
        async fn send_mouse_button(&self, payload: MouseButtonPayload) -> Result<(), RouteInputError> {
            self.buttons.lock().unwrap().push(payload);
            Ok(())
        }
        async fn send_mouse_scroll(&self, payload: MouseScrollPayload) -> Result<(), RouteInputError> {
            self.scrolls.lock().unwrap().push(payload);
            Ok(())
        }
        async fn send_key_event(&self, payload: KeyEventPayload, kind: KeyEventKind) -> Result<(), RouteInputError> {
            self.keys.lock().unwrap().push((payload, kind));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingCursorController {
        clipped: Mutex<Option<Rect>>,
        hidden: Mutex<bool>,
    }

    impl CursorController for RecordingCursorController {
        fn clip_to(&self, rect: Rect) -> Result<(), RouteInputError> {
            *self.clipped.lock().unwrap() = Some(rect);
            Ok(())
        }
        fn release_clip(&self) -> Result<(), RouteInputError> {
            *self.clipped.lock().unwrap() = None;
            Ok(())
        }
        fn hide(&self) {
            *self.hidden.lock().unwrap() = true;
        }
        fn show(&self) {
            *self.hidden.lock().unwrap() = false;
        }
    }

    fn use_case() -> RouteInputUseCase<RecordingTransmitter, RecordingCursorController> {
        let state = KvmState::new(
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1920, 1080),
            Edge::Right,
            2,
            0.0,
        )
        .unwrap();
        RouteInputUseCase::new(
            KvmStateMachine::new(state),
            RecordingTransmitter::default(),
            RecordingCursorController::default(),
        )
    }

    #[tokio::test]
    async fn mouse_move_inside_dead_zone_is_not_suppressed() {
        let mut uc = use_case();
        let suppress = uc
            .handle_event(RawInputEvent::MouseMove { x: 1000, y: 500, time_ms: 0 })
            .await
            .unwrap();
        assert!(!suppress);
        assert_eq!(uc.focus(), Focus::Host);
    }

    #[tokio::test]
    async fn crossing_edge_clips_cursor_and_forwards_move() {
        let mut uc = use_case();
        let suppress = uc
            .handle_event(RawInputEvent::MouseMove { x: 1919, y: 500, time_ms: 0 })
            .await
            .unwrap();
        assert!(suppress);
        assert_eq!(uc.focus(), Focus::Companion);
        assert!(uc.cursor.clipped.lock().unwrap().is_some());
        assert_eq!(uc.transmitter.moves.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn events_while_companion_are_forwarded_and_suppressed() {
        let mut uc = use_case();
        uc.handle_event(RawInputEvent::MouseMove { x: 1919, y: 500, time_ms: 0 })
            .await
            .unwrap();

        let suppress = uc
            .handle_event(RawInputEvent::KeyDown {
                vk_code: 0x41,
                scan_code: 0,
                time_ms: 0,
                is_extended: false,
            })
            .await
            .unwrap();
        assert!(suppress);
        assert_eq!(uc.transmitter.keys.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cursor_return_releases_focus_and_clip() {
        let mut uc = use_case();
        uc.handle_event(RawInputEvent::MouseMove { x: 1919, y: 500, time_ms: 0 })
            .await
            .unwrap();
        assert_eq!(uc.focus(), Focus::Companion);

        uc.handle_cursor_return(CursorReturnPayload {
            edge: Edge::Left,
            normalized_position: 0.5,
        })
        .await
        .unwrap();

        assert_eq!(uc.focus(), Focus::Host);
        assert!(uc.cursor.clipped.lock().unwrap().is_none());
        assert!(!*uc.cursor.hidden.lock().unwrap());
    }

    #[tokio::test]
    async fn hotkey_toggles_focus_regardless_of_cursor_position() {
        let mut uc = use_case();

        uc.handle_event(RawInputEvent::KeyDown { vk_code: vk::LCONTROL, scan_code: 0, time_ms: 0, is_extended: false })
            .await
            .unwrap();
        uc.handle_event(RawInputEvent::KeyDown { vk_code: vk::LMENU, scan_code: 0, time_ms: 0, is_extended: false })
            .await
            .unwrap();
        let suppress = uc
            .handle_event(RawInputEvent::KeyDown { vk_code: vk::K, scan_code: 0, time_ms: 0, is_extended: false })
            .await
            .unwrap();

        assert!(suppress);
        assert_eq!(uc.focus(), Focus::Companion);
    }

    #[tokio::test]
    async fn modifier_bits_reflect_held_keys_on_forwarded_key_events() {
        let mut uc = use_case();
        uc.handle_event(RawInputEvent::MouseMove { x: 1919, y: 500, time_ms: 0 })
            .await
            .unwrap();

        uc.handle_event(RawInputEvent::KeyDown { vk_code: vk::LSHIFT, scan_code: 0, time_ms: 0, is_extended: false })
            .await
            .unwrap();
        uc.handle_event(RawInputEvent::KeyDown { vk_code: 0x41, scan_code: 0, time_ms: 0, is_extended: false })
            .await
            .unwrap();

        let keys = uc.transmitter.keys.lock().unwrap();
        let (payload, _) = keys.last().unwrap();
        assert_eq!(payload.modifiers & 0b0010, 0b0010);
    }
}
