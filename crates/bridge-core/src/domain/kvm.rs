//! The Smart KVM focus/edge-crossing state machine.
//!
//! There is exactly one host and one companion screen, so the state is a
//! single enum rather than a graph of adjacent regions: focus lives on
//! [`Focus::Host`] or [`Focus::Companion`],
//! and a crossing flips it. The machine owns no I/O — it decides *that* a
//! transition happened and *what* entry coordinate the companion should use;
//! the caller (the host's input-routing use case) is responsible for
//! actually clipping the cursor and forwarding events.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the four edges of a rectangular screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Top),
            3 => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Which machine currently owns the user's keyboard and mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Focus {
    Host,
    Companion,
}

/// A rectangle in screen-pixel space. `right`/`bottom` are exclusive, matching
/// the host's primary-monitor coordinate convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Errors raised by state machine operations.
#[derive(Debug, Error, PartialEq)]
pub enum KvmError {
    #[error("dead zone must be in 0..=4 px, got {0}")]
    InvalidDeadZone(u32),
    #[error("edge_offset must be in [0, 1], got {0}")]
    InvalidEdgeOffset(f32),
    #[error("hook install failed: {0}")]
    HookInstallFailed(String),
}

/// The full KVM state: focus plus the geometry needed to detect crossings
/// and map coordinates between the two machines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KvmState {
    pub focus: Focus,
    pub host_primary_rect: Rect,
    pub companion_rect: Rect,
    pub edge: Edge,
    pub dead_zone_px: i32,
    pub edge_offset: f32,
}

impl KvmState {
    pub fn new(
        host_primary_rect: Rect,
        companion_rect: Rect,
        edge: Edge,
        dead_zone_px: u32,
        edge_offset: f32,
    ) -> Result<Self, KvmError> {
        if dead_zone_px > 4 {
            return Err(KvmError::InvalidDeadZone(dead_zone_px));
        }
        if !(0.0..=1.0).contains(&edge_offset) {
            return Err(KvmError::InvalidEdgeOffset(edge_offset));
        }
        Ok(Self {
            focus: Focus::Host,
            host_primary_rect,
            companion_rect,
            edge,
            dead_zone_px: dead_zone_px as i32,
            edge_offset,
        })
    }
}

/// The host cursor's physical position the instant a crossing is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub x: i32,
    pub y: i32,
}

/// Instructions the caller must carry out as the mechanical side-effect of
/// a `Host -> Companion` transition. The state machine computes these; it
/// never touches the OS cursor or a socket itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnterCompanion {
    /// Entry coordinate in companion screen space.
    pub entry_x: i32,
    pub entry_y: i32,
}

/// Mirror of the above for `Companion -> Host`: where, proportionally, to
/// place the returning host cursor along the crossed edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnterHost {
    pub normalized_position: f32,
}

/// The Smart KVM focus/edge-crossing state machine.
///
/// Pure domain logic: every method takes the current state by value (or
/// `&mut self`) and returns what changed, never performing I/O. Owning code
/// (`bridge-host`'s input-routing use case) interprets the transition: it
/// clips/hides the cursor, flips the hook suppression flag, and sends the
/// resulting `MouseMove`/`CursorReturn` message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KvmStateMachine {
    state: KvmState,
}

impl KvmStateMachine {
    pub fn new(state: KvmState) -> Self {
        Self { state }
    }

    pub fn focus(&self) -> Focus {
        self.state.focus
    }

    pub fn state(&self) -> &KvmState {
        &self.state
    }

    /// Replaces the dead zone / edge / edge_offset configuration in place
    /// (e.g. on a `KvmConfig` update). Focus is left untouched.
    pub fn reconfigure(
        &mut self,
        edge: Edge,
        dead_zone_px: u32,
        edge_offset: f32,
    ) -> Result<(), KvmError> {
        if dead_zone_px > 4 {
            return Err(KvmError::InvalidDeadZone(dead_zone_px));
        }
        if !(0.0..=1.0).contains(&edge_offset) {
            return Err(KvmError::InvalidEdgeOffset(edge_offset));
        }
        self.state.edge = edge;
        self.state.dead_zone_px = dead_zone_px as i32;
        self.state.edge_offset = edge_offset;
        Ok(())
    }

    /// True if `pos` has crossed into the dead zone of the configured edge.
    /// Only meaningful while `focus == Host` — the caller is expected to
    /// stop calling this once focus has moved to the companion.
    pub fn crosses_edge(&self, pos: CursorPosition) -> bool {
        let rect = &self.state.host_primary_rect;
        let d = self.state.dead_zone_px;
        match self.state.edge {
            Edge::Right => pos.x >= rect.right - d,
            Edge::Left => pos.x <= rect.left + d,
            Edge::Top => pos.y <= rect.top + d,
            Edge::Bottom => pos.y >= rect.bottom - d,
        }
    }

    /// Evaluates a host cursor position and transitions `Host -> Companion`
    /// if it has crossed the edge. Returns `None` if focus is already
    /// `Companion` or the position hasn't crossed.
    pub fn evaluate_edge(&mut self, pos: CursorPosition) -> Option<EnterCompanion> {
        if self.state.focus != Focus::Host {
            return None;
        }
        if !self.crosses_edge(pos) {
            return None;
        }
        self.state.focus = Focus::Companion;
        Some(self.compute_entry(pos))
    }

    /// Proportionally maps the crossing position along the host edge into
    /// the companion rectangle. Rounds down (`floor`), matching the
    /// testable-properties contract `⌊(p/L) · companion_dim⌋`.
    fn compute_entry(&self, pos: CursorPosition) -> EnterCompanion {
        let host = &self.state.host_primary_rect;
        let companion = &self.state.companion_rect;
        match self.state.edge {
            Edge::Right | Edge::Left => {
                let l = host.height().max(1) as f32;
                let p = (pos.y - host.top) as f32;
                let ratio = (p / l).clamp(0.0, 1.0);
                let entry_y = companion.top + (ratio * companion.height() as f32).floor() as i32;
                let entry_x = if self.state.edge == Edge::Right {
                    companion.left
                } else {
                    companion.right.saturating_sub(1)
                };
                EnterCompanion { entry_x, entry_y }
            }
            Edge::Top | Edge::Bottom => {
                let l = host.width().max(1) as f32;
                let p = (pos.x - host.left) as f32;
                let ratio = (p / l).clamp(0.0, 1.0);
                let entry_x = companion.left + (ratio * companion.width() as f32).floor() as i32;
                let entry_y = if self.state.edge == Edge::Bottom {
                    companion.top
                } else {
                    companion.bottom.saturating_sub(1)
                };
                EnterCompanion { entry_x, entry_y }
            }
        }
    }

    /// Scales a raw host cursor position into companion space while focus
    /// is `Companion`. Used for every `MouseMove` forwarded while crossed.
    pub fn scale_to_companion(&self, pos: CursorPosition) -> (i32, i32) {
        let host = &self.state.host_primary_rect;
        let companion = &self.state.companion_rect;
        let x_ratio = (pos.x - host.left) as f32 / host.width().max(1) as f32;
        let y_ratio = (pos.y - host.top) as f32 / host.height().max(1) as f32;
        let x = companion.left + (x_ratio.clamp(0.0, 1.0) * companion.width() as f32) as i32;
        let y = companion.top + (y_ratio.clamp(0.0, 1.0) * companion.height() as f32) as i32;
        (x, y)
    }

    /// Companion signaled `CursorReturn`, or the user pressed the manual
    /// toggle hotkey. Transitions `Companion -> Host` unconditionally.
    pub fn return_to_host(&mut self, info: Option<EnterHost>) -> Option<EnterHost> {
        if self.state.focus != Focus::Companion {
            return None;
        }
        self.state.focus = Focus::Host;
        info
    }

    /// Manual hotkey toggle: flips focus regardless of edge position. When
    /// entering the companion this way there is no crossing coordinate, so
    /// the companion keeps its last-known cursor position.
    pub fn toggle(&mut self) -> Focus {
        self.state.focus = match self.state.focus {
            Focus::Host => Focus::Companion,
            Focus::Companion => Focus::Host,
        };
        self.state.focus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> KvmStateMachine {
        let host = Rect::new(0, 0, 1920, 1080);
        let companion = Rect::new(0, 0, 1920, 1080);
        let state = KvmState::new(host, companion, Edge::Right, 2, 0.0).unwrap();
        KvmStateMachine::new(state)
    }

    #[test]
    fn stays_host_inside_dead_zone() {
        let mut m = machine();
        assert!(m.evaluate_edge(CursorPosition { x: 1918, y: 500 }).is_none());
        assert_eq!(m.focus(), Focus::Host);
    }

    #[test]
    fn crosses_to_companion_at_dead_zone_boundary() {
        let mut m = machine();
        let entry = m
            .evaluate_edge(CursorPosition { x: 1919, y: 500 })
            .expect("should cross");
        assert_eq!(m.focus(), Focus::Companion);
        assert_eq!(entry.entry_x, 0);
        assert!((entry.entry_y - 500).abs() <= 1);
    }

    #[test]
    fn proportional_mapping_scales_to_companion_dimensions() {
        let mut m = KvmStateMachine::new(
            KvmState::new(
                Rect::new(0, 0, 1920, 1080),
                Rect::new(0, 0, 3840, 2160),
                Edge::Right,
                0,
                0.0,
            )
            .unwrap(),
        );
        let entry = m.evaluate_edge(CursorPosition { x: 1920, y: 540 }).unwrap();
        assert_eq!(entry.entry_y, 1080);
    }

    #[test]
    fn return_to_host_releases_focus() {
        let mut m = machine();
        m.evaluate_edge(CursorPosition { x: 1920, y: 0 }).unwrap();
        assert_eq!(m.focus(), Focus::Companion);
        let back = m.return_to_host(Some(EnterHost { normalized_position: 0.5 }));
        assert_eq!(m.focus(), Focus::Host);
        assert_eq!(back, Some(EnterHost { normalized_position: 0.5 }));
    }

    #[test]
    fn return_to_host_is_noop_when_already_host() {
        let mut m = machine();
        assert_eq!(m.return_to_host(None), None);
        assert_eq!(m.focus(), Focus::Host);
    }

    #[test]
    fn evaluate_edge_is_noop_once_focus_is_companion() {
        let mut m = machine();
        m.evaluate_edge(CursorPosition { x: 1920, y: 0 }).unwrap();
        assert!(m.evaluate_edge(CursorPosition { x: 1920, y: 10 }).is_none());
    }

    #[test]
    fn toggle_flips_focus_both_directions() {
        let mut m = machine();
        assert_eq!(m.toggle(), Focus::Companion);
        assert_eq!(m.toggle(), Focus::Host);
    }

    #[test]
    fn left_edge_detection() {
        let state = KvmState::new(
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1920, 1080),
            Edge::Left,
            2,
            0.0,
        )
        .unwrap();
        let mut m = KvmStateMachine::new(state);
        assert!(m.evaluate_edge(CursorPosition { x: 2, y: 0 }).is_none());
        assert!(m.evaluate_edge(CursorPosition { x: 1, y: 0 }).is_some());
    }

    #[test]
    fn invalid_dead_zone_rejected() {
        let err = KvmState::new(
            Rect::new(0, 0, 100, 100),
            Rect::new(0, 0, 100, 100),
            Edge::Right,
            10,
            0.0,
        )
        .unwrap_err();
        assert_eq!(err, KvmError::InvalidDeadZone(10));
    }

    #[test]
    fn invalid_edge_offset_rejected() {
        let err = KvmState::new(
            Rect::new(0, 0, 100, 100),
            Rect::new(0, 0, 100, 100),
            Edge::Right,
            0,
            1.5,
        )
        .unwrap_err();
        assert_eq!(err, KvmError::InvalidEdgeOffset(1.5));
    }

    #[test]
    fn scale_to_companion_clamps_within_bounds() {
        let m = machine();
        let (x, y) = m.scale_to_companion(CursorPosition { x: -50, y: 5000 });
        assert_eq!(x, 0);
        assert_eq!(y, 1080);
    }
}
