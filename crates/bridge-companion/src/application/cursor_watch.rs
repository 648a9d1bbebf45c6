//! Mirrors the host's edge-crossing detection on the companion side: watches
//! the positions forwarded while focus is `Companion` and signals
//! `CursorReturn` once they reach an edge of the companion's own rectangle.
//!
//! `KvmConfigPayload` carries only `dead_zone_px`/`edge_offset`, not the
//! configured `Edge` itself, so unlike the host's `KvmStateMachine` this
//! tracker has no single edge to check — it watches all four.

use bridge_core::domain::kvm::{Edge, Rect};
use bridge_core::protocol::messages::CursorReturnPayload;
use tracing::info;

/// Tracks one companion-side excursion cycle.
///
/// A fresh entry position sits exactly at (or very near) the edge it
/// crossed in from, so the tracker stays unarmed until it has observed a
/// position strictly inside the dead zone margin at least once — otherwise
/// the very first forwarded position would immediately re-trigger a return.
/// Once armed, reaching any edge signals a `CursorReturn` and suppresses
/// further forwarding until the next fresh entry arrives.
pub struct CursorExcursionTracker {
    rect: Rect,
    dead_zone_px: u32,
    armed: bool,
    signaled: bool,
}

impl CursorExcursionTracker {
    pub fn new(rect: Rect, dead_zone_px: u32) -> Self {
        Self {
            rect,
            dead_zone_px,
            armed: false,
            signaled: false,
        }
    }

    pub fn reconfigure(&mut self, dead_zone_px: u32) {
        self.dead_zone_px = dead_zone_px;
    }

    /// `true` once a `CursorReturn` has been signaled and no new entry
    /// position has been observed since. Callers should drop all forwarded
    /// input while this holds.
    pub fn is_suppressed(&self) -> bool {
        self.signaled
    }

    /// Observes one forwarded mouse position. Returns the `CursorReturn`
    /// payload to send the instant this position reaches an edge while
    /// armed; otherwise returns `None`.
    pub fn observe(&mut self, x: i32, y: i32) -> Option<CursorReturnPayload> {
        if self.signaled {
            // First position after a return is the new entry point; it
            // always sits at an edge, so start a fresh cycle unarmed.
            self.signaled = false;
            self.armed = false;
            return None;
        }

        match self.edge_hit(x, y) {
            Some((edge, normalized_position)) if self.armed => {
                self.signaled = true;
                info!(?edge, normalized_position, "injected cursor reached companion edge, returning focus");
                Some(CursorReturnPayload { edge, normalized_position })
            }
            Some(_) => None,
            None => {
                self.armed = true;
                None
            }
        }
    }

    /// Per-edge proximity check, mirroring `KvmStateMachine::crosses_edge`.
    fn edge_hit(&self, x: i32, y: i32) -> Option<(Edge, f32)> {
        let d = self.dead_zone_px as i32;
        let r = &self.rect;
        let width = r.width().max(1) as f32;
        let height = r.height().max(1) as f32;

        if x <= r.left + d {
            return Some((Edge::Left, ((y - r.top) as f32 / height).clamp(0.0, 1.0)));
        }
        if x >= r.right - d {
            return Some((Edge::Right, ((y - r.top) as f32 / height).clamp(0.0, 1.0)));
        }
        if y <= r.top + d {
            return Some((Edge::Top, ((x - r.left) as f32 / width).clamp(0.0, 1.0)));
        }
        if y >= r.bottom - d {
            return Some((Edge::Bottom, ((x - r.left) as f32 / width).clamp(0.0, 1.0)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> CursorExcursionTracker {
        CursorExcursionTracker::new(Rect::new(0, 0, 1920, 1080), 2)
    }

    #[test]
    fn entry_position_at_the_edge_does_not_immediately_signal() {
        let mut t = tracker();
        assert_eq!(t.observe(0, 500), None);
        assert!(!t.is_suppressed());
    }

    #[test]
    fn moving_inside_then_back_to_an_edge_signals_return() {
        let mut t = tracker();
        t.observe(0, 500);
        assert_eq!(t.observe(900, 500), None);
        let payload = t.observe(1919, 500).expect("should signal at the right edge");
        assert_eq!(payload.edge, Edge::Right);
        assert!(t.is_suppressed());
    }

    #[test]
    fn suppressed_after_signal_until_next_entry() {
        let mut t = tracker();
        t.observe(0, 500);
        t.observe(900, 500);
        t.observe(1919, 500);
        assert!(t.is_suppressed());

        // Next observed position is treated as the new entry, not a signal.
        assert_eq!(t.observe(1919, 500), None);
        assert!(!t.is_suppressed());
    }

    #[test]
    fn normalized_position_reflects_proportional_offset_along_the_edge() {
        let mut t = tracker();
        t.observe(0, 0);
        t.observe(900, 540);
        let payload = t.observe(0, 540).unwrap();
        assert_eq!(payload.edge, Edge::Left);
        assert!((payload.normalized_position - 0.5).abs() < 0.01);
    }

    #[test]
    fn top_and_bottom_edges_use_the_horizontal_axis() {
        let mut t = tracker();
        t.observe(0, 0);
        t.observe(960, 540);
        let payload = t.observe(960, 1079).unwrap();
        assert_eq!(payload.edge, Edge::Bottom);
        assert!((payload.normalized_position - 0.5).abs() < 0.01);
    }
}
