//! Windows cursor confinement via `ClipCursor`/`ShowCursor`.

#![cfg(target_os = "windows")]

use std::sync::Arc;

use bridge_core::domain::kvm::Rect;
use windows::Win32::Foundation::RECT;
use windows::Win32::UI::WindowsAndMessaging::{ClipCursor, ShowCursor};

use crate::application::route_input::{CursorController, RouteInputError};

/// Confines the cursor to a `RECT` with `ClipCursor`; `ClipCursor(None)`
/// releases any existing confinement. `ShowCursor`'s internal display
/// counter means repeated `hide`/`show` calls must stay paired, so this
/// type tracks whether it currently holds the hidden state and skips a
/// redundant call rather than drifting the counter. The flag lives behind
/// an `Arc` so cloning a controller (`HostSession` requires `Clone`) still
/// shares one true hidden/shown state.
#[derive(Clone)]
pub struct WindowsCursorController {
    hidden: Arc<std::sync::atomic::AtomicBool>,
}

impl WindowsCursorController {
    pub fn new() -> Self {
        Self {
            hidden: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }
}

impl Default for WindowsCursorController {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorController for WindowsCursorController {
    fn clip_to(&self, rect: Rect) -> Result<(), RouteInputError> {
        let win_rect = RECT {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        };
        // SAFETY: win_rect is a valid, fully-initialized RECT on the stack.
        unsafe { ClipCursor(Some(&win_rect)) }.map_err(|e| RouteInputError::CursorControl(e.to_string()))
    }

    fn release_clip(&self) -> Result<(), RouteInputError> {
        // SAFETY: passing None clears any existing clip rect.
        unsafe { ClipCursor(None) }.map_err(|e| RouteInputError::CursorControl(e.to_string()))
    }

    fn hide(&self) {
        use std::sync::atomic::Ordering;
        if self.hidden.swap(true, Ordering::SeqCst) {
            return;
        }
        // SAFETY: ShowCursor is always safe to call; the returned display
        // counter is intentionally ignored here.
        unsafe {
            ShowCursor(false);
        }
    }

    fn show(&self) {
        use std::sync::atomic::Ordering;
        if !self.hidden.swap(false, Ordering::SeqCst) {
            return;
        }
        // SAFETY: ShowCursor is always safe to call.
        unsafe {
            ShowCursor(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_hide_without_show_only_swaps_state_once() {
        let controller = WindowsCursorController::new();
        assert!(!controller.hidden.load(std::sync::atomic::Ordering::SeqCst));
        controller.hidden.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(controller.hidden.load(std::sync::atomic::Ordering::SeqCst));
    }
}
