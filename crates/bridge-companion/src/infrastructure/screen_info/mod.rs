//! Platform-specific primary display enumeration.
//!
//! The companion needs its own primary display's pixel dimensions for two
//! purposes: the `DisplayWidth`/`DisplayHeight` fields of the `Handshake`
//! payload, and the companion-side `Rect` used by the Smart KVM state
//! machine to scale incoming normalized cursor positions.
//!
//! # Platform implementations
//!
//! Each platform implements [`PlatformDisplayInfo`]; the correct one is
//! selected at compile time via `#[cfg(target_os = ...)]` and re-exported as
//! `NativeDisplayInfo`:
//!
//! | Module    | OS      | API used                                     |
//! |-----------|---------|-----------------------------------------------|
//! | `windows` | Windows | `GetSystemMetrics(SM_CXSCREEN/SM_CYSCREEN)`    |
//! | `linux`   | Linux   | `XDisplayWidth`/`XDisplayHeight` (Xlib)        |
//! | `macos`   | macOS   | `CGDisplay::main()` + `CGDisplayBounds`        |
//!
//! A [`MockDisplayInfo`] is always compiled (not guarded by `#[cfg]`) so
//! tests on any platform can use it without a physical display.

use thiserror::Error;

/// Error type for display enumeration operations.
#[derive(Debug, Error)]
pub enum ScreenInfoError {
    /// The platform API call to query the display failed.
    #[error("platform API error while querying the primary display: {0}")]
    PlatformError(String),
}

/// The primary display's pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRect {
    pub width: u32,
    pub height: u32,
}

/// Trait for querying the primary display on the current platform.
///
/// This trait is defined in the infrastructure layer because it is an
/// OS-facing adapter.
pub trait PlatformDisplayInfo: Send + Sync {
    /// Returns the primary display's pixel dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ScreenInfoError::PlatformError`] if the OS API call fails.
    fn primary_display(&self) -> Result<DisplayRect, ScreenInfoError>;
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "windows")]
pub use windows::WindowsDisplayInfo as NativeDisplayInfo;

// ── Linux implementation ──────────────────────────────────────────────────────

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxDisplayInfo as NativeDisplayInfo;

// ── macOS implementation ──────────────────────────────────────────────────────

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "macos")]
pub use macos::MacosDisplayInfo as NativeDisplayInfo;

// ── Mock implementation (always compiled for tests) ───────────────────────────

/// A mock display info source that returns a fixed rect.
pub struct MockDisplayInfo {
    pub rect: DisplayRect,
}

impl MockDisplayInfo {
    /// A 1920x1080 fixture, the most common test display.
    pub fn fixed_1080p() -> Self {
        Self {
            rect: DisplayRect {
                width: 1920,
                height: 1080,
            },
        }
    }
}

impl PlatformDisplayInfo for MockDisplayInfo {
    fn primary_display(&self) -> Result<DisplayRect, ScreenInfoError> {
        Ok(self.rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_display_info_returns_fixed_rect() {
        let info = MockDisplayInfo::fixed_1080p();
        let rect = info.primary_display().expect("primary_display");
        assert_eq!(rect.width, 1920);
        assert_eq!(rect.height, 1080);
    }
}
