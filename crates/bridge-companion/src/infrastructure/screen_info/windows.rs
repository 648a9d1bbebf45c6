//! Windows primary display query via `GetSystemMetrics`.
//!
//! `SM_CXSCREEN`/`SM_CYSCREEN` report the primary monitor's resolution
//! directly, so no enumeration callback is needed.

use super::{DisplayRect, PlatformDisplayInfo, ScreenInfoError};

use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

/// Windows implementation of [`PlatformDisplayInfo`] using Win32 APIs.
pub struct WindowsDisplayInfo;

impl WindowsDisplayInfo {
    /// Creates a new `WindowsDisplayInfo`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsDisplayInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformDisplayInfo for WindowsDisplayInfo {
    fn primary_display(&self) -> Result<DisplayRect, ScreenInfoError> {
        // SAFETY: GetSystemMetrics is always safe to call with a valid index.
        let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
        let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };

        if width <= 0 || height <= 0 {
            return Err(ScreenInfoError::PlatformError(
                "GetSystemMetrics returned a non-positive primary display size".to_string(),
            ));
        }

        Ok(DisplayRect {
            width: width as u32,
            height: height as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smoke-test: on a Windows machine with a display this must succeed.
    #[test]
    fn windows_display_info_returns_positive_dimensions() {
        let info = WindowsDisplayInfo::new();
        let result = info.primary_display();
        assert!(result.is_ok(), "primary_display must succeed: {:?}", result.err());
        let rect = result.unwrap();
        assert!(rect.width > 0);
        assert!(rect.height > 0);
    }
}
