//! macOS primary display query via Core Graphics (`CGDisplay`).
//!
//! Uses `CGDisplay::main()` to find the primary display (the one with the
//! menu bar) and `CGDisplayBounds` to read its pixel dimensions.

use super::{DisplayRect, PlatformDisplayInfo, ScreenInfoError};

/// macOS implementation of [`PlatformDisplayInfo`] via Core Graphics.
pub struct MacosDisplayInfo;

impl MacosDisplayInfo {
    /// Creates a new `MacosDisplayInfo`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacosDisplayInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformDisplayInfo for MacosDisplayInfo {
    fn primary_display(&self) -> Result<DisplayRect, ScreenInfoError> {
        query_via_core_graphics()
    }
}

fn query_via_core_graphics() -> Result<DisplayRect, ScreenInfoError> {
    use core_graphics::display::{CGDisplay, CGDisplayBounds};

    let primary_id = CGDisplay::main().id;
    let bounds = CGDisplayBounds(primary_id);
    let width = bounds.size.width as u32;
    let height = bounds.size.height as u32;

    if width == 0 || height == 0 {
        return Err(ScreenInfoError::PlatformError(
            "CGDisplayBounds returned a zero-sized primary display".to_string(),
        ));
    }

    Ok(DisplayRect { width, height })
}
