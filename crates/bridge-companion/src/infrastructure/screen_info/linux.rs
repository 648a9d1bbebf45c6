//! Linux primary display query via the X11 Xlib API.
//!
//! Queries the default screen's pixel dimensions. If the `DISPLAY`
//! environment variable is not set or Xlib is unavailable the function
//! returns an appropriate error.
//!
//! # `DISPLAY` environment variable
//!
//! When running as a desktop application the `DISPLAY` variable is set
//! automatically by the desktop session (e.g., `DISPLAY=:0`). In headless
//! environments (CI, SSH without X forwarding) it is unset and
//! `XOpenDisplay` fails — this is the expected failure mode.

use super::{DisplayRect, PlatformDisplayInfo, ScreenInfoError};

/// Linux X11 implementation of [`PlatformDisplayInfo`].
pub struct LinuxDisplayInfo;

impl LinuxDisplayInfo {
    /// Creates a new `LinuxDisplayInfo`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxDisplayInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformDisplayInfo for LinuxDisplayInfo {
    fn primary_display(&self) -> Result<DisplayRect, ScreenInfoError> {
        query_via_xlib()
    }
}

fn query_via_xlib() -> Result<DisplayRect, ScreenInfoError> {
    use x11::xlib;

    // SAFETY: XOpenDisplay is called with a null display name, meaning "use
    // the DISPLAY environment variable". The returned pointer must be freed
    // by XCloseDisplay.
    let display = unsafe { xlib::XOpenDisplay(std::ptr::null()) };

    if display.is_null() {
        let display_env = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
        return Err(ScreenInfoError::PlatformError(format!(
            "XOpenDisplay failed; DISPLAY={display_env}"
        )));
    }

    // SAFETY: `display` is a valid non-null pointer returned by XOpenDisplay.
    let default_screen = unsafe { xlib::XDefaultScreen(display) };
    let width = unsafe { xlib::XDisplayWidth(display, default_screen) } as u32;
    let height = unsafe { xlib::XDisplayHeight(display, default_screen) } as u32;

    // SAFETY: `display` was successfully opened above and is not used after this.
    unsafe { xlib::XCloseDisplay(display) };

    if width == 0 || height == 0 {
        return Err(ScreenInfoError::PlatformError(
            "X11 default screen reported zero dimensions".to_string(),
        ));
    }

    Ok(DisplayRect { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smoke-test: if a DISPLAY is available this must succeed and return
    /// nonzero dimensions; if DISPLAY is unset the error is expected.
    #[test]
    fn linux_display_info_smoke() {
        let info = LinuxDisplayInfo::new();
        let result = info.primary_display();

        if std::env::var("DISPLAY").is_ok() {
            assert!(result.is_ok(), "primary_display must succeed when DISPLAY is set");
            let rect = result.unwrap();
            assert!(rect.width > 0);
            assert!(rect.height > 0);
        } else {
            assert!(result.is_err(), "primary_display must fail when DISPLAY is not set");
        }
    }
}
