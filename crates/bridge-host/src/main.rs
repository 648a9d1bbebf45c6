//! macwinbridge host entry point.
//!
//! Loads (or creates) `host.toml`, broadcasts UDP discovery to find a
//! companion on the LAN, then runs one session against it. When a session
//! ends (companion disconnect, heartbeat timeout) the loop goes back to
//! discovery and waits for the companion to reappear.

use anyhow::Context;
use bridge_core::config::{config_file_path, BridgeConfig, BridgeSide};
use bridge_host::application::session::HostSession;
use bridge_host::infrastructure::cursor_control::NativeCursorController;
use bridge_host::infrastructure::input_capture::InputSource;
use bridge_host::infrastructure::network::discovery::{discover_companion, DiscoveryError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "windows")]
fn local_display_dims() -> (u32, u32) {
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};
    let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
    let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
    (width.max(1) as u32, height.max(1) as u32)
}

#[cfg(not(target_os = "windows"))]
fn local_display_dims() -> (u32, u32) {
    (1920, 1080)
}

#[cfg(target_os = "windows")]
fn build_input_source() -> Box<dyn InputSource> {
    Box::new(bridge_host::infrastructure::input_capture::windows::WindowsInputCaptureService::new())
}

#[cfg(not(target_os = "windows"))]
fn build_input_source() -> Box<dyn InputSource> {
    warn!("no native input capture for this platform, falling back to a no-op mock");
    Box::new(bridge_host::infrastructure::input_capture::mock::MockInputSource::new())
}

#[cfg(target_os = "windows")]
fn build_cursor_controller() -> NativeCursorController {
    NativeCursorController::new()
}

#[cfg(not(target_os = "windows"))]
fn build_cursor_controller() -> bridge_host::application::session::NullCursorController {
    bridge_host::application::session::NullCursorController
}

fn load_config() -> anyhow::Result<BridgeConfig> {
    let path = config_file_path(BridgeSide::Host)?;
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file found, using defaults");
            let config = BridgeConfig::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            if let Ok(text) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(&path, text);
            }
            Ok(config)
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

fn build_screen_capture() -> Result<Box<dyn bridge_host::infrastructure::screen_capture::ScreenCapture>, String> {
    #[cfg(target_os = "windows")]
    {
        bridge_host::infrastructure::screen_capture::windows::DxgiScreenCapture::new(0)
            .map(|c| Box::new(c) as Box<dyn bridge_host::infrastructure::screen_capture::ScreenCapture>)
            .map_err(|e| e.to_string())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Ok(Box::new(bridge_host::infrastructure::screen_capture::mock::MockScreenCapture::new())
            as Box<dyn bridge_host::infrastructure::screen_capture::ScreenCapture>)
    }
}

fn build_audio_capture() -> Result<Box<dyn bridge_host::infrastructure::audio_capture::AudioCapture>, String> {
    #[cfg(target_os = "windows")]
    {
        bridge_host::infrastructure::audio_capture::windows::WasapiLoopbackCapture::new()
            .map(|c| Box::new(c) as Box<dyn bridge_host::infrastructure::audio_capture::AudioCapture>)
            .map_err(|e| e.to_string())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Ok(Box::new(bridge_host::infrastructure::audio_capture::mock::MockAudioCapture::new(2, 48_000))
            as Box<dyn bridge_host::infrastructure::audio_capture::AudioCapture>)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    info!("starting macwinbridge host");

    let local_display = local_display_dims();
    let cursor = build_cursor_controller();

    loop {
        info!("broadcasting for a companion");
        let companion = match discover_companion() {
            Ok(c) => c,
            Err(DiscoveryError::NoResponse(attempts)) => {
                warn!("no companion responded after {attempts} attempts, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                continue;
            }
            Err(e) => {
                error!("discovery failed: {e}");
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                continue;
            }
        };
        info!(addr = %companion.addr, name = ?companion.machine_name, "companion discovered");

        let mut session = HostSession::new(
            config.clone(),
            Box::new(build_screen_capture),
            Box::new(build_audio_capture),
            build_input_source(),
            cursor.clone(),
            local_display,
        );

        match session.run(companion.addr).await {
            Ok(()) => info!("session ended cleanly"),
            Err(e) => warn!("session ended with error: {e}"),
        }
    }
}
