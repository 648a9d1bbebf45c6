//! macwinbridge companion entry point.
//!
//! Loads (or creates) `companion.toml`, binds the three TCP listeners, and
//! runs a loop that accepts one host session at a time: a host dials in,
//! the session streams until it disconnects, and the companion goes back
//! to waiting (and re-advertising itself over UDP discovery) for the next
//! one.

use std::sync::Arc;

use anyhow::Context;
use bridge_companion::application::session::{run_discovery_responder, CompanionSession};
use bridge_companion::infrastructure::audio_playback::CpalAudioSink;
use bridge_companion::infrastructure::input_emulation::mock::MockInputEmulator;
use bridge_companion::infrastructure::input_emulation::NativeInputEmulator;
use bridge_companion::infrastructure::network::ChannelListeners;
use bridge_companion::infrastructure::screen_info::NativeDisplayInfo;
use bridge_companion::infrastructure::video_playback::LoggingFrameSink;
use bridge_core::config::{config_file_path, BridgeSide, CompanionConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[cfg(target_os = "windows")]
fn build_input_emulator() -> anyhow::Result<Arc<dyn bridge_companion::application::emulate_input::PlatformInputEmulator>> {
    Ok(Arc::new(NativeInputEmulator::new()))
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn build_input_emulator() -> anyhow::Result<Arc<dyn bridge_companion::application::emulate_input::PlatformInputEmulator>> {
    Ok(Arc::new(NativeInputEmulator::new()?))
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
fn build_input_emulator() -> anyhow::Result<Arc<dyn bridge_companion::application::emulate_input::PlatformInputEmulator>> {
    warn!("no native input emulator for this platform, falling back to a no-op mock");
    Ok(Arc::new(MockInputEmulator::new()))
}

fn load_config() -> anyhow::Result<CompanionConfig> {
    let path = config_file_path(BridgeSide::Companion)?;
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no config file found, using defaults");
            let config = CompanionConfig::default();
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    info!(device_name = %config.device_name, "starting macwinbridge companion");

    let listeners = ChannelListeners::bind(&config.network).await.context("binding companion channel listeners")?;

    let cancel = CancellationToken::new();
    let discovery_handle = {
        let cancel = cancel.clone();
        let port = config.network.discovery_port;
        let name = config.device_name.clone();
        tokio::spawn(run_discovery_responder(port, name, cancel))
    };

    let ctrlc_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            ctrlc_cancel.cancel();
        }
    });

    while !cancel.is_cancelled() {
        info!("waiting for a host to connect");
        let channels = tokio::select! {
            result = listeners.accept_session() => match result {
                Ok(c) => c,
                Err(e) => {
                    error!("failed to accept host session: {e}");
                    continue;
                }
            },
            _ = cancel.cancelled() => break,
        };

        let emulator = build_input_emulator()?;
        let mut session = CompanionSession::new(
            config.clone(),
            emulator,
            CpalAudioSink::new(),
            LoggingFrameSink::new(),
            NativeDisplayInfo::new(),
        );

        if let Err(e) = session.run(channels, cancel.clone()).await {
            warn!("session ended with error: {e}");
        } else {
            info!("session ended cleanly");
        }
    }

    cancel.cancel();
    let _ = discovery_handle.await;
    Ok(())
}
