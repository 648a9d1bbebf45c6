//! TOML-based configuration schema and platform-path resolution.
//!
//! Host and companion each persist a small, flat config file under a
//! per-user platform directory resolved via the `dirs` crate. Every field
//! carries a `#[serde(default = ...)]` so a missing or partial file still
//! produces a usable config — there is no first-run wizard, the process
//! just starts with defaults and the user edits the file if they want
//! something else.
//!
//! This module owns the *schema* and the *path resolution*; reading and
//! writing the file is the binaries' job, since `bridge-core` has no
//! business doing I/O on behalf of callers who might want to embed it in a
//! test harness with no filesystem at all.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::kvm::Edge;

/// Which half of the bridge a config belongs to.
///
/// Determines the config file name so both processes can share a config
/// directory without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeSide {
    Host,
    Companion,
}

impl BridgeSide {
    fn config_file_name(self) -> &'static str {
        match self {
            BridgeSide::Host => "host.toml",
            BridgeSide::Companion => "companion.toml",
        }
    }
}

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Network port and bind-address settings shared by both sides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// TCP port for the control stream (handshake, input, KVM config).
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    /// TCP port for the video stream.
    #[serde(default = "default_video_port")]
    pub video_port: u16,
    /// TCP port for the audio stream.
    #[serde(default = "default_audio_port")]
    pub audio_port: u16,
    /// UDP port for LAN discovery broadcasts.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// IP address to bind listening sockets to. `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            control_port: default_control_port(),
            video_port: default_video_port(),
            audio_port: default_audio_port(),
            discovery_port: default_discovery_port(),
            bind_address: default_bind_address(),
        }
    }
}

/// Smart KVM edge-crossing settings, mirroring [`crate::domain::kvm::KvmState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KvmConfig {
    /// Screen edge the companion is docked against, from the host's perspective.
    #[serde(default = "default_edge")]
    pub edge: Edge,
    /// Pixels of dead zone at the edge before a crossing is detected (0-4).
    #[serde(default = "default_dead_zone_px")]
    pub dead_zone_px: u32,
    /// Normalized (0.0-1.0) position along the edge the cursor enters at
    /// when the manual hotkey toggles focus instead of an edge crossing.
    #[serde(default = "default_edge_offset")]
    pub edge_offset: f32,
}

impl Default for KvmConfig {
    fn default() -> Self {
        Self {
            edge: default_edge(),
            dead_zone_px: default_dead_zone_px(),
            edge_offset: default_edge_offset(),
        }
    }
}

/// Video streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoConfig {
    /// Target frames per second for screen capture.
    #[serde(default = "default_video_fps")]
    pub fps: u32,
    /// Whether the host streams its display to the companion by default, or
    /// keeps it local until a `DisplaySwitch` message requests streaming.
    #[serde(default = "default_true")]
    pub stream_by_default: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: default_video_fps(),
            stream_by_default: default_true(),
        }
    }
}

/// Audio streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Output sample rate in Hz after resampling.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo).
    #[serde(default = "default_channels")]
    pub channels: u8,
    /// Whether loopback audio capture starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            enabled: default_true(),
        }
    }
}

/// Top-level host configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BridgeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub kvm: KvmConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Top-level companion configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompanionConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    /// Device name advertised during the handshake.
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_control_port() -> u16 {
    42100
}
fn default_video_port() -> u16 {
    42101
}
fn default_audio_port() -> u16 {
    42102
}
fn default_discovery_port() -> u16 {
    crate::discovery::DISCOVERY_PORT
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_edge() -> Edge {
    Edge::Right
}
fn default_dead_zone_px() -> u32 {
    2
}
fn default_edge_offset() -> f32 {
    0.5
}
fn default_video_fps() -> u32 {
    30
}
fn default_sample_rate() -> u32 {
    48_000
}
fn default_channels() -> u8 {
    2
}
fn default_true() -> bool {
    true
}
fn default_device_name() -> String {
    "macwinbridge companion".to_string()
}

// ── Path resolution ────────────────────────────────────────────────────────────

/// Resolves the per-user config directory for `side`.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir(_side: BridgeSide) -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join("macwinbridge"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to `side`'s config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path(side: BridgeSide) -> Result<PathBuf, ConfigError> {
    Ok(config_dir(side)?.join(side.config_file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_config_default_has_expected_ports() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.network.control_port, 42100);
        assert_eq!(cfg.network.video_port, 42101);
        assert_eq!(cfg.network.audio_port, 42102);
        assert_eq!(cfg.network.discovery_port, 42099);
    }

    #[test]
    fn bridge_config_default_kvm_edge_is_right() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.kvm.edge, Edge::Right);
        assert_eq!(cfg.kvm.dead_zone_px, 2);
    }

    #[test]
    fn bridge_config_round_trips_through_toml() {
        let mut cfg = BridgeConfig::default();
        cfg.network.control_port = 9000;
        cfg.kvm.edge = Edge::Left;

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: BridgeConfig = toml::from_str(&text).expect("deserialize");

        assert_eq!(cfg, restored);
    }

    #[test]
    fn companion_config_round_trips_through_toml() {
        let mut cfg = CompanionConfig::default();
        cfg.device_name = "Jordan's MacBook".to_string();

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: CompanionConfig = toml::from_str(&text).expect("deserialize");

        assert_eq!(cfg, restored);
    }

    #[test]
    fn deserialize_minimal_toml_uses_defaults() {
        let text = r#"
[network]
[kvm]
[video]
[audio]
"#;
        let cfg: BridgeConfig = toml::from_str(text).expect("deserialize minimal");
        assert_eq!(cfg.network.control_port, 42100);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn deserialize_partial_network_overrides_only_specified_fields() {
        let text = r#"
[network]
control_port = 9999
"#;
        let cfg: BridgeConfig = toml::from_str(text).expect("deserialize partial");
        assert_eq!(cfg.network.control_port, 9999);
        assert_eq!(cfg.network.video_port, 42101);
    }

    #[test]
    fn deserialize_invalid_toml_returns_parse_error() {
        let bad = "[[[ not valid toml";
        let result: Result<BridgeConfig, toml::de::Error> = toml::from_str(bad);
        assert!(result.is_err());
    }

    #[test]
    fn config_file_path_ends_with_expected_name() {
        if let Ok(path) = config_file_path(BridgeSide::Host) {
            assert!(path.ends_with("host.toml"));
        }
        if let Ok(path) = config_file_path(BridgeSide::Companion) {
            assert!(path.ends_with("companion.toml"));
        }
    }
}
