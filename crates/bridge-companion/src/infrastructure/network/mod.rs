//! Network infrastructure for the companion process.
//!
//! The companion is the TCP listener for all three streaming channels,
//! mirroring the host's `application::session::connect_channels` from the
//! other end of the wire: it binds Control, Video, and Audio in that fixed
//! order and accepts exactly one connection on each before a session can
//! begin.

use std::net::{IpAddr, SocketAddr};

use bridge_core::config::NetworkConfig;
use bridge_core::transport::{Listener, MessageReader, Transport, TransportError};
use tracing::info;

/// The three accepted channels, in accept order.
pub struct CompanionChannels {
    pub control_tx: Transport,
    pub control_rx: MessageReader,
    pub video_tx: Transport,
    pub video_rx: MessageReader,
    pub audio_tx: Transport,
    pub audio_rx: MessageReader,
}

/// Holds the three bound listeners until a host connects to all of them.
///
/// Binding happens once at startup so a port conflict is reported
/// immediately, rather than after the companion has already advertised
/// itself to discovery.
pub struct ChannelListeners {
    control: Listener,
    video: Listener,
    audio: Listener,
}

impl ChannelListeners {
    /// Binds the Control, Video, and Audio ports from `net`.
    pub async fn bind(net: &NetworkConfig) -> Result<Self, TransportError> {
        let bind_ip: IpAddr = net.bind_address.parse().unwrap_or_else(|_| "0.0.0.0".parse().expect("valid fallback"));

        let control = Listener::bind(SocketAddr::new(bind_ip, net.control_port)).await?;
        info!(addr = %control.local_addr()?, "control listener bound");

        let video = Listener::bind(SocketAddr::new(bind_ip, net.video_port)).await?;
        info!(addr = %video.local_addr()?, "video listener bound");

        let audio = Listener::bind(SocketAddr::new(bind_ip, net.audio_port)).await?;
        info!(addr = %audio.local_addr()?, "audio listener bound");

        Ok(Self { control, video, audio })
    }

    /// Accepts one connection on each listener, in order. Blocks until a
    /// host has dialed all three; there is no timeout here, since the
    /// companion has nothing better to do than wait for its host.
    pub async fn accept_session(&self) -> Result<CompanionChannels, TransportError> {
        let (control_tx, control_rx) = self.control.accept().await?;
        info!(peer = %control_tx.peer_addr(), "control channel accepted");

        let (video_tx, video_rx) = self.video.accept().await?;
        info!(peer = %video_tx.peer_addr(), "video channel accepted");

        let (audio_tx, audio_rx) = self.audio.accept().await?;
        info!(peer = %audio_tx.peer_addr(), "audio channel accepted");

        Ok(CompanionChannels {
            control_tx,
            control_rx,
            video_tx,
            video_rx,
            audio_tx,
            audio_rx,
        })
    }
}
