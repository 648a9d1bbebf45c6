//! UDP broadcast-based companion discovery.
//!
//! The host is the TCP dialer for the three streaming channels, so before it
//! can connect anything it needs the companion's LAN address. It broadcasts
//! [`bridge_core::discovery::REQUEST_MAGIC`] to the LAN broadcast address on
//! [`bridge_core::discovery::DISCOVERY_PORT`] up to [`ATTEMPTS`] times,
//! collecting the first well-formed response.
//!
//! # How UDP discovery works (for beginners)
//!
//! UDP is connectionless: a datagram sent to the broadcast address
//! (`255.255.255.255`) reaches every listening host on the LAN without a prior
//! handshake. The companion binds the discovery port and replies directly to
//! whichever address the request came from, so the host learns the
//! companion's real IP (not the broadcast address) from the response's source
//! address.
//!
//! # Read timeout
//!
//! The socket is configured with a short read timeout so each broadcast
//! attempt can retry within the overall discovery budget instead of blocking
//! forever on a `recv_from` that never completes (e.g. no companion present).

use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use bridge_core::discovery::{
    encode_request, is_valid_response, parse_response_machine_name, BROADCAST_ADDR,
    DISCOVERY_PORT,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Number of broadcast attempts made within [`discover_companion`]'s timeout.
pub const ATTEMPTS: u8 = 3;

/// Wait for a response after each broadcast before retrying.
const ATTEMPT_TIMEOUT: Duration = Duration::from_millis(800);

/// Error type for the discovery broadcast.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound or configured for broadcast.
    #[error("failed to prepare discovery socket: {0}")]
    SocketSetup(std::io::Error),
    /// No companion responded within [`ATTEMPTS`] broadcasts.
    #[error("no companion responded to discovery after {0} attempts")]
    NoResponse(u8),
}

/// A companion discovered on the LAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCompanion {
    /// The address the response arrived from — the companion's real IP.
    pub addr: IpAddr,
    /// The human-readable machine name the companion advertised, if any.
    pub machine_name: Option<String>,
}

/// Broadcasts discovery requests and waits for the first valid response.
///
/// Retries up to [`ATTEMPTS`] times, each with an [`ATTEMPT_TIMEOUT`] window.
///
/// # Errors
///
/// Returns [`DiscoveryError::SocketSetup`] if the UDP socket cannot be bound
/// or put into broadcast mode, and [`DiscoveryError::NoResponse`] if no
/// companion answers within the attempt budget.
pub fn discover_companion() -> Result<DiscoveredCompanion, DiscoveryError> {
    let socket = UdpSocket::bind("0.0.0.0:0").map_err(DiscoveryError::SocketSetup)?;
    socket
        .set_broadcast(true)
        .map_err(DiscoveryError::SocketSetup)?;
    socket
        .set_read_timeout(Some(ATTEMPT_TIMEOUT))
        .map_err(DiscoveryError::SocketSetup)?;

    let dest: SocketAddr = format!("{BROADCAST_ADDR}:{DISCOVERY_PORT}")
        .parse()
        .expect("broadcast address and fixed port always parse");
    let request = encode_request();

    for attempt in 1..=ATTEMPTS {
        debug!("discovery broadcast attempt {attempt}/{ATTEMPTS}");
        if let Err(e) = socket.send_to(&request, dest) {
            warn!("discovery broadcast send failed: {e}");
            continue;
        }

        let deadline = Instant::now() + ATTEMPT_TIMEOUT;
        let mut buf = [0u8; 512];
        while Instant::now() < deadline {
            match socket.recv_from(&mut buf) {
                Ok((len, src)) => {
                    let datagram = &buf[..len];
                    if is_valid_response(datagram) {
                        let machine_name = parse_response_machine_name(datagram);
                        info!("companion discovered at {src} ({:?})", machine_name);
                        return Ok(DiscoveredCompanion {
                            addr: src.ip(),
                            machine_name,
                        });
                    }
                }
                Err(e) if is_timeout_error(&e) => break,
                Err(e) => {
                    warn!("discovery recv error: {e}");
                    break;
                }
            }
        }
    }

    Err(DiscoveryError::NoResponse(ATTEMPTS))
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
