//! UDP discovery protocol primitives.
//!
//! Discovery runs over plain UTF-8 magic strings on a dedicated UDP port —
//! not the framed `Message` protocol used by the three TCP streams, since a
//! companion broadcasting for a host has no connection yet to frame against.
//! This module holds the pure encode/parse functions; the actual socket
//! broadcast/listen loops live in the host and companion binaries since they
//! differ (one broadcasts once per attempt, the other binds and replies
//! forever).
//!
//! # How UDP discovery works
//!
//! The host broadcasts [`REQUEST_MAGIC`] to the LAN broadcast address on
//! [`DISCOVERY_PORT`] — it is the TCP dialer for the three streaming
//! channels, so it needs the companion's address before it can connect
//! anything. Every companion responder listening on that port receives the
//! datagram and unicasts [`RESPONSE_MAGIC`] (optionally suffixed with its
//! machine name) back to the sender. The host accepts the first response
//! whose prefix matches, up to [`DEFAULT_ATTEMPTS`] broadcasts within its
//! overall timeout.

use std::net::IpAddr;

use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};

/// UDP port both the discovery request and the responder use.
pub const DISCOVERY_PORT: u16 = 42099;

/// LAN broadcast address the companion sends discovery requests to.
pub const BROADCAST_ADDR: &str = "255.255.255.255";

/// Magic prefix identifying a discovery request datagram.
pub const REQUEST_MAGIC: &str = "MACWINBRIDGE_DISCOVER";

/// Magic prefix identifying a discovery response datagram.
pub const RESPONSE_MAGIC: &str = "MACWINBRIDGE_HERE";

/// Default number of broadcast attempts within the overall discovery timeout.
pub const DEFAULT_ATTEMPTS: u8 = 3;

/// Builds the bytes of a discovery request datagram.
pub fn encode_request() -> Vec<u8> {
    REQUEST_MAGIC.as_bytes().to_vec()
}

/// Returns `true` if `datagram` is exactly the discovery request magic.
pub fn is_valid_request(datagram: &[u8]) -> bool {
    datagram == REQUEST_MAGIC.as_bytes()
}

/// Builds the bytes of a discovery response datagram.
///
/// `machine_name`, if non-empty, is appended after a `|` separator.
pub fn encode_response(machine_name: Option<&str>) -> Vec<u8> {
    match machine_name {
        Some(name) if !name.is_empty() => format!("{RESPONSE_MAGIC}|{name}").into_bytes(),
        _ => RESPONSE_MAGIC.as_bytes().to_vec(),
    }
}

/// Returns `true` if `datagram`'s first bytes are the response magic.
///
/// Per the wire contract, any datagram starting with [`RESPONSE_MAGIC`] is a
/// valid response even if the trailing machine-name suffix is malformed.
pub fn is_valid_response(datagram: &[u8]) -> bool {
    datagram.starts_with(RESPONSE_MAGIC.as_bytes())
}

/// Extracts the optional machine name suffix from a response datagram.
///
/// Returns `None` if `datagram` is not a valid response, carries no `|`
/// suffix, or the suffix is not valid UTF-8.
pub fn parse_response_machine_name(datagram: &[u8]) -> Option<String> {
    if !is_valid_response(datagram) {
        return None;
    }
    let text = std::str::from_utf8(datagram).ok()?;
    text.strip_prefix(RESPONSE_MAGIC)
        .and_then(|rest| rest.strip_prefix('|'))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Picks the local IPv4 address discovery traffic should be logged as using.
///
/// Ranks interfaces whose name or description suggests a USB-C virtual
/// adapter (`RNDIS`, `CDC`, or `USB` combined with `Ethernet`) ahead of
/// everything else, falling back to the first active non-loopback IPv4
/// address. Returns `None` if no interface enumeration is available or no
/// interface has a usable address — discovery still functions via the OS
/// broadcast route, this is only used for the log line naming which NIC was
/// likely used.
pub fn preferred_local_address() -> Option<IpAddr> {
    let interfaces = NetworkInterface::show().ok()?;

    let mut usb_virtual = None;
    let mut fallback = None;

    for iface in &interfaces {
        let upper = iface.name.to_uppercase();
        let looks_usb_virtual =
            upper.contains("RNDIS") || upper.contains("CDC") || (upper.contains("USB") && upper.contains("ETHERNET"));

        for addr in &iface.addr {
            let ip = match addr {
                Addr::V4(v4) => IpAddr::V4(v4.ip),
                Addr::V6(v6) => IpAddr::V6(v6.ip),
            };
            if ip.is_loopback() {
                continue;
            }
            if looks_usb_virtual && usb_virtual.is_none() {
                usb_virtual = Some(ip);
            }
            if fallback.is_none() {
                fallback = Some(ip);
            }
        }
    }

    usb_virtual.or(fallback)
}
