//! Network infrastructure for the host process.
//!
//! # Sub-modules
//!
//! - **`discovery`** – Broadcasts on the UDP discovery port and collects the
//!   companion's response, using the protocol primitives from
//!   `bridge_core::discovery`. The host is the TCP dialer, so it needs the
//!   companion's address before the control/video/audio channels can connect.

pub mod discovery;
