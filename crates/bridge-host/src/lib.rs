//! bridge-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! The host is the Windows side of the bridge: it captures the screen,
//! loopback audio, and low-level input, runs the Smart KVM state machine,
//! and dials out the three TCP channels to the companion.

pub mod application;
pub mod infrastructure;
