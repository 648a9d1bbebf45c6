//! # bridge-core
//!
//! Shared library for the Windows-host/macOS-companion bridge: the wire
//! protocol codec, the TCP/UDP transport and discovery primitives, the Smart
//! KVM domain model, and the key code translation tables.
//!
//! Used by both the host and companion binaries. Has zero dependencies on
//! UI frameworks and no platform-specific capture/injection code — those
//! live behind traits implemented in `bridge-host` and `bridge-companion`.

pub mod config;
pub mod discovery;
pub mod domain;
pub mod keymap;
pub mod protocol;
pub mod queue;
pub mod transport;

pub use config::{BridgeSide, ConfigError};
pub use domain::kvm::{Edge, Focus, KvmError, KvmState, KvmStateMachine, Rect};
pub use keymap::hid::HidKeyCode;
pub use queue::DropOldestQueue;
pub use protocol::codec::{decode_message, encode_message, FramingError};
pub use protocol::messages::{Message, MessageFlags, MessageType};
