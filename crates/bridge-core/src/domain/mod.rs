//! Domain entities shared by the host and companion sides.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no OS APIs, sockets, or UI frameworks. Code in
//! `bridge-host`/`bridge-companion` depends on it; it never depends back.

/// The Smart KVM focus/edge-crossing state machine.
///
/// See [`kvm::KvmStateMachine`] for the main type.
pub mod kvm;
