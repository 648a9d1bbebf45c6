//! Platform cursor confinement for the host side of a KVM focus handoff.
//!
//! While focus sits with the companion, the host still owns the physical
//! mouse; `RouteInputUseCase` clips it to a single edge pixel so the user
//! doesn't also drag a second, physical cursor around the host screen while
//! driving the companion. The Windows implementation wraps `ClipCursor`;
//! releasing focus calls `release_clip` to restore free movement.

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "windows")]
pub use windows::WindowsCursorController as NativeCursorController;
