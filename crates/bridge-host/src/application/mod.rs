//! Application layer use cases for the host process.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules, here `bridge-core`) and the infrastructure
//! (OS/network/storage).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "forward
//!   input to the companion once the cursor crosses a screen edge").
//! - **Depend on abstractions** (traits) rather than concrete
//!   implementations, so the infrastructure can be swapped without changing
//!   this code.
//! - **Contain no direct OS calls** — those live behind the traits in
//!   `infrastructure`.
//!
//! # Sub-modules
//!
//! - **`session`** – The top-level state machine: discover the companion,
//!   connect the three streams, handshake, then run streaming until torn
//!   down.
//! - **`route_input`** – Consumes raw input events, runs them through the
//!   Smart KVM state machine, and forwards them to the companion while
//!   focus is away from the host. This is the hottest path in the process.
//! - **`video_pipeline`** – Captures frames, encodes them, and keeps a
//!   bounded send queue so a slow companion link never backs up capture.
//! - **`audio_pipeline`** – Captures loopback audio, converts and
//!   packetizes it, and keeps a bounded send queue of its own.

pub mod audio_pipeline;
pub mod route_input;
pub mod session;
pub mod video_pipeline;
