//! Adapters Layer: Descriptor Readiness
//!
//! Provides the readiness plumbing that communication endpoints use to hook
//! into an external event loop. This crate implements interest registration
//! and single-descriptor waits on top of `poll(2)`.
//!
//! ## Overview
//!
//! The engine never runs its own loop. Listening endpoints register their
//! descriptor with a [`ReadinessNotifier`] supplied by the embedding
//! application, and the application calls back into the endpoint when the
//! descriptor becomes ready. Connecting endpoints use [`wait_for_connect`] to
//! observe completion of a non-blocking connect.
//!
//! ## Modules
//!
//! - **[`notifier`](notifier/index.html)**: Notifier trait, registrations, in-process registry
//! - **[`wait`](wait/index.html)**: Blocking or zero-timeout wait for connect completion
//!
//! ## See Also
//!
//! - [`adapters_cep`](../adapters_cep/index.html): Endpoints registered through this crate

pub mod notifier;
pub mod wait;

pub use notifier::{
    lock_notifier, InterestRegistry, IoEvent, IoEventType, ReadinessError, ReadinessNotifier,
    Registration, SharedNotifier,
};
pub use wait::{wait_for_connect, WaitOutcome};
