//! API Facades Layer
//!
//! Provides the outer boundary of the endpoint engine: endpoints addressed by
//! handle name, arguments and results as strings, and readiness routed back in
//! by descriptor.
//!
//! All facades call underlying Rust modules from inner layers.
//!
//! ## Modules
//!
//! - **[`cep_facades`](cep_facades/index.html)**: Handle table, argument rules and event routing

pub mod cep_facades;

pub use cep_facades::{CallbackArgs, CepFacade, CepOptions, FacadeCallback};
