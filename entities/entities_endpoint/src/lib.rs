//! Entities Layer: Communication Endpoints
//!
//! Provides the domain types of the communication-endpoint (CEP) engine. This
//! crate holds no OS handles and makes no system calls; it describes what an
//! endpoint is and which options it exposes, and defines the errors every
//! engine operation reports.
//!
//! ## Overview
//!
//! An endpoint is one open socket plus engine-maintained metadata. Its domain
//! ([`CepDomain`]) and type ([`CepType`]) are fixed at creation. Its mode is a
//! set of independent booleans ([`EndpointFlags`]). Options are addressed by
//! [`OptionName`] and reported as [`OptionValue`].
//!
//! ## Modules
//!
//! - **[`domain`](domain/index.html)**: Address families, transport shapes, port validation
//! - **[`flags`](flags/index.html)**: Mode flags, shutdown halves, peer credentials
//! - **[`option`](option/index.html)**: Option vocabulary and value lists
//! - **[`config`](config/index.html)**: Engine-wide tunables
//! - **[`error`](error/index.html)**: Error taxonomy
//!
//! ## See Also
//!
//! - [`adapters_cep`](../../adapters/adapters_cep/index.html): The engine operating on these types

pub mod config;
pub mod domain;
pub mod error;
pub mod flags;
pub mod option;

pub use config::EngineConfig;
pub use domain::{check_port, CepDomain, CepType};
pub use error::{CepError, ErrorKind};
pub use flags::{EndpointFlags, PeerCredentials, Role, ShutdownHalves};
pub use option::{
    format_option_list, join_list, parse_bool, parse_int, quote_element, split_list, OptionName,
    OptionValue,
};
