//! Error Module
//!
//! Provides the single error type returned by every endpoint operation.
//!
//! Errors fall into four categories, exposed through [`CepError::kind`]:
//!
//! - **Argument**: malformed or mutually exclusive arguments, caught before any
//!   OS call is made
//! - **AddressResolution**: unresolvable host or service, port out of range
//! - **Resource**: a failing OS call, a would-block result, or a handle that no
//!   longer refers to an open endpoint
//! - **Protocol**: unknown or ambiguous option names, malformed option values,
//!   options that do not apply to the endpoint

use std::io;

use thiserror::Error;

/// Category of a [`CepError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid argument combination
    Argument,
    /// Address or service could not be resolved
    AddressResolution,
    /// OS resource failure
    Resource,
    /// Option vocabulary or applicability error
    Protocol,
}

/// Endpoint engine error
#[derive(Debug, Error)]
pub enum CepError {
    /// Malformed or mutually exclusive arguments
    #[error("{0}")]
    Argument(String),

    /// Unresolvable host or service, or port out of range
    #[error("{0}")]
    AddressResolution(String),

    /// An OS call failed
    #[error("{context}: {source}")]
    Os {
        /// What the engine was doing, e.g. `couldn't open cep`
        context: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Unknown or ambiguous option name
    #[error("bad option \"{name}\": should be one of {valid}")]
    BadOption {
        /// Name as given by the caller
        name: String,
        /// Space separated list of valid names
        valid: String,
    },

    /// Malformed option value or inapplicable option
    #[error("{0}")]
    Protocol(String),

    /// Non-blocking operation could not complete now
    #[error("resource temporarily unavailable")]
    WouldBlock,

    /// Handle does not refer to an open endpoint
    #[error("can not find endpoint named \"{0}\"")]
    Closed(String),
}

impl CepError {
    /// Build an OS error from a context string and the underlying error
    pub fn os(context: impl Into<String>, source: io::Error) -> Self {
        CepError::Os {
            context: context.into(),
            source,
        }
    }

    /// Build an OS error from the calling thread's last OS error
    pub fn last_os(context: impl Into<String>) -> Self {
        CepError::os(context, io::Error::last_os_error())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CepError::Argument(_) => ErrorKind::Argument,
            CepError::AddressResolution(_) => ErrorKind::AddressResolution,
            CepError::Os { .. } | CepError::WouldBlock | CepError::Closed(_) => {
                ErrorKind::Resource
            }
            CepError::BadOption { .. } | CepError::Protocol(_) => ErrorKind::Protocol,
        }
    }

    /// Raw OS error number, if the error came from the OS
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            CepError::Os { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

impl From<io::Error> for CepError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => CepError::WouldBlock,
            _ => CepError::os("I/O error", err),
        }
    }
}
