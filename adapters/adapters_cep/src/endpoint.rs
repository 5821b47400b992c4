//! Endpoint State Module
//!
//! Provides [`Endpoint`], the single state object behind every open
//! communication endpoint.
//!
//! ## Ownership
//!
//! An endpoint owns its descriptor exclusively. It is created by the factory
//! (client, server, receiver), by a server's accept dispatch, or by the
//! connected-pair factory, and is torn down exactly once by
//! [`Endpoint::close`], which consumes it. Dropping an endpoint without closing
//! it still releases the descriptor and its readiness registration, but does
//! not unlink a Local server's path.

use std::fmt;
use std::os::unix::io::{AsRawFd, RawFd};

use adapters_readiness::Registration;
use entities_endpoint::{CepDomain, CepType, EndpointFlags, Role};
use socket2::Socket;

use crate::dispatch::AcceptCallback;

/// An open communication endpoint
pub struct Endpoint {
    pub(crate) socket: Socket,
    pub(crate) domain: CepDomain,
    pub(crate) cep_type: CepType,
    pub(crate) protocol: i32,
    pub(crate) role: Role,
    pub(crate) flags: EndpointFlags,
    pub(crate) callback: Option<AcceptCallback>,
    pub(crate) registration: Option<Registration>,
    pub(crate) receive_capacity: usize,
}

impl Endpoint {
    pub(crate) fn new(
        socket: Socket,
        domain: CepDomain,
        cep_type: CepType,
        protocol: i32,
        role: Role,
        flags: EndpointFlags,
    ) -> Self {
        Self {
            socket,
            domain,
            cep_type,
            protocol,
            role,
            flags,
            callback: None,
            registration: None,
            receive_capacity: entities_endpoint::config::MAX_DATAGRAM_SIZE,
        }
    }

    /// Raw descriptor of the endpoint
    pub fn descriptor(&self) -> RawFd {
        self.socket.as_raw_fd()
    }

    /// Address family
    pub fn domain(&self) -> CepDomain {
        self.domain
    }

    /// Transport shape
    pub fn cep_type(&self) -> CepType {
        self.cep_type
    }

    /// Protocol number (0 = default)
    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    /// How the endpoint was created
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current mode flags
    pub fn flags(&self) -> EndpointFlags {
        self.flags
    }

    /// Whether the endpoint is a server or receiver
    pub fn is_server(&self) -> bool {
        self.flags.server
    }

    /// Whether the descriptor is in non-blocking mode
    pub fn is_async(&self) -> bool {
        self.flags.async_mode
    }

    /// Whether a non-blocking connect has not yet been observed complete
    pub fn is_connect_pending(&self) -> bool {
        self.flags.async_connect_pending
    }

    /// Whether addresses are reverse-resolved when formatted
    pub fn resolves_names(&self) -> bool {
        self.flags.resolve_names
    }

    /// Whether a readiness registration is held
    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Underlying socket
    pub fn socket(&self) -> &Socket {
        &self.socket
    }
}

impl AsRawFd for Endpoint {
    fn as_raw_fd(&self) -> RawFd {
        self.descriptor()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("fd", &self.descriptor())
            .field("domain", &self.domain)
            .field("type", &self.cep_type)
            .field("protocol", &self.protocol)
            .field("role", &self.role)
            .field("flags", &self.flags)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
