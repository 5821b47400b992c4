//! Endpoint Factory Module
//!
//! Provides creation of client, server and receiver endpoints.
//!
//! ## Overview
//!
//! Every endpoint starts the same way: resolve the protocol, open a socket for
//! the domain/type/protocol, mark it close-on-exec and, for Stream sockets,
//! raise the kernel buffers to the configured floor. Servers and receivers
//! then bind (and Stream servers listen); clients optionally bind to a local
//! address first and then connect, possibly without blocking.
//!
//! Any failure closes the partially created socket (it is dropped) and is
//! reported with the context `couldn't open cep`.

use adapters_readiness::{IoEventType, Registration, SharedNotifier};
use entities_endpoint::{CepDomain, CepError, CepType, EndpointFlags, EngineConfig, Role};
use socket2::{Protocol, SockAddr, Socket};
use tracing::debug;

use crate::dispatch::AcceptCallback;
use crate::endpoint::Endpoint;
use crate::resolver::{create_address, resolve_protocol};
use crate::translate::{to_sys_domain, to_sys_type};

pub(crate) const OPEN_CONTEXT: &str = "couldn't open cep";

/// Parameters of an endpoint creation
///
/// For clients `host`/`port` name the peer and `bind_addr`/`bind_port` an
/// optional local address. For servers and receivers `host` names the local
/// address to bind (the path for Local endpoints, `None` for the wildcard)
/// and the bind fields are unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRequest {
    /// Address family
    pub domain: CepDomain,
    /// Transport shape
    pub cep_type: CepType,
    /// Protocol name or number; empty or `"default"` for the default
    pub protocol: String,
    /// Peer host (clients) or local host/path (servers, receivers)
    pub host: Option<String>,
    /// Peer port (clients) or local port (servers); `None` is the "no port" sentinel
    pub port: Option<u16>,
    /// Local address for clients
    pub bind_addr: Option<String>,
    /// Local port for clients, 0 for any
    pub bind_port: u16,
    /// Start the connect without waiting for it to complete
    pub async_connect: bool,
    /// Allow host name lookups and reverse-resolve reported addresses
    pub resolve: bool,
    /// Set SO_REUSEADDR before binding (network domains only)
    pub reuse_addr: bool,
    /// Set SO_REUSEPORT before binding (network domains only)
    pub reuse_port: bool,
}

impl Default for EndpointRequest {
    fn default() -> Self {
        Self {
            domain: CepDomain::Inet,
            cep_type: CepType::Stream,
            protocol: String::new(),
            host: None,
            port: None,
            bind_addr: None,
            bind_port: 0,
            async_connect: false,
            resolve: true,
            reuse_addr: true,
            reuse_port: false,
        }
    }
}

impl EndpointRequest {
    /// Request for the given domain and type, everything else defaulted
    pub fn new(domain: CepDomain, cep_type: CepType) -> Self {
        Self {
            domain,
            cep_type,
            ..Self::default()
        }
    }

    /// Set the host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    fn host_ref(&self) -> Option<&str> {
        self.host.as_deref().filter(|h| !h.is_empty())
    }
}

/// Create an endpoint
///
/// The core of every creation path. `role` selects the server path
/// ([`Role::Server`], [`Role::Receiver`]) or the client path ([`Role::Client`]).
///
/// # Arguments
///
/// * `request` - What to create
/// * `role` - Client, Server or Receiver
/// * `config` - Engine configuration
///
/// # Returns
///
/// * `Ok(Endpoint)` - Open endpoint with flags set
/// * `Err(CepError)` - Nothing is left open
pub fn create(
    request: &EndpointRequest,
    role: Role,
    config: &EngineConfig,
) -> Result<Endpoint, CepError> {
    let server = role.is_listener();
    let domain = request.domain;
    let protocol = resolve_protocol(&request.protocol)?;

    let host = request.host_ref();
    let target = if server {
        Some(create_address(domain, host, request.port.unwrap_or(0), request.resolve)?)
    } else if host.is_none() && request.port.is_none() {
        if domain == CepDomain::Local || request.cep_type == CepType::Stream {
            return Err(CepError::AddressResolution(format!(
                "{}: {} {} clients need a target address",
                OPEN_CONTEXT, domain, request.cep_type
            )));
        }
        None
    } else {
        Some(create_address(domain, host, request.port.unwrap_or(0), request.resolve)?)
    };

    let bind = if !server
        && domain.is_network()
        && (request.bind_addr.is_some() || request.bind_port != 0)
    {
        Some(create_address(
            domain,
            request.bind_addr.as_deref(),
            request.bind_port,
            request.resolve,
        )?)
    } else {
        None
    };

    let socket = open_socket(domain, request.cep_type, protocol, config)?;

    let mut flags = EndpointFlags::new(server, request.resolve);
    if server {
        if let Some(addr) = &target {
            set_reuse(&socket, domain, request)?;
            socket.bind(addr).map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
        }
        if request.cep_type == CepType::Stream {
            socket
                .listen(config.listen_backlog)
                .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
        }
    } else {
        if let Some(addr) = &bind {
            set_reuse(&socket, domain, request)?;
            socket.bind(addr).map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
        }
        if let Some(addr) = &target {
            flags.async_connect_pending = connect(&socket, addr, request.async_connect)?;
        }
    }

    let endpoint = Endpoint::new(socket, domain, request.cep_type, protocol, role, flags);
    debug!(
        fd = endpoint.descriptor(),
        domain = %domain,
        cep_type = %request.cep_type,
        protocol,
        ?role,
        connect_pending = flags.async_connect_pending,
        "opened endpoint"
    );
    Ok(endpoint)
}

/// Create a client endpoint
///
/// Unless both host and port are absent the endpoint is connected (or, with
/// `async_connect`, has a connect in progress).
pub fn create_client(
    request: &EndpointRequest,
    config: &EngineConfig,
) -> Result<Endpoint, CepError> {
    create(request, Role::Client, config)
}

/// Create a server endpoint
///
/// The listening descriptor is registered for readability with `notifier`;
/// each readiness event should be routed to [`Endpoint::dispatch`], which
/// accepts one connection and hands it to `callback`.
pub fn create_server(
    request: &EndpointRequest,
    callback: AcceptCallback,
    notifier: SharedNotifier,
    config: &EngineConfig,
) -> Result<Endpoint, CepError> {
    create_listener(request, Role::Server, callback, notifier, config)
}

/// Create a receiver endpoint
///
/// Like a server, but each readiness event reads one datagram and hands its
/// payload to `callback` together with the receiver itself.
pub fn create_receiver(
    request: &EndpointRequest,
    callback: AcceptCallback,
    notifier: SharedNotifier,
    config: &EngineConfig,
) -> Result<Endpoint, CepError> {
    create_listener(request, Role::Receiver, callback, notifier, config)
}

fn create_listener(
    request: &EndpointRequest,
    role: Role,
    callback: AcceptCallback,
    notifier: SharedNotifier,
    config: &EngineConfig,
) -> Result<Endpoint, CepError> {
    let mut endpoint = create(request, role, config)?;
    let registration = Registration::new(notifier, endpoint.descriptor(), IoEventType::Read)
        .map_err(|e| {
            CepError::os(
                OPEN_CONTEXT,
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })?;
    endpoint.callback = Some(callback);
    endpoint.registration = Some(registration);
    endpoint.receive_capacity = config.max_datagram_size;
    Ok(endpoint)
}

pub(crate) fn open_socket(
    domain: CepDomain,
    cep_type: CepType,
    protocol: i32,
    config: &EngineConfig,
) -> Result<Socket, CepError> {
    let proto = if protocol == 0 {
        None
    } else {
        Some(Protocol::from(protocol))
    };
    let socket = Socket::new(to_sys_domain(domain), to_sys_type(cep_type), proto)
        .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    socket
        .set_cloexec(true)
        .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    if cep_type == CepType::Stream {
        raise_buffer_floor(&socket, config.socket_buffer_floor)?;
    }
    Ok(socket)
}

fn raise_buffer_floor(socket: &Socket, floor: usize) -> Result<(), CepError> {
    let send = socket
        .send_buffer_size()
        .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    if send < floor {
        socket
            .set_send_buffer_size(floor)
            .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    }
    let recv = socket
        .recv_buffer_size()
        .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    if recv < floor {
        socket
            .set_recv_buffer_size(floor)
            .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    }
    Ok(())
}

fn set_reuse(
    socket: &Socket,
    domain: CepDomain,
    request: &EndpointRequest,
) -> Result<(), CepError> {
    if !domain.is_network() {
        return Ok(());
    }
    if request.reuse_addr {
        socket
            .set_reuse_address(true)
            .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    }
    if request.reuse_port {
        socket
            .set_reuse_port(true)
            .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    }
    Ok(())
}

/// Connect, returning whether the connect is still in progress
fn connect(socket: &Socket, addr: &SockAddr, async_connect: bool) -> Result<bool, CepError> {
    if !async_connect {
        socket.connect(addr).map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
        return Ok(false);
    }
    socket
        .set_nonblocking(true)
        .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    match socket.connect(addr) {
        Ok(()) => {
            socket
                .set_nonblocking(false)
                .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
            Ok(false)
        }
        Err(e) if e.raw_os_error() == Some(libc::EINPROGRESS) => Ok(true),
        Err(e) => Err(CepError::os(OPEN_CONTEXT, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters_readiness::{InterestRegistry, ReadinessNotifier};
    use entities_endpoint::ErrorKind;
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    fn noop_callback() -> AcceptCallback {
        Box::new(|_event| Ok(()))
    }

    #[test]
    fn test_unknown_protocol_fails_before_socket() {
        let mut request = EndpointRequest::new(CepDomain::Inet, CepType::Stream)
            .host("127.0.0.1")
            .port(1);
        request.protocol = "no-such-protocol-cep".to_string();
        let err = create_client(&request, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_stream_client_needs_target() {
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Stream);
        let err = create_client(&request, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AddressResolution);
    }

    #[test]
    fn test_local_client_needs_path() {
        let mut request = EndpointRequest::new(CepDomain::Local, CepType::Datagram);
        request.host = Some(String::new());
        let err = create_client(&request, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AddressResolution);
    }

    #[test]
    fn test_unconnected_datagram_client() {
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Datagram);
        let endpoint = create_client(&request, &EngineConfig::default()).unwrap();
        assert_eq!(endpoint.role(), Role::Client);
        assert!(!endpoint.is_server());
        assert!(endpoint.socket().peer_addr().is_err());
    }

    #[test]
    fn test_stream_buffers_raised_to_floor() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Stream)
            .host("127.0.0.1")
            .port(port);
        let endpoint = create_client(&request, &EngineConfig::default()).unwrap();
        assert!(endpoint.socket().send_buffer_size().unwrap() >= 4096);
        assert!(endpoint.socket().recv_buffer_size().unwrap() >= 4096);
    }

    #[test]
    fn test_connect_refused_is_os_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Stream)
            .host("127.0.0.1")
            .port(port);
        let err = create_client(&request, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.to_string().starts_with("couldn't open cep: "));
    }

    #[test]
    fn test_server_registers_for_read() {
        let registry = InterestRegistry::shared();
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Stream)
            .host("127.0.0.1")
            .port(0);
        let server = create_server(
            &request,
            noop_callback(),
            registry.clone(),
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(server.is_server());
        assert!(server.is_registered());
        assert!(registry
            .lock()
            .unwrap()
            .is_registered(server.descriptor(), IoEventType::Read));
        drop(server);
        assert!(registry.lock().unwrap().is_empty());
    }

    #[test]
    fn test_receiver_uses_configured_capacity() {
        let registry: Arc<Mutex<InterestRegistry>> = InterestRegistry::shared();
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Datagram)
            .host("127.0.0.1")
            .port(0);
        let config = EngineConfig::default().with_max_datagram_size(512);
        let receiver = create_receiver(&request, noop_callback(), registry, &config).unwrap();
        assert_eq!(receiver.role(), Role::Receiver);
        assert_eq!(receiver.receive_capacity, 512);
    }

    #[test]
    fn test_client_bind_first() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut request = EndpointRequest::new(CepDomain::Inet, CepType::Stream)
            .host("127.0.0.1")
            .port(port);
        request.bind_addr = Some("127.0.0.1".to_string());
        let endpoint = create_client(&request, &EngineConfig::default()).unwrap();
        let local = endpoint.socket().local_addr().unwrap().as_socket().unwrap();
        assert_eq!(local.ip().to_string(), "127.0.0.1");
    }

    #[test]
    fn test_async_connect_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut request = EndpointRequest::new(CepDomain::Inet, CepType::Stream)
            .host("127.0.0.1")
            .port(port);
        request.async_connect = true;
        let endpoint = create_client(&request, &EngineConfig::default()).unwrap();
        assert!(!endpoint.is_async());
        assert_eq!(endpoint.role(), Role::Client);
    }
}
