//! Endpoint Facades
//!
//! Provides the string-level boundary through which an embedding runtime
//! creates and drives communication endpoints. Endpoints are referred to by
//! handle names (`cep0`, `cep1`, ...), arguments arrive as strings, and
//! results leave as strings or byte counts.
//!
//! ## Overview
//!
//! [`CepFacade`] owns every open endpoint in a handle table, an in-process
//! readiness registry that listening endpoints register with, and the
//! [`EngineConfig`] handed to the engine. Operations on a handle that has been
//! closed fail with [`CepError::Closed`].
//!
//! Readiness is routed back in with [`CepFacade::dispatch_ready`] (one event
//! for one descriptor) or [`CepFacade::poll`] (poll every registered
//! descriptor once and dispatch what is ready). An accepted connection is
//! entered into the handle table before the user callback runs, so the
//! callback receives a usable handle name. If the callback fails, the new
//! handle is closed again.
//!
//! ## Argument Rules
//!
//! Checked before any socket is opened:
//!
//! - `async` is not allowed for servers, receivers or connected pairs
//! - receivers default to `datagram` and reject an explicit `stream`
//! - a bind port is not valid for servers or receivers
//! - connected pairs reject a bind address and a bind port
//!
//! ## See Also
//!
//! - [`adapters_cep`](../../adapters/adapters_cep/index.html): The endpoint engine

use std::collections::{HashMap, VecDeque};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use adapters_cep::{
    create_client, create_pair, create_receiver, create_server, parse_port, AcceptCallback,
    CallbackError, Connection, DispatchEvent, DispatchStatus, Endpoint, EndpointRequest,
};
use adapters_readiness::{InterestRegistry, IoEventType, ReadinessError, SharedNotifier};
use entities_endpoint::{
    format_option_list, CepDomain, CepError, CepType, EngineConfig, PeerCredentials,
};
use tracing::{debug, warn};

/// Creation options, as strings
///
/// Unset fields take the facade defaults: domain `inet`, type `stream`
/// (`datagram` for receivers), default protocol, name resolution and address
/// reuse on, port reuse off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CepOptions {
    /// `local`, `inet` or `inet6`
    pub domain: Option<String>,
    /// `stream`, `datagram` or `raw`
    pub cep_type: Option<String>,
    /// Protocol name or number
    pub protocol: Option<String>,
    /// Local address for clients, bind address for network servers
    pub bind_addr: Option<String>,
    /// Local port or service for clients
    pub bind_port: Option<String>,
    /// Connect without waiting
    pub async_connect: bool,
    /// Allow name lookups and reverse resolution
    pub resolve: bool,
    /// SO_REUSEADDR before binding
    pub reuse_addr: bool,
    /// SO_REUSEPORT before binding
    pub reuse_port: bool,
}

impl Default for CepOptions {
    fn default() -> Self {
        Self {
            domain: None,
            cep_type: None,
            protocol: None,
            bind_addr: None,
            bind_port: None,
            async_connect: false,
            resolve: true,
            reuse_addr: true,
            reuse_port: false,
        }
    }
}

impl CepOptions {
    /// Options with the given domain
    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    /// Options with the given type
    pub fn cep_type(mut self, cep_type: &str) -> Self {
        self.cep_type = Some(cep_type.to_string());
        self
    }

    fn parsed_domain(&self) -> Result<CepDomain, CepError> {
        self.domain
            .as_deref()
            .map(str::parse)
            .unwrap_or(Ok(CepDomain::Inet))
    }

    fn parsed_type(&self, default: CepType) -> Result<CepType, CepError> {
        self.cep_type.as_deref().map(str::parse).unwrap_or(Ok(default))
    }

    fn request(&self, domain: CepDomain, cep_type: CepType) -> EndpointRequest {
        EndpointRequest {
            domain,
            cep_type,
            protocol: self.protocol.clone().unwrap_or_default(),
            async_connect: self.async_connect,
            resolve: self.resolve,
            reuse_addr: self.reuse_addr,
            reuse_port: self.reuse_port,
            ..EndpointRequest::default()
        }
    }
}

/// Arguments passed to a user callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackArgs {
    /// New connection's handle, or the receiver's own handle
    pub handle: String,
    /// Peer or sender address
    pub address: String,
    /// Peer or sender port, `-1` for Local endpoints
    pub port: i32,
    /// Domain name of the address
    pub domain: String,
    /// Peer credentials, unknown (`-1 -1`) unless Local
    pub credentials: PeerCredentials,
    /// Datagram payload; `None` for connections
    pub payload: Option<Vec<u8>>,
}

/// Callback run for every accepted connection or received datagram
pub type FacadeCallback = Box<dyn FnMut(CallbackArgs) -> Result<(), CallbackError> + Send>;

enum Pending {
    Connection {
        listener: String,
        connection: Connection,
    },
    Datagram {
        receiver: String,
        address: String,
        port: i32,
        domain: CepDomain,
        payload: Vec<u8>,
    },
}

type PendingQueue = Arc<Mutex<VecDeque<Pending>>>;

fn lock_queue(queue: &PendingQueue) -> MutexGuard<'_, VecDeque<Pending>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle table and event routing for communication endpoints
pub struct CepFacade {
    config: EngineConfig,
    registry: Arc<Mutex<InterestRegistry>>,
    endpoints: HashMap<String, Endpoint>,
    callbacks: HashMap<String, FacadeCallback>,
    pending: PendingQueue,
    next_id: u64,
}

impl Default for CepFacade {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CepFacade {
    /// Create an empty facade
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: InterestRegistry::shared(),
            endpoints: HashMap::new(),
            callbacks: HashMap::new(),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            next_id: 0,
        }
    }

    /// Engine configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open handles, sorted
    pub fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.endpoints.keys().cloned().collect();
        handles.sort();
        handles
    }

    /// Create a client endpoint
    ///
    /// # Arguments
    ///
    /// * `options` - Creation options
    /// * `host` - Peer host or Local path; empty together with port `-1` means no peer
    /// * `port` - Peer port or service name; `None` is port 0, `"-1"` is no port
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Handle of the new endpoint
    /// * `Err(CepError)` - Invalid arguments or creation failure
    pub fn create_client(
        &mut self,
        options: &CepOptions,
        host: &str,
        port: Option<&str>,
    ) -> Result<String, CepError> {
        let domain = options.parsed_domain()?;
        let cep_type = options.parsed_type(CepType::Stream)?;
        let port = match port.map(str::trim) {
            None => Some(0),
            Some("-1") => None,
            Some(value) => Some(parse_port(value, cep_type)?),
        };
        let bind_port = match options.bind_port.as_deref() {
            Some(value) => parse_port(value, cep_type)?,
            None => 0,
        };

        let mut request = options.request(domain, cep_type);
        request.host = if port.is_none() && host.is_empty() {
            None
        } else {
            Some(host.to_string())
        };
        request.port = port;
        request.bind_addr = options.bind_addr.clone();
        request.bind_port = bind_port;

        let endpoint = create_client(&request, &self.config)?;
        Ok(self.insert(endpoint))
    }

    /// Create a server endpoint
    ///
    /// # Arguments
    ///
    /// * `options` - Creation options; `bind_addr` selects the local address of network servers
    /// * `target` - Port or service for network servers, the path for Local servers
    /// * `callback` - Run once per accepted connection
    pub fn create_server(
        &mut self,
        options: &CepOptions,
        target: &str,
        callback: FacadeCallback,
    ) -> Result<String, CepError> {
        let domain = options.parsed_domain()?;
        let cep_type = options.parsed_type(CepType::Stream)?;
        if options.async_connect {
            return Err(CepError::Argument(
                "cannot set -async option for server ceps".to_string(),
            ));
        }
        let request = self.listener_request(options, domain, cep_type, target)?;
        let handle = self.next_handle();
        let endpoint = create_server(
            &request,
            self.engine_callback(&handle),
            self.notifier(),
            &self.config,
        )?;
        Ok(self.insert_listener(handle, endpoint, callback))
    }

    /// Create a receiver endpoint
    ///
    /// Arguments as for [`CepFacade::create_server`]; the callback runs once per
    /// received datagram with the receiver's own handle.
    pub fn create_receiver(
        &mut self,
        options: &CepOptions,
        target: &str,
        callback: FacadeCallback,
    ) -> Result<String, CepError> {
        let domain = options.parsed_domain()?;
        if options.async_connect {
            return Err(CepError::Argument(
                "cannot set -async option for receiver ceps".to_string(),
            ));
        }
        let cep_type = match options.cep_type.as_deref() {
            Some(_) => options.parsed_type(CepType::Datagram)?,
            None => CepType::Datagram,
        };
        if cep_type == CepType::Stream {
            return Err(CepError::Argument(
                "cannot use type stream with receiver ceps".to_string(),
            ));
        }
        let request = self.listener_request(options, domain, cep_type, target)?;
        let handle = self.next_handle();
        let endpoint = create_receiver(
            &request,
            self.engine_callback(&handle),
            self.notifier(),
            &self.config,
        )?;
        Ok(self.insert_listener(handle, endpoint, callback))
    }

    /// Create a connected pair
    ///
    /// # Returns
    ///
    /// * `Ok((String, String))` - Handles of both ends
    /// * `Err(CepError)` - Invalid arguments, non-Local domain, or creation failure
    pub fn create_pair(&mut self, options: &CepOptions) -> Result<(String, String), CepError> {
        if options.async_connect {
            return Err(CepError::Argument(
                "cannot set -async option for localpair ceps".to_string(),
            ));
        }
        if options.bind_addr.is_some() {
            return Err(CepError::Argument(
                "cannot set -myaddr option for localpair ceps".to_string(),
            ));
        }
        if options.bind_port.is_some() {
            return Err(CepError::Argument(
                "cannot set -myport option for localpair ceps".to_string(),
            ));
        }
        let domain = match options.domain.as_deref() {
            Some(_) => options.parsed_domain()?,
            None => CepDomain::Local,
        };
        let cep_type = options.parsed_type(CepType::Stream)?;
        let (first, second) = create_pair(
            domain,
            cep_type,
            options.protocol.as_deref().unwrap_or_default(),
        )?;
        Ok((self.insert(first), self.insert(second)))
    }

    /// Send one datagram to an explicit destination
    ///
    /// # Arguments
    ///
    /// * `handle` - Sending endpoint
    /// * `host` - Destination host or Local path
    /// * `port` - Destination port or `udp` service name
    /// * `bytes` - Payload
    pub fn send_to(
        &self,
        handle: &str,
        host: &str,
        port: &str,
        bytes: &[u8],
    ) -> Result<usize, CepError> {
        let port = parse_port(port, CepType::Datagram)?;
        self.endpoint(handle)?.send_to(Some(host), port, bytes)
    }

    /// Read from a connected endpoint
    pub fn read(&mut self, handle: &str, buf: &mut [u8]) -> Result<usize, CepError> {
        self.endpoint_mut(handle)?.read(buf)
    }

    /// Write to a connected endpoint
    pub fn write(&mut self, handle: &str, bytes: &[u8]) -> Result<usize, CepError> {
        self.endpoint_mut(handle)?.write(bytes)
    }

    /// Close an endpoint and forget its handle
    pub fn close(&mut self, handle: &str) -> Result<(), CepError> {
        let endpoint = self
            .endpoints
            .remove(handle)
            .ok_or_else(|| CepError::Closed(handle.to_string()))?;
        self.callbacks.remove(handle);
        debug!(handle, "closing handle");
        endpoint.close()
    }

    /// Switch an endpoint between blocking and non-blocking mode
    pub fn set_blocking(&mut self, handle: &str, blocking: bool) -> Result<(), CepError> {
        self.endpoint_mut(handle)?.set_blocking(blocking)
    }

    /// Raw descriptor of an endpoint
    pub fn descriptor(&self, handle: &str) -> Result<RawFd, CepError> {
        Ok(self.endpoint(handle)?.descriptor())
    }

    /// Get one option, or every option as a `-name value` list when `name` is `None`
    pub fn get_option(&self, handle: &str, name: Option<&str>) -> Result<String, CepError> {
        let endpoint = self.endpoint(handle)?;
        match name {
            Some(name) => Ok(endpoint.get_option(name)?.to_string()),
            None => Ok(format_option_list(&endpoint.get_all_options()?)),
        }
    }

    /// Set one option
    pub fn set_option(&mut self, handle: &str, name: &str, value: &str) -> Result<(), CepError> {
        self.endpoint_mut(handle)?.set_option(name, value)
    }

    /// Route one readiness event to the endpoint owning `fd`
    ///
    /// # Returns
    ///
    /// The dispatch status; [`DispatchStatus::Ignored`] when no open endpoint
    /// owns the descriptor.
    pub fn dispatch_ready(&mut self, fd: RawFd) -> DispatchStatus {
        let status = match self
            .endpoints
            .values_mut()
            .find(|endpoint| endpoint.descriptor() == fd)
        {
            Some(endpoint) => endpoint.dispatch(),
            None => DispatchStatus::Ignored,
        };
        self.deliver_pending();
        status
    }

    /// Poll every registered descriptor once and dispatch what is ready
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum wait; `None` waits until something is ready
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of events routed
    /// * `Err(CepError)` - The poll itself failed
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result<usize, CepError> {
        let events = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .poll_once(timeout)
            .map_err(|e| {
                let errno = match e {
                    ReadinessError::InvalidFd(_) => libc::EBADF,
                    ReadinessError::PollFailed(errno) => errno as i32,
                };
                CepError::os("can't poll endpoints", io::Error::from_raw_os_error(errno))
            })?;
        let mut routed = 0;
        for event in events {
            if event.event_type == IoEventType::Read {
                self.dispatch_ready(event.fd);
                routed += 1;
            }
        }
        Ok(routed)
    }

    fn listener_request(
        &self,
        options: &CepOptions,
        domain: CepDomain,
        cep_type: CepType,
        target: &str,
    ) -> Result<EndpointRequest, CepError> {
        if let Some(value) = options.bind_port.as_deref() {
            if parse_port(value, cep_type)? != 0 {
                return Err(CepError::Argument(
                    "Option -myport is not valid for servers".to_string(),
                ));
            }
        }
        let mut request = options.request(domain, cep_type);
        if domain == CepDomain::Local {
            request.host = Some(target.to_string());
        } else {
            request.host = options.bind_addr.clone();
            request.port = Some(parse_port(target, cep_type)?);
        }
        Ok(request)
    }

    fn notifier(&self) -> SharedNotifier {
        self.registry.clone()
    }

    fn engine_callback(&self, listener: &str) -> AcceptCallback {
        let listener = listener.to_string();
        let queue = self.pending.clone();
        Box::new(move |event| {
            let pending = match event {
                DispatchEvent::Connection(connection) => Pending::Connection {
                    listener: listener.clone(),
                    connection,
                },
                DispatchEvent::Datagram(datagram) => Pending::Datagram {
                    receiver: listener.clone(),
                    address: datagram.address,
                    port: datagram.port,
                    domain: datagram.domain,
                    payload: datagram.payload,
                },
            };
            lock_queue(&queue).push_back(pending);
            Ok(())
        })
    }

    fn deliver_pending(&mut self) {
        loop {
            let next = lock_queue(&self.pending).pop_front();
            let Some(pending) = next else {
                break;
            };
            match pending {
                Pending::Connection {
                    listener,
                    connection,
                } => {
                    let Connection {
                        endpoint,
                        address,
                        port,
                        domain,
                        credentials,
                    } = connection;
                    let handle = self.insert(endpoint);
                    let args = CallbackArgs {
                        handle: handle.clone(),
                        address,
                        port,
                        domain: domain.name().to_string(),
                        credentials,
                        payload: None,
                    };
                    if let Err(e) = self.invoke(&listener, args) {
                        warn!(
                            listener = %listener,
                            handle = %handle,
                            error = %e,
                            "connection callback failed"
                        );
                        if let Err(e) = self.close(&handle) {
                            warn!(
                                handle = %handle,
                                error = %e,
                                "failed to close rejected connection"
                            );
                        }
                    }
                }
                Pending::Datagram {
                    receiver,
                    address,
                    port,
                    domain,
                    payload,
                } => {
                    let args = CallbackArgs {
                        handle: receiver.clone(),
                        address,
                        port,
                        domain: domain.name().to_string(),
                        credentials: PeerCredentials::UNKNOWN,
                        payload: Some(payload),
                    };
                    if let Err(e) = self.invoke(&receiver, args) {
                        warn!(receiver = %receiver, error = %e, "datagram callback failed");
                    }
                }
            }
        }
    }

    fn invoke(&mut self, listener: &str, args: CallbackArgs) -> Result<(), CallbackError> {
        match self.callbacks.get_mut(listener) {
            Some(callback) => callback(args),
            None => Ok(()),
        }
    }

    fn next_handle(&mut self) -> String {
        let handle = format!("cep{}", self.next_id);
        self.next_id += 1;
        handle
    }

    fn insert(&mut self, endpoint: Endpoint) -> String {
        let handle = self.next_handle();
        debug!(handle = %handle, fd = endpoint.descriptor(), "registered handle");
        self.endpoints.insert(handle.clone(), endpoint);
        handle
    }

    fn insert_listener(
        &mut self,
        handle: String,
        endpoint: Endpoint,
        callback: FacadeCallback,
    ) -> String {
        debug!(handle = %handle, fd = endpoint.descriptor(), "registered listener handle");
        self.endpoints.insert(handle.clone(), endpoint);
        self.callbacks.insert(handle.clone(), callback);
        handle
    }

    fn endpoint(&self, handle: &str) -> Result<&Endpoint, CepError> {
        self.endpoints
            .get(handle)
            .ok_or_else(|| CepError::Closed(handle.to_string()))
    }

    fn endpoint_mut(&mut self, handle: &str) -> Result<&mut Endpoint, CepError> {
        self.endpoints
            .get_mut(handle)
            .ok_or_else(|| CepError::Closed(handle.to_string()))
    }
}
