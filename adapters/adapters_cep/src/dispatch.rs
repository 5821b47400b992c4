//! Event Dispatch Module
//!
//! Provides the readiness-triggered accept and receive paths of listening
//! endpoints.
//!
//! ## Overview
//!
//! A server or receiver endpoint is registered with the external readiness
//! notifier when it is created. Whenever its descriptor becomes readable the
//! loop calls [`Endpoint::dispatch`], which does exactly one unit of work:
//!
//! - **Server**: accept one connection, wrap it as a new [`Endpoint`] and pass
//!   ownership of it to the callback as a [`DispatchEvent::Connection`].
//! - **Receiver**: read one datagram and pass its payload, together with a
//!   borrow of the receiver itself, as a [`DispatchEvent::Datagram`].
//!
//! Failures on this path (a failed accept, a failed receive, a callback that
//! returns an error) are logged and swallowed; they never propagate into the
//! loop. A callback that rejects a connection owns it and is expected to
//! close it; if it simply returns, the endpoint is dropped.

use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::AsRawFd;

use entities_endpoint::{CepDomain, EndpointFlags, PeerCredentials, Role};
use socket2::{MaybeUninitSlice, SockAddr};
use tracing::{trace, warn};

use crate::endpoint::Endpoint;
use crate::resolver::format_peer;
use crate::sys;
use crate::translate::from_sys_family;

/// Error returned by a dispatch callback
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked once per accepted connection or received datagram
pub type AcceptCallback = Box<dyn FnMut(DispatchEvent<'_>) -> Result<(), CallbackError> + Send>;

/// One unit of dispatched work
#[derive(Debug)]
pub enum DispatchEvent<'a> {
    /// A server accepted a connection
    Connection(Connection),
    /// A receiver read a datagram
    Datagram(Datagram<'a>),
}

/// A freshly accepted connection
#[derive(Debug)]
pub struct Connection {
    /// The new endpoint; the callback owns it from here on
    pub endpoint: Endpoint,
    /// Numeric peer host, or the listener's bound path for Local endpoints
    pub address: String,
    /// Peer port, `-1` for Local endpoints
    pub port: i32,
    /// Domain of the new endpoint
    pub domain: CepDomain,
    /// Peer credentials, unknown unless Local
    pub credentials: PeerCredentials,
}

/// A received datagram
#[derive(Debug)]
pub struct Datagram<'a> {
    /// The receiver that read the datagram
    pub receiver: &'a Endpoint,
    /// Numeric sender host, or the sender's path for Local endpoints
    pub address: String,
    /// Sender port, `-1` for Local endpoints
    pub port: i32,
    /// Domain of the sender's address
    pub domain: CepDomain,
    /// Datagram payload, exactly as many bytes as were received
    pub payload: Vec<u8>,
}

/// Result of one dispatch call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The callback ran and succeeded
    Delivered,
    /// The callback ran and reported an error
    Rejected,
    /// Accept or receive failed; the callback did not run
    Failed,
    /// The endpoint has no dispatch path (not a server or receiver, or no callback)
    Ignored,
}

impl Endpoint {
    /// Handle one readiness event on a listening endpoint
    ///
    /// # Returns
    ///
    /// What happened; failures have already been logged.
    pub fn dispatch(&mut self) -> DispatchStatus {
        let Some(mut callback) = self.callback.take() else {
            trace!(fd = self.descriptor(), "dispatch without callback");
            return DispatchStatus::Ignored;
        };
        let status = match self.role {
            Role::Server => self.accept_one(&mut callback),
            Role::Receiver => self.receive_one(&mut callback),
            _ => DispatchStatus::Ignored,
        };
        self.callback = Some(callback);
        status
    }

    fn accept_one(&self, callback: &mut AcceptCallback) -> DispatchStatus {
        let (socket, peer) = match self.socket.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(fd = self.descriptor(), error = %e, "accept failed");
                return DispatchStatus::Failed;
            }
        };
        if let Err(e) = socket.set_cloexec(true) {
            warn!(fd = self.descriptor(), error = %e, "accept failed");
            return DispatchStatus::Failed;
        }

        let (address, port, credentials) = if self.domain == CepDomain::Local {
            let path = socket
                .local_addr()
                .ok()
                .and_then(|addr| sys::local_path(&addr))
                .unwrap_or_else(|| "!".to_string());
            let credentials = sys::peer_credentials(socket.as_raw_fd())
                .unwrap_or(PeerCredentials::UNKNOWN);
            (path, -1, credentials)
        } else {
            let (host, port) = format_peer(&peer);
            (host, port, PeerCredentials::UNKNOWN)
        };

        let endpoint = Endpoint::new(
            socket,
            self.domain,
            self.cep_type,
            self.protocol,
            Role::Accepted,
            EndpointFlags::new(false, self.flags.resolve_names),
        );
        trace!(
            listener = self.descriptor(),
            fd = endpoint.descriptor(),
            %address,
            port,
            "accepted connection"
        );

        let event = DispatchEvent::Connection(Connection {
            endpoint,
            address,
            port,
            domain: self.domain,
            credentials,
        });
        match callback(event) {
            Ok(()) => DispatchStatus::Delivered,
            Err(e) => {
                warn!(fd = self.descriptor(), error = %e, "accept callback failed");
                DispatchStatus::Rejected
            }
        }
    }

    fn receive_one(&self, callback: &mut AcceptCallback) -> DispatchStatus {
        let (payload, sender) = match self.receive_datagram() {
            Ok(received) => received,
            Err(e) => {
                warn!(fd = self.descriptor(), error = %e, "receive failed");
                return DispatchStatus::Failed;
            }
        };

        let (address, port, domain) = if self.domain == CepDomain::Local {
            (sys::local_path(&sender).unwrap_or_default(), -1, CepDomain::Local)
        } else {
            let domain =
                from_sys_family(libc::c_int::from(sender.family())).unwrap_or(self.domain);
            let (address, port) = format_peer(&sender);
            (address, port, domain)
        };
        let len = payload.len();
        trace!(fd = self.descriptor(), len, %address, port, "received datagram");

        let event = DispatchEvent::Datagram(Datagram {
            receiver: self,
            address,
            port,
            domain,
            payload,
        });
        match callback(event) {
            Ok(()) => DispatchStatus::Delivered,
            Err(e) => {
                warn!(fd = self.descriptor(), error = %e, "receive callback failed");
                DispatchStatus::Rejected
            }
        }
    }
}

impl Endpoint {
    /// Size of the next queued datagram
    ///
    /// Peeks with a buffer of the configured capacity, doubling it until the
    /// datagram is no longer reported as truncated.
    fn peek_datagram_size(&self) -> io::Result<usize> {
        let mut capacity = self.receive_capacity.max(1);
        loop {
            let mut buf = vec![MaybeUninit::<u8>::uninit(); capacity];
            let mut slices = [MaybeUninitSlice::new(&mut buf)];
            let (len, flags, _) = self
                .socket
                .recv_from_vectored_with_flags(&mut slices, libc::MSG_PEEK)?;
            if !flags.is_truncated() {
                return Ok(len);
            }
            capacity = capacity.saturating_mul(2);
        }
    }

    /// Receive the next datagram whole, into a buffer of exactly its size
    fn receive_datagram(&self) -> io::Result<(Vec<u8>, SockAddr)> {
        let size = self.peek_datagram_size()?;
        let mut buf = vec![MaybeUninit::<u8>::uninit(); size];
        let (len, sender) = self.socket.recv_from(&mut buf)?;
        buf.truncate(len);
        Ok((initialized(buf), sender))
    }
}

/// Convert a buffer whose every element was written by the kernel
fn initialized(buf: Vec<MaybeUninit<u8>>) -> Vec<u8> {
    let mut buf = std::mem::ManuallyDrop::new(buf);
    let (ptr, len, cap) = (buf.as_mut_ptr(), buf.len(), buf.capacity());
    // SAFETY: the buffer was truncated to the number of bytes recvfrom wrote,
    // and MaybeUninit<u8> has the same layout as u8.
    unsafe { Vec::from_raw_parts(ptr.cast::<u8>(), len, cap) }
}
