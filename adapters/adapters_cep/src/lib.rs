//! Adapters Layer: Communication Endpoints
//!
//! Provides a single endpoint abstraction over stream, datagram and raw
//! sockets in the Local (Unix-domain), Inet and Inet6 families. This crate
//! implements endpoint creation, event-driven accept and receive dispatch,
//! connected I/O and the named option vocabulary on top of `socket2`.
//!
//! ## Overview
//!
//! Every open endpoint is one [`Endpoint`] value:
//!
//! - **Clients** connect (optionally without blocking) and are read and written
//! - **Servers** accept one connection per readiness event and hand it to a callback
//! - **Receivers** read one datagram per readiness event and hand its payload to a callback
//! - **Connected pairs** are two Local endpoints linked without a handshake
//!
//! ## Modules
//!
//! - **[`resolver`](resolver/index.html)**: Host/port/domain to socket address, and back
//! - **[`translate`](translate/index.html)**: Domain and type to system constants
//! - **[`endpoint`](endpoint/index.html)**: The endpoint state
//! - **[`factory`](factory/index.html)**: Client, server and receiver creation
//! - **[`pair`](pair/index.html)**: Connected pairs
//! - **[`dispatch`](dispatch/index.html)**: Accept and receive paths
//! - **[`io`](io/index.html)**: Read, write, send-to, blocking mode, close
//! - **[`options`](options/index.html)**: Option get and set
//!
//! ## See Also
//!
//! - [`adapters_readiness`](../adapters_readiness/index.html): Readiness registration
//! - [`entities_endpoint`](../entities_endpoint/index.html): Domain types and errors

pub mod dispatch;
pub mod endpoint;
pub mod factory;
pub mod io;
pub mod options;
pub mod pair;
pub mod resolver;
pub mod sys;
pub mod translate;

pub use dispatch::{
    AcceptCallback, CallbackError, Connection, Datagram, DispatchEvent, DispatchStatus,
};
pub use endpoint::Endpoint;
pub use factory::{create, create_client, create_receiver, create_server, EndpointRequest};
pub use pair::create_pair;
pub use resolver::{
    create_address, format_address, format_peer, parse_port, protocol_name, resolve_protocol,
    FormattedAddress,
};
