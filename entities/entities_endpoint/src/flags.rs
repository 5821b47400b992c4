//! Endpoint Flags Module
//!
//! Provides the independent boolean facets of an endpoint's mode, the record
//! of which halves have been shut down, and peer credential pairs.

use std::fmt;

/// How an endpoint came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Connected (or connecting) client
    Client,
    /// Listening server; each readiness event accepts one connection
    Server,
    /// Connectionless listener; each readiness event reads one datagram
    Receiver,
    /// Connection produced by a server's accept
    Accepted,
    /// One side of a connected pair
    Paired,
}

impl Role {
    /// Whether the endpoint is a listener that dispatches through a callback
    pub fn is_listener(&self) -> bool {
        matches!(self, Role::Server | Role::Receiver)
    }
}

/// Which halves of a connection have been shut down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownHalves {
    /// Receive half is shut
    pub read: bool,
    /// Send half is shut
    pub write: bool,
}

impl ShutdownHalves {
    /// Nothing shut down
    pub const NONE: ShutdownHalves = ShutdownHalves {
        read: false,
        write: false,
    };

    /// Whether no half is shut
    pub fn is_empty(&self) -> bool {
        !self.read && !self.write
    }

    /// Merge another set of halves into this one
    pub fn merge(&mut self, other: ShutdownHalves) {
        self.read |= other.read;
        self.write |= other.write;
    }

    /// Names of the shut halves, `read` before `write`
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.read {
            names.push("read".to_string());
        }
        if self.write {
            names.push("write".to_string());
        }
        names
    }
}

/// Mode flags of an endpoint
///
/// Domain and type are not part of this record; they live in their own
/// immutable fields on the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointFlags {
    /// Endpoint was created as a server or receiver
    pub server: bool,
    /// Descriptor is in non-blocking mode
    pub async_mode: bool,
    /// A non-blocking connect has been started but not yet observed complete
    pub async_connect_pending: bool,
    /// Halves shut down through the `shutdown` option
    pub shutdown: ShutdownHalves,
    /// Peer and local addresses are reverse-resolved when formatted
    pub resolve_names: bool,
}

impl EndpointFlags {
    /// Flags for a freshly created endpoint
    pub fn new(server: bool, resolve_names: bool) -> Self {
        Self {
            server,
            resolve_names,
            ..Self::default()
        }
    }
}

/// Effective user and group of a peer process
///
/// `-1` in either field means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    /// Effective user id
    pub uid: i64,
    /// Effective group id
    pub gid: i64,
}

impl PeerCredentials {
    /// Credentials that could not be determined
    pub const UNKNOWN: PeerCredentials = PeerCredentials { uid: -1, gid: -1 };

    /// Whether both ids are known
    pub fn is_known(&self) -> bool {
        self.uid >= 0 && self.gid >= 0
    }
}

impl Default for PeerCredentials {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for PeerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.uid, self.gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_flags() {
        let flags = EndpointFlags::new(true, false);
        assert!(flags.server);
        assert!(!flags.resolve_names);
        assert!(!flags.async_mode);
        assert!(!flags.async_connect_pending);
        assert!(flags.shutdown.is_empty());
    }

    #[test]
    fn test_shutdown_merge_and_names() {
        let mut halves = ShutdownHalves::NONE;
        halves.merge(ShutdownHalves {
            read: false,
            write: true,
        });
        assert_eq!(halves.names(), vec!["write".to_string()]);
        halves.merge(ShutdownHalves {
            read: true,
            write: false,
        });
        assert_eq!(halves.names(), vec!["read".to_string(), "write".to_string()]);
    }

    #[test]
    fn test_peer_credentials_unknown() {
        let creds = PeerCredentials::default();
        assert!(!creds.is_known());
        assert_eq!(creds.to_string(), "-1 -1");
    }

    #[test]
    fn test_role_listener() {
        assert!(Role::Server.is_listener());
        assert!(Role::Receiver.is_listener());
        assert!(!Role::Client.is_listener());
        assert!(!Role::Accepted.is_listener());
        assert!(!Role::Paired.is_listener());
    }
}
