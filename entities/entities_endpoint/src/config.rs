//! Engine Configuration Module
//!
//! Provides the tunables shared by every endpoint the engine creates.

/// Minimum kernel send/receive buffer for Stream endpoints
pub const SOCKET_BUFFER_FLOOR: usize = 4096;

/// Smallest listen backlog the engine will use
pub const MIN_LISTEN_BACKLOG: i32 = 100;

/// Initial buffer the receiver path peeks a pending datagram into
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Floor for SO_SNDBUF/SO_RCVBUF on Stream sockets; buffers are only raised
    pub socket_buffer_floor: usize,
    /// Backlog passed to `listen` for Stream servers
    pub listen_backlog: i32,
    /// Initial peek buffer of the receiver dispatch path; doubled for larger datagrams
    pub max_datagram_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket_buffer_floor: SOCKET_BUFFER_FLOOR,
            listen_backlog: default_backlog(),
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl EngineConfig {
    /// Set the socket buffer floor
    pub fn with_socket_buffer_floor(mut self, floor: usize) -> Self {
        self.socket_buffer_floor = floor;
        self
    }

    /// Set the listen backlog
    pub fn with_listen_backlog(mut self, backlog: i32) -> Self {
        self.listen_backlog = backlog;
        self
    }

    /// Set the initial receiver peek buffer (at least one byte)
    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size.max(1);
        self
    }
}

#[cfg(unix)]
fn default_backlog() -> i32 {
    libc::SOMAXCONN.max(MIN_LISTEN_BACKLOG)
}

#[cfg(not(unix))]
fn default_backlog() -> i32 {
    MIN_LISTEN_BACKLOG
}
