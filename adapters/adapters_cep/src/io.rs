//! I/O Adapter Module
//!
//! Provides read, write, send-to, blocking-mode and close operations on an
//! [`Endpoint`].
//!
//! ## Pending connects
//!
//! An endpoint created with an asynchronous connect that reported "in
//! progress" carries the connect-pending flag. The first read or write waits
//! for the descriptor to become writable: without timeout when the endpoint is
//! in blocking mode, not at all when it is non-blocking (which yields
//! [`CepError::WouldBlock`] until the connect completes). A wait that observes
//! an exceptional condition fails the operation and leaves the flag set.

use std::io::{self, Read, Write};
use std::os::unix::io::IntoRawFd;
use std::time::Duration;

use adapters_readiness::{ReadinessError, WaitOutcome};
use entities_endpoint::{CepDomain, CepError};
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::resolver::create_address;
use crate::sys;

impl Endpoint {
    /// Wait for a pending asynchronous connect to complete
    ///
    /// Does nothing when no connect is pending.
    pub fn wait_for_connect(&mut self) -> Result<(), CepError> {
        if !self.flags.async_connect_pending {
            return Ok(());
        }
        let timeout = if self.flags.async_mode {
            Some(Duration::ZERO)
        } else {
            None
        };
        let outcome = adapters_readiness::wait_for_connect(self.descriptor(), timeout)
            .map_err(|e| CepError::os("can't wait for connect", readiness_io_error(e)))?;
        if !self.flags.async_mode {
            self.socket
                .set_nonblocking(false)
                .map_err(|e| CepError::os("can't wait for connect", e))?;
        }
        match outcome {
            WaitOutcome::TimedOut => Err(CepError::WouldBlock),
            WaitOutcome::Exception => {
                let cause = match self.socket.take_error() {
                    Ok(Some(e)) | Err(e) => e,
                    Ok(None) => io::Error::from_raw_os_error(libc::ECONNREFUSED),
                };
                Err(CepError::os("connect failed", cause))
            }
            WaitOutcome::Writable => {
                self.flags.async_connect_pending = false;
                Ok(())
            }
        }
    }

    /// Read from the connected peer
    ///
    /// A connection reset by the peer reads as end of data.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Bytes read, 0 at end of data
    /// * `Err(CepError::WouldBlock)` - Non-blocking and nothing to read yet
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, CepError> {
        self.wait_for_connect()?;
        match (&self.socket).read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.raw_os_error() == Some(libc::ECONNRESET) => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(CepError::WouldBlock),
            Err(e) => Err(CepError::os("error reading cep", e)),
        }
    }

    /// Write to the connected peer
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Bytes written
    /// * `Err(CepError::WouldBlock)` - Non-blocking and the send buffer is full
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, CepError> {
        self.wait_for_connect()?;
        match (&self.socket).write(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(CepError::WouldBlock),
            Err(e) => Err(CepError::os("error writing cep", e)),
        }
    }

    /// Send one datagram to an explicit destination
    ///
    /// The destination is resolved in the endpoint's own domain, honouring its
    /// resolve-names flag.
    ///
    /// # Arguments
    ///
    /// * `host` - Destination host, or the path for Local endpoints
    /// * `port` - Destination port (ignored for Local)
    /// * `bytes` - Payload
    pub fn send_to(&self, host: Option<&str>, port: u16, bytes: &[u8]) -> Result<usize, CepError> {
        let host = host.filter(|h| !h.is_empty());
        let addr = create_address(self.domain, host, port, self.flags.resolve_names)?;
        self.socket.send_to(bytes, &addr).map_err(|e| match e.kind() {
            io::ErrorKind::WouldBlock => CepError::WouldBlock,
            _ => CepError::os("error sending datagram", e),
        })
    }

    /// Switch between blocking and non-blocking mode
    pub fn set_blocking(&mut self, blocking: bool) -> Result<(), CepError> {
        self.socket
            .set_nonblocking(!blocking)
            .map_err(|e| CepError::os("can't set blocking mode", e))?;
        self.flags.async_mode = !blocking;
        Ok(())
    }

    /// Tear the endpoint down
    ///
    /// Withdraws the readiness registration, unlinks the bound path of a
    /// Local server, and closes the descriptor. The endpoint is gone even
    /// when an error is reported.
    pub fn close(self) -> Result<(), CepError> {
        let Endpoint {
            socket,
            domain,
            flags,
            registration,
            ..
        } = self;
        drop(registration);

        let mut result = Ok(());
        if flags.server && domain == CepDomain::Local {
            let path = socket.local_addr().ok().and_then(|addr| sys::local_path(&addr));
            if let Some(path) = path {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path, error = %e, "failed to unlink local endpoint path");
                    result = Err(CepError::os(format!("can't remove \"{}\"", path), e));
                }
            }
        }

        let fd = socket.into_raw_fd();
        // SAFETY: fd was just released from the socket, so it is open and
        // owned by nothing else.
        if unsafe { libc::close(fd) } != 0 {
            let e = io::Error::last_os_error();
            warn!(fd, error = %e, "failed to close endpoint");
            if result.is_ok() {
                result = Err(CepError::os("error closing cep", e));
            }
        }
        debug!(fd, domain = %domain, "closed endpoint");
        result
    }
}

fn readiness_io_error(err: ReadinessError) -> io::Error {
    match err {
        ReadinessError::InvalidFd(_) => io::Error::from_raw_os_error(libc::EBADF),
        ReadinessError::PollFailed(errno) => io::Error::from_raw_os_error(errno as i32),
    }
}
