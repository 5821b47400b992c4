//! Descriptor Wait Module
//!
//! Provides a blocking wait on a single descriptor, used to observe the
//! completion of a non-blocking connect.

use std::os::unix::io::RawFd;
use std::time::Duration;

use nix::errno::Errno;

use crate::notifier::ReadinessError;

/// Result of waiting for a connecting descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Descriptor became writable
    Writable,
    /// An exceptional condition (error or hang-up) was reported
    Exception,
    /// Timeout expired first
    TimedOut,
}

/// Convert an optional timeout to poll(2) milliseconds (-1 = forever)
pub(crate) fn timeout_millis(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
    }
}

/// Wait until `fd` is writable or exceptional
///
/// # Arguments
///
/// * `fd` - Descriptor to wait on
/// * `timeout` - `Some(Duration::ZERO)` checks without blocking, `None` waits forever
///
/// # Returns
///
/// * `Ok(WaitOutcome)` - What was observed
/// * `Err(ReadinessError)` - Invalid descriptor or poll failure
pub fn wait_for_connect(
    fd: RawFd,
    timeout: Option<Duration>,
) -> Result<WaitOutcome, ReadinessError> {
    if fd < 0 {
        return Err(ReadinessError::InvalidFd(fd));
    }
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLOUT | libc::POLLPRI,
        revents: 0,
    };
    let millis = timeout_millis(timeout);
    let ready = loop {
        // SAFETY: pfd is a single valid pollfd structure.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc >= 0 {
            break rc;
        }
        let errno = Errno::last();
        if errno != Errno::EINTR {
            return Err(ReadinessError::PollFailed(errno));
        }
    };
    if ready == 0 {
        return Ok(WaitOutcome::TimedOut);
    }
    if pfd.revents & libc::POLLNVAL != 0 {
        return Err(ReadinessError::InvalidFd(fd));
    }
    if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLPRI) != 0 {
        return Ok(WaitOutcome::Exception);
    }
    Ok(WaitOutcome::Writable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_timeout_millis() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_millis(250))), 250);
        assert_eq!(timeout_millis(Some(Duration::from_secs(u64::MAX))), libc::c_int::MAX);
    }

    #[test]
    fn test_connected_pair_is_writable() {
        let (a, _b) = UnixStream::pair().unwrap();
        let outcome = wait_for_connect(a.as_raw_fd(), Some(Duration::ZERO)).unwrap();
        assert_eq!(outcome, WaitOutcome::Writable);
    }

    #[test]
    fn test_hung_up_peer_is_exception() {
        let (a, b) = UnixStream::pair().unwrap();
        drop(b);
        let outcome = wait_for_connect(a.as_raw_fd(), Some(Duration::from_millis(100))).unwrap();
        assert_eq!(outcome, WaitOutcome::Exception);
    }

    #[test]
    fn test_negative_fd() {
        assert!(wait_for_connect(-1, Some(Duration::ZERO)).is_err());
    }
}
