//! Readiness Notifier Module
//!
//! Provides the seam between endpoints and the external event loop that
//! watches their descriptors.
//!
//! ## Overview
//!
//! Listening endpoints register interest in their descriptor becoming readable
//! when they are created, and drop that interest when they are closed. The
//! loop that actually waits on descriptors is supplied by the embedding
//! application through the [`ReadinessNotifier`] trait.
//!
//! [`InterestRegistry`] is an in-process implementation: it records interest
//! per descriptor and can poll every registered descriptor once, returning the
//! events that are ready. Applications with their own loop implement the trait
//! instead.
//!
//! ## See Also
//!
//! - [`wait`](super::wait/index.html): Single-descriptor waits used by the I/O path

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;
use tracing::trace;

use crate::wait::timeout_millis;

/// Kind of readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoEventType {
    /// Data (or a pending connection) available for reading
    Read,
    /// Ready for writing
    Write,
    /// Exceptional condition
    Error,
}

/// A descriptor that became ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoEvent {
    /// Descriptor that triggered the event
    pub fd: RawFd,
    /// Type of event
    pub event_type: IoEventType,
}

/// Readiness errors
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// Descriptor is negative or otherwise unusable
    #[error("invalid file descriptor {0}")]
    InvalidFd(RawFd),
    /// The underlying poll call failed
    #[error("poll failed: {0}")]
    PollFailed(#[from] Errno),
}

/// External readiness notifier
///
/// Implemented by whatever event loop owns the descriptors. All calls happen
/// on the loop's own thread.
#[cfg_attr(test, mockall::automock)]
pub trait ReadinessNotifier: Send {
    /// Start watching `fd` for `event_type`
    fn register(&mut self, fd: RawFd, event_type: IoEventType) -> Result<(), ReadinessError>;

    /// Stop watching `fd` entirely
    fn unregister(&mut self, fd: RawFd);

    /// Whether `fd` is currently watched for `event_type`
    fn is_registered(&self, fd: RawFd, event_type: IoEventType) -> bool;
}

/// Notifier shared between the loop and the endpoints registered with it
pub type SharedNotifier = Arc<Mutex<dyn ReadinessNotifier>>;

/// Lock a shared notifier, recovering it if a previous holder panicked
pub fn lock_notifier(
    notifier: &SharedNotifier,
) -> std::sync::MutexGuard<'_, dyn ReadinessNotifier + 'static> {
    notifier.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An active registration
///
/// Ties one descriptor's interest to the notifier that holds it, so that the
/// owner can withdraw the interest without knowing which notifier it used.
/// The interest is withdrawn when the registration is released or dropped.
pub struct Registration {
    notifier: SharedNotifier,
    fd: RawFd,
}

impl Registration {
    /// Register `fd` for `event_type` with `notifier`
    ///
    /// # Arguments
    ///
    /// * `notifier` - Notifier to register with
    /// * `fd` - Descriptor to watch
    /// * `event_type` - Readiness to watch for
    ///
    /// # Returns
    ///
    /// * `Ok(Registration)` - Interest recorded
    /// * `Err(ReadinessError)` - The notifier refused the descriptor
    pub fn new(
        notifier: SharedNotifier,
        fd: RawFd,
        event_type: IoEventType,
    ) -> Result<Self, ReadinessError> {
        lock_notifier(&notifier).register(fd, event_type)?;
        Ok(Self { notifier, fd })
    }

    /// Descriptor this registration watches
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Withdraw the interest
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock_notifier(&self.notifier).unregister(self.fd);
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("fd", &self.fd).finish()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Interest {
    read: bool,
    write: bool,
    error: bool,
}

impl Interest {
    fn set(&mut self, event_type: IoEventType) {
        match event_type {
            IoEventType::Read => self.read = true,
            IoEventType::Write => self.write = true,
            IoEventType::Error => self.error = true,
        }
    }

    fn contains(&self, event_type: IoEventType) -> bool {
        match event_type {
            IoEventType::Read => self.read,
            IoEventType::Write => self.write,
            IoEventType::Error => self.error,
        }
    }

    fn poll_events(&self) -> libc::c_short {
        let mut events = 0;
        if self.read {
            events |= libc::POLLIN;
        }
        if self.write {
            events |= libc::POLLOUT;
        }
        if self.error {
            events |= libc::POLLPRI;
        }
        events
    }
}

/// In-process readiness registry
#[derive(Debug, Default)]
pub struct InterestRegistry {
    selections: HashMap<RawFd, Interest>,
}

impl InterestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry already wrapped for sharing
    pub fn shared() -> Arc<Mutex<InterestRegistry>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Number of watched descriptors
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    /// Whether nothing is watched
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Watched descriptors, in ascending order
    pub fn registered_fds(&self) -> Vec<RawFd> {
        let mut fds: Vec<RawFd> = self.selections.keys().copied().collect();
        fds.sort_unstable();
        fds
    }

    /// Poll every watched descriptor once
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait (`None` waits indefinitely)
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<IoEvent>)` - Ready events, empty on timeout
    /// * `Err(ReadinessError)` - The poll call failed
    pub fn poll_once(&self, timeout: Option<Duration>) -> Result<Vec<IoEvent>, ReadinessError> {
        let fds = self.registered_fds();
        if fds.is_empty() {
            return Ok(Vec::new());
        }
        let mut pollfds: Vec<libc::pollfd> = fds
            .iter()
            .map(|fd| libc::pollfd {
                fd: *fd,
                events: self.selections[fd].poll_events(),
                revents: 0,
            })
            .collect();

        let millis = timeout_millis(timeout);
        loop {
            // SAFETY: pollfds is a valid, exclusively borrowed slice of pollfd
            // structures whose length is passed alongside it.
            let rc = unsafe {
                libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, millis)
            };
            if rc >= 0 {
                break;
            }
            let errno = Errno::last();
            if errno != Errno::EINTR {
                return Err(ReadinessError::PollFailed(errno));
            }
        }

        let mut events = Vec::new();
        for pfd in &pollfds {
            let interest = self.selections[&pfd.fd];
            if pfd.revents & (libc::POLLIN | libc::POLLHUP) != 0 && interest.read {
                events.push(IoEvent {
                    fd: pfd.fd,
                    event_type: IoEventType::Read,
                });
            }
            if pfd.revents & libc::POLLOUT != 0 && interest.write {
                events.push(IoEvent {
                    fd: pfd.fd,
                    event_type: IoEventType::Write,
                });
            }
            if pfd.revents & (libc::POLLPRI | libc::POLLERR) != 0 && interest.error {
                events.push(IoEvent {
                    fd: pfd.fd,
                    event_type: IoEventType::Error,
                });
            }
        }
        trace!(
            ready = events.len(),
            watched = pollfds.len(),
            "polled registered descriptors"
        );
        Ok(events)
    }
}

impl ReadinessNotifier for InterestRegistry {
    fn register(&mut self, fd: RawFd, event_type: IoEventType) -> Result<(), ReadinessError> {
        if fd < 0 {
            return Err(ReadinessError::InvalidFd(fd));
        }
        self.selections.entry(fd).or_default().set(event_type);
        trace!(fd, ?event_type, "registered readiness interest");
        Ok(())
    }

    fn unregister(&mut self, fd: RawFd) {
        if self.selections.remove(&fd).is_some() {
            trace!(fd, "dropped readiness interest");
        }
    }

    fn is_registered(&self, fd: RawFd, event_type: IoEventType) -> bool {
        self.selections
            .get(&fd)
            .map(|interest| interest.contains(event_type))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_register_and_unregister() {
        let mut registry = InterestRegistry::new();
        registry.register(7, IoEventType::Read).unwrap();
        assert!(registry.is_registered(7, IoEventType::Read));
        assert!(!registry.is_registered(7, IoEventType::Write));
        registry.register(7, IoEventType::Write).unwrap();
        assert!(registry.is_registered(7, IoEventType::Write));
        assert_eq!(registry.len(), 1);

        registry.unregister(7);
        assert!(registry.is_empty());
        assert!(!registry.is_registered(7, IoEventType::Read));
    }

    #[test]
    fn test_register_negative_fd() {
        let mut registry = InterestRegistry::new();
        assert!(matches!(
            registry.register(-1, IoEventType::Read),
            Err(ReadinessError::InvalidFd(-1))
        ));
    }

    #[test]
    fn test_poll_once_empty() {
        let registry = InterestRegistry::new();
        let events = registry.poll_once(Some(Duration::from_millis(0))).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_poll_once_reports_readable() {
        let (mut a, b) = UnixStream::pair().unwrap();
        let mut registry = InterestRegistry::new();
        registry.register(b.as_raw_fd(), IoEventType::Read).unwrap();

        let events = registry.poll_once(Some(Duration::from_millis(0))).unwrap();
        assert!(events.is_empty());

        a.write_all(b"x").unwrap();
        let events = registry.poll_once(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(
            events,
            vec![IoEvent { fd: b.as_raw_fd(), event_type: IoEventType::Read }]
        );
    }

    #[test]
    fn test_registration_releases_interest() {
        let mut mock = MockReadinessNotifier::new();
        mock.expect_register()
            .withf(|fd, event_type| *fd == 11 && *event_type == IoEventType::Read)
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_unregister()
            .withf(|fd| *fd == 11)
            .times(1)
            .return_const(());

        let notifier: SharedNotifier = Arc::new(Mutex::new(mock));
        let registration = Registration::new(notifier.clone(), 11, IoEventType::Read).unwrap();
        assert_eq!(registration.fd(), 11);
        registration.release();
    }

    #[test]
    fn test_registration_refused() {
        let mut mock = MockReadinessNotifier::new();
        mock.expect_register()
            .returning(|fd, _| Err(ReadinessError::InvalidFd(fd)));
        mock.expect_unregister().times(0);

        let notifier: SharedNotifier = Arc::new(Mutex::new(mock));
        assert!(Registration::new(notifier, 3, IoEventType::Read).is_err());
    }
}
