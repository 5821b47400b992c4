//! Integration tests for adapters_readiness crate
//!
//! These tests drive the in-process registry through the shared notifier
//! handle the way endpoints use it.

use adapters_readiness::*;
use std::io::Write;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_shared_registry_sees_registrations() {
    let registry = InterestRegistry::shared();
    let notifier: SharedNotifier = registry.clone();

    let (_a, b) = UnixStream::pair().unwrap();
    let registration = Registration::new(notifier, b.as_raw_fd(), IoEventType::Read).unwrap();
    assert!(registry.lock().unwrap().is_registered(b.as_raw_fd(), IoEventType::Read));

    registration.release();
    assert!(registry.lock().unwrap().is_empty());
}

#[test]
fn test_poll_only_reports_registered_descriptors() {
    let registry = InterestRegistry::shared();
    let notifier: SharedNotifier = registry.clone();

    let (mut a1, b1) = UnixStream::pair().unwrap();
    let (mut a2, b2) = UnixStream::pair().unwrap();
    let _r1 = Registration::new(notifier, b1.as_raw_fd(), IoEventType::Read).unwrap();

    a1.write_all(b"one").unwrap();
    a2.write_all(b"two").unwrap();

    let events = registry
        .lock()
        .unwrap()
        .poll_once(Some(Duration::from_secs(1)))
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].fd, b1.as_raw_fd());
    assert_ne!(events[0].fd, b2.as_raw_fd());
}

#[test]
fn test_wait_for_connect_on_fresh_pair() {
    let (a, _b) = UnixStream::pair().unwrap();
    assert_eq!(
        wait_for_connect(a.as_raw_fd(), None).unwrap(),
        WaitOutcome::Writable
    );
}

#[test]
fn test_custom_notifier_through_trait_object() {
    #[derive(Default)]
    struct Counting {
        registered: usize,
        unregistered: usize,
    }

    impl ReadinessNotifier for Counting {
        fn register(&mut self, _fd: i32, _event_type: IoEventType) -> Result<(), ReadinessError> {
            self.registered += 1;
            Ok(())
        }
        fn unregister(&mut self, _fd: i32) {
            self.unregistered += 1;
        }
        fn is_registered(&self, _fd: i32, _event_type: IoEventType) -> bool {
            self.registered > self.unregistered
        }
    }

    let counting = Arc::new(Mutex::new(Counting::default()));
    let notifier: SharedNotifier = counting.clone();
    Registration::new(notifier.clone(), 5, IoEventType::Read).unwrap().release();
    Registration::new(notifier, 6, IoEventType::Read).unwrap().release();

    let counts = counting.lock().unwrap();
    assert_eq!(counts.registered, 2);
    assert_eq!(counts.unregistered, 2);
}
