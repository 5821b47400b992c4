//! Integration tests for api_facades crate
//!
//! These tests drive endpoints purely through handle names and strings, the
//! way an embedding runtime would.

use api_facades::*;
use entities_endpoint::ErrorKind;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_test::traced_test;

type Seen = Arc<Mutex<Vec<CallbackArgs>>>;

fn recording() -> (Seen, FacadeCallback) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: FacadeCallback = Box::new(move |args| {
        sink.lock().unwrap().push(args);
        Ok(())
    });
    (seen, callback)
}

fn numeric() -> CepOptions {
    CepOptions {
        resolve: false,
        ..CepOptions::default()
    }
}

fn bound_port(facade: &CepFacade, handle: &str) -> String {
    let sockname = facade.get_option(handle, Some("sockname")).unwrap();
    sockname.rsplit(' ').next().unwrap().to_string()
}

#[test]
fn test_local_server_hands_connection_handle_to_callback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("facade.sock");
    let path_str = path.to_str().unwrap();
    let mut facade = CepFacade::default();
    let (seen, callback) = recording();

    let local = CepOptions::default().domain("local");
    let server = facade.create_server(&local, path_str, callback).unwrap();
    let client = facade.create_client(&local, path_str, None).unwrap();

    assert_eq!(facade.poll(Some(Duration::from_secs(2))).unwrap(), 1);
    let args = seen.lock().unwrap().pop().unwrap();
    assert_eq!(args.address, path_str);
    assert_eq!(args.port, -1);
    assert_eq!(args.domain, "local");
    assert!(args.payload.is_none());
    assert!(facade.handles().contains(&args.handle));

    facade.write(&client, b"hello").unwrap();
    let mut buf = [0u8; 16];
    let n = facade.read(&args.handle, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello");

    facade.close(&server).unwrap();
    assert!(!path.exists());
}

#[test]
#[traced_test]
fn test_failing_connection_callback_closes_new_handle() {
    let mut facade = CepFacade::default();
    let callback: FacadeCallback = Box::new(|_args| Err("not today".into()));
    let options = CepOptions {
        bind_addr: Some("127.0.0.1".to_string()),
        ..numeric()
    };
    let server = facade.create_server(&options, "0", callback).unwrap();
    let port = bound_port(&facade, &server);
    let _client = facade.create_client(&numeric(), "127.0.0.1", Some(&port)).unwrap();

    assert_eq!(facade.poll(Some(Duration::from_secs(2))).unwrap(), 1);
    assert_eq!(facade.handles().len(), 2);
    assert!(logs_contain("connection callback failed"));
}

#[test]
fn test_receiver_callback_gets_payload() {
    let mut facade = CepFacade::default();
    let (seen, callback) = recording();
    let options = CepOptions {
        bind_addr: Some("127.0.0.1".to_string()),
        ..numeric()
    };
    let receiver = facade.create_receiver(&options, "0", callback).unwrap();
    let port = bound_port(&facade, &receiver);

    let sender = facade
        .create_client(&numeric().cep_type("datagram"), "", Some("-1"))
        .unwrap();
    assert_eq!(facade.send_to(&sender, "127.0.0.1", &port, b"datagram").unwrap(), 8);

    let descriptor = facade.descriptor(&receiver).unwrap();
    assert_eq!(facade.poll(Some(Duration::from_secs(2))).unwrap(), 1);
    let args = seen.lock().unwrap().pop().unwrap();
    assert_eq!(args.handle, receiver);
    assert_eq!(args.address, "127.0.0.1");
    assert_eq!(args.domain, "inet");
    assert_eq!(args.payload.as_deref(), Some(&b"datagram"[..]));
    assert!(descriptor >= 0);
}

#[test]
fn test_pair_options_through_handles() {
    let mut facade = CepFacade::default();
    let (a, b) = facade.create_pair(&CepOptions::default()).unwrap();
    assert_eq!(facade.get_option(&a, Some("domain")).unwrap(), "local");
    assert!(facade
        .get_option(&a, Some("peername"))
        .unwrap()
        .starts_with("{} {} "));

    facade.set_option(&a, "shutdown", "write").unwrap();
    assert_eq!(facade.get_option(&a, Some("shutdown")).unwrap(), "write");
    let mut buf = [0u8; 4];
    assert_eq!(facade.read(&b, &mut buf).unwrap(), 0);

    let all = facade.get_option(&a, None).unwrap();
    assert!(all.starts_with("-peername "));
    assert!(all.contains("-type stream"));
}

#[test]
fn test_unknown_option_lists_valid_names() {
    let mut facade = CepFacade::default();
    let (a, _b) = facade.create_pair(&CepOptions::default()).unwrap();
    let err = facade.set_option(&a, "bogus", "1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(err.to_string().contains("broadcast"));
}

#[test]
fn test_operations_on_closed_handle_fail() {
    let mut facade = CepFacade::default();
    let (a, _b) = facade.create_pair(&CepOptions::default()).unwrap();
    facade.close(&a).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(facade.read(&a, &mut buf).unwrap_err().kind(), ErrorKind::Resource);
    assert_eq!(facade.write(&a, b"x").unwrap_err().kind(), ErrorKind::Resource);
    assert!(facade.descriptor(&a).is_err());
}
