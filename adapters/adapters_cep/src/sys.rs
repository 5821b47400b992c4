//! System Call Module
//!
//! Thin wrappers over the libc calls `socket2` does not cover: protocol and
//! service databases, reverse lookups, integer socket options, AF_UNSPEC
//! disconnects, Unix-domain paths and peer credentials.

use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::io::RawFd;

use entities_endpoint::PeerCredentials;
use nix::errno::Errno;
use socket2::SockAddr;

const HOST_MAX: usize = 1025;

/// Protocol number for a protocol name (`getprotobyname`)
pub fn protocol_by_name(name: &str) -> Option<i32> {
    let cname = CString::new(name).ok()?;
    // SAFETY: cname is a valid NUL-terminated string. The returned entry
    // points into static storage and is read before any further lookup.
    unsafe {
        let entry = libc::getprotobyname(cname.as_ptr());
        if entry.is_null() {
            None
        } else {
            Some((*entry).p_proto)
        }
    }
}

/// Protocol name for a protocol number (`getprotobynumber`)
pub fn protocol_by_number(number: i32) -> Option<String> {
    // SAFETY: the returned entry points into static storage and its name is
    // copied out before any further lookup.
    unsafe {
        let entry = libc::getprotobynumber(number);
        if entry.is_null() || (*entry).p_name.is_null() {
            None
        } else {
            Some(CStr::from_ptr((*entry).p_name).to_string_lossy().into_owned())
        }
    }
}

/// Port for a service name under a transport (`getservbyname`)
pub fn service_port(name: &str, transport: &str) -> Option<u16> {
    let cname = CString::new(name).ok()?;
    let cproto = CString::new(transport).ok()?;
    // SAFETY: both arguments are valid NUL-terminated strings; the entry is
    // read before any further lookup.
    unsafe {
        let entry = libc::getservbyname(cname.as_ptr(), cproto.as_ptr());
        if entry.is_null() {
            None
        } else {
            Some(u16::from_be((*entry).s_port as u16))
        }
    }
}

/// Host name for an address (`getnameinfo`)
///
/// With `numeric` set the result is the numeric form only.
pub fn name_info(addr: &SockAddr, numeric: bool) -> Option<String> {
    let mut host = [0 as libc::c_char; HOST_MAX];
    let flags = if numeric { libc::NI_NUMERICHOST } else { 0 };
    // SAFETY: addr points to a valid socket address of addr.len() bytes and
    // host is a writable buffer of HOST_MAX bytes.
    let rc = unsafe {
        libc::getnameinfo(
            addr.as_ptr(),
            addr.len(),
            host.as_mut_ptr(),
            HOST_MAX as libc::socklen_t,
            std::ptr::null_mut(),
            0,
            flags,
        )
    };
    if rc != 0 {
        return None;
    }
    // SAFETY: getnameinfo NUL-terminates host on success.
    let name = unsafe { CStr::from_ptr(host.as_ptr()) };
    Some(name.to_string_lossy().into_owned())
}

/// Filesystem path of a Unix-domain address, if it has one
pub fn local_path(addr: &SockAddr) -> Option<String> {
    if addr.family() != libc::AF_UNIX as libc::sa_family_t {
        return None;
    }
    let offset = std::mem::size_of::<libc::sa_family_t>();
    #[cfg(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    let offset = offset + 1;
    let len = addr.len() as usize;
    if len <= offset {
        return None;
    }
    // SAFETY: the address is AF_UNIX, so its storage holds a sockaddr_un.
    let un = unsafe { &*(addr.as_ptr() as *const libc::sockaddr_un) };
    let max = (len - offset).min(un.sun_path.len());
    let bytes: Vec<u8> = un.sun_path[..max]
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Read an integer socket option
pub fn get_int_option(fd: RawFd, level: libc::c_int, name: libc::c_int) -> io::Result<libc::c_int> {
    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: value and len are valid for writes of the sizes passed.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            level,
            name,
            (&mut value as *mut libc::c_int).cast::<libc::c_void>(),
            &mut len,
        )
    };
    if rc == 0 {
        Ok(value)
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Write an integer socket option
pub fn set_int_option(
    fd: RawFd,
    level: libc::c_int,
    name: libc::c_int,
    value: libc::c_int,
) -> io::Result<()> {
    // SAFETY: value is a valid c_int for the duration of the call.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            (&value as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Dissolve the association of a connectionless socket
///
/// Connects to an `AF_UNSPEC` address. Systems that report `EAFNOSUPPORT`
/// for this still dissolve the association, so that error is ignored.
pub fn disconnect(fd: RawFd) -> io::Result<()> {
    // SAFETY: an all-zero sockaddr is a valid value.
    let mut addr: libc::sockaddr = unsafe { std::mem::zeroed() };
    addr.sa_family = libc::AF_UNSPEC as libc::sa_family_t;
    // SAFETY: addr is a valid sockaddr of the size passed.
    let rc = unsafe {
        libc::connect(
            fd,
            &addr,
            std::mem::size_of::<libc::sockaddr>() as libc::socklen_t,
        )
    };
    if rc == 0 || Errno::last() == Errno::EAFNOSUPPORT {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Interface index for an interface name (`if_nametoindex`)
pub fn interface_index(name: &str) -> io::Result<u32> {
    nix::net::if_::if_nametoindex(name).map_err(io::Error::from)
}

/// Effective credentials of the peer of a connected Unix-domain socket
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn peer_credentials(fd: RawFd) -> Option<PeerCredentials> {
    let mut cred = libc::ucred {
        pid: 0,
        uid: 0,
        gid: 0,
    };
    let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;
    // SAFETY: cred and len are valid for writes of the sizes passed.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_PEERCRED,
            (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
            &mut len,
        )
    };
    if rc == 0 {
        Some(PeerCredentials {
            uid: i64::from(cred.uid),
            gid: i64::from(cred.gid),
        })
    } else {
        None
    }
}

/// Effective credentials of the peer of a connected Unix-domain socket
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
pub fn peer_credentials(fd: RawFd) -> Option<PeerCredentials> {
    let mut uid: libc::uid_t = 0;
    let mut gid: libc::gid_t = 0;
    // SAFETY: uid and gid are valid for writes.
    let rc = unsafe { libc::getpeereid(fd, &mut uid, &mut gid) };
    if rc == 0 {
        Some(PeerCredentials {
            uid: i64::from(uid),
            gid: i64::from(gid),
        })
    } else {
        None
    }
}

/// Effective credentials of the peer of a connected Unix-domain socket
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
)))]
pub fn peer_credentials(_fd: RawFd) -> Option<PeerCredentials> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_numeric_name_info() {
        let addr = SockAddr::from(SocketAddr::from((Ipv4Addr::new(127, 0, 0, 1), 80)));
        assert_eq!(name_info(&addr, true).as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_local_path() {
        let addr = SockAddr::unix("/tmp/cep-test.sock").unwrap();
        assert_eq!(local_path(&addr).as_deref(), Some("/tmp/cep-test.sock"));

        let inet = SockAddr::from(SocketAddr::from((Ipv4Addr::LOCALHOST, 1)));
        assert_eq!(local_path(&inet), None);
    }

    #[test]
    fn test_int_option_round_trip() {
        let (a, _b) = UnixStream::pair().unwrap();
        set_int_option(a.as_raw_fd(), libc::SOL_SOCKET, libc::SO_KEEPALIVE, 1).unwrap();
        assert_ne!(get_int_option(a.as_raw_fd(), libc::SOL_SOCKET, libc::SO_KEEPALIVE).unwrap(), 0);
    }

    #[test]
    fn test_unknown_service() {
        assert_eq!(service_port("no-such-service-cep", "tcp"), None);
    }

    #[test]
    fn test_unknown_protocol() {
        assert_eq!(protocol_by_name("no-such-protocol-cep"), None);
    }

    #[test]
    fn test_peer_credentials_of_pair() {
        let (a, _b) = UnixStream::pair().unwrap();
        if let Some(creds) = peer_credentials(a.as_raw_fd()) {
            assert_eq!(creds.uid, i64::from(unsafe { libc::geteuid() }));
        }
    }

    #[test]
    fn test_interface_index_unknown() {
        assert!(interface_index("no-such-if0").is_err());
    }
}
