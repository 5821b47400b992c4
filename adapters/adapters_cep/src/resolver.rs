//! Address Resolver Module
//!
//! Provides conversion from host/port/domain triples to binary socket
//! addresses, and the reverse formatting used when reporting addresses.
//!
//! ## Resolution order
//!
//! 1. Local domain: the host is a filesystem path and is used verbatim.
//! 2. No host: the wildcard address of the family.
//! 3. Numeric parse of the host.
//! 4. If `resolve` is enabled, a name lookup restricted to the family.
//!
//! Anything else fails with [`CepError::AddressResolution`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};

use entities_endpoint::{check_port, CepDomain, CepError, CepType};
use socket2::SockAddr;

use crate::sys;

/// Address as reported by the `peername` and `sockname` options and by
/// dispatch callbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedAddress {
    /// Numeric host, or the path for Local addresses
    pub numeric: String,
    /// Reverse-resolved name when resolution is on, otherwise the numeric host
    pub name: String,
    /// Port, or the address length for Local addresses
    pub port: i64,
}

impl FormattedAddress {
    /// Address of an endpoint that has none
    pub fn absent() -> Self {
        Self {
            numeric: String::new(),
            name: String::new(),
            port: -1,
        }
    }

    /// The `{numeric name port}` element list
    pub fn elements(&self) -> Vec<String> {
        vec![self.numeric.clone(), self.name.clone(), self.port.to_string()]
    }
}

/// Build a socket address
///
/// # Arguments
///
/// * `domain` - Address family to produce
/// * `host` - Host name, numeric address, or path (Local); `None` means the wildcard
/// * `port` - Port (ignored for Local)
/// * `resolve` - Whether non-numeric hosts may be looked up
///
/// # Returns
///
/// * `Ok(SockAddr)` - Address of the requested family
/// * `Err(CepError::AddressResolution)` - Missing path or unresolvable host
pub fn create_address(
    domain: CepDomain,
    host: Option<&str>,
    port: u16,
    resolve: bool,
) -> Result<SockAddr, CepError> {
    match domain {
        CepDomain::Local => {
            let path = host.ok_or_else(|| {
                CepError::AddressResolution("local endpoints need a path".to_string())
            })?;
            SockAddr::unix(path).map_err(|e| {
                CepError::AddressResolution(format!("bad local path \"{}\": {}", path, e))
            })
        }
        CepDomain::Inet | CepDomain::Inet6 => {
            let ip = match host {
                None => wildcard(domain),
                Some(name) => name_to_ip(domain, name, resolve)?,
            };
            Ok(SockAddr::from(SocketAddr::new(ip, port)))
        }
    }
}

fn wildcard(domain: CepDomain) -> IpAddr {
    match domain {
        CepDomain::Inet6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    }
}

/// Resolve a host to an IP address of the domain's family
///
/// # Arguments
///
/// * `domain` - Inet or Inet6
/// * `host` - Numeric address or host name
/// * `resolve` - Whether a name lookup may be attempted
pub fn name_to_ip(domain: CepDomain, host: &str, resolve: bool) -> Result<IpAddr, CepError> {
    let numeric = match domain {
        CepDomain::Inet => host.parse::<Ipv4Addr>().ok().map(IpAddr::V4),
        CepDomain::Inet6 => host.parse::<Ipv6Addr>().ok().map(IpAddr::V6),
        CepDomain::Local => None,
    };
    if let Some(ip) = numeric {
        return Ok(ip);
    }
    if resolve && domain.is_network() {
        let found = (host, 0u16).to_socket_addrs().ok().and_then(|mut addrs| {
            addrs.find(|addr| match domain {
                CepDomain::Inet => addr.is_ipv4(),
                _ => addr.is_ipv6(),
            })
        });
        if let Some(addr) = found {
            return Ok(addr.ip());
        }
    }
    Err(CepError::AddressResolution(format!(
        "couldn't resolve \"{}\": host is unreachable",
        host
    )))
}

/// Parse a port argument
///
/// Decimal integers are range-checked; anything else is looked up as a
/// service name under the transport matching `cep_type`.
///
/// # Arguments
///
/// * `value` - Port number or service name
/// * `cep_type` - Selects `"tcp"` (Stream) or `"udp"` for service lookups
pub fn parse_port(value: &str, cep_type: CepType) -> Result<u16, CepError> {
    let trimmed = value.trim();
    if let Ok(number) = trimmed.parse::<i64>() {
        return check_port(number);
    }
    let transport = cep_type.service_transport();
    sys::service_port(trimmed, transport).ok_or_else(|| {
        CepError::AddressResolution(format!(
            "unknown service \"{}\" for {}",
            value, transport
        ))
    })
}

/// Resolve a protocol argument to its number
///
/// Empty and `"default"` mean 0; decimal integers are used as given; other
/// names are looked up in the protocol database.
pub fn resolve_protocol(protocol: &str) -> Result<i32, CepError> {
    let trimmed = protocol.trim();
    if trimmed.is_empty() || trimmed == "default" {
        return Ok(0);
    }
    if let Ok(number) = trimmed.parse::<i32>() {
        if number < 0 {
            return Err(CepError::Argument(format!("bad protocol \"{}\"", protocol)));
        }
        return Ok(number);
    }
    sys::protocol_by_name(trimmed)
        .ok_or_else(|| CepError::Argument(format!("unknown protocol \"{}\"", protocol)))
}

/// Name of a protocol number for reporting
///
/// 0 is `"default"`; numbers without a database entry are reported as-is.
pub fn protocol_name(protocol: i32) -> String {
    if protocol == 0 {
        return "default".to_string();
    }
    sys::protocol_by_number(protocol).unwrap_or_else(|| protocol.to_string())
}

/// Format a socket address for reporting
///
/// # Arguments
///
/// * `addr` - Address to format
/// * `resolve` - Reverse-resolve the host for the `name` element
pub fn format_address(addr: &SockAddr, resolve: bool) -> FormattedAddress {
    if addr.family() == libc::AF_UNIX as libc::sa_family_t {
        let path = sys::local_path(addr).unwrap_or_default();
        return FormattedAddress {
            numeric: path.clone(),
            name: path,
            port: i64::from(addr.len()),
        };
    }
    match addr.as_socket() {
        Some(socket_addr) => {
            let numeric = sys::name_info(addr, true)
                .unwrap_or_else(|| socket_addr.ip().to_string());
            let name = if resolve {
                sys::name_info(addr, false).unwrap_or_else(|| "?".to_string())
            } else {
                numeric.clone()
            };
            FormattedAddress {
                numeric,
                name,
                port: i64::from(socket_addr.port()),
            }
        }
        None => FormattedAddress {
            numeric: "?".to_string(),
            name: "?".to_string(),
            port: -1,
        },
    }
}

/// Format the sender or peer of a dispatch event as `(address, port)`
///
/// Network addresses report the numeric host (`"?"` when it cannot be
/// formatted) and the port; Local addresses report the path and port `-1`.
pub fn format_peer(addr: &SockAddr) -> (String, i32) {
    if addr.family() == libc::AF_UNIX as libc::sa_family_t {
        return (sys::local_path(addr).unwrap_or_default(), -1);
    }
    let host = sys::name_info(addr, true).unwrap_or_else(|| "?".to_string());
    let port = addr.as_socket().map(|a| i32::from(a.port())).unwrap_or(-1);
    (host, port)
}
