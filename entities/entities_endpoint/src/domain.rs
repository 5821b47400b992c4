//! Domain and Type Module
//!
//! Provides the logical address families and transport shapes an endpoint can
//! be created with, together with their canonical string names.
//!
//! The canonical names are exact: `"local"`, `"inet"`, `"inet6"` for domains
//! and `"stream"`, `"datagram"`, `"raw"` for types. Parsing never accepts
//! abbreviations.

use std::fmt;
use std::str::FromStr;

use crate::error::CepError;

/// Address family of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CepDomain {
    /// Unix-domain socket addressed by a filesystem path
    Local,
    /// IPv4
    Inet,
    /// IPv6
    Inet6,
}

impl CepDomain {
    /// All domains, in declaration order
    pub const ALL: [CepDomain; 3] = [CepDomain::Local, CepDomain::Inet, CepDomain::Inet6];

    /// Canonical name of the domain
    pub fn name(&self) -> &'static str {
        match self {
            CepDomain::Local => "local",
            CepDomain::Inet => "inet",
            CepDomain::Inet6 => "inet6",
        }
    }

    /// Whether the domain carries network addresses (Inet or Inet6)
    pub fn is_network(&self) -> bool {
        !matches!(self, CepDomain::Local)
    }
}

impl fmt::Display for CepDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CepDomain {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(CepDomain::Local),
            "inet" => Ok(CepDomain::Inet),
            "inet6" => Ok(CepDomain::Inet6),
            _ => Err(CepError::Argument(format!(
                "bad domain \"{}\": must be inet, inet6, or local",
                s
            ))),
        }
    }
}

/// Transport shape of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CepType {
    /// Connection-oriented byte stream
    Stream,
    /// Connectionless messages
    Datagram,
    /// Direct protocol access
    Raw,
}

impl CepType {
    /// All types, in declaration order
    pub const ALL: [CepType; 3] = [CepType::Stream, CepType::Datagram, CepType::Raw];

    /// Canonical name of the type
    pub fn name(&self) -> &'static str {
        match self {
            CepType::Stream => "stream",
            CepType::Datagram => "datagram",
            CepType::Raw => "raw",
        }
    }

    /// Transport name used for service-name port lookups
    ///
    /// Stream endpoints look services up under `"tcp"`, everything else under
    /// `"udp"`.
    pub fn service_transport(&self) -> &'static str {
        match self {
            CepType::Stream => "tcp",
            CepType::Datagram | CepType::Raw => "udp",
        }
    }
}

impl fmt::Display for CepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CepType {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream" => Ok(CepType::Stream),
            "datagram" => Ok(CepType::Datagram),
            "raw" => Ok(CepType::Raw),
            _ => Err(CepError::Argument(format!(
                "bad type \"{}\": must be datagram, raw, or stream",
                s
            ))),
        }
    }
}

/// Validate a numeric port
///
/// # Arguments
///
/// * `port` - Candidate port number
///
/// # Returns
///
/// * `Ok(u16)` - The port, when it lies in 0..=65535
/// * `Err(CepError::AddressResolution)` - Negative or too large
pub fn check_port(port: i64) -> Result<u16, CepError> {
    if port > 0xFFFF {
        return Err(CepError::AddressResolution(format!(
            "port number too high: {}",
            port
        )));
    }
    u16::try_from(port).map_err(|_| {
        CepError::AddressResolution(format!("port number out of range: {}", port))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_domain_names_round_trip() {
        for domain in CepDomain::ALL {
            assert_eq!(domain.name().parse::<CepDomain>().unwrap(), domain);
        }
    }

    #[test]
    fn test_type_names_round_trip() {
        for ty in CepType::ALL {
            assert_eq!(ty.name().parse::<CepType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_domain_parse_is_exact() {
        assert!("ine".parse::<CepDomain>().is_err());
        assert!("INET".parse::<CepDomain>().is_err());
        assert!("unix".parse::<CepDomain>().is_err());
    }

    #[test]
    fn test_type_parse_is_exact() {
        assert!("dgram".parse::<CepType>().is_err());
        assert!("str".parse::<CepType>().is_err());
    }

    #[test]
    fn test_service_transport() {
        assert_eq!(CepType::Stream.service_transport(), "tcp");
        assert_eq!(CepType::Datagram.service_transport(), "udp");
        assert_eq!(CepType::Raw.service_transport(), "udp");
    }

    #[test]
    fn test_is_network() {
        assert!(!CepDomain::Local.is_network());
        assert!(CepDomain::Inet.is_network());
        assert!(CepDomain::Inet6.is_network());
    }

    #[test]
    fn test_check_port_boundaries() {
        assert_eq!(check_port(0).unwrap(), 0);
        assert_eq!(check_port(65535).unwrap(), 65535);
        assert!(check_port(65536).is_err());
        assert!(check_port(-1).is_err());
    }

    proptest! {
        #[test]
        fn prop_ports_in_range_accepted(port in 0i64..=65535) {
            prop_assert_eq!(check_port(port).unwrap() as i64, port);
        }

        #[test]
        fn prop_ports_above_range_rejected(port in 65536i64..=i64::from(u32::MAX)) {
            prop_assert!(check_port(port).is_err());
        }
    }
}
