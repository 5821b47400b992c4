//! Domain/Type Translation Module
//!
//! Maps the engine's logical domains and types onto the operating system's
//! address-family and socket-type constants, and families back to domains.

use entities_endpoint::{CepDomain, CepType};
use socket2::{Domain, Type};

/// OS address family for a domain
pub fn to_sys_domain(domain: CepDomain) -> Domain {
    match domain {
        CepDomain::Local => Domain::UNIX,
        CepDomain::Inet => Domain::IPV4,
        CepDomain::Inet6 => Domain::IPV6,
    }
}

/// Domain for an OS address family, if it is one the engine handles
pub fn from_sys_family(family: libc::c_int) -> Option<CepDomain> {
    match family {
        libc::AF_UNIX => Some(CepDomain::Local),
        libc::AF_INET => Some(CepDomain::Inet),
        libc::AF_INET6 => Some(CepDomain::Inet6),
        _ => None,
    }
}

/// OS socket type for a type
pub fn to_sys_type(cep_type: CepType) -> Type {
    match cep_type {
        CepType::Stream => Type::STREAM,
        CepType::Datagram => Type::DGRAM,
        CepType::Raw => Type::RAW,
    }
}
