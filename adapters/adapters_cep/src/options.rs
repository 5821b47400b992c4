//! Option Subsystem Module
//!
//! Provides get and set of the named option vocabulary on an [`Endpoint`].
//!
//! ## Overview
//!
//! Names are matched by [`OptionName::lookup_settable`] and
//! [`OptionName::lookup_gettable`] (exact name first, then a unique prefix, a
//! leading `-` allowed). Values are list strings as understood by
//! [`split_list`]. Every option checks the endpoint's domain and type before
//! any socket option call:
//!
//! - multicast, TTL and broadcast options do not apply to Local endpoints;
//!   setting them fails, getting them reports a neutral value
//! - `header` only applies to Raw Inet endpoints and is silently accepted
//!   elsewhere
//! - `peereid` is only queried for Local endpoints
//!
//! ## See Also
//!
//! - [`resolver`](crate::resolver): Address formatting for `peername` and `sockname`

use std::net::{IpAddr, Ipv4Addr, Shutdown};
use std::time::Duration;

use entities_endpoint::{
    check_port, parse_bool, parse_int, split_list, CepDomain, CepError, CepType, OptionName,
    OptionValue, PeerCredentials, ShutdownHalves,
};

use crate::endpoint::Endpoint;
use crate::resolver::{create_address, format_address, name_to_ip, protocol_name};
use crate::sys;

const SHUTDOWN_USAGE: &str = "should be read write {read write} {write read} or {}";
const MEMBERSHIP_USAGE: &str = "should be addr, addr interface or {}";
const PEERNAME_USAGE: &str = "should be addr port or \"{} -1\" to disassociate";

impl Endpoint {
    /// Get one option
    ///
    /// # Arguments
    ///
    /// * `name` - Option name or unique prefix, with or without a leading `-`
    ///
    /// # Returns
    ///
    /// * `Ok(OptionValue)` - Current value
    /// * `Err(CepError::BadOption)` - Unknown, ambiguous or write-only name
    /// * `Err(CepError::Os)` - The socket option could not be read
    pub fn get_option(&self, name: &str) -> Result<OptionValue, CepError> {
        let option = OptionName::lookup_gettable(name)?;
        self.option_value(option, false)
    }

    /// Get every option, in reporting order
    ///
    /// `error` is not included; it must be asked for by name.
    pub fn get_all_options(&self) -> Result<Vec<(OptionName, OptionValue)>, CepError> {
        OptionName::GET_ALL
            .iter()
            .map(|option| Ok((*option, self.option_value(*option, true)?)))
            .collect()
    }

    /// Set one option
    ///
    /// # Arguments
    ///
    /// * `name` - Option name or unique prefix, with or without a leading `-`
    /// * `value` - Option value in list syntax
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), CepError> {
        let option = OptionName::lookup_settable(name)?;
        if self.domain == CepDomain::Local && network_only(option) {
            return Err(CepError::Protocol(format!(
                "can't set {}: not supported for local endpoints",
                option
            )));
        }
        match option {
            OptionName::Broadcast => {
                let on = parse_bool(value)?;
                self.socket
                    .set_broadcast(on)
                    .map_err(|e| CepError::os("can't set broadcast", e))
            }
            OptionName::Hops => self.set_hops(parse_int(value)?),
            OptionName::Shutdown => self.set_shutdown(value),
            OptionName::Join => self.set_membership(value, true),
            OptionName::Leave => self.set_membership(value, false),
            OptionName::Loop => {
                let on = parse_bool(value)?;
                let result = if self.domain == CepDomain::Inet6 {
                    self.socket.set_multicast_loop_v6(on)
                } else {
                    self.socket.set_multicast_loop_v4(on)
                };
                result.map_err(|e| CepError::os("can't set loop", e))
            }
            OptionName::Mhops => self.set_multicast_hops(parse_int(value)?),
            OptionName::Maddr => self.set_multicast_interface(value),
            OptionName::Resolve => {
                self.flags.resolve_names = parse_bool(value)?;
                Ok(())
            }
            OptionName::Header => {
                if self.cep_type != CepType::Raw || self.domain != CepDomain::Inet {
                    return Ok(());
                }
                let on = parse_bool(value)?;
                sys::set_int_option(
                    self.descriptor(),
                    libc::IPPROTO_IP,
                    libc::IP_HDRINCL,
                    on.into(),
                )
                .map_err(|e| CepError::os("can't set header", e))
            }
            OptionName::Route => {
                let route = parse_bool(value)?;
                sys::set_int_option(
                    self.descriptor(),
                    libc::SOL_SOCKET,
                    libc::SO_DONTROUTE,
                    (!route).into(),
                )
                .map_err(|e| CepError::os("can't set route", e))
            }
            OptionName::SendTimeout => {
                let timeout = parse_timeout(option, value)?;
                self.socket
                    .set_write_timeout(timeout)
                    .map_err(|e| CepError::os("can't set sendtimeout", e))
            }
            OptionName::ReceiveTimeout => {
                let timeout = parse_timeout(option, value)?;
                self.socket
                    .set_read_timeout(timeout)
                    .map_err(|e| CepError::os("can't set receivetimeout", e))
            }
            OptionName::Peername => self.set_peername(value),
            OptionName::Domain
            | OptionName::Error
            | OptionName::Peereid
            | OptionName::Protocol
            | OptionName::Sockname
            | OptionName::Type => Err(CepError::Protocol(format!(
                "option {} is read-only",
                option
            ))),
        }
    }

    fn option_value(&self, option: OptionName, all: bool) -> Result<OptionValue, CepError> {
        let network = self.domain.is_network();
        let value = match option {
            OptionName::Peername => match self.socket.peer_addr() {
                Ok(addr) => {
                    OptionValue::List(format_address(&addr, self.flags.resolve_names).elements())
                }
                Err(e)
                    if all
                        || (e.raw_os_error() == Some(libc::ENOTCONN)
                            && self.cep_type != CepType::Stream) =>
                {
                    OptionValue::no_address()
                }
                Err(e) => return Err(CepError::os("can't get peername", e)),
            },
            OptionName::Sockname => {
                let addr = self
                    .socket
                    .local_addr()
                    .map_err(|e| CepError::os("can't get sockname", e))?;
                OptionValue::List(format_address(&addr, self.flags.resolve_names).elements())
            }
            OptionName::Hops => OptionValue::Int(match self.domain {
                CepDomain::Local => 0,
                CepDomain::Inet => self
                    .socket
                    .ttl()
                    .map(i64::from)
                    .map_err(|e| CepError::os("can't get hops", e))?,
                CepDomain::Inet6 => sys::get_int_option(
                    self.descriptor(),
                    libc::IPPROTO_IPV6,
                    libc::IPV6_UNICAST_HOPS,
                )
                .map(i64::from)
                .map_err(|e| CepError::os("can't get hops", e))?,
            }),
            OptionName::Broadcast => OptionValue::Bool(
                network
                    && self
                        .socket
                        .broadcast()
                        .map_err(|e| CepError::os("can't get broadcast", e))?,
            ),
            OptionName::Domain => OptionValue::Text(self.domain.name().to_string()),
            OptionName::Type => OptionValue::Text(self.cep_type.name().to_string()),
            OptionName::Join | OptionName::Leave => OptionValue::Text(String::new()),
            OptionName::Shutdown => OptionValue::List(self.flags.shutdown.names()),
            OptionName::Loop => OptionValue::Bool(match self.domain {
                CepDomain::Local => false,
                CepDomain::Inet => self
                    .socket
                    .multicast_loop_v4()
                    .map_err(|e| CepError::os("can't get loop", e))?,
                CepDomain::Inet6 => self
                    .socket
                    .multicast_loop_v6()
                    .map_err(|e| CepError::os("can't get loop", e))?,
            }),
            OptionName::Mhops => OptionValue::Int(match self.domain {
                CepDomain::Local => 0,
                CepDomain::Inet => self
                    .socket
                    .multicast_ttl_v4()
                    .map(i64::from)
                    .map_err(|e| CepError::os("can't get mhops", e))?,
                CepDomain::Inet6 => sys::get_int_option(
                    self.descriptor(),
                    libc::IPPROTO_IPV6,
                    libc::IPV6_MULTICAST_HOPS,
                )
                .map(i64::from)
                .map_err(|e| CepError::os("can't get mhops", e))?,
            }),
            OptionName::Maddr => OptionValue::Text(self.multicast_interface()?),
            OptionName::Protocol => OptionValue::Text(protocol_name(self.protocol)),
            OptionName::Resolve => OptionValue::Bool(self.flags.resolve_names),
            OptionName::Header => {
                let on = if self.cep_type == CepType::Raw && self.domain == CepDomain::Inet {
                    sys::get_int_option(self.descriptor(), libc::IPPROTO_IP, libc::IP_HDRINCL)
                        .map_err(|e| CepError::os("can't get header", e))?
                        != 0
                } else {
                    false
                };
                OptionValue::Bool(on)
            }
            OptionName::Route => {
                let dont_route =
                    sys::get_int_option(self.descriptor(), libc::SOL_SOCKET, libc::SO_DONTROUTE)
                        .map_err(|e| CepError::os("can't get route", e))?;
                OptionValue::Bool(dont_route == 0)
            }
            OptionName::SendTimeout => timeout_value(
                self.socket
                    .write_timeout()
                    .map_err(|e| CepError::os("can't get sendtimeout", e))?,
            ),
            OptionName::ReceiveTimeout => timeout_value(
                self.socket
                    .read_timeout()
                    .map_err(|e| CepError::os("can't get receivetimeout", e))?,
            ),
            OptionName::Peereid => {
                let credentials = if self.domain == CepDomain::Local {
                    sys::peer_credentials(self.descriptor()).unwrap_or(PeerCredentials::UNKNOWN)
                } else {
                    PeerCredentials::UNKNOWN
                };
                OptionValue::List(vec![credentials.uid.to_string(), credentials.gid.to_string()])
            }
            OptionName::Error => match self.socket.take_error() {
                Ok(None) => OptionValue::Text(String::new()),
                Ok(Some(e)) => OptionValue::Text(e.to_string()),
                Err(e) => return Err(CepError::os("can't get error", e)),
            },
        };
        Ok(value)
    }

    fn set_hops(&self, hops: i64) -> Result<(), CepError> {
        match self.domain {
            CepDomain::Inet => {
                let ttl = u32::try_from(hops)
                    .ok()
                    .filter(|ttl| *ttl <= 255)
                    .ok_or_else(|| {
                        CepError::Protocol("can't set hops: invalid argument".to_string())
                    })?;
                self.socket
                    .set_ttl(ttl)
                    .map_err(|e| CepError::os("can't set hops", e))
            }
            _ => {
                let hops = libc::c_int::try_from(hops)
                    .map_err(|_| {
                        CepError::Protocol("can't set hops: invalid argument".to_string())
                    })?;
                sys::set_int_option(
                    self.descriptor(),
                    libc::IPPROTO_IPV6,
                    libc::IPV6_UNICAST_HOPS,
                    hops,
                )
                .map_err(|e| CepError::os("can't set hops", e))
            }
        }
    }

    fn set_multicast_hops(&self, hops: i64) -> Result<(), CepError> {
        let invalid = || CepError::Protocol("can't set mhops: invalid argument".to_string());
        match self.domain {
            CepDomain::Inet => {
                let ttl = u32::try_from(hops).ok().filter(|ttl| *ttl <= 255).ok_or_else(invalid)?;
                self.socket
                    .set_multicast_ttl_v4(ttl)
                    .map_err(|e| CepError::os("can't set mhops", e))
            }
            _ => {
                let hops = libc::c_int::try_from(hops).map_err(|_| invalid())?;
                sys::set_int_option(
                    self.descriptor(),
                    libc::IPPROTO_IPV6,
                    libc::IPV6_MULTICAST_HOPS,
                    hops,
                )
                .map_err(|e| CepError::os("can't set mhops", e))
            }
        }
    }

    fn set_shutdown(&mut self, value: &str) -> Result<(), CepError> {
        let items = split_list(value)?;
        if items.is_empty() {
            return Ok(());
        }
        if items.len() > 2 {
            return Err(CepError::Protocol(SHUTDOWN_USAGE.to_string()));
        }
        let mut halves = ShutdownHalves::NONE;
        for item in &items {
            match item.as_str() {
                "read" => halves.read = true,
                "write" => halves.write = true,
                _ => return Err(CepError::Protocol(SHUTDOWN_USAGE.to_string())),
            }
        }
        let how = match (halves.read, halves.write) {
            (true, true) => Shutdown::Both,
            (true, false) => Shutdown::Read,
            _ => Shutdown::Write,
        };
        self.socket
            .shutdown(how)
            .map_err(|e| CepError::os("can't shutdown", e))?;
        self.flags.shutdown.merge(halves);
        Ok(())
    }

    fn set_membership(&self, value: &str, join: bool) -> Result<(), CepError> {
        let context = if join {
            "can't join group"
        } else {
            "can't leave group"
        };
        let items = split_list(value)?;
        if items.is_empty() {
            return Ok(());
        }
        if items.len() > 2 {
            return Err(CepError::Protocol(MEMBERSHIP_USAGE.to_string()));
        }
        let resolve = self.flags.resolve_names;
        let lookup = |host: &str| {
            name_to_ip(self.domain, host, resolve)
                .map_err(|e| CepError::AddressResolution(format!("{}: {}", context, e)))
        };
        let result = match lookup(&items[0])? {
            IpAddr::V4(group) => {
                let interface = match items.get(1) {
                    Some(name) => match lookup(name)? {
                        IpAddr::V4(addr) => addr,
                        IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
                    },
                    None => Ipv4Addr::UNSPECIFIED,
                };
                if join {
                    self.socket.join_multicast_v4(&group, &interface)
                } else {
                    self.socket.leave_multicast_v4(&group, &interface)
                }
            }
            IpAddr::V6(group) => {
                let interface = match items.get(1) {
                    Some(name) => {
                        sys::interface_index(name).map_err(|e| CepError::os(context, e))?
                    }
                    None => 0,
                };
                if join {
                    self.socket.join_multicast_v6(&group, interface)
                } else {
                    self.socket.leave_multicast_v6(&group, interface)
                }
            }
        };
        result.map_err(|e| CepError::os(context, e))
    }

    fn set_multicast_interface(&self, value: &str) -> Result<(), CepError> {
        let value = value.trim();
        match self.domain {
            CepDomain::Inet6 => {
                let index = match value.parse::<u32>() {
                    Ok(index) => index,
                    Err(_) => sys::interface_index(value)
                        .map_err(|e| CepError::os("can't set maddr", e))?,
                };
                self.socket
                    .set_multicast_if_v6(index)
                    .map_err(|e| CepError::os("can't set maddr", e))
            }
            _ => {
                let addr = match name_to_ip(self.domain, value, self.flags.resolve_names) {
                    Ok(IpAddr::V4(addr)) => addr,
                    Ok(IpAddr::V6(_)) | Err(_) => {
                        return Err(CepError::AddressResolution(format!(
                            "can't set maddr: couldn't resolve \"{}\"",
                            value
                        )))
                    }
                };
                self.socket
                    .set_multicast_if_v4(&addr)
                    .map_err(|e| CepError::os("can't set maddr", e))
            }
        }
    }

    fn multicast_interface(&self) -> Result<String, CepError> {
        let name = match self.domain {
            CepDomain::Local => None,
            CepDomain::Inet => {
                let addr = self
                    .socket
                    .multicast_if_v4()
                    .map_err(|e| CepError::os("can't get maddr", e))?;
                (!addr.is_unspecified()).then(|| addr.to_string())
            }
            CepDomain::Inet6 => {
                let index = self
                    .socket
                    .multicast_if_v6()
                    .map_err(|e| CepError::os("can't get maddr", e))?;
                (index != 0).then(|| index.to_string())
            }
        };
        Ok(name.unwrap_or_else(|| "*".to_string()))
    }

    fn set_peername(&self, value: &str) -> Result<(), CepError> {
        let items = split_list(value)?;
        if items.len() != 2 {
            return Err(CepError::Protocol(PEERNAME_USAGE.to_string()));
        }
        let port = parse_int(&items[1])?;
        if port == -1 && items[0].is_empty() {
            return sys::disconnect(self.descriptor())
                .map_err(|e| CepError::os("can't set peername", e));
        }
        let port = check_port(port)?;
        let host = Some(items[0].as_str()).filter(|h| !h.is_empty());
        let addr = create_address(self.domain, host, port, self.flags.resolve_names)?;
        match self.socket.connect(&addr) {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(libc::EAFNOSUPPORT) => Ok(()),
            Err(e) => Err(CepError::os("can't set peername", e)),
        }
    }
}

fn network_only(option: OptionName) -> bool {
    matches!(
        option,
        OptionName::Broadcast
            | OptionName::Hops
            | OptionName::Join
            | OptionName::Leave
            | OptionName::Loop
            | OptionName::Mhops
            | OptionName::Maddr
    )
}

fn parse_timeout(option: OptionName, value: &str) -> Result<Option<Duration>, CepError> {
    let seconds = parse_int(value)?;
    let seconds = u64::try_from(seconds)
        .map_err(|_| CepError::Protocol(format!("can't set {}: invalid argument", option)))?;
    Ok((seconds > 0).then(|| Duration::from_secs(seconds)))
}

fn timeout_value(timeout: Option<Duration>) -> OptionValue {
    let timeout = timeout.unwrap_or(Duration::ZERO);
    OptionValue::List(vec![
        timeout.as_secs().to_string(),
        timeout.subsec_micros().to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{create_client, EndpointRequest};
    use crate::pair::create_pair;
    use entities_endpoint::{format_option_list, EngineConfig, ErrorKind};
    use std::net::UdpSocket;

    fn udp_client() -> Endpoint {
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Datagram);
        create_client(&request, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_boolean_round_trips() {
        let mut endpoint = udp_client();
        for name in ["broadcast", "resolve", "loop", "route"] {
            endpoint.set_option(name, "1").unwrap();
            assert_eq!(endpoint.get_option(name).unwrap().to_string(), "1", "{}", name);
            endpoint.set_option(name, "0").unwrap();
            assert_eq!(endpoint.get_option(name).unwrap().to_string(), "0", "{}", name);
        }
    }

    #[test]
    fn test_prefix_and_dash() {
        let mut endpoint = udp_client();
        endpoint.set_option("-b", "yes").unwrap();
        assert_eq!(endpoint.get_option("-broad").unwrap(), OptionValue::Bool(true));
    }

    #[test]
    fn test_unknown_option_lists_names() {
        let mut endpoint = udp_client();
        let err = endpoint.set_option("bogus", "1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains(
            "broadcast header hops join leave loop maddr mhops peername \
             receivetimeout resolve route sendtimeout shutdown"
        ));
        assert!(endpoint.get_option("join").is_err());
    }

    #[test]
    fn test_hops_range() {
        let mut endpoint = udp_client();
        endpoint.set_option("hops", "17").unwrap();
        assert_eq!(endpoint.get_option("hops").unwrap(), OptionValue::Int(17));
        let err = endpoint.set_option("hops", "256").unwrap_err();
        assert_eq!(err.to_string(), "can't set hops: invalid argument");
    }

    #[test]
    fn test_mhops_uses_given_value() {
        let mut endpoint = udp_client();
        endpoint.set_option("mhops", "9").unwrap();
        assert_eq!(endpoint.get_option("mhops").unwrap(), OptionValue::Int(9));
    }

    #[test]
    fn test_shutdown_records_halves() {
        let (mut a, _b) = create_pair(CepDomain::Local, CepType::Stream, "").unwrap();
        assert_eq!(a.get_option("shutdown").unwrap(), OptionValue::List(vec![]));
        a.set_option("shutdown", "{}").unwrap();
        a.set_option("shutdown", "write").unwrap();
        assert_eq!(a.get_option("shutdown").unwrap().to_string(), "write");
        a.set_option("shutdown", "read").unwrap();
        assert_eq!(a.get_option("shutdown").unwrap().to_string(), "read write");

        let err = a.set_option("shutdown", "sideways").unwrap_err();
        assert_eq!(err.to_string(), SHUTDOWN_USAGE);
        assert!(a.set_option("shutdown", "read write read").is_err());
    }

    #[test]
    fn test_local_rejects_network_options() {
        let (mut a, _b) = create_pair(CepDomain::Local, CepType::Stream, "").unwrap();
        for name in ["broadcast", "hops", "loop", "mhops", "maddr", "join", "leave"] {
            let err = a.set_option(name, "1").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Protocol, "{}", name);
        }
        assert_eq!(a.get_option("hops").unwrap(), OptionValue::Int(0));
        assert_eq!(a.get_option("maddr").unwrap(), OptionValue::Text("*".to_string()));
        assert_eq!(a.get_option("broadcast").unwrap(), OptionValue::Bool(false));
    }

    #[test]
    fn test_header_is_noop_off_raw_inet() {
        let mut endpoint = udp_client();
        endpoint.set_option("header", "not-a-boolean").unwrap();
        assert_eq!(endpoint.get_option("header").unwrap(), OptionValue::Bool(false));
    }

    #[test]
    fn test_read_only_names() {
        let endpoint = udp_client();
        assert_eq!(endpoint.get_option("domain").unwrap().to_string(), "inet");
        assert_eq!(endpoint.get_option("type").unwrap().to_string(), "datagram");
        assert_eq!(endpoint.get_option("protocol").unwrap().to_string(), "default");
        assert_eq!(endpoint.get_option("error").unwrap().to_string(), "");
        assert_eq!(endpoint.get_option("peereid").unwrap().to_string(), "-1 -1");
    }

    #[test]
    fn test_peername_connect_and_disassociate() {
        let target = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = target.local_addr().unwrap().port();
        let mut endpoint = udp_client();
        endpoint.set_option("resolve", "0").unwrap();
        assert_eq!(endpoint.get_option("peername").unwrap(), OptionValue::no_address());

        endpoint
            .set_option("peername", &format!("127.0.0.1 {}", port))
            .unwrap();
        let peer = endpoint.get_option("peername").unwrap().elements();
        assert_eq!(peer, vec!["127.0.0.1".to_string(), "127.0.0.1".to_string(), port.to_string()]);

        endpoint.set_option("peername", "{} -1").unwrap();
        assert_eq!(endpoint.get_option("peername").unwrap(), OptionValue::no_address());

        let err = endpoint.set_option("peername", "127.0.0.1").unwrap_err();
        assert_eq!(err.to_string(), PEERNAME_USAGE);
    }

    #[test]
    fn test_timeouts() {
        let mut endpoint = udp_client();
        assert_eq!(endpoint.get_option("sendtimeout").unwrap().to_string(), "0 0");
        endpoint.set_option("sendtimeout", "3").unwrap();
        assert_eq!(endpoint.get_option("sendtimeout").unwrap().to_string(), "3 0");
        endpoint.set_option("receivetimeout", "2").unwrap();
        assert_eq!(endpoint.get_option("receivetimeout").unwrap().to_string(), "2 0");
        endpoint.set_option("receivetimeout", "0").unwrap();
        assert_eq!(endpoint.get_option("receivetimeout").unwrap().to_string(), "0 0");
        assert!(endpoint.set_option("sendtimeout", "-1").is_err());
    }

    #[test]
    fn test_get_all_order() {
        let endpoint = udp_client();
        let all = endpoint.get_all_options().unwrap();
        let names: Vec<OptionName> = all.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, OptionName::GET_ALL.to_vec());
        let rendered = format_option_list(&all);
        assert!(rendered.starts_with("-peername {{} {} -1} -sockname"));
        assert!(rendered.contains("-join {} -leave {}"));
        assert!(!rendered.contains("-error"));
    }

    #[test]
    fn test_get_all_on_unconnected_stream() {
        let request = EndpointRequest::new(CepDomain::Inet, CepType::Stream)
            .host("127.0.0.1")
            .port(0);
        let server = crate::factory::create(
            &request,
            entities_endpoint::Role::Server,
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(server.get_option("peername").is_err());
        assert!(server.get_all_options().is_ok());
    }

    #[test]
    fn test_multicast_membership_and_interface() {
        let mut endpoint = udp_client();
        endpoint.set_option("resolve", "0").unwrap();
        assert_eq!(endpoint.get_option("maddr").unwrap().to_string(), "*");

        endpoint.set_option("join", "224.0.0.251 127.0.0.1").unwrap();
        endpoint.set_option("maddr", "127.0.0.1").unwrap();
        assert_eq!(endpoint.get_option("maddr").unwrap().to_string(), "127.0.0.1");
        endpoint.set_option("leave", "224.0.0.251 127.0.0.1").unwrap();

        endpoint.set_option("join", "{}").unwrap();
        let err = endpoint.set_option("join", "224.0.0.251 127.0.0.1 extra").unwrap_err();
        assert_eq!(err.to_string(), MEMBERSHIP_USAGE);
        let err = endpoint.set_option("maddr", "no-such-host.invalid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AddressResolution);
    }

    #[test]
    fn test_inet6_options() {
        let request = EndpointRequest::new(CepDomain::Inet6, CepType::Datagram);
        let Ok(mut endpoint) = create_client(&request, &EngineConfig::default()) else {
            return;
        };
        endpoint.set_option("resolve", "0").unwrap();
        assert_eq!(endpoint.get_option("domain").unwrap().to_string(), "inet6");

        endpoint.set_option("hops", "33").unwrap();
        assert_eq!(endpoint.get_option("hops").unwrap(), OptionValue::Int(33));
        endpoint.set_option("mhops", "4").unwrap();
        assert_eq!(endpoint.get_option("mhops").unwrap(), OptionValue::Int(4));
        endpoint.set_option("loop", "0").unwrap();
        assert_eq!(endpoint.get_option("loop").unwrap(), OptionValue::Bool(false));
        endpoint.set_option("loop", "1").unwrap();
        assert_eq!(endpoint.get_option("loop").unwrap(), OptionValue::Bool(true));
        assert_eq!(endpoint.get_option("maddr").unwrap().to_string(), "*");
        assert_eq!(endpoint.get_option("peername").unwrap(), OptionValue::no_address());

        let Ok(target) = UdpSocket::bind("[::1]:0") else {
            return;
        };
        let port = target.local_addr().unwrap().port();
        endpoint
            .set_option("peername", &format!("::1 {}", port))
            .unwrap();
        let peer = endpoint.get_option("peername").unwrap().elements();
        assert_eq!(peer, vec!["::1".to_string(), "::1".to_string(), port.to_string()]);
        let sockname = endpoint.get_option("sockname").unwrap().elements();
        assert_eq!(sockname[0], "::1");
        assert_ne!(sockname[2], "0");
    }

    #[test]
    fn test_local_pair_sockname() {
        let (a, _b) = create_pair(CepDomain::Local, CepType::Stream, "").unwrap();
        let sockname = a.get_option("sockname").unwrap().elements();
        assert_eq!(sockname.len(), 3);
        assert_eq!(sockname[0], "");
        let peereid = a.get_option("peereid").unwrap().elements();
        assert_eq!(peereid.len(), 2);
    }
}
