//! Connected-Pair Factory Module
//!
//! Creates two Local endpoints that are connected to each other from the
//! start, with no address and no handshake.

use entities_endpoint::{CepDomain, CepError, CepType, EndpointFlags, Role};
use socket2::{Protocol, Socket};
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::factory::OPEN_CONTEXT;
use crate::resolver::resolve_protocol;
use crate::translate::{to_sys_domain, to_sys_type};

/// Create a connected pair of endpoints
///
/// # Arguments
///
/// * `domain` - Must be [`CepDomain::Local`]
/// * `cep_type` - Transport shape of both endpoints
/// * `protocol` - Protocol name or number; empty for the default
///
/// # Returns
///
/// * `Ok((Endpoint, Endpoint))` - Both ends, resolve-names off, no callback
/// * `Err(CepError)` - Neither descriptor is left open
pub fn create_pair(
    domain: CepDomain,
    cep_type: CepType,
    protocol: &str,
) -> Result<(Endpoint, Endpoint), CepError> {
    if domain != CepDomain::Local {
        return Err(CepError::Argument(format!(
            "{}: connected pairs are only supported for the local domain",
            OPEN_CONTEXT
        )));
    }
    let protocol = resolve_protocol(protocol)?;
    let proto = if protocol == 0 {
        None
    } else {
        Some(Protocol::from(protocol))
    };
    let (first, second) = Socket::pair(to_sys_domain(domain), to_sys_type(cep_type), proto)
        .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    for socket in [&first, &second] {
        socket
            .set_cloexec(true)
            .map_err(|e| CepError::os(OPEN_CONTEXT, e))?;
    }

    let wrap = |socket: Socket| {
        Endpoint::new(
            socket,
            domain,
            cep_type,
            protocol,
            Role::Paired,
            EndpointFlags::new(false, false),
        )
    };
    let (first, second) = (wrap(first), wrap(second));
    debug!(
        first = first.descriptor(),
        second = second.descriptor(),
        cep_type = %cep_type,
        "opened connected pair"
    );
    Ok((first, second))
}
