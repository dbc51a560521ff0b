//! Local network interface resolver.
//!
//! ECHONET Lite multicast traffic has to fan out over every usable
//! local interface, and inbound multicast self-delivery is filtered by
//! source address, so both sides of the transport need one consistent
//! view of "our" addresses. That view is computed once per process on
//! first use and never invalidated; interface changes during a run
//! are accepted staleness, which keeps self-receipt filtering
//! deterministic.

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use tracing::warn;

/// RFC1918 private ranges, as (network, prefix length).
const PRIVATE_RANGES: [(Ipv4Addr, u8); 3] = [
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
];

/// Link-local range excluded regardless of the private filter.
const LINK_LOCAL: (Ipv4Addr, u8) = (Ipv4Addr::new(169, 254, 0, 0), 16);

static INTERFACES: OnceLock<Vec<Ipv4Addr>> = OnceLock::new();

/// Usable local IPv4 addresses, memoized for the process lifetime.
///
/// Keeps only non-loopback, non-link-local, RFC1918-private IPv4
/// addresses, in enumeration order. Callers receive their own copy;
/// the cached snapshot cannot be mutated.
pub fn list_interfaces() -> Vec<Ipv4Addr> {
    INTERFACES.get_or_init(enumerate).clone()
}

fn enumerate() -> Vec<Ipv4Addr> {
    let ifaces = match if_addrs::get_if_addrs() {
        Ok(ifaces) => ifaces,
        Err(e) => {
            warn!("failed to enumerate network interfaces: {e}");
            return Vec::new();
        }
    };

    ifaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.addr {
            if_addrs::IfAddr::V4(v4) => Some(v4.ip),
            if_addrs::IfAddr::V6(_) => None,
        })
        .filter(|&addr| is_usable_addr(addr))
        .collect()
}

/// The pure filter behind [`list_interfaces`].
///
/// Accepts exactly the addresses a frame may legitimately originate
/// from on this host: private-range IPv4 that is neither loopback nor
/// link-local.
pub fn is_usable_addr(addr: Ipv4Addr) -> bool {
    if addr.is_loopback() || in_cidr(addr, LINK_LOCAL.0, LINK_LOCAL.1) {
        return false;
    }
    PRIVATE_RANGES
        .iter()
        .any(|&(net, prefix)| in_cidr(addr, net, prefix))
}

/// Prefix-masked integer comparison: is `addr` inside `net/prefix`?
fn in_cidr(addr: Ipv4Addr, net: Ipv4Addr, prefix: u8) -> bool {
    let shift = 32 - u32::from(prefix);
    (u32::from(addr) >> shift) == (u32::from(net) >> shift)
}
