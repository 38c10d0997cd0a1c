use std::net::{IpAddr, SocketAddr};

/// Client address as shown in logs. Dual-stack listeners report IPv4
/// clients as IPv4-mapped IPv6 addresses; those are unwrapped.
pub(crate) fn client_ip(peer: &SocketAddr) -> IpAddr {
    match peer.ip() {
        IpAddr::V6(address) => address
            .to_ipv4_mapped()
            .map_or(IpAddr::V6(address), IpAddr::V4),
        address @ IpAddr::V4(_) => address,
    }
}
