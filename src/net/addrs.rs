//! Best-effort discovery of the host's own IPv4 addresses for display.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

/// Any routable address works; connecting a UDP socket only selects the
/// outgoing interface, nothing is sent.
const PROBE_TARGET: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

/// Non-loopback IPv4 addresses of this machine, or loopback when none can
/// be determined.
///
/// The address of the default route comes first, followed by every other
/// interface address, so a LAN without a gateway is still listed.
pub async fn local_ipv4_addrs() -> Vec<Ipv4Addr> {
    let ips = usable(outgoing_ipv4().await.into_iter().chain(interface_ipv4s()));
    if ips.is_empty() {
        vec![Ipv4Addr::LOCALHOST]
    } else {
        ips
    }
}

async fn outgoing_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    if let Err(e) = socket.connect(PROBE_TARGET).await {
        log::debug!("no outgoing route for address lookup: {}", e);
        return None;
    }
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(_) => None,
    }
}

fn interface_ipv4s() -> Vec<Ipv4Addr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces
            .into_iter()
            .filter(|iface| !iface.is_loopback())
            .filter_map(|iface| match iface.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .collect(),
        Err(e) => {
            log::debug!("could not list network interfaces: {}", e);
            Vec::new()
        }
    }
}

/// Drops loopback, unspecified and repeated addresses, keeping first-seen
/// order.
fn usable(candidates: impl IntoIterator<Item = Ipv4Addr>) -> Vec<Ipv4Addr> {
    let mut ips: Vec<Ipv4Addr> = Vec::new();
    for ip in candidates {
        if !ip.is_loopback() && !ip.is_unspecified() && !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    ips
}

/// Comma separated list for status messages.
pub fn describe(ips: &[Ipv4Addr]) -> String {
    ips.iter()
        .map(Ipv4Addr::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
