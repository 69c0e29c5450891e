use std::sync::OnceLock;

#[cfg(feature = "ip-fallback")]
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Value used when no usable network address can be found.
pub const DEFAULT_MACHINE_BYTE: u8 = 1;

static LAST_IP_ADDRESS_BYTE: OnceLock<u8> = OnceLock::new();

/// Returns the last byte of this host's network address.
///
/// Resolved on first use and cached for the lifetime of the process. A
/// private IPv4 address is preferred, then any IPv4 address, then IPv6.
/// Falls back to [`DEFAULT_MACHINE_BYTE`] when no address is available.
pub fn last_ip_address_byte() -> u8 {
    *LAST_IP_ADDRESS_BYTE.get_or_init(|| match resolve() {
        Some(byte) => {
            tracing::debug!(byte, "resolved machine byte from host address");
            byte
        }
        None => {
            tracing::warn!(
                default = DEFAULT_MACHINE_BYTE,
                "no usable network address, falling back to default machine byte"
            );
            DEFAULT_MACHINE_BYTE
        }
    })
}

/// Default datacenter and worker ids for a generator that was not given
/// explicit ones: `(process id % 4, last_ip_address_byte())`.
pub(crate) fn default_topology() -> (i64, i64) {
    let data_center_id = i64::from(std::process::id()) % (crate::MAX_DATA_CENTER_ID + 1);
    (data_center_id, i64::from(last_ip_address_byte()))
}

#[cfg(feature = "ip-fallback")]
fn resolve() -> Option<u8> {
    let ips: Vec<IpAddr> = pnet_datalink::interfaces()
        .iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback() && !iface.ips.is_empty())
        .flat_map(|iface| iface.ips.iter().map(|network| network.ip()))
        .collect();
    select_byte(&ips)
}

#[cfg(not(feature = "ip-fallback"))]
fn resolve() -> Option<u8> {
    None
}

/// Picks the machine byte from a list of interface addresses.
#[cfg(feature = "ip-fallback")]
pub(crate) fn select_byte(ips: &[IpAddr]) -> Option<u8> {
    let v4 = || {
        ips.iter().filter_map(|ip| match ip {
            IpAddr::V4(v4) if !v4.is_loopback() => Some(*v4),
            _ => None,
        })
    };

    if let Some(ipv4) = v4().find(is_private_ipv4).or_else(|| v4().next()) {
        return Some(ipv4.octets()[3]);
    }

    ips.iter()
        .find_map(|ip| match ip {
            IpAddr::V6(v6) if !v6.is_loopback() => Some(*v6),
            _ => None,
        })
        .map(|ipv6: Ipv6Addr| ipv6.octets()[15])
}

#[cfg(feature = "ip-fallback")]
pub(crate) fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    matches!(octets[0], 10)
        || (octets[0] == 172 && (16..=31).contains(&octets[1]))
        || (octets[0] == 192 && octets[1] == 168)
}
