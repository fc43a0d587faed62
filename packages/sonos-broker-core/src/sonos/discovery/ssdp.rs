//! SSDP-based zone player discovery.
//!
//! Sends M-SEARCH queries for the ZonePlayer device type to the SSDP
//! multicast group on every usable interface and collects the unicast
//! replies for a fixed window.
//!
//! The same socket is used for send AND receive since devices reply unicast
//! back to the sending socket/port.

use async_trait::async_trait;
use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::types::{is_virtual_interface, DiscoveredZone, DiscoveryError, DiscoveryResult};
use crate::protocol_constants::{SONOS_SEARCH_TARGET, SSDP_MULTICAST_ADDR, SSDP_MX_SECS};

// ─────────────────────────────────────────────────────────────────────────────
// ASCII Case-Insensitive Helpers
// ─────────────────────────────────────────────────────────────────────────────
//
// HTTP headers are ASCII, so byte-level comparison avoids allocating a
// lowercased copy of every response line.

#[inline]
fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[inline]
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Returns the value of a response header, or `None` when absent.
fn header<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response
        .lines()
        .find(|l| starts_with_ignore_ascii_case(l, name) && l[name.len()..].starts_with(':'))
        .map(|l| l[name.len() + 1..].trim())
}

// ─────────────────────────────────────────────────────────────────────────────

/// Build the M-SEARCH message.
fn build_msearch_message(mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        SSDP_MULTICAST_ADDR, mx, SONOS_SEARCH_TARGET
    )
}

/// Parses an SSDP response into a discovered zone.
///
/// The uid comes from the USN (`uuid:RINCON_xxx::urn:...`) and is
/// lowercased. The model is the parenthesised suffix of the SERVER header,
/// e.g. `Linux UPnP/1.0 Sonos/22.0-65180 (ZPS5)` yields `ZPS5`.
///
/// Returns None if the response doesn't carry a RINCON uid.
pub(crate) fn parse_ssdp_response(response: &str, src_ip: &str) -> Option<DiscoveredZone> {
    let usn = header(response, "usn")?;
    let uid = find_ignore_ascii_case(usn, "uuid:")
        .map(|idx| &usn[idx + 5..])
        .and_then(|s| s.split("::").next())?
        .trim();

    if !starts_with_ignore_ascii_case(uid, "rincon_") {
        return None;
    }

    let model = header(response, "server")
        .and_then(|server| {
            let open = server.rfind('(')?;
            let close = server[open..].find(')')? + open;
            Some(server[open + 1..close].trim().to_string())
        })
        .unwrap_or_default();

    Some(DiscoveredZone {
        uid: uid.to_lowercase(),
        ip: src_ip.to_string(),
        model,
    })
}

/// Network interface information for discovery.
#[derive(Debug, Clone)]
struct InterfaceInfo {
    name: String,
    ip: Ipv4Addr,
}

/// Gets all usable network interfaces for discovery.
///
/// Filters out virtual/container interfaces and loopback.
fn get_interfaces() -> Vec<InterfaceInfo> {
    list_afinet_netifas()
        .unwrap_or_else(|e| {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter_map(|(name, addr)| {
            if is_virtual_interface(&name) {
                log::debug!("[Discovery] Skipping virtual interface: {}", name);
                return None;
            }
            match addr {
                IpAddr::V4(ipv4) if !ipv4.is_loopback() => Some(InterfaceInfo { name, ip: ipv4 }),
                _ => None,
            }
        })
        .collect()
}

/// Creates a UDP socket bound to a specific interface.
///
/// Sets up socket options for SSDP discovery:
/// - SO_REUSEADDR for rapid restarts
/// - SO_REUSEPORT on Unix
/// - Multicast TTL of 4 per UPnP spec
fn create_socket(iface_ip: Ipv4Addr) -> DiscoveryResult<UdpSocket> {
    let bind_addr = SocketAddr::new(IpAddr::V4(iface_ip), 0);

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEADDR on {}: {}", iface_ip, e);
    }

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEPORT on {}: {}", iface_ip, e);
    }

    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[Discovery] Failed to set multicast TTL on {}: {}", iface_ip, e);
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&bind_addr.into())
        .map_err(DiscoveryError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(DiscoveryError::SocketBind)
}

/// Configuration for SSDP discovery.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Number of M-SEARCH packets to send.
    pub send_count: u32,
    /// Delay between M-SEARCH retries.
    pub retry_delay: Duration,
    /// How long to collect responses.
    pub window: Duration,
    /// MX value (max response delay in seconds).
    pub mx_value: u64,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            send_count: 2,
            retry_delay: Duration::from_millis(300),
            window: Duration::from_secs(1),
            mx_value: SSDP_MX_SECS,
        }
    }
}

/// One round of multicast probing.
///
/// An empty result means nothing answered; an error means the probe could
/// not be sent at all.
#[async_trait]
pub trait ZoneProbe: Send + Sync {
    async fn probe(&self) -> DiscoveryResult<Vec<DiscoveredZone>>;
}

/// Production [`ZoneProbe`] sending real M-SEARCH datagrams.
pub struct SsdpProbe {
    config: SsdpConfig,
}

impl SsdpProbe {
    #[must_use]
    pub fn new(config: SsdpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ZoneProbe for SsdpProbe {
    async fn probe(&self) -> DiscoveryResult<Vec<DiscoveredZone>> {
        discover_ssdp(&self.config).await
    }
}

async fn discover_ssdp(config: &SsdpConfig) -> DiscoveryResult<Vec<DiscoveredZone>> {
    let interfaces = get_interfaces();
    if interfaces.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    let msg = build_msearch_message(config.mx_value);

    let mut sockets: Vec<(InterfaceInfo, Arc<UdpSocket>)> = Vec::new();
    for iface in interfaces {
        match create_socket(iface.ip) {
            Ok(socket) => sockets.push((iface, Arc::new(socket))),
            Err(e) => {
                log::warn!(
                    "[Discovery] Failed to create socket for {} ({}): {}",
                    iface.name,
                    iface.ip,
                    e
                );
            }
        }
    }

    if sockets.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    log::debug!(
        "[Discovery] M-SEARCH on {} interface(s) ({} sends, {}ms window)",
        sockets.len(),
        config.send_count,
        config.window.as_millis()
    );

    let discovered: Arc<Mutex<Vec<DiscoveredZone>>> = Arc::new(Mutex::new(Vec::new()));

    let send_futures: Vec<_> = sockets
        .iter()
        .map(|(iface, socket)| {
            let socket = Arc::clone(socket);
            let name = iface.name.clone();
            let msg = msg.as_bytes().to_vec();
            let send_count = config.send_count;
            let retry_delay = config.retry_delay;

            async move {
                for i in 0..send_count {
                    if i > 0 {
                        tokio::time::sleep(retry_delay).await;
                    }
                    if let Err(e) = socket.send_to(&msg, SSDP_MULTICAST_ADDR).await {
                        log::warn!(
                            "[Discovery] Failed to send M-SEARCH on {} (attempt {}): {}",
                            name,
                            i + 1,
                            e
                        );
                    }
                }
            }
        })
        .collect();

    let recv_futures: Vec<_> = sockets
        .iter()
        .map(|(iface, socket)| {
            let socket = Arc::clone(socket);
            let name = iface.name.clone();
            let discovered = Arc::clone(&discovered);
            let window = config.window;

            async move {
                let mut buf = [0u8; 2048];
                let start = tokio::time::Instant::now();

                while start.elapsed() < window {
                    let remaining = window.saturating_sub(start.elapsed());
                    match timeout(remaining, socket.recv_from(&mut buf)).await {
                        Ok(Ok((amt, src))) => {
                            let response = String::from_utf8_lossy(&buf[..amt]);
                            if let Some(zone) =
                                parse_ssdp_response(&response, &src.ip().to_string())
                            {
                                log::trace!(
                                    "[Discovery] Response from {} ({}) via {}",
                                    zone.uid,
                                    zone.ip,
                                    name
                                );
                                discovered.lock().await.push(zone);
                            }
                        }
                        Ok(Err(e)) => {
                            log::warn!("[Discovery] Socket recv error on {}: {}", name, e);
                        }
                        Err(_) => break, // Timeout
                    }
                }
            }
        })
        .collect();

    let (_, _) = tokio::join!(
        futures::future::join_all(send_futures),
        futures::future::join_all(recv_futures)
    );

    let mut discovered = std::mem::take(&mut *discovered.lock().await);

    // A zone answers once per send and per interface
    let mut seen = HashSet::new();
    discovered.retain(|z| seen.insert(z.uid.clone()));
    discovered.sort_by(|a, b| a.uid.cmp(&b.uid));

    log::debug!(
        "[Discovery] Probe complete: {} unique zone(s)",
        discovered.len()
    );

    Ok(discovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_fixtures::{SSDP_RESPONSE_BRIDGE, SSDP_RESPONSE_PLAY5};

    #[test]
    fn msearch_targets_zone_players() {
        let msg = build_msearch_message(1);
        assert!(msg.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(msg.contains("HOST: 239.255.255.250:1900"));
        assert!(msg.contains("MX: 1"));
        assert!(msg.contains("ST: urn:schemas-upnp-org:device:ZonePlayer:1"));
        assert!(msg.ends_with("\r\n\r\n"));
    }

    #[test]
    fn response_yields_lowercase_uid_and_model() {
        let zone = parse_ssdp_response(SSDP_RESPONSE_PLAY5, "192.168.1.10").unwrap();
        assert_eq!(
            zone,
            DiscoveredZone {
                uid: "rincon_aaa01400".into(),
                ip: "192.168.1.10".into(),
                model: "ZPS5".into(),
            }
        );
    }

    #[test]
    fn bridge_model_is_reported() {
        let zone = parse_ssdp_response(SSDP_RESPONSE_BRIDGE, "192.168.1.2").unwrap();
        assert_eq!(zone.model, "BR100");
    }

    #[test]
    fn lowercase_headers_are_accepted() {
        let response = "HTTP/1.1 200 OK\r\n\
            server: Linux UPnP/1.0 Sonos/63.2-88230 (S14)\r\n\
            usn: UUID:RINCON_ABC12345678901400::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\r\n";
        let zone = parse_ssdp_response(response, "192.168.1.30").unwrap();
        assert_eq!(zone.uid, "rincon_abc12345678901400");
        assert_eq!(zone.model, "S14");
    }

    #[test]
    fn non_sonos_response_is_ignored() {
        let response = "HTTP/1.1 200 OK\r\n\
            LOCATION: http://192.168.1.20:80/description.xml\r\n\
            USN: uuid:some-other-device\r\n\r\n";
        assert!(parse_ssdp_response(response, "192.168.1.20").is_none());
    }

    #[test]
    fn missing_server_header_leaves_model_empty() {
        let response = "HTTP/1.1 200 OK\r\nUSN: uuid:RINCON_X01400\r\n\r\n";
        let zone = parse_ssdp_response(response, "10.0.0.5").unwrap();
        assert_eq!(zone.model, "");
    }
}
