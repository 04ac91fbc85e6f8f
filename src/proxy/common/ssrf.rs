//! SSRF guard for relay targets.
//!
//! A target is refused when its scheme is not plain HTTP(S), when it names a
//! cloud metadata endpoint, or when its host is (or resolves to) an address
//! outside public unicast space. Resolution failures are not treated as a
//! denial: the transport resolves again when it connects.

use ipnet::IpNet;
use once_cell::sync::Lazy;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;
use url::{Host, Url};

use crate::error::PolicyViolation;

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Cloud metadata endpoints, denied before any IP classification
pub const BLOCKED_HOSTS: &[&str] = &["169.254.169.254", "metadata.google.internal", "metadata"];

/// Private, loopback, link-local and reserved ranges
static DENY_CIDRS: Lazy<Vec<IpNet>> = Lazy::new(|| {
    [
        // IPv4
        "0.0.0.0/8",
        "10.0.0.0/8",
        "100.64.0.0/10",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "172.16.0.0/12",
        "192.0.0.0/24",
        "192.0.2.0/24",
        "192.168.0.0/16",
        "198.18.0.0/15",
        "198.51.100.0/24",
        "203.0.113.0/24",
        "224.0.0.0/4",
        "240.0.0.0/4",
        // IPv6
        "::/8",
        "64:ff9b::/96",
        "64:ff9b:1::/48",
        "100::/8",
        "200::/7",
        "400::/6",
        "800::/5",
        "1000::/4",
        "2001::/23",
        "2001:db8::/32",
        "2002::/16",
        // Everything outside 2000::/3 global unicast is unassigned or special
        "4000::/3",
        "6000::/3",
        "8000::/3",
        "a000::/3",
        "c000::/3",
        "e000::/4",
        "f000::/5",
        "f800::/6",
        "fc00::/7",
        "fe00::/9",
        "fe80::/10",
        "fec0::/10",
        "ff00::/8",
    ]
    .iter()
    .filter_map(|s| s.parse::<IpNet>().ok())
    .collect()
});

/// Whether `ip` must never be a relay target.
///
/// IPv4-mapped IPv6 addresses are judged by the IPv4 address they carry.
pub fn is_blocked_ip(ip: &IpAddr) -> bool {
    if let IpAddr::V6(v6) = ip {
        if let Some(v4) = v6.to_ipv4_mapped() {
            return is_blocked_ip(&IpAddr::V4(v4));
        }
    }
    DENY_CIDRS.iter().any(|cidr| cidr.contains(ip))
}

fn is_metadata_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    BLOCKED_HOSTS.contains(&host.as_str())
}

/// Checks that need no network access.
///
/// Returns the hostname that still has to be resolved, or `None` when the
/// host is an IP literal that already passed.
pub fn check_url(url: &Url) -> Result<Option<String>, PolicyViolation> {
    let scheme = url.scheme();
    if !ALLOWED_SCHEMES.contains(&scheme) {
        return Err(PolicyViolation::UnsupportedScheme(scheme.to_string()));
    }

    let host = url.host().ok_or(PolicyViolation::MissingHost)?;
    let ip = match host {
        Host::Domain(domain) => {
            if is_metadata_host(domain) {
                return Err(PolicyViolation::MetadataEndpoint);
            }
            return Ok(Some(domain.to_lowercase()));
        }
        Host::Ipv4(v4) => IpAddr::V4(v4),
        Host::Ipv6(v6) => IpAddr::V6(v6),
    };

    if is_metadata_host(&ip.to_string()) {
        return Err(PolicyViolation::MetadataEndpoint);
    }
    if is_blocked_ip(&ip) {
        return Err(PolicyViolation::PrivateAddress(ip));
    }
    Ok(None)
}

/// Check the addresses a hostname resolved to; every one of them must be public.
pub fn check_resolved(host: &str, resolved: &[IpAddr]) -> Result<(), PolicyViolation> {
    match resolved.iter().find(|ip| is_blocked_ip(ip)) {
        Some(ip) => Err(PolicyViolation::ResolvesToPrivate {
            host: host.to_string(),
            ip: *ip,
        }),
        None => Ok(()),
    }
}

/// Resolve `host`, giving up after `lookup_timeout`. Failures yield no addresses.
async fn resolve(host: &str, port: u16, lookup_timeout: Duration) -> Vec<IpAddr> {
    match tokio::time::timeout(lookup_timeout, tokio::net::lookup_host((host, port))).await {
        Ok(Ok(addrs)) => addrs.map(|a| a.ip()).collect(),
        Ok(Err(e)) => {
            debug!("DNS resolution failed for {}: {}", host, e);
            Vec::new()
        }
        Err(_) => {
            debug!("DNS resolution timed out for {}", host);
            Vec::new()
        }
    }
}

/// Full validation of a relay target, DNS included.
pub async fn validate_target(raw_url: &str, lookup_timeout: Duration) -> Result<Url, PolicyViolation> {
    let url = Url::parse(raw_url).map_err(|e| PolicyViolation::InvalidUrl(e.to_string()))?;

    if let Some(host) = check_url(&url)? {
        let port = url.port_or_known_default().unwrap_or(80);
        let resolved = resolve(&host, port, lookup_timeout).await;
        check_resolved(&host, &resolved)?;
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn check(raw: &str) -> Result<Option<String>, PolicyViolation> {
        check_url(&Url::parse(raw).unwrap())
    }

    #[test]
    fn test_private_ranges_blocked() {
        for addr in [
            "10.0.0.5",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.1",
            "127.0.0.1",
            "169.254.1.1",
            "0.0.0.0",
            "100.64.0.1",
            "224.0.0.1",
            "255.255.255.255",
        ] {
            assert!(is_blocked_ip(&ip(addr)), "{} should be blocked", addr);
        }
    }

    #[test]
    fn test_ipv6_ranges_blocked() {
        for addr in ["::1", "::", "fc00::1", "fd12::1", "fe80::1", "ff02::1", "2001:db8::1"] {
            assert!(is_blocked_ip(&ip(addr)), "{} should be blocked", addr);
        }
    }

    #[test]
    fn test_ipv6_reserved_blocks() {
        for addr in ["100::1", "200::1", "400::1", "1000::1", "4000::1", "8000::1", "e000::1", "fe00::1"] {
            assert!(is_blocked_ip(&ip(addr)), "{} should be blocked", addr);
        }
        for addr in ["2607:f8b0:4004:800::200e", "2a00:1450:4001:82a::200e", "2620:fe::fe"] {
            assert!(!is_blocked_ip(&ip(addr)), "{} should be allowed", addr);
        }
    }

    #[test]
    fn test_ipv4_mapped_ipv6() {
        assert!(is_blocked_ip(&ip("::ffff:127.0.0.1")));
        assert!(is_blocked_ip(&ip("::ffff:10.0.0.1")));
        assert!(!is_blocked_ip(&ip("::ffff:8.8.8.8")));
    }

    #[test]
    fn test_public_addresses_allowed() {
        for addr in ["8.8.8.8", "1.1.1.1", "100.0.0.1", "172.32.0.1", "2607:f8b0:4004:800::200e"] {
            assert!(!is_blocked_ip(&ip(addr)), "{} should be allowed", addr);
        }
    }

    #[test]
    fn test_scheme_rejected_by_name() {
        assert_eq!(
            check("file:///etc/passwd"),
            Err(PolicyViolation::UnsupportedScheme("file".to_string()))
        );
        assert_eq!(
            check("gopher://example.com/"),
            Err(PolicyViolation::UnsupportedScheme("gopher".to_string()))
        );
        assert_eq!(
            check("ftp://example.com/pub"),
            Err(PolicyViolation::UnsupportedScheme("ftp".to_string()))
        );
    }

    #[test]
    fn test_metadata_hosts_blocked() {
        for raw in [
            "http://169.254.169.254/latest/meta-data/",
            "https://metadata.google.internal/computeMetadata/v1/",
            "http://METADATA/",
            "http://metadata./",
        ] {
            assert_eq!(check(raw), Err(PolicyViolation::MetadataEndpoint), "{}", raw);
        }
    }

    #[test]
    fn test_literal_private_hosts_blocked() {
        assert_eq!(
            check("http://127.0.0.1/"),
            Err(PolicyViolation::PrivateAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)))
        );
        assert_eq!(
            check("http://[::1]:8080/"),
            Err(PolicyViolation::PrivateAddress(IpAddr::V6(Ipv6Addr::LOCALHOST)))
        );
        assert!(check("http://10.0.0.5/").is_err());
        // Alternate IPv4 notations are normalized by the URL parser
        assert!(check("http://0x7f.0.0.1/").is_err());
        assert!(check("http://2130706433/").is_err());
    }

    #[test]
    fn test_public_literal_passes_without_dns() {
        assert_eq!(check("https://93.184.216.34/"), Ok(None));
    }

    #[test]
    fn test_hostname_needs_resolution() {
        assert_eq!(
            check("https://API.example.com:8443/x"),
            Ok(Some("api.example.com".to_string()))
        );
    }

    #[test]
    fn test_check_resolved() {
        assert!(check_resolved("example.com", &[ip("93.184.216.34")]).is_ok());
        assert!(check_resolved("example.com", &[]).is_ok());
        assert_eq!(
            check_resolved("rebind.example", &[ip("93.184.216.34"), ip("10.1.2.3")]),
            Err(PolicyViolation::ResolvesToPrivate {
                host: "rebind.example".to_string(),
                ip: ip("10.1.2.3"),
            })
        );
    }

    #[tokio::test]
    async fn test_validate_invalid_url() {
        let err = validate_target("not a url", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyViolation::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_validate_localhost_resolves_private() {
        let err = validate_target("http://localhost:8080/admin", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyViolation::ResolvesToPrivate { .. }));
    }

    #[tokio::test]
    async fn test_validate_unresolvable_host_passes() {
        let url = validate_target("https://no-such-host.invalid/", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(url.host_str(), Some("no-such-host.invalid"));
    }
}
