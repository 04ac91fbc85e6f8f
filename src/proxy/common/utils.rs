// Utility functions

use url::{Host, Url};

/// Lowercased host of `raw_url` without port or IPv6 brackets.
///
/// Returns `None` when the URL does not parse or has no host.
pub fn extract_host(raw_url: &str) -> Option<String> {
    let url = Url::parse(raw_url).ok()?;
    host_of(&url)
}

pub fn host_of(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_lowercase()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host_strips_port_and_case() {
        assert_eq!(
            extract_host("https://API.Example.com:8443/v1?q=1"),
            Some("api.example.com".to_string())
        );
        assert_eq!(
            extract_host("http://user:pw@example.org/"),
            Some("example.org".to_string())
        );
    }

    #[test]
    fn test_extract_host_ip_literals() {
        assert_eq!(extract_host("http://[::1]:8080/"), Some("::1".to_string()));
        assert_eq!(
            extract_host("http://169.254.169.254/latest"),
            Some("169.254.169.254".to_string())
        );
    }

    #[test]
    fn test_extract_host_invalid() {
        assert_eq!(extract_host("not a url"), None);
        assert_eq!(extract_host("/relative/path"), None);
    }
}
