//! Target-domain allow-list.
//!
//! An entry admits the domain itself and every subdomain of it:
//! `example.com` matches `example.com` and `api.example.com`, but not
//! `badexample.com`. An empty list admits everything.

use super::utils::extract_host;
use crate::error::PolicyViolation;

#[derive(Debug, Clone, Default)]
pub struct DomainAllowList {
    /// Allowed domains (trimmed, lowercased, non-empty)
    domains: Vec<String>,
}

impl DomainAllowList {
    pub fn new(domains: &[String]) -> Self {
        Self {
            domains: domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn allows_host(&self, host: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }

        let host = host.to_lowercase();
        self.domains.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Check the host of `raw_url`; a URL without a host only passes an empty list
    pub fn check(&self, raw_url: &str) -> Result<(), PolicyViolation> {
        if self.is_unrestricted() {
            return Ok(());
        }

        match extract_host(raw_url) {
            Some(host) if self.allows_host(&host) => Ok(()),
            _ => Err(PolicyViolation::DomainNotAllowed),
        }
    }
}
