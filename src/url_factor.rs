//! Decomposes bookmark URLs into the factors used by the service comparator.
//!
//! The registrable domain is resolved through the Public Suffix List, so
//! `docs.example.co.uk` groups with `www.example.co.uk` rather than with
//! every other `.co.uk` site.

use psl::{List, Psl};
use url::{Host, Url};

/// Comparable parts of a URL, in comparison order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFactors {
    /// Scheme with `http` folded into `https`.
    pub protocol: String,
    /// Public suffix plus one label, e.g. `example.com`.
    pub domain: String,
    /// Subdomain labels in reverse order, e.g. `api.www` becomes `www.api`.
    pub subdomain_reversed: String,
    /// Explicit port, `0` when absent.
    pub port: u16,
    /// Path, query and fragment.
    pub tail: String,
}

impl UrlFactors {
    /// Extract factors from an optional URL. Returns `None` for anything that
    /// cannot be parsed or whose host is not a listed domain name.
    pub fn extract(url: Option<&str>) -> Option<Self> {
        let parsed = Url::parse(url?).ok()?;

        let host = match parsed.host()? {
            Host::Domain(host) => host.trim_end_matches('.').to_ascii_lowercase(),
            Host::Ipv4(_) | Host::Ipv6(_) => return None,
        };
        let (domain, subdomain) = split_host(&host)?;

        let protocol = match parsed.scheme() {
            "http" => "https".to_string(),
            other => other.to_string(),
        };

        let subdomain_reversed = subdomain
            .split('.')
            .filter(|label| !label.is_empty())
            .rev()
            .collect::<Vec<_>>()
            .join(".");

        let mut tail = parsed.path().to_string();
        if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
            tail.push('?');
            tail.push_str(query);
        }
        if let Some(fragment) = parsed.fragment().filter(|f| !f.is_empty()) {
            tail.push('#');
            tail.push_str(fragment);
        }

        Some(Self {
            protocol,
            domain,
            subdomain_reversed,
            port: parsed.port().unwrap_or(0),
            tail,
        })
    }
}

/// Split a hostname into (registrable domain, subdomain).
fn split_host(host: &str) -> Option<(String, String)> {
    if !is_valid_hostname(host) {
        return None;
    }

    let suffix = List.suffix(host.as_bytes())?;
    if !suffix.is_known() {
        return None;
    }

    let Some(domain) = List.domain(host.as_bytes()) else {
        // The host is itself a public suffix (e.g. `github.io`).
        return Some((String::new(), String::new()));
    };

    let registrable = std::str::from_utf8(domain.as_bytes()).ok()?.to_string();
    let subdomain = host
        .strip_suffix(registrable.as_str())
        .map(|rest| rest.trim_end_matches('.'))
        .unwrap_or_default()
        .to_string();

    Some((registrable, subdomain))
}

fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}
