use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Result of the pre-flight check run on a seed URL before crawling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyReport {
    /// False when at least one blocking issue was found
    pub can_proceed: bool,

    /// Blocking problems
    pub issues: Vec<String>,

    /// Non-blocking observations worth showing to the user
    pub warnings: Vec<String>,
}

impl SafetyReport {
    fn from_parts(issues: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            can_proceed: issues.is_empty(),
            issues,
            warnings,
        }
    }
}

/// Checks whether a seed URL is safe and sensible to crawl
///
/// Blocks unparseable URLs, non-http(s) schemes, missing hosts and embedded
/// credentials. Warns about plain http, loopback or private hosts, and
/// non-default ports.
pub fn validate(raw: &str) -> SafetyReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(e) => {
            issues.push(format!("URL could not be parsed: {}", e));
            return SafetyReport::from_parts(issues, warnings);
        }
    };

    match url.scheme() {
        "https" => {}
        "http" => warnings.push("URL uses plain http; traffic is not encrypted".to_string()),
        other => issues.push(format!("Unsupported scheme '{}': only http and https", other)),
    }

    match url.host() {
        None => issues.push("URL has no host".to_string()),
        Some(host) => {
            if is_local_host(&host) {
                warnings.push(format!("Host {} is a loopback or private address", host));
            }
        }
    }

    if !url.username().is_empty() || url.password().is_some() {
        issues.push("URL embeds credentials".to_string());
    }

    // The parser elides default ports, so any port left is non-default
    if let Some(port) = url.port() {
        warnings.push(format!("URL uses non-default port {}", port));
    }

    SafetyReport::from_parts(issues, warnings)
}

fn is_local_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost") || domain.ends_with(".local")
        }
        Host::Ipv4(ip) => is_local_ipv4(ip),
        Host::Ipv6(ip) => is_local_ipv6(ip),
    }
}

fn is_local_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_local_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // Unique local (fc00::/7) and link-local (fe80::/10)
    let first = ip.segments()[0];
    if (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80 {
        return true;
    }
    match ip.to_ipv4_mapped() {
        Some(v4) => is_local_ipv4(&v4),
        None => false,
    }
}
