//! Per-page fetch errors and their classification
//!
//! Every way a page can fail ends up as a `FetchError`. The error's
//! [`ErrorClass`] is what gets recorded on the page outcome and decides whether
//! the frontier retries the page or the dispatcher falls back to rendering.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// HTTP statuses treated as a final answer from the server
pub const TERMINAL_STATUSES: &[u16] = &[400, 401, 403, 404, 410];

/// Kind of TLS certificate problem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsIssue {
    Expired,
    UnverifiableChain,
    SelfSigned,
    Other,
}

impl TlsIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "tls_expired",
            Self::UnverifiableChain => "tls_unverifiable_chain",
            Self::SelfSigned => "tls_self_signed",
            Self::Other => "tls_other",
        }
    }
}

/// Error produced while fetching or extracting a single page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("DNS lookup failed: {0}")]
    DnsNotFound(String),

    #[error("HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("TLS error ({}): {message}", .issue.as_str())]
    Tls { issue: TlsIssue, message: String },

    #[error("Too many redirects: {0}")]
    TooManyRedirects(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Browser error: {0}")]
    Browser(String),
}

/// Stable classification of a page failure, recorded with the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidUrl,
    DnsNotFound,
    Http(u16),
    ConnectionRefused,
    Timeout,
    Network,
    Tls(TlsIssue),
    TooManyRedirects,
    Extraction,
    BrowserUnavailable,
    Browser,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => f.write_str("invalid_url"),
            Self::DnsNotFound => f.write_str("dns_not_found"),
            Self::Http(status) => write!(f, "http_{}", status),
            Self::ConnectionRefused => f.write_str("connection_refused"),
            Self::Timeout => f.write_str("timeout"),
            Self::Network => f.write_str("network"),
            Self::Tls(issue) => f.write_str(issue.as_str()),
            Self::TooManyRedirects => f.write_str("too_many_redirects"),
            Self::Extraction => f.write_str("extraction"),
            Self::BrowserUnavailable => f.write_str("browser_unavailable"),
            Self::Browser => f.write_str("browser"),
        }
    }
}

impl FetchError {
    /// Builds the error for an HTTP status the server answered with
    ///
    /// Returns None for statuses that are data rather than failures.
    pub fn from_status(status: u16) -> Option<Self> {
        if status >= 500 || TERMINAL_STATUSES.contains(&status) {
            Some(Self::HttpStatus { status })
        } else {
            None
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidUrl(_) => ErrorClass::InvalidUrl,
            Self::DnsNotFound(_) => ErrorClass::DnsNotFound,
            Self::HttpStatus { status } => ErrorClass::Http(*status),
            Self::ConnectionRefused(_) => ErrorClass::ConnectionRefused,
            Self::Timeout(_) => ErrorClass::Timeout,
            Self::Network(_) => ErrorClass::Network,
            Self::Tls { issue, .. } => ErrorClass::Tls(*issue),
            Self::TooManyRedirects(_) => ErrorClass::TooManyRedirects,
            Self::Extraction(_) => ErrorClass::Extraction,
            Self::BrowserUnavailable(_) => ErrorClass::BrowserUnavailable,
            Self::Browser(_) => ErrorClass::Browser,
        }
    }

    /// HTTP status carried by the error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status } => Some(*status),
            _ => None,
        }
    }

    /// Transient failures worth another attempt later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus { status } => *status >= 500,
            Self::ConnectionRefused(_) | Self::Timeout(_) | Self::Network(_) => true,
            _ => false,
        }
    }

    /// Failures a real browser might get past, so rendering is worth a try
    ///
    /// An HTTP status, a malformed URL or a missing DNS record would look the
    /// same to a browser.
    pub fn is_render_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::ConnectionRefused(_)
                | Self::Network(_)
                | Self::TooManyRedirects(_)
                | Self::Tls { .. }
        )
    }
}

/// Classifies a reqwest error into a [`FetchError`]
pub fn classify_reqwest_error(err: &reqwest::Error) -> FetchError {
    let chain = error_chain_text(err);

    if err.is_builder() {
        return FetchError::InvalidUrl(chain);
    }
    if err.is_redirect() {
        return FetchError::TooManyRedirects(chain);
    }
    if err.is_timeout() {
        return FetchError::Timeout(chain);
    }

    classify_transport_message(&chain)
}

/// Classifies a transport failure from its full error text
pub(crate) fn classify_transport_message(text: &str) -> FetchError {
    let lower = text.to_lowercase();

    if lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
        || lower.contains("nodename nor servname")
    {
        return FetchError::DnsNotFound(text.to_string());
    }

    if let Some(issue) = classify_tls_text(&lower) {
        return FetchError::Tls {
            issue,
            message: text.to_string(),
        };
    }

    if lower.contains("connection refused") {
        return FetchError::ConnectionRefused(text.to_string());
    }

    if lower.contains("timed out") || lower.contains("timeout") {
        return FetchError::Timeout(text.to_string());
    }

    FetchError::Network(text.to_string())
}

fn classify_tls_text(lower: &str) -> Option<TlsIssue> {
    if !(lower.contains("certificate")
        || lower.contains("tls")
        || lower.contains("ssl")
        || lower.contains("handshake"))
    {
        return None;
    }

    let issue = if lower.contains("expired") || lower.contains("notvalidyet") {
        TlsIssue::Expired
    } else if lower.contains("self signed") || lower.contains("self-signed") || lower.contains("selfsigned") {
        TlsIssue::SelfSigned
    } else if lower.contains("unknownissuer")
        || lower.contains("unknown issuer")
        || lower.contains("unable to get local issuer")
        || lower.contains("unable to verify")
    {
        TlsIssue::UnverifiableChain
    } else {
        TlsIssue::Other
    };
    Some(issue)
}

/// Joins an error and all of its sources into one line
fn error_chain_text(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}
