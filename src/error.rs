use std::time::Duration;
use thiserror::Error;

/// Fatal conditions that abort a probe run.
///
/// Every per-request variant carries the 1-based index of the request that
/// failed, so the user can tell how far the run got.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Request {index}: response carried no {header} header")]
    MissingTimingHeader { index: u32, header: String },

    #[error("Request {index}: malformed timing header {raw:?}: {source}")]
    MalformedTimingHeader {
        index: u32,
        raw: String,
        #[source]
        source: ParseError,
    },

    #[error("Request {index}: incomplete CDN timing data, missing {}", .missing.join(", "))]
    IncompleteTimingData {
        index: u32,
        missing: Vec<&'static str>,
    },

    #[error("Request {index}: {source}")]
    Transport {
        index: u32,
        #[source]
        source: TransportError,
    },
}

impl ProbeError {
    /// Stable machine-readable code for logs and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            ProbeError::InvalidTarget(_) => "INVALID_TARGET",
            ProbeError::InvalidConfig(_) => "INVALID_CONFIG",
            ProbeError::MissingTimingHeader { .. } => "MISSING_TIMING_HEADER",
            ProbeError::MalformedTimingHeader { .. } => "MALFORMED_TIMING_HEADER",
            ProbeError::IncompleteTimingData { .. } => "INCOMPLETE_TIMING_DATA",
            ProbeError::Transport { source, .. } => source.code(),
        }
    }

    /// Classifies a failure to build the executor, before any request. TLS
    /// setup problems are configuration errors; everything else is the URL.
    pub fn from_setup(error: TransportError) -> Self {
        match error {
            TransportError::TlsConfig(e) => {
                ProbeError::InvalidConfig(format!("TLS setup failed: {}", e))
            }
            other => ProbeError::InvalidTarget(other.to_string()),
        }
    }

    /// Request index the error occurred at, if it is tied to one.
    pub fn index(&self) -> Option<u32> {
        match self {
            ProbeError::InvalidTarget(_) | ProbeError::InvalidConfig(_) => None,
            ProbeError::MissingTimingHeader { index, .. }
            | ProbeError::MalformedTimingHeader { index, .. }
            | ProbeError::IncompleteTimingData { index, .. }
            | ProbeError::Transport { index, .. } => Some(*index),
        }
    }
}

/// Failures of a single HTTP exchange.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("TCP connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("TLS handshake failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] rustls::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::InvalidUrl(_) => "INVALID_URL",
            TransportError::Dns(_) => "DNS_ERROR",
            TransportError::Connect(_) => "CONNECTION_FAILED",
            TransportError::Tls(_) | TransportError::TlsConfig(_) => "TLS_ERROR",
            TransportError::Http(_) => "HTTP_ERROR",
            TransportError::Status(_) => "BAD_STATUS",
            TransportError::Timeout(_) => "TIMEOUT",
        }
    }
}

/// Syntax errors in a `Server-Timing` header value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("header value is empty")]
    Empty,

    #[error("token {position} is empty")]
    EmptyToken { position: usize },

    #[error("parameter {parameter:?} of {metric} has no '='")]
    BadParameter { metric: String, parameter: String },

    #[error("{metric} carries neither dur nor desc")]
    MissingValue { metric: &'static str },

    #[error("{metric} value {value:?} is not a non-negative number")]
    InvalidNumber { metric: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ProbeError>;
