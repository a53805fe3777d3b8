use crate::error::ProbeError;
use crate::probe::{DEFAULT_TIMEOUT_MS, DEFAULT_TIMING_HEADER};
use regex::Regex;
use std::env;
use std::time::Duration;

/// Requests per run when nothing else is configured.
pub const DEFAULT_REQUESTS: u32 = 100;

/// Accepted target URLs: a CloudFront distribution domain.
pub const DEFAULT_TARGET_PATTERN: &str = r"^https?://[a-zA-Z\d]+\.cloudfront\.net/?.?";

const TARGET_EXAMPLE: &str = "https://d1fpng8gomo4sk.cloudfront.net";

#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub requests: u32,
    pub timeout: Duration,
    pub timing_header: String,
    pub target_pattern: String,
}

impl Config {
    /// Defaults, overridden by `PROBE_*` environment variables. The URL is
    /// left empty for the caller to fill in.
    pub fn from_env() -> Self {
        Self {
            url: String::new(),
            requests: env::var("PROBE_REQUESTS")
                .ok()
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_REQUESTS),
            timeout: Duration::from_millis(
                env::var("PROBE_TIMEOUT_MS")
                    .ok()
                    .and_then(|t| t.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            timing_header: env::var("PROBE_TIMING_HEADER")
                .unwrap_or_else(|_| DEFAULT_TIMING_HEADER.to_string()),
            target_pattern: env::var("PROBE_TARGET_PATTERN")
                .unwrap_or_else(|_| DEFAULT_TARGET_PATTERN.to_string()),
        }
    }

    /// Rejects a configuration no request should be sent for.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.requests == 0 {
            return Err(ProbeError::InvalidConfig(
                "request count must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ProbeError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let pattern = Regex::new(&self.target_pattern).map_err(|e| {
            ProbeError::InvalidConfig(format!("bad target pattern {:?}: {}", self.target_pattern, e))
        })?;
        if !pattern.is_match(&self.url) {
            return Err(ProbeError::InvalidTarget(format!(
                "{:?} is not a CDN URL; use the following format: {}",
                self.url, TARGET_EXAMPLE
            )));
        }

        match url::Url::parse(&self.url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
            Ok(u) => Err(ProbeError::InvalidTarget(format!(
                "unsupported scheme {}",
                u.scheme()
            ))),
            Err(e) => Err(ProbeError::InvalidTarget(format!("{}: {}", self.url, e))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            requests: DEFAULT_REQUESTS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            timing_header: DEFAULT_TIMING_HEADER.to_string(),
            target_pattern: DEFAULT_TARGET_PATTERN.to_string(),
        }
    }
}
