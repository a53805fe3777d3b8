use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Client-side phase timings for one request, in milliseconds from the
/// start of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransportTimings {
    /// Start until the body was fully drained
    pub total_ms: f64,
    /// Start until the name was resolved
    pub dns_ms: f64,
    /// Start until TCP was established
    pub connect_ms: f64,
    /// Start until the TLS handshake finished, 0 for plain HTTP
    pub tls_ms: f64,
    /// Start until the response head arrived
    pub first_byte_ms: f64,
    pub download_speed_mbps: f64,
    pub body_bytes: u64,
}

/// What one executed request hands back to the driver loop.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub timings: TransportTimings,
    /// Lower-cased names, trimmed values
    pub headers: HashMap<String, String>,
}

/// CDN cache outcome advertised through a bare Server-Timing flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    Refresh,
}

impl CacheStatus {
    pub fn from_flag(name: &str) -> Option<Self> {
        match name {
            "cdn-cache-hit" => Some(CacheStatus::Hit),
            "cdn-cache-miss" => Some(CacheStatus::Miss),
            "cdn-cache-refresh" => Some(CacheStatus::Refresh),
            _ => None,
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Refresh => "refresh",
        };
        f.write_str(s)
    }
}

/// One measured request. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSample {
    /// 1-based position in the run
    pub index: u32,
    pub total_time_ms: f64,
    pub dns_time_ms: f64,
    pub connect_time_ms: f64,
    pub tls_time_ms: f64,
    pub first_byte_time_ms: f64,
    pub download_speed_mbps: f64,
    /// Edge to origin DNS, as reported by the CDN
    pub upstream_dns_time_ms: f64,
    /// Edge to origin connect; 0 means the edge reused a connection
    pub upstream_connect_time_ms: f64,
    pub origin_first_byte_ms: f64,
    pub edge_first_byte_ms: f64,
    pub cache_status: Option<CacheStatus>,
    pub reused: bool,
}

/// Totals over a run, from which the summary figures are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_requests: u32,
    pub reused_count: u32,
    pub reused_total_time_ms: f64,
    pub new_total_time_ms: f64,
}

/// Output of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRun {
    pub samples: Vec<RequestSample>,
    pub stats: AggregateStats,
}
