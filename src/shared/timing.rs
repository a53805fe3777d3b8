//! Timing utilities for HTTP request measurements.
//!
//! Phases are recorded as offsets from the start of the request, the way
//! curl reports `NAMELOOKUP_TIME`, `CONNECT_TIME`, `APPCONNECT_TIME` and
//! `STARTTRANSFER_TIME`: each value includes every phase before it.

use crate::probe::types::TransportTimings;
use std::time::Instant;

/// Rounds a value to one decimal place, half away from zero.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Milestones reached during one HTTP exchange.
///
/// Tracks when each phase of the request finished:
/// - DNS resolution
/// - TCP connection establishment
/// - TLS handshake (for HTTPS)
/// - Time to first byte (response head received)
/// - Body fully drained
#[derive(Debug)]
pub struct DetailedTiming {
    pub total_start: Instant,
    pub dns_end: Option<Instant>,
    pub tcp_end: Option<Instant>,
    pub tls_end: Option<Instant>,
    pub ttfb: Option<Instant>,
    pub download_end: Option<Instant>,
}

impl DetailedTiming {
    /// Creates a new `DetailedTiming` instance with the total timer started.
    pub fn new() -> Self {
        Self {
            total_start: Instant::now(),
            dns_end: None,
            tcp_end: None,
            tls_end: None,
            ttfb: None,
            download_end: None,
        }
    }

    /// Marks the end of name resolution.
    pub fn end_dns(&mut self) {
        self.dns_end = Some(Instant::now());
    }

    /// Marks the end of the TCP connect.
    pub fn end_tcp(&mut self) {
        self.tcp_end = Some(Instant::now());
    }

    /// Marks the end of the TLS handshake.
    pub fn end_tls(&mut self) {
        self.tls_end = Some(Instant::now());
    }

    /// Marks the time to first byte (TTFB).
    pub fn mark_ttfb(&mut self) {
        self.ttfb = Some(Instant::now());
    }

    /// Marks the end of the body download.
    pub fn end_download(&mut self) {
        self.download_end = Some(Instant::now());
    }

    fn offset_ms(&self, mark: Option<Instant>) -> f64 {
        mark.map(|m| m.duration_since(self.total_start).as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Converts the milestones into rounded millisecond offsets.
    ///
    /// A phase that never happened (TLS on plain HTTP) reports `0.0`.
    /// The total falls back to "now" when the download was not marked.
    pub fn to_transport_timings(&self, body_bytes: u64) -> TransportTimings {
        let total_secs = self
            .download_end
            .unwrap_or_else(Instant::now)
            .duration_since(self.total_start)
            .as_secs_f64();

        // bytes/s to megabits/s
        let download_speed_mbps = if total_secs > 0.0 {
            round_tenths(body_bytes as f64 / total_secs / 125_000.0)
        } else {
            0.0
        };

        TransportTimings {
            total_ms: round_tenths(total_secs * 1000.0),
            dns_ms: round_tenths(self.offset_ms(self.dns_end)),
            connect_ms: round_tenths(self.offset_ms(self.tcp_end)),
            tls_ms: round_tenths(self.offset_ms(self.tls_end)),
            first_byte_ms: round_tenths(self.offset_ms(self.ttfb)),
            download_speed_mbps,
            body_bytes,
        }
    }
}

impl Default for DetailedTiming {
    fn default() -> Self {
        Self::new()
    }
}
