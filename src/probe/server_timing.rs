//! Parser for the CDN `Server-Timing` header.
//!
//! The header is a comma-separated list of metrics, each either a bare name
//! (`cdn-cache-hit`) or a name followed by `;key=value` parameters
//! (`cdn-upstream-fbl;dur=12`). Four metrics carry the edge and origin
//! latencies this crate cares about; everything else is kept but not
//! interpreted.
//!
//! Durations are truncated to whole milliseconds: `dur=12.9` reads as `12`.
//! CloudFront only ever emits integers here, and reuse detection compares the
//! upstream connect time against exactly zero, so sub-millisecond precision
//! is deliberately discarded.

use super::types::CacheStatus;
use crate::error::ParseError;

/// The CDN-reported metrics a sample needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdnMetric {
    /// First byte latency between edge and client
    DownstreamFbl,
    /// Edge to origin DNS time
    UpstreamDns,
    /// Edge to origin TCP+TLS time
    UpstreamConnect,
    /// First byte latency between origin and edge
    UpstreamFbl,
}

impl CdnMetric {
    pub const ALL: [CdnMetric; 4] = [
        CdnMetric::DownstreamFbl,
        CdnMetric::UpstreamDns,
        CdnMetric::UpstreamConnect,
        CdnMetric::UpstreamFbl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CdnMetric::DownstreamFbl => "cdn-downstream-fbl",
            CdnMetric::UpstreamDns => "cdn-upstream-dns",
            CdnMetric::UpstreamConnect => "cdn-upstream-connect",
            CdnMetric::UpstreamFbl => "cdn-upstream-fbl",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// Value attached to one metric name.
#[derive(Debug, Clone, PartialEq)]
pub enum TimingValue {
    /// Whole milliseconds of a recognized metric.
    Millis(f64),
    /// `"true"` for bare flags, raw parameter text otherwise.
    Descriptor(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingEntry {
    pub name: String,
    pub value: TimingValue,
}

/// Parsed header, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerTiming {
    entries: Vec<TimingEntry>,
}

impl ServerTiming {
    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    /// Value of `name`. A repeated name resolves to its last occurrence.
    pub fn get(&self, name: &str) -> Option<&TimingValue> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }

    pub fn millis(&self, metric: CdnMetric) -> Option<f64> {
        match self.get(metric.name()) {
            Some(TimingValue::Millis(ms)) => Some(*ms),
            _ => None,
        }
    }

    pub fn cache_status(&self) -> Option<CacheStatus> {
        self.entries
            .iter()
            .rev()
            .find_map(|e| CacheStatus::from_flag(&e.name))
    }
}

/// Parses a raw `Server-Timing` value into a fresh `ServerTiming`.
pub fn parse_server_timing(raw: &str) -> Result<ServerTiming, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let entries = raw
        .split(',')
        .enumerate()
        .map(|(i, token)| parse_token(token.trim(), i + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ServerTiming { entries })
}

fn parse_token(token: &str, position: usize) -> Result<TimingEntry, ParseError> {
    let (name, rest) = match token.split_once(';') {
        Some((name, rest)) => (name.trim(), Some(rest)),
        None => (token, None),
    };
    if name.is_empty() {
        return Err(ParseError::EmptyToken { position });
    }

    // Only the recognized metrics need well-formed parameters.
    let value = match CdnMetric::from_name(name) {
        Some(metric) => {
            let params = rest
                .map(|rest| parse_params(name, rest))
                .transpose()?
                .unwrap_or_default();
            TimingValue::Millis(metric_millis(metric, &params)?)
        }
        None => match rest {
            Some(rest) => TimingValue::Descriptor(rest.trim().to_string()),
            None => TimingValue::Descriptor("true".to_string()),
        },
    };

    Ok(TimingEntry {
        name: name.to_string(),
        value,
    })
}

fn parse_params<'a>(metric: &str, rest: &'a str) -> Result<Vec<(&'a str, &'a str)>, ParseError> {
    rest.split(';')
        .map(str::trim)
        .map(|param| {
            param
                .split_once('=')
                .map(|(k, v)| (k.trim(), unquote(v.trim())))
                .ok_or_else(|| ParseError::BadParameter {
                    metric: metric.to_string(),
                    parameter: param.to_string(),
                })
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn metric_millis(metric: CdnMetric, params: &[(&str, &str)]) -> Result<f64, ParseError> {
    let find = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| *v)
    };
    let value = find("dur")
        .or_else(|| find("desc"))
        .ok_or(ParseError::MissingValue {
            metric: metric.name(),
        })?;

    let invalid = || ParseError::InvalidNumber {
        metric: metric.name(),
        value: value.to_string(),
    };
    let ms: f64 = value.parse().map_err(|_| invalid())?;
    if !ms.is_finite() || ms < 0.0 {
        return Err(invalid());
    }
    Ok(ms.trunc())
}
