use super::server_timing::{CdnMetric, ServerTiming};
use super::types::{RequestSample, TransportTimings};
use crate::error::{ProbeError, Result};

/// Combines one request's transport timings with the CDN metrics parsed from
/// that same request's header.
///
/// All four CDN metrics must be present; a missing one is an error rather
/// than a gap to be filled from an earlier request.
pub fn build_sample(
    index: u32,
    timings: &TransportTimings,
    server_timing: &ServerTiming,
) -> Result<RequestSample> {
    let (
        Some(upstream_dns_time_ms),
        Some(upstream_connect_time_ms),
        Some(origin_first_byte_ms),
        Some(edge_first_byte_ms),
    ) = (
        server_timing.millis(CdnMetric::UpstreamDns),
        server_timing.millis(CdnMetric::UpstreamConnect),
        server_timing.millis(CdnMetric::UpstreamFbl),
        server_timing.millis(CdnMetric::DownstreamFbl),
    )
    else {
        let missing = CdnMetric::ALL
            .into_iter()
            .filter(|m| server_timing.millis(*m).is_none())
            .map(CdnMetric::name)
            .collect();
        return Err(ProbeError::IncompleteTimingData { index, missing });
    };

    Ok(RequestSample {
        index,
        total_time_ms: timings.total_ms,
        dns_time_ms: timings.dns_ms,
        connect_time_ms: timings.connect_ms,
        tls_time_ms: timings.tls_ms,
        first_byte_time_ms: timings.first_byte_ms,
        download_speed_mbps: timings.download_speed_mbps,
        upstream_dns_time_ms,
        upstream_connect_time_ms,
        origin_first_byte_ms,
        edge_first_byte_ms,
        cache_status: server_timing.cache_status(),
        reused: is_reused(upstream_connect_time_ms),
    })
}

/// The edge reused an origin connection iff it spent exactly no time
/// connecting upstream.
#[allow(clippy::float_cmp)]
pub fn is_reused(upstream_connect_time_ms: f64) -> bool {
    upstream_connect_time_ms == 0.0
}
