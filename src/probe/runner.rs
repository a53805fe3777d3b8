use super::aggregate::SampleAggregator;
use super::sample::build_sample;
use super::server_timing::parse_server_timing;
use super::service::RequestExecutor;
use super::types::ProbeRun;
use crate::error::{ProbeError, Result};

/// Header carrying the CDN timings unless configured otherwise.
pub const DEFAULT_TIMING_HEADER: &str = "server-timing";

/// Issues `requests` requests one after another and turns each into a
/// sample.
///
/// The first failure of any kind ends the run; no partial result is
/// returned. `timing_header` is matched case-insensitively.
pub async fn run_probe<E: RequestExecutor>(
    executor: &E,
    requests: u32,
    timing_header: &str,
) -> Result<ProbeRun> {
    let header = timing_header.to_ascii_lowercase();
    let mut aggregator = SampleAggregator::new();
    let mut samples = Vec::new();

    tracing::info!(requests, "Starting probe run");

    for index in 1..=requests {
        let response = executor
            .execute()
            .await
            .map_err(|source| ProbeError::Transport { index, source })?;

        let raw = response
            .headers
            .get(&header)
            .ok_or_else(|| ProbeError::MissingTimingHeader {
                index,
                header: header.clone(),
            })?;

        let server_timing =
            parse_server_timing(raw).map_err(|source| ProbeError::MalformedTimingHeader {
                index,
                raw: raw.clone(),
                source,
            })?;

        let sample = build_sample(index, &response.timings, &server_timing)?;
        tracing::debug!(
            index,
            total_ms = sample.total_time_ms,
            upstream_connect_ms = sample.upstream_connect_time_ms,
            reused = sample.reused,
            "Request complete"
        );

        aggregator.record(&sample);
        samples.push(sample);
    }

    let stats = aggregator.finish();
    tracing::info!(
        total = stats.total_requests,
        reused = stats.reused_count,
        "Probe run finished"
    );

    Ok(ProbeRun { samples, stats })
}
