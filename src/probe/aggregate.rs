use super::types::{AggregateStats, RequestSample};
use crate::shared::round_tenths;

/// Running totals fed one sample at a time, in request order.
#[derive(Debug, Default)]
pub struct SampleAggregator {
    stats: AggregateStats,
}

impl SampleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: &RequestSample) {
        self.stats.total_requests += 1;
        if sample.reused {
            self.stats.reused_count += 1;
            self.stats.reused_total_time_ms += sample.total_time_ms;
        } else {
            self.stats.new_total_time_ms += sample.total_time_ms;
        }
    }

    pub fn finish(self) -> AggregateStats {
        self.stats
    }
}

impl AggregateStats {
    /// Folds a whole sample sequence.
    pub fn from_samples(samples: &[RequestSample]) -> Self {
        let mut aggregator = SampleAggregator::new();
        for sample in samples {
            aggregator.record(sample);
        }
        aggregator.finish()
    }

    pub fn new_count(&self) -> u32 {
        self.total_requests - self.reused_count
    }

    /// Mean total time of requests the edge served over a reused origin
    /// connection. `None` when there were none.
    pub fn avg_reused_ms(&self) -> Option<f64> {
        (self.reused_count > 0).then(|| self.reused_total_time_ms / f64::from(self.reused_count))
    }

    /// Mean total time of requests that needed a new origin connection.
    pub fn avg_new_ms(&self) -> Option<f64> {
        let new_count = self.new_count();
        (new_count > 0).then(|| self.new_total_time_ms / f64::from(new_count))
    }

    /// How much faster reused connections were, as a percentage of the new
    /// connection average, to one decimal.
    pub fn latency_gain_percent(&self) -> Option<f64> {
        let reused = self.avg_reused_ms()?;
        let new = self.avg_new_ms()?;
        if new == 0.0 {
            return None;
        }
        Some(round_tenths(100.0 - reused / new * 100.0))
    }
}
