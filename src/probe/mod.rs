pub mod aggregate;
pub mod executor;
pub mod runner;
pub mod sample;
pub mod server_timing;
pub mod service;
pub mod types;

pub use aggregate::SampleAggregator;
pub use executor::{HttpExecutor, RequestContext, DEFAULT_TIMEOUT_MS};
pub use runner::{run_probe, DEFAULT_TIMING_HEADER};
pub use sample::{build_sample, is_reused};
pub use server_timing::{parse_server_timing, CdnMetric, ServerTiming, TimingEntry, TimingValue};
pub use service::RequestExecutor;
pub use types::*;
