pub mod config;
pub mod error;
pub mod infra;
pub mod probe;
pub mod report;
pub mod shared;

pub use config::Config;
pub use error::{ParseError, ProbeError, TransportError};
pub use probe::{run_probe, AggregateStats, HttpExecutor, ProbeRun, RequestSample};
