//! Executor abstraction layer.
//!
//! The driver loop only needs "perform the next request"; keeping that behind
//! a trait lets it run against scripted responses as well as the network.

use super::types::ProbeResponse;
use crate::error::TransportError;

/// Trait for anything that can perform one probe request.
#[allow(async_fn_in_trait)]
pub trait RequestExecutor {
    /// Performs one complete request. The returned response must be fully
    /// received (body drained) before this resolves.
    async fn execute(&self) -> Result<ProbeResponse, TransportError>;
}
