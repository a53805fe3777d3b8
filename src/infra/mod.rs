//! Infrastructure layer providing abstractions for external dependencies.
//!
//! This module contains traits and implementations for:
//! - DNS resolution
//! - TLS/SSL connections

pub mod dns;
pub mod tls;

pub use dns::{DnsResolver, HickoryDnsResolver, StaticResolver};
pub use tls::{connect_tls, create_tls_config, create_tls_connector};
