//! DNS resolution infrastructure.
//!
//! Provides a trait-based abstraction for DNS resolution, allowing the
//! executor to run against pinned addresses in tests.

use hickory_resolver::{config::*, TokioAsyncResolver};
use std::{collections::HashMap, net::IpAddr};

/// Trait for DNS resolution.
#[allow(async_fn_in_trait)]
pub trait DnsResolver: Send + Sync {
    /// Resolves a hostname to a non-empty list of IP addresses.
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, String>;
}

/// DNS resolver implementation using hickory-resolver (formerly trust-dns).
///
/// Owns its resolver, so the lookup cache lives exactly as long as the
/// executor holding it.
pub struct HickoryDnsResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryDnsResolver {
    /// Creates a new `HickoryDnsResolver` using the default upstream servers.
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for HickoryDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, String> {
        // Check if already an IP address
        if let Some(ip) = ip_literal(host) {
            return Ok(vec![ip]);
        }

        match self.resolver.lookup_ip(host).await {
            Ok(response) => {
                let ips: Vec<IpAddr> = response.iter().collect();
                if ips.is_empty() {
                    Err("DNS lookup returned no addresses".to_string())
                } else {
                    tracing::trace!(host, ?ips, "Resolved");
                    Ok(ips)
                }
            }
            Err(e) => Err(format!("DNS lookup failed: {}", e)),
        }
    }
}

/// Resolver answering from a fixed host table.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    hosts: HashMap<String, IpAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>, ip: IpAddr) -> Self {
        self.hosts.insert(host.into(), ip);
        self
    }
}

impl DnsResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, String> {
        if let Some(ip) = ip_literal(host) {
            return Ok(vec![ip]);
        }
        self.hosts
            .get(host)
            .map(|ip| vec![*ip])
            .ok_or_else(|| format!("No static entry for {}", host))
    }
}

/// Parses `host` as an IP address, accepting bracketed IPv6 as found in URLs.
fn ip_literal(host: &str) -> Option<IpAddr> {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .ok()
}
