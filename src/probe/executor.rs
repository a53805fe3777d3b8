//! HTTP request execution with detailed timing.
//!
//! Every call opens its own connection (DNS, TCP, optionally TLS), sends one
//! `GET` with `Connection: close`, drains the body without keeping it and
//! tears the connection down. The client-side phases are therefore always
//! measured on a cold connection, and whatever the CDN reports about its own
//! origin connection is the only reuse left in the picture.

use super::service::RequestExecutor;
use super::types::ProbeResponse;
use crate::error::TransportError;
use crate::infra::{connect_tls, create_tls_connector, DnsResolver, HickoryDnsResolver};
use crate::shared::DetailedTiming;
use http_body_util::{BodyExt, Empty};
use hyper::{
    body::{Bytes, Incoming},
    header::{ACCEPT, CONNECTION, HOST, USER_AGENT},
    HeaderMap, Request,
};
use hyper_util::rt::TokioIo;
use std::{collections::HashMap, net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    task::JoinHandle,
    time::timeout,
};
use tokio_rustls::TlsConnector;

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

const USER_AGENT_VALUE: &str = concat!("edge-reuse-probe/", env!("CARGO_PKG_VERSION"));

/// Where every request of a run goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub url: String,
    /// Host for DNS and SNI, without IPv6 brackets
    pub host: String,
    /// Value of the `Host` header
    pub host_header: String,
    pub port: u16,
    pub path: String,
    pub is_https: bool,
}

impl RequestContext {
    pub fn from_url(url: &str) -> Result<Self, TransportError> {
        let parsed_url = url::Url::parse(url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;

        let is_https = match parsed_url.scheme() {
            "https" => true,
            "http" => false,
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    other
                )))
            }
        };

        let host_str = parsed_url
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl("URL has no host".to_string()))?;
        let host = host_str
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        let port = parsed_url.port().unwrap_or(if is_https { 443 } else { 80 });
        let host_header = match parsed_url.port() {
            Some(p) => format!("{}:{}", host_str, p),
            None => host_str.to_string(),
        };

        let path = match parsed_url.query() {
            Some(query) => format!("{}?{}", parsed_url.path(), query),
            None => parsed_url.path().to_string(),
        };
        let path = if path.is_empty() { "/".to_string() } else { path };

        Ok(Self {
            url: url.to_string(),
            host,
            host_header,
            port,
            path,
            is_https,
        })
    }
}

/// Aborts the connection task when the exchange ends, however it ends.
struct ConnectionGuard(JoinHandle<()>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The network-backed executor. Created once per run; dropping it releases
/// the resolver and TLS configuration.
pub struct HttpExecutor<R = HickoryDnsResolver> {
    ctx: RequestContext,
    resolver: R,
    tls: Option<TlsConnector>,
    request_timeout: Duration,
}

impl HttpExecutor<HickoryDnsResolver> {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, TransportError> {
        Self::with_resolver(url, request_timeout, HickoryDnsResolver::new())
    }
}

impl<R: DnsResolver> HttpExecutor<R> {
    pub fn with_resolver(
        url: &str,
        request_timeout: Duration,
        resolver: R,
    ) -> Result<Self, TransportError> {
        let ctx = RequestContext::from_url(url)?;
        let tls = if ctx.is_https {
            Some(create_tls_connector()?)
        } else {
            None
        };

        Ok(Self {
            ctx,
            resolver,
            tls,
            request_timeout,
        })
    }

    async fn execute_once(&self) -> Result<ProbeResponse, TransportError> {
        let mut timing = DetailedTiming::new();

        // DNS Resolution
        let ips = self
            .resolver
            .resolve(&self.ctx.host)
            .await
            .map_err(TransportError::Dns)?;
        timing.end_dns();

        let ip = ips
            .first()
            .copied()
            .ok_or_else(|| TransportError::Dns("DNS lookup returned no addresses".to_string()))?;
        let addr = SocketAddr::new(ip, self.ctx.port);

        // TCP Connection
        let tcp_stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::Connect)?;
        timing.end_tcp();
        tracing::trace!(%addr, "Connected");

        match &self.tls {
            Some(connector) => {
                let tls_stream = connect_tls(connector, tcp_stream, &self.ctx.host).await?;
                timing.end_tls();
                self.exchange(tls_stream, timing).await
            }
            None => self.exchange(tcp_stream, timing).await,
        }
    }

    async fn exchange<S>(
        &self,
        stream: S,
        mut timing: DetailedTiming,
    ) -> Result<ProbeResponse, TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        let _guard = ConnectionGuard(tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("Connection error: {}", e);
            }
        }));

        let req = build_http_request(&self.ctx)?;
        let response = sender.send_request(req).await?;
        timing.mark_ttfb();

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let headers = collect_headers(response.headers());

        let body_bytes = drain_body(response.into_body()).await?;
        timing.end_download();

        Ok(ProbeResponse {
            status: status.as_u16(),
            timings: timing.to_transport_timings(body_bytes),
            headers,
        })
    }
}

impl<R: DnsResolver> RequestExecutor for HttpExecutor<R> {
    async fn execute(&self) -> Result<ProbeResponse, TransportError> {
        timeout(self.request_timeout, self.execute_once())
            .await
            .map_err(|_| TransportError::Timeout(self.request_timeout))?
    }
}

/// Builds the probe `GET` for `ctx`.
fn build_http_request(ctx: &RequestContext) -> Result<Request<Empty<Bytes>>, TransportError> {
    Request::builder()
        .method("GET")
        .uri(ctx.path.as_str())
        .header(HOST, ctx.host_header.as_str())
        .header(USER_AGENT, USER_AGENT_VALUE)
        .header(ACCEPT, "*/*")
        .header(CONNECTION, "close")
        .body(Empty::new())
        .map_err(|e| TransportError::InvalidUrl(format!("Failed to build request: {}", e)))
}

/// Flattens response headers into lower-cased names and trimmed values.
/// Repeated headers are joined with `", "`.
fn collect_headers(map: &HeaderMap) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in map {
        let name = name.as_str().to_ascii_lowercase();
        let value = String::from_utf8_lossy(value.as_bytes()).trim().to_string();
        match headers.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                headers.insert(name, value);
            }
        }
    }
    headers
}

/// Reads the body to the end, counting bytes without keeping them.
async fn drain_body(mut body: Incoming) -> Result<u64, hyper::Error> {
    let mut bytes = 0u64;
    while let Some(frame) = body.frame().await {
        if let Some(data) = frame?.data_ref() {
            bytes += data.len() as u64;
        }
    }
    Ok(bytes)
}
