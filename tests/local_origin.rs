//! Runs the network executor against a scripted HTTP/1.1 origin on loopback.

use edge_reuse_probe::infra::StaticResolver;
use edge_reuse_probe::probe::{run_probe, HttpExecutor, RequestExecutor, DEFAULT_TIMING_HEADER};
use edge_reuse_probe::{ProbeError, TransportError};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const REUSED: &str = "cdn-cache-hit,cdn-upstream-dns;dur=0,cdn-upstream-connect;dur=0,cdn-upstream-fbl;dur=12,cdn-downstream-fbl;dur=14";
const NEW: &str = "cdn-cache-miss,cdn-upstream-dns;dur=2,cdn-upstream-connect;dur=38,cdn-upstream-fbl;dur=75,cdn-downstream-fbl;dur=77";

#[derive(Clone, Default)]
struct Reply {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    body: Vec<u8>,
    stall: bool,
}

impl Reply {
    fn ok(server_timing: &'static str) -> Self {
        Self {
            status: 200,
            headers: vec![("server-timing", server_timing)],
            body: vec![b'x'; 4096],
            ..Default::default()
        }
    }
}

/// Loopback origin answering one scripted reply per accepted connection.
struct Origin {
    port: u16,
    /// Lower-cased request heads, one per connection
    requests: Arc<Mutex<Vec<String>>>,
}

impl Origin {
    fn url(&self) -> String {
        format!("http://origin.test:{}/asset.bin", self.port)
    }

    fn connections(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn spawn_origin(script: Vec<Reply>) -> Origin {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        for reply in script {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let head = read_head(&mut socket).await;
            seen.lock().unwrap().push(head);

            if reply.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
                continue;
            }

            let mut response = format!(
                "HTTP/1.1 {} X\r\ncontent-length: {}\r\nconnection: close\r\n",
                reply.status,
                reply.body.len()
            );
            for (name, value) in &reply.headers {
                response.push_str(&format!("{}: {}\r\n", name, value));
            }
            response.push_str("\r\n");

            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.write_all(&reply.body).await;
            let _ = socket.shutdown().await;
        }
    });

    Origin { port, requests }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf).to_lowercase()
}

fn executor(origin: &Origin, timeout: Duration) -> HttpExecutor<StaticResolver> {
    let resolver =
        StaticResolver::new().with_host("origin.test", IpAddr::V4(Ipv4Addr::LOCALHOST));
    HttpExecutor::with_resolver(&origin.url(), timeout, resolver).unwrap()
}

#[tokio::test]
async fn test_full_run_classifies_each_request() {
    let origin = spawn_origin(vec![Reply::ok(NEW), Reply::ok(REUSED), Reply::ok(REUSED)]).await;
    let executor = executor(&origin, Duration::from_secs(5));

    let run = run_probe(&executor, 3, DEFAULT_TIMING_HEADER).await.unwrap();

    let reused: Vec<bool> = run.samples.iter().map(|s| s.reused).collect();
    assert_eq!(reused, vec![false, true, true]);
    let indices: Vec<u32> = run.samples.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    assert_eq!(run.stats.total_requests, 3);
    assert_eq!(run.stats.reused_count, 2);
    assert!(run.stats.avg_reused_ms().is_some());
    assert!(run.stats.avg_new_ms().is_some());

    assert_eq!(run.samples[0].upstream_connect_time_ms, 38.0);
    assert_eq!(run.samples[0].origin_first_byte_ms, 75.0);
    assert_eq!(run.samples[1].edge_first_byte_ms, 14.0);
}

#[tokio::test]
async fn test_every_request_uses_a_fresh_connection() {
    let origin = spawn_origin(vec![Reply::ok(REUSED), Reply::ok(REUSED)]).await;
    let executor = executor(&origin, Duration::from_secs(5));

    run_probe(&executor, 2, DEFAULT_TIMING_HEADER).await.unwrap();

    assert_eq!(origin.connections(), 2);
    let requests = origin.requests.lock().unwrap();
    for head in requests.iter() {
        assert!(head.starts_with("get /asset.bin http/1.1"));
        assert!(head.contains("connection: close"));
        assert!(head.contains(&format!("host: origin.test:{}", origin.port)));
    }
}

#[tokio::test]
async fn test_transport_timings_are_cumulative() {
    let origin = spawn_origin(vec![Reply::ok(REUSED)]).await;
    let executor = executor(&origin, Duration::from_secs(5));

    let response = executor.execute().await.unwrap();
    let t = &response.timings;

    assert_eq!(response.status, 200);
    assert_eq!(t.body_bytes, 4096);
    assert_eq!(t.tls_ms, 0.0);
    assert!(t.connect_ms >= t.dns_ms);
    assert!(t.first_byte_ms >= t.connect_ms);
    assert!(t.total_ms >= t.first_byte_ms);
    assert!(t.download_speed_mbps >= 0.0);
    assert_eq!(
        response.headers.get("server-timing").map(String::as_str),
        Some(REUSED)
    );
}

#[tokio::test]
async fn test_missing_header_aborts_at_second_request() {
    let origin = spawn_origin(vec![
        Reply::ok(REUSED),
        Reply {
            status: 200,
            body: b"no timing".to_vec(),
            ..Default::default()
        },
        Reply::ok(REUSED),
    ])
    .await;
    let executor = executor(&origin, Duration::from_secs(5));

    let err = run_probe(&executor, 3, DEFAULT_TIMING_HEADER)
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::MissingTimingHeader { index: 2, .. }));
    assert_eq!(origin.connections(), 2);
}

#[tokio::test]
async fn test_split_server_timing_lines_are_combined() {
    let origin = spawn_origin(vec![Reply {
        status: 200,
        headers: vec![
            ("server-timing", "cdn-cache-miss,cdn-upstream-dns;dur=4"),
            ("server-timing", "cdn-upstream-connect;dur=0"),
            (
                "server-timing",
                "cdn-upstream-fbl;dur=30,cdn-downstream-fbl;dur=31",
            ),
        ],
        body: b"ok".to_vec(),
        ..Default::default()
    }])
    .await;
    let executor = executor(&origin, Duration::from_secs(5));

    let run = run_probe(&executor, 1, DEFAULT_TIMING_HEADER).await.unwrap();
    assert!(run.samples[0].reused);
    assert_eq!(run.samples[0].upstream_dns_time_ms, 4.0);
}

#[tokio::test]
async fn test_error_status_is_fatal() {
    let origin = spawn_origin(vec![Reply {
        status: 503,
        headers: vec![("server-timing", REUSED)],
        body: b"busy".to_vec(),
        ..Default::default()
    }])
    .await;
    let executor = executor(&origin, Duration::from_secs(5));

    let err = run_probe(&executor, 5, DEFAULT_TIMING_HEADER)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Transport {
            index: 1,
            source: TransportError::Status(503)
        }
    ));
}

#[tokio::test]
async fn test_unresponsive_origin_times_out() {
    let origin = spawn_origin(vec![Reply {
        stall: true,
        ..Default::default()
    }])
    .await;
    let executor = executor(&origin, Duration::from_millis(200));

    let err = run_probe(&executor, 1, DEFAULT_TIMING_HEADER)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Transport {
            index: 1,
            source: TransportError::Timeout(_)
        }
    ));
    assert_eq!(err.code(), "TIMEOUT");
}

#[tokio::test]
async fn test_unknown_host_is_a_dns_failure() {
    let origin = spawn_origin(Vec::new()).await;
    let executor = HttpExecutor::with_resolver(
        &origin.url(),
        Duration::from_secs(1),
        StaticResolver::new(),
    )
    .unwrap();

    let err = run_probe(&executor, 1, DEFAULT_TIMING_HEADER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProbeError::Transport {
            index: 1,
            source: TransportError::Dns(_)
        }
    ));
}
