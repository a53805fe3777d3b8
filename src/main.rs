use clap::{Parser, ValueEnum};
use edge_reuse_probe::{report, run_probe, Config, HttpExecutor, ProbeError, ProbeRun};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CDN URL, like https://d1fpng8gomo4sk.cloudfront.net
    #[arg(short, long)]
    url: String,

    /// Number of requests [default: 100, or PROBE_REQUESTS]
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    requests: Option<u32>,

    /// Per-request timeout in milliseconds [default: 30000, or PROBE_TIMEOUT_MS]
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Response header carrying the CDN timings
    #[arg(long, value_name = "NAME")]
    header: Option<String>,

    /// Regex the URL must match
    #[arg(long, value_name = "REGEX")]
    target_pattern: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log each request
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::from_env();
        config.url = self.url;
        if let Some(n) = self.requests {
            config.requests = n;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(header) = self.header {
            config.timing_header = header;
        }
        if let Some(pattern) = self.target_pattern {
            config.target_pattern = pattern;
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose {
        "edge_reuse_probe=debug"
    } else {
        "edge_reuse_probe=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format;
    let config = cli.into_config();

    let run = match probe(&config).await {
        Ok(run) => run,
        Err(e) => {
            tracing::debug!(code = e.code(), index = ?e.index(), "Probe failed");
            match format {
                Format::Text => eprintln!("{}", e),
                Format::Json => println!("{}", report::render_json_error(&e)),
            }
            return ExitCode::FAILURE;
        }
    };

    match format {
        Format::Text => println!("{}", report::render_text(&run)),
        Format::Json => match report::render_json(&run) {
            Ok(doc) => println!("{}", doc),
            Err(e) => {
                tracing::error!("Cannot encode report: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

/// Validates the configuration, then runs the whole probe with one executor
/// that is dropped as soon as the loop ends.
async fn probe(config: &Config) -> Result<ProbeRun, ProbeError> {
    config.validate()?;
    tracing::info!(url = %config.url, requests = config.requests, "Probing");

    let executor = HttpExecutor::new(&config.url, config.timeout)
        .map_err(ProbeError::from_setup)?;
    run_probe(&executor, config.requests, &config.timing_header).await
}
