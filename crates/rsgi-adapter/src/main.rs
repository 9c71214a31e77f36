//! rsgi-adapter demo: one request through the whole adapter.
//!
//! Runs the built-in demo application behind the adapter on the in-memory
//! loopback host: lifespan startup, a single request, lifespan shutdown.
//! Handy for watching the adapter's logs and for checking which host
//! operation a given response turns into.
//!
//! # Usage
//!
//! ```text
//! rsgi-adapter-demo [OPTIONS]
//!
//! Options:
//!   --config <FILE>            TOML adapter configuration
//!   --method <METHOD>          Request method [default: GET]
//!   --path <PATH>              Request path [default: /]
//!   --query <QUERY>            Raw query string
//!   --header <NAME=VALUE>      Request header (repeatable)
//!   --body <TEXT>              Request body chunk (repeatable)
//!   --file <FILE>              File served on /file [default: Cargo.toml]
//!   --abort-on-lifespan-error  Refuse to serve if lifespan startup fails
//!   --debug                    Debug-level adapter logs
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                       | Description                          |
//! |--------------------------------|--------------------------------------|
//! | `RSGI_ADAPTER_CONFIG`          | Path to the TOML configuration       |
//! | `RSGI_ADAPTER_DEBUG`           | `1`/`true` turns on debug logging    |
//! | `RSGI_ADAPTER_ABORT_ON_LIFESPAN_ERROR` | same as the flag             |
//! | `RUST_LOG`                     | full `tracing` filter, wins over all |
//!
//! # Try it
//!
//! ```text
//! rsgi-adapter-demo --path /stream
//! rsgi-adapter-demo --path /echo --body "hello " --body world
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use rsgi_adapter::application::{demo::DemoApp, RsgiBridge};
use rsgi_adapter::domain::AdapterConfig;
use rsgi_adapter::infrastructure::{init_tracing, LoopbackProtocol};
use rsgi_core::ServerScope;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drives one request through the adapter against the demo application.
#[derive(Debug, Parser)]
#[command(
    name = "rsgi-adapter-demo",
    about = "Runs one request through the AppProtocol-on-ServerProtocol adapter",
    version
)]
struct Cli {
    /// TOML configuration file; defaults apply when absent.
    #[arg(long, env = "RSGI_ADAPTER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, default_value = "GET")]
    method: String,

    #[arg(long, default_value = "/")]
    path: String,

    /// Raw query string, without the leading `?`.
    #[arg(long)]
    query: Option<String>,

    /// Request header as `name=value`; may be repeated.
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Request body chunk; may be repeated to send several chunks.
    #[arg(long = "body")]
    body: Vec<String>,

    /// File the demo application serves on `/file`.
    #[arg(long, default_value = "Cargo.toml")]
    file: PathBuf,

    #[arg(long, env = "RSGI_ADAPTER_ABORT_ON_LIFESPAN_ERROR")]
    abort_on_lifespan_error: bool,

    #[arg(long)]
    debug: bool,
}

/// Parses `name=value`.
fn parse_header(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))
}

impl Cli {
    /// Loads the configuration file (if any), then applies the environment
    /// and the command-line flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    fn adapter_config(&self) -> anyhow::Result<AdapterConfig> {
        let mut config = match &self.config {
            Some(path) => AdapterConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => AdapterConfig::default(),
        }
        .with_env_overrides();

        if self.abort_on_lifespan_error {
            config.abort_on_lifespan_error = true;
        }
        if self.debug {
            config.debug = true;
        }
        Ok(config)
    }

    /// The scope a real host server would hand over for this request.
    fn server_scope(&self) -> ServerScope {
        ServerScope {
            proto: "http".to_string(),
            http_version: "1.1".to_string(),
            server: Some("127.0.0.1:8000".to_string()),
            client: Some("127.0.0.1:50000".to_string()),
            scheme: "http".to_string(),
            method: self.method.to_ascii_uppercase(),
            path: Some(self.path.clone()),
            query_string: self.query.clone(),
            headers: Some(self.headers.clone()),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.adapter_config()?;

    init_tracing(&config);
    info!(?config, "rsgi-adapter demo starting");

    let mut bridge = RsgiBridge::new(DemoApp::new(cli.file.clone()), config);
    let lifespan = bridge.startup().await.context("lifespan startup")?;
    info!(%lifespan, "lifespan startup finished");

    let scope = cli.server_scope();
    let chunks = cli.body.iter().map(|chunk| chunk.clone().into()).collect();
    let protocol = Arc::new(LoopbackProtocol::new(chunks));
    let emission = bridge
        .handle(Some(&scope), protocol.clone())
        .await
        .context("handling request")?;

    println!("emission: {}", emission.label());
    match protocol.response() {
        Some(response) => {
            println!("status: {}", response.status);
            for (name, value) in &response.headers {
                println!("{name}: {value}");
            }
            println!("operation: {:?}", response.op);
            println!();
            println!("{}", String::from_utf8_lossy(&response.body()));
        }
        None => println!("no response was sent"),
    }

    bridge.shutdown().await;
    info!("rsgi-adapter demo stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
