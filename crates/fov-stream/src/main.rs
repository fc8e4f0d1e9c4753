//! # fov-stream
//!
//! Figure-8 position stream server binary: resolves settings, installs
//! logging and metrics, binds both listeners and runs until signalled.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fov_server::FovServer;
use fov_server::metrics::install_recorder;
use fov_server::shutdown::shutdown_signal;
use fov_settings::{FovSettings, load_settings_from_path, settings_path};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Figure-8 position stream server.
#[derive(Parser, Debug)]
#[command(name = "fov-stream", about = "Figure-8 position stream server")]
struct Cli {
    /// Settings file (defaults to `~/.fov/settings.json`).
    #[arg(long, env = "FOV_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind both listeners on.
    #[arg(long)]
    host: Option<String>,

    /// Streaming (`WebSocket`) port, 0 to auto-assign.
    #[arg(long)]
    stream_port: Option<u16>,

    /// HTTP (status + directory) port, 0 to auto-assign.
    #[arg(long)]
    http_port: Option<u16>,

    /// Hostname advertised in stream URLs.
    #[arg(long)]
    public_host: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,

    /// Do not install the Prometheus recorder.
    #[arg(long)]
    no_metrics: bool,
}

impl Cli {
    fn settings_file(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(settings_path)
    }

    /// Flags win over file and environment values.
    fn apply(&self, settings: &mut FovSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.stream_port {
            settings.server.stream_port = port;
        }
        if let Some(port) = self.http_port {
            settings.server.http_port = port;
        }
        if let Some(ref public_host) = self.public_host {
            settings.server.public_host.clone_from(public_host);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<FovSettings> {
    let path = cli.settings_file();
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn init_logging(settings: &FovSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init is a no-op if a global subscriber is already set
    let _ = if settings.logging.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings warnings are emitted before the configured subscriber exists.
    let settings = {
        let _guard = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .set_default();
        resolve_settings(&cli)?
    };
    init_logging(&settings);
    info!(config = %cli.settings_file().display(), "settings resolved");

    let mut server = FovServer::new(settings);
    if !cli.no_metrics {
        match install_recorder() {
            Ok(handle) => server = server.with_metrics(handle),
            Err(e) => warn!(error = %e, "metrics disabled"),
        }
    }

    let handle = server
        .listen()
        .await
        .context("Failed to start listeners")?;
    info!(
        stream_addr = %handle.stream_addr,
        http_addr = %handle.http_addr,
        stream_url = server.directory().stream_url(),
        "fov stream server ready"
    );

    shutdown_signal().await;
    server.shutdown_and_wait(handle).await;

    info!("Shutdown complete");
    Ok(())
}
