use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use galleria_gallery::ReconcileWorker;
use galleria_server::api::{self, AppState};
use galleria_server::config::GalleriaConfig;
use galleria_server::maintenance;

/// Galleria image gallery server.
#[derive(Parser, Debug)]
#[command(name = "galleria-server", about = "HTTP and WebSocket server for Galleria")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "galleria.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run metadata store migrations, then exit.
    Migrate,
    /// Delete stored blobs that no image record references, then exit.
    Reconcile {
        /// Report orphans without deleting them.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = Path::new(&cli.config);
    let config = GalleriaConfig::load(config_path)?;

    match cli.command {
        Some(Commands::Migrate) => {
            galleria_server::telemetry::init_fmt_only();
            return Ok(maintenance::migrate(&config).await?);
        }
        Some(Commands::Reconcile { dry_run }) => {
            galleria_server::telemetry::init_fmt_only();
            return run_reconcile(&config, dry_run).await;
        }
        None => {}
    }

    // Must happen after config is loaded so we know whether OTel is enabled.
    let telemetry_guard = galleria_server::telemetry::init(&config.telemetry);

    if !config_path.exists() {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    if config.has_volatile_metadata() {
        warn!(
            blob_dir = %config.blob.dir,
            "memory metadata store with filesystem blobs: image records are lost on restart \
             while their files remain"
        );
    }

    let (gallery, blobs) = maintenance::build_gallery(&config).await?;
    let gallery = Arc::new(gallery);

    // Periodic orphan reconciliation, if configured and safe.
    let reconcile_shutdown = match config.reconcile.interval_seconds {
        Some(secs) if secs > 0 && config.has_volatile_metadata() => {
            warn!(
                interval_secs = secs,
                "reconcile worker disabled: metadata is not durable but blobs are"
            );
            None
        }
        Some(secs) if secs > 0 => {
            let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
            let worker =
                ReconcileWorker::new(gallery.reconciler(), Duration::from_secs(secs), shutdown_rx);
            tokio::spawn(worker.run());
            Some(shutdown_tx)
        }
        _ => None,
    };

    let state = AppState {
        gallery: Arc::clone(&gallery),
        blobs: blobs.store,
        uploads_dir: blobs.root,
        upload_field: Arc::from(config.upload.field_name.as_str()),
        max_upload_bytes: config.upload.max_bytes,
    };
    let app = api::router(state);

    // CLI overrides take precedence.
    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "galleria-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(tx) = reconcile_shutdown {
        let _ = tx.send(()).await;
    }

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    info!(
        timeout_secs = config.server.shutdown_timeout_seconds,
        "waiting for in-flight uploads..."
    );
    if tokio::time::timeout(shutdown_timeout, gallery.shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            "shutdown timeout exceeded, some uploads may be left as orphans"
        );
    }

    telemetry_guard.shutdown();

    info!("galleria-server shut down");
    Ok(())
}

/// Run the `reconcile` subcommand: one orphan sweep, then exit.
async fn run_reconcile(
    config: &GalleriaConfig,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = maintenance::reconcile_once(config, dry_run).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
