//! School catalog server.
//!
//! Serves the create/list pages and the distance-ranked listing, falling back
//! to IP geolocation when the caller does not post a coordinate.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

use schoolmap::config::{Config, StoreBackend};
use schoolmap::geolocation::PresencePolicy;
use schoolmap::routes::router;
use schoolmap::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "School catalog server with distance ranking")]
struct Args {
    /// TOML config file; flags below override it
    #[arg(short, long, env = "SCHOOLMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Listen port on all interfaces (ignored when --listen is given)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Directory served for unmatched paths
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// MySQL host
    #[arg(long, env = "DB_HOST")]
    db_host: Option<String>,

    /// MySQL port
    #[arg(long, env = "DB_PORT")]
    db_port: Option<u16>,

    /// MySQL user
    #[arg(long, env = "DB_USER")]
    db_user: Option<String>,

    /// MySQL database
    #[arg(long, env = "DB_NAME")]
    db_name: Option<String>,

    /// MySQL password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    /// Connection pool size
    #[arg(long, env = "DB_POOL_SIZE")]
    pool_size: Option<u32>,

    /// Keep schools in memory instead of MySQL
    #[arg(long)]
    memory_store: bool,

    /// IP geolocation endpoint
    #[arg(long, env = "GEOLOCATION_URL")]
    geolocation_url: Option<Url>,

    /// Treat posted coordinates equal to 0 as missing
    #[arg(long)]
    truthy_coordinates: bool,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(listen) = self.listen {
            config.server.listen = listen;
        } else if let Some(port) = self.port {
            config.server.listen = format!("0.0.0.0:{}", port);
        }
        if let Some(dir) = self.static_dir {
            config.server.static_dir = dir;
        }

        if let Some(host) = self.db_host {
            config.store.host = host;
        }
        if let Some(port) = self.db_port {
            config.store.port = port;
        }
        if let Some(user) = self.db_user {
            config.store.user = user;
        }
        if let Some(database) = self.db_name {
            config.store.database = database;
        }
        if self.db_password.is_some() {
            config.store.password = self.db_password;
        }
        if let Some(size) = self.pool_size {
            config.store.pool_size = size;
        }
        if self.memory_store {
            config.store.backend = StoreBackend::Memory;
        }

        if let Some(url) = self.geolocation_url {
            config.geolocation.endpoint = url;
        }
        if self.truthy_coordinates {
            config.geolocation.presence = PresencePolicy::Truthy;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    info!("Schoolmap server");

    let shutdown = CancellationToken::new();
    let state = AppState::from_config(&config, shutdown.clone()).await?;
    let app = router(state.clone(), &config.server.static_dir);

    info!("Starting server on {}", config.server.listen);

    let listener = TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    state.store.close().await;
    info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels in-flight geolocation backoffs.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    shutdown.cancel();
}
