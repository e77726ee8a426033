mod auth;
mod cli;
mod config;
mod error;
mod handlers;
mod services;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use relaydir_db::repositories::access_log_repo::AccessLogRepository;
use relaydir_db::repositories::credential_repo::CredentialRepository;
use relaydir_db::repositories::node_repo::NodeRepository;
use services::access_logger::AccessLogger;
use services::credential_service::CredentialService;
use services::geo_service::GeoService;
use services::node_service::NodeService;
use services::peer_selector::PeerSelector;
use services::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub nodes: NodeService,
    pub peer_selector: PeerSelector,
    pub rate_limiter: RateLimiter,
    pub access_logger: AccessLogger,
    pub access_log: AccessLogRepository,
    pub credentials: CredentialService,
}

#[derive(Parser)]
#[command(name = "relaydir-server", about = "Relay node registry and discovery backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create or reset an admin account password.
    ResetPassword { username: String, password: String },
    /// Install a systemd unit for this binary.
    InstallService,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::ResetPassword { username, password } => {
            let config = Config::from_env()?;
            let pool = relaydir_db::connect(&config.database_url).await?;
            cli::reset_password(&pool, &username, &password).await
        }
        Command::InstallService => cli::install_service(),
    }
}

async fn serve() -> Result<()> {
    let config = Config::from_env()?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    info!("Connecting to database");
    let pool = relaydir_db::connect(&config.database_url).await?;

    let node_repo = NodeRepository::new(pool.clone());
    let credential_repo = CredentialRepository::new(pool.clone());
    let access_log_repo = AccessLogRepository::new(pool.clone());
    let geo = GeoService::new(config.geoip_db_path.as_deref());

    let state = AppState {
        pool: pool.clone(),
        jwt_secret: config.jwt_secret.clone(),
        nodes: NodeService::new(node_repo.clone(), geo),
        peer_selector: PeerSelector::new(node_repo),
        rate_limiter: RateLimiter::new(credential_repo.clone(), access_log_repo.clone()),
        access_logger: AccessLogger::new(access_log_repo.clone(), credential_repo.clone()),
        access_log: access_log_repo,
        credentials: CredentialService::new(credential_repo),
    };

    let app = handlers::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Relaydir listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relaydir stopped");
    Ok(())
}

fn init_tracing(log_dir: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "relaydir.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        }
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Shutdown signal received");
}
