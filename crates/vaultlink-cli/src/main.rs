//! Vaultlink Gateway - HTTP API for encrypted file sharing

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vaultlink_cli::{run_server_with_shutdown, GatewayConfig};

#[derive(Parser, Debug)]
#[command(name = "vaultlink-gateway")]
#[command(about = "Vaultlink gateway - encrypted file sharing with expiring, one-time share links")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "VAULTLINK_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "VAULTLINK_PORT")]
    port: u16,

    /// Public origin used in share URLs (e.g. https://share.example.com)
    #[arg(long, env = "VAULTLINK_PUBLIC_URL")]
    public_url: Option<String>,

    /// Directory for stored objects; omit to keep data in memory
    #[arg(long, env = "VAULTLINK_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// JWT secret for authentication
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Disable authentication (development only)
    #[arg(long, env = "VAULTLINK_NO_AUTH")]
    no_auth: bool,

    /// Requests per second per principal
    #[arg(long, default_value = "100", env = "VAULTLINK_RATE_LIMIT_RPS")]
    rate_limit_rps: u32,

    /// Maximum request body size in bytes
    #[arg(long, default_value = "536870912", env = "VAULTLINK_MAX_BODY_SIZE")]
    max_body_size: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "vaultlink_cli={level},vaultlink_core={level},vaultlink_store={level},tower_http=info",
                level = log_level
            )
            .into()
        }))
        .with(fmt::layer())
        .init();

    if args.storage_root.is_none() {
        tracing::warn!("No storage root configured - objects will be lost on restart");
    }
    if args.no_auth {
        tracing::warn!("Authentication disabled - all owner requests act as dev-user");
    } else if args.jwt_secret.is_none() {
        anyhow::bail!("JWT_SECRET is required unless --no-auth is set");
    }

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        public_url: args.public_url,
        storage_root: args.storage_root,
        jwt_secret: args.jwt_secret,
        auth_enabled: !args.no_auth,
        rate_limit_rps: args.rate_limit_rps,
        max_body_size: args.max_body_size,
        ..Default::default()
    };

    run_server_with_shutdown(config, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
    })
    .await
}
