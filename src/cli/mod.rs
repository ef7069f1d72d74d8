use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Map};

use crate::auth::IdentityClaim;
use crate::config::{AppConfig, StoreBackend};
use crate::database::{Collection, DatabaseManager, DocumentStore, Filter, PgDocumentStore};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "bistro-api")]
#[command(about = "Bistro API - restaurant backend server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Print a signed access token for an email")]
    Token {
        #[arg(help = "Email to embed in the token")]
        email: String,
    },

    #[command(about = "Grant the admin role to an existing user")]
    Promote {
        #[arg(help = "Email of the user to promote")]
        email: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Token { email } => token(config, &email),
        Commands::Promote { email } => promote(config, &email).await,
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    tracing::info!("Starting Bistro API in {:?} mode", config.environment);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let state = AppState::from_config(config).await?;
    let store = state.store.clone();
    let app = crate::routes::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;
    tracing::info!("Bistro API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, closing store");
    store.close().await;
    Ok(())
}

fn token(config: AppConfig, email: &str) -> anyhow::Result<()> {
    let tokens = crate::auth::TokenService::new(&config.security.jwt_secret, config.token_ttl())?;
    println!("{}", tokens.issue(&IdentityClaim::new(email))?);
    Ok(())
}

async fn promote(config: AppConfig, email: &str) -> anyhow::Result<()> {
    if config.database.backend == StoreBackend::Memory {
        anyhow::bail!("promote needs a persistent store; set DATABASE_URL");
    }

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::ensure_schema(&pool).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool));

    let mut set = Map::new();
    set.insert("role".to_string(), json!("admin"));
    let result = store
        .update_one(Collection::Users, &Filter::field("email", email), set, false)
        .await;
    store.close().await;

    let result = result?;
    if result.matched_count == 0 {
        anyhow::bail!("no user registered with email {}", email);
    }
    println!("{} is now an admin", email);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
