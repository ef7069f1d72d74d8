use std::sync::Arc;

use crate::auth::{RoleStore, TokenService};
use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseManager, DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::services::{PaymentGateway, StripeGateway};

/// Dependencies shared by every request, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub roles: RoleStore,
    pub store: Arc<dyn DocumentStore>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Assemble state from already-constructed collaborators
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        payments: Arc<dyn PaymentGateway>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.security.jwt_secret, config.token_ttl())?;
        let roles = RoleStore::new(store.clone(), config.role_lookup_timeout());

        Ok(Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            roles,
            store,
            payments,
        })
    }

    /// Connect the configured store and payment provider
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;

        let store: Arc<dyn DocumentStore> = match config.database.backend {
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                DatabaseManager::ensure_schema(&pool).await?;
                Arc::new(PgDocumentStore::new(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on exit");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        if config.payment.secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY is not set; payment intents will be refused");
        }
        let payments: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.payment)?);

        Self::new(config, store, payments)
    }
}
