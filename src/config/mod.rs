use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// Which document store backs the collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    /// Pool acquire timeout, in seconds
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Empty means "allow any origin"
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub role_lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    pub api_base: String,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
                self.database.backend = StoreBackend::Postgres;
            }
        }
        if let Ok(v) = env::var("STORE_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" | "pg" => self.database.backend = StoreBackend::Postgres,
                _ => tracing::warn!("Ignoring unknown STORE_BACKEND '{}'", v),
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("ACCESS_TOKEN_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ROLE_LOOKUP_TIMEOUT_MS") {
            self.security.role_lookup_timeout_ms =
                v.parse().unwrap_or(self.security.role_lookup_timeout_ms);
        }

        // Payment overrides
        if let Ok(v) = env::var("STRIPE_SECRET_KEY") {
            if !v.trim().is_empty() {
                self.payment.secret_key = Some(v);
            }
        }
        if let Ok(v) = env::var("STRIPE_API_BASE") {
            self.payment.api_base = v;
        }
        if let Ok(v) = env::var("PAYMENT_CURRENCY") {
            self.payment.currency = v.to_ascii_lowercase();
        }

        self
    }

    /// Absolute lifetime of issued tokens
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.security.jwt_expiry_hours as i64)
    }

    pub fn role_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.security.role_lookup_timeout_ms)
    }

    /// Settings that cannot be combined, checked once at startup
    pub fn validate(&self) -> Result<(), String> {
        if self.security.jwt_secret.is_empty() {
            return Err("ACCESS_TOKEN_SECRET must be set".to_string());
        }
        match self.database.backend {
            StoreBackend::Postgres if self.database.url.is_none() => {
                Err("DATABASE_URL must be set for the postgres store backend".to_string())
            }
            StoreBackend::Memory if self.environment == Environment::Production => {
                Err("the memory store backend is not allowed in production".to_string())
            }
            _ => Ok(()),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 5000 },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
                jwt_secret: String::new(),
                jwt_expiry_hours: 5,
                role_lookup_timeout_ms: 5_000,
            },
            payment: PaymentConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 5000 },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
                jwt_secret: String::new(),
                jwt_expiry_hours: 5,
                role_lookup_timeout_ms: 3_000,
            },
            payment: PaymentConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 5000 },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
                jwt_secret: String::new(),
                jwt_expiry_hours: 5,
                role_lookup_timeout_ms: 2_000,
            },
            payment: PaymentConfig::default(),
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
        }
    }
}

/// Config for in-process tests: memory store, fixed secret
pub fn test_config(secret: &str) -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = secret.to_string();
    config
}
