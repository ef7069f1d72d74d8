use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::database::{Collection, DatabaseError, DocumentStore, Filter};

/// Privilege attached to a user record. Anything but `"admin"` is `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub const ADMIN: &'static str = "admin";

    /// Interpret a stored `role` attribute
    pub fn from_field(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) if s == Self::ADMIN => Role::Admin,
            None | Some(Value::Null) => Role::User,
            Some(Value::String(s)) if s == "user" => Role::User,
            Some(other) => {
                tracing::warn!("Unrecognized role value {}; treating as user", other);
                Role::User
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Error)]
pub enum RoleLookupError {
    #[error("role lookup failed: {0}")]
    Store(#[from] DatabaseError),

    #[error("role lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Point lookups of a user's role. Never cached: every privileged request re-reads the store.
#[derive(Clone)]
pub struct RoleStore {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl RoleStore {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// `None` when no user record has this email
    pub async fn lookup_role(&self, email: &str) -> Result<Option<Role>, RoleLookupError> {
        let filter = Filter::field("email", email);
        let record = tokio::time::timeout(self.timeout, self.store.find_one(Collection::Users, &filter))
            .await
            .map_err(|_| RoleLookupError::Timeout(self.timeout))??;

        Ok(record.map(|user| Role::from_field(user.get("role"))))
    }

    /// Record exists and its role is admin
    pub async fn is_admin(&self, email: &str) -> Result<bool, RoleLookupError> {
        Ok(self
            .lookup_role(email)
            .await?
            .map(|role| role.is_admin())
            .unwrap_or(false))
    }
}
