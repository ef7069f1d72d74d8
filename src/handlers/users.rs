// User records: registration, profile upserts, admin checks and promotion
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::auth::Role;
use crate::database::{Collection, DatabaseError, DeleteResult, Document, Filter, InsertResult, UpdateResult};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::state::AppState;

use super::utils::{parse_id, profile_fields, EmailQuery};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RegisterResponse {
    Created(InsertResult),
    Exists { message: &'static str },
}

#[derive(Debug, Serialize)]
pub struct AdminCheck {
    pub admin: bool,
}

/// GET /users - verified users only (admin)
pub async fn list_verified(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    let users = state
        .store
        .find(Collection::Users, &Filter::field("emailVerified", true))
        .await?;
    Ok(Json(users))
}

/// GET /users/admin/:email - does the caller hold the admin role?
///
/// Callers may only ask about themselves.
pub async fn admin_check(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(email): Path<String>,
) -> ApiResult<AdminCheck> {
    if email != auth_user.email {
        tracing::warn!("{} asked for the admin flag of {}", auth_user.email, email);
        return Err(ApiError::unauthorized());
    }

    let admin = state.roles.is_admin(&email).await?;
    Ok(Json(AdminCheck { admin }))
}

/// POST /users - register once per email
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<RegisterResponse> {
    let fields = profile_fields(body)?;
    let email = fields
        .get("email")
        .and_then(Value::as_str)
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("email is required"))?
        .to_string();

    let existing = state
        .store
        .find_one(Collection::Users, &Filter::field("email", email.as_str()))
        .await?;
    if existing.is_some() {
        return Ok(Json(RegisterResponse::Exists {
            message: "user already exists",
        }));
    }

    // A concurrent registration can win between the check and the insert
    match state.store.insert_one(Collection::Users, fields).await {
        Ok(result) => {
            tracing::info!("Registered user {}", email);
            Ok(Json(RegisterResponse::Created(result)))
        }
        Err(DatabaseError::Conflict(_)) => Ok(Json(RegisterResponse::Exists {
            message: "user already exists",
        })),
        Err(e) => Err(e.into()),
    }
}

/// PUT /users?email= - upsert profile fields by email
pub async fn upsert_profile(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
    Json(body): Json<Value>,
) -> ApiResult<UpdateResult> {
    let email = query.required()?;
    let mut fields = profile_fields(body)?;
    // The lookup key wins over a differing email in the body
    fields.insert("email".to_string(), Value::String(email.clone()));

    let result = state
        .store
        .update_one(Collection::Users, &Filter::field("email", email), fields, true)
        .await?;
    Ok(Json(result))
}

/// PATCH /users/admin/:id - grant the admin role (admin)
pub async fn promote(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<UpdateResult> {
    let id = parse_id(&id)?;
    let mut set = Map::new();
    set.insert("role".to_string(), json!(Role::ADMIN));

    let result = state
        .store
        .update_one(Collection::Users, &Filter::by_id(id), set, false)
        .await?;
    tracing::info!("{} promoted user {} (matched {})", auth_user.email, id, result.matched_count);
    Ok(Json(result))
}

/// DELETE /users/:id (admin)
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResult> {
    let id = parse_id(&id)?;
    let result = state.store.delete_one(Collection::Users, &Filter::by_id(id)).await?;
    tracing::info!("{} deleted user {} ({} removed)", auth_user.email, id, result.deleted_count);
    Ok(Json(result))
}
