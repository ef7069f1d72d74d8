// Site reviews and per-item reviews
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::Value;

use crate::database::{Collection, Document, Filter, InsertResult};
use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::state::AppState;

use super::utils::{document_fields, EmailQuery};

/// GET /reviews?email=
pub async fn list(State(state): State<AppState>, Query(query): Query<EmailQuery>) -> ApiResult<Vec<Document>> {
    let email = query.required()?;
    let reviews = state
        .store
        .find(Collection::Reviews, &Filter::field("email", email))
        .await?;
    Ok(Json(reviews))
}

/// POST /reviews (authenticated)
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> ApiResult<InsertResult> {
    let fields = document_fields(body)?;
    let result = state.store.insert_one(Collection::Reviews, fields).await?;
    tracing::debug!("{} posted review {}", auth_user.email, result.inserted_id);
    Ok(Json(result))
}

/// GET /reviewItems/:id - reviews of one menu item
pub async fn list_for_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Vec<Document>> {
    let reviews = state
        .store
        .find(Collection::ReviewItems, &Filter::field("itemId", item_id))
        .await?;
    Ok(Json(reviews))
}

/// POST /reviewItems
pub async fn create_for_item(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<InsertResult> {
    let fields = document_fields(body)?;
    Ok(Json(state.store.insert_one(Collection::ReviewItems, fields).await?))
}
