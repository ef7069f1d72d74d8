// Shopping cart entries
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::database::{Collection, DeleteResult, Document, Filter, InsertResult};
use crate::error::ApiResult;
use crate::state::AppState;

use super::utils::{document_fields, parse_id, EmailQuery};

/// POST /carts
pub async fn add(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<InsertResult> {
    let fields = document_fields(body)?;
    Ok(Json(state.store.insert_one(Collection::Carts, fields).await?))
}

/// GET /carts?email=
pub async fn list(State(state): State<AppState>, Query(query): Query<EmailQuery>) -> ApiResult<Vec<Document>> {
    let email = query.required()?;
    let entries = state
        .store
        .find(Collection::Carts, &Filter::field("email", email))
        .await?;
    Ok(Json(entries))
}

/// DELETE /carts/:id
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeleteResult> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.delete_one(Collection::Carts, &Filter::by_id(id)).await?))
}
