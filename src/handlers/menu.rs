// Menu items
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::database::{Collection, DeleteResult, Document, Filter, InsertResult, UpdateResult};
use crate::error::ApiResult;
use crate::state::AppState;

use super::utils::{document_fields, parse_id};

/// Editable fields for PATCH /menu/:id; absent fields are written as null
#[derive(Debug, Deserialize)]
pub struct MenuItemPatch {
    pub name: Option<Value>,
    pub category: Option<Value>,
    pub price: Option<Value>,
    pub recipe: Option<Value>,
    pub image: Option<Value>,
}

impl MenuItemPatch {
    fn into_fields(self) -> Map<String, Value> {
        [
            ("name", self.name),
            ("category", self.category),
            ("price", self.price),
            ("recipe", self.recipe),
            ("image", self.image),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.unwrap_or(Value::Null)))
        .collect()
    }
}

/// GET /menu
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    Ok(Json(state.store.find(Collection::Menu, &Filter::all()).await?))
}

/// GET /menu/:id (admin) - `null` when absent
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Option<Document>> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.find_one(Collection::Menu, &Filter::by_id(id)).await?))
}

/// GET /relatedItemsMenu/:category
pub async fn related(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Vec<Document>> {
    let items = state
        .store
        .find(Collection::Menu, &Filter::field("category", category))
        .await?;
    Ok(Json(items))
}

/// POST /menu (admin)
pub async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<InsertResult> {
    let fields = document_fields(body)?;
    Ok(Json(state.store.insert_one(Collection::Menu, fields).await?))
}

/// PUT /menu/:id (admin) - set the given fields, creating the item if needed
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<UpdateResult> {
    let id = parse_id(&id)?;
    let fields = document_fields(body)?;
    let result = state
        .store
        .update_one(Collection::Menu, &Filter::by_id(id), fields, true)
        .await?;
    Ok(Json(result))
}

/// PATCH /menu/:id - overwrite the five editable fields
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<MenuItemPatch>,
) -> ApiResult<UpdateResult> {
    let id = parse_id(&id)?;
    let result = state
        .store
        .update_one(Collection::Menu, &Filter::by_id(id), patch.into_fields(), false)
        .await?;
    Ok(Json(result))
}

/// DELETE /menu/:id (admin)
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeleteResult> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.delete_one(Collection::Menu, &Filter::by_id(id)).await?))
}
