// Payment intents, payment records and booking status
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::database::{Collection, DeleteResult, Document, Filter, InsertResult, UpdateResult};
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::services::payment::amount_in_cents;
use crate::state::AppState;

use super::utils::{document_fields, numeric, parse_id, EmailQuery, IdQuery};

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub price: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecorded {
    pub payment_result: InsertResult,
    pub delete_result: DeleteResult,
}

/// POST /create-payment-intent (authenticated)
pub async fn create_intent(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<IntentRequest>,
) -> ApiResult<IntentResponse> {
    let price = match &request.price {
        Some(value @ (Value::Number(_) | Value::String(_))) => numeric(Some(value)),
        _ => return Err(ApiError::bad_request("price must be a positive number")),
    };
    let amount = amount_in_cents(price)?;

    let intent = state
        .payments
        .create_intent(amount, &state.config.payment.currency)
        .await?;
    tracing::info!("Payment intent of {} cents for {}", amount, auth_user.email);

    Ok(Json(IntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// GET /payments?email= (authenticated)
pub async fn list(State(state): State<AppState>, Query(query): Query<EmailQuery>) -> ApiResult<Vec<Document>> {
    let email = query.required()?;
    let payments = state
        .store
        .find(Collection::Payments, &Filter::field("email", email))
        .await?;
    Ok(Json(payments))
}

/// POST /payments (authenticated) - store the payment and clear its cart entries
pub async fn record(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<Value>,
) -> ApiResult<PaymentRecorded> {
    let fields = document_fields(body)?;
    let cart_ids = cart_ids(&fields)?;

    let payment_result = state.store.insert_one(Collection::Payments, fields).await?;
    let delete_result = state.store.delete_many(Collection::Carts, &cart_ids).await?;
    tracing::info!(
        "{} recorded payment {} clearing {} cart entries",
        auth_user.email,
        payment_result.inserted_id,
        delete_result.deleted_count
    );

    Ok(Json(PaymentRecorded {
        payment_result,
        delete_result,
    }))
}

/// GET /payments-bookings (admin)
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    Ok(Json(state.store.find(Collection::Payments, &Filter::all()).await?))
}

/// PATCH /payments-bookings?id= (admin) - mark a payment active
pub async fn activate(State(state): State<AppState>, Query(query): Query<IdQuery>) -> ApiResult<UpdateResult> {
    let raw = query
        .id
        .ok_or_else(|| ApiError::bad_request("id query parameter is required"))?;
    let id = parse_id(&raw)?;

    let mut set = Map::new();
    set.insert("status".to_string(), json!("active"));
    let result = state
        .store
        .update_one(Collection::Payments, &Filter::by_id(id), set, false)
        .await?;
    Ok(Json(result))
}

fn cart_ids(fields: &Map<String, Value>) -> Result<Vec<Uuid>, ApiError> {
    let Some(Value::Array(ids)) = fields.get("cartIds") else {
        return Err(ApiError::bad_request("cartIds must be an array of ids"));
    };
    ids.iter()
        .map(|id| match id {
            Value::String(s) => parse_id(s),
            other => Err(ApiError::bad_request(format!("invalid id: {}", other))),
        })
        .collect()
}
