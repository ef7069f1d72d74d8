// Dashboard statistics
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::database::{Collection, Document, Filter};
use crate::error::ApiResult;
use crate::state::AppState;

use super::utils::{numeric, EmailQuery};

/// Per-user activity counts
#[derive(Debug, Serialize)]
pub struct UserStats {
    pub menu: u64,
    pub orders: u64,
    pub reviews: u64,
    pub booking: u64,
    pub payment: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: u64,
    pub menu_items: u64,
    pub orders: u64,
    pub revenue: f64,
}

/// GET /users-stats?email= (admin)
pub async fn user_stats(State(state): State<AppState>, Query(query): Query<EmailQuery>) -> ApiResult<UserStats> {
    let email = query.required()?;
    let by_email = Filter::field("email", email);
    let all = Filter::all();
    let store = &state.store;

    let (menu, reviews, payment, orders, booking) = tokio::try_join!(
        store.count(Collection::Menu, &all),
        store.count(Collection::Reviews, &by_email),
        store.count(Collection::Payments, &by_email),
        store.count(Collection::Carts, &by_email),
        store.count(Collection::Bookings, &by_email),
    )?;

    Ok(Json(UserStats {
        menu,
        orders,
        reviews,
        booking,
        payment,
    }))
}

/// GET /admin-stats (admin)
pub async fn admin_stats(State(state): State<AppState>) -> ApiResult<AdminStats> {
    let all = Filter::all();
    let store = &state.store;
    let (users, menu_items, payments) = tokio::try_join!(
        store.count(Collection::Users, &all),
        store.count(Collection::Menu, &all),
        store.find(Collection::Payments, &all),
    )?;

    Ok(Json(AdminStats {
        users,
        menu_items,
        orders: payments.len() as u64,
        revenue: revenue(&payments),
    }))
}

/// GET /order-stats - one row per purchased menu item
pub async fn order_stats(State(state): State<AppState>) -> ApiResult<Vec<Value>> {
    let payments = state.store.find(Collection::Payments, &Filter::all()).await?;
    Ok(Json(unwind(&payments, "menuItemIds")))
}

/// Sum of payment prices
pub fn revenue(payments: &[Document]) -> f64 {
    payments.iter().map(|payment| numeric(payment.get("price"))).sum()
}

/// Emit a copy of each document per element of its `field` array, with the
/// array replaced by that element. Documents without a non-empty array emit nothing.
pub fn unwind(docs: &[Document], field: &str) -> Vec<Value> {
    let mut rows = Vec::new();
    for doc in docs {
        let Some(Value::Array(items)) = doc.get(field) else {
            continue;
        };
        for item in items {
            let mut row = doc.clone();
            row.fields.insert(field.to_string(), item.clone());
            if let Ok(value) = serde_json::to_value(&row) {
                rows.push(value);
            }
        }
    }
    rows
}
