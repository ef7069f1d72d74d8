use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{carts, menu, payments, reviews, stats, system, token, users};
use crate::middleware::{authenticate, require_admin};
use crate::state::AppState;

/// Full application router. Tiers share paths and are merged per method.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security.cors_origins));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

/// No token required
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/jwt", post(token::issue))
        .route("/users", post(users::register).put(users::upsert_profile))
        .route("/menu", get(menu::list))
        // Unguarded in the web client's contract; PUT is the admin-only variant
        .route("/menu/:id", patch(menu::update))
        .route("/relatedItemsMenu/:category", get(menu::related))
        .route("/reviews", get(reviews::list))
        .route("/reviewItems", post(reviews::create_for_item))
        .route("/reviewItems/:id", get(reviews::list_for_item))
        .route("/carts", post(carts::add).get(carts::list))
        .route("/carts/:id", delete(carts::remove))
        .route("/order-stats", get(stats::order_stats))
}

/// Valid token required (Stage 1)
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/admin/:email", get(users::admin_check))
        .route("/reviews", post(reviews::create))
        .route("/create-payment-intent", post(payments::create_intent))
        .route("/payments", get(payments::list).post(payments::record))
        .route_layer(from_fn_with_state(state, authenticate))
}

/// Valid token and admin role required (Stage 1 then Stage 2)
fn elevated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_verified))
        .route("/users-stats", get(stats::user_stats))
        // Same path shape as the self-service check; the segment is a user id here
        .route("/users/admin/:email", patch(users::promote))
        .route("/users/:id", delete(users::delete))
        .route("/menu", post(menu::create))
        .route("/menu/:id", get(menu::get).put(menu::replace).delete(menu::delete))
        .route("/admin-stats", get(stats::admin_stats))
        .route("/payments-bookings", get(payments::list_all).patch(payments::activate))
        // Layers run outermost-last: authenticate wraps require_admin
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state, authenticate))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::permissive().allow_origin(origins)
}
