use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::IdentityClaim;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, injected by [`authenticate`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub email: String,
}

impl From<IdentityClaim> for AuthUser {
    fn from(claim: IdentityClaim) -> Self {
        Self { email: claim.email }
    }
}

/// Stage 1: require a verifiable bearer token and attach the caller's identity.
///
/// Every failure is `401 {"message": "forbidden access"}`.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or_else(|| {
        tracing::warn!("Rejected {}: missing or malformed Authorization header", request.uri().path());
        ApiError::unauthenticated()
    })?;

    let claim = state.tokens.verify(&token).map_err(|e| {
        tracing::warn!("Rejected {}: {}", request.uri().path(), e);
        ApiError::unauthenticated()
    })?;

    let auth_user = AuthUser::from(claim);
    tracing::debug!("Authenticated {} for {}", auth_user.email, request.uri().path());
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Stage 2: the authenticated caller's stored role must be admin.
///
/// Runs after [`authenticate`]; the role is read from the store on every call.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| {
            tracing::error!("Admin check reached without an authenticated user");
            ApiError::unauthenticated()
        })?;

    if !state.roles.is_admin(&auth_user.email).await? {
        tracing::warn!("Rejected {}: {} is not an admin", request.uri().path(), auth_user.email);
        return Err(ApiError::forbidden());
    }

    tracing::debug!("Admin {} authorized for {}", auth_user.email, request.uri().path());
    Ok(next.run(request).await)
}

/// Token from `Authorization: <scheme> <token>`: the second whitespace-separated part
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.split_whitespace().nth(1).map(str::to_string)
}
