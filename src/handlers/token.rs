// POST /jwt - token issuance
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::IdentityClaim;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Login payload. Only `email` is read; any other field (a `role`, say) is ignored.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /jwt - sign a 5-hour identity token for the posted email
pub async fn issue(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> ApiResult<TokenResponse> {
    let email = payload
        .email
        .ok_or_else(|| ApiError::bad_request("email is required"))?;

    let token = state.tokens.issue(&IdentityClaim::new(email))?;
    Ok(Json(TokenResponse { token }))
}
