use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The identity a token vouches for. `email` is the only field the server trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub email: String,
}

impl IdentityClaim {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into() }
    }
}

/// Wire form of the signed payload. Only `email` and `exp` are required on
/// verify; tokens from older issuers carry no `jti` and may add extra fields.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    email: String,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    jti: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,

    #[error("identity claim requires a non-empty email")]
    EmptyClaim,

    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token generation failed: {0}")]
    Generation(String),
}

/// Issues and verifies HS256 identity tokens with an absolute lifetime.
///
/// The server keeps no session state; a token stays valid until `exp`.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `claim` with an expiry of now + ttl
    pub fn issue(&self, claim: &IdentityClaim) -> Result<String, TokenError> {
        self.issue_at(claim, Utc::now())
    }

    /// Sign `claim` as if issued at `issued_at`
    pub fn issue_at(&self, claim: &IdentityClaim, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        if claim.email.trim().is_empty() {
            return Err(TokenError::EmptyClaim);
        }

        let claims = Claims {
            email: claim.email.clone(),
            exp: (issued_at + self.ttl).timestamp(),
            iat: Some(issued_at.timestamp()),
            jti: Some(Uuid::new_v4()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded identity
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        Ok(IdentityClaim {
            email: token_data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::hours(5)).unwrap()
    }

    #[test]
    fn verify_returns_issued_claim() {
        let tokens = service();
        let claim = IdentityClaim::new("guest@bistro.test");
        let token = tokens.issue(&claim).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), claim);
    }

    #[test]
    fn token_is_valid_just_inside_the_window() {
        let tokens = service();
        let claim = IdentityClaim::new("guest@bistro.test");
        let issued = Utc::now() - Duration::hours(5) + Duration::minutes(1);
        let token = tokens.issue_at(&claim, issued).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), claim);
    }

    #[test]
    fn token_expires_after_five_hours() {
        let tokens = service();
        let issued = Utc::now() - Duration::hours(5) - Duration::seconds(5);
        let token = tokens.issue_at(&IdentityClaim::new("guest@bistro.test"), issued).unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn reissue_differs_but_decodes_the_same() {
        let tokens = service();
        let claim = IdentityClaim::new("guest@bistro.test");
        let first = tokens.issue(&claim).unwrap();
        let second = tokens.issue(&claim).unwrap();
        assert_ne!(first, second);
        assert_eq!(tokens.verify(&first).unwrap(), tokens.verify(&second).unwrap());
    }

    #[test]
    fn rejects_foreign_signature() {
        let other = TokenService::new("another-secret", Duration::hours(5)).unwrap();
        let token = other.issue(&IdentityClaim::new("guest@bistro.test")).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn accepts_tokens_without_jti_and_with_extra_fields() {
        let now = Utc::now().timestamp();
        let payload = serde_json::json!({
            "email": "guest@bistro.test",
            "name": "Guest",
            "iat": now,
            "exp": now + 5 * 3600,
        });
        let token = encode(&Header::default(), &payload, &EncodingKey::from_secret(b"test-secret")).unwrap();
        assert_eq!(service().verify(&token).unwrap(), IdentityClaim::new("guest@bistro.test"));

        let expired = serde_json::json!({ "email": "guest@bistro.test", "exp": now - 5 });
        let token = encode(&Header::default(), &expired, &EncodingKey::from_secret(b"test-secret")).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(service().verify("not-a-token"), Err(TokenError::Invalid(_))));
        assert!(matches!(service().verify(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn rejects_empty_email_and_empty_secret() {
        assert!(matches!(service().issue(&IdentityClaim::new("  ")), Err(TokenError::EmptyClaim)));
        assert!(matches!(TokenService::new("", Duration::hours(5)), Err(TokenError::MissingSecret)));
    }
}
