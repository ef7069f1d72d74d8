use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::PaymentConfig;

/// What the client needs to confirm a charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub client_secret: String,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("payment provider is not configured")]
    NotConfigured,

    #[error("payment provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("payment provider request failed: {0}")]
    Transport(String),
}

/// Creates charge intents with an external provider. One call, no retries.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent, PaymentError>;
}

/// Convert a decimal price to whole cents, truncating fractions of a cent
pub fn amount_in_cents(price: f64) -> Result<i64, PaymentError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(PaymentError::InvalidAmount(format!("price must be a positive number, got {}", price)));
    }
    let cents = (price * 100.0).trunc();
    if cents < 1.0 || cents > i64::MAX as f64 {
        return Err(PaymentError::InvalidAmount(format!("price {} is out of range", price)));
    }
    Ok(cents as i64)
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Stripe `PaymentIntents` over HTTPS
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: Option<String>,
    endpoint: url::Url,
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> anyhow::Result<Self> {
        let base = url::Url::parse(&config.api_base)?;
        let endpoint = base.join("/v1/payment_intents")?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            endpoint,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<PaymentIntent, PaymentError> {
        let secret_key = self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)?;

        let form = [
            ("amount", amount_cents.to_string()),
            ("currency", currency.to_string()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let intent = response
            .json::<StripeIntent>()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let client_secret = intent.client_secret.ok_or_else(|| PaymentError::Provider {
            status: status.as_u16(),
            message: "response did not include a client secret".to_string(),
        })?;

        tracing::info!("Created payment intent for {} {}", amount_cents, currency);
        Ok(PaymentIntent { client_secret })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_price_to_cents() {
        assert_eq!(amount_in_cents(12.5).unwrap(), 1250);
        assert_eq!(amount_in_cents(0.01).unwrap(), 1);
        assert_eq!(amount_in_cents(19.999).unwrap(), 1999);
    }

    #[test]
    fn rejects_non_positive_prices() {
        assert!(amount_in_cents(0.0).is_err());
        assert!(amount_in_cents(-3.0).is_err());
        assert!(amount_in_cents(0.004).is_err());
        assert!(amount_in_cents(f64::NAN).is_err());
    }

    #[test]
    fn endpoint_is_joined_to_base() {
        let gateway = StripeGateway::new(&PaymentConfig {
            secret_key: None,
            api_base: "http://127.0.0.1:9999".into(),
            currency: "usd".into(),
        })
        .unwrap();
        assert_eq!(gateway.endpoint.as_str(), "http://127.0.0.1:9999/v1/payment_intents");
    }

    #[tokio::test]
    async fn unconfigured_gateway_refuses() {
        let gateway = StripeGateway::new(&PaymentConfig::default()).unwrap();
        assert!(matches!(
            gateway.create_intent(1000, "usd").await,
            Err(PaymentError::NotConfigured)
        ));
    }
}
