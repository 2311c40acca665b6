use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::resp::problem::Problem;

/// Smallest currency unit, the granularity the provider charges in. Rejects
/// non-positive and non-finite amounts.
pub fn amount_to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    Some((amount * 100.0).round() as i64)
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("payment provider returned status {0}")]
    Provider(u16),
    #[error("payment provider response is missing '{0}'")]
    MalformedResponse(&'static str),
}

impl From<PaymentError> for Problem {
    fn from(e: PaymentError) -> Self {
        tracing::error!("payment intent creation failed: {}", e);
        Problem::internal("Unable to create a payment intent.")
    }
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    /// Opaque secret the client uses to complete the card charge. The
    /// server never re-verifies completion; the client-reported success is
    /// trusted as-is.
    pub client_secret: String,
}

#[rocket::async_trait]
pub trait PaymentIntentProvider: Send + Sync {
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: Option<String>,
}

/// Stripe-style payment intents over their form-encoded REST surface.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, api_base: &str) -> Result<StripeClient, reqwest::Error> {
        // Bounded; the upstream behavior configured no timeout at all.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(StripeClient {
            http,
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[rocket::async_trait]
impl PaymentIntentProvider for StripeClient {
    async fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount_cents.to_string()),
                ("currency", currency.to_string()),
                ("payment_method_types[]", "card".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PaymentError::Provider(response.status().as_u16()));
        }

        let body: IntentResponse = response.json().await?;
        let client_secret = body
            .client_secret
            .ok_or(PaymentError::MalformedResponse("client_secret"))?;

        tracing::debug!("created payment intent {}", body.id);
        Ok(PaymentIntent {
            id: body.id,
            client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_conversion_rounds_to_the_smallest_unit() {
        assert_eq!(amount_to_cents(20.0), Some(2000));
        assert_eq!(amount_to_cents(19.99), Some(1999));
        assert_eq!(amount_to_cents(0.005), Some(1));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert_eq!(amount_to_cents(0.0), None);
        assert_eq!(amount_to_cents(-5.0), None);
        assert_eq!(amount_to_cents(f64::NAN), None);
        assert_eq!(amount_to_cents(f64::INFINITY), None);
    }

    #[test]
    fn provider_response_parses_client_secret() {
        let body = r#"{"id": "pi_123", "client_secret": "pi_123_secret_abc", "object": "payment_intent"}"#;
        let parsed: IntentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.id, "pi_123");
        assert_eq!(parsed.client_secret.as_deref(), Some("pi_123_secret_abc"));
    }
}
