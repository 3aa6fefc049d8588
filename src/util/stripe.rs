use std::collections::HashMap;

use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::constants::PAYMENT_CURRENCY;

const PAYMENT_INTENTS_PATH: &str = "/v1/payment_intents";

/// Minimal client for the payment processor's payment-intent API
#[derive(Clone)]
pub struct Stripe {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl core::fmt::Debug for Stripe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stripe")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Stripe {
    pub fn new(client: reqwest::Client, base_url: &str, secret_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Creates a payment intent for `amount` (in the currency's minor unit), tagging it with the
    /// payer's email
    #[instrument(skip(self, email))]
    pub async fn create_payment_intent(
        &self,
        amount: u64,
        email: Option<&str>,
    ) -> StripeResult<PaymentIntent> {
        let mut form = vec![
            ("amount", amount.to_string()),
            ("currency", PAYMENT_CURRENCY.to_string()),
        ];
        if let Some(email) = email {
            form.push(("metadata[email]", email.to_string()));
        }

        let res = self
            .client
            .post(format!("{}{}", self.base_url, PAYMENT_INTENTS_PATH))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let intent: PaymentIntent = Self::parse(res).await?;
        tracing::info!(intent_id = intent.id, amount, "created payment intent");

        Ok(intent)
    }

    #[instrument(skip(self))]
    pub async fn retrieve_payment_intent(&self, id: &str) -> StripeResult<PaymentIntent> {
        if id.is_empty()
            || !id
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(StripeErr::InvalidId(id.to_string()));
        }

        let res = self
            .client
            .get(format!("{}{}/{}", self.base_url, PAYMENT_INTENTS_PATH, id))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse(res).await
    }

    /// Deserializes a successful response, or pulls the processor's error message out of a failed one
    async fn parse(res: reqwest::Response) -> StripeResult<PaymentIntent> {
        let status = res.status();
        if status.is_success() {
            return Ok(res.json::<PaymentIntent>().await?);
        }

        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        let message = body["error"]["message"]
            .as_str()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("payment processor responded with {status}"));

        tracing::error!(code = %status, message, "payment processor error");
        Err(StripeErr::Api { status, message })
    }
}

pub type StripeResult<T> = core::result::Result<T, StripeErr>;

#[derive(Debug, Error)]
pub enum StripeErr {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("invalid payment intent id '{0}'")]
    InvalidId(String),
}
