use std::sync::Arc;

use axum::{Json, debug_handler};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::api::server::AppState;
use crate::constants::DARK_MODE_PRICE_CENTS;

#[derive(Debug, Deserialize)]
pub struct CreatePayment {
    pub email: Option<String>,
    /// Minor currency units; defaults to the dark mode price
    pub amount: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecret {
    pub client_secret: String,
}

/// Processor failures are reported to the client as `{"error": {"message": ...}}`
#[derive(Debug)]
pub struct PaymentRejection(String);

impl IntoResponse for PaymentRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": self.0 } })),
        )
            .into_response()
    }
}

/// Opens a payment intent for the client to complete with the processor's browser SDK
#[instrument(skip(state))]
#[debug_handler]
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePayment>,
) -> Result<Json<ClientSecret>, PaymentRejection> {
    let amount = req.amount.unwrap_or(DARK_MODE_PRICE_CENTS);

    let intent = state
        .stripe
        .create_payment_intent(amount, req.email.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "payment intent creation failed");
            PaymentRejection(e.to_string())
        })?;

    let client_secret = intent.client_secret.ok_or_else(|| {
        tracing::error!(intent_id = intent.id, "payment intent has no client secret");
        PaymentRejection(String::from("payment intent has no client secret"))
    })?;

    Ok(Json(ClientSecret { client_secret }))
}
