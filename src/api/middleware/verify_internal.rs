use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::StatusCode;

use super::bearer;
use crate::api::server::AppState;
use crate::util::constant_time_cmp;

/// Guards routes only our own services call (e.g. session issuance after sign-in)
pub async fn verify_internal_ident(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer(req.headers()).map_err(|_| StatusCode::BAD_REQUEST)?;

    if !constant_time_cmp(token, &state.internal_token) {
        tracing::warn!(uri = %req.uri(), "rejected internal request");
        Err(StatusCode::UNAUTHORIZED)
    } else {
        Ok(next.run(req).await)
    }
}
