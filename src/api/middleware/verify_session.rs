use core::fmt;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::StatusCode;
use http::request::Parts;
use ring::hmac::{self, Key};

use super::{MiddlewareErr, MiddlewareResult, bearer};
use crate::api::server::AppState;
use crate::constants::SESSION_TOKEN_SEPARATOR;
use crate::db::prelude::UserId;

/// Signs and checks session tokens of the form `<uid>.<hex hmac-sha256(uid)>`
#[derive(Clone)]
pub struct SessionKey {
    key: Key,
}

impl SessionKey {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
        }
    }

    pub fn sign(&self, uid: &UserId) -> String {
        let tag = hmac::sign(&self.key, uid.0.as_bytes());
        format!("{}{}{}", uid, SESSION_TOKEN_SEPARATOR, hex::encode(tag))
    }

    pub fn verify(&self, token: &str) -> MiddlewareResult<UserId> {
        let (uid, signature) = token
            .rsplit_once(SESSION_TOKEN_SEPARATOR)
            .ok_or(MiddlewareErr::MalformedToken)?;
        if uid.is_empty() {
            return Err(MiddlewareErr::MalformedToken);
        }

        let tag = hex::decode(signature).map_err(|_| MiddlewareErr::MalformedToken)?;
        hmac::verify(&self.key, uid.as_bytes(), &tag)
            .map_err(|_| MiddlewareErr::InvalidSignature)?;

        Ok(UserId::from(uid))
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey").finish_non_exhaustive()
    }
}

/// The user a request was authenticated as
#[derive(Debug, Clone)]
pub struct SessionUser(pub UserId);

pub async fn verify_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer(req.headers()).map_err(|_| StatusCode::BAD_REQUEST)?;

    let uid = match state.session_key.verify(token) {
        Ok(uid) => uid,
        Err(e) => {
            tracing::warn!(error = %e, uri = %req.uri(), "rejected session token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    req.extensions_mut().insert(SessionUser(uid));
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
