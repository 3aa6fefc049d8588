pub mod verify_internal;
pub mod verify_session;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::request::Parts as ReqParts;
use http::{HeaderMap, HeaderValue, Method};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::constants::BEARER_PREFIX;

pub type MiddlewareResult<T> = core::result::Result<T, MiddlewareErr>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MiddlewareErr {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("malformed session token")]
    MalformedToken,

    #[error("session signature does not match")]
    InvalidSignature,
}

/// Builds the CORS layer from a comma-separated list of allowed origin suffixes (`*` allows any)
pub fn cors(allowed_origins: &str) -> CorsLayer {
    let allowed = if allowed_origins.trim() == "*" {
        AllowOrigin::any()
    } else {
        let suffixes: Vec<String> = allowed_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        AllowOrigin::predicate(move |org: &HeaderValue, _: &ReqParts| {
            suffixes
                .iter()
                .any(|suffix| org.as_bytes().ends_with(suffix.as_bytes()))
        })
    };

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(allowed)
}

/// Pulls the credential out of an `Authorization` header, with or without a `Bearer` prefix
pub(crate) fn bearer(headers: &HeaderMap) -> MiddlewareResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(MiddlewareErr::MissingHeader)?;

    Ok(value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim())
}
