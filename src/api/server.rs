use core::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::signal::ctrl_c;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::api::middleware::cors;
use crate::api::middleware::verify_internal::verify_internal_ident;
use crate::api::middleware::verify_session::{SessionKey, verify_session};
use crate::api::payment::create_payment;
use crate::db::prelude::Store;
use crate::game::prelude::WalletErr;
use crate::tracker::TrackerErr;
use crate::util::env::{Env, EnvErr, Var, env};
use crate::util::quotes::{QuoteErr, Quotes};
use crate::util::stripe::{Stripe, StripeErr};

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub stripe: Stripe,
    pub quotes: Quotes,
    pub session_key: SessionKey,
    pub internal_token: String,
}

impl AppState {
    pub fn new(env: &Env, store: Arc<dyn Store>) -> Self {
        let client = reqwest::Client::new();

        Self {
            store,
            stripe: Stripe::new(
                client.clone(),
                env.get(Var::StripeApiUrl),
                env.get(Var::StripeSecretKey),
            ),
            quotes: Quotes::new(client, env.get(Var::QuotesApiUrl)),
            session_key: SessionKey::new(env.get(Var::SessionSecret)),
            internal_token: env.get(Var::InternalToken).to_string(),
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("stripe", &self.stripe)
            .field("quotes", &self.quotes)
            .finish_non_exhaustive()
    }
}

pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    //
    // everything a signed-in user does
    let session_routes = Router::new()
        .route("/me", get(account).patch(update_profile))
        .route("/habits", get(list_habits).post(create_habit))
        .route("/habits/reorder", post(reorder_habits))
        .route(
            "/habits/{id}",
            get(get_habit).patch(edit_habit).delete(delete_habit),
        )
        .route("/habits/{id}/positive", post(log_positive))
        .route("/habits/{id}/negative", post(log_negative))
        .route("/rewards", get(list_rewards).post(create_reward))
        .route("/rewards/reorder", post(reorder_rewards))
        .route("/rewards/{id}", patch(edit_reward).delete(delete_reward))
        .route("/rewards/{id}/redeem", post(redeem_reward))
        .route("/badges", get(badges))
        .route("/badges/catalog", get(badge_catalog))
        .route("/settings/dark-mode", get(dark_mode).put(set_dark_mode))
        .route("/payments/confirm", post(confirm_payment))
        .route("/quotes/random", get(random_quote))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_session));

    let internal_routes = Router::new()
        .route("/internal/session", post(issue_session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_internal_ident,
        ));

    Router::new()
        .merge(session_routes)
        .merge(internal_routes)
        .route("/", get(|| async { Response::new(Body::empty()) }))
        .route("/api/create-payment", post(create_payment))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(cors)
        .with_state(state)
}

/// Logs errors that route handlers attached to their response
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[instrument(skip(store))]
pub async fn start_server(port: Option<u16>, store: Arc<dyn Store>) -> ServerResult<()> {
    let env = env().await?;
    let port = match port {
        Some(port) => port,
        None => env.port()?,
    };

    let state = Arc::new(AppState::new(env, store));
    let app = router(state, cors(env.get(Var::CorsAllowOrigins)));

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    tracing::info!(
        server_url = &format!("http://127.0.0.1:{}", port),
        "server ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!(error = ?e, "unable to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}

pub type ServerResult<T> = core::result::Result<T, ServerErr>;

#[derive(Debug, Error)]
pub enum ServerErr {
    #[error(transparent)]
    EnvError(#[from] EnvErr),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    TrackerError(#[from] TrackerErr),

    #[error(transparent)]
    QuoteError(#[from] QuoteErr),

    #[error("user id must not be empty")]
    EmptyUserId,
}

impl RouteError {
    /// Response status, and whether the failure is ours (and so worth an error log)
    fn status(&self) -> (StatusCode, bool) {
        match self {
            RouteError::TrackerError(tracker_err) => match tracker_err {
                TrackerErr::StoreError(_) => (StatusCode::INTERNAL_SERVER_ERROR, true),
                TrackerErr::NotFound { .. } => (StatusCode::NOT_FOUND, false),
                TrackerErr::EmptyTitle
                | TrackerErr::NotApplicable { .. }
                | TrackerErr::InvalidOrder
                | TrackerErr::InvalidOffset(_) => (StatusCode::BAD_REQUEST, false),
                TrackerErr::WalletError(WalletErr::InsufficientGold { .. }) => {
                    (StatusCode::CONFLICT, false)
                }
                TrackerErr::DarkModeLocked
                | TrackerErr::PaymentIncomplete(_)
                | TrackerErr::PaymentMismatch
                | TrackerErr::PaymentUnderpaid { .. } => (StatusCode::PAYMENT_REQUIRED, false),
                TrackerErr::PaymentReused(_) => (StatusCode::CONFLICT, false),
                TrackerErr::PaymentError(stripe_err) => match stripe_err {
                    StripeErr::InvalidId(_) => (StatusCode::BAD_REQUEST, false),
                    // the processor answered but would not vouch for the payment
                    StripeErr::Api { .. } => (StatusCode::PAYMENT_REQUIRED, true),
                    StripeErr::ReqwestError(_) => (StatusCode::BAD_GATEWAY, true),
                },
            },

            RouteError::QuoteError(_) => (StatusCode::BAD_GATEWAY, true),

            RouteError::EmptyUserId => (StatusCode::BAD_REQUEST, false),
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let (status, log) = self.status();
        let message = self.to_string();

        let mut response = (status, Json(ErrorResponse { message })).into_response();
        if log {
            response.extensions_mut().insert(Arc::new(self));
        }

        response
    }
}

#[cfg(test)]
pub(crate) mod test {
    use axum::body::to_bytes;
    use http::header::{AUTHORIZATION, CONTENT_TYPE};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::db::prelude::UserId;
    use crate::db::store::memory::MemoryStore;
    use crate::util::env::test::test_env;

    pub struct TestApp {
        pub app: Router,
        pub state: Arc<AppState>,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with_upstreams(None, None)
        }

        /// Points the payment and quote clients at the given base URLs
        pub fn with_upstreams(stripe_url: Option<&str>, quotes_url: Option<&str>) -> Self {
            let mut env = test_env();
            if let Some(url) = stripe_url {
                env.stripe_api_url = url.to_string();
            }
            if let Some(url) = quotes_url {
                env.quotes_api_url = url.to_string();
            }

            let state = Arc::new(AppState::new(&env, Arc::new(MemoryStore::new())));
            Self {
                app: router(state.clone(), cors(env.get(Var::CorsAllowOrigins))),
                state,
            }
        }

        pub fn token(&self, uid: &str) -> String {
            format!("Bearer {}", self.state.session_key.sign(&UserId::from(uid)))
        }

        pub async fn send(
            &self,
            method: &str,
            uri: &str,
            auth: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = http::Request::builder().method(method).uri(uri);
            if let Some(auth) = auth {
                req = req.header(AUTHORIZATION, auth);
            }

            let req = match body {
                Some(body) => req
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => req.body(Body::empty()),
            }
            .unwrap();

            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

            (status, value)
        }
    }

    #[tokio::test]
    async fn test_session_routes_require_token() {
        let app = TestApp::new();

        let (status, _) = app.send("GET", "/habits", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send("GET", "/habits", Some("Bearer alice.00ff"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send("GET", "/habits", Some(&app.token("alice")), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_internal_route_issues_working_session() {
        let app = TestApp::new();

        let (status, _) = app
            .send(
                "POST",
                "/internal/session",
                Some("Bearer wrong"),
                Some(json!({ "uid": "alice" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send(
                "POST",
                "/internal/session",
                Some("Bearer internal-token"),
                Some(json!({ "uid": "alice" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let token = format!("Bearer {}", body["token"].as_str().unwrap());
        let (status, body) = app.send("GET", "/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gold"], 100);
    }

    #[tokio::test]
    async fn test_errors_map_to_statuses() {
        let app = TestApp::new();
        let token = app.token("alice");

        let (status, body) = app
            .send("GET", "/habits/missing", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "habit 'missing' not found");

        let (status, _) = app
            .send("POST", "/habits", Some(&token), Some(json!({ "title": " " })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                "PUT",
                "/settings/dark-mode",
                Some(&token),
                Some(json!({ "enabled": true })),
            )
            .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    }
}
