//! Typed process environment.
//!
//! Variables are read once (including any `.env` file found by [`dotenvy`]) and deserialized into
//! [`Env`]; values stay as strings and are parsed by their consumers, so a malformed port only
//! fails the component that needs it.

use std::sync::LazyLock;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::constants::{QUOTES_API_URL, REDIS_URL, SERVER_PORT, STRIPE_API_URL};

static ENV_VARS: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);

pub async fn env() -> EnvResult<&'static Env> {
    ENV_VARS.get_or_try_init(|| async { Env::new() }).await
}

pub async fn get_var(var: Var) -> EnvResult<&'static str> {
    Ok(env().await?.get(var))
}

#[macro_export]
macro_rules! var {
    ($ev:expr) => {
        $crate::util::env::get_var($ev)
    };
}

fn default_port() -> String {
    SERVER_PORT.to_string()
}

fn default_redis_url() -> String {
    REDIS_URL.to_string()
}

fn default_cors() -> String {
    String::from("*")
}

fn default_stripe_url() -> String {
    STRIPE_API_URL.to_string()
}

fn default_quotes_url() -> String {
    QUOTES_API_URL.to_string()
}

fn default_log_format() -> String {
    String::from("pretty")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Env {
    #[serde(default = "default_port")]
    pub server_api_port: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_cors")]
    pub cors_allow_origins: String,
    pub internal_post_token: String,
    pub session_secret: String,
    pub stripe_secret_key: String,
    #[serde(default = "default_stripe_url")]
    pub stripe_api_url: String,
    #[serde(default = "default_quotes_url")]
    pub quotes_api_url: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

#[derive(Debug, Clone, Copy)]
pub enum Var {
    ServerApiPort,
    RedisUrl,
    CorsAllowOrigins,
    InternalToken,
    SessionSecret,
    StripeSecretKey,
    StripeApiUrl,
    QuotesApiUrl,
    LogFormat,
}

impl Env {
    pub fn new() -> EnvResult<Self> {
        Self::from_iter(dotenvy::vars())
    }

    pub fn from_iter<Iter>(vars: Iter) -> EnvResult<Self>
    where
        Iter: IntoIterator<Item = (String, String)>,
    {
        let map: Map<String, Value> = vars
            .into_iter()
            .map(|(key, val)| (key, Value::String(val)))
            .collect();

        serde_json::from_value(Value::Object(map)).map_err(EnvErr::from)
    }

    pub fn get(&self, var: Var) -> &str {
        match var {
            Var::ServerApiPort => &self.server_api_port,
            Var::RedisUrl => &self.redis_url,
            Var::CorsAllowOrigins => &self.cors_allow_origins,
            Var::InternalToken => &self.internal_post_token,
            Var::SessionSecret => &self.session_secret,
            Var::StripeSecretKey => &self.stripe_secret_key,
            Var::StripeApiUrl => &self.stripe_api_url,
            Var::QuotesApiUrl => &self.quotes_api_url,
            Var::LogFormat => &self.log_format,
        }
    }

    pub fn port(&self) -> EnvResult<u16> {
        self.get(Var::ServerApiPort)
            .parse::<u16>()
            .map_err(|e| EnvErr::Invalid {
                var: "SERVER_API_PORT",
                reason: e.to_string(),
            })
    }
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("env deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
