use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

const RANDOM_QUOTE_PATH: &str = "/quotes/random";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: u64,
    pub quote: String,
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct Quotes {
    client: reqwest::Client,
    base_url: String,
}

impl Quotes {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetches a random motivational quote from the upstream quote API
    #[instrument(skip(self))]
    pub async fn random(&self) -> QuoteResult<Quote> {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, RANDOM_QUOTE_PATH))
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(code = %res.status(), "non-200/OK response from quote api");
            return Err(QuoteErr::Upstream(res.status().as_u16()));
        }

        Ok(res.json::<Quote>().await?)
    }
}

pub type QuoteResult<T> = core::result::Result<T, QuoteErr>;

#[derive(Debug, Error)]
pub enum QuoteErr {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error("failed to fetch quotes (upstream status {0})")]
    Upstream(u16),
}
