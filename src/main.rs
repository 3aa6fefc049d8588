use std::sync::Arc;

use anyhow::Context;

use crate::constants::SERVICE_NAME;
use crate::db::prelude::Store;
use crate::db::store::memory::MemoryStore;
use crate::db::store::redis::RedisStore;
use crate::util::env::Var;
use crate::util::tracing::{LogFormat, build_subscriber};

mod api;
mod args;
mod constants;
mod db;
mod game;
mod tracker;
mod util;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args::parse_cli_args();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::from(var!(Var::LogFormat).await.context("loading environment")?)
    };
    build_subscriber(format)?;

    tracing::info!(service = SERVICE_NAME, ?args, "starting main application");

    let store: Arc<dyn Store> = if args.memory {
        tracing::warn!("using in-memory store; data will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let redis_url = var!(Var::RedisUrl).await?;
        Arc::new(
            RedisStore::new(redis_url)
                .await
                .context("connecting to redis")?,
        )
    };

    api::server::start_server(args.port, store).await?;
    Ok(())
}
