use std::sync::Arc;

mod accounts;
mod app;
mod auth;
mod config;
mod error;
mod ledger;
mod money;
mod payments;
mod seed;
mod state;
mod users;
mod webhook;

use crate::config::AppConfig;
use crate::ledger::{LedgerStore, MemoryLedger, PgLedger};
use crate::state::AppState;

const IN_MEMORY_URL: &str = "memory";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "payledger=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let pg = if config.database_url == IN_MEMORY_URL {
        None
    } else {
        let pg = PgLedger::connect(&config.database_url, config.db_max_connections).await?;
        pg.migrate().await?;
        Some(pg)
    };
    let store: Arc<dyn LedgerStore> = match &pg {
        Some(pg) => Arc::new(pg.clone()),
        None => {
            tracing::warn!("using in-memory ledger; balances are lost on exit");
            Arc::new(MemoryLedger::new())
        }
    };

    if let Some(seed) = &config.seed {
        seed::seed_defaults(store.as_ref(), seed).await?;
    }

    let app = app::build_app(AppState::new(store, config));
    let served = app::serve(app).await;

    if let Some(pg) = pg {
        pg.close().await;
    }
    served
}
