mod api;
mod middleware;
mod scheduler;
mod update;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use trendscout_core::AppConfig;
use trendscout_db::{MemoryTrendStore, PgTrendStore, TrendStore};
use trendscout_scraper::{BrowserSession, ChromiumBackend, ScrapeConfig, TrendScraper};

use crate::api::{build_app, default_rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = trendscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting trendscout server");

    let store = connect_store(&config).await?;

    let backend = Arc::new(ChromiumBackend::new(config.chrome_path.clone()));
    let session = Arc::new(BrowserSession::new(backend));
    let scraper = Arc::new(TrendScraper::new(
        Arc::clone(&session),
        ScrapeConfig::from_app_config(&config),
    ));

    let _scheduler = if config.schedule_enabled {
        Some(scheduler::build_scheduler(Arc::clone(&scraper), Arc::clone(&store), &config).await?)
    } else {
        tracing::info!("scheduled updates disabled");
        None
    };

    let app = build_app(
        AppState {
            store,
            scraper,
            dedup_window_hours: config.dedup_window_hours,
            retention_days: config.retention_days,
        },
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.shutdown().await;
    Ok(())
}

/// Postgres when a database URL is configured, otherwise an in-memory
/// store that is lost on restart.
async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TrendStore>> {
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; trends are kept in memory only");
        return Ok(Arc::new(MemoryTrendStore::new()));
    }

    let pool = trendscout_db::connect_pool_from_config(config).await?;
    let applied = trendscout_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations complete");
    Ok(Arc::new(PgTrendStore::new(pool)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
