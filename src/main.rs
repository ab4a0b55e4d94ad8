//! Referral engine service entry point.
//!
//! Builds the application context once (no global singletons), spawns the
//! background settlement task, and serves the HTTP API with graceful
//! shutdown: an in-flight settlement cycle finishes committing confirmed
//! groups before the process exits.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use referral_engine::adapters::http::{referral_router, ReferralAppState, SaleWebhookVerifier};
use referral_engine::adapters::memory::InMemoryResolveCache;
use referral_engine::adapters::notify::LogTierNotifier;
use referral_engine::adapters::postgres::{
    PostgresAccountRepository, PostgresAttributionStore, PostgresLedgerRepository,
    PostgresSettlementLock,
};
use referral_engine::adapters::redis::RedisResolveCache;
use referral_engine::adapters::stripe::{StripeRailConfig, StripeTransferRail};
use referral_engine::application::handlers::payout::{RunSettlementCycleHandler, SettlementTask};
use referral_engine::config::AppConfig;
use referral_engine::ports::ResolveCache;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    // Storage
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let accounts = Arc::new(PostgresAccountRepository::new(pool.clone()));
    let ledger = Arc::new(PostgresLedgerRepository::new(pool.clone()));
    let attributions = Arc::new(PostgresAttributionStore::new(pool.clone()));
    let lock = Arc::new(PostgresSettlementLock::new(pool));

    // Resolve cache: shared Redis when configured, in-process otherwise.
    let resolve_cache: Arc<dyn ResolveCache> = if config.redis.is_enabled() {
        let client = redis::Client::open(config.redis.url.as_str())?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Arc::new(RedisResolveCache::new(conn))
    } else {
        Arc::new(InMemoryResolveCache::new())
    };

    // Collaborators
    let rail_config = StripeRailConfig::new(SecretString::new(
        config.payout.stripe_api_key.clone(),
    ))
    .with_request_timeout(Duration::from_secs(config.payout.rail_timeout_secs));
    let rail = Arc::new(StripeTransferRail::new(rail_config)?);
    let notifier = Arc::new(LogTierNotifier::new());

    let schedule = Arc::new(config.tiers.load_schedule()?);
    let webhook_verifier = Arc::new(SaleWebhookVerifier::new(SecretString::new(
        config.payout.sale_webhook_secret.clone(),
    )));

    // Background settlement
    let settlement_handler = Arc::new(RunSettlementCycleHandler::new(
        ledger.clone(),
        accounts.clone(),
        rail,
        lock,
        config.payout.settlement_policy(),
    ));
    let settlement_task = SettlementTask::with_config(
        settlement_handler,
        config.payout.settlement_task_config(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let settlement_join = tokio::spawn(async move {
        settlement_task.run(shutdown_rx).await;
    });

    // HTTP surface
    let state = ReferralAppState {
        accounts,
        ledger,
        attributions,
        resolve_cache,
        notifier,
        schedule,
        webhook_verifier,
        resolve_cache_ttl: config.redis.resolve_ttl(),
    };

    let router = referral_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            ))),
    );

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "referral engine listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the settlement task finish its in-flight cycle.
    tracing::info!("shutting down, draining settlement task");
    let _ = shutdown_tx.send(true);
    let _ = settlement_join.await;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
