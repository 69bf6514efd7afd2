//! giveaway-ledger server entry point.
//!
//! Starts the Axum HTTP server, optionally hydrates state from
//! PostgreSQL, and spawns the background reconciliation sweep.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use giveaway_ledger::api;
use giveaway_ledger::app_state::AppState;
use giveaway_ledger::config::LedgerConfig;
use giveaway_ledger::domain::{EventBus, PoolId, PoolRegistry, PoolState};
use giveaway_ledger::gateway::{DisbursementGateway, SimulatedGateway};
use giveaway_ledger::persistence::{MemoryTransactionLog, PostgresPersistence, TransactionLog};
use giveaway_ledger::service::{ClaimLedger, Reconciler, StatsAggregator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = LedgerConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting giveaway-ledger");

    // Build domain layer
    let registry = Arc::new(PoolRegistry::new());
    let event_bus = EventBus::new(config.event_bus_capacity);
    let log = Arc::new(MemoryTransactionLog::new());
    let gateway: Arc<dyn DisbursementGateway> = Arc::new(SimulatedGateway::new(Duration::from_millis(
        config.simulated_disburse_latency_ms,
    )));

    // Connect persistence and hydrate state from the last run
    let persistence = if config.persistence_enabled {
        let pg_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pg_pool).await?;

        let persistence = Arc::new(PostgresPersistence::new(pg_pool, config.event_log_enabled));

        for record in persistence.load_pools().await? {
            let state = PoolState::hydrate(
                PoolId::from_uuid(record.pool_id),
                u64::try_from(record.total_amount)?,
                u64::try_from(record.per_claim_amount)?,
                u64::try_from(record.remaining_amount)?,
                record.frozen,
                record.created_at,
            )?;
            registry.insert(state).await?;
        }
        for transaction in persistence.load_transactions().await? {
            log.restore(transaction).await;
        }
        tracing::info!(
            pools = registry.len().await,
            transactions = log.len().await,
            "hydrated state from database"
        );

        Some(persistence)
    } else {
        tracing::warn!("persistence disabled; state will not survive a restart");
        None
    };

    // Build service layer
    let shared_log: Arc<dyn TransactionLog> = log;
    let mut ledger = ClaimLedger::new(
        Arc::clone(&registry),
        Arc::clone(&shared_log),
        Arc::clone(&gateway),
        event_bus.clone(),
        Duration::from_millis(config.disburse_timeout_ms),
    );
    let mut reconciler = Reconciler::new(
        Arc::clone(&registry),
        Arc::clone(&shared_log),
        gateway,
        event_bus.clone(),
        chrono::Duration::seconds(i64::try_from(config.reconcile_grace_secs)?),
    );
    if let Some(persistence) = persistence {
        ledger = ledger.with_persistence(Arc::clone(&persistence));
        reconciler = reconciler.with_persistence(persistence);
    }
    let stats = Arc::new(StatsAggregator::new(
        Arc::clone(&registry),
        Arc::clone(&shared_log),
    ));

    // Spawn the reconciliation sweep; the first tick fires immediately,
    // which settles any claims left pending by a previous run.
    let _sweep = Arc::new(reconciler).spawn(Duration::from_secs(config.reconcile_interval_secs));

    // Build application state
    let app_state = AppState {
        ledger: Arc::new(ledger),
        stats,
        event_bus,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
