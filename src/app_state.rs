//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{ClaimLedger, StatsAggregator};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Claim ledger for pool creation and claim submission.
    pub ledger: Arc<ClaimLedger>,
    /// Read-side aggregator for pool statistics.
    pub stats: Arc<StatsAggregator>,
    /// Event bus carrying ledger lifecycle events.
    pub event_bus: EventBus,
}
