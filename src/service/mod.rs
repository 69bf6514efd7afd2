//! Service layer: claim orchestration, statistics, and reconciliation.
//!
//! [`ClaimLedger`] runs the reserve-then-confirm claim protocol,
//! [`StatsAggregator`] derives read-only views from committed records,
//! and [`Reconciler`] settles claims stranded by crashes or timeouts.

pub mod claim_ledger;
pub mod reconciler;
pub mod stats;

pub use claim_ledger::{ClaimLedger, ClaimReceipt};
pub use reconciler::{ReconcileReport, Reconciler};
pub use stats::{PoolStats, StatsAggregator};
