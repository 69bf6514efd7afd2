//! Domain layer: identifiers, pool state, claim records, and events.
//!
//! This module contains the core ledger model: typed identifiers, the
//! pool registry with atomic per-pool balances, claim transaction
//! records, the scannable claim code, and the event bus that broadcasts
//! state changes.

pub mod claim;
pub mod claim_code;
pub mod event_bus;
pub mod ids;
pub mod ledger_event;
pub mod pool;
pub mod pool_registry;

pub use claim::{ClaimStatus, ClaimTransaction};
pub use claim_code::ClaimCode;
pub use event_bus::EventBus;
pub use ids::{ParticipantId, PoolId, TransactionId};
pub use ledger_event::LedgerEvent;
pub use pool::{PoolSnapshot, PoolState, ReservationToken};
pub use pool_registry::PoolRegistry;
