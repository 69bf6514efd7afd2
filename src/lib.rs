//! # giveaway-ledger
//!
//! REST service backing scannable giveaway claim codes.
//!
//! A giveaway pool holds a fixed amount of money that is handed out in
//! fixed per-claim shares, first come first served. The ledger's job is
//! the accounting: a share is atomically reserved before the payment
//! gateway is called, then committed or released depending on the
//! outcome, so the pool can never pay out more than it holds no matter
//! how many claimants scan at once.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── ClaimLedger / StatsAggregator / Reconciler (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── PoolRegistry + PoolState (domain/)
//!     ├── DisbursementGateway (gateway/)
//!     │
//!     └── TransactionLog + PostgreSQL Persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod service;
