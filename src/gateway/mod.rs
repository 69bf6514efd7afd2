//! Disbursement gateway contract.
//!
//! The actual funds transfer is an external collaborator. The ledger
//! talks to it through [`DisbursementGateway`], which must be idempotent
//! per transaction id: repeated `disburse` calls with the same id never
//! pay twice, and [`DisbursementGateway::lookup_outcome`] lets the
//! reconciliation sweep resolve claims whose outcome was lost to a crash
//! or timeout.

pub mod simulated;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{ParticipantId, TransactionId};

pub use simulated::{SimulatedGateway, SimulationMode};

/// Result of a disbursement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisburseOutcome {
    /// The transfer settled. The reservation must be committed.
    Succeeded,
    /// The gateway is certain no transfer occurred. The reservation can
    /// be released immediately.
    Failed,
    /// No answer within the deadline; the transfer may or may not have
    /// settled. The reservation stays held for reconciliation.
    TimedOut,
}

/// Result of an outcome lookup during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeReport {
    /// The transfer settled.
    Succeeded,
    /// The transfer definitively did not happen.
    Failed,
    /// The gateway has no record of the transaction. Treated as a
    /// failure: the ledger favors under-disbursement over double-pay.
    Unknown,
}

/// External payment gateway contract.
///
/// Implementations must be idempotent per `transaction_id`.
#[async_trait]
pub trait DisbursementGateway: Send + Sync + fmt::Debug {
    /// Transfers `amount` to `participant_id` for the given transaction.
    ///
    /// A repeated call with the same `transaction_id` must return the
    /// recorded outcome of the first attempt without paying again.
    async fn disburse(
        &self,
        transaction_id: TransactionId,
        participant_id: &ParticipantId,
        amount: u64,
    ) -> DisburseOutcome;

    /// Reports the outcome of a past disbursement attempt.
    async fn lookup_outcome(&self, transaction_id: TransactionId) -> OutcomeReport;
}
