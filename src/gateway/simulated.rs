//! Simulated disbursement gateway.
//!
//! Stands in for a real payment rail: it sleeps for a configurable
//! latency, records the outcome per transaction id, and answers outcome
//! lookups from that record. Failure and unresponsive modes exist for
//! exercising the release and reconciliation paths.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DisburseOutcome, DisbursementGateway, OutcomeReport};
use crate::domain::{ParticipantId, TransactionId};

/// How the simulated gateway answers disbursement requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationMode {
    /// Every transfer settles.
    Succeed,
    /// Every transfer fails definitively, before any money moves.
    Fail,
    /// The gateway never answers and records nothing, so later outcome
    /// lookups report [`OutcomeReport::Unknown`].
    Unresponsive,
}

/// In-process [`DisbursementGateway`] simulation.
///
/// Outcomes are keyed by transaction id, which makes repeated `disburse`
/// calls idempotent and gives the reconciliation sweep something to
/// interrogate.
#[derive(Debug)]
pub struct SimulatedGateway {
    mode: SimulationMode,
    latency: Duration,
    outcomes: RwLock<HashMap<TransactionId, bool>>,
}

impl SimulatedGateway {
    /// Creates a gateway where every transfer settles after `latency`.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self::with_mode(SimulationMode::Succeed, latency)
    }

    /// Creates a gateway with an explicit simulation mode.
    #[must_use]
    pub fn with_mode(mode: SimulationMode, latency: Duration) -> Self {
        Self {
            mode,
            latency,
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds a recorded outcome for a transaction id.
    ///
    /// Used to model a transfer that settled (or failed) out of band,
    /// e.g. after the service crashed mid-claim.
    pub async fn record_outcome(&self, transaction_id: TransactionId, succeeded: bool) {
        self.outcomes
            .write()
            .await
            .insert(transaction_id, succeeded);
    }
}

#[async_trait]
impl DisbursementGateway for SimulatedGateway {
    async fn disburse(
        &self,
        transaction_id: TransactionId,
        participant_id: &ParticipantId,
        amount: u64,
    ) -> DisburseOutcome {
        // Idempotent replay: a transaction we already settled is never
        // paid a second time.
        if let Some(&succeeded) = self.outcomes.read().await.get(&transaction_id) {
            return if succeeded {
                DisburseOutcome::Succeeded
            } else {
                DisburseOutcome::Failed
            };
        }

        if self.mode == SimulationMode::Unresponsive {
            // Outlive any reasonable caller deadline without recording
            // an outcome.
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return DisburseOutcome::TimedOut;
        }

        tokio::time::sleep(self.latency).await;

        let succeeded = self.mode == SimulationMode::Succeed;
        tracing::info!(
            %transaction_id,
            participant = %participant_id,
            amount,
            succeeded,
            "simulating disbursement"
        );
        self.outcomes
            .write()
            .await
            .insert(transaction_id, succeeded);

        if succeeded {
            DisburseOutcome::Succeeded
        } else {
            DisburseOutcome::Failed
        }
    }

    async fn lookup_outcome(&self, transaction_id: TransactionId) -> OutcomeReport {
        match self.outcomes.read().await.get(&transaction_id) {
            Some(true) => OutcomeReport::Succeeded,
            Some(false) => OutcomeReport::Failed,
            None => OutcomeReport::Unknown,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_disbursement_is_recorded() {
        let gateway = SimulatedGateway::new(Duration::ZERO);
        let tx = TransactionId::new();
        let participant = ParticipantId::new("user-1");

        let outcome = gateway.disburse(tx, &participant, 30).await;
        assert_eq!(outcome, DisburseOutcome::Succeeded);
        assert_eq!(gateway.lookup_outcome(tx).await, OutcomeReport::Succeeded);
    }

    #[tokio::test]
    async fn failing_gateway_reports_failure() {
        let gateway = SimulatedGateway::with_mode(SimulationMode::Fail, Duration::ZERO);
        let tx = TransactionId::new();
        let participant = ParticipantId::new("user-1");

        let outcome = gateway.disburse(tx, &participant, 30).await;
        assert_eq!(outcome, DisburseOutcome::Failed);
        assert_eq!(gateway.lookup_outcome(tx).await, OutcomeReport::Failed);
    }

    #[tokio::test]
    async fn repeated_disburse_replays_recorded_outcome() {
        let gateway = SimulatedGateway::new(Duration::ZERO);
        let tx = TransactionId::new();
        let participant = ParticipantId::new("user-1");

        let first = gateway.disburse(tx, &participant, 30).await;
        let second = gateway.disburse(tx, &participant, 30).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_transaction_has_no_outcome() {
        let gateway = SimulatedGateway::new(Duration::ZERO);
        let report = gateway.lookup_outcome(TransactionId::new()).await;
        assert_eq!(report, OutcomeReport::Unknown);
    }

    #[tokio::test]
    async fn seeded_outcome_answers_lookup() {
        let gateway = SimulatedGateway::with_mode(SimulationMode::Unresponsive, Duration::ZERO);
        let tx = TransactionId::new();
        gateway.record_outcome(tx, true).await;
        assert_eq!(gateway.lookup_outcome(tx).await, OutcomeReport::Succeeded);
    }
}
