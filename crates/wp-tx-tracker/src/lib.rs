use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;
use wp_api_types::{Account, TxStatus, WaveDraft};
use wp_contract_client::{ContractGateway, GatewayError};

/// A submitted write and where it is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub hash: String,
    pub status: TxStatus,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Policy rejection, not a fault: one wave at a time per session.
    #[error("another wave is still in flight")]
    TransactionInFlight,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Upper bound on the receipt wait. Expiry resolves `Stalled`, not
    /// `Failed`: the broadcast is irrevocable and may still confirm.
    pub receipt_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

enum Slot {
    /// Broadcast underway, no hash assigned yet.
    Reserved,
    Active(Transaction),
}

/// Drives one wave at a time from broadcast to a terminal status.
///
/// The slot is reserved before the broadcast goes out, so a second submit
/// while one is outstanding is rejected without touching the network.
pub struct TransactionTracker {
    config: TrackerConfig,
    slot: Mutex<Option<Slot>>,
}

impl Default for TransactionTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl TransactionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
        }
    }

    /// The most recently tracked transaction, terminal or not.
    pub async fn current(&self) -> Option<Transaction> {
        match self.slot.lock().await.as_ref() {
            Some(Slot::Active(tx)) => Some(tx.clone()),
            _ => None,
        }
    }

    async fn record(&self, tx: &Transaction) {
        info!("transaction {} -> {}", tx.hash, tx.status);
        *self.slot.lock().await = Some(Slot::Active(tx.clone()));
    }

    /// Broadcast `draft` as `signer` and follow it to a terminal status.
    pub async fn submit_and_track<G>(
        &self,
        gateway: &G,
        signer: &Account,
        draft: &WaveDraft,
        created_at_epoch_ms: u128,
    ) -> Result<Transaction, TrackerError>
    where
        G: ContractGateway + ?Sized,
    {
        {
            let mut slot = self.slot.lock().await;
            let busy = match slot.as_ref() {
                Some(Slot::Reserved) => true,
                Some(Slot::Active(tx)) => !tx.status.is_terminal(),
                None => false,
            };
            if busy {
                return Err(TrackerError::TransactionInFlight);
            }
            *slot = Some(Slot::Reserved);
        }

        let pending = match gateway.wave(signer, draft, created_at_epoch_ms).await {
            Ok(pending) => pending,
            Err(err) => {
                // Nothing went out; free the slot for a retry.
                *self.slot.lock().await = None;
                return Err(err.into());
            }
        };

        let mut tx = Transaction {
            hash: pending.tx_hash,
            status: TxStatus::Submitted,
        };
        self.record(&tx).await;

        tx.status = TxStatus::Mining;
        self.record(&tx).await;

        let receipt_wait = gateway.wait_for_receipt(&tx.hash);
        match tokio::time::timeout(self.config.receipt_timeout, receipt_wait).await {
            Ok(Ok(receipt)) => {
                tx.status = if receipt.success {
                    TxStatus::Confirmed
                } else {
                    TxStatus::Failed
                };
                self.record(&tx).await;
                Ok(tx)
            }
            Ok(Err(err)) => {
                // The receipt wait itself broke; the outcome is unknown.
                tx.status = TxStatus::Stalled;
                self.record(&tx).await;
                Err(err.into())
            }
            Err(_elapsed) => {
                tx.status = TxStatus::Stalled;
                self.record(&tx).await;
                Ok(tx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use wp_contract_client::{InMemoryContract, PendingWave, WaveReceipt};

    fn draft() -> WaveDraft {
        WaveDraft {
            display_name: "Alice".to_owned(),
            message: "hi".to_owned(),
        }
    }

    fn alice() -> Account {
        Account("0xABC".to_owned())
    }

    #[tokio::test]
    async fn successful_wave_confirms() -> anyhow::Result<()> {
        let contract = InMemoryContract::new();
        let tracker = TransactionTracker::default();

        let tx = tracker
            .submit_and_track(&contract, &alice(), &draft(), 1)
            .await?;

        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tracker.current().await, Some(tx));
        assert_eq!(contract.total_waves().await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn reverted_wave_fails() -> anyhow::Result<()> {
        let contract = InMemoryContract::new();
        contract.revert_next_wave().await;
        let tracker = TransactionTracker::default();

        let tx = tracker
            .submit_and_track(&contract, &alice(), &draft(), 1)
            .await?;

        assert_eq!(tx.status, TxStatus::Failed);
        assert_eq!(contract.total_waves().await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn second_submit_rejected_while_first_in_flight() -> anyhow::Result<()> {
        let contract = Arc::new(InMemoryContract::with_receipt_delay(Duration::from_millis(
            200,
        )));
        let tracker = Arc::new(TransactionTracker::default());

        let first = {
            let contract = Arc::clone(&contract);
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                tracker
                    .submit_and_track(contract.as_ref(), &alice(), &draft(), 1)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = tracker
            .submit_and_track(contract.as_ref(), &alice(), &draft(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::TransactionInFlight));

        // The rejected attempt produced no second broadcast.
        assert_eq!(contract.submitted_count().await, 1);

        let tx = first.await??;
        assert_eq!(tx.status, TxStatus::Confirmed);

        Ok(())
    }

    #[tokio::test]
    async fn receipt_beyond_the_bound_stalls_and_frees_the_slot() -> anyhow::Result<()> {
        let contract = InMemoryContract::with_receipt_delay(Duration::from_millis(500));
        let tracker = TransactionTracker::new(TrackerConfig {
            receipt_timeout: Duration::from_millis(50),
        });

        let tx = tracker
            .submit_and_track(&contract, &alice(), &draft(), 1)
            .await?;
        assert_eq!(tx.status, TxStatus::Stalled);

        // Stalled is terminal locally; a fresh submission may proceed.
        let contract2 = InMemoryContract::new();
        let tx = tracker
            .submit_and_track(&contract2, &alice(), &draft(), 2)
            .await?;
        assert_eq!(tx.status, TxStatus::Confirmed);

        Ok(())
    }

    struct BrokenGateway;

    #[async_trait]
    impl ContractGateway for BrokenGateway {
        async fn total_waves(&self) -> Result<u64, GatewayError> {
            Err(GatewayError::Unavailable("down".to_owned()))
        }

        async fn waves(&self) -> Result<Vec<wp_api_types::Wave>, GatewayError> {
            Err(GatewayError::Unavailable("down".to_owned()))
        }

        async fn has_waved(&self, _account: &Account) -> Result<bool, GatewayError> {
            Err(GatewayError::Unavailable("down".to_owned()))
        }

        async fn wave(
            &self,
            _signer: &Account,
            _draft: &WaveDraft,
            _created_at_epoch_ms: u128,
        ) -> Result<PendingWave, GatewayError> {
            Err(GatewayError::Unavailable("down".to_owned()))
        }

        async fn wait_for_receipt(&self, _tx_hash: &str) -> Result<WaveReceipt, GatewayError> {
            Err(GatewayError::Unavailable("down".to_owned()))
        }
    }

    #[tokio::test]
    async fn failed_broadcast_frees_the_slot() -> anyhow::Result<()> {
        let tracker = TransactionTracker::default();

        let err = tracker
            .submit_and_track(&BrokenGateway, &alice(), &draft(), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Gateway(GatewayError::Unavailable(_))
        ));
        assert!(tracker.current().await.is_none());

        // A later attempt against a healthy contract goes through.
        let contract = InMemoryContract::new();
        let tx = tracker
            .submit_and_track(&contract, &alice(), &draft(), 2)
            .await?;
        assert_eq!(tx.status, TxStatus::Confirmed);

        Ok(())
    }
}
