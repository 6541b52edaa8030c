use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use wp_api_types::{Account, Wave, WaveDraft};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("write requires a connected signer")]
    NoSigner,
    #[error("contract service unavailable: {0}")]
    Unavailable(String),
    #[error("contract call rejected: {0}")]
    Rejected(String),
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("unexpected contract failure: {0}")]
    Unknown(String),
}

/// Handle returned by a broadcast before the transaction is mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWave {
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveReceipt {
    pub tx_hash: String,
    pub success: bool,
}

/// The contract's published operations plus receipt retrieval.
///
/// Reads need no signer. `wave` attributes the entry to `signer`, whose
/// authorization is the wallet provider's concern, not the gateway's.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    async fn total_waves(&self) -> Result<u64, GatewayError>;

    /// Full feed in contract-assigned ascending `index` order. The gateway
    /// never reorders.
    async fn waves(&self) -> Result<Vec<Wave>, GatewayError>;

    /// True iff `account` has a previously confirmed wave.
    async fn has_waved(&self, account: &Account) -> Result<bool, GatewayError>;

    async fn wave(
        &self,
        signer: &Account,
        draft: &WaveDraft,
        created_at_epoch_ms: u128,
    ) -> Result<PendingWave, GatewayError>;

    /// Suspend until the service reports a receipt for `tx_hash`.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<WaveReceipt, GatewayError>;
}

// ── In-memory contract ──

struct PendingSubmission {
    owner: Account,
    draft: WaveDraft,
    created_at_epoch_ms: u128,
    revert: bool,
}

#[derive(Default)]
struct ContractState {
    waves: Vec<Wave>,
    pending: HashMap<String, PendingSubmission>,
    submitted: u64,
    revert_next: bool,
}

/// Faithful in-memory stand-in for the deployed contract.
///
/// Appends with strictly increasing indices, enforces one confirmed wave
/// per account at mining time, and supports scripted reverts and receipt
/// delays.
#[derive(Default)]
pub struct InMemoryContract {
    state: RwLock<ContractState>,
    receipt_delay: Duration,
}

impl InMemoryContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every receipt by `delay` before resolving it.
    pub fn with_receipt_delay(delay: Duration) -> Self {
        Self {
            receipt_delay: delay,
            ..Self::default()
        }
    }

    /// Force the next submitted wave to revert at mining time.
    pub async fn revert_next_wave(&self) {
        self.state.write().await.revert_next = true;
    }

    /// How many broadcasts this contract has accepted.
    pub async fn submitted_count(&self) -> u64 {
        self.state.read().await.submitted
    }
}

#[async_trait]
impl ContractGateway for InMemoryContract {
    async fn total_waves(&self) -> Result<u64, GatewayError> {
        Ok(self.state.read().await.waves.len() as u64)
    }

    async fn waves(&self) -> Result<Vec<Wave>, GatewayError> {
        Ok(self.state.read().await.waves.clone())
    }

    async fn has_waved(&self, account: &Account) -> Result<bool, GatewayError> {
        let state = self.state.read().await;
        Ok(state.waves.iter().any(|wave| &wave.owner == account))
    }

    async fn wave(
        &self,
        signer: &Account,
        draft: &WaveDraft,
        created_at_epoch_ms: u128,
    ) -> Result<PendingWave, GatewayError> {
        let mut state = self.state.write().await;

        state.submitted += 1;
        let tx_hash = format!("txn_{:08x}", state.submitted);
        let revert = std::mem::take(&mut state.revert_next);

        state.pending.insert(
            tx_hash.clone(),
            PendingSubmission {
                owner: signer.clone(),
                draft: draft.clone(),
                created_at_epoch_ms,
                revert,
            },
        );

        Ok(PendingWave { tx_hash })
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<WaveReceipt, GatewayError> {
        if !self.receipt_delay.is_zero() {
            tokio::time::sleep(self.receipt_delay).await;
        }

        let mut state = self.state.write().await;
        let Some(submission) = state.pending.remove(tx_hash) else {
            return Err(GatewayError::Unknown(format!(
                "no pending transaction {tx_hash}"
            )));
        };

        // One confirmed wave per account, enforced where the real contract
        // enforces it: at mining time.
        let duplicate = state
            .waves
            .iter()
            .any(|wave| wave.owner == submission.owner);
        if submission.revert || duplicate {
            return Ok(WaveReceipt {
                tx_hash: tx_hash.to_owned(),
                success: false,
            });
        }

        let index = state.waves.len() as u64;
        state.waves.push(Wave {
            index,
            owner: submission.owner,
            display_name: submission.draft.display_name,
            message: submission.draft.message,
            created_at_epoch_ms: submission.created_at_epoch_ms,
        });

        Ok(WaveReceipt {
            tx_hash: tx_hash.to_owned(),
            success: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, message: &str) -> WaveDraft {
        WaveDraft {
            display_name: name.to_owned(),
            message: message.to_owned(),
        }
    }

    #[tokio::test]
    async fn confirmed_wave_appends_with_increasing_index() -> anyhow::Result<()> {
        let contract = InMemoryContract::new();
        let alice = Account("0xABC".to_owned());
        let bob = Account("0xDEF".to_owned());

        assert_eq!(contract.total_waves().await?, 0);
        assert!(!contract.has_waved(&alice).await?);

        let pending = contract.wave(&alice, &draft("Alice", "hi"), 1_700_000_000_000).await?;
        let receipt = contract.wait_for_receipt(&pending.tx_hash).await?;
        assert!(receipt.success);

        let pending = contract.wave(&bob, &draft("Bob", "yo"), 1_700_000_000_001).await?;
        let receipt = contract.wait_for_receipt(&pending.tx_hash).await?;
        assert!(receipt.success);

        let waves = contract.waves().await?;
        assert_eq!(waves.len(), 2);
        assert_eq!(waves[0].index, 0);
        assert_eq!(waves[1].index, 1);
        assert_eq!(waves[1].owner, bob);
        assert!(contract.has_waved(&alice).await?);

        Ok(())
    }

    #[tokio::test]
    async fn second_wave_from_same_account_reverts() -> anyhow::Result<()> {
        let contract = InMemoryContract::new();
        let alice = Account("0xABC".to_owned());

        let pending = contract.wave(&alice, &draft("Alice", "hi"), 1).await?;
        assert!(contract.wait_for_receipt(&pending.tx_hash).await?.success);

        let pending = contract.wave(&alice, &draft("Alice", "again"), 2).await?;
        let receipt = contract.wait_for_receipt(&pending.tx_hash).await?;
        assert!(!receipt.success);

        // The failed attempt left no trace in the feed.
        assert_eq!(contract.total_waves().await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn scripted_revert_fails_the_receipt() -> anyhow::Result<()> {
        let contract = InMemoryContract::new();
        contract.revert_next_wave().await;

        let pending = contract
            .wave(&Account("0xABC".to_owned()), &draft("Alice", "hi"), 1)
            .await?;
        let receipt = contract.wait_for_receipt(&pending.tx_hash).await?;
        assert!(!receipt.success);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_hash_is_reported() {
        let contract = InMemoryContract::new();
        let err = contract.wait_for_receipt("txn_missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unknown(_)));
    }
}
