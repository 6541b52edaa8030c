use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use wp_api_types::Wave;
use wp_contract_client::{ContractGateway, GatewayError};

/// The locally mirrored feed. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub total: u64,
    pub waves: Vec<Wave>,
}

/// Sole owner of the mirrored feed.
///
/// Readers clone the current snapshot and never observe a partial update;
/// concurrent refreshes collapse to whichever write lands last.
#[derive(Default)]
pub struct WaveFeedCache {
    snapshot: RwLock<FeedSnapshot>,
}

impl WaveFeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-read the feed from the contract and swap the snapshot in one
    /// step. Needs no signer.
    pub async fn refresh<G>(&self, gateway: &G) -> Result<FeedSnapshot, GatewayError>
    where
        G: ContractGateway + ?Sized,
    {
        let waves = gateway.waves().await?;
        let total = gateway.total_waves().await?;

        let next = FeedSnapshot { total, waves };
        debug!("feed refreshed: {} waves", next.waves.len());

        *self.snapshot.write().await = next.clone();
        Ok(next)
    }

    pub async fn current_snapshot(&self) -> FeedSnapshot {
        self.snapshot.read().await.clone()
    }
}
