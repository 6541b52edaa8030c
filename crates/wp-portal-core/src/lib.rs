use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;
use wp_api_types::{Account, TxStatus, WaveDraft};
use wp_contract_client::{ContractGateway, GatewayError};
use wp_feed_cache::{FeedSnapshot, WaveFeedCache};
use wp_provider::ProviderPort;
use wp_session::{SessionError, SessionManager, SessionState};
use wp_tx_tracker::{TrackerConfig, TrackerError, Transaction, TransactionTracker};
use wp_wave_form::ValidationError;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("write requires a connected session")]
    NoSigner,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Everything a UI needs: session handling, feed mirroring, and the wave
/// submit pipeline, over any provider and contract implementation.
pub struct PortalClient<P, G> {
    session: RwLock<SessionManager<P>>,
    gateway: G,
    tracker: TransactionTracker,
    feed: WaveFeedCache,
}

impl<P, G> PortalClient<P, G>
where
    P: ProviderPort,
    G: ContractGateway,
{
    pub fn new(provider: P, gateway: G) -> Self {
        Self::with_tracker_config(provider, gateway, TrackerConfig::default())
    }

    pub fn with_tracker_config(provider: P, gateway: G, config: TrackerConfig) -> Self {
        Self {
            session: RwLock::new(SessionManager::new(provider)),
            gateway,
            tracker: TransactionTracker::new(config),
            feed: WaveFeedCache::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn detect(&self) -> SessionState {
        self.session.write().await.detect().await
    }

    pub async fn connect(&self) -> Result<Account, SessionError> {
        self.session.write().await.connect().await
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.read().await.state().clone()
    }

    pub async fn current_account(&self) -> Option<Account> {
        self.session.read().await.current_account().cloned()
    }

    /// Mirror the feed from the contract. Works without a session.
    pub async fn refresh_feed(&self) -> Result<FeedSnapshot, GatewayError> {
        self.feed.refresh(&self.gateway).await
    }

    pub async fn feed_snapshot(&self) -> FeedSnapshot {
        self.feed.current_snapshot().await
    }

    pub async fn current_transaction(&self) -> Option<Transaction> {
        self.tracker.current().await
    }

    /// Validate, broadcast, and track one wave to a terminal status; on
    /// confirmation the mirrored feed is refreshed so the caller observes
    /// the new entry.
    pub async fn submit_wave(&self, draft: &WaveDraft) -> Result<Transaction, SubmitError> {
        let account = self
            .current_account()
            .await
            .ok_or(SubmitError::NoSigner)?;

        wp_wave_form::can_submit(draft, &account, &self.gateway).await?;

        let tx = self
            .tracker
            .submit_and_track(&self.gateway, &account, draft, epoch_ms())
            .await?;

        if tx.status == TxStatus::Confirmed {
            // The wave is on chain either way; a stale mirror is the
            // lesser problem.
            if let Err(err) = self.feed.refresh(&self.gateway).await {
                warn!("feed refresh after confirmation failed: {err}");
            }
        }

        Ok(tx)
    }
}

fn epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
