use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use wp_api_types::Account;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("user rejected the account authorization request")]
    UserRejected,
    #[error("wallet provider unavailable: {0}")]
    Unavailable(String),
}

/// Capability handle onto an external wallet.
///
/// The wallet is ambient in a browser; here it is passed in explicitly so
/// session handling can be driven against any implementation.
#[async_trait]
pub trait ProviderPort: Send + Sync {
    /// Whether a wallet is reachable at all.
    fn is_available(&self) -> bool;

    /// Accounts the user has already authorized. Never prompts.
    async fn authorized_accounts(&self) -> Result<Vec<Account>, ProviderError>;

    /// Ask the user to authorize accounts. Interactive; may be declined.
    async fn request_accounts(&self) -> Result<Vec<Account>, ProviderError>;
}

/// Scripted provider for tests and headless runs.
#[derive(Default)]
pub struct StaticProvider {
    available: bool,
    decline_requests: bool,
    authorized: RwLock<Vec<Account>>,
    grants_on_request: Vec<Account>,
}

impl StaticProvider {
    /// No wallet installed at all.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Wallet present with accounts already authorized.
    pub fn with_authorized(accounts: Vec<Account>) -> Self {
        Self {
            available: true,
            authorized: RwLock::new(accounts),
            ..Self::default()
        }
    }

    /// Wallet present; the user will grant `accounts` when prompted.
    pub fn granting(accounts: Vec<Account>) -> Self {
        Self {
            available: true,
            grants_on_request: accounts,
            ..Self::default()
        }
    }

    /// Wallet present; the user will decline any prompt.
    pub fn declining() -> Self {
        Self {
            available: true,
            decline_requests: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ProviderPort for StaticProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn authorized_accounts(&self) -> Result<Vec<Account>, ProviderError> {
        if !self.available {
            return Err(ProviderError::Unavailable("no wallet installed".to_owned()));
        }
        Ok(self.authorized.read().await.clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Account>, ProviderError> {
        if !self.available {
            return Err(ProviderError::Unavailable("no wallet installed".to_owned()));
        }
        if self.decline_requests {
            return Err(ProviderError::UserRejected);
        }

        let mut authorized = self.authorized.write().await;
        for account in &self.grants_on_request {
            if !authorized.contains(account) {
                authorized.push(account.clone());
            }
        }
        Ok(authorized.clone())
    }
}
