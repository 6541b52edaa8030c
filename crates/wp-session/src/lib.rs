use thiserror::Error;
use tracing::{info, warn};
use wp_api_types::Account;
use wp_provider::{ProviderError, ProviderPort};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoProvider,
    Disconnected,
    Connecting,
    Connected { account: Account },
}

impl SessionState {
    fn label(&self) -> &'static str {
        match self {
            Self::NoProvider => "no_provider",
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected { .. } => "connected",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// A notice, not a fault: the feature degrades to read-only.
    #[error("no wallet provider detected")]
    NoProvider,
    #[error("wallet has no usable accounts")]
    NoAccounts,
    #[error("user rejected the connection request")]
    UserRejected,
    #[error("session is already connected")]
    AlreadyConnected,
    #[error(transparent)]
    Provider(ProviderError),
}

/// Sole owner of the wallet-connection state.
///
/// Other components read the current account through this type and never
/// mutate it.
pub struct SessionManager<P> {
    provider: P,
    state: SessionState,
}

impl<P: ProviderPort> SessionManager<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_account(&self) -> Option<&Account> {
        match &self.state {
            SessionState::Connected { account } => Some(account),
            _ => None,
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        info!(
            "session {} -> {}",
            self.state.label(),
            next.label()
        );
        self.state = next;
    }

    /// Non-interactive probe of the wallet. Resolves to `NoProvider`,
    /// `Connected` (pre-authorized account found) or `Disconnected`.
    pub async fn detect(&mut self) -> SessionState {
        if !self.provider.is_available() {
            self.transition(SessionState::NoProvider);
            return self.state.clone();
        }

        match self.provider.authorized_accounts().await {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(account) => self.transition(SessionState::Connected { account }),
                None => self.transition(SessionState::Disconnected),
            },
            Err(err) => {
                warn!("account listing failed: {err}");
                self.transition(SessionState::Disconnected);
            }
        }

        self.state.clone()
    }

    /// Interactive connection. Valid from `Disconnected` and `NoProvider`;
    /// prompts the user and records the first granted account.
    pub async fn connect(&mut self) -> Result<Account, SessionError> {
        if matches!(self.state, SessionState::Connected { .. }) {
            return Err(SessionError::AlreadyConnected);
        }

        if !self.provider.is_available() {
            self.transition(SessionState::NoProvider);
            return Err(SessionError::NoProvider);
        }

        self.transition(SessionState::Connecting);

        let accounts = match self.provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(ProviderError::UserRejected) => {
                self.transition(SessionState::Disconnected);
                return Err(SessionError::UserRejected);
            }
            Err(err) => {
                self.transition(SessionState::Disconnected);
                return Err(SessionError::Provider(err));
            }
        };

        let Some(account) = accounts.into_iter().next() else {
            self.transition(SessionState::Disconnected);
            return Err(SessionError::NoAccounts);
        };

        self.transition(SessionState::Connected {
            account: account.clone(),
        });
        Ok(account)
    }
}
