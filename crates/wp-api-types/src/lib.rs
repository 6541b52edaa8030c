use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Account(pub String);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Submitted,
    Mining,
    Confirmed,
    Failed,
    Stalled,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::Stalled)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Submitted => "submitted",
            Self::Mining => "mining",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Stalled => "stalled",
        };
        f.write_str(label)
    }
}

/// One recorded entry in the contract's append-only feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wave {
    pub index: u64,
    pub owner: Account,
    pub display_name: String,
    pub message: String,
    pub created_at_epoch_ms: u128,
}

/// User input for a wave before the client stamps a timestamp on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaveDraft {
    pub display_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub total: u64,
    pub waves: Vec<Wave>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalWavesResponse {
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HasWavedResponse {
    pub account: String,
    pub has_waved: bool,
}
