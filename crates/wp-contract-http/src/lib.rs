use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use wp_api_types::{Account, Wave, WaveDraft};
use wp_contract_client::{ContractGateway, GatewayError, PendingWave, WaveReceipt};

pub const TESTNET_CONTRACT_ADDRESS: &str = "0x9b3cde41ab8b0c4d79fa2ef1e0f32c5aa9c8d701";
pub const MAINNET_CONTRACT_ADDRESS: &str = "0x5f1e07ad22bc60a13f9b5ce4df230c8ea4e27b93";

/// Deployment target. Selects the default contract address; everything else
/// about the node protocol is identical across networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub fn default_contract_address(&self) -> &'static str {
        match self {
            Self::Testnet => TESTNET_CONTRACT_ADDRESS,
            Self::Mainnet => MAINNET_CONTRACT_ADDRESS,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "testnet" => Some(Self::Testnet),
            "mainnet" => Some(Self::Mainnet),
            _ => None,
        }
    }

    /// Reads `WAVEPORTAL_NETWORK` (default: testnet).
    pub fn from_env() -> Self {
        match std::env::var("WAVEPORTAL_NETWORK") {
            Ok(value) => Network::parse(&value).unwrap_or_else(|| {
                warn!("unrecognized WAVEPORTAL_NETWORK '{value}', using testnet");
                Self::Testnet
            }),
            Err(_) => Self::Testnet,
        }
    }
}

/// HTTP adapter to a contract node's REST facade.
///
/// Reads `WAVEPORTAL_RPC_URL` and `WAVEPORTAL_CONTRACT_ADDRESS` from the
/// environment at construction time (defaults: `http://localhost:8545` and
/// the active network's deployed address).
pub struct HttpContractGateway {
    endpoint: String,
    contract_address: String,
    http: reqwest::Client,
    receipt_poll_interval: Duration,
}

impl Default for HttpContractGateway {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl HttpContractGateway {
    pub fn new(endpoint: Option<String>, contract_address: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("WAVEPORTAL_RPC_URL").ok())
            .unwrap_or_else(|| "http://localhost:8545".to_string());
        let contract_address = contract_address
            .or_else(|| std::env::var("WAVEPORTAL_CONTRACT_ADDRESS").ok())
            .unwrap_or_else(|| Network::from_env().default_contract_address().to_string());

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            contract_address,
            http: reqwest::Client::new(),
            receipt_poll_interval: Duration::from_millis(500),
        }
    }

    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    fn contract_url(&self, tail: &str) -> String {
        format!("{}/contract/{}/{}", self.endpoint, self.contract_address, tail)
    }
}

// ── Node REST API types ──

#[derive(Debug, Deserialize)]
struct TotalWavesWire {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct HasWavedWire {
    has_waved: bool,
}

#[derive(Debug, Serialize)]
struct WaveSubmitWire {
    from: String,
    display_name: String,
    message: String,
    created_at_epoch_ms: u128,
}

#[derive(Debug, Deserialize)]
struct TxHashWire {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct ReceiptWire {
    tx_hash: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct NodeErrorWire {
    error: String,
}

fn transport_error(op: &str, err: reqwest::Error) -> GatewayError {
    GatewayError::Unavailable(format!("{op} transport: {err}"))
}

/// Map a non-success node response onto the gateway taxonomy.
async fn response_error(op: &str, response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<NodeErrorWire>(&text)
        .map(|wire| wire.error)
        .unwrap_or(text);

    if detail.to_ascii_lowercase().contains("revert") {
        return GatewayError::Reverted(detail);
    }
    if status.is_client_error() {
        return GatewayError::Rejected(format!("{op}: {detail}"));
    }
    GatewayError::Unknown(format!("{op} HTTP {status}: {detail}"))
}

/// Decode raw feed entries, dropping anything that does not match the wave
/// schema. Malformed entries are reported, never displayed.
fn decode_waves(entries: Vec<serde_json::Value>) -> Vec<Wave> {
    let mut waves = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<Wave>(entry) {
            Ok(wave) => waves.push(wave),
            Err(err) => warn!("dropping malformed feed entry: {err}"),
        }
    }
    waves
}

#[async_trait]
impl ContractGateway for HttpContractGateway {
    async fn total_waves(&self) -> Result<u64, GatewayError> {
        let response = self
            .http
            .get(self.contract_url("total-waves"))
            .send()
            .await
            .map_err(|err| transport_error("total_waves", err))?;

        if !response.status().is_success() {
            return Err(response_error("total_waves", response).await);
        }

        let wire: TotalWavesWire = response
            .json()
            .await
            .map_err(|err| GatewayError::Unknown(format!("total_waves parse: {err}")))?;
        Ok(wire.total)
    }

    async fn waves(&self) -> Result<Vec<Wave>, GatewayError> {
        let response = self
            .http
            .get(self.contract_url("waves"))
            .send()
            .await
            .map_err(|err| transport_error("waves", err))?;

        if !response.status().is_success() {
            return Err(response_error("waves", response).await);
        }

        let entries: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|err| GatewayError::Unknown(format!("waves parse: {err}")))?;
        Ok(decode_waves(entries))
    }

    async fn has_waved(&self, account: &Account) -> Result<bool, GatewayError> {
        let response = self
            .http
            .get(self.contract_url(&format!("has-waved/{}", account.0)))
            .send()
            .await
            .map_err(|err| transport_error("has_waved", err))?;

        if !response.status().is_success() {
            return Err(response_error("has_waved", response).await);
        }

        let wire: HasWavedWire = response
            .json()
            .await
            .map_err(|err| GatewayError::Unknown(format!("has_waved parse: {err}")))?;
        Ok(wire.has_waved)
    }

    async fn wave(
        &self,
        signer: &Account,
        draft: &WaveDraft,
        created_at_epoch_ms: u128,
    ) -> Result<PendingWave, GatewayError> {
        let body = WaveSubmitWire {
            from: signer.0.clone(),
            display_name: draft.display_name.clone(),
            message: draft.message.clone(),
            created_at_epoch_ms,
        };

        let response = self
            .http
            .post(self.contract_url("wave"))
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error("wave", err))?;

        if !response.status().is_success() {
            return Err(response_error("wave", response).await);
        }

        let wire: TxHashWire = response
            .json()
            .await
            .map_err(|err| GatewayError::Unknown(format!("wave parse: {err}")))?;
        Ok(PendingWave { tx_hash: wire.tx_hash })
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<WaveReceipt, GatewayError> {
        let url = format!("{}/tx/{}/receipt", self.endpoint, tx_hash);

        loop {
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|err| transport_error("wait_for_receipt", err))?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                // Not yet indexed by the node.
                tokio::time::sleep(self.receipt_poll_interval).await;
                continue;
            }

            if !response.status().is_success() {
                return Err(response_error("wait_for_receipt", response).await);
            }

            let wire: ReceiptWire = response
                .json()
                .await
                .map_err(|err| GatewayError::Unknown(format!("receipt parse: {err}")))?;

            match wire.status.as_str() {
                "pending" => tokio::time::sleep(self.receipt_poll_interval).await,
                "success" => {
                    return Ok(WaveReceipt {
                        tx_hash: wire.tx_hash,
                        success: true,
                    });
                }
                "reverted" => {
                    return Ok(WaveReceipt {
                        tx_hash: wire.tx_hash,
                        success: false,
                    });
                }
                other => {
                    return Err(GatewayError::Unknown(format!(
                        "unrecognized receipt status '{other}' for {tx_hash}"
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_feed_entries_are_dropped() {
        let entries = vec![
            json!({
                "index": 0,
                "owner": "0xABC",
                "display_name": "Alice",
                "message": "hi",
                "created_at_epoch_ms": 1_700_000_000_000_u64,
            }),
            // Missing owner.
            json!({
                "index": 1,
                "display_name": "Bob",
                "message": "yo",
                "created_at_epoch_ms": 1_700_000_000_001_u64,
            }),
            // Index has the wrong type.
            json!({
                "index": "two",
                "owner": "0xDEF",
                "display_name": "Eve",
                "message": "hey",
                "created_at_epoch_ms": 1_700_000_000_002_u64,
            }),
        ];

        let waves = decode_waves(entries);
        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].owner, Account("0xABC".to_owned()));
        assert_eq!(waves[0].display_name, "Alice");
    }

    #[test]
    fn network_parsing_and_addresses() {
        assert_eq!(Network::parse("testnet"), Some(Network::Testnet));
        assert_eq!(Network::parse(" Mainnet "), Some(Network::Mainnet));
        assert_eq!(Network::parse("localnet"), None);

        assert_eq!(
            Network::Testnet.default_contract_address(),
            TESTNET_CONTRACT_ADDRESS
        );
        assert_ne!(
            Network::Testnet.default_contract_address(),
            Network::Mainnet.default_contract_address()
        );
    }

    #[test]
    fn explicit_arguments_win_over_defaults() {
        let gateway = HttpContractGateway::new(
            Some("http://node.example:9000/".to_owned()),
            Some("0x1234".to_owned()),
        );

        assert_eq!(gateway.contract_address(), "0x1234");
        assert_eq!(gateway.contract_url("waves"), "http://node.example:9000/contract/0x1234/waves");
    }
}
