use thiserror::Error;
use wp_api_types::{Account, WaveDraft};
use wp_contract_client::{ContractGateway, GatewayError};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("display name is required")]
    MissingDisplayName,
    #[error("this account has already waved")]
    AlreadyWaved,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Gate a wave before it reaches the contract's write path.
///
/// Input completeness is checked first, without any network traffic; the
/// per-account dedupe flag is read from the contract afterwards. One
/// confirmed wave per account is product policy, so an account that has
/// already waved is blocked from resubmitting.
pub async fn can_submit<G>(
    draft: &WaveDraft,
    account: &Account,
    gateway: &G,
) -> Result<(), ValidationError>
where
    G: ContractGateway + ?Sized,
{
    if draft.display_name.trim().is_empty() {
        return Err(ValidationError::MissingDisplayName);
    }

    if gateway.has_waved(account).await? {
        return Err(ValidationError::AlreadyWaved);
    }

    Ok(())
}
