// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM source ledger: vault payouts, fee top-ups and asset transfers.
//!
//! Every submitting method waits for the configured number of confirmations
//! before returning. A failed wait is reported as-is and never resubmitted,
//! since a second submission could duplicate an irreversible transfer.

use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tracing::{debug, info};

use super::erc20::IERC20;
use super::privacy_vault::IPrivacyVault;
use super::types::{NetworkConfig, TxReceipt};
use crate::identity::EphemeralIdentity;
use crate::relay::{LedgerError, SourceLedger};

/// Upper bound on a single confirmation wait.
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Source ledger backed by a JSON-RPC endpoint.
pub struct EvmLedger {
    network: NetworkConfig,
    url: url::Url,
    orchestrator: Address,
    /// Provider that signs with the orchestrator credential.
    provider: DynProvider,
    vault: Address,
    asset: Address,
    confirmations: u64,
}

impl EvmLedger {
    /// Connect to `network` with the orchestrator credential.
    pub fn new(
        network: NetworkConfig,
        orchestrator: PrivateKeySigner,
        vault: Address,
        asset: Address,
        confirmations: u64,
    ) -> Result<Self, LedgerError> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::Rpc(format!("Invalid RPC URL: {e}")))?;

        let orchestrator_address = orchestrator.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(orchestrator))
            .connect_http(url.clone())
            .erased();

        Ok(Self {
            network,
            url,
            orchestrator: orchestrator_address,
            provider,
            vault,
            asset,
            confirmations: confirmations.max(1),
        })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Read the vault's pooled `totalDeposited` figure.
    pub async fn total_deposited(&self) -> Result<U256, LedgerError> {
        IPrivacyVault::new(self.vault, self.provider.clone())
            .totalDeposited()
            .call()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))
    }

    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<alloy::network::Ethereum>,
    ) -> Result<TxReceipt, LedgerError> {
        let tx_hash = format!("{:?}", pending.tx_hash());
        debug!(tx_hash = %tx_hash, confirmations = self.confirmations, "Waiting for confirmation");

        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .with_timeout(Some(CONFIRMATION_TIMEOUT))
            .get_receipt()
            .await
            .map_err(|e| LedgerError::Confirmation(format!("{tx_hash}: {e}")))?;

        if !receipt.status() {
            return Err(LedgerError::Reverted(tx_hash));
        }

        info!(
            tx_hash = %tx_hash,
            block = receipt.block_number.unwrap_or(0),
            explorer = %self.network.tx_url(&tx_hash),
            "Transaction confirmed"
        );

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number.unwrap_or(0),
            gas_used: receipt.gas_used,
            success: true,
        })
    }
}

/// Classify a submission failure by the node's error text.
fn submission_error(message: String) -> LedgerError {
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") || lower.contains("insufficient vault balance") {
        LedgerError::InsufficientFunds(message)
    } else if lower.contains("not authorized")
        || lower.contains("unauthorized")
        || lower.contains("only tee")
    {
        LedgerError::Unauthorized
    } else if lower.contains("revert") {
        LedgerError::Rejected(message)
    } else {
        LedgerError::Rpc(message)
    }
}

impl SourceLedger for EvmLedger {
    fn orchestrator_address(&self) -> Address {
        self.orchestrator
    }

    fn vault_address(&self) -> Address {
        self.vault
    }

    async fn redistribute(
        &self,
        recipients: Vec<Address>,
        amounts: Vec<U256>,
    ) -> Result<TxReceipt, LedgerError> {
        let vault = IPrivacyVault::new(self.vault, self.provider.clone());
        let pending = vault
            .redistribute(recipients, amounts)
            .send()
            .await
            .map_err(|e| submission_error(e.to_string()))?;
        self.confirm(pending).await
    }

    async fn fund_fee(&self, to: Address, amount_wei: U256) -> Result<TxReceipt, LedgerError> {
        let tx = TransactionRequest::default().to(to).value(amount_wei);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| submission_error(e.to_string()))?;
        self.confirm(pending).await
    }

    async fn fee_balance(&self, owner: Address) -> Result<U256, LedgerError> {
        self.provider
            .get_balance(owner)
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))
    }

    async fn asset_balance(&self, owner: Address) -> Result<U256, LedgerError> {
        IERC20::new(self.asset, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))
    }

    async fn transfer_asset(
        &self,
        from: &EphemeralIdentity,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        // Signed by the ephemeral identity's own key, never the orchestrator's.
        let provider = ProviderBuilder::new()
            .wallet(from.wallet())
            .connect_http(self.url.clone())
            .erased();

        let pending = IERC20::new(self.asset, provider)
            .transfer(to, amount)
            .send()
            .await
            .map_err(|e| submission_error(e.to_string()))?;
        self.confirm(pending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_errors_are_classified() {
        assert!(matches!(
            submission_error("execution reverted: Insufficient vault balance".into()),
            LedgerError::InsufficientFunds(_)
        ));
        assert!(matches!(
            submission_error("insufficient funds for gas * price + value".into()),
            LedgerError::InsufficientFunds(_)
        ));
        assert_eq!(
            submission_error("execution reverted: Only TEE".into()),
            LedgerError::Unauthorized
        );
        assert!(matches!(
            submission_error("execution reverted: Below minimum deposit".into()),
            LedgerError::Rejected(_)
        ));
        assert!(matches!(
            submission_error("connection refused".into()),
            LedgerError::Rpc(_)
        ));
    }

    #[test]
    fn new_rejects_bad_rpc_url() {
        let mut network = NetworkConfig::arbitrum_sepolia();
        network.rpc_url = "not a url".to_string();
        let result = EvmLedger::new(
            network,
            PrivateKeySigner::from_signing_key(k256::ecdsa::SigningKey::random(
                &mut k256::elliptic_curve::rand_core::OsRng,
            )),
            Address::ZERO,
            Address::ZERO,
            1,
        );
        assert!(matches!(result, Err(LedgerError::Rpc(_))));
    }
}
