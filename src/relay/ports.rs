// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Boundaries between the relay executor and the two ledger systems.
//!
//! [`SourceLedger`] is the chain that hosts the vault and the custodied
//! asset. [`SettlementVenue`] is the independent second system that credits
//! bridged funds and accepts signed transfer messages. The EVM/HTTP
//! implementations live in `blockchain` and `settlement`; `sim` provides an
//! in-process pair for local runs and tests.

use std::future::Future;

use alloy::primitives::{Address, U256};
use serde_json::Value;

use crate::blockchain::TxReceipt;
use crate::identity::EphemeralIdentity;

/// Failures talking to the source ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The contract or node refused the call; carries the revert reason.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The privileged call came from the wrong credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The sender cannot cover the value or fee of the transaction.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(String),

    /// Waiting for the confirmation failed. Not retried: resubmitting could
    /// duplicate the transfer.
    #[error("confirmation failed: {0}")]
    Confirmation(String),

    /// Transport-level failure before anything was submitted.
    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Failures talking to the settlement venue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// The venue answered but refused the transfer.
    #[error("transfer refused: {0}")]
    Refused(String),
}

/// Source ledger operations needed by the pipeline.
///
/// Every mutating call returns only after the transaction is confirmed.
pub trait SourceLedger: Send + Sync + 'static {
    /// Address of the privileged orchestrator credential.
    fn orchestrator_address(&self) -> Address;

    /// Address of the vault contract.
    fn vault_address(&self) -> Address;

    /// Call `redistribute` on the vault with the orchestrator credential.
    fn redistribute(
        &self,
        recipients: Vec<Address>,
        amounts: Vec<U256>,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;

    /// Send fee currency from the orchestrator to `to`.
    fn fund_fee(
        &self,
        to: Address,
        amount_wei: U256,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;

    /// Fee-currency balance of `owner`.
    fn fee_balance(&self, owner: Address)
        -> impl Future<Output = Result<U256, LedgerError>> + Send;

    /// Custodied-asset balance of `owner`.
    fn asset_balance(
        &self,
        owner: Address,
    ) -> impl Future<Output = Result<U256, LedgerError>> + Send;

    /// Transfer the custodied asset, signed by `from` (never the orchestrator).
    fn transfer_asset(
        &self,
        from: &EphemeralIdentity,
        to: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxReceipt, LedgerError>> + Send;
}

/// Destination-ledger operations needed by the pipeline.
pub trait SettlementVenue: Send + Sync + 'static {
    /// Value currently credited to `account`, in asset smallest units.
    fn credited_value(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<U256, SettlementError>> + Send;

    /// Sign and submit a typed transfer of `amount` (decimal string) from
    /// `from` to `destination`. Returns the venue's acknowledgement verbatim.
    fn send_transfer(
        &self,
        from: &EphemeralIdentity,
        destination: Address,
        amount: &str,
    ) -> impl Future<Output = Result<Value, SettlementError>> + Send;
}
