// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Simulated Network
//!
//! In-process stand-in for both ledgers, used by `RELAY_BACKEND=simulated`
//! and by the end-to-end tests.
//!
//! - Source ledger: the [`LedgerVault`] model over a [`TokenLedger`], plus
//!   native fee balances. Each transaction is "confirmed" immediately and
//!   gets a synthetic hash.
//! - Bridge: an asset transfer into the bridge intake credits the sender's
//!   venue account after a configurable number of balance polls.
//! - Settlement venue: verifies each signed `UsdSend` against the sending
//!   identity and records it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{keccak256, Address, U256};
use serde_json::{json, Value};

use crate::blockchain::{parse_amount, TxReceipt, ASSET_DECIMALS, HL_TESTNET_BRIDGE};
use crate::identity::EphemeralIdentity;
use crate::relay::{LedgerError, SettlementError, SettlementVenue, SourceLedger};
use crate::settlement::{SignedUsdSend, UsdSend};
use crate::vault::{LedgerVault, TokenLedger, VaultError};

/// Fee charged for each simulated transaction (wei).
pub const SIM_TX_FEE: U256 = U256::from_limbs([50_000_000_000_000, 0, 0, 0]);

/// Default vault address of the simulated deployment.
pub const SIM_VAULT: Address = alloy::primitives::address!("0x5150000000000000000000000000000000000001");

const SIM_CHAIN: &str = "Simnet";
const SIM_SIGNATURE_CHAIN_ID: u64 = 1_337;

/// A typed transfer the venue accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    pub from: Address,
    pub destination: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, Copy)]
struct PendingCredit {
    amount: U256,
    polls_remaining: u32,
}

#[derive(Debug)]
struct SimState {
    token: TokenLedger,
    vault: LedgerVault,
    native: HashMap<Address, U256>,
    pending_credits: HashMap<Address, Vec<PendingCredit>>,
    venue_balances: HashMap<Address, U256>,
    transfers: Vec<RecordedTransfer>,
    tx_count: u64,
    credit_after_polls: u32,
    stall_settlement: bool,
    fail_next_transfer: bool,
}

impl SimState {
    fn receipt(&mut self, label: &str) -> TxReceipt {
        self.tx_count += 1;
        let hash = keccak256(format!("{label}:{}", self.tx_count));
        TxReceipt {
            tx_hash: hash.to_string(),
            block_number: self.tx_count,
            gas_used: 21_000,
            success: true,
        }
    }

    fn native_of(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or_default()
    }

    fn charge_fee(&mut self, payer: Address) -> Result<(), LedgerError> {
        let balance = self.native_of(payer);
        if balance < SIM_TX_FEE {
            return Err(LedgerError::InsufficientFunds(format!(
                "insufficient funds for gas: {payer} has {balance} wei"
            )));
        }
        self.native.insert(payer, balance - SIM_TX_FEE);
        Ok(())
    }
}

pub struct SimulatedNetwork {
    orchestrator: Address,
    bridge: Address,
    state: Mutex<SimState>,
}

impl SimulatedNetwork {
    /// Empty network whose vault at [`SIM_VAULT`] is gated to `orchestrator`.
    pub fn new(orchestrator: Address) -> Self {
        Self {
            orchestrator,
            bridge: HL_TESTNET_BRIDGE,
            state: Mutex::new(SimState {
                token: TokenLedger::new(),
                vault: LedgerVault::new(SIM_VAULT, orchestrator),
                native: HashMap::new(),
                pending_credits: HashMap::new(),
                venue_balances: HashMap::new(),
                transfers: Vec::new(),
                tx_count: 0,
                credit_after_polls: 1,
                stall_settlement: false,
                fail_next_transfer: false,
            }),
        }
    }

    /// Network with a funded orchestrator and a vault pool of `pool` units
    /// deposited by a demo account.
    pub fn seeded(orchestrator: Address, pool: U256) -> Result<Self, VaultError> {
        let network = Self::new(orchestrator);
        network.set_fee_balance(orchestrator, U256::from(10u64).pow(U256::from(19u64)));
        let depositor = Address::repeat_byte(0xde);
        network.mint_asset(depositor, pool)?;
        network.deposit(depositor, pool)?;
        Ok(network)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock leaves plain balances behind; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn bridge_address(&self) -> Address {
        self.bridge
    }

    pub fn mint_asset(&self, to: Address, amount: U256) -> Result<(), VaultError> {
        self.lock().token.mint(to, amount)?;
        Ok(())
    }

    /// Approve and deposit on behalf of `depositor`.
    pub fn deposit(&self, depositor: Address, amount: U256) -> Result<(), VaultError> {
        let mut state = self.lock();
        let SimState { token, vault, .. } = &mut *state;
        token.approve(depositor, vault.address(), amount);
        vault.deposit(token, depositor, amount)
    }

    pub fn emergency_withdraw(&self, depositor: Address) -> Result<U256, VaultError> {
        let mut state = self.lock();
        let SimState { token, vault, .. } = &mut *state;
        vault.emergency_withdraw(token, depositor)
    }

    pub fn set_fee_balance(&self, account: Address, wei: U256) {
        self.lock().native.insert(account, wei);
    }

    /// Empty the orchestrator's fee-currency balance.
    pub fn drain_orchestrator_fees(&self) {
        let orchestrator = self.orchestrator;
        self.set_fee_balance(orchestrator, U256::ZERO);
    }

    /// Never credit bridged funds on the venue while set.
    pub fn stall_settlement(&self, stalled: bool) {
        self.lock().stall_settlement = stalled;
    }

    /// Make the next ephemeral asset transfer revert.
    pub fn fail_next_transfer(&self) {
        self.lock().fail_next_transfer = true;
    }

    /// Number of venue balance polls before a bridged deposit is credited.
    pub fn credit_after_polls(&self, polls: u32) {
        self.lock().credit_after_polls = polls.max(1);
    }

    pub fn asset_balance_of(&self, account: Address) -> U256 {
        self.lock().token.balance_of(account)
    }

    pub fn fee_balance_of(&self, account: Address) -> U256 {
        self.lock().native_of(account)
    }

    pub fn venue_balance_of(&self, account: Address) -> U256 {
        self.lock()
            .venue_balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_deposited(&self) -> U256 {
        self.lock().vault.total_deposited()
    }

    pub fn deposits_of(&self, account: Address) -> U256 {
        self.lock().vault.deposits(account)
    }

    pub fn check_vault_invariants(&self) -> Result<(), String> {
        let state = self.lock();
        state.vault.check_invariants(&state.token)
    }

    pub fn settlement_transfers(&self) -> Vec<RecordedTransfer> {
        self.lock().transfers.clone()
    }

    pub fn transaction_count(&self) -> u64 {
        self.lock().tx_count
    }
}

fn vault_rejection(err: VaultError) -> LedgerError {
    match err {
        VaultError::Unauthorized => LedgerError::Unauthorized,
        VaultError::InsufficientVaultBalance => LedgerError::InsufficientFunds(err.to_string()),
        other => LedgerError::Rejected(format!("execution reverted: {other}")),
    }
}

impl SourceLedger for SimulatedNetwork {
    fn orchestrator_address(&self) -> Address {
        self.orchestrator
    }

    fn vault_address(&self) -> Address {
        SIM_VAULT
    }

    async fn redistribute(
        &self,
        recipients: Vec<Address>,
        amounts: Vec<U256>,
    ) -> Result<TxReceipt, LedgerError> {
        let mut state = self.lock();
        let caller = self.orchestrator;
        {
            let SimState { token, vault, .. } = &mut *state;
            vault
                .redistribute(token, caller, &recipients, &amounts)
                .map_err(vault_rejection)?;
        }
        Ok(state.receipt("redistribute"))
    }

    async fn fund_fee(&self, to: Address, amount_wei: U256) -> Result<TxReceipt, LedgerError> {
        let mut state = self.lock();
        let from = self.orchestrator;
        let balance = state.native_of(from);
        if balance < amount_wei {
            return Err(LedgerError::InsufficientFunds(format!(
                "insufficient funds for gas * price + value: have {balance} want {amount_wei}"
            )));
        }
        let credited = state.native_of(to).saturating_add(amount_wei);
        state.native.insert(from, balance - amount_wei);
        state.native.insert(to, credited);
        Ok(state.receipt("fund"))
    }

    async fn fee_balance(&self, owner: Address) -> Result<U256, LedgerError> {
        Ok(self.fee_balance_of(owner))
    }

    async fn asset_balance(&self, owner: Address) -> Result<U256, LedgerError> {
        Ok(self.asset_balance_of(owner))
    }

    async fn transfer_asset(
        &self,
        from: &EphemeralIdentity,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, LedgerError> {
        let sender = from.address();
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next_transfer) {
            return Err(LedgerError::Rejected(
                "execution reverted: simulated transfer failure".into(),
            ));
        }
        state.charge_fee(sender)?;
        state
            .token
            .transfer(sender, to, amount)
            .map_err(|e| LedgerError::Rejected(format!("execution reverted: {e}")))?;

        if to == self.bridge {
            let polls_remaining = state.credit_after_polls;
            state
                .pending_credits
                .entry(sender)
                .or_default()
                .push(PendingCredit {
                    amount,
                    polls_remaining,
                });
        }
        Ok(state.receipt("transfer"))
    }
}

impl SettlementVenue for SimulatedNetwork {
    async fn credited_value(&self, account: Address) -> Result<U256, SettlementError> {
        let mut state = self.lock();
        if !state.stall_settlement {
            let mut credited = U256::ZERO;
            if let Some(pending) = state.pending_credits.get_mut(&account) {
                for credit in pending.iter_mut() {
                    credit.polls_remaining = credit.polls_remaining.saturating_sub(1);
                    if credit.polls_remaining == 0 {
                        credited += credit.amount;
                    }
                }
                pending.retain(|c| c.polls_remaining > 0);
            }
            if !credited.is_zero() {
                let balance = state.venue_balances.entry(account).or_default();
                *balance += credited;
            }
        }
        Ok(state
            .venue_balances
            .get(&account)
            .copied()
            .unwrap_or_default())
    }

    async fn send_transfer(
        &self,
        from: &EphemeralIdentity,
        destination: Address,
        amount: &str,
    ) -> Result<Value, SettlementError> {
        let mut state = self.lock();
        let time = state.tx_count;
        let signed = UsdSend::new(SIM_CHAIN, destination, amount, time)
            .sign(from, SIM_SIGNATURE_CHAIN_ID)?;

        // Verify exactly what a remote venue would receive.
        let received = SignedUsdSend::from_payload(&signed.to_payload())?;
        let sender = received.signer()?;
        if sender != from.address() {
            return Err(SettlementError::Refused("signature mismatch".into()));
        }

        let value = parse_amount(amount, ASSET_DECIMALS)
            .map_err(|e| SettlementError::Refused(format!("invalid amount: {e}")))?;
        let available = state.venue_balances.get(&sender).copied().unwrap_or_default();
        if available < value {
            return Err(SettlementError::Refused(
                "Insufficient balance for transfer".into(),
            ));
        }

        state.venue_balances.insert(sender, available - value);
        let credited = state
            .venue_balances
            .get(&destination)
            .copied()
            .unwrap_or_default()
            + value;
        state.venue_balances.insert(destination, credited);
        state.transfers.push(RecordedTransfer {
            from: sender,
            destination,
            amount: value,
        });

        Ok(json!({"status": "ok", "response": {"type": "default"}}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc(units: u64) -> U256 {
        U256::from(units) * U256::from(1_000_000u64)
    }

    #[tokio::test]
    async fn redistribute_draws_from_the_pool() {
        let network = SimulatedNetwork::seeded(Address::repeat_byte(0x0e), usdc(20)).unwrap();

        network
            .redistribute(vec![Address::repeat_byte(1)], vec![usdc(5)])
            .await
            .unwrap();
        assert_eq!(network.asset_balance_of(Address::repeat_byte(1)), usdc(5));
        assert_eq!(network.total_deposited(), usdc(15));
        network.check_vault_invariants().unwrap();

        assert_eq!(
            network
                .redistribute(vec![Address::repeat_byte(1)], vec![usdc(16)])
                .await,
            Err(LedgerError::InsufficientFunds("Insufficient vault balance".into()))
        );
        assert_eq!(network.total_deposited(), usdc(15));
    }

    #[tokio::test]
    async fn bridged_funds_are_credited_after_polls() {
        let network = SimulatedNetwork::seeded(Address::repeat_byte(0x0e), usdc(20)).unwrap();
        network.credit_after_polls(3);
        let identity = EphemeralIdentity::generate();
        network
            .redistribute(vec![identity.address()], vec![usdc(5)])
            .await
            .unwrap();
        network.set_fee_balance(identity.address(), SIM_TX_FEE);

        network
            .transfer_asset(&identity, network.bridge_address(), usdc(5))
            .await
            .unwrap();

        assert_eq!(network.credited_value(identity.address()).await.unwrap(), U256::ZERO);
        assert_eq!(network.credited_value(identity.address()).await.unwrap(), U256::ZERO);
        assert_eq!(network.credited_value(identity.address()).await.unwrap(), usdc(5));
    }

    #[tokio::test]
    async fn transfer_without_fee_balance_fails() {
        let network = SimulatedNetwork::seeded(Address::repeat_byte(0x0e), usdc(20)).unwrap();
        let identity = EphemeralIdentity::generate();
        let err = network
            .transfer_asset(&identity, Address::repeat_byte(2), U256::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    }

    #[tokio::test]
    async fn venue_refuses_transfer_beyond_credit() {
        let network = SimulatedNetwork::new(Address::repeat_byte(0x0e));
        let err = network
            .send_transfer(&EphemeralIdentity::generate(), Address::repeat_byte(2), "5")
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Refused(_)));
        assert!(network.settlement_transfers().is_empty());
    }
}
