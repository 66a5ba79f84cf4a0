// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Vault
//!
//! Reference model of the custodial `PrivacyVault` contract. The deployed
//! contract is the source of truth on chain; this model carries the same
//! rules so the relay can be exercised end to end without a node, and so
//! the contract's guarantees to the orchestrator are pinned down by tests.
//!
//! ## Accounting
//!
//! - `deposits[account]` is the accounted balance of each depositor.
//! - `total_deposited` is the pooled figure the orchestrator draws from.
//! - `redistribute` pays out of the pool and leaves `deposits` untouched.
//!   This asymmetry is what lets a payout land at an address unrelated to
//!   any depositor. After a redistribution, `Σ deposits` exceeds
//!   `total_deposited`; solvency (`total_deposited <= holdings`) always holds.

pub mod token;

use std::collections::HashMap;

use alloy::primitives::{Address, U256};

pub use token::{TokenError, TokenLedger};

use crate::relay::ErrorKind;

/// Minimum deposit: 5 units of the 6-decimal asset (the bridge minimum).
pub const MIN_DEPOSIT: U256 = U256::from_limbs([5_000_000, 0, 0, 0]);

/// Contract-level rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Below minimum deposit")]
    BelowMinimum,

    #[error("unauthorized")]
    Unauthorized,

    #[error("Length mismatch")]
    LengthMismatch,

    #[error("Insufficient vault balance")]
    InsufficientVaultBalance,

    #[error("No deposits")]
    NoDeposits,

    #[error("asset transfer failed: {0}")]
    Token(#[from] TokenError),
}

impl VaultError {
    /// Where this rejection sits in the relay's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::BelowMinimum | VaultError::NoDeposits | VaultError::LengthMismatch => {
                ErrorKind::Validation
            }
            VaultError::Unauthorized => ErrorKind::Authorization,
            VaultError::InsufficientVaultBalance | VaultError::Token(_) => {
                ErrorKind::InsufficientFunds
            }
        }
    }
}

/// Custodial vault state.
#[derive(Debug, Clone)]
pub struct LedgerVault {
    address: Address,
    privileged: Address,
    min_deposit: U256,
    deposits: HashMap<Address, U256>,
    total_deposited: U256,
    /// Set by the first successful `redistribute`.
    redistributed: bool,
}

impl LedgerVault {
    /// Vault at `address` whose `redistribute` is gated to `privileged`.
    pub fn new(address: Address, privileged: Address) -> Self {
        Self {
            address,
            privileged,
            min_deposit: MIN_DEPOSIT,
            deposits: HashMap::new(),
            total_deposited: U256::ZERO,
            redistributed: false,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn privileged(&self) -> Address {
        self.privileged
    }

    pub fn min_deposit(&self) -> U256 {
        self.min_deposit
    }

    /// Accounted balance of `account` (`deposits(address)`).
    pub fn deposits(&self, account: Address) -> U256 {
        self.deposits.get(&account).copied().unwrap_or_default()
    }

    /// Pooled custodied figure (`totalDeposited()`).
    pub fn total_deposited(&self) -> U256 {
        self.total_deposited
    }

    /// Sum of all accounted depositor balances.
    pub fn accounted_total(&self) -> U256 {
        self.deposits
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }

    /// Asset actually held by the vault.
    pub fn holdings(&self, token: &TokenLedger) -> U256 {
        token.balance_of(self.address)
    }

    /// Pull `amount` from `caller` (via allowance) and credit their balance.
    ///
    /// The balance update happens only after the asset transfer succeeded.
    pub fn deposit(
        &mut self,
        token: &mut TokenLedger,
        caller: Address,
        amount: U256,
    ) -> Result<(), VaultError> {
        if amount < self.min_deposit {
            return Err(VaultError::BelowMinimum);
        }

        token.transfer_from(self.address, caller, self.address, amount)?;

        let balance = self.deposits(caller).saturating_add(amount);
        self.deposits.insert(caller, balance);
        self.total_deposited = self.total_deposited.saturating_add(amount);
        Ok(())
    }

    /// Privileged payout from the pool to arbitrary recipients.
    ///
    /// All checks run before any transfer; either every recipient is paid
    /// or nothing changes.
    pub fn redistribute(
        &mut self,
        token: &mut TokenLedger,
        caller: Address,
        recipients: &[Address],
        amounts: &[U256],
    ) -> Result<(), VaultError> {
        if caller != self.privileged {
            return Err(VaultError::Unauthorized);
        }
        if recipients.len() != amounts.len() {
            return Err(VaultError::LengthMismatch);
        }

        let total = amounts
            .iter()
            .try_fold(U256::ZERO, |acc, amount| acc.checked_add(*amount))
            .ok_or(VaultError::InsufficientVaultBalance)?;

        if total > self.total_deposited || total > self.holdings(token) {
            return Err(VaultError::InsufficientVaultBalance);
        }

        let mut staged = token.clone();
        for (recipient, amount) in recipients.iter().zip(amounts) {
            staged.transfer(self.address, *recipient, *amount)?;
        }
        *token = staged;

        self.total_deposited -= total;
        self.redistributed = true;
        Ok(())
    }

    /// Return the caller's whole accounted balance to them.
    ///
    /// Returns the amount withdrawn.
    pub fn emergency_withdraw(
        &mut self,
        token: &mut TokenLedger,
        caller: Address,
    ) -> Result<U256, VaultError> {
        let balance = self.deposits(caller);
        if balance.is_zero() {
            return Err(VaultError::NoDeposits);
        }
        // The pool may already have been paid out by a redistribution.
        if balance > self.total_deposited || balance > self.holdings(token) {
            return Err(VaultError::InsufficientVaultBalance);
        }

        token.transfer(self.address, caller, balance)?;

        self.deposits.insert(caller, U256::ZERO);
        self.total_deposited -= balance;
        Ok(balance)
    }

    /// Check solvency, and the pool/accounting equality while it applies.
    pub fn check_invariants(&self, token: &TokenLedger) -> Result<(), String> {
        let holdings = self.holdings(token);
        if self.total_deposited > holdings {
            return Err(format!(
                "insolvent: total_deposited {} > holdings {}",
                self.total_deposited, holdings
            ));
        }
        let accounted = self.accounted_total();
        if !self.redistributed && accounted != self.total_deposited {
            return Err(format!(
                "pool {} differs from accounted deposits {}",
                self.total_deposited, accounted
            ));
        }
        if accounted < self.total_deposited {
            return Err(format!(
                "pool {} exceeds accounted deposits {}",
                self.total_deposited, accounted
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const VAULT: Address = address!("0x000000000000000000000000000000000000a417");
    const TEE: Address = address!("0x00000000000000000000000000000000000007ee");
    const USER1: Address = address!("0x0000000000000000000000000000000000000001");
    const USER2: Address = address!("0x0000000000000000000000000000000000000002");

    fn usdc(units: u64) -> U256 {
        U256::from(units) * U256::from(1_000_000u64)
    }

    fn setup() -> (LedgerVault, TokenLedger) {
        let mut token = TokenLedger::new();
        token.mint(USER1, usdc(100)).unwrap();
        token.mint(USER2, usdc(100)).unwrap();
        (LedgerVault::new(VAULT, TEE), token)
    }

    fn deposit(vault: &mut LedgerVault, token: &mut TokenLedger, who: Address, amount: U256) {
        token.approve(who, VAULT, amount);
        vault.deposit(token, who, amount).unwrap();
    }

    #[test]
    fn deposit_credits_caller_and_pool() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, MIN_DEPOSIT);

        assert_eq!(vault.deposits(USER1), MIN_DEPOSIT);
        assert_eq!(vault.total_deposited(), MIN_DEPOSIT);
        assert_eq!(vault.holdings(&token), MIN_DEPOSIT);
        vault.check_invariants(&token).unwrap();
    }

    #[test]
    fn deposit_below_minimum_changes_nothing() {
        let (mut vault, mut token) = setup();
        let too_small = MIN_DEPOSIT - U256::from(1u64);
        token.approve(USER1, VAULT, too_small);

        let err = vault.deposit(&mut token, USER1, too_small).unwrap_err();
        assert_eq!(err, VaultError::BelowMinimum);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(vault.deposits(USER1), U256::ZERO);
        assert_eq!(vault.total_deposited(), U256::ZERO);
        assert_eq!(token.balance_of(USER1), usdc(100));
    }

    #[test]
    fn deposit_without_allowance_does_not_credit() {
        let (mut vault, mut token) = setup();
        let err = vault.deposit(&mut token, USER1, usdc(10)).unwrap_err();
        assert!(matches!(err, VaultError::Token(TokenError::InsufficientAllowance { .. })));
        assert_eq!(vault.deposits(USER1), U256::ZERO);
        assert_eq!(vault.total_deposited(), U256::ZERO);
    }

    #[test]
    fn deposits_accumulate_and_track_sum() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, usdc(5));
        deposit(&mut vault, &mut token, USER1, usdc(7));
        deposit(&mut vault, &mut token, USER2, usdc(9));

        assert_eq!(vault.deposits(USER1), usdc(12));
        assert_eq!(vault.total_deposited(), usdc(21));
        assert_eq!(vault.accounted_total(), vault.total_deposited());
        vault.check_invariants(&token).unwrap();
    }

    #[test]
    fn privileged_redistribute_pays_fresh_addresses() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, usdc(20));

        let fresh1 = address!("0x00000000000000000000000000000000000f0001");
        let fresh2 = address!("0x00000000000000000000000000000000000f0002");
        vault
            .redistribute(&mut token, TEE, &[fresh1, fresh2], &[usdc(10), usdc(10)])
            .unwrap();

        assert_eq!(token.balance_of(fresh1), usdc(10));
        assert_eq!(token.balance_of(fresh2), usdc(10));
        assert_eq!(vault.total_deposited(), U256::ZERO);
        // Accounted balance is deliberately left as-is.
        assert_eq!(vault.deposits(USER1), usdc(20));
        vault.check_invariants(&token).unwrap();
    }

    #[test]
    fn redistribute_from_non_privileged_caller_is_rejected() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, usdc(20));
        let fresh = address!("0x00000000000000000000000000000000000f0003");

        let err = vault
            .redistribute(&mut token, USER1, &[fresh], &[usdc(10)])
            .unwrap_err();
        assert_eq!(err, VaultError::Unauthorized);
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(token.balance_of(fresh), U256::ZERO);
        assert_eq!(vault.total_deposited(), usdc(20));
        assert_eq!(vault.holdings(&token), usdc(20));
    }

    #[test]
    fn redistribute_beyond_pool_moves_nothing() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, usdc(20));
        let fresh1 = address!("0x00000000000000000000000000000000000f0004");
        let fresh2 = address!("0x00000000000000000000000000000000000f0005");

        let err = vault
            .redistribute(&mut token, TEE, &[fresh1, fresh2], &[usdc(15), usdc(15)])
            .unwrap_err();
        assert_eq!(err, VaultError::InsufficientVaultBalance);
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(token.balance_of(fresh1), U256::ZERO);
        assert_eq!(token.balance_of(fresh2), U256::ZERO);
        assert_eq!(vault.total_deposited(), usdc(20));
    }

    #[test]
    fn redistribute_rejects_mismatched_arrays() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, usdc(20));
        let err = vault
            .redistribute(&mut token, TEE, &[USER2], &[usdc(1), usdc(1)])
            .unwrap_err();
        assert_eq!(err, VaultError::LengthMismatch);
    }

    #[test]
    fn emergency_withdraw_returns_exact_balance() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, usdc(20));
        let before = token.balance_of(USER1);

        let withdrawn = vault.emergency_withdraw(&mut token, USER1).unwrap();

        assert_eq!(withdrawn, usdc(20));
        assert_eq!(token.balance_of(USER1) - before, usdc(20));
        assert_eq!(vault.deposits(USER1), U256::ZERO);
        assert_eq!(vault.total_deposited(), U256::ZERO);
        vault.check_invariants(&token).unwrap();
    }

    #[test]
    fn emergency_withdraw_without_deposit_is_rejected() {
        let (mut vault, mut token) = setup();
        let err = vault.emergency_withdraw(&mut token, USER2).unwrap_err();
        assert_eq!(err, VaultError::NoDeposits);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn emergency_withdraw_after_pool_drained_is_refused() {
        let (mut vault, mut token) = setup();
        deposit(&mut vault, &mut token, USER1, usdc(20));
        vault
            .redistribute(&mut token, TEE, &[USER2], &[usdc(20)])
            .unwrap();

        let err = vault.emergency_withdraw(&mut token, USER1).unwrap_err();
        assert_eq!(err, VaultError::InsufficientVaultBalance);
        vault.check_invariants(&token).unwrap();
    }
}
