// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Validated relay intent.
//!
//! Raw input (HTTP body, enclave secret) is turned into a [`RelayIntent`]
//! at the boundary; the pipeline only ever sees the validated type.

use alloy::primitives::{Address, U256};

use crate::blockchain::{format_amount, parse_amount, AmountError, ASSET_DECIMALS};
use crate::vault::MIN_DEPOSIT;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("Missing destination or amount")]
    MissingField,

    #[error("Invalid destination: {0}")]
    InvalidDestination(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("Minimum amount is {0}")]
    BelowMinimum(String),
}

/// A destination and an amount the relay has agreed to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayIntent {
    pub destination: Address,
    /// Smallest asset units (6 decimals).
    pub amount: U256,
}

impl RelayIntent {
    /// Validate raw `destination` and decimal `amount` strings.
    pub fn parse(destination: Option<&str>, amount: Option<&str>) -> Result<Self, IntentError> {
        let (Some(destination), Some(amount)) = (destination, amount) else {
            return Err(IntentError::MissingField);
        };
        let destination = validate_address(destination.trim())?;
        let amount = parse_amount(amount.trim(), ASSET_DECIMALS)?;
        Self::new(destination, amount)
    }

    pub fn new(destination: Address, amount: U256) -> Result<Self, IntentError> {
        if destination == Address::ZERO {
            return Err(IntentError::InvalidDestination("zero address"));
        }
        if amount < MIN_DEPOSIT {
            return Err(IntentError::BelowMinimum(format_amount(
                MIN_DEPOSIT,
                ASSET_DECIMALS,
            )));
        }
        Ok(Self {
            destination,
            amount,
        })
    }

    /// Amount as a decimal string, e.g. `"5"` or `"12.5"`.
    pub fn amount_decimal(&self) -> String {
        format_amount(self.amount, ASSET_DECIMALS)
    }
}

fn validate_address(address: &str) -> Result<Address, IntentError> {
    if !address.starts_with("0x") {
        return Err(IntentError::InvalidDestination("must start with 0x"));
    }
    if address.len() != 42 {
        return Err(IntentError::InvalidDestination(
            "must be 42 characters (0x + 40 hex)",
        ));
    }
    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IntentError::InvalidDestination("must contain only hex characters"));
    }
    address
        .parse()
        .map_err(|_| IntentError::InvalidDestination("not an address"))
}
