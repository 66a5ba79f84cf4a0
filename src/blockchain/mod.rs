// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Source-ledger (EVM) integration.
//!
//! This module provides:
//! - Contract bindings for the vault and the custodied ERC-20 asset
//! - Orchestrator credential parsing
//! - Fixed-point amount parsing and formatting
//! - [`EvmLedger`], the JSON-RPC implementation of the relay's source ledger

pub mod erc20;
pub mod evm;
pub mod privacy_vault;
pub mod signing;
pub mod types;

pub use evm::EvmLedger;
pub use signing::{orchestrator_signer, KeyError};
pub use types::*;
