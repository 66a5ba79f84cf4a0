// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bindings for the on-chain Ledger Vault (`PrivacyVault`) contract.
//!
//! Amounts are integers scaled by 10^6, matching the asset's precision.
//! `redistribute` is gated to the orchestrator credential configured at
//! deployment; it pays out of the pooled `totalDeposited` figure and does
//! not touch any depositor's `deposits` entry.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IPrivacyVault {
        function deposit(uint256 amount) external;
        function redistribute(address[] recipients, uint256[] amounts) external;
        function emergencyWithdraw() external;
        function deposits(address account) external view returns (uint256);
        function totalDeposited() external view returns (uint256);
    }
}
