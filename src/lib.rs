// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privacy Bridge - Anonymizing Relay Service
//!
//! Pays pooled vault deposits out to a destination through a single-use
//! identity, so the destination cannot be linked to the depositor on the
//! source ledger. Optionally bridges the funds to a settlement venue first.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - EVM source ledger integration
//! - `vault` - reference model of the vault contract
//! - `identity` - ephemeral identity generation
//! - `relay` - the relay pipeline and its admission control
//! - `settlement` - settlement venue transfer messages and client
//! - `tracker` / `storage` - execution records and their persistence
//! - `sim` - in-process ledger and venue for local runs and tests
//! - `enclave` - one-shot confidential task mode

pub mod api;
pub mod blockchain;
pub mod config;
pub mod enclave;
pub mod error;
pub mod identity;
pub mod logging;
pub mod models;
pub mod relay;
pub mod settlement;
pub mod sim;
pub mod state;
pub mod storage;
pub mod tracker;
pub mod vault;
