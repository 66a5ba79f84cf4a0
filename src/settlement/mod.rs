// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Destination ledger (settlement venue) integration.

pub mod client;
pub mod usd_send;

pub use client::{HttpSettlementVenue, SettlementConfig};
pub use usd_send::{SignedUsdSend, UsdSend};
