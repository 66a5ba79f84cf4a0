// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pipeline stages and the transitions allowed between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where the relayed funds end up on the source ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Single ledger: the ephemeral identity pays the destination directly.
    Direct,
    /// Cross ledger: the ephemeral identity pays the bridge intake, waits for
    /// the settlement venue to credit it, then sends a typed transfer there.
    Bridge,
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayMode::Direct => f.write_str("direct"),
            RelayMode::Bridge => f.write_str("bridge"),
        }
    }
}

impl FromStr for RelayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(RelayMode::Direct),
            "bridge" => Ok(RelayMode::Bridge),
            other => Err(format!("unknown relay mode '{other}' (expected direct or bridge)")),
        }
    }
}

/// Pipeline state of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RelayStage {
    Init,
    Redistributed,
    Funded,
    Relayed,
    SettlementPending,
    Completed,
    Failed,
}

impl RelayStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayStage::Completed | RelayStage::Failed)
    }

    /// The successor on the happy path, `None` once terminal.
    pub fn next(self, mode: RelayMode) -> Option<RelayStage> {
        match (self, mode) {
            (RelayStage::Init, _) => Some(RelayStage::Redistributed),
            (RelayStage::Redistributed, _) => Some(RelayStage::Funded),
            (RelayStage::Funded, _) => Some(RelayStage::Relayed),
            (RelayStage::Relayed, RelayMode::Direct) => Some(RelayStage::Completed),
            (RelayStage::Relayed, RelayMode::Bridge) => Some(RelayStage::SettlementPending),
            (RelayStage::SettlementPending, RelayMode::Bridge) => Some(RelayStage::Completed),
            (RelayStage::SettlementPending, RelayMode::Direct) => None,
            (RelayStage::Completed | RelayStage::Failed, _) => None,
        }
    }

    /// Whether `self -> to` is a legal move in `mode`.
    ///
    /// `Failed` is reachable from every non-terminal stage.
    pub fn can_transition(self, to: RelayStage, mode: RelayMode) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == RelayStage::Failed || self.next(mode) == Some(to)
    }
}

impl fmt::Display for RelayStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayStage::Init => "Init",
            RelayStage::Redistributed => "Redistributed",
            RelayStage::Funded => "Funded",
            RelayStage::Relayed => "Relayed",
            RelayStage::SettlementPending => "SettlementPending",
            RelayStage::Completed => "Completed",
            RelayStage::Failed => "Failed",
        };
        f.write_str(name)
    }
}
