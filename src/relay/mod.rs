// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay
//!
//! The anonymizing relay pipeline: a validated intent is paid out of the
//! vault to a fresh ephemeral identity, which forwards it to the destination
//! (directly, or through the bridge and the settlement venue).
//!
//! - [`intent`]: validated input type
//! - [`ports`]: traits for the source ledger and the settlement venue
//! - [`stage`]: pipeline states and transition guard
//! - [`poller`]: bounded retry loop used for the settlement wait
//! - [`executor`]: the pipeline itself
//! - [`service`]: background spawning, admission and shutdown

pub mod error;
pub mod executor;
pub mod intent;
pub mod poller;
pub mod ports;
pub mod service;
pub mod stage;

pub use error::{ErrorKind, RelayError, Step};
pub use executor::{ExecutorSettings, RelayExecutor};
pub use intent::{IntentError, RelayIntent};
pub use poller::{poll_until, PollError, RetryPolicy};
pub use ports::{LedgerError, SettlementError, SettlementVenue, SourceLedger};
pub use service::{IntentSubmitter, RelayService};
pub use stage::{RelayMode, RelayStage};
