// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relay failure taxonomy.
//!
//! Every failure of a run ends up as a terminal `failed` record whose
//! message is `"<Kind>: <detail>"`. Nothing here is retried by the pipeline;
//! the only local recovery is the settlement poller's bounded retry loop.

use std::fmt;

use alloy::primitives::{Address, U256};

use super::intent::IntentError;
use super::ports::{LedgerError, SettlementError};
use super::stage::{RelayMode, RelayStage};

/// Coarse class of a failure, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    InsufficientFunds,
    TransientNetwork,
    SettlementTimeout,
    Ledger,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Authorization => "AuthorizationError",
            ErrorKind::InsufficientFunds => "InsufficientFunds",
            ErrorKind::TransientNetwork => "TransientNetworkError",
            ErrorKind::SettlementTimeout => "SettlementTimeout",
            ErrorKind::Ledger => "LedgerError",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Which irreversible step a ledger failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Redistribute,
    Fund,
    BalanceCheck,
    Transfer,
    Settle,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Redistribute => "redistribute",
            Step::Fund => "fee funding",
            Step::BalanceCheck => "balance check",
            Step::Transfer => "transfer",
            Step::Settle => "settlement transfer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error("{step} failed: {source}")]
    Ledger {
        step: Step,
        #[source]
        source: LedgerError,
    },

    #[error("orchestrator fee balance {available} wei is below the {required} wei top-up")]
    InsufficientFeeBalance { available: U256, required: U256 },

    #[error("UnexpectedBalance: {address} holds {observed}, expected at least {expected}")]
    UnexpectedBalance {
        address: Address,
        expected: String,
        observed: String,
    },

    #[error("{step} failed: {source}")]
    Settlement {
        step: Step,
        #[source]
        source: SettlementError,
    },

    #[error(
        "no credit observed for {address} (expected {expected}) after {attempts} attempts{}",
        last_error_suffix(.last_error)
    )]
    SettlementTimeout {
        address: Address,
        expected: String,
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("abandoned while waiting for settlement credit to {address}")]
    Cancelled { address: Address },

    #[error("illegal stage transition {from} -> {to} in {mode} mode")]
    IllegalTransition {
        from: RelayStage,
        to: RelayStage,
        mode: RelayMode,
    },
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(", last error: {e}"),
        None => String::new(),
    }
}

impl RelayError {
    pub fn ledger(step: Step, source: LedgerError) -> Self {
        RelayError::Ledger { step, source }
    }

    pub fn settlement(step: Step, source: SettlementError) -> Self {
        RelayError::Settlement { step, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Intent(_) => ErrorKind::Validation,
            RelayError::Ledger { source, .. } => match source {
                LedgerError::Unauthorized => ErrorKind::Authorization,
                LedgerError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
                LedgerError::Rpc(_) => ErrorKind::TransientNetwork,
                LedgerError::Rejected(_)
                | LedgerError::Reverted(_)
                | LedgerError::Confirmation(_) => ErrorKind::Ledger,
            },
            RelayError::InsufficientFeeBalance { .. } | RelayError::UnexpectedBalance { .. } => {
                ErrorKind::InsufficientFunds
            }
            RelayError::Settlement { source, .. } => match source {
                SettlementError::Transport(_) => ErrorKind::TransientNetwork,
                _ => ErrorKind::Ledger,
            },
            RelayError::SettlementTimeout { .. } => ErrorKind::SettlementTimeout,
            RelayError::Cancelled { .. } => ErrorKind::Cancelled,
            RelayError::IllegalTransition { .. } => ErrorKind::Ledger,
        }
    }

    /// Message stored on the failed execution record.
    pub fn record_message(&self) -> String {
        match self {
            // Generic denial: which check refused the call is not reported.
            RelayError::Ledger {
                step,
                source: LedgerError::Unauthorized,
            } => format!("{}: {step} unauthorized", self.kind()),
            _ => format!("{}: {self}", self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_message_is_prefixed_with_kind() {
        let err = RelayError::InsufficientFeeBalance {
            available: U256::from(1u64),
            required: U256::from(10u64),
        };
        assert_eq!(
            err.record_message(),
            "InsufficientFunds: orchestrator fee balance 1 wei is below the 10 wei top-up"
        );
    }

    #[test]
    fn timeout_message_supports_reconciliation() {
        let err = RelayError::SettlementTimeout {
            address: Address::repeat_byte(0x11),
            expected: "5".into(),
            attempts: 30,
            last_error: None,
        };
        let msg = err.record_message();
        assert!(msg.starts_with("SettlementTimeout: "));
        assert!(msg.contains("0x1111111111111111111111111111111111111111"));
        assert!(msg.contains("expected 5"));
        assert!(msg.contains("30 attempts"));
    }

    #[test]
    fn unauthorized_is_a_generic_denial() {
        let err = RelayError::ledger(Step::Redistribute, LedgerError::Unauthorized);
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(
            err.record_message(),
            "AuthorizationError: redistribute unauthorized"
        );
    }

    #[test]
    fn ledger_errors_map_to_kinds() {
        let rpc = RelayError::ledger(Step::Fund, LedgerError::Rpc("timeout".into()));
        assert_eq!(rpc.kind(), ErrorKind::TransientNetwork);

        let reverted = RelayError::ledger(Step::Transfer, LedgerError::Reverted("0xab".into()));
        assert_eq!(reverted.kind(), ErrorKind::Ledger);

        let funds = RelayError::ledger(
            Step::Redistribute,
            LedgerError::InsufficientFunds("Insufficient vault balance".into()),
        );
        assert_eq!(funds.kind(), ErrorKind::InsufficientFunds);
    }
}
