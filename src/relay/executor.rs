// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Executor
//!
//! Drives one intent through the pipeline:
//!
//! ```text
//! Init → Redistributed → Funded → Relayed ─────────────────────→ Completed   (direct)
//!                                         └→ SettlementPending → Completed   (bridge)
//! ```
//!
//! Every step waits for its own confirmation before the next one starts,
//! since each consumes funds produced by the previous one. Steps are never
//! retried; a failure ends the run and is reported to the tracker by the
//! caller.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::{RelayError, Step};
use super::intent::RelayIntent;
use super::poller::{poll_until, PollError, RetryPolicy};
use super::ports::{SettlementVenue, SourceLedger};
use super::stage::{RelayMode, RelayStage};
use crate::blockchain::{format_amount, ASSET_DECIMALS};
use crate::identity::EphemeralIdentity;
use crate::models::ExecutionProof;
use crate::tracker::ExecutionHandle;

/// Deployment parameters of the pipeline.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub mode: RelayMode,
    /// Fee currency sent to each ephemeral identity (wei).
    pub gas_top_up: U256,
    /// Bridge intake account, used in bridge mode.
    pub bridge: Address,
    pub settlement_poll: RetryPolicy,
}

pub struct RelayExecutor<L, V> {
    ledger: Arc<L>,
    venue: Arc<V>,
    settings: ExecutorSettings,
    /// Serializes "check orchestrator fee balance" with the top-up itself.
    funding: Mutex<()>,
}

/// Stage bookkeeping for one run.
struct Progress<'a> {
    handle: &'a ExecutionHandle,
    mode: RelayMode,
    stage: RelayStage,
}

impl Progress<'_> {
    fn advance(&mut self, to: RelayStage) -> Result<(), RelayError> {
        if !self.stage.can_transition(to, self.mode) {
            return Err(RelayError::IllegalTransition {
                from: self.stage,
                to,
                mode: self.mode,
            });
        }
        info!(execution_id = %self.handle.id(), from = %self.stage, stage = %to, "Stage reached");
        self.stage = to;
        // Terminal states are written by the caller together with the result.
        if !to.is_terminal() {
            self.handle.advance(to);
        }
        Ok(())
    }
}

impl<L: SourceLedger, V: SettlementVenue> RelayExecutor<L, V> {
    pub fn new(ledger: Arc<L>, venue: Arc<V>, settings: ExecutorSettings) -> Self {
        Self {
            ledger,
            venue,
            settings,
            funding: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Run the pipeline for `intent`, publishing stages through `handle`.
    ///
    /// `cancel` is only observed while waiting for the settlement credit.
    pub async fn execute(
        &self,
        handle: &ExecutionHandle,
        intent: RelayIntent,
        cancel: &CancellationToken,
    ) -> Result<ExecutionProof, RelayError> {
        let mode = self.settings.mode;
        let mut progress = Progress {
            handle,
            mode,
            stage: RelayStage::Init,
        };

        let identity = EphemeralIdentity::generate();
        let ephemeral = identity.address();
        info!(
            execution_id = %handle.id(),
            address = %ephemeral,
            amount = %intent.amount_decimal(),
            mode = %mode,
            "Starting relay"
        );

        // Init → Redistributed
        let redistribute = self
            .ledger
            .redistribute(vec![ephemeral], vec![intent.amount])
            .await
            .map_err(|e| RelayError::ledger(Step::Redistribute, e))?;
        progress.advance(RelayStage::Redistributed)?;

        // Redistributed → Funded
        let funding = self.fund(ephemeral).await?;
        progress.advance(RelayStage::Funded)?;

        // Funded → Relayed
        let observed = self
            .ledger
            .asset_balance(ephemeral)
            .await
            .map_err(|e| RelayError::ledger(Step::BalanceCheck, e))?;
        if observed < intent.amount {
            return Err(RelayError::UnexpectedBalance {
                address: ephemeral,
                expected: intent.amount_decimal(),
                observed: format_amount(observed, ASSET_DECIMALS),
            });
        }

        let target = match mode {
            RelayMode::Direct => intent.destination,
            RelayMode::Bridge => self.settings.bridge,
        };
        let transfer = self
            .ledger
            .transfer_asset(&identity, target, intent.amount)
            .await
            .map_err(|e| RelayError::ledger(Step::Transfer, e))?;
        progress.advance(RelayStage::Relayed)?;

        // Relayed → SettlementPending → Completed
        let settlement_response = match mode {
            RelayMode::Direct => None,
            RelayMode::Bridge => {
                progress.advance(RelayStage::SettlementPending)?;
                self.await_credit(&identity, &intent, cancel).await?;
                let response = self
                    .venue
                    .send_transfer(&identity, intent.destination, &intent.amount_decimal())
                    .await
                    .map_err(|e| RelayError::settlement(Step::Settle, e))?;
                Some(response)
            }
        };
        progress.advance(RelayStage::Completed)?;

        Ok(ExecutionProof {
            ephemeral_address: ephemeral.to_string(),
            redistribute_tx: redistribute.tx_hash,
            funding_tx: funding.tx_hash,
            transfer_tx: transfer.tx_hash,
            settlement_response,
            destination: intent.destination.to_string(),
            amount: intent.amount_decimal(),
            mode,
            completed_at: Utc::now(),
        })
    }

    /// Top up the ephemeral identity's fee balance from the orchestrator.
    async fn fund(&self, to: Address) -> Result<crate::blockchain::TxReceipt, RelayError> {
        let required = self.settings.gas_top_up;
        let _guard = self.funding.lock().await;

        let available = self
            .ledger
            .fee_balance(self.ledger.orchestrator_address())
            .await
            .map_err(|e| RelayError::ledger(Step::Fund, e))?;
        if available < required {
            return Err(RelayError::InsufficientFeeBalance {
                available,
                required,
            });
        }

        self.ledger
            .fund_fee(to, required)
            .await
            .map_err(|e| RelayError::ledger(Step::Fund, e))
    }

    async fn await_credit(
        &self,
        identity: &EphemeralIdentity,
        intent: &RelayIntent,
        cancel: &CancellationToken,
    ) -> Result<U256, RelayError> {
        let address = identity.address();
        let venue = &self.venue;

        let outcome = poll_until(
            self.settings.settlement_poll,
            cancel,
            || venue.credited_value(address),
            |credited| *credited >= intent.amount,
        )
        .await;

        match outcome {
            Ok(credited) => {
                info!(address = %address, credited = %format_amount(credited, ASSET_DECIMALS), "Settlement credit observed");
                Ok(credited)
            }
            Err(PollError::Timeout {
                attempts,
                last_error,
                ..
            }) => Err(RelayError::SettlementTimeout {
                address,
                expected: intent.amount_decimal(),
                attempts,
                last_error,
            }),
            Err(PollError::Cancelled { attempts }) => {
                warn!(address = %address, attempts, "Settlement wait abandoned");
                Err(RelayError::Cancelled { address })
            }
        }
    }
}
