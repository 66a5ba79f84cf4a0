// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the relay API, and the execution record
//! the tracker persists. All wire types use camelCase JSON and derive
//! `ToSchema` for the OpenAPI document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub use crate::relay::{RelayMode, RelayStage};

// =============================================================================
// Intent submission
// =============================================================================

/// Amount as sent by clients: a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    /// Decimal text of the amount, without surrounding whitespace.
    pub fn as_decimal(&self) -> String {
        match self {
            AmountInput::Text(s) => s.trim().to_string(),
            AmountInput::Number(n) => n.to_string(),
        }
    }
}

/// Body of `POST /api/process-intent`.
///
/// Fields are optional at the serde level so that a missing field is a
/// validation error (400) rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessIntentRequest {
    /// Final recipient.
    pub destination: Option<String>,
    /// Legacy name of `destination`, used when `destination` is absent or empty.
    pub hl_destination: Option<String>,
    /// Decimal amount of the asset, at least the minimum deposit.
    #[schema(value_type = Option<String>, example = "5.00")]
    pub amount: Option<AmountInput>,
}

impl ProcessIntentRequest {
    pub fn destination(&self) -> Option<&str> {
        coalesce_destination(self.destination.as_deref(), self.hl_destination.as_deref())
    }
}

/// `destination` unless it is missing or empty, else `hlDestination`.
pub fn coalesce_destination<'a>(
    destination: Option<&'a str>,
    hl_destination: Option<&'a str>,
) -> Option<&'a str> {
    destination.filter(|d| !d.is_empty()).or(hl_destination)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessIntentResponse {
    pub execution_id: String,
    pub status: ExecutionStatus,
}

// =============================================================================
// Execution record
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Processing,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Processing => "processing",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

/// Everything a completed run leaves behind on both ledgers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionProof {
    /// Public address of the single-use intermediary.
    pub ephemeral_address: String,
    pub redistribute_tx: String,
    pub funding_tx: String,
    /// Onward transfer to the destination (direct) or the bridge (bridge).
    pub transfer_tx: String,
    /// Settlement venue acknowledgement, verbatim. Bridge mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub settlement_response: Option<Value>,
    pub destination: String,
    pub amount: String,
    pub mode: RelayMode,
    pub completed_at: DateTime<Utc>,
}

/// Tracked state of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub status: ExecutionStatus,
    /// Last pipeline stage reached.
    pub stage: RelayStage,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Present iff `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionProof>,
    /// Present iff `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    pub fn processing(id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: ExecutionStatus::Processing,
            stage: RelayStage::Init,
            started_at,
            completed_at: None,
            result: None,
            error: None,
        }
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    /// Vault contract the relay draws from.
    pub vault: String,
    pub mode: RelayMode,
}
