// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # One-shot enclave mode
//!
//! `run-once` executes a single relay inside a confidential task runner.
//! The intent arrives as a requester secret, the proof bundle is written to
//! the task's output directory, and the process exit code reports success.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `IEXEC_REQUESTER_SECRET_1` | Intent JSON `{destination, amount, vaultAddress?}` | Required |
//! | `IEXEC_OUT` | Output directory | `/tmp/iexec_out` |

use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::models::{coalesce_destination, AmountInput, ExecutionProof, ExecutionStatus};
use crate::relay::{IntentError, RelayIntent, RelayService, SettlementVenue, SourceLedger};
use crate::tracker::TrackerError;

pub const REQUESTER_SECRET_ENV: &str = "IEXEC_REQUESTER_SECRET_1";
pub const IEXEC_OUT_ENV: &str = "IEXEC_OUT";
pub const DEFAULT_IEXEC_OUT: &str = "/tmp/iexec_out";

pub const RESULT_FILE: &str = "result.json";
pub const COMPUTED_FILE: &str = "computed.json";

#[derive(Debug, thiserror::Error)]
pub enum EnclaveError {
    #[error("IEXEC_REQUESTER_SECRET_1 is not set")]
    MissingSecret,

    #[error("invalid requester secret: {0}")]
    InvalidSecret(#[source] serde_json::Error),

    #[error("invalid vaultAddress: {0}")]
    InvalidVault(String),

    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("relay failed: {0}")]
    RelayFailed(String),

    #[error("failed to write task output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode task output: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Intent payload delivered by the requester.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnclaveTask {
    pub destination: Option<String>,
    pub hl_destination: Option<String>,
    pub amount: Option<AmountInput>,
    /// Overrides `VAULT_ADDRESS` for this task.
    pub vault_address: Option<String>,
}

impl EnclaveTask {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnclaveError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(REQUESTER_SECRET_ENV).ok_or(EnclaveError::MissingSecret)?;
        serde_json::from_str(&raw).map_err(EnclaveError::InvalidSecret)
    }

    pub fn intent(&self) -> Result<RelayIntent, IntentError> {
        let amount = self.amount.as_ref().map(AmountInput::as_decimal);
        let destination =
            coalesce_destination(self.destination.as_deref(), self.hl_destination.as_deref());
        RelayIntent::parse(destination, amount.as_deref())
    }

    pub fn vault_override(&self) -> Result<Option<Address>, EnclaveError> {
        self.vault_address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Address>()
                    .map_err(|e| EnclaveError::InvalidVault(e.to_string()))
            })
            .transpose()
    }
}

/// Output directory from `IEXEC_OUT`.
pub fn output_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup(IEXEC_OUT_ENV)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IEXEC_OUT))
}

/// Write `result.json` and the `computed.json` pointer to it.
pub fn write_outputs(out_dir: &Path, proof: &ExecutionProof) -> Result<PathBuf, EnclaveError> {
    fs::create_dir_all(out_dir)?;

    let result_path = out_dir.join(RESULT_FILE);
    let result = serde_json::to_vec_pretty(proof).map_err(EnclaveError::Encode)?;
    fs::write(&result_path, result)?;

    let computed = json!({ "deterministic-output-path": result_path.to_string_lossy() });
    let computed = serde_json::to_vec_pretty(&computed).map_err(EnclaveError::Encode)?;
    fs::write(out_dir.join(COMPUTED_FILE), computed)?;

    Ok(result_path)
}

/// Run one intent to completion and write its proof bundle.
pub async fn run_once<L: SourceLedger, V: SettlementVenue>(
    service: &RelayService<L, V>,
    intent: RelayIntent,
    out_dir: &Path,
) -> Result<ExecutionProof, EnclaveError> {
    let record = service.run_to_completion(intent).await?;
    match (record.status, record.result) {
        (ExecutionStatus::Completed, Some(proof)) => {
            let path = write_outputs(out_dir, &proof)?;
            info!(
                execution_id = %record.id,
                address = %proof.ephemeral_address,
                output = %path.display(),
                "Enclave task completed"
            );
            Ok(proof)
        }
        _ => Err(EnclaveError::RelayFailed(
            record.error.unwrap_or_else(|| "no proof recorded".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use alloy::primitives::U256;
    use tokio_util::sync::CancellationToken;

    use crate::models::RelayMode;
    use crate::relay::{ExecutorSettings, RelayExecutor, RetryPolicy};
    use crate::sim::SimulatedNetwork;
    use crate::storage::InMemoryExecutionStore;
    use crate::tracker::ExecutionTracker;

    const DESTINATION: &str = "0xd5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5d5";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn service(network: &Arc<SimulatedNetwork>) -> RelayService<SimulatedNetwork, SimulatedNetwork> {
        let settings = ExecutorSettings {
            mode: RelayMode::Direct,
            gas_top_up: U256::from(1_000_000_000_000_000u64),
            bridge: network.bridge_address(),
            settlement_poll: RetryPolicy::new(Duration::from_secs(5), 30),
        };
        let executor = RelayExecutor::new(network.clone(), network.clone(), settings);
        let tracker = Arc::new(ExecutionTracker::new(Arc::new(InMemoryExecutionStore::new())));
        RelayService::new(executor, tracker, 1, CancellationToken::new())
    }

    fn network() -> Arc<SimulatedNetwork> {
        Arc::new(
            SimulatedNetwork::seeded(Address::repeat_byte(0x0e), U256::from(50_000_000u64))
                .unwrap(),
        )
    }

    #[test]
    fn task_is_read_from_the_requester_secret() {
        let secret = format!(
            r#"{{"destination":"{DESTINATION}","amount":"6.25","vaultAddress":"0x1111111111111111111111111111111111111111"}}"#
        );
        let task = EnclaveTask::from_lookup(lookup(&[(REQUESTER_SECRET_ENV, &secret)])).unwrap();
        let intent = task.intent().unwrap();
        assert_eq!(intent.amount, U256::from(6_250_000u64));
        assert_eq!(
            task.vault_override().unwrap(),
            Some(Address::repeat_byte(0x11))
        );
    }

    #[test]
    fn missing_or_malformed_secret_is_rejected() {
        assert!(matches!(
            EnclaveTask::from_lookup(lookup(&[])),
            Err(EnclaveError::MissingSecret)
        ));
        assert!(matches!(
            EnclaveTask::from_lookup(lookup(&[(REQUESTER_SECRET_ENV, "{")])),
            Err(EnclaveError::InvalidSecret(_))
        ));

        let task =
            EnclaveTask::from_lookup(lookup(&[(REQUESTER_SECRET_ENV, r#"{"amount":"5"}"#)]))
                .unwrap();
        assert_eq!(task.intent().unwrap_err(), IntentError::MissingField);
        assert_eq!(task.vault_override().unwrap(), None);
    }

    #[test]
    fn destination_wins_over_hl_destination() {
        let secret = format!(
            r#"{{"destination":"{DESTINATION}","hlDestination":"0x1111111111111111111111111111111111111111","amount":5}}"#
        );
        let task = EnclaveTask::from_lookup(lookup(&[(REQUESTER_SECRET_ENV, &secret)])).unwrap();
        assert_eq!(
            task.intent().unwrap().destination,
            DESTINATION.parse::<Address>().unwrap()
        );
    }

    #[test]
    fn output_dir_defaults() {
        assert_eq!(output_dir(lookup(&[])), PathBuf::from(DEFAULT_IEXEC_OUT));
        assert_eq!(
            output_dir(lookup(&[(IEXEC_OUT_ENV, "/iexec_out")])),
            PathBuf::from("/iexec_out")
        );
    }

    #[tokio::test]
    async fn run_once_writes_result_and_pointer() {
        let network = network();
        let service = service(&network);
        let out = tempfile::tempdir().unwrap();

        let intent = RelayIntent::parse(Some(DESTINATION), Some("5")).unwrap();
        let proof = run_once(&service, intent, out.path()).await.unwrap();

        let result: ExecutionProof =
            serde_json::from_slice(&fs::read(out.path().join(RESULT_FILE)).unwrap()).unwrap();
        assert_eq!(result, proof);

        let computed: serde_json::Value =
            serde_json::from_slice(&fs::read(out.path().join(COMPUTED_FILE)).unwrap()).unwrap();
        assert_eq!(
            computed["deterministic-output-path"],
            out.path().join(RESULT_FILE).to_string_lossy().as_ref()
        );
    }

    #[tokio::test]
    async fn failed_run_writes_nothing() {
        let network = network();
        network.drain_orchestrator_fees();
        let service = service(&network);
        let out = tempfile::tempdir().unwrap();

        let intent = RelayIntent::parse(Some(DESTINATION), Some("5")).unwrap();
        let err = run_once(&service, intent, out.path()).await.unwrap_err();
        match err {
            EnclaveError::RelayFailed(reason) => assert!(reason.starts_with("InsufficientFunds")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.path().join(RESULT_FILE).exists());
    }
}
