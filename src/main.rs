// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, future::Future, io, process::ExitCode, sync::Arc, time::Duration};

use alloy::primitives::{Address, U256};
use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use privacy_bridge_server::{
    api::router,
    blockchain::{format_amount, orchestrator_signer, EvmLedger, ASSET_DECIMALS},
    config::{Backend, RelayConfig, LOG_FORMAT_ENV, VAULT_ADDRESS_ENV},
    enclave::{self, EnclaveTask},
    identity::EphemeralIdentity,
    logging::{init_logging, LogFormat, DEFAULT_LOG_FILTER},
    relay::{RelayExecutor, RelayService, SettlementVenue, SourceLedger},
    settlement::HttpSettlementVenue,
    sim::SimulatedNetwork,
    state::AppState,
    storage::{ExecutionStore, InMemoryExecutionStore, RedbExecutionStore},
    tracker::ExecutionTracker,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How long spawned runs get to finish after ctrl-c.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
/// Vault pool of the simulated backend: 1,000 units of the asset.
const SIM_POOL: U256 = U256::from_limbs([1_000_000_000, 0, 0, 0]);

#[tokio::main]
async fn main() -> ExitCode {
    let log_format = env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or_default();
    init_logging(DEFAULT_LOG_FILTER, log_format);

    let run_once = env::args().nth(1).as_deref() == Some("run-once");
    match start(run_once).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Relay exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn start(run_once: bool) -> Result<(), BoxError> {
    // Install the ring crypto provider for rustls before any TLS use.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    let task = if run_once {
        Some(EnclaveTask::from_lookup(|key| env::var(key).ok())?)
    } else {
        None
    };
    let vault_override = match &task {
        Some(task) => task.vault_override()?,
        None => None,
    };

    let config = RelayConfig::from_lookup(|key| match (key, vault_override) {
        (VAULT_ADDRESS_ENV, Some(vault)) => Some(vault.to_string()),
        _ => env::var(key).ok(),
    })?;
    info!(?config, "Configuration loaded");

    let store: Arc<dyn ExecutionStore> = match &config.data_dir {
        Some(dir) => Arc::new(RedbExecutionStore::open_in(dir)?),
        None => {
            warn!("DATA_DIR not set, execution records are kept in memory only");
            Arc::new(InMemoryExecutionStore::new())
        }
    };
    let tracker = Arc::new(ExecutionTracker::new(store));
    tracker.recover_interrupted()?;

    match config.backend {
        Backend::Evm => {
            let secret = config
                .orchestrator_secret
                .as_deref()
                .ok_or("orchestrator credential is not configured")?;
            let vault = config
                .vault_address
                .ok_or("VAULT_ADDRESS is not configured")?;
            let ledger = EvmLedger::new(
                config.network.clone(),
                orchestrator_signer(secret)?,
                vault,
                config.asset_address,
                config.confirmations,
            )?;
            let venue = HttpSettlementVenue::new(config.settlement.clone())?;
            let bridge = config.bridge_address;
            info!(
                network = %ledger.network().name,
                vault = %vault,
                mode = %config.mode,
                "Using EVM source ledger"
            );
            match ledger.total_deposited().await {
                Ok(pool) => info!(pool = %format_amount(pool, ASSET_DECIMALS), "Vault pool"),
                Err(e) => warn!(error = %e, "Could not read vault pool"),
            }
            run(config, Arc::new(ledger), Arc::new(venue), bridge, tracker, task).await
        }
        Backend::Simulated => {
            let orchestrator = match config.orchestrator_secret.as_deref() {
                Some(secret) => orchestrator_signer(secret)?.address(),
                None => EphemeralIdentity::generate().address(),
            };
            let network = Arc::new(SimulatedNetwork::seeded(orchestrator, SIM_POOL)?);
            let bridge = network.bridge_address();
            info!(orchestrator = %orchestrator, mode = %config.mode, "Using simulated backend");
            run(config, network.clone(), network, bridge, tracker, task).await
        }
    }
}

async fn run<L: SourceLedger, V: SettlementVenue>(
    config: RelayConfig,
    ledger: Arc<L>,
    venue: Arc<V>,
    bridge: Address,
    tracker: Arc<ExecutionTracker>,
    task: Option<EnclaveTask>,
) -> Result<(), BoxError> {
    let executor = RelayExecutor::new(ledger, venue, config.executor_settings(bridge));
    let shutdown = CancellationToken::new();
    let service = Arc::new(RelayService::new(
        executor,
        tracker.clone(),
        config.max_in_flight,
        shutdown,
    ));

    if let Some(task) = task {
        let out_dir = enclave::output_dir(|key| env::var(key).ok());
        enclave::run_once(&service, task.intent()?, &out_dir).await?;
        return Ok(());
    }

    let app = router(AppState::new(tracker, service.clone()));
    let addr = config.bind_addr()?;

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!(%addr, "Relay listening on https (docs at /docs)");
            until_ctrl_c(axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()))
                .await?;
        }
        None => {
            info!(%addr, "Relay listening on http (docs at /docs)");
            until_ctrl_c(axum_server::bind(addr).serve(app.into_make_service())).await?;
        }
    }

    if !service.shutdown(SHUTDOWN_GRACE).await {
        warn!("Some relay runs did not finish before shutdown");
    }
    Ok(())
}

/// Drive the server until it fails or ctrl-c arrives.
async fn until_ctrl_c(server: impl Future<Output = io::Result<()>>) -> io::Result<()> {
    tokio::select! {
        result = server => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}
