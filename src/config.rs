// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All settings come from the environment at startup and are validated into
//! a typed [`RelayConfig`]. Values are read through a lookup function so
//! tests can supply a map instead of mutating the process environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` / `PORT` | Server bind address | `0.0.0.0` / `3001` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `RELAY_BACKEND` | `evm` or `simulated` | `evm` |
//! | `RELAY_MODE` | `direct` or `bridge` | `direct` |
//! | `RPC_URL` / `CHAIN_ID` / `EXPLORER_URL` | Source ledger endpoint | Arbitrum Sepolia |
//! | `VAULT_ADDRESS` | Vault contract | Required for `evm` |
//! | `ASSET_ADDRESS` | Custodied asset | Arbitrum Sepolia USDC |
//! | `BRIDGE_ADDRESS` | Bridge intake | Hyperliquid testnet bridge |
//! | `ORCHESTRATOR_PRIVATE_KEY` | Privileged credential (hex or PEM) | Required for `evm` |
//! | `SETTLEMENT_API_URL` | Settlement venue API | Hyperliquid testnet |
//! | `SETTLEMENT_CHAIN` | Transfer message chain tag | `Testnet` |
//! | `SETTLEMENT_SIGNATURE_CHAIN_ID` | Signing domain chain id | `421614` |
//! | `GAS_TOP_UP_WEI` | Fee funding per run | `1000000000000000` |
//! | `CONFIRMATIONS` | Confirmations per step | `1` |
//! | `SETTLEMENT_POLL_INTERVAL_SECS` / `SETTLEMENT_POLL_MAX_ATTEMPTS` | Settlement wait | `5` / `30` |
//! | `MAX_IN_FLIGHT` | Concurrent runs | `4` |
//! | `DATA_DIR` | Durable execution store directory | In-memory |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS | Plain HTTP |
//!
//! `TEE_PRIVATE_KEY` and `IEXEC_APP_DEVELOPER_SECRET` are accepted in place
//! of `ORCHESTRATOR_PRIVATE_KEY`, in that order.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};

use crate::blockchain::{NetworkConfig, HL_TESTNET_BRIDGE, USDC_ARBITRUM_SEPOLIA};
use crate::logging::LogFormat;
use crate::relay::{ExecutorSettings, RelayMode, RetryPolicy};
use crate::settlement::SettlementConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const RELAY_BACKEND_ENV: &str = "RELAY_BACKEND";
pub const RELAY_MODE_ENV: &str = "RELAY_MODE";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const EXPLORER_URL_ENV: &str = "EXPLORER_URL";
pub const VAULT_ADDRESS_ENV: &str = "VAULT_ADDRESS";
pub const ASSET_ADDRESS_ENV: &str = "ASSET_ADDRESS";
pub const BRIDGE_ADDRESS_ENV: &str = "BRIDGE_ADDRESS";
pub const SETTLEMENT_API_URL_ENV: &str = "SETTLEMENT_API_URL";
pub const SETTLEMENT_CHAIN_ENV: &str = "SETTLEMENT_CHAIN";
pub const SETTLEMENT_SIGNATURE_CHAIN_ID_ENV: &str = "SETTLEMENT_SIGNATURE_CHAIN_ID";
pub const GAS_TOP_UP_WEI_ENV: &str = "GAS_TOP_UP_WEI";
pub const CONFIRMATIONS_ENV: &str = "CONFIRMATIONS";
pub const POLL_INTERVAL_ENV: &str = "SETTLEMENT_POLL_INTERVAL_SECS";
pub const POLL_MAX_ATTEMPTS_ENV: &str = "SETTLEMENT_POLL_MAX_ATTEMPTS";
pub const MAX_IN_FLIGHT_ENV: &str = "MAX_IN_FLIGHT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// Orchestrator credential variables, in order of precedence.
pub const ORCHESTRATOR_KEY_ENVS: [&str; 3] = [
    "ORCHESTRATOR_PRIVATE_KEY",
    "TEE_PRIVATE_KEY",
    "IEXEC_APP_DEVELOPER_SECRET",
];

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SETTLEMENT_API_URL: &str = "https://api.hyperliquid-testnet.xyz";
/// 0.001 of the fee currency.
pub const DEFAULT_GAS_TOP_UP_WEI: u64 = 1_000_000_000_000_000;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Which ledgers the relay talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// JSON-RPC source ledger and HTTP settlement venue.
    Evm,
    /// In-process [`SimulatedNetwork`](crate::sim::SimulatedNetwork).
    Simulated,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evm" => Ok(Backend::Evm),
            "simulated" | "sim" => Ok(Backend::Simulated),
            other => Err(format!("unknown backend '{other}' (expected evm or simulated)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub backend: Backend,
    pub mode: RelayMode,
    pub network: NetworkConfig,
    pub vault_address: Option<Address>,
    pub asset_address: Address,
    pub bridge_address: Address,
    /// Never logged; see the `Debug` impl.
    pub orchestrator_secret: Option<String>,
    pub settlement: SettlementConfig,
    pub gas_top_up: U256,
    pub confirmations: u64,
    pub settlement_poll: RetryPolicy,
    pub max_in_flight: usize,
    pub data_dir: Option<PathBuf>,
    pub tls: Option<TlsPaths>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_format", &self.log_format)
            .field("backend", &self.backend)
            .field("mode", &self.mode)
            .field("network", &self.network)
            .field("vault_address", &self.vault_address)
            .field("asset_address", &self.asset_address)
            .field("bridge_address", &self.bridge_address)
            .field(
                "orchestrator_secret",
                &self.orchestrator_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("settlement", &self.settlement)
            .field("gas_top_up", &self.gas_top_up)
            .field("confirmations", &self.confirmations)
            .field("settlement_poll", &self.settlement_poll)
            .field("max_in_flight", &self.max_in_flight)
            .field("data_dir", &self.data_dir)
            .field("tls", &self.tls)
            .finish()
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_address<F>(lookup: &F, var: &'static str) -> Result<Option<Address>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<Address>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

impl RelayConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = parse_var(&lookup, RELAY_BACKEND_ENV, Backend::Evm)?;

        let defaults = NetworkConfig::arbitrum_sepolia();
        let network = NetworkConfig {
            name: defaults.name.clone(),
            chain_id: parse_var(&lookup, CHAIN_ID_ENV, defaults.chain_id)?,
            rpc_url: lookup(RPC_URL_ENV).unwrap_or(defaults.rpc_url),
            explorer_url: lookup(EXPLORER_URL_ENV).unwrap_or(defaults.explorer_url),
        };

        let orchestrator_secret = ORCHESTRATOR_KEY_ENVS
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()));

        let vault_address = parse_address(&lookup, VAULT_ADDRESS_ENV)?;
        if backend == Backend::Evm {
            if vault_address.is_none() {
                return Err(ConfigError::Missing(VAULT_ADDRESS_ENV));
            }
            if orchestrator_secret.is_none() {
                return Err(ConfigError::Missing(ORCHESTRATOR_KEY_ENVS[0]));
            }
        }

        let max_attempts: u32 = parse_var(&lookup, POLL_MAX_ATTEMPTS_ENV, 30)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: POLL_MAX_ATTEMPTS_ENV,
                reason: "must be at least 1".into(),
            });
        }
        let interval_secs: u64 = parse_var(&lookup, POLL_INTERVAL_ENV, 5)?;

        let max_in_flight: usize = parse_var(&lookup, MAX_IN_FLIGHT_ENV, DEFAULT_MAX_IN_FLIGHT)?;
        if max_in_flight == 0 {
            return Err(ConfigError::Invalid {
                var: MAX_IN_FLIGHT_ENV,
                reason: "must be at least 1".into(),
            });
        }

        let tls = match (lookup(TLS_CERT_PATH_ENV), lookup(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, PORT_ENV, DEFAULT_PORT)?,
            log_format: parse_var(&lookup, LOG_FORMAT_ENV, LogFormat::Pretty)?,
            backend,
            mode: parse_var(&lookup, RELAY_MODE_ENV, RelayMode::Direct)?,
            network,
            vault_address,
            asset_address: parse_address(&lookup, ASSET_ADDRESS_ENV)?
                .unwrap_or(USDC_ARBITRUM_SEPOLIA),
            bridge_address: parse_address(&lookup, BRIDGE_ADDRESS_ENV)?
                .unwrap_or(HL_TESTNET_BRIDGE),
            orchestrator_secret,
            settlement: SettlementConfig {
                api_url: lookup(SETTLEMENT_API_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_SETTLEMENT_API_URL.to_string()),
                chain: lookup(SETTLEMENT_CHAIN_ENV).unwrap_or_else(|| "Testnet".to_string()),
                signature_chain_id: parse_var(
                    &lookup,
                    SETTLEMENT_SIGNATURE_CHAIN_ID_ENV,
                    crate::blockchain::ARBITRUM_SEPOLIA_CHAIN_ID,
                )?,
            },
            gas_top_up: parse_var(&lookup, GAS_TOP_UP_WEI_ENV, U256::from(DEFAULT_GAS_TOP_UP_WEI))?,
            confirmations: parse_var(&lookup, CONFIRMATIONS_ENV, 1u64)?.max(1),
            settlement_poll: RetryPolicy::new(Duration::from_secs(interval_secs), max_attempts),
            max_in_flight,
            data_dir: lookup(DATA_DIR_ENV).map(PathBuf::from),
            tls,
        })
    }

    /// Pipeline settings; `bridge` is the intake the backend actually watches.
    pub fn executor_settings(&self, bridge: Address) -> ExecutorSettings {
        ExecutorSettings {
            mode: self.mode,
            gas_top_up: self.gas_top_up,
            bridge,
            settlement_poll: self.settlement_poll,
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: HOST_ENV,
                reason: e.to_string(),
            })
    }
}
