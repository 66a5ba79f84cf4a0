// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the settlement venue's public API.
//!
//! - `POST {api}/info` with `{"type":"clearinghouseState","user":...}` reads
//!   the credited account value (`marginSummary.accountValue`).
//! - `POST {api}/exchange` submits a signed [`UsdSend`](super::UsdSend).

use std::time::Duration;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::usd_send::UsdSend;
use crate::blockchain::{parse_amount_truncating, ASSET_DECIMALS};
use crate::identity::EphemeralIdentity;
use crate::relay::{SettlementError, SettlementVenue};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Settlement venue configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementConfig {
    /// API base URL, e.g. `https://api.hyperliquid-testnet.xyz`.
    pub api_url: String,
    /// `hyperliquidChain` tag of transfer messages.
    pub chain: String,
    /// Chain id of the EIP-712 signing domain.
    pub signature_chain_id: u64,
}

pub struct HttpSettlementVenue {
    http: reqwest::Client,
    config: SettlementConfig,
}

impl HttpSettlementVenue {
    pub fn new(config: SettlementConfig) -> Result<Self, SettlementError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SettlementError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, SettlementError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| SettlementError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SettlementError::Transport(format!("HTTP {status}: {text}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SettlementError::MalformedResponse(e.to_string()))
    }
}

/// Extract the credited value from a `clearinghouseState` response.
fn parse_account_value(state: &Value) -> Result<U256, SettlementError> {
    let value = &state["marginSummary"]["accountValue"];
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => {
            return Err(SettlementError::MalformedResponse(
                "missing marginSummary.accountValue".into(),
            ))
        }
        other => {
            return Err(SettlementError::MalformedResponse(format!(
                "unexpected accountValue {other}"
            )))
        }
    };
    parse_amount_truncating(&text, ASSET_DECIMALS)
        .map_err(|e| SettlementError::MalformedResponse(format!("accountValue {text:?}: {e}")))
}

impl SettlementVenue for HttpSettlementVenue {
    async fn credited_value(&self, account: Address) -> Result<U256, SettlementError> {
        let body = json!({
            "type": "clearinghouseState",
            "user": format!("0x{}", alloy::hex::encode(account)),
        });
        let state = self.post("info", &body).await?;
        let credited = parse_account_value(&state)?;
        debug!(address = %account, credited = %credited, "Settlement account state");
        Ok(credited)
    }

    async fn send_transfer(
        &self,
        from: &EphemeralIdentity,
        destination: Address,
        amount: &str,
    ) -> Result<Value, SettlementError> {
        let time = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let signed = UsdSend::new(&self.config.chain, destination, amount, time)
            .sign(from, self.config.signature_chain_id)?;

        let response = self.post("exchange", &signed.to_payload()).await?;
        if response["status"] == "err" {
            return Err(SettlementError::Refused(response["response"].to_string()));
        }

        info!(address = %from.address(), destination = %destination, amount, "Settlement transfer accepted");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::SignedUsdSend;
    use axum::{extract::State, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    use tokio_util::sync::CancellationToken;

    use crate::models::ExecutionStatus;
    use crate::relay::{
        ExecutorSettings, IntentSubmitter, RelayExecutor, RelayIntent, RelayMode, RelayService, RetryPolicy,
    };
    use crate::sim::SimulatedNetwork;
    use crate::storage::InMemoryExecutionStore;
    use crate::tracker::ExecutionTracker;

    #[derive(Clone, Default)]
    struct FakeVenue {
        account_value: Arc<Mutex<Value>>,
        exchange_reply: Arc<Mutex<Value>>,
        received: Arc<Mutex<Vec<Value>>>,
    }

    async fn info(State(venue): State<FakeVenue>, Json(body): Json<Value>) -> Json<Value> {
        assert_eq!(body["type"], "clearinghouseState");
        let value = venue.account_value.lock().unwrap().clone();
        Json(json!({ "marginSummary": { "accountValue": value } }))
    }

    async fn exchange(State(venue): State<FakeVenue>, Json(body): Json<Value>) -> Json<Value> {
        venue.received.lock().unwrap().push(body);
        Json(venue.exchange_reply.lock().unwrap().clone())
    }

    async fn spawn_venue(venue: FakeVenue) -> HttpSettlementVenue {
        let app = Router::new()
            .route("/info", post(info))
            .route("/exchange", post(exchange))
            .with_state(venue);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HttpSettlementVenue::new(SettlementConfig {
            api_url: format!("http://{addr}/"),
            chain: "Testnet".into(),
            signature_chain_id: 421_614,
        })
        .unwrap()
    }

    #[test]
    fn account_value_parsing() {
        let ok = json!({"marginSummary": {"accountValue": "5.123456789"}});
        assert_eq!(parse_account_value(&ok).unwrap(), U256::from(5_123_456u64));

        let numeric = json!({"marginSummary": {"accountValue": 7}});
        assert_eq!(parse_account_value(&numeric).unwrap(), U256::from(7_000_000u64));

        assert!(matches!(
            parse_account_value(&json!({})),
            Err(SettlementError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_account_value(&json!({"marginSummary": {"accountValue": "NaN"}})),
            Err(SettlementError::MalformedResponse(_))
        ));
        // Multi-byte character straddling the truncation point.
        assert!(matches!(
            parse_account_value(&json!({"marginSummary": {"accountValue": "1.12345é"}})),
            Err(SettlementError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn reads_credited_value() {
        let fake = FakeVenue::default();
        *fake.account_value.lock().unwrap() = json!("12.5");
        let venue = spawn_venue(fake).await;

        let credited = venue.credited_value(Address::repeat_byte(1)).await.unwrap();
        assert_eq!(credited, U256::from(12_500_000u64));
    }

    #[tokio::test]
    async fn non_ascii_account_value_is_malformed() {
        let fake = FakeVenue::default();
        *fake.account_value.lock().unwrap() = json!("1.12345é");
        let venue = spawn_venue(fake).await;

        let err = venue.credited_value(Address::repeat_byte(1)).await.unwrap_err();
        assert!(matches!(err, SettlementError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn garbled_venue_fails_the_bridge_run() {
        let fake = FakeVenue::default();
        *fake.account_value.lock().unwrap() = json!("1.12345é");
        let venue = spawn_venue(fake.clone()).await;

        let network = Arc::new(
            SimulatedNetwork::seeded(Address::repeat_byte(0x0e), U256::from(100_000_000u64))
                .unwrap(),
        );
        let settings = ExecutorSettings {
            mode: RelayMode::Bridge,
            gas_top_up: U256::from(1_000_000_000_000_000u64),
            bridge: network.bridge_address(),
            settlement_poll: RetryPolicy::new(Duration::from_millis(10), 3),
        };
        let executor = RelayExecutor::new(network.clone(), Arc::new(venue), settings);
        let tracker = Arc::new(ExecutionTracker::new(Arc::new(InMemoryExecutionStore::new())));
        let service = RelayService::new(executor, tracker.clone(), 1, CancellationToken::new());

        let intent = RelayIntent::new(Address::repeat_byte(0xd5), U256::from(5_000_000u64)).unwrap();
        let record = service.submit(intent).unwrap();

        let mut done = tracker.get(&record.id).unwrap();
        for _ in 0..500 {
            if done.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            done = tracker.get(&record.id).unwrap();
        }
        assert_eq!(done.status, ExecutionStatus::Failed);
        let error = done.error.unwrap();
        assert!(error.starts_with("SettlementTimeout: "), "{error}");
        assert!(fake.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submits_signed_transfer_and_returns_ack_verbatim() {
        let fake = FakeVenue::default();
        let ack = json!({"status": "ok", "response": {"type": "default"}});
        *fake.exchange_reply.lock().unwrap() = ack.clone();
        let venue = spawn_venue(fake.clone()).await;

        let identity = EphemeralIdentity::generate();
        let destination = Address::repeat_byte(0x22);
        let response = venue.send_transfer(&identity, destination, "5").await.unwrap();
        assert_eq!(response, ack);

        let received = fake.received.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        let signed = SignedUsdSend::from_payload(&received[0]).unwrap();
        assert_eq!(signed.signer().unwrap(), identity.address());
        assert_eq!(signed.action.amount, "5");
        assert_eq!(signed.action.hyperliquid_chain, "Testnet");
    }

    #[tokio::test]
    async fn refused_transfer_is_an_error() {
        let fake = FakeVenue::default();
        *fake.exchange_reply.lock().unwrap() =
            json!({"status": "err", "response": "Insufficient balance"});
        let venue = spawn_venue(fake).await;

        let err = venue
            .send_transfer(&EphemeralIdentity::generate(), Address::repeat_byte(3), "5")
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Refused(_)));
    }

    #[tokio::test]
    async fn unreachable_venue_is_a_transport_error() {
        let venue = HttpSettlementVenue::new(SettlementConfig {
            api_url: "http://127.0.0.1:1".into(),
            chain: "Testnet".into(),
            signature_chain_id: 421_614,
        })
        .unwrap();
        let err = venue.credited_value(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, SettlementError::Transport(_)));
    }
}
