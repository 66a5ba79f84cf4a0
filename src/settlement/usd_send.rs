// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed, domain-separated transfer message of the settlement venue.
//!
//! The venue accepts user-signed actions rather than raw transactions. A
//! `UsdSend` is hashed per EIP-712 under the venue's signing domain:
//!
//! ```text
//! domain  = { name: "HyperliquidSignTransaction", version: "1",
//!             chainId: <signature chain id>, verifyingContract: 0x0 }
//! message = UsdSend(string hyperliquidChain, string destination,
//!                   string amount, uint64 time)
//! ```
//!
//! The domain goes through alloy's [`Eip712Domain`]. The primary type name
//! contains a colon, which the `sol!` macro cannot express, so the struct
//! hash is assembled by hand.

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, Signature, B256, U256};
use alloy::sol_types::Eip712Domain;
use serde_json::{json, Value};

use crate::identity::EphemeralIdentity;
use crate::relay::SettlementError;

pub const DOMAIN_NAME: &str = "HyperliquidSignTransaction";
pub const DOMAIN_VERSION: &str = "1";

pub const USD_SEND_TYPE: &str = "HyperliquidTransaction:UsdSend(string hyperliquidChain,string destination,string amount,uint64 time)";

/// The venue's signing domain on `chain_id`.
pub fn signing_domain(chain_id: u64) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(DOMAIN_NAME)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(Address::ZERO),
        None,
    )
}

/// EIP-712 domain separator for `chain_id`.
pub fn domain_separator(chain_id: u64) -> B256 {
    signing_domain(chain_id).separator()
}

/// Transfer of credited value to another venue account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsdSend {
    /// Venue network tag, e.g. `"Testnet"`.
    pub hyperliquid_chain: String,
    /// Recipient, lowercase 0x-hex.
    pub destination: String,
    /// Decimal amount, e.g. `"5"`.
    pub amount: String,
    /// Milliseconds since the epoch; doubles as the nonce.
    pub time: u64,
}

impl UsdSend {
    pub fn new(chain: impl Into<String>, destination: Address, amount: impl Into<String>, time: u64) -> Self {
        Self {
            hyperliquid_chain: chain.into(),
            destination: format!("0x{}", alloy::hex::encode(destination)),
            amount: amount.into(),
            time,
        }
    }

    pub fn struct_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(keccak256(USD_SEND_TYPE).as_slice());
        buf.extend_from_slice(keccak256(&self.hyperliquid_chain).as_slice());
        buf.extend_from_slice(keccak256(&self.destination).as_slice());
        buf.extend_from_slice(keccak256(&self.amount).as_slice());
        buf.extend_from_slice(&U256::from(self.time).to_be_bytes::<32>());
        keccak256(buf)
    }

    /// Digest that gets signed: `keccak256(0x1901 ‖ domainSeparator ‖ structHash)`.
    pub fn signing_hash(&self, signature_chain_id: u64) -> B256 {
        let mut buf = Vec::with_capacity(2 + 32 + 32);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(domain_separator(signature_chain_id).as_slice());
        buf.extend_from_slice(self.struct_hash().as_slice());
        keccak256(buf)
    }

    /// Sign with the ephemeral identity's own key.
    pub fn sign(
        self,
        identity: &EphemeralIdentity,
        signature_chain_id: u64,
    ) -> Result<SignedUsdSend, SettlementError> {
        let digest = self.signing_hash(signature_chain_id);
        let signature = identity
            .sign_digest(&digest)
            .map_err(|e| SettlementError::Signing(e.to_string()))?;
        Ok(SignedUsdSend {
            action: self,
            signature_chain_id,
            signature,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SignedUsdSend {
    pub action: UsdSend,
    pub signature_chain_id: u64,
    pub signature: Signature,
}

impl SignedUsdSend {
    /// Address that produced the signature.
    pub fn signer(&self) -> Result<Address, SettlementError> {
        let digest = self.action.signing_hash(self.signature_chain_id);
        self.signature
            .recover_address_from_prehash(&digest)
            .map_err(|e| SettlementError::Signing(e.to_string()))
    }

    /// Body for the venue's `/exchange` endpoint.
    pub fn to_payload(&self) -> Value {
        let r = B256::from(self.signature.r().to_be_bytes::<32>());
        let s = B256::from(self.signature.s().to_be_bytes::<32>());
        let v = 27 + u64::from(self.signature.v());
        json!({
            "action": {
                "type": "usdSend",
                "hyperliquidChain": self.action.hyperliquid_chain,
                "signatureChainId": format!("{:#x}", self.signature_chain_id),
                "destination": self.action.destination,
                "amount": self.action.amount,
                "time": self.action.time,
            },
            "nonce": self.action.time,
            "signature": { "r": r.to_string(), "s": s.to_string(), "v": v },
        })
    }

    /// Rebuild a signed action from an `/exchange` body.
    pub fn from_payload(payload: &Value) -> Result<Self, SettlementError> {
        let malformed = |what: &str| SettlementError::MalformedResponse(format!("missing {what}"));
        let action = &payload["action"];
        let text = |v: &Value, what: &str| v.as_str().map(str::to_string).ok_or_else(|| malformed(what));

        let chain_id_hex = text(&action["signatureChainId"], "signatureChainId")?;
        let signature_chain_id = u64::from_str_radix(chain_id_hex.trim_start_matches("0x"), 16)
            .map_err(|_| malformed("valid signatureChainId"))?;

        let r: B256 = text(&payload["signature"]["r"], "r")?
            .parse()
            .map_err(|_| malformed("valid r"))?;
        let s: B256 = text(&payload["signature"]["s"], "s")?
            .parse()
            .map_err(|_| malformed("valid s"))?;
        let v = payload["signature"]["v"].as_u64().ok_or_else(|| malformed("v"))?;

        Ok(Self {
            action: UsdSend {
                hyperliquid_chain: text(&action["hyperliquidChain"], "hyperliquidChain")?,
                destination: text(&action["destination"], "destination")?,
                amount: text(&action["amount"], "amount")?,
                time: action["time"].as_u64().ok_or_else(|| malformed("time"))?,
            },
            signature_chain_id,
            signature: Signature::new(U256::from_be_bytes(r.0), U256::from_be_bytes(s.0), v == 28),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::ARBITRUM_SEPOLIA_CHAIN_ID;

    fn message(destination: Address) -> UsdSend {
        UsdSend::new("Testnet", destination, "5", 1_700_000_000_000)
    }

    #[test]
    fn signature_recovers_to_the_ephemeral_identity() {
        let identity = EphemeralIdentity::generate();
        let signed = message(Address::repeat_byte(0x42))
            .sign(&identity, ARBITRUM_SEPOLIA_CHAIN_ID)
            .unwrap();
        assert_eq!(signed.signer().unwrap(), identity.address());
    }

    #[test]
    fn payload_round_trips_through_the_wire_shape() {
        let identity = EphemeralIdentity::generate();
        let signed = message(Address::repeat_byte(0xab))
            .sign(&identity, ARBITRUM_SEPOLIA_CHAIN_ID)
            .unwrap();
        let payload = signed.to_payload();

        assert_eq!(payload["action"]["type"], "usdSend");
        assert_eq!(payload["action"]["hyperliquidChain"], "Testnet");
        assert_eq!(payload["action"]["signatureChainId"], "0x66eee");
        assert_eq!(
            payload["action"]["destination"],
            "0xabababababababababababababababababababab"
        );
        assert_eq!(payload["action"]["amount"], "5");
        assert_eq!(payload["nonce"], payload["action"]["time"]);
        let v = payload["signature"]["v"].as_u64().unwrap();
        assert!(v == 27 || v == 28);

        let parsed = SignedUsdSend::from_payload(&payload).unwrap();
        assert_eq!(parsed.action, signed.action);
        assert_eq!(parsed.signer().unwrap(), identity.address());
    }

    #[test]
    fn tampered_amount_changes_the_signer() {
        let identity = EphemeralIdentity::generate();
        let mut signed = message(Address::repeat_byte(0x01))
            .sign(&identity, ARBITRUM_SEPOLIA_CHAIN_ID)
            .unwrap();
        signed.action.amount = "500".into();
        assert_ne!(signed.signer().ok(), Some(identity.address()));
    }

    #[test]
    fn domain_separator_matches_the_typed_encoding() {
        let mut buf = Vec::new();
        buf.extend_from_slice(
            keccak256(
                "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
            )
            .as_slice(),
        );
        buf.extend_from_slice(keccak256(DOMAIN_NAME).as_slice());
        buf.extend_from_slice(keccak256(DOMAIN_VERSION).as_slice());
        buf.extend_from_slice(&U256::from(421_614u64).to_be_bytes::<32>());
        buf.extend_from_slice(B256::ZERO.as_slice());
        assert_eq!(domain_separator(421_614), keccak256(buf));
    }

    #[test]
    fn domain_depends_on_chain_id() {
        assert_ne!(domain_separator(421_614), domain_separator(42_161));
        let msg = message(Address::ZERO);
        assert_ne!(msg.signing_hash(421_614), msg.signing_hash(42_161));
    }
}
