// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Orchestrator credential parsing.
//!
//! The enclave's secret-provisioning layer hands the privileged vault
//! credential to this process as either a raw hex secp256k1 key (with or
//! without `0x`) or a PEM document (SEC1 or PKCS#8). Both are turned into an
//! alloy `PrivateKeySigner` here and nowhere else.

use alloy::signers::local::PrivateKeySigner;
use k256::SecretKey;

/// Errors raised while loading a signing credential.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Create a signer from a hex-encoded private key (64 hex chars, optional 0x).
pub fn signer_from_hex(private_key_hex: &str) -> Result<PrivateKeySigner, KeyError> {
    let trimmed = private_key_hex.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let key_bytes =
        alloy::hex::decode(stripped).map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
}

/// Parse a private key from PEM format to hex string.
///
/// Accepts SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) encodings.
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, KeyError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| KeyError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| KeyError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| KeyError::InvalidPrivateKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// Load the orchestrator signer from whatever form the secret arrived in.
pub fn orchestrator_signer(secret: &str) -> Result<PrivateKeySigner, KeyError> {
    if secret.trim_start().starts_with("-----BEGIN") {
        let hex_key = pem_to_hex(secret.as_bytes())?;
        signer_from_hex(&hex_key)
    } else {
        signer_from_hex(secret)
    }
}
