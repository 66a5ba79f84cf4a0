// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ephemeral Identity Generator
//!
//! Every relay run gets a brand-new secp256k1 key drawn from the OS entropy
//! source. Nothing is derived from the orchestrator key, from the user, or
//! from any earlier identity, so the intermediary address has no history
//! that could link the vault payout to the final destination.
//!
//! The key lives only as long as the run that created it. Only its public
//! address is ever persisted (in the execution proof).

use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256},
    signers::{local::PrivateKeySigner, Signature, SignerSync},
};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::rand_core::OsRng;

/// A single-use signing identity.
///
/// Deliberately neither `Clone` nor serializable.
pub struct EphemeralIdentity {
    signer: PrivateKeySigner,
}

impl EphemeralIdentity {
    /// Generate a fresh identity.
    ///
    /// # Panics
    ///
    /// Panics if the OS entropy source fails. The relay cannot proceed
    /// safely without fresh randomness, so this is treated as fatal.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self {
            signer: PrivateKeySigner::from_signing_key(signing_key),
        }
    }

    /// Public EVM address of this identity.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Wallet for sending source-ledger transactions as this identity.
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    /// Sign a 32-byte prehashed digest (EIP-712 signing hash).
    pub fn sign_digest(&self, digest: &B256) -> Result<Signature, alloy::signers::Error> {
        self.signer.sign_hash_sync(digest)
    }
}

impl std::fmt::Debug for EphemeralIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralIdentity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identities_are_never_reused() {
        let addresses: HashSet<Address> = (0..64)
            .map(|_| EphemeralIdentity::generate().address())
            .collect();
        assert_eq!(addresses.len(), 64);
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let identity = EphemeralIdentity::generate();
        let rendered = format!("{identity:?}");
        assert!(rendered.contains(&identity.address().to_string()));
        assert!(!rendered.to_lowercase().contains("signer"));
    }

    #[test]
    fn signatures_recover_to_identity_address() {
        let identity = EphemeralIdentity::generate();
        let digest = alloy::primitives::keccak256(b"relay");
        let signature = identity.sign_digest(&digest).unwrap();
        let recovered = signature.recover_address_from_prehash(&digest).unwrap();
        assert_eq!(recovered, identity.address());
    }
}
