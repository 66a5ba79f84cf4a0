// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types, constants and the fixed-point amount codec.

use alloy::primitives::{Address, U256};

/// Decimals of the custodied asset (USDC-style, 6 fractional digits).
pub const ASSET_DECIMALS: u8 = 6;

/// Decimals of the fee currency (ETH-style, 18 fractional digits).
pub const NATIVE_DECIMALS: u8 = 18;

/// EVM network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Block explorer URL
    pub explorer_url: String,
}

impl NetworkConfig {
    /// Arbitrum Sepolia, where the vault and its asset are deployed.
    pub fn arbitrum_sepolia() -> Self {
        Self {
            name: "Arbitrum Sepolia".to_string(),
            chain_id: ARBITRUM_SEPOLIA_CHAIN_ID,
            rpc_url: "https://sepolia-rollup.arbitrum.io/rpc".to_string(),
            explorer_url: "https://sepolia.arbiscan.io".to_string(),
        }
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

/// Arbitrum Sepolia chain id (also the settlement venue's signature chain id).
pub const ARBITRUM_SEPOLIA_CHAIN_ID: u64 = 421_614;

/// Circle test USDC on Arbitrum Sepolia.
pub const USDC_ARBITRUM_SEPOLIA: Address =
    alloy::primitives::address!("0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d");

/// Hyperliquid testnet bridge intake on Arbitrum Sepolia.
pub const HL_TESTNET_BRIDGE: Address =
    alloy::primitives::address!("0x08cfc1B6b2dCF36A1480b99353A354AA8AC56f89");

/// Transaction receipt after confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash (0x-prefixed hex)
    pub tx_hash: String,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
}

/// Errors from the fixed-point amount codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Invalid amount format")]
    InvalidFormat,

    #[error("Too many decimal places (max {0})")]
    TooPrecise(u8),

    #[error("Amount overflow")]
    Overflow,
}

/// Parse a human-readable amount to the smallest unit.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for ETH, 6 for USDC)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    let parts: Vec<&str> = trimmed.split('.').collect();

    if parts.len() > 2 {
        return Err(AmountError::InvalidFormat);
    }

    let whole_part = parts[0];
    if whole_part.is_empty() || !whole_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(AmountError::InvalidFormat);
    }

    let whole = whole_part
        .parse::<u128>()
        .map_err(|_| AmountError::Overflow)?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.is_empty() || !dec_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::InvalidFormat);
        }
        if dec_str.len() > decimals as usize {
            return Err(AmountError::TooPrecise(decimals));
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        padded
            .parse::<u128>()
            .map_err(|_| AmountError::InvalidFormat)?
    } else {
        0u128
    };

    let multiplier = 10u128.pow(decimals as u32);
    let total = whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or(AmountError::Overflow)?;

    Ok(U256::from(total))
}

/// Parse a decimal reported by an external API, truncating digits beyond
/// `decimals` instead of rejecting them.
pub fn parse_amount_truncating(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    match trimmed.split_once('.') {
        Some((whole, fraction)) if fraction.len() > decimals as usize => {
            if !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AmountError::InvalidFormat);
            }
            parse_amount(&format!("{whole}.{}", &fraction[..decimals as usize]), decimals)
        }
        _ => parse_amount(trimmed, decimals),
    }
}

/// Format smallest units to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_usdc() {
        assert_eq!(parse_amount("5", 6).unwrap(), U256::from(5_000_000u64));
        assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_amount("0.000001", 6).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_parse_amount_native() {
        let result = parse_amount("0.001", 18).unwrap();
        assert_eq!(result, U256::from(1_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        assert_eq!(parse_amount("1.2.3", 6), Err(AmountError::InvalidFormat));
        assert_eq!(parse_amount("-1", 6), Err(AmountError::InvalidFormat));
        assert_eq!(parse_amount("", 6), Err(AmountError::InvalidFormat));
        assert_eq!(parse_amount("1.", 6), Err(AmountError::InvalidFormat));
        assert_eq!(parse_amount("1e5", 6), Err(AmountError::InvalidFormat));
        assert_eq!(parse_amount("1.0000001", 6), Err(AmountError::TooPrecise(6)));
    }

    #[test]
    fn test_parse_amount_truncating() {
        assert_eq!(
            parse_amount_truncating("4.99999999", 6).unwrap(),
            U256::from(4_999_999u64)
        );
        assert_eq!(parse_amount_truncating("5.0", 6).unwrap(), U256::from(5_000_000u64));
    }

    #[test]
    fn test_parse_amount_truncating_rejects_non_digit_fraction() {
        assert_eq!(
            parse_amount_truncating("1.12345é", 6),
            Err(AmountError::InvalidFormat)
        );
        assert_eq!(
            parse_amount_truncating("1.123456x9", 6),
            Err(AmountError::InvalidFormat)
        );
    }

    #[test]
    fn test_format_amount_usdc() {
        assert_eq!(format_amount(U256::from(5_000_000u64), 6), "5");
        assert_eq!(format_amount(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_amount(U256::ZERO, 6), "0");
    }

    #[test]
    fn tx_url_joins_explorer() {
        let network = NetworkConfig::arbitrum_sepolia();
        assert_eq!(
            network.tx_url("0xabc"),
            "https://sepolia.arbiscan.io/tx/0xabc"
        );
    }
}
