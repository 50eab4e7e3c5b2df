use alloy::primitives::{
    utils::{format_units, parse_units},
    Address, U256,
};
use anyhow::{anyhow, Result};
use std::str::FromStr;

use crate::error::BridgeError;

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(anyhow!("Address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Ethereum addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        ));
    }

    Address::from_str(address)
        .map_err(|e| anyhow!("Invalid Ethereum address: '{}'. Error: {}", address, e))
}

/// Converts a display-form ether amount to wire-form wei.
///
/// Arbitrary-precision throughout; more than 18 fractional digits or a
/// negative amount is a caller error.
pub fn to_wei(display: &str) -> Result<U256> {
    let display = display.trim();

    if display.is_empty() {
        return Err(anyhow!("Amount cannot be empty"));
    }

    if display.starts_with('-') {
        return Err(anyhow!("Amount must be non-negative: '{}'", display));
    }

    let parsed = parse_units(display, 18u8)
        .map_err(|e| anyhow!("Invalid ether amount '{}': {}", display, e))?;

    Ok(parsed.get_absolute())
}

/// Converts wire-form wei to a display-form ether string, trimming
/// insignificant trailing zeros.
pub fn from_wei(wei: U256) -> String {
    let formatted = match format_units(wei, 18u8) {
        Ok(s) => s,
        Err(_) => return wei.to_string(),
    };

    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("execution reverted") {
        "Transaction failed: the contract reverted execution. This usually means the function's requirements were not met.".to_string()
    } else if error.contains("insufficient funds") {
        "Transaction failed: insufficient funds to cover the payment and gas costs.".to_string()
    } else if error.contains("gas required exceeds allowance") || error.contains("out of gas") {
        "Transaction failed: the fixed gas ceiling was too low for this call.".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "Network error: cannot reach the wallet provider's RPC endpoint.".to_string()
    } else if error.contains("timeout") {
        "Network error: the provider request timed out.".to_string()
    } else {
        format!("RPC error: {}", error)
    }
}

/// Sorts a raw provider error into the bridge taxonomy.
///
/// A user declining a connect or signing prompt is kept distinct from
/// genuine remote failures so the UI can word the notification differently.
pub fn classify_provider_error(error: &str) -> BridgeError {
    let lower = error.to_lowercase();
    if lower.contains("user rejected") || lower.contains("user denied") || error.contains("4001") {
        BridgeError::UserRejected(error.to_string())
    } else {
        BridgeError::RemoteCallFailed(interpret_rpc_error(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_ok());
        assert!(validate_address("0x0000000000000000000000000000000000000000").is_ok());

        assert!(validate_address("").is_err());
        assert!(validate_address("not_an_address").is_err());
        assert!(validate_address("0x123").is_err()); // Too short
        assert!(validate_address("742d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err()); // Missing 0x
        assert!(validate_address("0xgg2d35Cc6435C9c1c72c5E7b18BaB7e1DB7a5d6e").is_err());
        // Invalid hex
    }

    #[test]
    fn test_to_wei() {
        assert_eq!(to_wei("1").unwrap(), U256::from(10).pow(U256::from(18)));
        assert_eq!(
            to_wei("1.5").unwrap(),
            U256::from(1_500_000_000_000_000_000u64)
        );
        assert_eq!(to_wei("0").unwrap(), U256::ZERO);
        assert_eq!(to_wei("0.000000000000000001").unwrap(), U256::from(1));

        assert!(to_wei("").is_err());
        assert!(to_wei("-1").is_err());
        assert!(to_wei("abc").is_err());
        // 19 fractional digits exceed the currency's decimal exponent
        assert!(to_wei("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_from_wei() {
        assert_eq!(from_wei(U256::ZERO), "0");
        assert_eq!(from_wei(U256::from(1_500_000_000_000_000_000u64)), "1.5");
        assert_eq!(from_wei(U256::from(10).pow(U256::from(18))), "1");
        assert_eq!(
            from_wei(U256::from(10).pow(U256::from(18)) * U256::from(250)),
            "250"
        );
        assert_eq!(from_wei(U256::from(1)), "0.000000000000000001");
    }

    #[test]
    fn wei_round_trip_is_stable() {
        for display in ["1.5", "0.25", "3", "0.000000000000000001", "1000000"] {
            let wei = to_wei(display).unwrap();
            assert_eq!(to_wei(&from_wei(wei)).unwrap(), wei, "round trip {display}");
        }
    }

    #[test]
    fn test_classify_provider_error() {
        assert!(matches!(
            classify_provider_error("User rejected the request"),
            BridgeError::UserRejected(_)
        ));
        assert!(matches!(
            classify_provider_error("error code 4001"),
            BridgeError::UserRejected(_)
        ));
        assert!(matches!(
            classify_provider_error("execution reverted: no seats"),
            BridgeError::RemoteCallFailed(_)
        ));
    }

    #[test]
    fn test_interpret_rpc_error() {
        assert!(interpret_rpc_error("execution reverted").contains("reverted"));
        assert!(interpret_rpc_error("insufficient funds for gas").contains("insufficient funds"));
        assert!(interpret_rpc_error("something else").starts_with("RPC error"));
    }
}
