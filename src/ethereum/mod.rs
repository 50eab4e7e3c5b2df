pub mod abi;
pub mod connection;
pub mod contract;
pub mod events;
pub mod provider;
pub mod utils;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Uniform result shape returned by every gateway and connection operation.
///
/// Callers never see a raw error; failures are flattened into a message
/// suitable for a transient UI notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "camelCase")]
pub enum CallResult<T> {
    Success(T),
    Failure { reason: String },
}

impl<T> CallResult<T> {
    pub fn failure(reason: impl std::fmt::Display) -> Self {
        CallResult::Failure {
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            CallResult::Success(value) => Some(value),
            CallResult::Failure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            CallResult::Success(_) => None,
            CallResult::Failure { reason } => Some(reason),
        }
    }
}

impl<T> From<BridgeError> for CallResult<T> {
    fn from(err: BridgeError) -> Self {
        CallResult::failure(err)
    }
}

/// Read-only projection of one ride slot in the carpool contract.
///
/// `price` is the display-form ether amount; `price_wei` retains the exact
/// wire-form integer so nothing is lost to formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRecord {
    pub driver: String,
    pub start_location: String,
    pub end_location: String,
    pub price: String,
    pub price_wei: String,
    pub available_seats: u64,
    pub is_available: bool,
}

/// Outcome of a mined state-changing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub transaction_hash: String,
    pub events: Vec<EventRecord>,
}

/// A receipt log decoded against the configured contract ABI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    pub args: serde_json::Value,
}

/// Submission options for a state-changing call: the sending account, an
/// optional payment attached as the transaction value, and the gas ceiling.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub from: String,
    pub value: Option<U256>,
    pub gas: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_result_accessors() {
        let ok: CallResult<u32> = CallResult::Success(7);
        assert!(ok.is_success());
        assert_eq!(ok.reason(), None);
        assert_eq!(ok.ok(), Some(7));

        let err: CallResult<u32> = CallResult::failure("boom");
        assert!(!err.is_success());
        assert_eq!(err.reason(), Some("boom"));
        assert_eq!(err.ok(), None);
    }

    #[test]
    fn call_result_serializes_tagged() {
        let ok: CallResult<String> = CallResult::Success("0xabc".to_string());
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["value"], "0xabc");

        let err: CallResult<String> = BridgeError::NotConnected.into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["value"]["reason"], "no account connected");
    }
}
