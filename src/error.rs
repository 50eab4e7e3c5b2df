use thiserror::Error;

/// Failure categories surfaced by the connection and gateway layers.
///
/// Every operation flattens these into a `CallResult::Failure` at the
/// boundary; nothing here escapes as a panic or an unhandled error.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("wallet provider not initialized")]
    ProviderUnavailable,

    #[error("no account connected")]
    NotConnected,

    #[error("request rejected by user: {0}")]
    UserRejected(String),

    #[error("{0}")]
    RemoteCallFailed(String),

    #[error("contract or provider not initialized")]
    ConfigurationMissing,
}
