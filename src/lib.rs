//! Wallet-provider connection tracking and contract-call coordination for
//! the carpool dApp.
//!
//! Two components, one depending on the other: [`ProviderConnection`]
//! discovers the injected wallet provider, tracks the active account, and
//! normalizes provider signals into domain events; [`ContractGateway`]
//! translates ride intents (create, book, complete, lookup) into contract
//! calls, enforcing the connected-account precondition and converting
//! between ether and wei at the boundary.
//!
//! Construct one connection and one gateway per application session and
//! pass references to consumers; there is no global instance.

pub mod config;
pub mod error;
pub mod ethereum;

pub use config::{BridgeConfig, ContractConfig, GasConfig};
pub use error::BridgeError;
pub use ethereum::connection::{ConnectionState, ProviderConnection};
pub use ethereum::contract::{ContractBinding, ContractGateway};
pub use ethereum::events::{DomainEvent, EventBus};
pub use ethereum::provider::{
    HttpWalletProvider, InjectedProvider, ProviderAvailability, ProviderHost, ProviderSignal,
};
pub use ethereum::{CallResult, EventRecord, RideRecord, SendOptions, WriteReceipt};
