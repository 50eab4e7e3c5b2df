use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use alloy::{
    dyn_abi::{DynSolValue, EventExt, FunctionExt, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    primitives::{Address, B256, U256},
};
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::connection::ProviderConnection;
use super::provider::InjectedProvider;
use super::{utils, CallResult, EventRecord, RideRecord, SendOptions, WriteReceipt};
use crate::config::{BridgeConfig, ContractConfig};
use crate::error::BridgeError;

/// A deployed contract address paired with its ABI schema. Method-call
/// objects derived from it support a passive `.call()` and a state-changing
/// `.send()`.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    address: Address,
    abi: JsonAbi,
}

impl ContractBinding {
    pub fn new(address: &str, abi: JsonAbi) -> Result<Self> {
        let address = utils::validate_address(address)
            .map_err(|e| anyhow!("Invalid contract address: {}", e))?;
        Ok(Self { address, abi })
    }

    /// Builds the binding from configuration when both required values are
    /// present; `None` when either is missing.
    pub async fn from_config(config: &ContractConfig) -> Result<Option<Self>> {
        let Some(address) = &config.address else {
            return Ok(None);
        };
        let Some(source) = config.abi_source() else {
            return Ok(None);
        };

        let abi = source.resolve().await?;
        Ok(Some(Self::new(address, abi)?))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn method(&self, name: &str) -> Result<MethodCall<'_>> {
        let function = self
            .abi
            .functions()
            .find(|f| f.name == name)
            .ok_or_else(|| {
                let available: Vec<String> =
                    self.abi.functions().map(|f| f.name.clone()).collect();
                if available.is_empty() {
                    anyhow!("Function '{}' not found. The contract ABI contains no functions.", name)
                } else {
                    anyhow!(
                        "Function '{}' not found in contract ABI. Available functions: {}",
                        name,
                        available.join(", ")
                    )
                }
            })?;

        Ok(MethodCall {
            address: self.address,
            abi: &self.abi,
            function,
        })
    }
}

/// One callable contract method, bound to the contract address.
#[derive(Debug)]
pub struct MethodCall<'a> {
    address: Address,
    abi: &'a JsonAbi,
    function: &'a Function,
}

impl MethodCall<'_> {
    pub fn function(&self) -> &Function {
        self.function
    }

    fn encode_input(&self, args: &[DynSolValue]) -> Result<Vec<u8>> {
        self.function
            .abi_encode_input(args)
            .map_err(|e| anyhow!("Failed to encode '{}' inputs: {}", self.function.name, e))
    }

    /// Passive read. No state change, no fee, no account required.
    pub async fn call(
        &self,
        provider: &dyn InjectedProvider,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let data = self.encode_input(args)?;
        let params = json!([
            {
                "to": format!("{:?}", self.address),
                "data": format!("0x{}", hex::encode(&data)),
            },
            "latest"
        ]);

        let result = provider.request("eth_call", params).await?;
        let hex_output = result
            .as_str()
            .ok_or_else(|| anyhow!("Provider returned a non-string call result"))?;
        let bytes = hex::decode(hex_output.trim_start_matches("0x"))
            .map_err(|e| anyhow!("Invalid call result encoding: {}", e))?;

        self.function
            .abi_decode_output(&bytes, false)
            .map_err(|e| anyhow!("Failed to decode '{}' output: {}", self.function.name, e))
    }

    /// State-changing write, signed by the provider on behalf of
    /// `opts.from`. A mined-but-reverted transaction is an error; a receipt
    /// that is not yet available yields an empty event list (single
    /// attempt, no polling).
    pub async fn send(
        &self,
        provider: &dyn InjectedProvider,
        args: &[DynSolValue],
        opts: &SendOptions,
    ) -> Result<WriteReceipt> {
        let data = self.encode_input(args)?;

        let mut tx = json!({
            "from": opts.from,
            "to": format!("{:?}", self.address),
            "data": format!("0x{}", hex::encode(&data)),
            "gas": format!("{:#x}", opts.gas),
        });
        if let Some(value) = opts.value {
            tx["value"] = json!(format!("{:#x}", value));
        }

        info!(function = %self.function.name, to = ?self.address, "submitting transaction");
        let hash = provider.request("eth_sendTransaction", json!([tx])).await?;
        let hash = hash
            .as_str()
            .ok_or_else(|| anyhow!("Provider returned a non-string transaction hash"))?
            .to_string();

        let receipt = provider
            .request("eth_getTransactionReceipt", json!([hash.clone()]))
            .await
            .unwrap_or(Value::Null);

        if receipt.get("status").and_then(Value::as_str) == Some("0x0") {
            return Err(anyhow!("execution reverted: transaction {} failed", hash));
        }

        let events = match receipt.get("logs").and_then(Value::as_array) {
            Some(logs) => decode_logs(self.abi, logs),
            None => {
                debug!(%hash, "no receipt available yet, returning without events");
                Vec::new()
            }
        };

        Ok(WriteReceipt {
            transaction_hash: hash,
            events,
        })
    }
}

fn decode_logs(abi: &JsonAbi, logs: &[Value]) -> Vec<EventRecord> {
    logs.iter().filter_map(|log| decode_log(abi, log)).collect()
}

/// Decodes one receipt log against the ABI's events, matching by selector.
/// Logs from other contracts or unknown events are skipped.
fn decode_log(abi: &JsonAbi, log: &Value) -> Option<EventRecord> {
    let topics: Vec<B256> = log
        .get("topics")?
        .as_array()?
        .iter()
        .filter_map(|t| B256::from_str(t.as_str()?).ok())
        .collect();
    let topic0 = *topics.first()?;
    let data = hex::decode(log.get("data")?.as_str()?.trim_start_matches("0x")).ok()?;

    let event = abi.events().find(|e| e.selector() == topic0)?;
    let decoded = event
        .decode_log_parts(topics.iter().copied(), &data, false)
        .ok()?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut args = serde_json::Map::new();
    for input in &event.inputs {
        let value = if input.indexed {
            indexed.next()?
        } else {
            body.next()?
        };
        args.insert(input.name.clone(), dyn_value_to_json(&value));
    }

    Some(EventRecord {
        name: event.name.clone(),
        args: Value::Object(args),
    })
}

/// Convert a decoded Solidity value to JSON
fn dyn_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(format!("0x{:x}", addr)),
        DynSolValue::Uint(num, _) => Value::String(num.to_string()),
        DynSolValue::Int(num, _) => Value::String(num.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(bytes, _) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::Array(values) | DynSolValue::Tuple(values) => {
            Value::Array(values.iter().map(dyn_value_to_json).collect())
        }
        _ => Value::Null,
    }
}

fn decode_ride(ride_id: u64, function: &Function, values: Vec<DynSolValue>) -> Result<RideRecord> {
    let mut fields: HashMap<String, DynSolValue> = function
        .outputs
        .iter()
        .map(|param| param.name.clone())
        .zip(values)
        .collect();

    let driver = match fields.remove("driver") {
        Some(DynSolValue::Address(addr)) => addr,
        _ => return Err(anyhow!("Ride record is missing the 'driver' field")),
    };
    // A zeroed driver means the slot was never written.
    if driver == Address::ZERO {
        return Err(anyhow!("Ride {} not found", ride_id));
    }

    let start_location = take_string(&mut fields, "startLocation")?;
    let end_location = take_string(&mut fields, "endLocation")?;
    let price = take_uint(&mut fields, "price")?;
    let seats = take_uint(&mut fields, "availableSeats")?;
    let available_seats = u64::try_from(seats)
        .map_err(|_| anyhow!("Ride record 'availableSeats' is out of range"))?;
    let is_available = match fields.remove("isAvailable") {
        Some(DynSolValue::Bool(b)) => b,
        _ => return Err(anyhow!("Ride record is missing the 'isAvailable' field")),
    };

    Ok(RideRecord {
        driver: format!("{:?}", driver),
        start_location,
        end_location,
        price: utils::from_wei(price),
        price_wei: price.to_string(),
        available_seats,
        is_available,
    })
}

fn take_string(fields: &mut HashMap<String, DynSolValue>, name: &str) -> Result<String> {
    match fields.remove(name) {
        Some(DynSolValue::String(s)) => Ok(s),
        _ => Err(anyhow!("Ride record is missing the '{}' field", name)),
    }
}

fn take_uint(fields: &mut HashMap<String, DynSolValue>, name: &str) -> Result<U256> {
    match fields.remove(name) {
        Some(DynSolValue::Uint(num, _)) => Ok(num),
        _ => Err(anyhow!("Ride record is missing the '{}' field", name)),
    }
}

/// Translates UI intents into carpool contract calls.
///
/// Write operations require a connected account and the contract binding;
/// the passive ride lookup needs only the binding. Every operation returns
/// a [`CallResult`], never a raw error.
pub struct ContractGateway {
    connection: Arc<ProviderConnection>,
    write_gas_limit: u64,
}

impl ContractGateway {
    pub fn new(connection: Arc<ProviderConnection>, config: &BridgeConfig) -> Self {
        Self {
            connection,
            write_gas_limit: config.gas.write_gas_limit,
        }
    }

    async fn read_context(
        &self,
    ) -> Result<(ContractBinding, Arc<dyn InjectedProvider>), BridgeError> {
        let binding = self
            .connection
            .binding()
            .await
            .ok_or(BridgeError::ConfigurationMissing)?;
        let provider = self
            .connection
            .provider()
            .ok_or(BridgeError::ConfigurationMissing)?;
        Ok((binding, provider))
    }

    async fn write_context(
        &self,
    ) -> Result<(ContractBinding, Arc<dyn InjectedProvider>, String), BridgeError> {
        let (binding, provider) = self.read_context().await?;
        let account = self
            .connection
            .get_account()
            .await
            .ok_or(BridgeError::NotConnected)?;
        Ok((binding, provider, account))
    }

    async fn submit(
        &self,
        binding: &ContractBinding,
        provider: &dyn InjectedProvider,
        name: &str,
        args: &[DynSolValue],
        opts: SendOptions,
    ) -> CallResult<WriteReceipt> {
        let call = match binding.method(name) {
            Ok(call) => call,
            Err(e) => return CallResult::failure(e),
        };

        match call.send(provider, args, &opts).await {
            Ok(receipt) => {
                info!(function = name, hash = %receipt.transaction_hash, "transaction mined");
                CallResult::Success(receipt)
            }
            Err(e) => CallResult::failure(utils::classify_provider_error(&format!("{e:#}"))),
        }
    }

    /// Publishes a new ride offer. The display-form price is converted to
    /// wei and passed as a call argument.
    pub async fn create_ride(
        &self,
        start_location: &str,
        end_location: &str,
        price: &str,
        available_seats: u64,
    ) -> CallResult<WriteReceipt> {
        let (binding, provider, account) = match self.write_context().await {
            Ok(ctx) => ctx,
            Err(e) => return e.into(),
        };
        let price_wei = match utils::to_wei(price) {
            Ok(wei) => wei,
            Err(e) => return CallResult::failure(e),
        };

        let args = [
            DynSolValue::String(start_location.to_owned()),
            DynSolValue::String(end_location.to_owned()),
            DynSolValue::Uint(price_wei, 256),
            DynSolValue::Uint(U256::from(available_seats), 256),
        ];
        let opts = SendOptions {
            from: account,
            value: None,
            gas: self.write_gas_limit,
        };
        self.submit(&binding, provider.as_ref(), "createRide", &args, opts)
            .await
    }

    /// Books a seat on a ride. The wei-converted price is attached as the
    /// transaction value (the payment), not as a call argument.
    pub async fn book_ride(&self, ride_id: u64, price: &str) -> CallResult<WriteReceipt> {
        let (binding, provider, account) = match self.write_context().await {
            Ok(ctx) => ctx,
            Err(e) => return e.into(),
        };
        let price_wei = match utils::to_wei(price) {
            Ok(wei) => wei,
            Err(e) => return CallResult::failure(e),
        };

        let args = [DynSolValue::Uint(U256::from(ride_id), 256)];
        let opts = SendOptions {
            from: account,
            value: Some(price_wei),
            gas: self.write_gas_limit,
        };
        self.submit(&binding, provider.as_ref(), "bookRide", &args, opts)
            .await
    }

    /// Marks a ride completed, releasing the escrowed payment. The contract
    /// enforces that only the ride's driver may do this; no local pre-check.
    pub async fn complete_ride(&self, ride_id: u64) -> CallResult<WriteReceipt> {
        let (binding, provider, account) = match self.write_context().await {
            Ok(ctx) => ctx,
            Err(e) => return e.into(),
        };

        let args = [DynSolValue::Uint(U256::from(ride_id), 256)];
        let opts = SendOptions {
            from: account,
            value: None,
            gas: self.write_gas_limit,
        };
        self.submit(&binding, provider.as_ref(), "completeRide", &args, opts)
            .await
    }

    /// Reads one ride slot from the contract. Never returns a partially
    /// populated record: an unwritten slot is a failure.
    pub async fn get_ride(&self, ride_id: u64) -> CallResult<RideRecord> {
        let (binding, provider) = match self.read_context().await {
            Ok(ctx) => ctx,
            Err(e) => return e.into(),
        };
        let call = match binding.method("rides") {
            Ok(call) => call,
            Err(e) => return CallResult::failure(e),
        };

        let args = [DynSolValue::Uint(U256::from(ride_id), 256)];
        match call.call(provider.as_ref(), &args).await {
            Ok(values) => match decode_ride(ride_id, call.function(), values) {
                Ok(record) => CallResult::Success(record),
                Err(e) => CallResult::failure(e),
            },
            Err(e) => CallResult::failure(utils::classify_provider_error(&format!("{e:#}"))),
        }
    }
}
