use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::ethereum::abi::AbiSource;

/// Bridge configuration: the deployed carpool contract and the gas policy
/// for state-changing calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub contract: ContractConfig,
    pub gas: GasConfig,
}

/// The two externally supplied values the contract binding needs. Either
/// missing means the binding is skipped (account queries still work).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    pub address: Option<String>,
    /// ABI schema embedded directly in the configuration.
    pub abi: Option<serde_json::Value>,
    /// Path to a JSON ABI file, used when no inline schema is given.
    pub abi_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Fixed upper bound applied to every write call. No estimation, no
    /// retry on out-of-gas.
    pub write_gas_limit: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            write_gas_limit: 3_000_000,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: BridgeConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}

impl ContractConfig {
    pub fn abi_source(&self) -> Option<AbiSource> {
        if let Some(inline) = &self.abi {
            Some(AbiSource::Inline(inline.clone()))
        } else {
            self.abi_path.clone().map(AbiSource::File)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.address.is_some() && self.abi_source().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_carry_the_gas_ceiling() {
        let config = BridgeConfig::default();
        assert_eq!(config.gas.write_gas_limit, 3_000_000);
        assert!(!config.contract.is_complete());
        assert!(config.contract.abi_source().is_none());
    }

    #[tokio::test]
    async fn loads_config_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[contract]
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
abi_path = "carpool_abi.json"

[gas]
write_gas_limit = 4000000
"#
        )
        .unwrap();

        let config = BridgeConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(
            config.contract.address.as_deref(),
            Some("0x5FbDB2315678afecb367f032d93F642f64180aa3")
        );
        assert!(config.contract.is_complete());
        assert_eq!(config.gas.write_gas_limit, 4_000_000);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let config = BridgeConfig::load_or_default(Some("/nonexistent/bridge.toml")).await;
        assert_eq!(config.gas.write_gas_limit, 3_000_000);
        assert!(config.contract.address.is_none());
    }

    #[test]
    fn inline_abi_takes_precedence_over_path() {
        let config = ContractConfig {
            address: Some("0x0000000000000000000000000000000000000001".into()),
            abi: Some(serde_json::json!([])),
            abi_path: Some(PathBuf::from("ignored.json")),
        };
        assert!(matches!(config.abi_source(), Some(AbiSource::Inline(_))));
    }
}
