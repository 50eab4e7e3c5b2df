use alloy::json_abi::JsonAbi;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;

/// Where the contract ABI schema comes from: embedded in the configuration
/// or a JSON file on disk. The ABI is externally supplied either way; the
/// bridge never fetches or derives one.
#[derive(Debug, Clone)]
pub enum AbiSource {
    Inline(Value),
    File(PathBuf),
}

impl AbiSource {
    pub async fn resolve(&self) -> Result<JsonAbi> {
        match self {
            AbiSource::Inline(value) => serde_json::from_value(value.clone())
                .map_err(|e| anyhow!("Failed to parse inline ABI: {}", e)),
            AbiSource::File(path) => {
                let content = fs::read_to_string(path)
                    .await
                    .map_err(|e| anyhow!("Failed to read ABI file {:?}: {}", path, e))?;
                serde_json::from_str(&content)
                    .map_err(|e| anyhow!("Failed to parse ABI file {:?}: {}", path, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_abi() -> Value {
        json!([{
            "type": "function",
            "name": "completeRide",
            "stateMutability": "nonpayable",
            "inputs": [{"name": "rideId", "type": "uint256"}],
            "outputs": []
        }])
    }

    #[tokio::test]
    async fn resolves_inline_abi() {
        let abi = AbiSource::Inline(minimal_abi()).resolve().await.unwrap();
        assert_eq!(abi.functions().count(), 1);
    }

    #[tokio::test]
    async fn resolves_abi_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", minimal_abi()).unwrap();

        let source = AbiSource::File(file.path().to_path_buf());
        let abi = source.resolve().await.unwrap();
        assert!(abi.functions().any(|f| f.name == "completeRide"));
    }

    #[tokio::test]
    async fn malformed_abi_is_an_error() {
        let source = AbiSource::Inline(json!({"not": "an abi"}));
        assert!(source.resolve().await.is_err());

        let missing = AbiSource::File(PathBuf::from("/nonexistent/abi.json"));
        assert!(missing.resolve().await.is_err());
    }
}
