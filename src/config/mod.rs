use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use log::{info, warn};
use crate::bubbles::BubbleConfig;
use crate::error::Result;

pub const DEFAULT_LIFI_BASE_URL: &str = "https://li.quest/v1";
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 15;

pub const REGISTRY_CONTRACT_ADDRESS: &str = "0x45f15e62cC71b8aba7b133D7A08CC1E14D7fa218";
pub const EDUCHAIN_RPC_URL: &str = "https://open-campus-codex-sepolia.drpc.org";
pub const EDUCHAIN_TESTNET_CHAIN_ID: u64 = 656476;
pub const EDUCHAIN_EXPLORER_URL: &str = "https://devnet.explorer.educhain.io";
pub const REGISTRY_TOKEN_DECIMALS: u32 = 18;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub lifi: LiFiConfig,
    pub registry: RegistryConfig,
    pub bubbles: BubbleConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LiFiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl LiFiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LiFiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LIFI_BASE_URL.to_string(),
            timeout_secs: DEFAULT_PROXY_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RegistryConfig {
    pub contract_address: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: String,
    pub token_decimals: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            contract_address: REGISTRY_CONTRACT_ADDRESS.to_string(),
            rpc_url: EDUCHAIN_RPC_URL.to_string(),
            chain_id: EDUCHAIN_TESTNET_CHAIN_ID,
            explorer_url: EDUCHAIN_EXPLORER_URL.to_string(),
            token_decimals: REGISTRY_TOKEN_DECIMALS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON key-value file holding the pending registration queue
    pub pending_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pending_path: PathBuf::from("data/local_storage.json"),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            Self::load(path)
        } else {
            warn!("Configuration file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, config_str)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [lifi]
            timeout_secs = 5
            "#,
        ).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.lifi.timeout(), Duration::from_secs(5));
        assert_eq!(config.lifi.base_url, DEFAULT_LIFI_BASE_URL);
        assert_eq!(config.registry.chain_id, EDUCHAIN_TESTNET_CHAIN_ID);
        assert_eq!(config.bubbles.iterations, 100);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.registry.explorer_url = "https://explorer.example".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.registry.explorer_url, "https://explorer.example");
        assert_eq!(loaded.lifi.timeout_secs, DEFAULT_PROXY_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.registry.contract_address, REGISTRY_CONTRACT_ADDRESS);
    }
}
