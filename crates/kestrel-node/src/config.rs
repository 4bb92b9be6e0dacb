use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use kestrel_chain::ProcessorConfig;
use kestrel_core::{Account, Address, KeyPair, PublicKey};
use serde::{Deserialize, Serialize};

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node data directory
    pub data_dir: PathBuf,

    /// Slot clock and exception settings
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Accounts written into an empty ledger
    #[serde(default)]
    pub genesis: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub pubkey: String,
    pub balance: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            data_dir: PathBuf::from("./kestrel-data"),
            processor: ProcessorConfig::default(),
            genesis: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.bin")
    }

    /// Genesis entries as ledger accounts
    pub fn genesis_accounts(&self) -> Result<Vec<Account>> {
        self.genesis
            .iter()
            .map(|entry| {
                let public_key = PublicKey::from_hex(&entry.pubkey).map_err(|e| anyhow!(e))?;
                let mut account =
                    Account::with_balance(Address::from_public_key(&public_key), entry.balance);
                account.public_key = Some(public_key);
                Ok(account)
            })
            .collect()
    }
}

/// Sample configuration with one funded account, returned with its keys
pub fn generate_sample_config() -> (NodeConfig, KeyPair) {
    let user = KeyPair::generate();

    let config = NodeConfig {
        genesis: vec![BalanceEntry {
            pubkey: user.public.to_hex(),
            balance: 100_000_000_000,
        }],
        ..Default::default()
    };
    (config, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.genesis.is_empty());
        assert_eq!(config.ledger_path(), PathBuf::from("./kestrel-data/ledger.bin"));
    }

    #[test]
    fn test_sample_config_genesis() {
        let (config, user) = generate_sample_config();
        let accounts = config.genesis_accounts().unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, Address::from_public_key(&user.public));
        assert_eq!(accounts[0].public_key, Some(user.public));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let (config, _) = generate_sample_config();

        config.save(&path).unwrap();
        let loaded = NodeConfig::load(&path).unwrap();

        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.processor, config.processor);
        assert_eq!(loaded.genesis[0].pubkey, config.genesis[0].pubkey);
    }

    #[test]
    fn test_invalid_genesis_key() {
        let config = NodeConfig {
            genesis: vec![BalanceEntry {
                pubkey: "zz".to_string(),
                balance: 1,
            }],
            ..Default::default()
        };
        assert!(config.genesis_accounts().is_err());
    }
}
