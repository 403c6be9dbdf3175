use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ardan_common::{ChainError, Result};

/// Node configuration, loaded from a TOML file. Every field has a default
/// so a bare config file is enough to get a node running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Name of the account credited with fees, tips and mining rewards.
    /// The matching `<name>.ecdsa` key file must exist under `accounts_dir`.
    #[serde(default = "default_beneficiary")]
    pub beneficiary: String,

    /// Directory holding the per-block JSON files.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding the account key files.
    #[serde(default = "default_accounts_dir")]
    pub accounts_dir: PathBuf,

    /// Path to the genesis file.
    #[serde(default = "default_genesis_path")]
    pub genesis_path: PathBuf,
}

fn default_beneficiary() -> String {
    "miner".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("zblock/miner")
}

fn default_accounts_dir() -> PathBuf {
    PathBuf::from("zblock/accounts")
}

fn default_genesis_path() -> PathBuf {
    PathBuf::from("zblock/genesis.json")
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            beneficiary: default_beneficiary(),
            db_path: default_db_path(),
            accounts_dir: default_accounts_dir(),
            genesis_path: default_genesis_path(),
        }
    }
}

impl NodeConfig {
    /// Load the configuration file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|err| ChainError::Config(err.to_string()))
    }

    /// The key file for the configured beneficiary.
    pub fn beneficiary_key_path(&self) -> PathBuf {
        self.accounts_dir.join(format!("{}.ecdsa", self.beneficiary))
    }
}
