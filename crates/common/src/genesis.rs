use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ChainError, Result};

/// Genesis describes the origin of the chain: the consensus parameters and
/// the balances granted to the founding accounts. Loaded once at startup
/// and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genesis {
    pub chain_id: u16,
    pub difficulty: u16,
    pub mining_reward: u64,
    pub trans_per_block: usize,
    pub balances: HashMap<String, u64>,
}

impl Genesis {
    /// Load the genesis file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        let genesis: Genesis = serde_json::from_slice(&data).map_err(ChainError::Serialization)?;
        Ok(genesis)
    }
}
