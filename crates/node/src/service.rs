use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use ardan_core::state::{State, StateConfig};
use ardan_crypto::KeyPair;
use ardan_storage::DiskStorage;

use crate::config::NodeConfig;
use crate::worker::MiningWorker;

/// The assembled node: chain state plus the mining worker, wired from a
/// [`NodeConfig`].
pub struct Node {
    state: Arc<State>,
    worker: Arc<MiningWorker>,
}

impl Node {
    pub async fn new(config: NodeConfig) -> Result<Self> {
        // The beneficiary key decides which account collects fees, tips
        // and rewards on this node.
        let key_path = config.beneficiary_key_path();
        let keypair = KeyPair::from_file(&key_path)
            .with_context(|| format!("unable to load private key {}", key_path.display()))?;
        let beneficiary_id = keypair.account_id();
        info!(beneficiary = %beneficiary_id, "node: beneficiary loaded");

        let genesis = ardan_common::Genesis::load(&config.genesis_path)
            .with_context(|| format!("unable to load genesis {}", config.genesis_path.display()))?;

        let storage = Arc::new(DiskStorage::new(&config.db_path)?);

        let state = State::new(StateConfig {
            beneficiary_id,
            genesis,
            storage,
        })?;

        // Rebuild the account database from any blocks already on disk.
        let height = state.reload_chain().await?;
        info!(height, "node: chain loaded");

        let worker = MiningWorker::start(&state);

        Ok(Self { state, worker })
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    /// Run until interrupted, then shut down cleanly.
    pub async fn run(&self) -> Result<()> {
        info!("node: started");

        // Kick the miner in case the mempool already has work.
        use ardan_core::state::Worker as _;
        self.worker.signal_start_mining();

        signal::ctrl_c().await?;
        info!("node: shutdown signal received");

        self.state.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_node_boots_from_config() {
        let dir = tempfile::tempdir().unwrap();

        // Lay down the key, genesis and config the node expects.
        let accounts_dir = dir.path().join("accounts");
        let keypair = KeyPair::random();
        keypair
            .write_to_file(accounts_dir.join("miner.ecdsa"))
            .unwrap();

        let genesis_path = dir.path().join("genesis.json");
        let mut genesis_file = std::fs::File::create(&genesis_path).unwrap();
        genesis_file
            .write_all(
                br#"{
                    "chain_id": 1,
                    "difficulty": 1,
                    "mining_reward": 700,
                    "trans_per_block": 10,
                    "balances": {}
                }"#,
            )
            .unwrap();

        let config = NodeConfig {
            beneficiary: "miner".to_string(),
            db_path: dir.path().join("blocks"),
            accounts_dir,
            genesis_path,
        };

        let node = Node::new(config).await.unwrap();
        assert_eq!(node.state().latest_block().await.header.number, 0);
        assert_eq!(node.state().beneficiary_id(), keypair.account_id());
    }

    #[tokio::test]
    async fn test_node_fails_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            beneficiary: "missing".to_string(),
            db_path: dir.path().join("blocks"),
            accounts_dir: dir.path().join("accounts"),
            genesis_path: dir.path().join("genesis.json"),
        };

        assert!(Node::new(config).await.is_err());
    }
}
