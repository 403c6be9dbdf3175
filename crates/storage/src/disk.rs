use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use ardan_common::{ChainError, Result};
use ardan_core::block::BlockData;
use ardan_core::database::Storage;

/// Reads and writes blocks as separate files on disk, one pretty-printed
/// JSON file per block named after the block number.
pub struct DiskStorage {
    db_path: PathBuf,
}

impl DiskStorage {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(&db_path)?;
        Ok(Self {
            db_path: db_path.as_ref().to_path_buf(),
        })
    }

    fn get_path(&self, block_number: u64) -> PathBuf {
        self.db_path.join(format!("{block_number}.json"))
    }
}

#[async_trait]
impl Storage for DiskStorage {
    async fn write(&self, block_data: &BlockData) -> Result<()> {
        // Human readable on disk, so people can poke at the chain.
        let data =
            serde_json::to_vec_pretty(block_data).map_err(ChainError::Serialization)?;

        let path = self.get_path(block_data.header.number);
        tokio::fs::write(&path, data).await?;

        debug!(block = block_data.header.number, path = %path.display(), "disk: block written");
        Ok(())
    }

    async fn get_block(&self, number: u64) -> Result<BlockData> {
        let data = tokio::fs::read(self.get_path(number)).await?;
        serde_json::from_slice(&data).map_err(ChainError::Serialization)
    }

    async fn close(&self) -> Result<()> {
        // Each block file is written and closed immediately; nothing is
        // held open.
        Ok(())
    }
}
