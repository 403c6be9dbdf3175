use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use ardan_common::{ChainError, Result};
use ardan_core::block::BlockData;
use ardan_core::database::Storage;

/// An in-memory block store. Serves the tests everything the disk store
/// serves the node.
#[derive(Default)]
pub struct MemoryStorage {
    blocks: RwLock<HashMap<u64, BlockData>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.blocks.read().await.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn write(&self, block_data: &BlockData) -> Result<()> {
        self.blocks
            .write()
            .await
            .insert(block_data.header.number, block_data.clone());
        Ok(())
    }

    async fn get_block(&self, number: u64) -> Result<BlockData> {
        self.blocks.read().await.get(&number).cloned().ok_or_else(|| {
            ChainError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("block {number} not found"),
            ))
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
