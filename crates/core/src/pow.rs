use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ardan_common::types::AccountID;
use ardan_common::{ChainError, Result};

use crate::block::{is_hash_solved, Block, BlockHeader};
use crate::merkle::Tree;
use crate::tx::BlockTx;

/// How many nonce attempts run between scheduler yields.
const YIELD_INTERVAL: u64 = 4096;

/// Everything the proof-of-work search needs to assemble and solve the
/// next block.
pub struct PowArgs {
    pub beneficiary_id: AccountID,
    pub difficulty: u16,
    pub mining_reward: u64,
    pub prev_block: Block,
    pub state_root: String,
    pub trans: Vec<BlockTx>,
    pub cancel: CancellationToken,
}

/// Search for a nonce that makes the header hash satisfy the difficulty.
/// Cancellation is polled on every attempt; a cancelled search returns
/// with the mempool and database untouched.
pub async fn pow(args: PowArgs) -> Result<Block> {
    let merkle_tree = Tree::new(args.trans)?;

    let header = BlockHeader {
        number: args.prev_block.header.number + 1,
        prev_block_hash: args.prev_block.hash()?,
        time_stamp: chrono::Utc::now().timestamp() as u64,
        beneficiary_id: args.beneficiary_id,
        difficulty: args.difficulty,
        mining_reward: args.mining_reward,
        state_root: args.state_root,
        trans_root: merkle_tree.root_hex(),
        nonce: 0,
    };
    let mut block = Block {
        header,
        merkle_tree,
    };

    info!(
        block = block.header.number,
        difficulty = block.header.difficulty,
        "pow: started"
    );

    let mut attempts: u64 = 0;
    loop {
        if args.cancel.is_cancelled() {
            info!(block = block.header.number, "pow: cancelled");
            return Err(ChainError::Cancelled);
        }

        if attempts > 0 && attempts % YIELD_INTERVAL == 0 {
            tokio::task::yield_now().await;
        }

        let hash = block.hash()?;
        if is_hash_solved(block.header.difficulty, &hash) {
            info!(block = block.header.number, attempts, hash = %hash, "pow: solved");
            return Ok(block);
        }

        match block.header.nonce.checked_add(1) {
            Some(nonce) => block.header.nonce = nonce,
            None => {
                // The whole nonce space came up empty for this timestamp.
                debug!(
                    block = block.header.number,
                    "pow: nonce space exhausted, refreshing timestamp"
                );
                block.header.time_stamp = chrono::Utc::now().timestamp() as u64;
                block.header.nonce = 0;
            }
        }
        attempts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardan_crypto::hash::ZERO_HASH;
    use ardan_crypto::KeyPair;

    use crate::tx::Tx;

    fn block_tx(key: &KeyPair, nonce: u64) -> BlockTx {
        let tx = Tx {
            chain_id: 1,
            nonce,
            from: key.account_id(),
            to: "0xF01813E4B85e178A83e29B8E7bF26BD830a25f32".parse().unwrap(),
            value: 100,
            tip: 50,
            data: Vec::new(),
        };
        BlockTx::new(tx.sign(key).unwrap(), 1, 15)
    }

    fn args(difficulty: u16, cancel: CancellationToken) -> PowArgs {
        let key = KeyPair::random();
        PowArgs {
            beneficiary_id: KeyPair::random().account_id(),
            difficulty,
            mining_reward: 700,
            prev_block: Block::genesis(),
            state_root: ZERO_HASH.to_string(),
            trans: vec![block_tx(&key, 1)],
            cancel,
        }
    }

    #[tokio::test]
    async fn test_pow_solves_at_low_difficulty() {
        let block = pow(args(1, CancellationToken::new())).await.unwrap();

        let hash = block.hash().unwrap();
        assert!(is_hash_solved(1, &hash));
        assert!(hash.starts_with("0x0"));
        assert_eq!(block.header.number, 1);
        assert_eq!(block.header.prev_block_hash, ZERO_HASH);
        assert_eq!(block.header.trans_root, block.merkle_tree.root_hex());
    }

    #[tokio::test]
    async fn test_pow_cancellation() {
        // A pre-cancelled token stops the search immediately, even at a
        // difficulty that would take ages to solve.
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pow(args(16, cancel)).await;
        assert!(matches!(result, Err(ChainError::Cancelled)));
    }

    #[tokio::test]
    async fn test_pow_cancellation_mid_search() {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pow(args(16, cancel.clone())));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ChainError::Cancelled)));
    }
}
