use serde::{Deserialize, Serialize};
use tracing::debug;

use ardan_common::types::AccountID;
use ardan_common::{ChainError, Result};
use ardan_crypto::hash::{hash_struct, ZERO_HASH};

use crate::merkle::Tree;
use crate::tx::BlockTx;

/// Common information required for each block. The block hash is computed
/// over the header only, so headers alone are enough to verify the chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub prev_block_hash: String,
    #[serde(rename = "timestamp")]
    pub time_stamp: u64,
    #[serde(rename = "beneficiary")]
    pub beneficiary_id: AccountID,
    pub difficulty: u16,
    pub mining_reward: u64,
    pub state_root: String,
    pub trans_root: String,
    pub nonce: u64,
}

/// A group of transactions batched together behind a header. The header's
/// `trans_root` always matches the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub merkle_tree: Tree<BlockTx>,
}

impl Block {
    /// The block every chain starts from. Never persisted; only its hash
    /// matters, and that is pinned to [`ZERO_HASH`].
    pub fn genesis() -> Self {
        let merkle_tree: Tree<BlockTx> = Tree::empty();
        Self {
            header: BlockHeader {
                number: 0,
                prev_block_hash: ZERO_HASH.to_string(),
                time_stamp: 0,
                beneficiary_id: AccountID::default(),
                difficulty: 0,
                mining_reward: 0,
                state_root: ZERO_HASH.to_string(),
                trans_root: merkle_tree.root_hex(),
                nonce: 0,
            },
            merkle_tree,
        }
    }

    /// The unique hash for this block, computed over the header only.
    pub fn hash(&self) -> Result<String> {
        if self.header.number == 0 {
            return Ok(ZERO_HASH.to_string());
        }

        hash_struct(&self.header).map_err(ChainError::Serialization)
    }

    /// Validate this block for inclusion after `previous`. The expected
    /// state root is the account hash after applying this block's
    /// transactions and reward.
    pub fn validate(&self, previous: &Block, expected_state_root: &str) -> Result<()> {
        let number = self.header.number;

        debug!(block = number, "validate: check: chain is not forked");
        let next_number = previous.header.number + 1;
        if number >= next_number + 2 {
            return Err(ChainError::ChainForked);
        }

        debug!(block = number, "validate: check: difficulty >= parent difficulty");
        if self.header.difficulty < previous.header.difficulty {
            return Err(ChainError::BlockInvalid(format!(
                "block difficulty is less than previous block difficulty, parent {}, block {}",
                previous.header.difficulty, self.header.difficulty
            )));
        }

        debug!(block = number, "validate: check: block hash has been solved");
        let hash = self.hash()?;
        if !is_hash_solved(self.header.difficulty, &hash) {
            return Err(ChainError::BlockInvalid(format!("{hash} invalid block hash")));
        }

        debug!(block = number, "validate: check: block number is the next number");
        if number != next_number {
            return Err(ChainError::BlockInvalid(format!(
                "this block is not the next number, got {number}, exp {next_number}"
            )));
        }

        debug!(block = number, "validate: check: parent hash matches parent block");
        let prev_hash = previous.hash()?;
        if self.header.prev_block_hash != prev_hash {
            return Err(ChainError::BlockInvalid(format!(
                "parent block hash doesn't match our known parent, got {}, exp {}",
                self.header.prev_block_hash, prev_hash
            )));
        }

        if previous.header.time_stamp > 0 {
            debug!(block = number, "validate: check: timestamp not before parent");
            if self.header.time_stamp < previous.header.time_stamp {
                return Err(ChainError::BlockInvalid(format!(
                    "block timestamp is before parent block, parent {}, block {}",
                    previous.header.time_stamp, self.header.time_stamp
                )));
            }
        }

        debug!(block = number, "validate: check: state root matches database");
        if self.header.state_root != expected_state_root {
            return Err(ChainError::BlockInvalid(format!(
                "state of the accounts are wrong, current {expected_state_root}, expected {}",
                self.header.state_root
            )));
        }

        debug!(block = number, "validate: check: merkle root matches transactions");
        if self.header.trans_root != self.merkle_tree.root_hex() {
            return Err(ChainError::BlockInvalid(format!(
                "merkle root does not match transactions, got {}, exp {}",
                self.merkle_tree.root_hex(),
                self.header.trans_root
            )));
        }

        Ok(())
    }
}

/// The longest prefix a difficulty can require: `0x` plus 17 zero nibbles.
/// Inherited from the original protocol definition; difficulties above 17
/// can never be satisfied.
const SOLVED_MATCH: &str = "0x00000000000000000";

/// Check a block hash complies with the proof-of-work rules: the first
/// `difficulty` hex digits after the prefix must be zero.
pub fn is_hash_solved(difficulty: u16, hash: &str) -> bool {
    if hash.len() != 66 {
        return false;
    }

    let want = difficulty as usize + 2;
    if want > SOLVED_MATCH.len() {
        return false;
    }

    hash.as_bytes()[..want] == SOLVED_MATCH.as_bytes()[..want]
}

/// The serialized form of a block: what gets written to disk and shared
/// with peers. One JSON file per block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockData {
    pub hash: String,
    #[serde(rename = "block")]
    pub header: BlockHeader,
    pub trans: Vec<BlockTx>,
}

impl BlockData {
    pub fn new(block: &Block) -> Result<Self> {
        Ok(Self {
            hash: block.hash()?,
            header: block.header.clone(),
            trans: block.merkle_tree.values().to_vec(),
        })
    }

    /// Rebuild the in-memory block, reconstructing the Merkle tree from
    /// the stored transactions.
    pub fn to_block(&self) -> Result<Block> {
        let merkle_tree = Tree::new(self.trans.clone())?;
        Ok(Block {
            header: self.header.clone(),
            merkle_tree,
        })
    }
}
