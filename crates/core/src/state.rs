//! The core API for the blockchain: the façade that owns the account
//! database and the mempool and implements the business rules for
//! submitting, mining and committing blocks.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ardan_common::types::{Account, AccountID};
use ardan_common::{ChainError, Genesis, Result};

use crate::block::{Block, BlockData};
use crate::database::{Database, Storage};
use crate::mempool::Mempool;
use crate::pow::{pow, PowArgs};
use crate::tx::BlockTx;

/// The behavior required from the package providing mining, peer updates
/// and transaction sharing. The worker observes the state through a weak
/// reference; it never extends the state's lifetime.
pub trait Worker: Send + Sync {
    fn shutdown(&self);
    fn signal_start_mining(&self);
    fn signal_cancel_mining(&self);
}

/// Configuration required to start the chain state.
pub struct StateConfig {
    pub beneficiary_id: AccountID,
    pub genesis: Genesis,
    pub storage: Arc<dyn Storage>,
}

/// State manages the blockchain database, the mempool, and the composite
/// invariants that span them. The `allow_mining` lock doubles as the
/// commit section: a block commit and a resync can never interleave.
pub struct State {
    beneficiary_id: AccountID,
    genesis: Genesis,
    mempool: Mempool,
    db: Database,
    allow_mining: RwLock<bool>,
    worker: OnceLock<Arc<dyn Worker>>,
}

impl State {
    /// Construct the chain state, seeding the database from genesis.
    pub fn new(cfg: StateConfig) -> Result<Arc<Self>> {
        let db = Database::new(cfg.genesis.clone(), cfg.storage)?;

        Ok(Arc::new(Self {
            beneficiary_id: cfg.beneficiary_id,
            genesis: cfg.genesis,
            mempool: Mempool::new(),
            db,
            allow_mining: RwLock::new(true),
            worker: OnceLock::new(),
        }))
    }

    /// Install the worker. Called once by the node layer after both sides
    /// exist; the worker keeps only a weak reference back.
    pub fn set_worker(&self, worker: Arc<dyn Worker>) {
        let _ = self.worker.set(worker);
    }

    pub fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    pub fn beneficiary_id(&self) -> AccountID {
        self.beneficiary_id
    }

    pub async fn is_mining_allowed(&self) -> bool {
        *self.allow_mining.read().await
    }

    /// Turn mining off while a resync runs, and back on afterwards.
    pub async fn set_allow_mining(&self, allow: bool) {
        *self.allow_mining.write().await = allow;
    }

    /// Cleanly bring the state down.
    pub async fn shutdown(&self) -> Result<()> {
        info!("state: shutdown: started");
        if let Some(worker) = self.worker.get() {
            worker.shutdown();
        }
        let result = self.db.close().await;
        info!("state: shutdown: completed");
        result
    }

    /// Accept a signed transaction into the mempool and nudge the worker
    /// to start mining.
    pub async fn submit_wallet_transaction(&self, tx: BlockTx) -> Result<()> {
        debug!(from = %tx.from(), nonce = tx.nonce(), "state: submit transaction");

        tx.signed_tx.validate(self.genesis.chain_id)?;
        self.mempool.upsert(tx)?;

        if let Some(worker) = self.worker.get() {
            worker.signal_start_mining();
        }

        Ok(())
    }

    /// Attempt to mine the next block from the best pending transactions.
    /// Cancellation before the block commits leaves all state unchanged.
    pub async fn mine_new_block(&self, cancel: CancellationToken) -> Result<Block> {
        if self.mempool.count() == 0 {
            return Err(ChainError::NoTransactions);
        }

        let trans = self.mempool.pick_best(self.genesis.trans_per_block);
        info!(trans = trans.len(), "state: mining: picked best transactions");

        // The block hash covers the state root, so the root the chain
        // will have after this block applies must be in the header before
        // the nonce search starts. It is forecast on a copy of the
        // accounts and never changed afterwards.
        let state_root = self
            .db
            .forecast_state_root(self.beneficiary_id, self.genesis.mining_reward, &trans)
            .await?;

        let block = pow(PowArgs {
            beneficiary_id: self.beneficiary_id,
            difficulty: self.genesis.difficulty,
            mining_reward: self.genesis.mining_reward,
            prev_block: self.db.latest_block().await,
            state_root,
            trans,
            cancel: cancel.clone(),
        })
        .await?;

        if cancel.is_cancelled() {
            return Err(ChainError::Cancelled);
        }

        info!("state: mining: validate and update database");
        let block = self.validate_update_database(block, true).await?;

        Ok(block)
    }

    /// Validate and commit a block proposed by a peer. Runs the same path
    /// as locally mined blocks, minus the proof-of-work search. A
    /// [`ChainError::ChainForked`] result means our chain is behind and a
    /// resync is required.
    pub async fn process_proposed_block(&self, block_data: BlockData) -> Result<Block> {
        info!(block = block_data.header.number, "state: processing proposed block");

        let block = block_data.to_block()?;
        self.validate_update_database(block, true).await
    }

    /// Replay blocks from storage at startup, rebuilding the account
    /// database. Returns the height reached.
    pub async fn reload_chain(&self) -> Result<u64> {
        let mut number = self.db.latest_block().await.header.number;

        loop {
            let block_data = match self.db.get_block(number + 1).await {
                Ok(block_data) => block_data,
                Err(_) => break,
            };

            let block = block_data.to_block()?;
            self.validate_update_database(block, false).await?;
            number += 1;
        }

        if number > 0 {
            info!(height = number, "state: reloaded chain from storage");
        }
        Ok(number)
    }

    /// Apply a block to the database and commit it if it validates. The
    /// account set rolls back to its snapshot on any validation failure,
    /// so a rejected block leaves no trace.
    async fn validate_update_database(&self, block: Block, persist: bool) -> Result<Block> {
        // One commit at a time; also excludes a concurrent resync.
        let _commit = self.allow_mining.write().await;

        let latest = self.db.latest_block().await;
        let snapshot = self.db.copy_accounts().await;

        // Transaction failures abort that transaction, not the block. The
        // gas fee those transactions already paid stays applied.
        for tx in block.merkle_tree.values() {
            if let Err(err) = self.db.apply_transaction(&block, tx).await {
                warn!(nonce = tx.nonce(), %err, "state: transaction failed inside block");
            }
        }
        self.db.apply_mining_reward(&block).await;

        let state_root = self.db.hash_state().await?;

        if let Err(err) = block.validate(&latest, &state_root) {
            self.db.replace_accounts(snapshot).await;
            return Err(err);
        }

        self.db.update_latest_block(block.clone()).await;

        if persist {
            if let Err(err) = self.db.write(&block).await {
                // Storage failed after the in-memory commit; roll both
                // pieces back so disk and memory stay in step.
                self.db.replace_accounts(snapshot).await;
                self.db.update_latest_block(latest).await;
                return Err(err);
            }
        }

        for tx in block.merkle_tree.values() {
            self.mempool.delete(tx);
        }

        info!(block = block.header.number, hash = %block.hash()?, "state: block committed");
        Ok(block)
    }

    // Query operations used by the handler layer.

    pub async fn query_accounts(&self, account_id: &AccountID) -> Option<Account> {
        self.db.query_account(account_id).await
    }

    pub async fn retrieve_accounts(&self) -> HashMap<AccountID, Account> {
        self.db.copy_accounts().await
    }

    pub fn query_mempool_length(&self) -> usize {
        self.mempool.count()
    }

    /// A copy of the mempool, best transactions first.
    pub fn retrieve_mempool(&self) -> Vec<BlockTx> {
        self.mempool.pick_best(0)
    }

    pub async fn latest_block(&self) -> Block {
        self.db.latest_block().await
    }
}
