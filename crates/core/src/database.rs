use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use ardan_common::types::{Account, AccountID};
use ardan_common::{ChainError, Genesis, Result};
use ardan_crypto::hash::hash_struct;

use crate::block::{Block, BlockData};
use crate::tx::BlockTx;

/// The behavior required from any package providing block persistence.
/// The disk implementation writes one file per block; a memory
/// implementation serves tests.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn write(&self, block_data: &BlockData) -> Result<()>;
    async fn get_block(&self, number: u64) -> Result<BlockData>;
    async fn close(&self) -> Result<()>;
}

struct DatabaseInner {
    latest_block: Block,
    accounts: HashMap<AccountID, Account>,
}

/// Manages the in-memory account data and the latest committed block.
/// All access goes through a single reader-writer lock; mutations are
/// serialized and the lock is never held across storage I/O.
pub struct Database {
    genesis: Genesis,
    inner: RwLock<DatabaseInner>,
    storage: Arc<dyn Storage>,
}

impl Database {
    /// Construct the database, seeding accounts from the genesis balances.
    pub fn new(genesis: Genesis, storage: Arc<dyn Storage>) -> Result<Self> {
        let mut accounts = HashMap::new();
        for (account_str, balance) in &genesis.balances {
            let account_id = AccountID::from_hex(account_str)?;
            accounts.insert(account_id, Account::new(account_id, *balance));
        }

        Ok(Self {
            genesis,
            inner: RwLock::new(DatabaseInner {
                latest_block: Block::genesis(),
                accounts,
            }),
            storage,
        })
    }

    pub async fn close(&self) -> Result<()> {
        self.storage.close().await
    }

    /// The latest committed block.
    pub async fn latest_block(&self) -> Block {
        self.inner.read().await.latest_block.clone()
    }

    /// Overwrite the latest block after a successful commit.
    pub async fn update_latest_block(&self, block: Block) {
        self.inner.write().await.latest_block = block;
    }

    /// A snapshot of the current accounts.
    pub async fn copy_accounts(&self) -> HashMap<AccountID, Account> {
        self.inner.read().await.accounts.clone()
    }

    /// Replace the full account set. Used to roll back to a snapshot when
    /// a block fails validation after its transactions were applied.
    pub async fn replace_accounts(&self, accounts: HashMap<AccountID, Account>) {
        self.inner.write().await.accounts = accounts;
    }

    pub async fn query_account(&self, account_id: &AccountID) -> Option<Account> {
        self.inner.read().await.accounts.get(account_id).copied()
    }

    /// A deterministic hash over the accounts and their balances: the
    /// canonical state root recorded in each block header. Accounts are
    /// sorted ascending by address bytes before hashing.
    pub async fn hash_state(&self) -> Result<String> {
        let inner = self.inner.read().await;
        hash_accounts(&inner.accounts)
    }

    /// The state root the accounts will have once these transactions and
    /// the mining reward are applied. Runs the same apply rules on a copy
    /// of the accounts; the live set is untouched. The miner bakes this
    /// root into the header before the nonce search starts.
    pub async fn forecast_state_root(
        &self,
        beneficiary_id: AccountID,
        mining_reward: u64,
        trans: &[BlockTx],
    ) -> Result<String> {
        let mut accounts = self.inner.read().await.accounts.clone();

        for tx in trans {
            if let Err(err) =
                apply_transaction_to(&mut accounts, self.genesis.chain_id, beneficiary_id, tx)
            {
                warn!(nonce = tx.nonce(), %err, "forecast: transaction failed inside block");
            }
        }
        apply_mining_reward_to(&mut accounts, beneficiary_id, mining_reward);

        hash_accounts(&accounts)
    }

    /// Credit the block's beneficiary with the mining reward.
    pub async fn apply_mining_reward(&self, block: &Block) {
        let mut inner = self.inner.write().await;
        apply_mining_reward_to(
            &mut inner.accounts,
            block.header.beneficiary_id,
            block.header.mining_reward,
        );
    }

    /// Apply a transaction to the accounts. The gas fee transfers to the
    /// beneficiary before any accounting check runs and sticks even when a
    /// check fails afterwards; that is the rule that makes spam expensive.
    pub async fn apply_transaction(&self, block: &Block, tx: &BlockTx) -> Result<()> {
        let mut inner = self.inner.write().await;
        apply_transaction_to(
            &mut inner.accounts,
            self.genesis.chain_id,
            block.header.beneficiary_id,
            tx,
        )
    }

    /// Persist a committed block through the storage collaborator.
    pub async fn write(&self, block: &Block) -> Result<()> {
        let block_data = BlockData::new(block)?;
        self.storage.write(&block_data).await
    }

    /// Read a block back from storage.
    pub async fn get_block(&self, number: u64) -> Result<BlockData> {
        self.storage.get_block(number).await
    }
}

fn hash_accounts(accounts: &HashMap<AccountID, Account>) -> Result<String> {
    let mut accounts: Vec<Account> = accounts.values().copied().collect();
    accounts.sort_by(|a, b| a.id.cmp(&b.id));

    hash_struct(&accounts).map_err(ChainError::Serialization)
}

fn apply_mining_reward_to(
    accounts: &mut HashMap<AccountID, Account>,
    beneficiary_id: AccountID,
    mining_reward: u64,
) {
    let beneficiary = accounts
        .entry(beneficiary_id)
        .or_insert_with(|| Account::new(beneficiary_id, 0));
    beneficiary.balance = beneficiary.balance.saturating_add(mining_reward);
}

fn apply_transaction_to(
    accounts: &mut HashMap<AccountID, Account>,
    chain_id: u16,
    beneficiary_id: AccountID,
    tx: &BlockTx,
) -> Result<()> {
    let from_id = tx.signed_tx.from_account()?;

    // Fault the involved accounts in with zero balances.
    for account_id in [from_id, tx.to(), beneficiary_id] {
        accounts
            .entry(account_id)
            .or_insert_with(|| Account::new(account_id, 0));
    }

    // The sender pays for gas no matter what happens below, capped at
    // whatever balance is left.
    let gas_fee = tx
        .gas_price
        .saturating_mul(tx.gas_units)
        .min(accounts[&from_id].balance);
    if let Some(from) = accounts.get_mut(&from_id) {
        from.balance -= gas_fee;
    }
    if let Some(beneficiary) = accounts.get_mut(&beneficiary_id) {
        beneficiary.balance = beneficiary.balance.saturating_add(gas_fee);
    }

    // Basic accounting checks.
    if tx.signed_tx.tx.chain_id != chain_id {
        return Err(ChainError::WrongChainId {
            got: tx.signed_tx.tx.chain_id,
            expected: chain_id,
        });
    }

    if from_id == tx.to() {
        return Err(ChainError::SelfTransfer {
            from: from_id,
            to: tx.to(),
        });
    }

    let from = accounts[&from_id];
    if tx.nonce() <= from.nonce {
        return Err(ChainError::NonceTooSmall {
            current: from.nonce,
            provided: tx.nonce(),
        });
    }

    let needed = tx.signed_tx.tx.value.saturating_add(tx.tip());
    if from.balance == 0 || from.balance < needed {
        return Err(ChainError::InsufficientFunds {
            balance: from.balance,
            needed,
        });
    }

    // Move the value between the two parties.
    if let Some(from) = accounts.get_mut(&from_id) {
        from.balance -= tx.signed_tx.tx.value;
    }
    if let Some(to) = accounts.get_mut(&tx.to()) {
        to.balance = to.balance.saturating_add(tx.signed_tx.tx.value);
    }

    // Give the beneficiary the tip.
    if let Some(from) = accounts.get_mut(&from_id) {
        from.balance -= tx.tip();
    }
    if let Some(beneficiary) = accounts.get_mut(&beneficiary_id) {
        beneficiary.balance = beneficiary.balance.saturating_add(tx.tip());
    }

    // Update the nonce for the next transaction check.
    if let Some(from) = accounts.get_mut(&from_id) {
        from.nonce = tx.nonce();
    }

    debug!(from = %from_id, to = %tx.to(), value = tx.signed_tx.tx.value, "applied transaction");
    Ok(())
}
