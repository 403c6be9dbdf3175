use dashmap::DashMap;

use ardan_common::{ChainError, Result};

use crate::tx::BlockTx;

/// Pending transactions waiting to be mined, keyed by `sender:nonce` so an
/// account can hold at most one pending transaction per nonce. A new
/// submission for an occupied key must carry a strictly higher tip to
/// replace the old one.
#[derive(Debug, Default)]
pub struct Mempool {
    pool: DashMap<String, BlockTx>,
}

impl Mempool {
    pub fn new() -> Self {
        Self {
            pool: DashMap::new(),
        }
    }

    fn map_key(tx: &BlockTx) -> String {
        format!("{}:{}", tx.from(), tx.nonce())
    }

    /// Add a transaction, replacing an existing entry only when the new
    /// tip is strictly higher.
    pub fn upsert(&self, tx: BlockTx) -> Result<()> {
        match self.pool.entry(Self::map_key(&tx)) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if entry.get().tip() >= tx.tip() {
                    return Err(ChainError::DuplicateOrLowerTip);
                }
                entry.insert(tx);
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(tx);
            }
        }
        Ok(())
    }

    /// Remove a transaction. Absence is not an error.
    pub fn delete(&self, tx: &BlockTx) {
        self.pool.remove(&Self::map_key(tx));
    }

    pub fn count(&self) -> usize {
        self.pool.len()
    }

    /// Copy out the best transactions, sorted by highest tip first. Ties
    /// go to the earlier submission, then to the lower key. Passing zero
    /// returns everything. The caller owns the copies; the pool is not
    /// drained.
    pub fn pick_best(&self, how_many: usize) -> Vec<BlockTx> {
        let mut txs: Vec<(String, BlockTx)> = self
            .pool
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        txs.sort_by(|(a_key, a), (b_key, b)| {
            b.tip()
                .cmp(&a.tip())
                .then_with(|| a.time_stamp.cmp(&b.time_stamp))
                .then_with(|| a_key.cmp(b_key))
        });

        let take = if how_many == 0 {
            txs.len()
        } else {
            how_many.min(txs.len())
        };

        txs.into_iter().take(take).map(|(_, tx)| tx).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardan_crypto::KeyPair;

    use crate::tx::{SignedTx, Tx};

    fn signed(key: &KeyPair, nonce: u64, tip: u64) -> SignedTx {
        let tx = Tx {
            chain_id: 1,
            nonce,
            from: key.account_id(),
            to: "0xF01813E4B85e178A83e29B8E7bF26BD830a25f32".parse().unwrap(),
            value: 100,
            tip,
            data: Vec::new(),
        };
        tx.sign(key).unwrap()
    }

    fn block_tx(key: &KeyPair, nonce: u64, tip: u64, time_stamp: u64) -> BlockTx {
        let mut tx = BlockTx::new(signed(key, nonce, tip), 1, 15);
        tx.time_stamp = time_stamp;
        tx
    }

    #[test]
    fn test_upsert_and_count() {
        let key = KeyPair::random();
        let pool = Mempool::new();

        pool.upsert(block_tx(&key, 1, 10, 1)).unwrap();
        pool.upsert(block_tx(&key, 2, 10, 1)).unwrap();
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_replacement_needs_higher_tip() {
        let key = KeyPair::random();
        let pool = Mempool::new();

        pool.upsert(block_tx(&key, 5, 10, 1)).unwrap();

        // Higher tip replaces.
        pool.upsert(block_tx(&key, 5, 20, 2)).unwrap();
        assert_eq!(pool.count(), 1);
        assert_eq!(pool.pick_best(0)[0].tip(), 20);

        // Same tip is a duplicate.
        assert!(matches!(
            pool.upsert(block_tx(&key, 5, 20, 3)),
            Err(ChainError::DuplicateOrLowerTip)
        ));

        // Lower tip is rejected too.
        assert!(matches!(
            pool.upsert(block_tx(&key, 5, 15, 3)),
            Err(ChainError::DuplicateOrLowerTip)
        ));
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let key = KeyPair::random();
        let pool = Mempool::new();

        let tx = block_tx(&key, 1, 10, 1);
        pool.upsert(tx.clone()).unwrap();
        pool.delete(&tx);
        assert_eq!(pool.count(), 0);

        // Deleting again is fine.
        pool.delete(&tx);
    }

    #[test]
    fn test_pick_best_orders_by_tip() {
        let a = KeyPair::random();
        let b = KeyPair::random();
        let c = KeyPair::random();
        let pool = Mempool::new();

        pool.upsert(block_tx(&a, 1, 10, 1)).unwrap();
        pool.upsert(block_tx(&b, 1, 30, 1)).unwrap();
        pool.upsert(block_tx(&c, 1, 20, 1)).unwrap();

        let best = pool.pick_best(2);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].tip(), 30);
        assert_eq!(best[1].tip(), 20);
    }

    #[test]
    fn test_pick_best_tie_goes_to_earlier_submission() {
        let a = KeyPair::random();
        let b = KeyPair::random();
        let pool = Mempool::new();

        pool.upsert(block_tx(&a, 1, 10, 200)).unwrap();
        pool.upsert(block_tx(&b, 1, 10, 100)).unwrap();

        let best = pool.pick_best(0);
        assert_eq!(best[0].time_stamp, 100);
        assert_eq!(best[1].time_stamp, 200);
    }

    #[test]
    fn test_pick_best_zero_returns_all() {
        let key = KeyPair::random();
        let pool = Mempool::new();

        for nonce in 1..=4 {
            pool.upsert(block_tx(&key, nonce, 10, nonce)).unwrap();
        }

        assert_eq!(pool.pick_best(0).len(), 4);
        assert_eq!(pool.pick_best(10).len(), 4);
        assert_eq!(pool.pick_best(2).len(), 2);
    }
}
