use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use ardan_common::ChainError;
use ardan_core::state::{State, Worker};

/// Drives the mining loop. The worker holds only a weak reference back to
/// the state: it observes the chain but does not keep it alive, which
/// breaks the state/worker ownership cycle.
pub struct MiningWorker {
    state: Weak<State>,
    start_mining: Notify,
    in_flight: Mutex<CancellationToken>,
    shutdown: CancellationToken,
}

impl MiningWorker {
    /// Create the worker, register it with the state, and spawn the
    /// mining loop.
    pub fn start(state: &Arc<State>) -> Arc<Self> {
        let worker = Arc::new(Self {
            state: Arc::downgrade(state),
            start_mining: Notify::new(),
            in_flight: Mutex::new(CancellationToken::new()),
            shutdown: CancellationToken::new(),
        });
        state.set_worker(worker.clone());

        let runner = worker.clone();
        tokio::spawn(async move {
            runner.run().await;
        });

        worker
    }

    async fn run(self: Arc<Self>) {
        info!("worker: mining loop started");

        loop {
            tokio::select! {
                _ = self.start_mining.notified() => {}
                _ = self.shutdown.cancelled() => break,
            }

            self.mine_until_drained().await;
        }

        info!("worker: mining loop stopped");
    }

    /// Keep mining blocks while there is work and mining is allowed.
    async fn mine_until_drained(&self) {
        loop {
            let Some(state) = self.state.upgrade() else {
                return;
            };

            if self.shutdown.is_cancelled()
                || state.query_mempool_length() == 0
                || !state.is_mining_allowed().await
            {
                return;
            }

            let cancel = CancellationToken::new();
            *self.in_flight.lock().await = cancel.clone();

            match state.mine_new_block(cancel).await {
                Ok(block) => {
                    info!(block = block.header.number, "worker: mined block");
                }
                Err(ChainError::NoTransactions) => return,
                Err(ChainError::Cancelled) => {
                    debug!("worker: mining cancelled");
                    return;
                }
                Err(err) => {
                    error!(%err, "worker: mining failed");
                    return;
                }
            }
        }
    }
}

impl Worker for MiningWorker {
    fn shutdown(&self) {
        self.shutdown.cancel();
        self.signal_cancel_mining();
    }

    fn signal_start_mining(&self) {
        self.start_mining.notify_one();
    }

    fn signal_cancel_mining(&self) {
        // Cancel whatever search is in flight; the loop hands out a fresh
        // token per attempt.
        if let Ok(token) = self.in_flight.try_lock() {
            token.cancel();
        }
    }
}
