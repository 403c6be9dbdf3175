pub mod block;
pub mod database;
pub mod mempool;
pub mod merkle;
pub mod pow;
pub mod state;
pub mod tx;

pub use block::{is_hash_solved, Block, BlockData, BlockHeader};
pub use database::{Database, Storage};
pub use mempool::Mempool;
pub use pow::{pow, PowArgs};
pub use state::{State, StateConfig, Worker};
pub use tx::{BlockTx, SignedTx, Tx};
