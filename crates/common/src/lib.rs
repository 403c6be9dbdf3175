pub mod codec;
pub mod error;
pub mod genesis;
pub mod types;

pub use error::{ChainError, Result};
pub use genesis::Genesis;
pub use types::{Account, AccountID};
