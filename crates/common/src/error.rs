use thiserror::Error;

use crate::types::AccountID;

/// Stable error kinds shared across the node. Handlers and peers match on
/// these variants, so the set must not change between releases.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Signature fails syntactic checks or the sender cannot be recovered.
    #[error("invalid signature, {0}")]
    BadSignature(String),

    /// Transaction was signed for a different chain.
    #[error("transaction invalid, wrong chain id, got {got}, exp {expected}")]
    WrongChainId { got: u16, expected: u16 },

    /// Sending money to yourself is not allowed.
    #[error("transaction invalid, sending money to yourself, from {from}, to {to}")]
    SelfTransfer { from: AccountID, to: AccountID },

    /// The transaction nonce must be greater than the account nonce.
    #[error("transaction invalid, nonce too small, current {current}, provided {provided}")]
    NonceTooSmall { current: u64, provided: u64 },

    /// Balance cannot cover value plus tip. The gas fee has already been
    /// deducted by the time this is returned.
    #[error("transaction invalid, insufficient funds, bal {balance}, needed {needed}")]
    InsufficientFunds { balance: u64, needed: u64 },

    /// The mempool already holds this (sender, nonce) with an equal or
    /// higher tip.
    #[error("transaction already in mempool with an equal or higher tip")]
    DuplicateOrLowerTip,

    /// Mining was requested with an empty mempool.
    #[error("no transactions in mempool")]
    NoTransactions,

    /// The proof-of-work search was cancelled.
    #[error("mining cancelled")]
    Cancelled,

    /// A peer block is two or more blocks ahead of ours.
    #[error("blockchain forked, start resync")]
    ChainForked,

    /// Any other block validation failure.
    #[error("block invalid, {0}")]
    BlockInvalid(String),

    /// An address string did not parse to 20 bytes.
    #[error("account id is not properly formatted")]
    InvalidAccountID,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
