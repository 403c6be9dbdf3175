use ardan_common::Result;
use ardan_crypto::hash::keccak256;

/// Implemented by anything that can serve as a Merkle tree leaf.
pub trait Hashable {
    fn merkle_hash(&self) -> Result<[u8; 32]>;
}

/// A binary Merkle tree over an ordered sequence of leaves. Internal nodes
/// are keccak-256 of the concatenated children; when a level has an odd
/// count the last node is duplicated before pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree<T> {
    root: [u8; 32],
    values: Vec<T>,
}

impl<T> Tree<T> {
    /// The tree over zero leaves. Its root is keccak-256 of the empty input.
    pub fn empty() -> Self {
        Self {
            root: keccak256(&[]),
            values: Vec::new(),
        }
    }

    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// The root in the string form stored in block headers.
    pub fn root_hex(&self) -> String {
        format!("0x{}", hex::encode(self.root))
    }

    /// The original ordered leaves.
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Hashable> Tree<T> {
    pub fn new(values: Vec<T>) -> Result<Self> {
        let root = compute_root(&values)?;
        Ok(Self { root, values })
    }
}

fn compute_root<T: Hashable>(values: &[T]) -> Result<[u8; 32]> {
    if values.is_empty() {
        return Ok(keccak256(&[]));
    }

    let mut level: Vec<[u8; 32]> = Vec::with_capacity(values.len());
    for value in values {
        level.push(value.merkle_hash()?);
    }

    while level.len() > 1 {
        if level.len() % 2 != 0 {
            let last = level[level.len() - 1];
            level.push(last);
        }

        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            let mut buf = [0u8; 64];
            buf[..32].copy_from_slice(&pair[0]);
            buf[32..].copy_from_slice(&pair[1]);
            next.push(keccak256(&buf));
        }
        level = next;
    }

    Ok(level[0])
}
