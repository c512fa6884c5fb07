//! Digest providers and the Merkle hash container

use crate::error::Error;
use blake2::Blake2s256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use std::{fmt, marker::PhantomData, ops::Deref, str::FromStr};

/// Length in bytes of every digest used in the tree
pub const HASH_LEN: usize = 32;

/// Domain separation tags used by [`Separated`]
pub(crate) const LEAF_TAG: u8 = 0x00;
pub(crate) const NODE_TAG: u8 = 0x01;

/// Hash function used for both leaves and internal nodes.
///
/// Leaves are hashed as `H(data)` and internal nodes as `H(left ‖ right)`.
/// The concatenation order is significant and is the same during
/// construction and verification.
pub trait DigestProvider: Send + Sync + 'static {
    /// Hash the raw bytes of a leaf
    fn hash_leaf(data: &[u8]) -> MerkleHash;

    /// Hash the concatenation of two child hashes, left first
    fn hash_pair(left: &[u8], right: &[u8]) -> MerkleHash;

    /// Human readable algorithm name
    fn algorithm() -> &'static str;
}

macro_rules! impl_digest_provider {
    ($($hasher:ty => $name:literal),* $(,)?) => {
        $(
            impl DigestProvider for $hasher {
                fn hash_leaf(data: &[u8]) -> MerkleHash {
                    MerkleHash::from_digest(&<$hasher as Digest>::digest(data))
                }

                fn hash_pair(left: &[u8], right: &[u8]) -> MerkleHash {
                    let mut hasher = <$hasher as Digest>::new();
                    Digest::update(&mut hasher, left);
                    Digest::update(&mut hasher, right);
                    MerkleHash::from_digest(&hasher.finalize())
                }

                fn algorithm() -> &'static str {
                    $name
                }
            }
        )*
    };
}

impl_digest_provider!(
    Sha256 => "sha256",
    Sha3_256 => "sha3-256",
    Blake2s256 => "blake2s-256",
);

/// Domain separated variant of a digest provider.
///
/// Leaves hash as `H(0x00 ‖ data)` and nodes as `H(0x01 ‖ left ‖ right)`, so a
/// leaf pre-image can never be mistaken for an internal node.
pub struct Separated<D>(PhantomData<fn() -> D>);

impl<D: DigestProvider> DigestProvider for Separated<D> {
    fn hash_leaf(data: &[u8]) -> MerkleHash {
        D::hash_pair(&[LEAF_TAG], data)
    }

    fn hash_pair(left: &[u8], right: &[u8]) -> MerkleHash {
        D::hash_pair(&[NODE_TAG], &[left, right].concat())
    }

    fn algorithm() -> &'static str {
        "separated"
    }
}

/// Container for Merkle Hashes
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MerkleHash(pub [u8; HASH_LEN]);

impl MerkleHash {
    fn from_digest(digest: &[u8]) -> Self {
        let mut result = [0u8; HASH_LEN];
        result.copy_from_slice(digest);
        MerkleHash(result)
    }

    /// Lowercase hex encoding of the full digest
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Preview made of the first `len` hex characters followed by `...`
    pub fn short(&self, len: usize) -> String {
        let hex = self.to_hex();
        if hex.len() > len {
            format!("{}...", &hex[..len])
        } else {
            hex
        }
    }
}

impl fmt::Display for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleHash({})", self.short(16))
    }
}

impl FromStr for MerkleHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| Error::InvalidHash(e.to_string()))?;
        if bytes.len() != HASH_LEN {
            return Err(Error::InvalidHash(format!(
                "expected {} hex chars, got {}",
                HASH_LEN * 2,
                s.trim().len()
            )));
        }
        Ok(MerkleHash::from_digest(&bytes))
    }
}

impl Serialize for MerkleHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MerkleHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

impl Deref for MerkleHash {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<[u8; HASH_LEN]> for MerkleHash {
    fn eq(&self, other: &[u8; HASH_LEN]) -> bool {
        &self.0 == other
    }
}
