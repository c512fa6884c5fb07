//! Merkle Tree proving system
//!
//! Builds a binary Merkle tree over an ordered list of records, issues
//! sibling-path membership proofs and verifies records against them. The
//! [`api`] module serves the engine over HTTP with one current tree per
//! session.

pub mod api;
pub mod config;
mod error;
mod hash;
mod proof;
mod store;
mod tree;
mod view;

pub use crate::{
    config::ServerConfig,
    error::Error,
    hash::{DigestProvider, MerkleHash, Separated, HASH_LEN},
    proof::{detect_tamper, proof, verify, Position, Proof, ProofStep, TamperReport},
    store::{SessionId, TreeStore},
    tree::{Leaf, MerkleTree, Node, OddNodePolicy, TreeBuilder, TreeStatistics},
    view::{proof_view, DataEntry, LevelView, NodeView, ProofStepView, TreeView},
};
pub use blake2::Blake2s256;
pub use sha2::Sha256;
pub use sha3::Sha3_256;
