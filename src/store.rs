//! Session scoped tree storage.
//!
//! Each session owns at most one current tree. Building replaces that tree
//! in one write, so a reader sees either the old tree or the new one. Trees
//! are handed out as `Arc`s and a proof generated from one stays tied to the
//! root of that exact tree even if the session rebuilds meanwhile.

use crate::{
    error::Error,
    hash::{DigestProvider, MerkleHash},
    proof::Proof,
    tree::{MerkleTree, TreeBuilder},
};
use parking_lot::RwLock;
use std::{collections::HashMap, fmt, sync::Arc};

/// Identifier of the caller owning a tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub const DEFAULT: &'static str = "default";

    /// Create new session id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the session id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Thread-safe, cloneable map from session to its current tree.
///
/// The lock is `parking_lot` and is never held across an `.await`. At most
/// `max_sessions` sessions hold a tree at once; sessions already present can
/// always rebuild.
pub struct TreeStore<HF: DigestProvider> {
    trees: Arc<RwLock<HashMap<SessionId, Arc<MerkleTree<HF>>>>>,
    max_sessions: usize,
}

impl<HF: DigestProvider> Clone for TreeStore<HF> {
    fn clone(&self) -> Self {
        Self {
            trees: Arc::clone(&self.trees),
            max_sessions: self.max_sessions,
        }
    }
}

impl<HF: DigestProvider> Default for TreeStore<HF> {
    fn default() -> Self {
        Self::new()
    }
}

impl<HF: DigestProvider> fmt::Debug for TreeStore<HF> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeStore")
            .field("sessions", &self.len())
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}

impl<HF: DigestProvider> TreeStore<HF> {
    /// Create new store without a session limit
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Create new store holding trees for at most `max_sessions` sessions
    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            trees: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
        }
    }

    /// Get the maximum number of sessions holding a tree
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Install a tree as the session's current tree, returning the shared handle.
    /// A session without a tree is refused once the store is full.
    pub fn replace(
        &self,
        session: &SessionId,
        tree: MerkleTree<HF>,
    ) -> Result<Arc<MerkleTree<HF>>, Error> {
        let tree = Arc::new(tree);
        let mut trees = self.trees.write();
        if !trees.contains_key(session) && trees.len() >= self.max_sessions {
            tracing::warn!(%session, max_sessions = self.max_sessions, "session limit reached");
            return Err(Error::SessionLimit(self.max_sessions));
        }
        let previous = trees.insert(session.clone(), Arc::clone(&tree));
        drop(trees);
        tracing::info!(
            %session,
            replaced = previous.is_some(),
            root = %tree.root(),
            "stored merkle tree"
        );
        Ok(tree)
    }

    /// Build a tree and make it current. A failed build leaves the old tree in place.
    pub fn build<I, T>(
        &self,
        session: &SessionId,
        builder: &TreeBuilder<HF>,
        records: I,
    ) -> Result<Arc<MerkleTree<HF>>, Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let tree = builder.build(records)?;
        self.replace(session, tree)
    }

    /// Get the session's current tree
    pub fn get(&self, session: &SessionId) -> Result<Arc<MerkleTree<HF>>, Error> {
        self.trees
            .read()
            .get(session)
            .cloned()
            .ok_or_else(|| Error::NoTree(session.to_string()))
    }

    /// Proof for a leaf of the session's current tree, together with that tree
    pub fn prove(
        &self,
        session: &SessionId,
        leaf_index: usize,
    ) -> Result<(Arc<MerkleTree<HF>>, Proof), Error> {
        let tree = self.get(session)?;
        let proof = tree.proof(leaf_index)?;
        Ok((tree, proof))
    }

    /// Get the root of the session's current tree
    pub fn root(&self, session: &SessionId) -> Result<MerkleHash, Error> {
        Ok(*self.get(session)?.root())
    }

    /// Drop the session's tree, freeing its slot
    pub fn remove(&self, session: &SessionId) -> Option<Arc<MerkleTree<HF>>> {
        let removed = self.trees.write().remove(session);
        if removed.is_some() {
            tracing::info!(%session, "removed merkle tree");
        }
        removed
    }

    /// Whether the session has a tree
    pub fn contains(&self, session: &SessionId) -> bool {
        self.trees.read().contains_key(session)
    }

    /// Get the number of sessions holding a tree
    pub fn len(&self) -> usize {
        self.trees.read().len()
    }

    /// Whether no session holds a tree
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
