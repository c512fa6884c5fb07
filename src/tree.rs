//! Merkle Tree construction.
//!
//! A tree is materialized level by level: level 0 holds one leaf per input
//! record in input order, and every following level holds
//! `ceil(previous / 2)` parents until a single root remains.

use crate::{
    error::Error,
    hash::{DigestProvider, MerkleHash},
};
use serde::Serialize;
use std::{fmt, marker::PhantomData, str::FromStr};

/// Preview length used by [`MerkleTree::render`]
pub const DEFAULT_PREVIEW_LEN: usize = 32;

/// Input record held at level 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub index: usize,
    pub data: Vec<u8>,
}

/// A node of a materialized tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Level in the tree, 0 being the leaf level
    pub level: usize,
    /// Position within its level
    pub index: usize,
    pub hash: MerkleHash,
    pub is_leaf: bool,
    pub is_root: bool,
    /// Original record, only present on leaves
    pub label: Option<Vec<u8>>,
}

impl Node {
    fn leaf(index: usize, hash: MerkleHash, data: &[u8]) -> Self {
        Self {
            level: 0,
            index,
            hash,
            is_leaf: true,
            is_root: false,
            label: Some(data.to_vec()),
        }
    }

    fn internal(level: usize, index: usize, hash: MerkleHash) -> Self {
        Self {
            level,
            index,
            hash,
            is_leaf: false,
            is_root: false,
            label: None,
        }
    }
}

/// What to do with the last node of a level holding an odd number of nodes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OddNodePolicy {
    /// Pair the last node with itself: parent = `H(last ‖ last)`
    #[default]
    DuplicateLast,
    /// Carry the last node up unchanged
    PromoteAlone,
}

impl fmt::Display for OddNodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OddNodePolicy::DuplicateLast => f.write_str("duplicate"),
            OddNodePolicy::PromoteAlone => f.write_str("promote"),
        }
    }
}

impl FromStr for OddNodePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duplicate" | "duplicate-last" | "duplicate_last" => Ok(OddNodePolicy::DuplicateLast),
            "promote" | "promote-alone" | "promote_alone" => Ok(OddNodePolicy::PromoteAlone),
            other => Err(Error::UnknownPolicy(other.to_string())),
        }
    }
}

/// Builds [`MerkleTree`]s with a fixed hash function and odd node policy
pub struct TreeBuilder<HF: DigestProvider> {
    _hasher: PhantomData<fn() -> HF>,
    policy: OddNodePolicy,
}

impl<HF: DigestProvider> Clone for TreeBuilder<HF> {
    fn clone(&self) -> Self {
        Self::with_policy(self.policy)
    }
}

impl<HF: DigestProvider> Default for TreeBuilder<HF> {
    fn default() -> Self {
        Self::new()
    }
}

impl<HF: DigestProvider> fmt::Debug for TreeBuilder<HF> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("algorithm", &HF::algorithm())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<HF: DigestProvider> TreeBuilder<HF> {
    /// Builder duplicating the last node of odd levels
    pub fn new() -> Self {
        Self::with_policy(OddNodePolicy::default())
    }

    /// Builder using the given odd node policy
    pub fn with_policy(policy: OddNodePolicy) -> Self {
        Self {
            _hasher: PhantomData,
            policy,
        }
    }

    /// Get the odd node policy of the builder
    pub fn policy(&self) -> OddNodePolicy {
        self.policy
    }

    /// Build a tree over the ordered leaf records
    pub fn build<I, T>(&self, records: I) -> Result<MerkleTree<HF>, Error>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let leaves: Vec<Leaf> = records
            .into_iter()
            .enumerate()
            .map(|(index, data)| Leaf {
                index,
                data: data.as_ref().to_vec(),
            })
            .collect();
        if leaves.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut current: Vec<Node> = leaves
            .iter()
            .map(|leaf| Node::leaf(leaf.index, HF::hash_leaf(&leaf.data), &leaf.data))
            .collect();
        let mut levels = Vec::new();
        while current.len() > 1 {
            let parents = self.parent_level(&current, levels.len() + 1);
            levels.push(current);
            current = parents;
        }
        current[0].is_root = true;
        levels.push(current);

        let tree = MerkleTree {
            _hasher: PhantomData,
            levels,
            leaves,
            policy: self.policy,
        };
        tracing::debug!(
            leaf_count = tree.leaf_count(),
            depth = tree.depth(),
            root = %tree.root(),
            "built merkle tree"
        );
        Ok(tree)
    }

    /// Pair up the nodes of one level left to right
    fn parent_level(&self, children: &[Node], level: usize) -> Vec<Node> {
        children
            .chunks(2)
            .enumerate()
            .map(|(index, pair)| {
                let left = &pair[0];
                let hash = match (pair.get(1), self.policy) {
                    (Some(right), _) => HF::hash_pair(&left.hash, &right.hash),
                    (None, OddNodePolicy::DuplicateLast) => HF::hash_pair(&left.hash, &left.hash),
                    (None, OddNodePolicy::PromoteAlone) => left.hash,
                };
                Node::internal(level, index, hash)
            })
            .collect()
    }
}

/// Summary figures about a built tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeStatistics {
    pub leaf_count: usize,
    pub tree_depth: usize,
    pub tree_height: usize,
    pub root_hash: MerkleHash,
    pub root_hash_short: String,
    pub proof_size: usize,
    pub algorithm: &'static str,
    pub odd_node_policy: OddNodePolicy,
    pub time_complexity_build: &'static str,
    pub time_complexity_proof: &'static str,
    pub time_complexity_verify: &'static str,
    pub space_complexity: &'static str,
}

/// Merkle Tree data structure
pub struct MerkleTree<HF: DigestProvider> {
    _hasher: PhantomData<fn() -> HF>,
    /// Level 0 holds the leaves, the last level holds only the root
    pub(crate) levels: Vec<Vec<Node>>,
    pub(crate) leaves: Vec<Leaf>,
    pub(crate) policy: OddNodePolicy,
}

impl<HF: DigestProvider> fmt::Debug for MerkleTree<HF> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("algorithm", &HF::algorithm())
            .field("leaf_count", &self.leaf_count())
            .field("depth", &self.depth())
            .field("root", self.root())
            .finish()
    }
}

impl<HF: DigestProvider> MerkleTree<HF> {
    /// Get the merkle root of the tree
    pub fn root(&self) -> &MerkleHash {
        &self.root_node().hash
    }

    /// Get the root node
    pub fn root_node(&self) -> &Node {
        &self.levels[self.levels.len() - 1][0]
    }

    /// Number of levels, counting both the leaf level and the root
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Number of edges between a leaf and the root
    pub fn height(&self) -> usize {
        self.depth() - 1
    }

    /// Get the number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Get every level, leaf level first
    pub fn levels(&self) -> &[Vec<Node>] {
        &self.levels
    }

    /// Get the input records in order
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Get the odd node policy the tree was built with
    pub fn policy(&self) -> OddNodePolicy {
        self.policy
    }

    /// Raw record of a leaf
    pub fn leaf_data(&self, leaf_index: usize) -> Result<&[u8], Error> {
        self.leaf_exists(leaf_index)?;
        Ok(&self.leaves[leaf_index].data)
    }

    /// Ensure the leaf is a member of the tree
    pub(crate) fn leaf_exists(&self, leaf_index: usize) -> Result<(), Error> {
        if leaf_index >= self.leaf_count() {
            return Err(Error::IndexOutOfRange(leaf_index, self.leaf_count()));
        }
        Ok(())
    }

    /// Summary figures of the tree
    pub fn statistics(&self) -> TreeStatistics {
        TreeStatistics {
            leaf_count: self.leaf_count(),
            tree_depth: self.depth(),
            tree_height: self.height(),
            root_hash: *self.root(),
            root_hash_short: self.root().short(DEFAULT_PREVIEW_LEN),
            proof_size: ceil_log2(self.leaf_count()),
            algorithm: HF::algorithm(),
            odd_node_policy: self.policy,
            time_complexity_build: "O(n)",
            time_complexity_proof: "O(log n)",
            time_complexity_verify: "O(log n)",
            space_complexity: "O(n)",
        }
    }

    /// Preformatted text rendering, root level first
    pub fn render(&self, preview_len: usize) -> String {
        let rule = "=".repeat(80);
        let mut out = vec![
            rule.clone(),
            format!(
                "MERKLE TREE STRUCTURE (Depth: {}, Height: {})",
                self.depth(),
                self.height()
            ),
            rule.clone(),
        ];
        for (level, nodes) in self.levels.iter().enumerate().rev() {
            out.push(String::new());
            out.push(format!("{} ({} nodes):", self.level_name(level), nodes.len()));
            out.push("-".repeat(80));
            for node in nodes {
                out.push(format!("  [{}] {}", node.index, node.hash.short(preview_len)));
            }
        }
        out.push(String::new());
        out.push(rule);
        out.join("\n")
    }

    /// Display name of a level
    pub fn level_name(&self, level: usize) -> String {
        if level == self.height() {
            "ROOT".to_string()
        } else {
            format!("Level {level}")
        }
    }
}

/// Smallest `k` with `2^k >= n`
pub(crate) fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Sha256;
    use sha3::Sha3_256;

    fn build(records: &[&str]) -> MerkleTree<Sha256> {
        TreeBuilder::<Sha256>::new().build(records).unwrap()
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let records: Vec<&str> = Vec::new();
        let err = TreeBuilder::<Sha256>::new().build(records).unwrap_err();
        assert_eq!(err, Error::EmptyInput);
        assert!(err.is_validation());
    }

    #[test]
    fn test_single_leaf_is_root() {
        let tree = build(&["only"]);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.root(), &Sha256::hash_leaf(b"only"));
        let node = tree.root_node();
        assert!(node.is_leaf && node.is_root);
        assert_eq!(node.label.as_deref(), Some(&b"only"[..]));
    }

    #[test]
    fn test_four_block_tree() {
        let tree = build(&["Block 1", "Block 2", "Block 3", "Block 4"]);
        assert_eq!(tree.depth(), 3);
        let sizes: Vec<usize> = tree.levels().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 2, 1]);

        let h = |s: &str| Sha256::hash_leaf(s.as_bytes());
        let left = Sha256::hash_pair(&h("Block 1"), &h("Block 2"));
        let right = Sha256::hash_pair(&h("Block 3"), &h("Block 4"));
        assert_eq!(tree.root(), &Sha256::hash_pair(&left, &right));
        assert!(tree.levels()[0].iter().all(|n| n.is_leaf && !n.is_root));
        assert!(tree.levels()[1].iter().all(|n| !n.is_leaf && n.label.is_none()));
    }

    #[test]
    fn test_odd_levels_duplicate_last_node() {
        let records = [
            "Transaction A",
            "Transaction B",
            "Transaction C",
            "Transaction D",
            "Transaction E",
        ];
        let tree = build(&records);
        let sizes: Vec<usize> = tree.levels().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 3, 2, 1]);

        let e = Sha256::hash_leaf(b"Transaction E");
        let duplicated = Sha256::hash_pair(&e, &e);
        assert_eq!(tree.levels()[1][2].hash, duplicated);

        // Level 1 is odd as well and its last node is paired with itself
        assert_eq!(
            tree.levels()[2][1].hash,
            Sha256::hash_pair(&duplicated, &duplicated)
        );
    }

    #[test]
    fn test_promote_alone_policy() {
        let tree = TreeBuilder::<Sha256>::with_policy(OddNodePolicy::PromoteAlone)
            .build(["a", "b", "c"])
            .unwrap();
        let c = Sha256::hash_leaf(b"c");
        assert_eq!(tree.levels()[1][1].hash, c);
        let ab = Sha256::hash_pair(&Sha256::hash_leaf(b"a"), &Sha256::hash_leaf(b"b"));
        assert_eq!(tree.root(), &Sha256::hash_pair(&ab, &c));
        assert_eq!(tree.policy(), OddNodePolicy::PromoteAlone);
    }

    #[test]
    fn test_determinism_and_order_sensitivity() {
        let first = build(&["x", "y", "z"]);
        let again = build(&["x", "y", "z"]);
        let swapped = build(&["y", "x", "z"]);
        assert_eq!(first.root(), again.root());
        assert_ne!(first.root(), swapped.root());

        let other_hash = TreeBuilder::<Sha3_256>::new().build(["x", "y", "z"]).unwrap();
        assert_ne!(first.root(), other_hash.root());
    }

    #[test]
    fn test_depth_law() {
        for n in 1..=70usize {
            let records: Vec<String> = (0..n).map(|i| format!("record {i}")).collect();
            let tree = TreeBuilder::<Sha256>::new().build(&records).unwrap();
            assert_eq!(tree.depth(), ceil_log2(n) + 1, "leaf count {n}");
            for pair in tree.levels().windows(2) {
                assert_eq!(pair[1].len(), pair[0].len().div_ceil(2));
            }
        }
    }

    #[test]
    fn test_leaf_data_bounds() {
        let tree = build(&["a", "b"]);
        assert_eq!(tree.leaf_data(1).unwrap(), b"b");
        assert_eq!(tree.leaf_data(2), Err(Error::IndexOutOfRange(2, 2)));
    }

    #[test]
    fn test_render_and_statistics() {
        let tree = build(&["Block 1", "Block 2", "Block 3"]);
        let text = tree.render(16);
        assert!(text.contains("MERKLE TREE STRUCTURE (Depth: 3, Height: 2)"));
        assert!(text.contains("ROOT (1 nodes):"));
        assert!(text.contains("Level 0 (3 nodes):"));
        assert!(text.contains(&format!("  [0] {}", tree.root().short(16))));
        assert!(text.find("ROOT").unwrap() < text.find("Level 0").unwrap());

        let stats = tree.statistics();
        assert_eq!(stats.leaf_count, 3);
        assert_eq!(stats.tree_depth, 3);
        assert_eq!(stats.tree_height, 2);
        assert_eq!(stats.proof_size, 2);
        assert_eq!(stats.algorithm, "sha256");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("duplicate".parse::<OddNodePolicy>(), Ok(OddNodePolicy::DuplicateLast));
        assert_eq!("Promote-Alone".parse::<OddNodePolicy>(), Ok(OddNodePolicy::PromoteAlone));
        assert!(matches!(
            "random".parse::<OddNodePolicy>(),
            Err(Error::UnknownPolicy(_))
        ));
    }
}
