//! Serializable projection of a tree for rendering clients.

use crate::{
    hash::{DigestProvider, MerkleHash},
    proof::{Position, Proof},
    tree::{MerkleTree, Node},
};
use serde::Serialize;

/// One input record as submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataEntry {
    pub index: usize,
    pub data: String,
}

/// One node with its role flags and hash preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub index: usize,
    pub hash: MerkleHash,
    pub hash_short: String,
    pub is_leaf: bool,
    pub is_root: bool,
    pub label: Option<String>,
}

/// Nodes of one level, named for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelView {
    pub level: usize,
    pub level_name: String,
    pub nodes: Vec<NodeView>,
}

/// Records and levels of a tree, leaf level first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeView {
    pub data_list: Vec<DataEntry>,
    pub tree_levels: Vec<LevelView>,
}

impl TreeView {
    /// Project a tree into its display form
    pub fn new<HF: DigestProvider>(tree: &MerkleTree<HF>, preview_len: usize) -> Self {
        let data_list = tree
            .leaves()
            .iter()
            .map(|leaf| DataEntry {
                index: leaf.index,
                data: String::from_utf8_lossy(&leaf.data).into_owned(),
            })
            .collect();
        let tree_levels = tree
            .levels()
            .iter()
            .enumerate()
            .map(|(level, nodes)| LevelView {
                level,
                level_name: tree.level_name(level),
                nodes: nodes.iter().map(|n| NodeView::new(n, preview_len)).collect(),
            })
            .collect();
        Self {
            data_list,
            tree_levels,
        }
    }
}

impl NodeView {
    fn new(node: &Node, preview_len: usize) -> Self {
        Self {
            index: node.index,
            hash: node.hash,
            hash_short: node.hash.short(preview_len),
            is_leaf: node.is_leaf,
            is_root: node.is_root,
            label: node
                .label
                .as_ref()
                .map(|data| String::from_utf8_lossy(data).into_owned()),
        }
    }
}

/// Proof step with a shortened hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofStepView {
    pub level: usize,
    pub position: Position,
    pub hash: MerkleHash,
    pub hash_short: String,
}

/// Proof steps with hash previews attached
pub fn proof_view(proof: &Proof, preview_len: usize) -> Vec<ProofStepView> {
    proof
        .steps()
        .iter()
        .map(|step| ProofStepView {
            level: step.level,
            position: step.position,
            hash: step.hash,
            hash_short: step.hash_preview(preview_len),
        })
        .collect()
}
