//! Merkle membership proofs.
//!
//! A [`Proof`] is a plain value: the ordered sibling hashes from the leaf
//! level up to, but excluding, the root. It keeps no reference to the tree
//! it was generated from, so checking it only needs the leaf record and a
//! trusted root hash.

use crate::{
    error::Error,
    hash::{DigestProvider, MerkleHash},
    tree::{MerkleTree, OddNodePolicy},
};
use serde::{Deserialize, Serialize};

/// Side on which the sibling sits relative to the node being proved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// Sibling hash needed at one level of the path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub level: usize,
    pub position: Position,
    pub hash: MerkleHash,
}

impl ProofStep {
    /// Create new proof step
    pub fn new(level: usize, position: Position, hash: MerkleHash) -> Self {
        Self {
            level,
            position,
            hash,
        }
    }

    /// Shortened hex of the sibling hash
    pub fn hash_preview(&self, len: usize) -> String {
        self.hash.short(len)
    }
}

/// Merkle Proof for an individual leaf
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proof {
    steps: Vec<ProofStep>,
}

impl From<Vec<ProofStep>> for Proof {
    fn from(steps: Vec<ProofStep>) -> Self {
        Self { steps }
    }
}

impl Proof {
    /// Steps ordered from the leaf level upwards
    pub fn steps(&self) -> &[ProofStep] {
        &self.steps
    }

    /// Get the number of steps in the proof
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the proof has no steps, as for a single leaf tree
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check the path is ordered from the leaf level upwards
    pub fn validate(&self) -> Result<(), Error> {
        for pair in self.steps.windows(2) {
            if pair[1].level <= pair[0].level {
                return Err(Error::MalformedProof(format!(
                    "step at level {} follows level {}",
                    pair[1].level, pair[0].level
                )));
            }
        }
        Ok(())
    }

    /// Fold the path over the leaf hash to get the root it implies
    pub fn compute_implied_root<HF: DigestProvider>(&self, leaf_data: &[u8]) -> MerkleHash {
        self.steps
            .iter()
            .fold(HF::hash_leaf(leaf_data), |acc, step| match step.position {
                Position::Right => HF::hash_pair(&acc, &step.hash),
                Position::Left => HF::hash_pair(&step.hash, &acc),
            })
    }
}

impl<HF: DigestProvider> MerkleTree<HF> {
    /// Collect the sibling path of a leaf
    pub fn proof(&self, leaf_index: usize) -> Result<Proof, Error> {
        self.leaf_exists(leaf_index)?;

        let mut steps = Vec::with_capacity(self.height());
        let mut current = leaf_index;
        for (level, nodes) in self.levels[..self.height()].iter().enumerate() {
            let sibling_index = if current & 1 == 1 {
                current - 1
            } else {
                current + 1
            };
            let sibling = match (nodes.get(sibling_index), self.policy) {
                (Some(node), _) => Some(node),
                // The last node of an odd level is its own sibling
                (None, OddNodePolicy::DuplicateLast) => Some(&nodes[current]),
                (None, OddNodePolicy::PromoteAlone) => None,
            };
            if let Some(sibling) = sibling {
                let position = if sibling_index > current {
                    Position::Right
                } else {
                    Position::Left
                };
                steps.push(ProofStep::new(level, position, sibling.hash));
            }
            current >>= 1;
        }

        tracing::debug!(leaf_index, steps = steps.len(), "generated merkle proof");
        Ok(Proof { steps })
    }
}

/// Calculate a Merkle Proof from a tree and leaf index
pub fn proof<HF: DigestProvider>(tree: &MerkleTree<HF>, leaf_index: usize) -> Result<Proof, Error> {
    tree.proof(leaf_index)
}

/// Recompute the root from a leaf record and compare it with the reference root.
///
/// A mismatch is an ordinary `false`, never an error.
pub fn verify<HF: DigestProvider>(leaf_data: &[u8], proof: &Proof, root: &MerkleHash) -> bool {
    let valid = proof.compute_implied_root::<HF>(leaf_data) == *root;
    tracing::trace!(steps = proof.len(), valid, "verified merkle proof");
    valid
}

/// Outcome of verifying an original and a modified record against one proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TamperReport {
    pub original_valid: bool,
    pub modified_valid: bool,
    /// The modified record is rejected by the proof
    pub detection_success: bool,
}

/// Verify an original and a modified record against the same proof and root
pub fn detect_tamper<HF: DigestProvider>(
    original: &[u8],
    modified: &[u8],
    proof: &Proof,
    root: &MerkleHash,
) -> TamperReport {
    let original_valid = verify::<HF>(original, proof, root);
    let modified_valid = verify::<HF>(modified, proof, root);
    TamperReport {
        original_valid,
        modified_valid,
        detection_success: !modified_valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hash::Separated, tree::TreeBuilder};
    use blake2::Blake2s256;
    use proptest::prelude::*;
    use sha2::Sha256;

    fn records(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("record {i}")).collect()
    }

    #[test]
    fn test_four_block_proof() {
        let tree = TreeBuilder::<Sha256>::new()
            .build(["Block 1", "Block 2", "Block 3", "Block 4"])
            .unwrap();
        let proof = tree.proof(0).unwrap();
        assert_eq!(proof.len(), 2);

        let steps = proof.steps();
        assert_eq!(steps[0], ProofStep::new(0, Position::Right, Sha256::hash_leaf(b"Block 2")));
        assert_eq!(steps[1].level, 1);
        assert_eq!(steps[1].position, Position::Right);
        assert_eq!(steps[1].hash, tree.levels()[1][1].hash);

        assert!(verify::<Sha256>(b"Block 1", &proof, tree.root()));
        assert!(!verify::<Sha256>(b"Block 2", &proof, tree.root()));

        let last = tree.proof(3).unwrap();
        assert!(last.steps().iter().all(|s| s.position == Position::Left));
        assert!(verify::<Sha256>(b"Block 4", &last, tree.root()));
    }

    #[test]
    fn test_odd_tree_proof_uses_duplicated_node() {
        let tree = TreeBuilder::<Sha256>::new()
            .build([
                "Transaction A",
                "Transaction B",
                "Transaction C",
                "Transaction D",
                "Transaction E",
            ])
            .unwrap();
        let proof = tree.proof(4).unwrap();
        assert_eq!(proof.len(), tree.height());

        let first = &proof.steps()[0];
        assert_eq!(first.position, Position::Right);
        assert_eq!(first.hash, Sha256::hash_leaf(b"Transaction E"));
        assert!(verify::<Sha256>(b"Transaction E", &proof, tree.root()));
    }

    #[test]
    fn test_out_of_range_leaves_tree_usable() {
        let tree = TreeBuilder::<Sha256>::new()
            .build(["Block 1", "Block 2", "Block 3", "Block 4"])
            .unwrap();
        let err = tree.proof(5).unwrap_err();
        assert_eq!(err, Error::IndexOutOfRange(5, 4));
        assert!(err.is_validation());

        let proof = proof(&tree, 2).unwrap();
        assert!(verify::<Sha256>(b"Block 3", &proof, tree.root()));
    }

    #[test]
    fn test_single_leaf_has_empty_proof() {
        let tree = TreeBuilder::<Sha256>::new().build(["alone"]).unwrap();
        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(verify::<Sha256>(b"alone", &proof, tree.root()));
        assert!(!verify::<Sha256>(b"alone!", &proof, tree.root()));
    }

    #[test]
    fn test_promote_alone_skips_missing_sibling() {
        let tree = TreeBuilder::<Sha256>::with_policy(OddNodePolicy::PromoteAlone)
            .build(records(5))
            .unwrap();
        let proof = tree.proof(4).unwrap();
        // Leaf 4 is promoted twice before meeting the left subtree
        assert_eq!(proof.len(), 1);
        assert_eq!(proof.steps()[0].level, 2);
        assert_eq!(proof.steps()[0].position, Position::Left);
        assert!(verify::<Sha256>(b"record 4", &proof, tree.root()));

        for i in 0..4 {
            let proof = tree.proof(i).unwrap();
            assert!(verify::<Sha256>(format!("record {i}").as_bytes(), &proof, tree.root()));
        }
    }

    #[test]
    fn test_other_digest_providers() {
        let tree = TreeBuilder::<Blake2s256>::new().build(records(9)).unwrap();
        let proof = tree.proof(7).unwrap();
        assert!(verify::<Blake2s256>(b"record 7", &proof, tree.root()));
        assert!(!verify::<Sha256>(b"record 7", &proof, tree.root()));

        let tree = TreeBuilder::<Separated<Sha256>>::new().build(records(6)).unwrap();
        let proof = tree.proof(5).unwrap();
        assert!(verify::<Separated<Sha256>>(b"record 5", &proof, tree.root()));
        assert!(!verify::<Sha256>(b"record 5", &proof, tree.root()));
    }

    #[test]
    fn test_detect_tamper() {
        let tree = TreeBuilder::<Sha256>::new().build(records(4)).unwrap();
        let proof = tree.proof(1).unwrap();
        let report = detect_tamper::<Sha256>(b"record 1", b"record 1 (edited)", &proof, tree.root());
        assert_eq!(
            report,
            TamperReport {
                original_valid: true,
                modified_valid: false,
                detection_success: true,
            }
        );

        let unchanged = detect_tamper::<Sha256>(b"record 1", b"record 1", &proof, tree.root());
        assert!(!unchanged.detection_success);
    }

    #[test]
    fn test_detection_depends_only_on_modified_record() {
        let tree = TreeBuilder::<Sha256>::new().build(records(4)).unwrap();
        let proof = tree.proof(1).unwrap();
        let report = detect_tamper::<Sha256>(b"wrong", b"also wrong", &proof, tree.root());
        assert!(!report.original_valid);
        assert!(!report.modified_valid);
        assert!(report.detection_success);
    }

    #[test]
    fn test_validate_rejects_unordered_steps() {
        let hash = Sha256::hash_leaf(b"x");
        let proof = Proof::from(vec![
            ProofStep::new(1, Position::Left, hash),
            ProofStep::new(0, Position::Right, hash),
        ]);
        assert!(matches!(proof.validate(), Err(Error::MalformedProof(_))));

        let tree = TreeBuilder::<Sha256>::new().build(records(8)).unwrap();
        assert_eq!(tree.proof(6).unwrap().validate(), Ok(()));
    }

    #[test]
    fn test_proof_json_shape() {
        let tree = TreeBuilder::<Sha256>::new().build(["a", "b"]).unwrap();
        let proof = tree.proof(1).unwrap();
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "level": 0,
                "position": "left",
                "hash": Sha256::hash_leaf(b"a").to_hex(),
            }])
        );
        let back: Proof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
        assert!(serde_json::from_str::<Proof>(r#"[{"level": 0, "position": "up", "hash": ""}]"#).is_err());
    }

    proptest! {
        /// Every leaf verifies against the root of the tree it came from.
        #[test]
        fn round_trip_holds_for_every_leaf(
            data in prop::collection::vec(".{0,12}", 1..40),
            promote in any::<bool>(),
        ) {
            let policy = if promote { OddNodePolicy::PromoteAlone } else { OddNodePolicy::DuplicateLast };
            let tree = TreeBuilder::<Sha256>::with_policy(policy).build(&data).unwrap();
            for (i, leaf) in data.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                prop_assert!(verify::<Sha256>(leaf.as_bytes(), &proof, tree.root()));
            }
        }

        /// Appending anything to a record breaks its proof.
        #[test]
        fn appended_suffix_is_detected(
            data in prop::collection::vec("[a-z]{1,8}", 1..24),
            pick in any::<prop::sample::Index>(),
            suffix in "[a-z0-9]{1,6}",
        ) {
            let tree = TreeBuilder::<Sha256>::new().build(&data).unwrap();
            let i = pick.index(data.len());
            let proof = tree.proof(i).unwrap();
            let mutated = format!("{}{}", data[i], suffix);
            prop_assert!(!verify::<Sha256>(mutated.as_bytes(), &proof, tree.root()));
        }

        /// Depth follows ceil(log2(n)) + 1 and proofs carry depth - 1 steps.
        #[test]
        fn depth_law_and_proof_length(n in 1usize..300) {
            let tree = TreeBuilder::<Sha256>::new().build(records(n)).unwrap();
            prop_assert_eq!(tree.depth(), crate::tree::ceil_log2(n) + 1);
            prop_assert_eq!(tree.proof(n - 1).unwrap().len(), tree.depth() - 1);
        }
    }
}
