//! # Merkle Routes
//!
//! - `POST /api/build-tree`     : Build the session's tree from a list of records
//! - `POST /api/generate-proof` : Membership proof for one leaf of the current tree
//! - `POST /api/verify-proof`   : Check a record against a proof and root
//! - `POST /api/demo-detect`    : Verify an original and a modified record with one proof
//! - `GET  /api/stats`          : Statistics of the current tree
//! - `DELETE /api/tree`         : Drop the session's tree and free its slot

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::error::AppError;
use crate::api::extractors::{extract_json, Session};
use crate::api::state::{ApiHasher, AppState};
use crate::hash::MerkleHash;
use crate::proof::{detect_tamper, verify, Proof};
use crate::store::SessionId;
use crate::tree::{MerkleTree, TreeStatistics};
use crate::view::{proof_view, ProofStepView, TreeView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/build-tree", post(build_tree))
        .route("/api/generate-proof", post(generate_proof))
        .route("/api/verify-proof", post(verify_proof))
        .route("/api/demo-detect", post(demo_detect))
        .route("/api/stats", get(stats))
        .route("/api/tree", delete(remove_tree))
}

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub data: Vec<String>,
}

impl BuildRequest {
    /// Trimmed non-empty records, bounded by `max_records`
    fn records(&self, max_records: usize) -> Result<Vec<&str>, AppError> {
        let records: Vec<&str> = self
            .data
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();
        if records.is_empty() {
            return Err(AppError::Validation(
                "data must contain at least one non-empty record".to_string(),
            ));
        }
        if records.len() > max_records {
            return Err(AppError::Validation(format!(
                "too many records: {} (maximum {max_records})",
                records.len()
            )));
        }
        Ok(records)
    }
}

#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub success: bool,
    pub root_hash: MerkleHash,
    pub tree_structure: String,
    pub leaf_count: usize,
    pub depth: usize,
    pub height: usize,
    pub stats: TreeStatistics,
    #[serde(flatten)]
    pub view: TreeView,
}

impl BuildResponse {
    fn new(tree: &MerkleTree<ApiHasher>, preview_len: usize) -> Self {
        Self {
            success: true,
            root_hash: *tree.root(),
            tree_structure: tree.render(preview_len),
            leaf_count: tree.leaf_count(),
            depth: tree.depth(),
            height: tree.height(),
            stats: tree.statistics(),
            view: TreeView::new(tree, preview_len),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProofRequest {
    pub index: i64,
}

#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub success: bool,
    pub index: usize,
    pub leaf_data: String,
    pub proof_steps: usize,
    pub proof: Vec<ProofStepView>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub leaf_data: String,
    pub proof: Proof,
    /// Root to check against; the session's current root when absent
    #[serde(default)]
    pub root_hash: Option<MerkleHash>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub leaf_data: String,
    pub root_hash: MerkleHash,
    pub is_valid: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DemoRequest {
    pub original_data: String,
    pub modified_data: String,
    pub proof: Proof,
    #[serde(default)]
    pub root_hash: Option<MerkleHash>,
}

#[derive(Debug, Serialize)]
pub struct DemoResponse {
    pub success: bool,
    pub original_data: String,
    pub modified_data: String,
    pub original_valid: bool,
    pub modified_valid: bool,
    pub detection_success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: TreeStatistics,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
    /// Whether the session held a tree
    pub removed: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn build_tree(
    State(state): State<AppState>,
    Session(session): Session,
    body: Result<Json<BuildRequest>, JsonRejection>,
) -> Result<Json<BuildResponse>, AppError> {
    let req = extract_json(body)?;
    let records = req.records(state.config.max_records)?;
    let tree = state.store.build(&session, &state.builder, records)?;
    Ok(Json(BuildResponse::new(&tree, state.config.preview_len)))
}

async fn generate_proof(
    State(state): State<AppState>,
    Session(session): Session,
    body: Result<Json<ProofRequest>, JsonRejection>,
) -> Result<Json<ProofResponse>, AppError> {
    let req = extract_json(body)?;
    let Ok(index) = usize::try_from(req.index) else {
        let tree = state.store.get(&session)?;
        return Err(AppError::Validation(format!(
            "invalid index {} (0-{})",
            req.index,
            tree.leaf_count() - 1
        )));
    };
    let (tree, proof) = state.store.prove(&session, index)?;
    let leaf_data = String::from_utf8_lossy(tree.leaf_data(index)?).into_owned();
    tracing::info!(%session, index, steps = proof.len(), "issued proof");

    Ok(Json(ProofResponse {
        success: true,
        index,
        leaf_data,
        proof_steps: proof.len(),
        proof: proof_view(&proof, state.config.preview_len),
    }))
}

/// Root given by the caller, or the root of the session's current tree
fn reference_root(
    state: &AppState,
    session: &SessionId,
    supplied: Option<MerkleHash>,
) -> Result<MerkleHash, AppError> {
    match supplied {
        Some(root) => Ok(root),
        None => Ok(state.store.root(session)?),
    }
}

async fn verify_proof(
    State(state): State<AppState>,
    Session(session): Session,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_json(body)?;
    let leaf_data = req.leaf_data.trim().to_string();
    if leaf_data.is_empty() {
        return Err(AppError::Validation("leaf data must not be empty".to_string()));
    }
    req.proof.validate()?;
    let root_hash = reference_root(&state, &session, req.root_hash)?;

    let is_valid = verify::<ApiHasher>(leaf_data.as_bytes(), &req.proof, &root_hash);
    tracing::info!(%session, is_valid, "verified proof");

    let message = if is_valid {
        "Proof is valid"
    } else {
        "Proof is invalid"
    };
    Ok(Json(VerifyResponse {
        success: true,
        leaf_data,
        root_hash,
        is_valid,
        message: message.to_string(),
    }))
}

async fn demo_detect(
    State(state): State<AppState>,
    Session(session): Session,
    body: Result<Json<DemoRequest>, JsonRejection>,
) -> Result<Json<DemoResponse>, AppError> {
    let req = extract_json(body)?;
    req.proof.validate()?;
    let root_hash = reference_root(&state, &session, req.root_hash)?;
    let original_data = req.original_data.trim().to_string();
    let modified_data = req.modified_data.trim().to_string();

    let report = detect_tamper::<ApiHasher>(
        original_data.as_bytes(),
        modified_data.as_bytes(),
        &req.proof,
        &root_hash,
    );
    tracing::info!(%session, detected = report.detection_success, "tamper demonstration");

    let message = if report.detection_success {
        "Modification detected"
    } else {
        "Modification was not detected"
    };
    Ok(Json(DemoResponse {
        success: true,
        original_data,
        modified_data,
        original_valid: report.original_valid,
        modified_valid: report.modified_valid,
        detection_success: report.detection_success,
        message: message.to_string(),
    }))
}

async fn stats(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Json<StatsResponse>, AppError> {
    let tree = state.store.get(&session)?;
    Ok(Json(StatsResponse {
        success: true,
        stats: tree.statistics(),
    }))
}

async fn remove_tree(State(state): State<AppState>, Session(session): Session) -> Json<RemoveResponse> {
    let removed = state.store.remove(&session).is_some();
    Json(RemoveResponse {
        success: true,
        removed,
    })
}
