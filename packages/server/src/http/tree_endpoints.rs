//! Tree and Node Endpoints
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /api/trees/:tree_name` - Materialize a tree
//! - `POST /api/trees/:tree_name/nodes` - Create a node
//! - `PUT /api/nodes/:node_id` - Rename a node
//! - `DELETE /api/nodes/:node_id` - Delete a childless node

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use treenodes_core::models::{MaterializedNode, NodeId};

use crate::http::{ApiError, AppState};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Body of `POST /api/trees/:tree_name/nodes`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    #[serde(default)]
    pub parent_node_id: Option<NodeId>,
    pub node_name: String,
}

/// Response of a successful node creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedNode {
    pub id: NodeId,
}

/// Body of `PUT /api/nodes/:node_id`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameNodeRequest {
    pub new_node_name: String,
}

/// Health check endpoint
///
/// # Example
///
/// ```bash
/// curl http://localhost:3001/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Materialize a tree
///
/// Whether a missing tree is a 404 or is created empty depends on
/// `TREENODES_CREATE_TREE_ON_FETCH`.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3001/api/trees/T1
/// ```
async fn get_tree(
    State(state): State<AppState>,
    tree_name: Result<Path<String>, PathRejection>,
) -> Result<Json<MaterializedNode>, ApiError> {
    let Path(tree_name) = tree_name?;
    let tree = state.tree_service.get_tree(&tree_name).await?;
    Ok(Json(tree))
}

/// Create a node, creating the tree on first use
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:3001/api/trees/T1/nodes \
///   -H "Content-Type: application/json" \
///   -d '{"parentNodeId": null, "nodeName": "Root"}'
/// ```
async fn create_node(
    State(state): State<AppState>,
    tree_name: Result<Path<String>, PathRejection>,
    body: Result<Json<CreateNodeRequest>, JsonRejection>,
) -> Result<Json<CreatedNode>, ApiError> {
    let Path(tree_name) = tree_name?;
    let Json(request) = body?;

    let id = state
        .tree_service
        .create_node(&tree_name, request.parent_node_id, &request.node_name)
        .await?;

    Ok(Json(CreatedNode { id }))
}

/// Rename a node
///
/// # Example
///
/// ```bash
/// curl -X PUT http://localhost:3001/api/nodes/3 \
///   -H "Content-Type: application/json" \
///   -d '{"newNodeName": "Renamed"}'
/// ```
async fn rename_node(
    State(state): State<AppState>,
    node_id: Result<Path<NodeId>, PathRejection>,
    body: Result<Json<RenameNodeRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(node_id) = node_id?;
    let Json(request) = body?;

    state
        .tree_service
        .rename_node(node_id, &request.new_node_name)
        .await?;

    Ok(StatusCode::OK)
}

/// Delete a node
///
/// Deleting a node that does not exist succeeds.
///
/// # Example
///
/// ```bash
/// curl -X DELETE http://localhost:3001/api/nodes/3
/// ```
async fn delete_node(
    State(state): State<AppState>,
    node_id: Result<Path<NodeId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(node_id) = node_id?;

    // Idempotent: DeleteResult only feeds the log
    let result = state.tree_service.delete_node(node_id).await?;
    if !result.existed {
        tracing::debug!("DELETE /api/nodes/{} matched nothing", node_id);
    }

    Ok(StatusCode::OK)
}

/// Create tree and node routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/trees/:tree_name", get(get_tree))
        .route("/api/trees/:tree_name/nodes", post(create_node))
        .route("/api/nodes/:node_id", put(rename_node).delete(delete_node))
        .with_state(state)
}
