//! Request handlers for the REST API

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

use crate::node::NodeRecord;
use crate::recycler::{inventory, RecyclerState};

/// Liveness probe
pub async fn health() -> &'static str {
    "ok"
}

/// Current eligible-node set, as the control loop would see it
pub async fn list_nodes(
    State(state): State<Arc<RecyclerState>>,
) -> Result<Json<Vec<NodeRecord>>, StatusCode> {
    match inventory::list_eligible_nodes(state.cluster.as_ref()).await {
        Ok(nodes) => Ok(Json(nodes)),
        Err(e) => {
            warn!("Failed to list nodes for API request: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
