//! Content item listing, preview and completion endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{Html, Json},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::path::PathBuf;

use efx_common::page::{render_item_page, Deployment};
use efx_common::selection::ContentItem;

use crate::error::{ApiError, ApiResult};
use crate::{AppState, Completion};

/// Folder under the output root receiving submitted results
pub const RESULTS_DIR: &str = "results";

/// One row of the item listing
#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub exp_id: String,
    pub name: Option<String>,
    pub template: String,
    pub namespace: String,
    pub time: Number,
}

impl From<&ContentItem> for ItemSummary {
    fn from(item: &ContentItem) -> Self {
        Self {
            exp_id: item.exp_id().to_string(),
            name: item.manifest.name.clone(),
            template: item.manifest.template.as_str().to_string(),
            namespace: item.manifest.kind().namespace().to_string(),
            time: item.manifest.time.clone(),
        }
    }
}

/// Response to a completion report
#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub exp_id: String,
    pub completed_at: chrono::DateTime<Utc>,
    /// First selected item not yet completed, if any
    pub next: Option<String>,
}

fn find_item<'a>(state: &'a AppState, exp_id: &str) -> ApiResult<&'a ContentItem> {
    state
        .item(exp_id)
        .ok_or_else(|| ApiError::NotFound(format!("No content item '{}'", exp_id)))
}

/// GET /experiments
pub async fn list_experiments(State(state): State<AppState>) -> Json<Vec<ItemSummary>> {
    Json(state.items.iter().map(ItemSummary::from).collect())
}

/// GET /experiments/:exp_id
///
/// The manifest exactly as written in `config.json`.
pub async fn get_experiment(
    State(state): State<AppState>,
    Path(exp_id): Path<String>,
) -> ApiResult<Json<Map<String, Value>>> {
    let manifest = state
        .lookup
        .get(&exp_id)
        .ok_or_else(|| ApiError::NotFound(format!("No content item '{}'", exp_id)))?;
    Ok(Json(manifest.raw().clone()))
}

/// GET /experiments/:exp_id/preview
///
/// Assets resolve against the item mounts and the skeleton fallback, so the
/// page is rendered with an absolute prefix.
pub async fn preview_experiment(
    State(state): State<AppState>,
    Path(exp_id): Path<String>,
) -> ApiResult<Html<String>> {
    let item = find_item(&state, &exp_id)?;
    let page = render_item_page(&item.manifest, &item.folder, "/", Deployment::Server)?;
    Ok(Html(page))
}

/// POST /experiments/:exp_id/complete
///
/// Records the completion and stores a non-empty JSON body as the item's results.
pub async fn complete_experiment(
    State(state): State<AppState>,
    Path(exp_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<CompleteResponse>> {
    find_item(&state, &exp_id)?;

    let results = if body.is_empty() {
        None
    } else {
        let data: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Results are not valid JSON: {}", e)))?;
        Some(write_results(&state, &exp_id, &data).await?)
    };

    let completed_at = Utc::now();
    let mut completed = state.completed.write().await;
    completed.push(Completion {
        exp_id: exp_id.clone(),
        completed_at,
        results,
    });

    let next = state
        .items
        .iter()
        .map(ContentItem::exp_id)
        .find(|id| !completed.iter().any(|done| done.exp_id == *id))
        .map(str::to_string);

    tracing::info!(
        exp_id = %exp_id,
        finished = completed.len(),
        next = next.as_deref().unwrap_or("-"),
        "Item completed"
    );
    Ok(Json(CompleteResponse {
        exp_id,
        completed_at,
        next,
    }))
}

async fn write_results(state: &AppState, exp_id: &str, data: &Value) -> ApiResult<PathBuf> {
    let dir = state.output_root.join(RESULTS_DIR);
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(format!("{}-{}.json", exp_id, uuid::Uuid::new_v4()));
    let text = serde_json::to_string_pretty(data)
        .map_err(|e| ApiError::Internal(format!("Failed to encode results: {}", e)))?;
    tokio::fs::write(&path, text).await?;

    tracing::debug!(path = %path.display(), "Wrote results");
    Ok(path)
}
