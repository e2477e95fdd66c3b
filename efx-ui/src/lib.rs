//! efx-ui library - command line and web surface for the Experiment Factory
//!
//! The interactive assembly UI lists validated content items, previews them
//! and builds batteries on request. Static serving for previews and local
//! battery sessions lives in [`serve`].

use axum::Router;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use efx_common::config::AppConfig;
use efx_common::manifest::{Manifest, ID_FIELD};
use efx_common::selection::{build_lookup, find_directories, load_items, select, ContentItem};
use efx_common::validation::{is_valid, ValidateOptions};

pub mod api;
pub mod error;
pub mod serve;

/// One finished item reported by a participant page
#[derive(Debug, Clone, serde::Serialize)]
pub struct Completion {
    pub exp_id: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    /// File the submitted results were written to
    pub results: Option<PathBuf>,
}

/// Application state shared across HTTP handlers
///
/// Built once at startup; only the completion list changes afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Content base directory
    pub base: PathBuf,
    /// Requested identifiers (empty = all valid items)
    pub selection: Vec<String>,
    /// Validated, selected items in repository order
    pub items: Arc<Vec<ContentItem>>,
    /// exp_id → manifest
    pub lookup: Arc<BTreeMap<String, Manifest>>,
    /// Battery skeleton used for generation and shared static assets
    pub battery: Option<PathBuf>,
    /// Folder receiving generated batteries and submitted results
    pub output_root: PathBuf,
    pub completed: Arc<RwLock<Vec<Completion>>>,
}

impl AppState {
    pub fn new(
        base: PathBuf,
        selection: Vec<String>,
        items: Vec<ContentItem>,
        battery: Option<PathBuf>,
        output_root: PathBuf,
    ) -> Self {
        let manifests: Vec<Manifest> = items.iter().map(|item| item.manifest.clone()).collect();
        Self {
            base,
            selection,
            lookup: Arc::new(build_lookup(&manifests, ID_FIELD)),
            items: Arc::new(items),
            battery,
            output_root,
            completed: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Validate the content base once and keep the selected items
    pub fn load(config: &AppConfig) -> efx_common::Result<Self> {
        let options = ValidateOptions::quiet();
        let valid: Vec<PathBuf> = find_directories(&config.base)?
            .into_iter()
            .filter(|folder| is_valid(folder, &options))
            .collect();
        let items = load_items(&select(&valid, &config.selection))?;

        tracing::info!(
            base = %config.base.display(),
            items = items.len(),
            "Loaded content items"
        );
        Ok(Self::new(
            config.base.clone(),
            config.selection.clone(),
            items,
            config.battery.clone(),
            config.output_root.clone(),
        ))
    }

    pub fn item(&self, exp_id: &str) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.exp_id() == exp_id)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let mut router = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/expfactory-ui.js", get(api::serve_app_js))
        .route("/experiments", get(api::list_experiments))
        .route("/experiments/:exp_id", get(api::get_experiment))
        .route("/experiments/:exp_id/preview", get(api::preview_experiment))
        .route("/experiments/:exp_id/complete", post(api::complete_experiment))
        .route("/battery/validate", post(api::validate_battery))
        .route("/battery/generate", post(api::generate_battery))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    // Item assets, then the skeleton's shared assets for everything else
    for item in state.items.iter() {
        let mount = format!(
            "/static/{}/{}",
            item.manifest.kind().namespace(),
            item.exp_id()
        );
        router = router.nest_service(&mount, ServeDir::new(&item.folder));
    }
    if let Some(battery) = &state.battery {
        router = router.fallback_service(ServeDir::new(battery));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
